pub mod classify;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod fold;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod rules;
pub mod schema;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{CompilerConfig, DraftLimits, LayoutConfig};
pub use error::{DraftError, SchemaError, SchemaErrorKind};
pub use pipeline::{CompiledDraft, DraftResult, compile_draft, compile_value};
