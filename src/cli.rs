use crate::config::{CompilerConfig, load_config};
use crate::layout_dump::write_layout_dump;
use crate::pipeline::compile_draft;
use crate::theme::Theme;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "bpmn-draft",
    version,
    about = "Compile an AI-drafted process candidate into BPMN 2.0 XML"
)]
pub struct Args {
    /// Candidate JSON file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "xml")]
    pub output_format: OutputFormat,

    /// Config JSON file (limits, layout, theme, rules)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    #[arg(long = "maxNodes", env = "AI_DRAFT_MAX_NODES")]
    pub max_nodes: Option<usize>,

    #[arg(long = "maxFlows", env = "AI_DRAFT_MAX_FLOWS")]
    pub max_flows: Option<usize>,

    #[arg(long = "maxResponseBytes", env = "AI_DRAFT_MAX_RESPONSE_BYTES")]
    pub max_response_bytes: Option<usize>,

    #[arg(long = "policyVersion", env = "AI_DRAFT_POLICY_VERSION")]
    pub policy_version: Option<String>,

    /// Theme name: lanes (default) or plain
    #[arg(short = 't', long = "theme")]
    pub theme: Option<String>,

    /// Timestamp copied into the result envelope as `createdAt`
    #[arg(long = "createdAt")]
    pub created_at: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// BPMN 2.0 XML document
    Xml,
    /// Response envelope with draft, XML and counters
    Result,
    /// Computed layout as JSON
    Layout,
}

pub fn run() -> Result<()> {
    run_with(Args::parse())
}

pub fn run_with(args: Args) -> Result<()> {
    let config = resolve_config(&args)?;
    let input = read_input(args.input.as_deref())?;
    let compiled = compile_draft(&input, &config)?;

    match args.output_format {
        OutputFormat::Xml => write_output(&compiled.bpmn_xml, args.output.as_deref())?,
        OutputFormat::Result => {
            let result = match args.created_at.as_deref() {
                Some(stamp) => compiled.result_at(&config, stamp),
                None => compiled.result(&config),
            };
            let mut json = serde_json::to_string_pretty(&result)?;
            json.push('\n');
            write_output(&json, args.output.as_deref())?;
        }
        OutputFormat::Layout => {
            write_layout_dump(args.output.as_deref(), &compiled.layout, &compiled.graph)?
        }
    }
    Ok(())
}

/// Config file first, then flags and their environment fallbacks.
pub fn resolve_config(args: &Args) -> Result<CompilerConfig> {
    let mut config = load_config(args.config.as_deref()).with_context(|| match &args.config {
        Some(path) => format!("failed to load config {}", path.display()),
        None => "failed to load default config".to_string(),
    })?;

    if let Some(v) = args.max_nodes {
        config.limits.max_nodes = v;
    }
    if let Some(v) = args.max_flows {
        config.limits.max_flows = v;
    }
    if let Some(v) = args.max_response_bytes {
        config.limits.max_response_bytes = v;
    }
    if let Some(v) = args.policy_version.as_deref() {
        config.policy_version = v.trim().to_string();
    }
    if let Some(name) = args.theme.as_deref() {
        config.theme =
            Theme::by_name(name).ok_or_else(|| anyhow::anyhow!("unknown theme '{name}'"))?;
    }

    config.limits.validate()?;
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

pub fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => {
            io::stdout().write_all(text.as_bytes())?;
        }
    }
    Ok(())
}
