use thiserror::Error;

/// Why a candidate draft was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaErrorKind {
    #[error("must be an object")]
    NotObject,

    #[error("must be an array")]
    NotArray,

    #[error("must be a string")]
    NotString,

    #[error("must not be empty")]
    Empty,

    #[error("needs at least {min} items (got {actual})")]
    TooFew { min: usize, actual: usize },

    #[error("exceeds limit of {max} items (got {actual})")]
    TooMany { max: usize, actual: usize },

    #[error("unsupported node type ({0})")]
    UnsupportedNodeType(String),

    #[error("flow {flow_id} references unknown node ({reference})")]
    UnknownNode { flow_id: String, reference: String },

    #[error("flow {0} cannot connect a node to itself")]
    SelfLoop(String),

    #[error("must contain exactly 1 start node (found {0})")]
    StartCount(usize),

    #[error("must contain at least 1 end node")]
    MissingEnd,

    #[error("start node {0} has no outgoing flow")]
    StartWithoutOutgoing(String),

    #[error("no end node receives a flow")]
    EndWithoutIncoming,
}

/// A schema violation, qualified with the JSON path it was found at
/// (`nodes[2].type`, `flows[3].target`, ...).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid draft schema: {path} {kind}")]
pub struct SchemaError {
    pub path: String,
    pub kind: SchemaErrorKind,
}

impl SchemaError {
    pub fn new(path: impl Into<String>, kind: SchemaErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

#[derive(Error, Debug)]
pub enum DraftError {
    #[error("invalid limits: {0}")]
    InvalidLimits(String),

    #[error("invalid layout config: {0}")]
    InvalidLayout(String),

    #[error("draft output exceeds {limit} bytes (got {actual})")]
    ResponseTooLarge { limit: usize, actual: usize },

    #[error("draft output is empty")]
    EmptyCandidate,

    #[error("draft output is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A stage after validation broke one of its own invariants.
    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl DraftError {
    /// True for everything caused by the candidate or the caller's limits,
    /// false for compiler bugs.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, DraftError::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_message_names_path_and_flow() {
        let err = SchemaError::new(
            "flows[3].target",
            SchemaErrorKind::UnknownNode {
                flow_id: "f4".to_string(),
                reference: "node_7".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "invalid draft schema: flows[3].target flow f4 references unknown node (node_7)"
        );
    }

    #[test]
    fn internal_errors_are_not_user_errors() {
        assert!(!DraftError::Internal("missing layout".into()).is_user_error());
        assert!(DraftError::EmptyCandidate.is_user_error());
    }
}
