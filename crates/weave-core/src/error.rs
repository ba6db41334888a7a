use thiserror::Error;

use crate::graph::NodeId;

/// Malformed script text. Produced by the tokenizer and parser only;
/// a script that fails to parse never reaches the executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unterminated parallel block (missing '}}')")]
    UnterminatedBlock,

    #[error("pipe operator '->' has no right-hand side")]
    MissingPipeRhs,

    #[error("parallel block has no branches")]
    EmptyParallel,

    #[error("unterminated string literal on line {line}")]
    UnterminatedString { line: usize },

    #[error("'merge' without a preceding parallel group")]
    DanglingMerge,

    #[error("expected {expected}, found '{found}'")]
    ExpectedToken { expected: &'static str, found: String },
}

/// Structural invariant violation that survived parsing. The grammar
/// cannot express these; they guard against hand-built graphs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("merge node {node} does not close a parallel group")]
    MergeWithoutParallel { node: NodeId },
}

/// Failures of MCP connection operations.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    #[error("connection '{0}' is not ready")]
    NotReady(String),

    #[error("call on connection '{name}' timed out after {timeout_secs}s")]
    Timeout { name: String, timeout_secs: u64 },

    #[error("transport error on connection '{name}': {message}")]
    Transport { name: String, message: String },
}

#[derive(Debug, Error)]
pub enum WeaveError {
    // Pre-execution errors
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    // Dispatch errors
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    // Execution errors
    #[error("command '{command}' failed: {message}")]
    Handler { command: String, message: String },

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("command '{command}' timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("node {node} ({command}): {source}")]
    AtNode {
        node: NodeId,
        command: String,
        #[source]
        source: Box<WeaveError>,
    },

    #[error("run cancelled")]
    Cancelled,

    // Translator bridge errors — recoverable, never fatal to the engine
    #[error("translation failed: {0}")]
    Translation(String),

    // Config errors
    #[error("config error: {0}")]
    Config(String),

    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WeaveError {
    /// The innermost error, with any node attribution stripped.
    pub fn root_cause(&self) -> &WeaveError {
        match self {
            WeaveError::AtNode { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The node this error was observed at, if execution attributed one.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            WeaveError::AtNode { node, .. } => Some(*node),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, WeaveError>;
