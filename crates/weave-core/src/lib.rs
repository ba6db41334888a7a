pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod traits;
pub mod value;

pub use config::AppConfig;
pub use context::{ExecutionContext, RunResources};
pub use error::{ConnectionError, GraphError, ParseError, Result, WeaveError};
pub use graph::{Node, NodeId, NodeKind, Script};
pub use value::Value;
