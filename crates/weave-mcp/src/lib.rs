pub mod commands;
pub mod handler;
pub mod manager;

pub use commands::{McpCallCommand, McpConnectCommand};
pub use manager::{ConnectionState, McpManager};
