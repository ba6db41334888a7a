use futures::future::BoxFuture;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::value::Value;

/// Command handler — the external collaborator implementing one command's
/// behavior. The engine treats the name as an opaque capability key and
/// forwards arguments without interpreting them.
pub trait CommandHandler: Send + Sync + 'static {
    /// Command name (the identifier used in scripts).
    fn name(&self) -> &str;

    /// Execute the command with its script arguments and per-branch context.
    fn invoke(&self, args: Vec<String>, ctx: ExecutionContext) -> BoxFuture<'_, Result<Value>>;

    /// Timeout in seconds for this command.
    fn timeout_secs(&self) -> u64 {
        60
    }
}

/// Text generation — the translator boundary. A single `generate` call;
/// failures surface as `WeaveError::Translation`.
pub trait TextModel: Send + Sync + 'static {
    fn generate(&self, prompt: String) -> BoxFuture<'_, Result<String>>;
}

/// Named, long-lived tool-server connections, shared across a run.
/// The engine depends on this seam only; the MCP implementation lives
/// in its own crate.
pub trait ConnectionRegistry: Send + Sync + 'static {
    /// Launch and handshake a named connection from a launch spec
    /// (program and arguments as one whitespace-separated string).
    fn connect(&self, name: String, launch_spec: String) -> BoxFuture<'_, Result<()>>;

    /// Call a named tool on a ready connection.
    fn call(
        &self,
        name: String,
        tool: String,
        args: serde_json::Value,
    ) -> BoxFuture<'_, Result<Value>>;

    /// Close one connection.
    fn close(&self, name: String) -> BoxFuture<'_, Result<()>>;

    /// Tear down every connection at run end.
    fn close_all(&self) -> BoxFuture<'_, Result<()>>;
}

/// Registry used when no connection manager is wired in: every operation
/// reports the connection as not ready.
pub struct NoConnections;

impl ConnectionRegistry for NoConnections {
    fn connect(&self, name: String, _launch_spec: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            Err(crate::error::ConnectionError::Transport {
                name,
                message: "no connection manager configured".to_string(),
            }
            .into())
        })
    }

    fn call(
        &self,
        name: String,
        _tool: String,
        _args: serde_json::Value,
    ) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move { Err(crate::error::ConnectionError::NotReady(name).into()) })
    }

    fn close(&self, _name: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn close_all(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}
