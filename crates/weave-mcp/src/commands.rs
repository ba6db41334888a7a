use std::sync::Arc;

use futures::future::BoxFuture;

use weave_core::error::{Result, WeaveError};
use weave_core::traits::{CommandHandler, ConnectionRegistry};
use weave_core::{ExecutionContext, Value};

use crate::manager::McpManager;

fn arg_at(args: &[String], index: usize, what: &str, command: &str) -> Result<String> {
    args.get(index).cloned().ok_or_else(|| WeaveError::Handler {
        command: command.to_string(),
        message: format!("missing argument: {}", what),
    })
}

/// `mcp_connect "name" "launch-spec"` — open a named tool-server
/// connection that persists for the rest of the run.
pub struct McpConnectCommand {
    manager: Arc<McpManager>,
}

impl McpConnectCommand {
    pub fn new(manager: Arc<McpManager>) -> Self {
        Self { manager }
    }
}

impl CommandHandler for McpConnectCommand {
    fn name(&self) -> &str {
        "mcp_connect"
    }

    fn invoke(&self, args: Vec<String>, ctx: ExecutionContext) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            let name = arg_at(&args, 0, "connection name", "mcp_connect")?;
            let launch_spec = arg_at(&args, 1, "launch spec", "mcp_connect")?;
            ConnectionRegistry::connect(self.manager.as_ref(), name, launch_spec).await?;
            // Pass the upstream value through so the pipeline's data flow
            // is unaffected by connection setup.
            Ok(ctx.input().clone())
        })
    }
}

/// `mcp "name:tool" "json-args"` — call a tool on a ready connection.
pub struct McpCallCommand {
    manager: Arc<McpManager>,
}

impl McpCallCommand {
    pub fn new(manager: Arc<McpManager>) -> Self {
        Self { manager }
    }
}

impl CommandHandler for McpCallCommand {
    fn name(&self) -> &str {
        "mcp"
    }

    fn invoke(&self, args: Vec<String>, _ctx: ExecutionContext) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            let target = arg_at(&args, 0, "\"connection:tool\" target", "mcp")?;
            let (name, tool) = target.split_once(':').ok_or_else(|| WeaveError::Handler {
                command: "mcp".to_string(),
                message: format!("target '{}' is not of the form \"connection:tool\"", target),
            })?;
            let raw_args = args.get(1).map(String::as_str).unwrap_or("{}");
            let json_args: serde_json::Value =
                serde_json::from_str(raw_args).map_err(|e| WeaveError::Handler {
                    command: "mcp".to_string(),
                    message: format!("tool arguments are not valid JSON: {}", e),
                })?;
            self.manager.call(name, tool, json_args).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::{ConnectionError, RunResources};

    fn ctx(manager: Arc<McpManager>) -> ExecutionContext {
        ExecutionContext::new(RunResources::new(".").with_connections(manager))
    }

    #[tokio::test]
    async fn test_mcp_call_requires_ready_connection() {
        let manager = Arc::new(McpManager::new());
        let cmd = McpCallCommand::new(Arc::clone(&manager));
        let err = cmd
            .invoke(vec!["x:tool".into(), "{}".into()], ctx(manager))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WeaveError::Connection(ConnectionError::NotReady(name)) if name == "x"
        ));
    }

    #[tokio::test]
    async fn test_mcp_call_rejects_bad_target() {
        let manager = Arc::new(McpManager::new());
        let cmd = McpCallCommand::new(Arc::clone(&manager));
        let err = cmd
            .invoke(vec!["no-colon".into()], ctx(manager))
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::Handler { .. }));
    }

    #[tokio::test]
    async fn test_mcp_call_rejects_bad_json() {
        let manager = Arc::new(McpManager::new());
        let cmd = McpCallCommand::new(Arc::clone(&manager));
        let err = cmd
            .invoke(vec!["x:tool".into(), "not json".into()], ctx(manager))
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::Handler { .. }));
    }

    #[tokio::test]
    async fn test_mcp_connect_requires_two_args() {
        let manager = Arc::new(McpManager::new());
        let cmd = McpConnectCommand::new(Arc::clone(&manager));
        let err = cmd
            .invoke(vec!["only-name".into()], ctx(manager))
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::Handler { .. }));
    }
}
