use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{info, warn};

use rmcp::model::{CallToolRequestParams, RawContent};
use rmcp::service::RunningService;
use rmcp::{RoleClient, ServiceExt};

use weave_core::error::{ConnectionError, Result};
use weave_core::traits::ConnectionRegistry;
use weave_core::Value;

use crate::handler::WeaveClientHandler;

type McpConnection = RunningService<RoleClient, WeaveClientHandler>;

/// Lifecycle of one named connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Closed,
    Failed,
}

struct Entry {
    state: ConnectionState,
    call_timeout_secs: u64,
    client: Arc<Mutex<Option<McpConnection>>>,
}

impl Entry {
    fn new(call_timeout_secs: u64) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            call_timeout_secs,
            client: Arc::new(Mutex::new(None)),
        }
    }
}

/// Manages named, long-lived connections to MCP tool servers.
///
/// Connections outlive individual nodes: they are created by
/// `mcp_connect` execution and torn down at run end or on explicit
/// close. Calls on one connection are serialized — the per-connection
/// lock is held for the duration of a tool call, so no concurrent
/// in-flight requests share a connection.
pub struct McpManager {
    entries: Mutex<HashMap<String, Entry>>,
    call_timeout_secs: u64,
}

impl McpManager {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            call_timeout_secs: 120,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_secs = timeout.as_secs();
        self
    }

    /// Launch a tool server as a child process and perform the MCP
    /// handshake. The entry moves `Disconnected -> Connecting -> Ready`,
    /// or to `Failed` on spawn or handshake error. Reconnecting an
    /// existing name replaces its connection. `timeout_secs` sets this
    /// connection's per-tool-call deadline; `None` keeps the manager
    /// default.
    pub async fn connect(
        &self,
        name: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        timeout_secs: Option<u64>,
    ) -> Result<()> {
        {
            let mut entries = self.entries.lock().await;
            let entry = entries
                .entry(name.to_string())
                .or_insert_with(|| Entry::new(self.call_timeout_secs));
            if entry.state == ConnectionState::Connecting {
                return Err(ConnectionError::Transport {
                    name: name.to_string(),
                    message: "connection attempt already in progress".to_string(),
                }
                .into());
            }
            entry.state = ConnectionState::Connecting;
            entry.call_timeout_secs = timeout_secs.unwrap_or(self.call_timeout_secs);
        }

        let handler = WeaveClientHandler::new(name);
        let mut cmd = tokio::process::Command::new(command);
        cmd.args(args);
        for (k, v) in env {
            cmd.env(k, v);
        }

        let launched: Result<McpConnection> = async {
            let transport = rmcp::transport::TokioChildProcess::new(cmd).map_err(|e| {
                ConnectionError::Transport {
                    name: name.to_string(),
                    message: format!("failed to spawn {}: {}", command, e),
                }
            })?;
            let client = handler.serve(transport).await.map_err(|e| {
                ConnectionError::Transport {
                    name: name.to_string(),
                    message: format!("handshake failed: {}", e),
                }
            })?;
            Ok(client)
        }
        .await;

        let mut entries = self.entries.lock().await;
        let entry = entries
            .entry(name.to_string())
            .or_insert_with(|| Entry::new(self.call_timeout_secs));
        match launched {
            Ok(client) => {
                *entry.client.lock().await = Some(client);
                entry.state = ConnectionState::Ready;
                info!(connection = %name, command = %command, "MCP server connected");
                Ok(())
            }
            Err(e) => {
                entry.state = ConnectionState::Failed;
                warn!(connection = %name, error = %e, "MCP connect failed");
                Err(e)
            }
        }
    }

    /// Call a named tool on a `Ready` connection.
    pub async fn call(&self, name: &str, tool: &str, args: serde_json::Value) -> Result<Value> {
        let (slot, timeout_secs) = {
            let entries = self.entries.lock().await;
            match entries.get(name) {
                Some(entry) if entry.state == ConnectionState::Ready => {
                    (Arc::clone(&entry.client), entry.call_timeout_secs)
                }
                _ => return Err(ConnectionError::NotReady(name.to_string()).into()),
            }
        };

        // Holding the slot lock across the request serializes in-flight
        // calls per connection.
        let guard = slot.lock().await;
        let client = guard
            .as_ref()
            .ok_or_else(|| ConnectionError::NotReady(name.to_string()))?;

        let params = CallToolRequestParams {
            name: tool.to_string().into(),
            arguments: args.as_object().cloned(),
            meta: None,
            task: None,
        };

        let timeout = Duration::from_secs(timeout_secs);
        let result = tokio::time::timeout(timeout, client.call_tool(params))
            .await
            .map_err(|_| ConnectionError::Timeout {
                name: name.to_string(),
                timeout_secs,
            })?
            .map_err(|e| ConnectionError::Transport {
                name: name.to_string(),
                message: format!("tool call '{}' failed: {}", tool, e),
            })?;

        let content: Vec<String> = result
            .content
            .iter()
            .map(|c| match c.raw {
                RawContent::Text(ref t) => t.text.to_string(),
                _ => format!("{:?}", c.raw),
            })
            .collect();
        Ok(Value::text(content.join("\n")))
    }

    /// Current lifecycle state of a named connection.
    pub async fn state(&self, name: &str) -> ConnectionState {
        let entries = self.entries.lock().await;
        entries
            .get(name)
            .map(|e| e.state)
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// The per-tool-call deadline in effect for a named connection.
    pub async fn call_timeout(&self, name: &str) -> Option<Duration> {
        let entries = self.entries.lock().await;
        entries
            .get(name)
            .map(|e| Duration::from_secs(e.call_timeout_secs))
    }

    /// Close one connection; a no-op for unknown names.
    pub async fn close(&self, name: &str) -> Result<()> {
        let slot = {
            let mut entries = self.entries.lock().await;
            match entries.get_mut(name) {
                Some(entry) => {
                    entry.state = ConnectionState::Closed;
                    Arc::clone(&entry.client)
                }
                None => return Ok(()),
            }
        };
        if let Some(mut client) = slot.lock().await.take() {
            let _ = client.close().await;
            info!(connection = %name, "MCP server disconnected");
        }
        Ok(())
    }

    /// Tear down every connection at run end.
    pub async fn close_all(&self) -> Result<()> {
        let names: Vec<String> = {
            let entries = self.entries.lock().await;
            entries.keys().cloned().collect()
        };
        for name in names {
            self.close(&name).await?;
        }
        Ok(())
    }
}

impl Default for McpManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry for McpManager {
    fn connect(&self, name: String, launch_spec: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut words = launch_spec.split_whitespace();
            let command = words.next().ok_or_else(|| ConnectionError::Transport {
                name: name.clone(),
                message: "empty launch spec".to_string(),
            })?;
            let args: Vec<String> = words.map(str::to_string).collect();
            McpManager::connect(self, &name, command, &args, &HashMap::new(), None).await
        })
    }

    fn call(
        &self,
        name: String,
        tool: String,
        args: serde_json::Value,
    ) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move { McpManager::call(self, &name, &tool, args).await })
    }

    fn close(&self, name: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { McpManager::close(self, &name).await })
    }

    fn close_all(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { McpManager::close_all(self).await })
    }
}
