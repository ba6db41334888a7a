use std::future::Future;

use tracing::debug;

use rmcp::handler::client::ClientHandler;
use rmcp::model::*;
use rmcp::service::NotificationContext;
use rmcp::RoleClient;

/// Minimal MCP client handler: identifies the client and logs server
/// notifications. Sampling and subscriptions are not supported.
pub struct WeaveClientHandler {
    server_name: String,
}

impl WeaveClientHandler {
    pub fn new(server_name: &str) -> Self {
        Self {
            server_name: server_name.to_string(),
        }
    }
}

#[allow(clippy::manual_async_fn)]
impl ClientHandler for WeaveClientHandler {
    fn on_logging_message(
        &self,
        params: LoggingMessageNotificationParam,
        _ctx: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        async move {
            debug!(
                server = %self.server_name,
                level = ?params.level,
                "MCP log: {}",
                params.data
            );
        }
    }

    fn on_progress(
        &self,
        params: ProgressNotificationParam,
        _ctx: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        async move {
            debug!(
                server = %self.server_name,
                progress = params.progress,
                total = ?params.total,
                "MCP progress"
            );
        }
    }

    fn get_info(&self) -> ClientInfo {
        ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "weave".into(),
                title: None,
                version: env!("CARGO_PKG_VERSION").into(),
                description: None,
                icons: None,
                website_url: None,
            },
        }
    }
}
