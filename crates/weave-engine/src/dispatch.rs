use std::collections::HashMap;
use std::sync::Arc;

use weave_core::error::{Result, WeaveError};
use weave_core::traits::CommandHandler;
use weave_core::{ExecutionContext, Script, Value};

/// Registry of command handlers, resolved once before a run starts.
/// Pure routing: name resolution and argument forwarding, no knowledge
/// of what any command does.
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under its own name.
    pub fn register(&mut self, handler: impl CommandHandler) {
        let name = handler.name().to_string();
        self.handlers.insert(name, Arc::new(handler));
    }

    pub fn register_arc(&mut self, handler: Arc<dyn CommandHandler>) {
        let name = handler.name().to_string();
        self.handlers.insert(name, handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Invoke a command by name, enforcing its deadline. The run-level
    /// timeout from the context overrides the handler's own default.
    pub async fn invoke(
        &self,
        name: &str,
        args: Vec<String>,
        ctx: ExecutionContext,
    ) -> Result<Value> {
        let handler = self
            .get(name)
            .ok_or_else(|| WeaveError::UnknownCommand(name.to_string()))?;

        let timeout = ctx
            .resources()
            .command_timeout
            .unwrap_or_else(|| std::time::Duration::from_secs(handler.timeout_secs()));

        match tokio::time::timeout(timeout, handler.invoke(args, ctx)).await {
            Ok(result) => result,
            Err(_) => Err(WeaveError::Timeout {
                command: name.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    /// Strict mode: resolve every command the script names before any
    /// node runs.
    pub fn validate_script(&self, script: &Script) -> Result<()> {
        for name in script.command_names() {
            if !self.handlers.contains_key(name) {
                return Err(WeaveError::UnknownCommand(name.to_string()));
            }
        }
        Ok(())
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use weave_core::RunResources;

    struct Sleepy;

    impl CommandHandler for Sleepy {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn invoke(&self, _args: Vec<String>, _ctx: ExecutionContext) -> BoxFuture<'_, Result<Value>> {
            Box::pin(async {
                tokio::time::sleep(std::time::Duration::from_secs(120)).await;
                Ok(Value::Unit)
            })
        }

        fn timeout_secs(&self) -> u64 {
            1
        }
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(RunResources::new("."))
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let registry = CommandRegistry::new();
        let err = registry.invoke("nope", vec![], ctx()).await.unwrap_err();
        assert!(matches!(err, WeaveError::UnknownCommand(name) if name == "nope"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_deadline() {
        let mut registry = CommandRegistry::new();
        registry.register(Sleepy);
        let err = registry.invoke("sleepy", vec![], ctx()).await.unwrap_err();
        assert!(matches!(
            err,
            WeaveError::Timeout { command, timeout_secs: 1 } if command == "sleepy"
        ));
    }

    #[test]
    fn test_validate_script_reports_unknown() {
        let registry = CommandRegistry::new();
        let script = weave_parser::parse("search \"x\" -> summarize").unwrap();
        let err = registry.validate_script(&script).unwrap_err();
        assert!(matches!(err, WeaveError::UnknownCommand(name) if name == "search"));
    }
}
