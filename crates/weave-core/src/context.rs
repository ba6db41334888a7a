use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::traits::{ConnectionRegistry, NoConnections, TextModel};
use crate::value::Value;

/// Run-scoped resources shared by every execution unit of one run.
/// Only explicitly external resources live here; branch-local data is
/// carried by `ExecutionContext` and never shared.
#[derive(Clone)]
pub struct RunResources {
    pub connections: Arc<dyn ConnectionRegistry>,
    pub model: Option<Arc<dyn TextModel>>,
    pub workdir: PathBuf,
    pub cancel: CancellationToken,
    /// Per-command deadline override; handlers fall back to their own default.
    pub command_timeout: Option<Duration>,
}

impl RunResources {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            connections: Arc::new(NoConnections),
            model: None,
            workdir: workdir.into(),
            cancel: CancellationToken::new(),
            command_timeout: None,
        }
    }

    pub fn with_connections(mut self, connections: Arc<dyn ConnectionRegistry>) -> Self {
        self.connections = connections;
        self
    }

    pub fn with_model(mut self, model: Arc<dyn TextModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }
}

impl Default for RunResources {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Per-branch carrier of the current value flowing along an edge, plus
/// the shared run resources. Forked at every parallel group entry, so a
/// branch never observes a sibling's mutations.
#[derive(Clone)]
pub struct ExecutionContext {
    input: Value,
    shared: Arc<RunResources>,
}

impl ExecutionContext {
    pub fn new(resources: RunResources) -> Self {
        Self {
            input: Value::Unit,
            shared: Arc::new(resources),
        }
    }

    pub fn input(&self) -> &Value {
        &self.input
    }

    pub fn resources(&self) -> &RunResources {
        &self.shared
    }

    /// Same run resources, new current value. Used at every pipe edge.
    pub fn with_input(&self, input: Value) -> Self {
        Self {
            input,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Independent copy for one parallel branch: the value is copied, the
    /// run resources stay shared, and cancellation is scoped to a child
    /// token so a failing sibling can stop this branch cooperatively.
    pub fn fork(&self, cancel: CancellationToken) -> Self {
        let mut resources = (*self.shared).clone();
        resources.cancel = cancel;
        Self {
            input: self.input.clone(),
            shared: Arc::new(resources),
        }
    }

    pub fn cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_input_shares_resources() {
        let ctx = ExecutionContext::new(RunResources::new("/tmp"));
        let next = ctx.with_input(Value::text("out"));
        assert_eq!(next.input().as_text(), Some("out"));
        assert!(Arc::ptr_eq(&ctx.shared, &next.shared));
    }

    #[test]
    fn test_fork_isolates_cancellation() {
        let ctx = ExecutionContext::new(RunResources::new("."));
        let child = CancellationToken::new();
        let branch = ctx.fork(child.clone());

        child.cancel();
        assert!(branch.cancelled());
        assert!(!ctx.cancelled());
    }

    #[test]
    fn test_fork_copies_input() {
        let ctx = ExecutionContext::new(RunResources::new(".")).with_input(Value::text("shared"));
        let branch = ctx.fork(CancellationToken::new());
        assert_eq!(branch.input(), ctx.input());
    }
}
