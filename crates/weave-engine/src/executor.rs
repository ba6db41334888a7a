use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use weave_core::error::{GraphError, Result, WeaveError};
use weave_core::{ExecutionContext, Node, NodeId, NodeKind, Script, Value};

use crate::dispatch::CommandRegistry;
use crate::merge::{BranchOutput, ConcatAggregator, MergeAggregator};

/// Walks the task graph with structured concurrency.
///
/// Sequential edges resolve strictly in order: a consumer never starts
/// before its producer's result exists. A parallel group forks one task
/// per branch over an isolated context copy and joins at its merge
/// barrier. Failure policy is fail-fast: the first observed error
/// cancels sibling branches cooperatively and aborts the run.
#[derive(Clone)]
pub struct Executor {
    registry: Arc<CommandRegistry>,
    aggregator: Arc<dyn MergeAggregator>,
    strict: bool,
}

impl Executor {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self {
            registry,
            aggregator: Arc::new(ConcatAggregator::default()),
            strict: false,
        }
    }

    /// Replace the default concatenating merge policy.
    pub fn with_aggregator(mut self, aggregator: Arc<dyn MergeAggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Resolve every command name before the first node runs.
    pub fn with_strict_dispatch(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Execute a parsed script. Top-level pipelines run in declaration
    /// order, each starting from the run's initial input; the last
    /// pipeline's output is the run's result.
    pub async fn run(&self, script: &Script, ctx: ExecutionContext) -> Result<Value> {
        script.validate()?;
        if self.strict {
            self.registry.validate_script(script)?;
        }
        info!(
            pipelines = script.pipelines.len(),
            nodes = script.node_count,
            "Starting pipeline run"
        );

        let mut last = Value::Unit;
        for pipeline in &script.pipelines {
            last = self.exec(pipeline, ctx.clone()).await?;
        }
        Ok(last)
    }

    fn exec<'a>(&'a self, node: &'a Node, ctx: ExecutionContext) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            match &node.kind {
                NodeKind::Command { name, args } => {
                    if ctx.cancelled() {
                        return Err(WeaveError::Cancelled);
                    }
                    debug!(node = %node.id, command = %name, "Executing command");
                    let cancel = ctx.resources().cancel.clone();
                    let result = tokio::select! {
                        _ = cancel.cancelled() => Err(WeaveError::Cancelled),
                        r = self.registry.invoke(name, args.clone(), ctx) => r,
                    };
                    result.map_err(|e| attribute(e, node.id, name))
                }
                NodeKind::Pipe { producer, consumer } => {
                    let out = self.exec(producer, ctx.clone()).await?;
                    self.exec(consumer, ctx.with_input(out)).await
                }
                NodeKind::Merge { group } => {
                    let NodeKind::Parallel { branches } = &group.kind else {
                        return Err(GraphError::MergeWithoutParallel { node: node.id }.into());
                    };
                    let outputs = self.exec_parallel(branches, &ctx).await?;
                    Ok(self.aggregator.combine(outputs))
                }
                NodeKind::Parallel { branches } => {
                    // Unmerged group at the end of a top-level pipeline:
                    // run and join; nothing downstream consumes the result.
                    let outputs = self.exec_parallel(branches, &ctx).await?;
                    Ok(self.aggregator.combine(outputs))
                }
            }
        })
    }

    /// Fork one task per branch, join all, and return outputs in branch
    /// declaration order regardless of completion order.
    async fn exec_parallel(
        &self,
        branches: &[Node],
        ctx: &ExecutionContext,
    ) -> Result<Vec<BranchOutput>> {
        let group_cancel = ctx.resources().cancel.child_token();
        let mut set: JoinSet<(usize, Result<Value>)> = JoinSet::new();

        for (index, branch) in branches.iter().enumerate() {
            let branch = branch.clone();
            let branch_ctx = ctx.fork(group_cancel.clone());
            let exec = self.clone();
            set.spawn(async move {
                let result = exec.exec(&branch, branch_ctx).await;
                (index, result)
            });
        }

        let mut collected: Vec<(usize, Value)> = Vec::with_capacity(branches.len());
        let mut first_error: Option<WeaveError> = None;

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, Ok(value))) => collected.push((index, value)),
                Ok((index, Err(e))) => {
                    if first_error.is_none() {
                        warn!(branch = index, error = %e, "Branch failed, cancelling siblings");
                        group_cancel.cancel();
                        first_error = Some(e);
                    }
                }
                Err(join_err) => {
                    if first_error.is_none() {
                        group_cancel.cancel();
                        first_error = Some(WeaveError::Handler {
                            command: "branch".to_string(),
                            message: join_err.to_string(),
                        });
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        collected.sort_by_key(|(index, _)| *index);
        Ok(collected
            .into_iter()
            .map(|(index, value)| BranchOutput { index, value })
            .collect())
    }
}

/// Attach the failing node's identity, once, at the command where the
/// error was first observed.
fn attribute(err: WeaveError, node: NodeId, command: &str) -> WeaveError {
    match err {
        already @ WeaveError::AtNode { .. } => already,
        WeaveError::Cancelled => WeaveError::Cancelled,
        other => WeaveError::AtNode {
            node,
            command: command.to_string(),
            source: Box::new(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use weave_core::traits::CommandHandler;
    use weave_core::RunResources;

    /// Records every invocation and echoes its name plus input.
    struct Probe {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl CommandHandler for Probe {
        fn name(&self) -> &str {
            &self.name
        }

        fn invoke(
            &self,
            _args: Vec<String>,
            ctx: ExecutionContext,
        ) -> BoxFuture<'_, Result<Value>> {
            Box::pin(async move {
                self.log.lock().unwrap().push(self.name.clone());
                Ok(Value::text(format!("{}<{}", self.name, ctx.input().render())))
            })
        }
    }

    fn setup(names: &[&str]) -> (Executor, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CommandRegistry::new();
        for n in names {
            registry.register(Probe {
                name: n.to_string(),
                log: Arc::clone(&log),
            });
        }
        (Executor::new(Arc::new(registry)), log)
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(RunResources::new("."))
    }

    #[tokio::test]
    async fn test_pipe_passes_producer_output() {
        let (executor, log) = setup(&["a", "b"]);
        let script = weave_parser::parse("a -> b").unwrap();
        let out = executor.run(&script, ctx()).await.unwrap();
        assert_eq!(out.as_text(), Some("b<a<"));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_merge_combines_in_declaration_order() {
        let (executor, _log) = setup(&["a", "b", "c"]);
        let script = weave_parser::parse("parallel {\n a\n b\n c\n} -> merge").unwrap();
        let out = executor.run(&script, ctx()).await.unwrap();
        assert_eq!(out.as_text(), Some("a<\n---\nb<\n---\nc<"));
    }

    #[tokio::test]
    async fn test_strict_dispatch_runs_nothing() {
        let (executor, log) = setup(&["a"]);
        let script = weave_parser::parse("a -> mystery").unwrap();
        let err = executor
            .with_strict_dispatch(true)
            .run(&script, ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::UnknownCommand(n) if n == "mystery"));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pre_cancelled_run() {
        let (executor, log) = setup(&["a"]);
        let script = weave_parser::parse("a").unwrap();
        let resources = RunResources::new(".");
        resources.cancel.cancel();
        let err = executor
            .run(&script, ExecutionContext::new(resources))
            .await
            .unwrap_err();
        assert!(matches!(err, WeaveError::Cancelled));
        assert!(log.lock().unwrap().is_empty());
    }
}
