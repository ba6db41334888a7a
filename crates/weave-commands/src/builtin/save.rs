use futures::future::BoxFuture;
use tracing::info;

use weave_core::error::{Result, WeaveError};
use weave_core::traits::CommandHandler;
use weave_core::{ExecutionContext, Value};

/// `save "path"` — write the piped input to a file under the run's
/// working directory, passing the input through unchanged.
pub struct SaveCommand;

impl CommandHandler for SaveCommand {
    fn name(&self) -> &str {
        "save"
    }

    fn invoke(&self, args: Vec<String>, ctx: ExecutionContext) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            let path = args.first().ok_or_else(|| WeaveError::Handler {
                command: "save".to_string(),
                message: "missing argument: path".to_string(),
            })?;
            let full = ctx.resources().workdir.join(path);
            if let Some(parent) = full.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| WeaveError::Handler {
                        command: "save".to_string(),
                        message: format!("cannot create {}: {}", parent.display(), e),
                    })?;
            }
            tokio::fs::write(&full, ctx.input().render())
                .await
                .map_err(|e| WeaveError::Handler {
                    command: "save".to_string(),
                    message: format!("cannot write {}: {}", full.display(), e),
                })?;
            info!(path = %full.display(), "Saved pipeline output");
            Ok(ctx.input().clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::RunResources;

    #[tokio::test]
    async fn test_save_writes_and_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::new(RunResources::new(dir.path()))
            .with_input(Value::text("contents"));
        let out = SaveCommand
            .invoke(vec!["out/result.txt".into()], ctx)
            .await
            .unwrap();
        assert_eq!(out.as_text(), Some("contents"));
        let written = std::fs::read_to_string(dir.path().join("out/result.txt")).unwrap();
        assert_eq!(written, "contents");
    }

    #[tokio::test]
    async fn test_save_requires_path() {
        let ctx = ExecutionContext::new(RunResources::new("."));
        let err = SaveCommand.invoke(vec![], ctx).await.unwrap_err();
        assert!(matches!(err, WeaveError::Handler { .. }));
    }
}
