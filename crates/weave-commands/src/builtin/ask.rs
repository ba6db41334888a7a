use futures::future::BoxFuture;

use weave_core::error::{Result, WeaveError};
use weave_core::traits::CommandHandler;
use weave_core::{ExecutionContext, Value};

/// `ask "prompt"` — send the prompt (plus any piped input as context)
/// to the run's configured text model.
pub struct AskCommand;

impl CommandHandler for AskCommand {
    fn name(&self) -> &str {
        "ask"
    }

    fn timeout_secs(&self) -> u64 {
        120
    }

    fn invoke(&self, args: Vec<String>, ctx: ExecutionContext) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            let model = ctx
                .resources()
                .model
                .clone()
                .ok_or_else(|| WeaveError::Handler {
                    command: "ask".to_string(),
                    message: "no model configured for this run".to_string(),
                })?;

            let mut prompt = args.join(" ");
            let input = ctx.input().render();
            if !input.is_empty() {
                prompt = format!("{}\n\n{}", prompt, input);
            }

            let answer = model
                .generate(prompt)
                .await
                .map_err(|e| WeaveError::Handler {
                    command: "ask".to_string(),
                    message: e.to_string(),
                })?;
            Ok(Value::text(answer))
        })
    }
}

/// `summarize` — ask the model for a concise summary of the piped input.
pub struct SummarizeCommand;

impl CommandHandler for SummarizeCommand {
    fn name(&self) -> &str {
        "summarize"
    }

    fn timeout_secs(&self) -> u64 {
        120
    }

    fn invoke(&self, _args: Vec<String>, ctx: ExecutionContext) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            AskCommand
                .invoke(vec!["Summarize the following concisely:".to_string()], ctx)
                .await
        })
    }
}
