use futures::future::BoxFuture;

use weave_core::error::Result;
use weave_core::traits::CommandHandler;
use weave_core::{ExecutionContext, Value};

/// `echo "text"...` — emit the joined arguments, or pass the piped
/// input through unchanged when called with none.
pub struct EchoCommand;

impl CommandHandler for EchoCommand {
    fn name(&self) -> &str {
        "echo"
    }

    fn invoke(&self, args: Vec<String>, ctx: ExecutionContext) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            if args.is_empty() {
                Ok(ctx.input().clone())
            } else {
                Ok(Value::text(args.join(" ")))
            }
        })
    }
}
