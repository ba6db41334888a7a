use futures::future::BoxFuture;

use weave_core::error::Result;
use weave_core::traits::CommandHandler;
use weave_core::{ExecutionContext, Value};

/// `uppercase` — uppercase the piped input text.
pub struct UppercaseCommand;

impl CommandHandler for UppercaseCommand {
    fn name(&self) -> &str {
        "uppercase"
    }

    fn invoke(&self, _args: Vec<String>, ctx: ExecutionContext) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move { Ok(Value::text(ctx.input().render().to_uppercase())) })
    }
}

/// `prefix "tag"` — prepend a tag to the piped input. Handy for
/// labeling branch outputs before a merge.
pub struct PrefixCommand;

impl CommandHandler for PrefixCommand {
    fn name(&self) -> &str {
        "prefix"
    }

    fn invoke(&self, args: Vec<String>, ctx: ExecutionContext) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            let tag = args.first().map(String::as_str).unwrap_or("");
            Ok(Value::text(format!("{}{}", tag, ctx.input().render())))
        })
    }
}
