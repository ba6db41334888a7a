pub mod builtin;

use weave_engine::CommandRegistry;

pub use builtin::ask::{AskCommand, SummarizeCommand};
pub use builtin::echo::EchoCommand;
pub use builtin::save::SaveCommand;
pub use builtin::text::{PrefixCommand, UppercaseCommand};

/// Register every built-in command handler.
pub fn register_builtins(registry: &mut CommandRegistry) {
    registry.register(EchoCommand);
    registry.register(UppercaseCommand);
    registry.register(PrefixCommand);
    registry.register(SaveCommand);
    registry.register(AskCommand);
    registry.register(SummarizeCommand);
}
