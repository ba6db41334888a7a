pub mod dispatch;
pub mod executor;
pub mod merge;

pub use dispatch::CommandRegistry;
pub use executor::Executor;
pub use merge::{BranchOutput, ConcatAggregator, LabeledAggregator, MergeAggregator};
