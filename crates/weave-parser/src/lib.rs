pub mod calculus;
pub mod script;
pub mod token;

pub use script::parse;
