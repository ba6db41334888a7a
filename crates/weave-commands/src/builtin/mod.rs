pub mod ask;
pub mod echo;
pub mod save;
pub mod text;
