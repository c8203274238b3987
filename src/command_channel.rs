//! Single-writer command execution and rejection classification.

pub mod channel;
pub mod classifier;

pub use channel::{shell_quote, CommandChannel, Reply};
pub use classifier::classify;
