//! Input injection and screen capture.

pub mod input;
pub mod types;

pub use input::{escape_input_text, DEFAULT_SWIPE_MILLIS};
pub use types::{KeyCode, ScreenSize};
