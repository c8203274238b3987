pub mod streaming_reader;
pub mod types;

pub use streaming_reader::{LogStreamer, StreamHandle};
pub use types::{StreamFilter, StreamState};
