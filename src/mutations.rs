//! Operations that change device state and report an [`Outcome`].

pub mod apps;
pub mod files;
pub mod processes;
pub mod types;

pub use processes::Signal;
pub use types::{Failure, Fallback, Outcome};
