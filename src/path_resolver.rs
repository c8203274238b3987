//! Symlink-aware remote paths.
//!
//! Callers always see paths as they asked for them; the resolved path is only
//! used to run the listing.

pub mod directory;
pub mod resolver;

pub use directory::{list_directory, DirectoryListing};
pub use resolver::{join_remote, normalize_display_path, PathResolver};
