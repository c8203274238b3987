//! Snapshot queries that answer for many items in few round trips.

pub mod queries;

pub use queries::{
    app_info, is_running, list_apps, list_processes, package_set, process_info, running_set,
    PackageScope,
};
