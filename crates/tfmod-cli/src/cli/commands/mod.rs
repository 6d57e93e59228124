//! CLI command handlers, one file per command.

mod completions;
mod fetch;
mod plan;
mod scan;

pub use completions::run_completions;
pub use fetch::{run_fetch, FetchArgs};
pub use plan::run_plan;
pub use scan::run_scan;
