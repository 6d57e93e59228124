//! Fetch execution: batches run strictly in order, entries of a batch run
//! concurrently on a bounded pool of worker threads.

mod executor;
mod pipeline;

pub use executor::{default_parallelism, should_download, FetchExecutor, FetchFilter, FetchSummary};
pub use pipeline::{load_modules, LoadOptions, LoadReport};
