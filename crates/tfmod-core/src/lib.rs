//! tfmod core: discover Terraform module references in a source tree and fetch
//! each distinct module once, with bounded concurrency and no two concurrent
//! fetches of the same module link.

pub mod config;
pub mod fetch;
pub mod loader;
pub mod logging;
pub mod plan;
pub mod reference;
pub mod retry;
pub mod scanner;

pub use fetch::{load_modules, FetchExecutor, FetchSummary, LoadOptions, LoadReport};
pub use loader::{LoadError, ModuleContent, ModuleLoader};
pub use reference::{ModuleAddress, ModuleReference};
