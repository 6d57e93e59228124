//! Scan → dedup → plan → fetch, in one call.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use super::executor::{FetchExecutor, FetchFilter, FetchSummary};
use crate::loader::ModuleLoader;
use crate::plan::{distinct_modules, plan_batches};
use crate::scanner::ModuleScanner;

/// Knobs for [`load_modules`]. `None` means the executor's default.
#[derive(Default)]
pub struct LoadOptions {
    pub scanner: ModuleScanner,
    pub parallelism: Option<usize>,
    pub filter: Option<FetchFilter>,
}

impl std::fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("scanner", &self.scanner)
            .field("parallelism", &self.parallelism)
            .field("custom_filter", &self.filter.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub files_scanned: usize,
    pub files_skipped: usize,
    /// `module` blocks still open at end of file; dropped.
    pub incomplete_blocks: usize,
    /// Directory entries the walk could not read.
    pub walk_errors: usize,
    pub references_found: usize,
    pub distinct_modules: usize,
    pub fetch: FetchSummary,
}

/// Finds every module referenced under `root` and fetches each distinct
/// (link, version) once, never fetching the same link twice at the same time.
///
/// The loader must already be configured for `root`; it is only read from here on.
pub fn load_modules(root: &Path, loader: Arc<dyn ModuleLoader>, options: LoadOptions) -> LoadReport {
    tracing::info!("loading modules under {}", root.display());
    let scan = options.scanner.scan(root);
    let references_found = scan.references.len();

    let distinct = distinct_modules(scan.references);
    let distinct_count = distinct.len();
    let batches = plan_batches(distinct);

    let mut executor = FetchExecutor::new(loader);
    if let Some(n) = options.parallelism {
        executor = executor.with_parallelism(n);
    }
    if let Some(filter) = options.filter {
        executor = executor.with_shared_filter(filter);
    }
    let fetch = executor.execute(&batches);

    LoadReport {
        files_scanned: scan.files_scanned,
        files_skipped: scan.files_skipped,
        incomplete_blocks: scan.incomplete_blocks,
        walk_errors: scan.walk_errors,
        references_found,
        distinct_modules: distinct_count,
        fetch,
    }
}
