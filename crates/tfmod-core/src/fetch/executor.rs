//! Batch-by-batch fetch executor.
//!
//! A batch is fully joined before the next one starts. Failures are logged and
//! counted at the task boundary; nothing a loader does can abort the run.

use serde::Serialize;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::loader::{is_local_path, LoadError, ModuleLoader};
use crate::plan::Batch;
use crate::reference::ModuleReference;

/// Decides whether a link is fetched at all.
pub type FetchFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Default filter: everything except local paths (`./`, `../`, `/`).
pub fn should_download(link: &str) -> bool {
    !is_local_path(link)
}

/// Worker count when none is configured: the machine's available parallelism.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Counters for one run. Which module failed is only in the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchSummary {
    pub batches: usize,
    pub dispatched: usize,
    pub loaded: usize,
    pub not_loaded: usize,
    pub failed: usize,
    /// Rejected by the filter; never handed to the loader.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    Loaded,
    NotLoaded,
    Failed,
}

pub struct FetchExecutor {
    loader: Arc<dyn ModuleLoader>,
    parallelism: usize,
    filter: FetchFilter,
}

impl std::fmt::Debug for FetchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchExecutor")
            .field("parallelism", &self.parallelism)
            .finish_non_exhaustive()
    }
}

impl FetchExecutor {
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            loader,
            parallelism: default_parallelism(),
            filter: Arc::new(should_download),
        }
    }

    /// Upper bound on concurrent fetches within a batch (at least 1).
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.filter = Arc::new(filter);
        self
    }

    pub fn with_shared_filter(mut self, filter: FetchFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Runs every batch in order. Returns once the last batch has finished.
    pub fn execute(&self, batches: &[Batch]) -> FetchSummary {
        let mut summary = FetchSummary {
            batches: batches.len(),
            ..FetchSummary::default()
        };

        for (index, batch) in batches.iter().enumerate() {
            let eligible: Vec<ModuleReference> = batch
                .references()
                .filter(|m| (self.filter)(m.link()))
                .cloned()
                .collect();
            summary.skipped += batch.len() - eligible.len();
            if eligible.is_empty() {
                debug!(batch = index, "nothing to fetch in batch");
                continue;
            }
            debug!(batch = index, modules = eligible.len(), "starting batch");
            self.run_batch(eligible, &mut summary);
        }

        info!(
            "fetch complete: {} loaded, {} not loaded, {} failed, {} skipped in {} batch(es)",
            summary.loaded, summary.not_loaded, summary.failed, summary.skipped, summary.batches
        );
        summary
    }

    /// Drains `modules` with a bounded worker pool and joins every worker.
    fn run_batch(&self, modules: Vec<ModuleReference>, summary: &mut FetchSummary) {
        let count = modules.len();
        summary.dispatched += count;
        let work: Arc<Mutex<VecDeque<ModuleReference>>> =
            Arc::new(Mutex::new(modules.into_iter().collect()));
        let (tx, rx) = mpsc::channel();
        let num_workers = self.parallelism.min(count);
        let mut handles = Vec::with_capacity(num_workers);
        for _ in 0..num_workers {
            let work = Arc::clone(&work);
            let tx = tx.clone();
            let loader = Arc::clone(&self.loader);
            handles.push(std::thread::spawn(move || loop {
                let next = work.lock().unwrap_or_else(|p| p.into_inner()).pop_front();
                let Some(module) = next else {
                    break;
                };
                let _ = tx.send(fetch_one(loader.as_ref(), &module));
            }));
        }
        drop(tx);

        let mut received = 0usize;
        while received < count {
            match rx.recv() {
                Ok(outcome) => {
                    received += 1;
                    match outcome {
                        TaskOutcome::Loaded => summary.loaded += 1,
                        TaskOutcome::NotLoaded => summary.not_loaded += 1,
                        TaskOutcome::Failed => summary.failed += 1,
                    }
                }
                Err(_) => {
                    warn!("worker result channel closed (worker may have panicked)");
                    summary.failed += count - received;
                    break;
                }
            }
        }
        for h in handles {
            if h.join().is_err() {
                warn!("fetch worker panicked");
            }
        }
    }
}

fn fetch_one(loader: &dyn ModuleLoader, module: &ModuleReference) -> TaskOutcome {
    let address = module.address();
    info!("downloading module {}", address);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        loader.load(module.source_dir(), module.link(), module.effective_version())
    }))
    .unwrap_or_else(|payload| Err(LoadError::Panicked(panic_message(payload.as_ref()))));

    match result {
        Ok(content) if content.loaded() => {
            debug!(
                "module {} available at {}",
                address,
                content.path().map(|p| p.display().to_string()).unwrap_or_default()
            );
            TaskOutcome::Loaded
        }
        Ok(content) if content.is_download_disabled() => {
            debug!(module = %address, "downloads disabled, not fetching module {}", address);
            TaskOutcome::NotLoaded
        }
        Ok(_) => {
            warn!(module = %address, "failed to download module {}", address);
            TaskOutcome::NotLoaded
        }
        Err(e) => {
            warn!(module = %address, "unable to load module ({}): {}", address, e);
            TaskOutcome::Failed
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
