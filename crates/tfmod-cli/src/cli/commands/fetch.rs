//! `tfmod fetch` – scan, plan, and fetch every external module.

use anyhow::{Context, Result};
use std::path::Path;
use tfmod_core::config::TfmodConfig;
use tfmod_core::loader::build_loader;
use tfmod_core::scanner::ModuleScanner;
use tfmod_core::{load_modules, LoadOptions, LoadReport};

/// Command-line overrides for config values.
#[derive(Debug, Clone, Default)]
pub struct FetchArgs {
    pub jobs: Option<usize>,
    pub no_download: bool,
    pub timeout: Option<u64>,
}

pub fn apply_overrides(mut cfg: TfmodConfig, args: &FetchArgs) -> TfmodConfig {
    if let Some(jobs) = args.jobs {
        cfg.max_parallel_fetches = Some(jobs.max(1));
    }
    if args.no_download {
        cfg.download_external_modules = false;
    }
    if let Some(secs) = args.timeout {
        cfg.fetch_timeout_secs = Some(secs);
    }
    cfg
}

pub fn run_fetch(cfg: TfmodConfig, dir: &Path, args: FetchArgs) -> Result<()> {
    let cfg = apply_overrides(cfg, &args);
    let root = dir
        .canonicalize()
        .with_context(|| format!("source directory {}", dir.display()))?;

    // Loader settings are fixed here, before scanning, and only read afterwards.
    let loader = build_loader(&cfg, &root);
    let options = LoadOptions {
        scanner: ModuleScanner::from_config(&cfg),
        parallelism: cfg.max_parallel_fetches,
        filter: None,
    };
    let report = load_modules(&root, loader, options);

    print!("{}", summarize(&report));
    if report.fetch.failed > 0 || (report.fetch.not_loaded > 0 && cfg.download_external_modules) {
        if let Ok(log) = tfmod_core::logging::log_file_path() {
            println!("see {} for details", log.display());
        }
    }
    Ok(())
}

fn summarize(report: &LoadReport) -> String {
    let mut out = format!(
        "{} reference(s) in {} file(s), {} distinct module(s) in {} batch(es)\n",
        report.references_found,
        report.files_scanned,
        report.distinct_modules,
        report.fetch.batches
    );
    out.push_str(&format!(
        "scan: {} file(s) unreadable, {} unterminated block(s), {} walk error(s)\n",
        report.files_skipped, report.incomplete_blocks, report.walk_errors
    ));
    out.push_str(&format!(
        "loaded {}, not loaded {}, failed {}, skipped {}\n",
        report.fetch.loaded, report.fetch.not_loaded, report.fetch.failed, report.fetch.skipped
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let cfg = apply_overrides(
            TfmodConfig::default(),
            &FetchArgs {
                jobs: Some(3),
                no_download: true,
                timeout: Some(60),
            },
        );
        assert_eq!(cfg.max_parallel_fetches, Some(3));
        assert!(!cfg.download_external_modules);
        assert_eq!(cfg.fetch_timeout_secs, Some(60));
    }

    #[test]
    fn no_overrides_keep_config() {
        let base = TfmodConfig {
            max_parallel_fetches: Some(7),
            ..TfmodConfig::default()
        };
        let cfg = apply_overrides(base, &FetchArgs::default());
        assert_eq!(cfg.max_parallel_fetches, Some(7));
        assert!(cfg.download_external_modules);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_fetch(
            TfmodConfig::default(),
            &dir.path().join("missing"),
            FetchArgs::default(),
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("source directory"));
    }

    #[test]
    fn local_only_tree_fetches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("main.tf"),
            "module \"l\" {\n  source = \"./local\"\n}\n",
        )
        .unwrap();
        run_fetch(
            TfmodConfig::default(),
            dir.path(),
            FetchArgs {
                no_download: true,
                ..FetchArgs::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn summary_reports_scan_problems() {
        let report = LoadReport {
            files_scanned: 3,
            files_skipped: 1,
            incomplete_blocks: 2,
            walk_errors: 4,
            ..LoadReport::default()
        };
        let text = summarize(&report);
        assert!(text.contains("1 file(s) unreadable"));
        assert!(text.contains("2 unterminated block(s)"));
        assert!(text.contains("4 walk error(s)"));
    }
}
