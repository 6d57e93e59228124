//! Source scanner: walks a directory tree and collects module references from
//! every Terraform configuration file in it.

mod block;

use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::TfmodConfig;
use crate::reference::ModuleReference;

pub use block::{scan_text, TextScan};

#[derive(Debug, Clone)]
pub struct ModuleScanner {
    /// File extensions (without the dot) treated as configuration files.
    pub extensions: Vec<String>,
    /// Whether to follow symbolic links
    pub follow_links: bool,
    /// Directory names that are not descended into (e.g. the fetched-modules dir).
    pub skip_dir_names: Vec<String>,
}

impl Default for ModuleScanner {
    fn default() -> Self {
        Self {
            extensions: vec!["tf".to_string()],
            follow_links: false,
            skip_dir_names: Vec::new(),
        }
    }
}

/// Everything a scan produced. Counters only; problems are logged as they happen.
#[derive(Debug, Default, Serialize)]
pub struct ScanResult {
    pub references: Vec<ModuleReference>,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub incomplete_blocks: usize,
    pub walk_errors: usize,
}

impl ModuleScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default scanner that leaves the configured external-modules directory alone.
    pub fn from_config(cfg: &TfmodConfig) -> Self {
        let scanner = Self::default();
        match Path::new(&cfg.external_modules_dir)
            .file_name()
            .and_then(|n| n.to_str())
        {
            Some(name) => scanner.skip_dir(name),
            None => scanner,
        }
    }

    pub fn skip_dir(mut self, name: impl Into<String>) -> Self {
        self.skip_dir_names.push(name.into());
        self
    }

    fn is_config_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x == e))
            .unwrap_or(false)
    }

    fn is_skipped_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .map(|n| self.skip_dir_names.iter().any(|s| s == n))
                .unwrap_or(false)
    }

    /// Scans every configuration file under `root`. Files are visited in
    /// file-name order so the output order is stable between runs.
    ///
    /// Never fails: unreadable entries and undecodable files are logged and skipped.
    pub fn scan(&self, root: &Path) -> ScanResult {
        let mut result = ScanResult::default();

        let walker = WalkDir::new(root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_skipped_dir(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("error walking directory: {}", e);
                    result.walk_errors += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.is_config_file(entry.path()) {
                continue;
            }
            self.scan_file(entry.path(), &mut result);
        }

        info!(
            "scan complete: {} files, {} module references, {} skipped files, {} incomplete blocks",
            result.files_scanned,
            result.references.len(),
            result.files_skipped,
            result.incomplete_blocks
        );

        result
    }

    fn scan_file(&self, path: &Path, result: &mut ScanResult) {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("skipping {} because of {}", path.display(), e);
                result.files_skipped += 1;
                return;
            }
        };
        debug!("scanning {}", path.display());
        let scanned = scan_text(path, &text);
        result.files_scanned += 1;
        result.incomplete_blocks += scanned.incomplete_blocks;
        result.references.extend(scanned.references);
    }
}

/// Scans `root` with the default scanner and returns only the references.
pub fn find_modules(root: &Path) -> Vec<ModuleReference> {
    ModuleScanner::default().scan(root).references
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, body: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "main.tf", b"module \"a\" {\n  source = \"x\"\n}\n");
        write(
            dir.path(),
            "envs/prod/main.tf",
            b"module \"b\" {\n  source = \"y\"\n  version = \"1.0.0\"\n}\n",
        );

        let refs = find_modules(dir.path());
        assert_eq!(refs.len(), 2);
        let prod = refs.iter().find(|r| r.link() == "y").unwrap();
        assert_eq!(prod.source_dir(), dir.path().join("envs/prod"));
    }

    #[test]
    fn ignores_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "README.md", b"module \"a\" {\n  source = \"x\"\n}\n");
        write(dir.path(), "vars.tfvars", b"module \"a\" {\n  source = \"x\"\n}\n");
        let result = ModuleScanner::default().scan(dir.path());
        assert!(result.references.is_empty());
        assert_eq!(result.files_scanned, 0);
    }

    #[test]
    fn undecodable_file_is_skipped_and_scan_continues() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a_bad.tf", &[0xff, 0xfe, 0x00, 0x80]);
        write(dir.path(), "b_good.tf", b"module \"a\" {\n  source = \"x\"\n}\n");
        let result = ModuleScanner::default().scan(dir.path());
        assert_eq!(result.files_skipped, 1);
        assert_eq!(result.files_scanned, 1);
        assert_eq!(result.references.len(), 1);
    }

    #[test]
    fn skipped_dirs_are_not_descended() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "main.tf", b"module \"a\" {\n  source = \"x\"\n}\n");
        write(
            dir.path(),
            ".external_modules/example.com/mod/latest/main.tf",
            b"module \"inner\" {\n  source = \"z\"\n}\n",
        );
        let result = ModuleScanner::new()
            .skip_dir(".external_modules")
            .scan(dir.path());
        let links: Vec<_> = result.references.iter().map(|r| r.link()).collect();
        assert_eq!(links, vec!["x"]);
    }

    #[test]
    fn config_external_modules_dir_is_skipped() {
        let cfg = TfmodConfig {
            external_modules_dir: "vendor/fetched".to_string(),
            ..TfmodConfig::default()
        };
        let scanner = ModuleScanner::from_config(&cfg);
        assert_eq!(scanner.skip_dir_names, vec!["fetched".to_string()]);
    }

    #[test]
    fn missing_root_is_a_walk_error_not_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = ModuleScanner::default().scan(&dir.path().join("missing"));
        assert!(result.references.is_empty());
        assert_eq!(result.walk_errors, 1);
    }

    #[test]
    fn incomplete_blocks_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "main.tf",
            b"module \"a\" {\n  version = \"1.0\"\n}\nmodule \"b\" {\n  source = \"x\"\n}\n",
        );
        let result = ModuleScanner::default().scan(dir.path());
        assert_eq!(result.incomplete_blocks, 1);
        assert_eq!(result.references.len(), 1);
        assert!(result.references.iter().all(|r| !r.link().is_empty()));
    }
}
