//! Git-backed module loader: shallow clones via the `git` executable.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use super::dest::module_dest_dir;
use super::{LoadError, LoaderConfig, ModuleContent, ModuleLoader};
use crate::reference::LATEST;
use crate::retry::{classify, run_with_retry, ErrorKind, RetryPolicy};

/// A git module source split into its parts.
///
/// `git::https://example.com/net.git//modules/vpc?ref=v1.2.0` becomes
/// url `https://example.com/net.git`, subdir `modules/vpc`, ref `v1.2.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSource {
    pub url: String,
    pub subdir: Option<String>,
    pub git_ref: Option<String>,
}

impl GitSource {
    /// Parses a git-shaped link. Returns None for links git cannot clone.
    pub fn parse(link: &str) -> Option<Self> {
        if !is_git_link(link) {
            return None;
        }
        let raw = link.strip_prefix("git::").unwrap_or(link);
        let (repo, subdir, query) = split_source(raw);
        let git_ref = query.and_then(|q| {
            q.split('&')
                .filter_map(|kv| kv.split_once('='))
                .find(|(k, _)| *k == "ref")
                .map(|(_, v)| v.to_string())
                .filter(|v| !v.is_empty())
        });

        let url = expand_shorthand(repo);
        if url.is_empty() {
            return None;
        }
        Some(Self {
            url,
            subdir: subdir.map(str::to_string),
            git_ref,
        })
    }

    /// Refs to try, in order. An explicit `?ref=` wins; otherwise a concrete
    /// version is tried as `v<version>` then `<version>`; `latest` clones the
    /// default branch.
    pub fn candidate_refs(&self, version: &str) -> Vec<Option<String>> {
        if let Some(r) = &self.git_ref {
            return vec![Some(r.clone())];
        }
        if version.is_empty() || version == LATEST {
            return vec![None];
        }
        vec![Some(format!("v{}", version)), Some(version.to_string())]
    }
}

/// Splits `repo//subdir?query` into its parts. A `//` only marks a
/// subdirectory after the scheme separator.
pub(crate) fn split_source(raw: &str) -> (&str, Option<&str>, Option<&str>) {
    let (head, query) = match raw.split_once('?') {
        Some((head, query)) => (head, Some(query)),
        None => (raw, None),
    };
    let search_from = head.find("://").map(|i| i + 3).unwrap_or(0);
    match head[search_from..].find("//") {
        Some(i) => {
            let at = search_from + i;
            let sub = head[at + 2..].trim_matches('/');
            (&head[..at], Some(sub).filter(|s| !s.is_empty()), query)
        }
        None => (head, None, query),
    }
}

/// True for links that name a git repository.
pub fn is_git_link(link: &str) -> bool {
    link.starts_with("git::")
        || link.starts_with("git@")
        || link.starts_with("github.com/")
        || link.starts_with("bitbucket.org/")
        || split_source(link).0.ends_with(".git")
}

fn expand_shorthand(repo: &str) -> String {
    for host in ["github.com/", "bitbucket.org/"] {
        if let Some(rest) = repo.strip_prefix(host) {
            let rest = rest.trim_end_matches('/');
            let suffix = if rest.ends_with(".git") { "" } else { ".git" };
            return format!("https://{}{}{}", host, rest, suffix);
        }
    }
    repo.to_string()
}

/// One lock per checkout directory. Different links can share a checkout
/// (subdirs of one repo, shorthand vs full URL, registry vs direct git), and
/// the batch planner only keeps identical links apart.
#[derive(Debug, Default)]
struct CheckoutLocks {
    dirs: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl CheckoutLocks {
    fn for_dir(&self, dest: &Path) -> Arc<Mutex<()>> {
        let mut dirs = self.dirs.lock().unwrap_or_else(|p| p.into_inner());
        let lock = Arc::clone(dirs.entry(dest.to_path_buf()).or_default());
        lock
    }
}

/// Clones git sources into the external-modules directory.
///
/// Clones of a `GitLoader` share their checkout locks, so the registry
/// loader's inner `GitLoader` and the chain's own never race on a directory.
#[derive(Debug, Clone)]
pub struct GitLoader {
    config: Arc<LoaderConfig>,
    git_binary: String,
    retry: RetryPolicy,
    locks: Arc<CheckoutLocks>,
}

impl GitLoader {
    pub fn new(config: Arc<LoaderConfig>, git_binary: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            config,
            git_binary: git_binary.into(),
            retry,
            locks: Arc::new(CheckoutLocks::default()),
        }
    }

    pub fn downloads_enabled(&self) -> bool {
        self.config.download_external_modules
    }

    /// Clones `source` at `version` (or reuses an existing checkout).
    pub fn load_source(&self, source: &GitSource, version: &str) -> Result<ModuleContent, LoadError> {
        if !self.downloads_enabled() {
            return Ok(ModuleContent::download_disabled());
        }

        let mut last_err = None;
        for candidate in source.candidate_refs(version) {
            let revision = candidate.as_deref().unwrap_or(LATEST);
            let dest = module_dest_dir(&self.config, &source.url, revision);
            match self.checkout(&source.url, candidate.as_deref(), &dest) {
                Ok(()) => return Ok(content_at(&dest, source.subdir.as_deref())),
                // A missing ref fails fast; try the next spelling.
                Err(e) if classify(&e) == ErrorKind::Other && matches!(e, LoadError::Git { .. }) => {
                    tracing::debug!(url = %source.url, revision, "checkout failed: {}", e);
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| LoadError::Unsupported(source.url.clone())))
    }

    fn checkout(&self, url: &str, git_ref: Option<&str>, dest: &Path) -> Result<(), LoadError> {
        let lock = self.locks.for_dir(dest);
        let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());

        // Checked under the lock: another worker may have just finished this clone.
        if dest.join(".git").exists() {
            tracing::debug!("reusing checkout at {}", dest.display());
            return Ok(());
        }
        if dest.exists() {
            fs::remove_dir_all(dest)?;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        run_with_retry(&self.retry, || {
            let mut cmd = Command::new(&self.git_binary);
            cmd.arg("clone").arg("--depth").arg("1").arg("--quiet");
            if let Some(r) = git_ref {
                cmd.arg("--branch").arg(r);
            }
            cmd.arg("--").arg(url).arg(dest);
            cmd.env("GIT_TERMINAL_PROMPT", "0");

            let existed = dest.exists();
            let output = cmd.output().map_err(|source| LoadError::Spawn {
                program: self.git_binary.clone(),
                source,
            })?;
            if output.status.success() {
                return Ok(());
            }
            // A failed clone can leave a partial directory behind. Only
            // remove what this attempt created.
            if !existed && dest.exists() {
                let _ = fs::remove_dir_all(dest);
            }
            Err(LoadError::Git {
                action: "clone",
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        })
    }
}

fn content_at(checkout: &Path, subdir: Option<&str>) -> ModuleContent {
    let path: PathBuf = match subdir {
        Some(sub) => checkout.join(sub),
        None => checkout.to_path_buf(),
    };
    if path.is_dir() {
        ModuleContent::at(path)
    } else {
        tracing::warn!("checkout has no directory {}", path.display());
        ModuleContent::not_loaded()
    }
}

impl ModuleLoader for GitLoader {
    fn load(&self, _target_dir: &Path, link: &str, version: &str) -> Result<ModuleContent, LoadError> {
        let source =
            GitSource::parse(link).ok_or_else(|| LoadError::Unsupported(link.to_string()))?;
        self.load_source(&source, version)
    }
}
