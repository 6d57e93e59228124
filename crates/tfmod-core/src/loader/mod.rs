//! Module loaders: the boundary between the fetch scheduler and whatever
//! actually retrieves module content (git checkouts, registry lookups).

mod dest;
mod error;
mod git;
mod registry;
mod timeout;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::TfmodConfig;

pub use dest::{module_dest_dir, sanitize_component};
pub use error::LoadError;
pub use git::{is_git_link, GitLoader, GitSource};
pub use registry::{is_registry_address, RegistryAddress, RegistryLoader};
pub use timeout::TimeoutLoader;

/// Fetches the content of one module. Shared by all worker threads of a batch.
pub trait ModuleLoader: Send + Sync {
    /// Fetches `link` at `version` on behalf of a reference found in `target_dir`.
    fn load(&self, target_dir: &Path, link: &str, version: &str) -> Result<ModuleContent, LoadError>;
}

/// Outcome of a successful `load`. `loaded() == false` means "nothing to do",
/// which callers report as a warning rather than an error, unless the loader
/// skipped the module because downloads are turned off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleContent {
    path: Option<PathBuf>,
    download_disabled: bool,
}

impl ModuleContent {
    pub fn at(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            download_disabled: false,
        }
    }

    pub fn not_loaded() -> Self {
        Self::default()
    }

    /// Not loaded because `download_external_modules` is off.
    pub fn download_disabled() -> Self {
        Self {
            path: None,
            download_disabled: true,
        }
    }

    pub fn is_download_disabled(&self) -> bool {
        self.download_disabled
    }

    pub fn loaded(&self) -> bool {
        self.path.is_some()
    }

    /// Directory holding the module's files, if it was loaded.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Settings every loader reads. Built once before scanning and never mutated.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub download_external_modules: bool,
    pub root_dir: PathBuf,
    pub external_modules_dir: String,
}

impl LoaderConfig {
    pub fn from_config(cfg: &TfmodConfig, root_dir: &Path) -> Self {
        Self {
            download_external_modules: cfg.download_external_modules,
            root_dir: root_dir.to_path_buf(),
            external_modules_dir: cfg.external_modules_dir.clone(),
        }
    }

    pub fn modules_root(&self) -> PathBuf {
        self.root_dir.join(&self.external_modules_dir)
    }
}

/// What kind of location a module link names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Local,
    Git,
    Registry,
    Unknown,
}

pub fn is_local_path(link: &str) -> bool {
    link.starts_with("./") || link.starts_with("../") || link.starts_with('/')
}

pub fn source_kind(link: &str) -> SourceKind {
    if is_local_path(link) {
        SourceKind::Local
    } else if is_git_link(link) {
        SourceKind::Git
    } else if is_registry_address(link) {
        SourceKind::Registry
    } else {
        SourceKind::Unknown
    }
}

/// Dispatches each link to the loader that understands it.
#[derive(Debug, Clone)]
pub struct LoaderChain {
    git: GitLoader,
    registry: RegistryLoader,
}

impl LoaderChain {
    pub fn new(git: GitLoader, registry: RegistryLoader) -> Self {
        Self { git, registry }
    }

    pub fn from_config(cfg: &TfmodConfig, loader_cfg: Arc<LoaderConfig>) -> Self {
        let retry = cfg.retry_policy();
        let git = GitLoader::new(loader_cfg, cfg.git_binary.clone(), retry);
        let registry = RegistryLoader::new(cfg.registry_host.clone(), git.clone(), retry);
        Self::new(git, registry)
    }
}

impl ModuleLoader for LoaderChain {
    fn load(&self, target_dir: &Path, link: &str, version: &str) -> Result<ModuleContent, LoadError> {
        match source_kind(link) {
            SourceKind::Local => {
                let path = target_dir.join(link);
                if path.is_dir() {
                    Ok(ModuleContent::at(path))
                } else {
                    Ok(ModuleContent::not_loaded())
                }
            }
            SourceKind::Git => self.git.load(target_dir, link, version),
            SourceKind::Registry => self.registry.load(target_dir, link, version),
            SourceKind::Unknown => Err(LoadError::Unsupported(link.to_string())),
        }
    }
}

/// Builds the loader stack described by `cfg` for a scan of `root_dir`:
/// a [`LoaderChain`], wrapped in a [`TimeoutLoader`] when a timeout is set.
pub fn build_loader(cfg: &TfmodConfig, root_dir: &Path) -> Arc<dyn ModuleLoader> {
    let loader_cfg = Arc::new(LoaderConfig::from_config(cfg, root_dir));
    let chain: Arc<dyn ModuleLoader> = Arc::new(LoaderChain::from_config(cfg, loader_cfg));
    match cfg.fetch_timeout() {
        Some(timeout) => Arc::new(TimeoutLoader::new(chain, timeout)),
        None => chain,
    }
}
