//! Discovered module references and their fetch identity.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Version forwarded to the loader when a block declares none.
pub const LATEST: &str = "latest";

/// A module declaration found while scanning, with a non-empty source link.
///
/// Only the scanner's [`PendingReference`] can be mutated; once a block closes
/// the finished reference is read-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ModuleReference {
    source_dir: PathBuf,
    link: String,
    version: Option<String>,
}

impl ModuleReference {
    /// Returns None when `link` is empty; such a reference can never be fetched.
    pub fn new(
        source_dir: impl Into<PathBuf>,
        link: impl Into<String>,
        version: Option<String>,
    ) -> Option<Self> {
        let link = link.into();
        if link.is_empty() {
            return None;
        }
        Some(Self {
            source_dir: source_dir.into(),
            link,
            version: version.filter(|v| !v.is_empty()),
        })
    }

    /// Directory containing the file the declaration was found in.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    /// Declared version, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Version handed to the loader: the declared one, or `"latest"`.
    pub fn effective_version(&self) -> &str {
        self.version.as_deref().unwrap_or(LATEST)
    }

    pub fn address(&self) -> ModuleAddress {
        ModuleAddress {
            link: self.link.clone(),
            version: self.effective_version().to_string(),
        }
    }
}

impl fmt::Display for ModuleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({})",
            self.source_dir.display(),
            self.link,
            self.effective_version()
        )
    }
}

/// `(link, version-or-latest)`: deduplication and logging identity of a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleAddress {
    pub link: String,
    pub version: String,
}

impl fmt::Display for ModuleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.link, self.version)
    }
}

/// A reference under construction while the scanner is inside a module block.
#[derive(Debug)]
pub(crate) struct PendingReference {
    source_dir: PathBuf,
    link: Option<String>,
    version: Option<String>,
}

impl PendingReference {
    pub(crate) fn new(source_dir: PathBuf) -> Self {
        Self {
            source_dir,
            link: None,
            version: None,
        }
    }

    pub(crate) fn set_link(&mut self, link: &str) {
        self.link = Some(link.to_string());
    }

    pub(crate) fn set_version(&mut self, version: &str) {
        self.version = Some(version.to_string());
    }

    pub(crate) fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Closes the block. None if no usable `source` was seen.
    pub(crate) fn finish(self) -> Option<ModuleReference> {
        ModuleReference::new(self.source_dir, self.link?, self.version)
    }
}
