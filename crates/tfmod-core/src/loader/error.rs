//! Error type returned by module loaders.

use std::io;
use std::time::Duration;

/// Failure of a single module fetch. Classified by the retry policy before it
/// reaches the executor, which logs it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No loader understands this kind of source.
    #[error("unsupported module source: {0}")]
    Unsupported(String),
    /// The external program (e.g. git) could not be started.
    #[error("could not run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    /// git ran but exited unsuccessfully.
    #[error("git {action} exited with {status}: {stderr}")]
    Git {
        action: &'static str,
        status: String,
        stderr: String,
    },
    /// The registry answered but did not give a usable download location.
    #[error("registry: {0}")]
    Registry(String),
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// The fetch did not finish within the configured per-module timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("io: {0}")]
    Io(#[from] io::Error),
    /// The loader panicked; caught at the task boundary.
    #[error("loader panicked: {0}")]
    Panicked(String),
}
