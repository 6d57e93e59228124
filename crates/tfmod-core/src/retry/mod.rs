//! Retry and backoff policy.
//!
//! Encapsulates error classification (timeouts, throttling, connection
//! failures) and exponential backoff so every loader retries the same way.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_git_stderr, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
