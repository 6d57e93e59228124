//! Classify HTTP status, curl errors, and git output into retry policy error kinds.

use crate::loader::LoadError;
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify git's stderr. Only network-shaped failures are retryable; a bad ref
/// or missing repository fails the same way every time.
pub fn classify_git_stderr(stderr: &str) -> ErrorKind {
    let s = stderr.to_ascii_lowercase();
    if s.contains("timed out") {
        return ErrorKind::Timeout;
    }
    if s.contains("429") || s.contains("rate limit") {
        return ErrorKind::Throttled;
    }
    if s.contains("could not resolve host")
        || s.contains("connection reset")
        || s.contains("connection refused")
        || s.contains("early eof")
        || s.contains("remote end hung up")
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a loader error into an ErrorKind.
pub fn classify(e: &LoadError) -> ErrorKind {
    match e {
        LoadError::Curl(ce) => classify_curl_error(ce),
        LoadError::Http(code) => classify_http_status(*code),
        LoadError::Git { stderr, .. } => classify_git_stderr(stderr),
        // The outer timeout already spent the whole budget.
        LoadError::Timeout(_) => ErrorKind::Other,
        LoadError::Unsupported(_)
        | LoadError::Spawn { .. }
        | LoadError::Registry(_)
        | LoadError::Io(_)
        | LoadError::Panicked(_) => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_429_and_503_throttled() {
        assert_eq!(classify_http_status(429), ErrorKind::Throttled);
        assert_eq!(classify_http_status(503), ErrorKind::Throttled);
    }

    #[test]
    fn http_5xx_retryable() {
        assert!(matches!(classify_http_status(500), ErrorKind::Http5xx(500)));
        assert!(matches!(classify_http_status(502), ErrorKind::Http5xx(502)));
    }

    #[test]
    fn http_4xx_other() {
        assert_eq!(classify_http_status(404), ErrorKind::Other);
        assert_eq!(classify_http_status(403), ErrorKind::Other);
    }

    #[test]
    fn git_network_failures_are_connection() {
        assert_eq!(
            classify_git_stderr("fatal: unable to access 'https://x/': Could not resolve host: x"),
            ErrorKind::Connection
        );
        assert_eq!(
            classify_git_stderr("fatal: the remote end hung up unexpectedly"),
            ErrorKind::Connection
        );
    }

    #[test]
    fn git_missing_ref_is_other() {
        assert_eq!(
            classify_git_stderr("warning: Could not find remote branch v9.9.9 to clone."),
            ErrorKind::Other
        );
    }

    #[test]
    fn git_error_variant_uses_stderr() {
        let e = LoadError::Git {
            action: "clone",
            status: "exit status: 128".into(),
            stderr: "Connection timed out".into(),
        };
        assert_eq!(classify(&e), ErrorKind::Timeout);
    }
}
