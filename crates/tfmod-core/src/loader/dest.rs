//! Where fetched modules land on disk.
//!
//! `<root>/<external_modules_dir>/<host>/<path...>/<version>`, every component
//! sanitized for Linux filesystems.

use std::path::PathBuf;

use super::LoaderConfig;

/// Sanitizes one path component for safe use on Linux.
///
/// - Replaces NUL, `/`, `\`, whitespace, and control characters with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing dots and underscores (so `..` cannot escape)
/// - Limits length to 255 bytes (Linux NAME_MAX)
pub fn sanitize_component(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let replacement = if c == '\0' || c == '/' || c == '\\' || c == ':' || c.is_control() {
            '_'
        } else if c.is_whitespace() {
            '_'
        } else {
            c
        };

        if replacement == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(replacement);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Splits a clone URL into `(host, path segments)`. Understands scheme URLs
/// (`https://`, `ssh://`) and scp-like `git@host:org/repo.git`.
pub(crate) fn host_and_path(clone_url: &str) -> Option<(String, Vec<String>)> {
    if let Ok(parsed) = url::Url::parse(clone_url) {
        if let Some(host) = parsed.host_str() {
            let segments = parsed
                .path_segments()
                .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
                .unwrap_or_default();
            return Some((host.to_string(), segments));
        }
    }
    // scp-like: user@host:path
    let (user_host, path) = clone_url.split_once(':')?;
    let host = user_host.rsplit('@').next()?;
    if host.is_empty() {
        return None;
    }
    let segments = path
        .split('/')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    Some((host.to_string(), segments))
}

/// Checkout directory for `clone_url` at `revision`.
pub fn module_dest_dir(cfg: &LoaderConfig, clone_url: &str, revision: &str) -> PathBuf {
    let mut dir = cfg.modules_root();
    match host_and_path(clone_url) {
        Some((host, segments)) => {
            dir.push(sanitize_component(&host));
            for segment in segments {
                let segment = segment.strip_suffix(".git").unwrap_or(&segment);
                let clean = sanitize_component(segment);
                if !clean.is_empty() {
                    dir.push(clean);
                }
            }
        }
        None => dir.push(sanitize_component(clone_url)),
    }
    let revision = sanitize_component(revision);
    dir.push(if revision.is_empty() { "latest".to_string() } else { revision });
    dir
}
