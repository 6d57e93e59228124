//! Line-oriented extraction of `source`/`version` from `module` blocks.
//!
//! Two states only: outside a block, inside a block. A line starting with
//! `module` opens a block, a line starting with `}` closes it. Nested braces are
//! not tracked, so a nested block's closing brace must be indented to be ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::reference::{ModuleReference, PendingReference};

static SOURCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^.*\bsource\s*=\s*"(?P<link>.*)""#).expect("source regex should compile")
});

// Leading non-digits are dropped so "~> 1.2" and "v1.2.3" both yield the numeric part.
static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^.*\bversion\s*=\s*"[^\d]*(?P<version>.*)""#)
        .expect("version regex should compile")
});

/// References found in one file, plus the blocks that had to be dropped.
#[derive(Debug, Default)]
pub struct TextScan {
    pub references: Vec<ModuleReference>,
    /// Blocks closed (or cut off by end of file) without a `source`.
    pub incomplete_blocks: usize,
}

/// Scans the contents of one configuration file. References get the file's
/// parent directory as their source directory.
pub fn scan_text(file: &Path, text: &str) -> TextScan {
    let source_dir = file.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
    let mut out = TextScan::default();
    let mut current: Option<PendingReference> = None;

    for line in text.lines() {
        let Some(pending) = current.as_mut() else {
            if line.starts_with("module") {
                current = Some(PendingReference::new(source_dir.clone()));
            }
            continue;
        };

        if line.starts_with('}') {
            if let Some(pending) = current.take() {
                close_block(pending, file, &mut out);
            }
            continue;
        }

        if let Some(caps) = SOURCE_PATTERN.captures(line) {
            pending.set_link(&caps["link"]);
            continue;
        }

        if let Some(caps) = VERSION_PATTERN.captures(line) {
            pending.set_version(&caps["version"]);
        }
    }

    if let Some(pending) = current {
        tracing::warn!(
            file = %file.display(),
            "module block at {} is not closed before end of file, skipping",
            pending.source_dir().display()
        );
        out.incomplete_blocks += 1;
    }

    out
}

fn close_block(pending: PendingReference, file: &Path, out: &mut TextScan) {
    let dir = pending.source_dir().to_path_buf();
    match pending.finish() {
        Some(reference) => {
            tracing::debug!(file = %file.display(), "found module {}", reference);
            out.references.push(reference);
        }
        None => {
            tracing::warn!(
                file = %file.display(),
                "a module at {} had no source, skipping",
                dir.display()
            );
            out.incomplete_blocks += 1;
        }
    }
}
