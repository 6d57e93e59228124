//! Shared helpers for the integration tests.

#![allow(dead_code)]

pub mod recording_loader;
pub mod registry_server;

use std::fs;
use std::path::Path;

/// Writes `body` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

/// Writes an executable stand-in for `git clone` into `dir`. It logs each
/// destination to `clones.log`, sleeps, then creates the checkout with
/// plain `mkdir` so a second clone into the same place fails like git does.
/// Returns the script path and the log path.
#[cfg(unix)]
pub fn slow_fake_git(dir: &Path, subdirs: &[&str]) -> (std::path::PathBuf, std::path::PathBuf) {
    use std::os::unix::fs::PermissionsExt;

    let log = dir.join("clones.log");
    let script = dir.join("fake-git");
    let mut body = format!(
        "#!/bin/sh\nfor dest; do :; done\necho \"$dest\" >> '{}'\nsleep 0.5\nmkdir \"$dest\" || exit 128\nmkdir \"$dest/.git\"\n",
        log.display()
    );
    for sub in subdirs {
        body.push_str(&format!("mkdir -p \"$dest/{}\"\n", sub));
    }
    fs::write(&script, body).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    (script, log)
}
