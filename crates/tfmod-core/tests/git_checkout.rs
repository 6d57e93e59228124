//! Integration tests: git checkouts shared by several links in one batch.

#![cfg(unix)]

mod common;

use std::fs;
use std::path::Path;

use common::{slow_fake_git, write_file};
use tfmod_core::config::{RetryConfig, TfmodConfig};
use tfmod_core::loader::build_loader;
use tfmod_core::{load_modules, LoadOptions};
use tempfile::tempdir;

fn config(git: &Path) -> TfmodConfig {
    TfmodConfig {
        git_binary: git.to_string_lossy().into_owned(),
        retry: Some(RetryConfig {
            max_attempts: 1,
            ..RetryConfig::default()
        }),
        ..TfmodConfig::default()
    }
}

#[test]
fn subdirs_of_one_repo_in_one_batch_clone_once() {
    let tools = tempdir().unwrap();
    let (git, log) = slow_fake_git(tools.path(), &["vpc", "subnets"]);
    let root = tempdir().unwrap();
    write_file(
        root.path(),
        "main.tf",
        r#"module "vpc" {
  source = "git::https://example.com/net.git//vpc"
}

module "subnets" {
  source = "git::https://example.com/net.git//subnets"
}
"#,
    );

    let loader = build_loader(&config(&git), root.path());
    let report = load_modules(
        root.path(),
        loader,
        LoadOptions {
            parallelism: Some(2),
            ..LoadOptions::default()
        },
    );

    assert_eq!(report.fetch.batches, 1);
    assert_eq!(report.fetch.dispatched, 2);
    assert_eq!(report.fetch.loaded, 2);
    assert_eq!(report.fetch.failed, 0);
    assert_eq!(fs::read_to_string(&log).unwrap().lines().count(), 1);
}

#[test]
fn shorthand_and_full_url_share_a_checkout() {
    let tools = tempdir().unwrap();
    let (git, log) = slow_fake_git(tools.path(), &[]);
    let root = tempdir().unwrap();
    write_file(
        root.path(),
        "main.tf",
        r#"module "short" {
  source = "github.com/acme/net"
}

module "full" {
  source = "git::https://github.com/acme/net.git"
}
"#,
    );

    let loader = build_loader(&config(&git), root.path());
    let report = load_modules(
        root.path(),
        loader,
        LoadOptions {
            parallelism: Some(2),
            ..LoadOptions::default()
        },
    );

    assert_eq!(report.fetch.loaded, 2);
    assert_eq!(report.fetch.failed, 0);
    let clones = fs::read_to_string(&log).unwrap();
    assert_eq!(clones.lines().count(), 1);
    assert!(Path::new(clones.trim()).join(".git").is_dir());
}
