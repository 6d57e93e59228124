//! `tfmod scan` – list module references found under a directory.

use anyhow::Result;
use std::path::Path;
use tfmod_core::config::TfmodConfig;
use tfmod_core::scanner::ModuleScanner;

pub fn run_scan(cfg: &TfmodConfig, dir: &Path, json: bool) -> Result<()> {
    let result = ModuleScanner::from_config(cfg).scan(dir);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.references.is_empty() {
        println!("No module references found.");
    } else {
        println!("{:<40} {:<12} {}", "SOURCE", "VERSION", "DIR");
        for r in &result.references {
            println!(
                "{:<40} {:<12} {}",
                r.link(),
                r.effective_version(),
                r.source_dir().display()
            );
        }
    }
    println!(
        "{} file(s) scanned, {} skipped, {} block(s) without source",
        result.files_scanned, result.files_skipped, result.incomplete_blocks
    );
    Ok(())
}
