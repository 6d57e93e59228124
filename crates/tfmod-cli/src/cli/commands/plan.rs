//! `tfmod plan` – show distinct modules grouped into fetch batches.

use anyhow::Result;
use std::path::Path;
use tfmod_core::config::TfmodConfig;
use tfmod_core::fetch::should_download;
use tfmod_core::plan;
use tfmod_core::scanner::ModuleScanner;

pub fn run_plan(cfg: &TfmodConfig, dir: &Path, json: bool) -> Result<()> {
    let scan = ModuleScanner::from_config(cfg).scan(dir);
    let batches = plan::plan(scan.references);

    if json {
        println!("{}", serde_json::to_string_pretty(&batches)?);
        return Ok(());
    }

    if batches.is_empty() {
        println!("Nothing to fetch.");
        return Ok(());
    }
    for (i, batch) in batches.iter().enumerate() {
        println!("batch {} ({} module(s))", i + 1, batch.len());
        for m in batch.references() {
            let note = if should_download(m.link()) { "" } else { "  [local, skipped]" };
            println!("  {}{}", m.address(), note);
        }
    }
    Ok(())
}
