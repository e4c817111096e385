//! `slab load`: load a package and report what happened to each entry.

use anyhow::{Context, Result};
use slab_loader::{EntryStatus, LoadReport, LoaderConfig};
use slab_registry::VersionConstraint;

/// Load `name` (or the object `key`) with a loader built from `config`.
pub async fn run(
    config: &LoaderConfig,
    name: &str,
    version: Option<&str>,
    key: Option<&str>,
) -> Result<()> {
    let loader = config.build().context("building loader")?;
    let report = match key {
        Some(key) => loader.load_key(name, key).await,
        None => {
            loader
                .load_with_report(name, version.map(VersionConstraint::parse))
                .await
        }
    }
    .with_context(|| format!("loading '{name}'"))?;

    print_report(&report);

    for module in loader.loaded() {
        if module.name != report.module.name {
            println!(
                "  dependency {} {}",
                module.name,
                module.version.as_deref().unwrap_or("(provided)")
            );
        }
    }
    Ok(())
}

fn print_report(report: &LoadReport) {
    let module = &report.module;
    println!(
        "Loaded {} {}",
        module.name,
        module.version.as_deref().unwrap_or("(unknown version)")
    );
    if let Some(artifact) = &module.artifact {
        println!("  artifact:  {}", artifact.filename);
        println!("  location:  {}", artifact.location);
    }
    println!("  namespace: {}", module.handle.namespace());
    if let Some(root) = module.handle.root() {
        println!("  staged at: {}", root.display());
    }

    if !module.entries.is_empty() {
        println!();
        for entry in &module.entries {
            let status = match &entry.status {
                EntryStatus::Executed => "executed".to_string(),
                EntryStatus::Attached => "attached".to_string(),
                EntryStatus::Failed(e) => format!("FAILED: {e}"),
            };
            println!("  {:<48} {status}", entry.path);
        }
    }

    if module.is_partial() {
        println!();
        println!("warning: {} loaded partially", module.name);
    }
    for warning in report.warnings() {
        println!("warning: {warning}");
    }
    println!();
}
