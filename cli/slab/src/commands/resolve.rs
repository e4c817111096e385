//! `slab resolve`: print a dependency closure without executing anything.

use anyhow::{Context, Result};
use slab_loader::LoaderConfig;
use slab_registry::VersionConstraint;

pub async fn run(config: &LoaderConfig, name: &str, version: Option<&str>) -> Result<()> {
    let loader = config.build().context("building loader")?;
    let resolution = loader
        .resolve(name, version.map(VersionConstraint::parse))
        .await
        .with_context(|| format!("resolving '{name}'"))?;

    println!("--- Dependencies ---");
    if resolution.resolved.is_empty() {
        println!("  none");
    }
    for dep in &resolution.resolved {
        println!("  {dep}");
    }
    println!();

    println!("--- Load Order ---");
    for (i, package) in resolution.order.iter().enumerate() {
        let version = if loader.host().provides(package) {
            "provided by host".to_string()
        } else {
            loader
                .cache()
                .fetched(package)
                .and_then(|fetched| fetched.version().map(str::to_string))
                .unwrap_or_else(|| "unknown version".to_string())
        };
        println!("  {:>3}. {package} ({version})", i + 1);
    }

    if !resolution.warnings.is_empty() {
        println!();
        for warning in &resolution.warnings {
            println!("warning: {warning}");
        }
    }
    Ok(())
}
