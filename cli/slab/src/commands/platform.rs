//! `slab platform`: host and target tag diagnostics.

use anyhow::Result;
use slab_loader::LoaderConfig;
use slab_targets::HostPlatform;

use crate::config::FoundConfig;

/// Print the detected host, the tags artifacts must carry, and where the
/// settings came from.
pub fn run(config: &LoaderConfig, found: Option<&FoundConfig>) -> Result<()> {
    println!("=== slab Platform ===");
    println!();
    println!("slab version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("--- Host ---");
    match HostPlatform::detect() {
        Ok(host) => {
            println!("  OS:           {:?}", host.os);
            println!("  Architecture: {}", host.arch);
            println!("  Platform tag: {}", host.platform_tag());
        }
        Err(e) => println!("  {e}"),
    }
    println!();

    println!("--- Target ---");
    match config.target_tags() {
        Ok(tags) => {
            println!("  Platform:    {}", tags.platform);
            println!("  Interpreter: {}", tags.interpreter);
        }
        Err(e) => println!("  error: {e}"),
    }
    println!(
        "  Universal fallback: {}",
        if config.accept_universal { "accepted" } else { "rejected" }
    );
    println!();

    println!("--- Source ---");
    match found {
        Some(found) => println!("  slab.toml: {}", found.path.display()),
        None => println!("  slab.toml: not found (using defaults)"),
    }
    println!("  Backend:   {}", config.backend);
    match config.backend {
        slab_loader::Backend::Index => println!("  Index:     {}", config.index_url),
        slab_loader::Backend::Bucket => {
            println!(
                "  Bucket:    {}",
                config.bucket.as_deref().unwrap_or("(unset)")
            );
            println!("  Prefix:    {}", config.prefix);
        }
    }
    if !config.preinstalled.is_empty() {
        println!("  Preinstalled: {}", config.preinstalled.join(", "));
    }

    Ok(())
}
