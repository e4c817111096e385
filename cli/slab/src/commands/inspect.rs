//! `slab inspect`: show what the loader would see in a local archive.

use std::path::Path;

use anyhow::{Context, Result};
use slab_registry::{extract, parse_metadata, parse_specifier, ContentHash, EntryRole};

/// Print the retained entries and metadata of the archive at `path`.
pub fn run(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let contents = extract(&bytes).with_context(|| format!("extracting {}", path.display()))?;

    println!("=== {} ===", path.display());
    println!("sha256:  {}", ContentHash::compute(&bytes));
    println!(
        "entries: {} ({} bytes)",
        contents.len(),
        contents.total_bytes()
    );

    for (title, role) in [
        ("Code", EntryRole::Code),
        ("Native Binaries", EntryRole::NativeBinary),
        ("Metadata", EntryRole::Metadata),
    ] {
        let entries: Vec<_> = contents.with_role(role).collect();
        if entries.is_empty() {
            continue;
        }
        println!();
        println!("--- {title} ---");
        for entry in entries {
            println!("  {:<48} {:>8} bytes", entry.path, entry.bytes.len());
        }
    }

    println!();
    println!("--- Package ---");
    match parse_metadata(&contents) {
        Ok(metadata) => {
            println!("  Name:    {}", metadata.name.as_deref().unwrap_or("(unset)"));
            println!("  Version: {}", metadata.version.as_deref().unwrap_or("(unset)"));
            if let Some(summary) = metadata.field("Summary") {
                println!("  Summary: {summary}");
            }
            if metadata.requires_dist.is_empty() {
                println!("  Requires: none");
            } else {
                println!("  Requires:");
                for raw in &metadata.requires_dist {
                    match parse_specifier(raw) {
                        Ok(dep) => println!("    {dep}"),
                        Err(e) => println!("    {raw} (unreadable: {e})"),
                    }
                }
            }
        }
        Err(e) => println!("  {e}"),
    }

    Ok(())
}
