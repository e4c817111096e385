//! `slab parse`: show how a dependency specifier is read.

use anyhow::{Context, Result};
use slab_registry::{parse_specifier, VersionConstraint};

pub fn run(specifier: &str) -> Result<()> {
    let dep = parse_specifier(specifier)
        .with_context(|| format!("parsing specifier '{specifier}'"))?;
    println!("name:       {}", dep.name);
    println!("key:        {}", dep.name.key());
    let constraint = match &dep.constraint {
        VersionConstraint::Any => "any".to_string(),
        other => other.to_string(),
    };
    println!("constraint: {constraint}");
    Ok(())
}
