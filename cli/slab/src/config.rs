//! `slab.toml` discovery and command-line overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use slab_loader::{Backend, LoaderConfig};

/// File name searched for when no `--config` is given.
pub const CONFIG_FILE: &str = "slab.toml";

/// Contents of `slab.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlabConfig {
    pub loader: LoaderConfig,
}

/// A configuration file that was found and parsed.
#[derive(Debug, Clone)]
pub struct FoundConfig {
    pub config: SlabConfig,
    pub path: PathBuf,
}

impl SlabConfig {
    /// Search for `slab.toml` starting from `start_dir` and walking up.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<FoundConfig>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Self::load_file(&candidate).map(Some);
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Read and parse one configuration file.
    pub fn load_file(path: &Path) -> Result<FoundConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: SlabConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(FoundConfig {
            config,
            path: path.to_path_buf(),
        })
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing slab.toml")
    }
}

/// Settings given on the command line; each one replaces the file's value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend: Option<String>,
    pub index_url: Option<String>,
    pub bucket: Option<String>,
    pub prefix: Option<String>,
    pub interpreter: Option<String>,
}

impl Overrides {
    pub fn apply(&self, config: &mut LoaderConfig) -> Result<()> {
        if let Some(backend) = &self.backend {
            config.backend = backend.parse::<Backend>()?;
        }
        if let Some(url) = &self.index_url {
            config.index_url = url.clone();
        }
        if let Some(bucket) = &self.bucket {
            config.bucket = Some(bucket.clone());
        }
        if let Some(prefix) = &self.prefix {
            config.prefix = prefix.clone();
        }
        if let Some(interpreter) = &self.interpreter {
            config.interpreter = interpreter.clone();
        }
        Ok(())
    }
}

/// Find the configuration file: `explicit` if given, else the nearest
/// `slab.toml` above `cwd`.
pub fn locate(cwd: &Path, explicit: Option<&Path>) -> Result<Option<FoundConfig>> {
    match explicit {
        Some(path) => SlabConfig::load_file(path).map(Some),
        None => SlabConfig::find_and_load(cwd),
    }
}

/// The loader settings in effect: file values (or defaults) plus overrides.
pub fn resolve(found: Option<&FoundConfig>, overrides: &Overrides) -> Result<LoaderConfig> {
    let mut config = match found {
        Some(found) => {
            tracing::debug!(path = %found.path.display(), "using configuration file");
            found.config.loader.clone()
        }
        None => LoaderConfig::default(),
    };
    overrides.apply(&mut config)?;
    Ok(config)
}
