//! `otm.toml` configuration.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::cli::OutputFormat;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "otm.toml";

/// Settings for the `otm` binary. Command-line flags take precedence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Maximum log level: trace, debug, info, warn, error, off.
    pub log_level: String,
    /// Default output format.
    pub format: OutputFormat,
    /// Entry ids owned by this writer, used by `rebase` when no `--own`
    /// flag is given.
    pub own: Vec<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            format: OutputFormat::Text,
            own: Vec::new(),
        }
    }
}

impl CliConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid otm config")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Load `explicit` if given, else `otm.toml` in `dir` if it exists, else
    /// the defaults.
    pub fn resolve_in(dir: &Path, explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = dir.join(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            Self::load(&fallback)
        } else {
            Ok(Self::default())
        }
    }

    pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<Self> {
        Self::resolve_in(Path::new("."), explicit)
    }

    pub fn level(&self) -> anyhow::Result<LevelFilter> {
        self.log_level
            .parse()
            .with_context(|| format!("unknown log level {:?}", self.log_level))
    }
}
