use std::fs;
use std::path::Path;

use anyhow::Context;
use atomicwrite::{AtomicWriteOptions, FinalizeStrategy};
use atomicwrite_store::WriterOptions;
use serde::{Deserialize, Serialize};
use tracing::Level;

/// Contents of the `--config` TOML file.
///
/// ```toml
/// finalize = "copy"
///
/// [writer]
/// buffer_size = 131072
/// sync_on_close = true
///
/// [log]
/// level = "info"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub finalize: FinalizeStrategy,
    pub writer: WriterOptions,
    pub log: LogConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "warn".into() }
    }
}

impl LogConfig {
    pub fn max_level(&self) -> anyhow::Result<Level> {
        self.level
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid log level {:?}", self.level))
    }
}

impl CliConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn write_options(&self) -> AtomicWriteOptions {
        AtomicWriteOptions::default()
            .with_writer(self.writer.clone())
            .with_finalize(self.finalize)
    }
}
