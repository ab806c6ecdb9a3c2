use std::{net::SocketAddr, path::Path};

use anyhow::Context;
use batch_model::ProjectSpec;
use batch_observe::{LoggerConfig, LoggerFormat};
use serde::Deserialize;

pub const CONFIG_ENV: &str = "BATCHD_CONFIG";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub logger: LoggerSection,
    /// Node label recorded on builds; defaults to the host name.
    #[serde(default)]
    pub node: Option<String>,
    /// Principals allowed to trigger tasks over HTTP. Empty denies everyone.
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub projects: Vec<ProjectSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerSection {
    pub format: String,
    pub level: String,
    /// Level for the batch crates only, e.g. `"debug"` under a quiet `level`.
    #[serde(default)]
    pub batch_level: Option<String>,
}

impl Default for LoggerSection {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            level: "info".to_string(),
            batch_level: None,
        }
    }
}

impl LoggerSection {
    pub fn to_config(&self) -> anyhow::Result<LoggerConfig> {
        let format: LoggerFormat = self.format.parse()?;
        Ok(LoggerConfig {
            format,
            level: self.level.clone(),
            batch_level: self.batch_level.clone(),
            ..LoggerConfig::default()
        })
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8085))
}

impl DaemonConfig {
    /// Config path from the first CLI argument, else from `BATCHD_CONFIG`.
    pub fn locate() -> anyhow::Result<String> {
        std::env::args()
            .nth(1)
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .with_context(|| format!("usage: batchd <config.json> (or set {CONFIG_ENV})"))
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}
