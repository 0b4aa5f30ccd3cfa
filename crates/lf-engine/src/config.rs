// config.rs — Engine configuration.
//
// EngineConfig says where the engine keeps its state: the tenant documents,
// the notification delivery log, and the commission ledger log. The
// `for_project()` constructor lays these out under `.leadflow/` in the
// project root; `.leadflow/config.toml` may override any of them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

const STATE_DIR: &str = ".leadflow";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// One `<tenant_id>.json` document per tenant.
    pub data_dir: PathBuf,

    /// JSONL log of notification deliveries.
    pub notifications_log: PathBuf,

    /// JSONL commission ledger.
    pub ledger_log: PathBuf,

    /// Seconds between deadline sweeps when running as a daemon.
    pub sweep_interval_secs: u64,
}

/// The on-disk shape: every field optional, relative paths resolved against
/// the project root.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    notifications_log: Option<PathBuf>,
    ledger_log: Option<PathBuf>,
    sweep_interval_secs: Option<u64>,
}

impl EngineConfig {
    /// Create a config with the standard `.leadflow/` layout for a project.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let dir = project_root.as_ref().join(STATE_DIR);
        Self {
            data_dir: dir.join("tenants"),
            notifications_log: dir.join("notifications.jsonl"),
            ledger_log: dir.join("ledger.jsonl"),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }

    pub fn config_path(project_root: impl AsRef<Path>) -> PathBuf {
        project_root.as_ref().join(STATE_DIR).join(CONFIG_FILE)
    }

    /// Load `.leadflow/config.toml` over the project defaults. A missing
    /// file yields the defaults.
    pub fn load(project_root: impl AsRef<Path>) -> Result<Self, EngineError> {
        let root = project_root.as_ref();
        let mut config = Self::for_project(root);
        let path = Self::config_path(root);
        if !path.exists() {
            return Ok(config);
        }

        let content = std::fs::read_to_string(&path).map_err(|source| EngineError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        let file: ConfigFile =
            toml::from_str(&content).map_err(|source| EngineError::ConfigError {
                path: path.display().to_string(),
                source,
            })?;

        if let Some(dir) = file.data_dir {
            config.data_dir = root.join(dir);
        }
        if let Some(log) = file.notifications_log {
            config.notifications_log = root.join(log);
        }
        if let Some(log) = file.ledger_log {
            config.ledger_log = root.join(log);
        }
        if let Some(secs) = file.sweep_interval_secs {
            if secs == 0 {
                return Err(EngineError::InvalidInput(format!(
                    "{}: sweep_interval_secs must be positive",
                    path.display()
                )));
            }
            config.sweep_interval_secs = secs;
        }
        Ok(config)
    }
}
