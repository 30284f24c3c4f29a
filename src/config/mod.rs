//! Sync configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CONFIG_FILE: &str = "fable-sync.json";

/// What the orchestrator does when a queued push is flagged as conflicting
/// with a newer server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushConflictPolicy {
    /// Emit the advisory event, log a warning, execute anyway. Default.
    WarnAndProceed,
    /// Leave the operation pending and surface the conflict instead.
    Block,
}

/// Tunables for the push-sync pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Config schema version
    pub version: u32,

    /// Max operations folded into one batched server call
    pub batch_size: u64,

    /// Max operations drained per sync pass
    pub drain_limit: u64,

    /// Transient failures are requeued automatically until attempt_count
    /// reaches this; after that the operation waits for user retry.
    pub max_auto_attempts: u32,

    pub push_conflict_policy: PushConflictPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            version: Self::target_version(),
            batch_size: 50,
            drain_limit: 200,
            max_auto_attempts: 5,
            push_conflict_policy: PushConflictPolicy::WarnAndProceed,
        }
    }
}

impl SyncConfig {
    fn target_version() -> u32 {
        1
    }

    /// Load configuration from a data directory, writing defaults on first
    /// run.
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE);

        if config_path.exists() {
            info!("Loading sync config from {:?}", config_path);
            let json = fs::read_to_string(&config_path)?;
            let config: SyncConfig = serde_json::from_str(&json)?;
            if config.version != Self::target_version() {
                warn!(
                    "Sync config version {} differs from expected {}",
                    config.version,
                    Self::target_version()
                );
            }
            Ok(config)
        } else {
            warn!("No sync config found, creating default at {:?}", config_path);
            let config = Self::default();
            config.save(data_dir)?;
            Ok(config)
        }
    }

    /// Save configuration to disk.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(data_dir.join(CONFIG_FILE), json)?;
        Ok(())
    }

    /// Default on-disk location for the config and cache database.
    pub fn default_data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("fable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();

        let mut config = SyncConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(config.push_conflict_policy, PushConflictPolicy::WarnAndProceed);

        config.max_auto_attempts = 2;
        config.save(dir.path()).unwrap();

        let reloaded = SyncConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(reloaded.max_auto_attempts, 2);
    }
}
