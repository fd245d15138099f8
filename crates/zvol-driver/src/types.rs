use crate::dataset;
use crate::error::{DriverError, Result};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Logical block device backed by one zfs volume dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Volume name, used as the dataset's leaf name
    pub name: String,
    /// Size in gigabytes
    pub size: u64,
}

impl Volume {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Point-in-time copy of a volume, stored at `pool/volume_name@name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub volume_name: String,
    pub name: String,
}

impl Snapshot {
    pub fn new(volume_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            volume_name: volume_name.into(),
            name: name.into(),
        }
    }
}

/// Driver configuration, fixed for the lifetime of a driver instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Pool (or parent dataset) holding every managed volume
    pub pool: String,
    /// zfs binary name or path
    #[serde(default = "default_zfs_binary")]
    pub zfs_binary: String,
    /// Privilege helper prepended to every command; `None` runs zfs directly
    #[serde(default = "default_root_helper")]
    pub root_helper: Option<String>,
    /// Busy-destroy retry policy
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_zfs_binary() -> String {
    "zfs".to_string()
}

fn default_root_helper() -> Option<String> {
    Some("sudo".to_string())
}

impl DriverConfig {
    /// Create config from a pool name with default binary, helper and retry policy
    pub fn from_pool(pool: &str) -> Self {
        Self {
            pool: pool.to_string(),
            zfs_binary: default_zfs_binary(),
            root_helper: default_root_helper(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool.trim().is_empty() {
            return Err(DriverError::invalid_config(
                "pool name is empty",
                "Set --pool (or ZVOL_POOL) to an existing zfs pool, e.g. 'tank'",
            ));
        }
        if self.zfs_binary.trim().is_empty() {
            return Err(DriverError::invalid_config(
                "zfs binary is empty",
                "Set --zfs-binary to 'zfs' or an absolute path to it",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(DriverError::invalid_config(
                "retry max_attempts must be at least 1",
                "Use --busy-retry-attempts 1 to disable retries",
            ));
        }
        Ok(())
    }

    /// Derive the full dataset path for a volume
    pub fn volume_dataset(&self, volume_name: &str) -> String {
        dataset::dataset_path(&self.pool, volume_name)
    }

    /// Derive the full dataset path for a snapshot
    pub fn snapshot_dataset(&self, snapshot: &Snapshot) -> String {
        dataset::snapshot_path(&self.pool, &snapshot.volume_name, &snapshot.name)
    }
}
