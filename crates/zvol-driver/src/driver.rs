use crate::classify::CommandOutcome;
use crate::command::{CommandExecutor, ProcessExecutor};
use crate::dataset;
use crate::error::{DriverError, Result};
use crate::retry::{Sleeper, ThreadSleeper};
use crate::types::{DriverConfig, Snapshot, Volume};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Block-storage lifecycle operations exposed to the orchestration service
///
/// Every call blocks until all of its commands (and any retry waits) finish.
/// The driver keeps no state between calls beyond its configuration.
pub trait VolumeDriver: Send + Sync {
    /// Create a volume. Succeeds without changes if the dataset already exists.
    fn create_volume(&self, volume: &Volume) -> Result<()>;

    /// Clone a snapshot into a new volume.
    fn create_volume_from_snapshot(&self, volume: &Volume, snapshot: &Snapshot) -> Result<()>;

    /// Recursively destroy a volume, retrying while the dataset is busy.
    fn delete_volume(&self, volume: &Volume) -> Result<()>;

    /// Snapshot a volume.
    fn create_snapshot(&self, snapshot: &Snapshot) -> Result<()>;

    /// Destroy a snapshot, deferring cleanup while clones still depend on it.
    fn delete_snapshot(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Volume driver backed by zfs volumes (zvols) in a single pool
pub struct ZfsVolumeDriver {
    config: DriverConfig,
    executor: Arc<dyn CommandExecutor>,
    sleeper: Arc<dyn Sleeper>,
}

impl ZfsVolumeDriver {
    /// Build a driver that runs zfs as a child process, escalating through
    /// the configured root helper.
    pub fn from_config(config: DriverConfig) -> Result<Self> {
        let executor = Arc::new(ProcessExecutor::new(config.root_helper.clone()));
        Self::new(config, executor)
    }

    /// Build a driver on top of a caller-supplied executor. `root_helper` in
    /// `config` is ignored; privilege is up to the executor.
    pub fn new(config: DriverConfig, executor: Arc<dyn CommandExecutor>) -> Result<Self> {
        Self::with_sleeper(config, executor, Arc::new(ThreadSleeper))
    }

    pub fn with_sleeper(
        config: DriverConfig,
        executor: Arc<dyn CommandExecutor>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            executor,
            sleeper,
        })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    fn zfs(&self, args: &[&str]) -> CommandOutcome {
        self.executor
            .execute(&self.config.zfs_binary, args, true)
            .into()
    }

    /// Clones that depend on snapshots of `dataset`
    pub fn dependent_clones(&self, dataset: &str) -> Result<Vec<String>> {
        let output = self
            .zfs(&["get", "-H", "-r", "-t", "snapshot", "clones", dataset])
            .into_result()?;
        Ok(dataset::parse_clones(&output.stdout))
    }

    fn destroy_dataset(&self, dataset: &str) -> Result<()> {
        let mut attempts = 0;
        loop {
            let clones = self.dependent_clones(dataset)?;
            if !clones.is_empty() {
                debug!("Dataset {} has dependent clones: {}", dataset, clones.join(", "));
            }

            attempts += 1;
            match self.zfs(&["destroy", "-r", dataset]) {
                CommandOutcome::Ok(_) => return Ok(()),
                CommandOutcome::Busy(err) => {
                    if !self.config.retry.allows_retry(attempts) {
                        return Err(DriverError::retries_exhausted(
                            dataset,
                            attempts,
                            err.stderr().unwrap_or_default(),
                        ));
                    }
                    let delay = self.config.retry.delay_for(attempts);
                    warn!(
                        "Dataset {} is busy (attempt {}/{}), retrying in {:?}",
                        dataset, attempts, self.config.retry.max_attempts, delay
                    );
                    self.sleeper.sleep(delay);
                }
                other => return other.into_result().map(|_| ()),
            }
        }
    }

    /// Grow a volume to `new_size` gigabytes
    pub fn extend_volume(&self, volume: &Volume, new_size: u64) -> Result<()> {
        let dataset = self.config.volume_dataset(&volume.name);
        info!("Extending volume {} to {}g", dataset, new_size);
        self.zfs(&["set", &format!("volsize={}g", new_size), &dataset])
            .into_result()?;
        info!("Volume extended: {}", dataset);
        Ok(())
    }

    /// Create `volume` as a clone of a fresh snapshot of `source`
    ///
    /// The intermediate snapshot stays in place since the clone depends on it.
    pub fn create_cloned_volume(&self, volume: &Volume, source: &Volume) -> Result<()> {
        let snapshot = Snapshot::new(&source.name, format!("clone-snap-{}", volume.name));
        self.create_snapshot(&snapshot)?;
        self.create_volume_from_snapshot(volume, &snapshot)
    }

    /// Device node for a volume
    pub fn local_path(&self, volume: &Volume) -> String {
        dataset::device_path(&self.config.pool, &volume.name)
    }
}

impl VolumeDriver for ZfsVolumeDriver {
    fn create_volume(&self, volume: &Volume) -> Result<()> {
        let dataset = self.config.volume_dataset(&volume.name);

        match self.zfs(&["list", &dataset]) {
            CommandOutcome::Ok(_) => {
                info!("Volume {} already exists, nothing to do", dataset);
                return Ok(());
            }
            CommandOutcome::NotFound(_) => {}
            other => return other.into_result().map(|_| ()),
        }

        info!("Creating volume: {} ({}g)", dataset, volume.size);
        let size = format!("{}g", volume.size);
        self.zfs(&["create", "-s", "-V", &size, &dataset])
            .into_result()?;
        info!("Volume created: {}", dataset);
        Ok(())
    }

    fn create_volume_from_snapshot(&self, volume: &Volume, snapshot: &Snapshot) -> Result<()> {
        let origin = self.config.snapshot_dataset(snapshot);
        let dataset = self.config.volume_dataset(&volume.name);
        info!("Cloning {} into volume {}", origin, dataset);
        self.zfs(&["clone", &origin, &dataset]).into_result()?;
        info!("Volume created from snapshot: {}", dataset);
        Ok(())
    }

    fn delete_volume(&self, volume: &Volume) -> Result<()> {
        let dataset = self.config.volume_dataset(&volume.name);
        info!("Destroying volume: {}", dataset);
        self.destroy_dataset(&dataset)?;
        info!("Volume destroyed: {}", dataset);
        Ok(())
    }

    fn create_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let snap = self.config.snapshot_dataset(snapshot);
        self.zfs(&["snapshot", &snap]).into_result()?;
        info!("Snapshot created: {}", snap);
        Ok(())
    }

    fn delete_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let snap = self.config.snapshot_dataset(snapshot);
        self.zfs(&["destroy", "-d", &snap]).into_result()?;
        info!("Snapshot destroyed: {}", snap);
        Ok(())
    }
}
