use clap::{Args, Parser, Subcommand, ValueEnum};
use std::time::Duration;
use tracing::info;
use zvol_driver::{
    Backoff, DriverConfig, RetryPolicy, Snapshot, Volume, VolumeDriver, ZfsVolumeDriver,
};

#[derive(Parser)]
#[command(name = "zvol", about = "ZFS volume driver")]
struct Cli {
    #[command(flatten)]
    driver: DriverArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DriverArgs {
    /// Pool (or parent dataset) holding the volumes
    #[arg(long, env = "ZVOL_POOL")]
    pool: String,
    /// zfs binary name or path
    #[arg(long, env = "ZVOL_ZFS_BINARY", default_value = "zfs")]
    zfs_binary: String,
    /// Privilege helper prepended to every zfs call; empty runs zfs directly
    #[arg(long, env = "ZVOL_ROOT_HELPER", default_value = "sudo")]
    root_helper: String,
    /// Total destroy attempts while a volume is busy
    #[arg(long, env = "ZVOL_BUSY_RETRY_ATTEMPTS", default_value_t = 3)]
    busy_retry_attempts: u32,
    /// Seconds to wait before retrying a busy destroy
    #[arg(long, env = "ZVOL_BUSY_RETRY_INTERVAL_SECS", default_value_t = 15)]
    busy_retry_interval_secs: u64,
    /// How the wait grows between retries
    #[arg(long, env = "ZVOL_BUSY_RETRY_BACKOFF", value_enum, default_value_t = BackoffArg::Fixed)]
    busy_retry_backoff: BackoffArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackoffArg {
    Fixed,
    Exponential,
}

impl From<BackoffArg> for Backoff {
    fn from(arg: BackoffArg) -> Self {
        match arg {
            BackoffArg::Fixed => Backoff::Fixed,
            BackoffArg::Exponential => Backoff::Exponential,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a sparse volume (no-op if it already exists)
    CreateVolume {
        #[arg(long)]
        name: String,
        /// Size in gigabytes
        #[arg(long)]
        size: u64,
    },
    /// Create a volume by cloning a snapshot (inherits the snapshot's size)
    CreateVolumeFromSnapshot {
        #[arg(long)]
        name: String,
        /// Volume the snapshot belongs to
        #[arg(long)]
        snapshot_volume: String,
        #[arg(long)]
        snapshot: String,
    },
    /// Destroy a volume and its snapshots
    DeleteVolume {
        #[arg(long)]
        name: String,
    },
    /// Snapshot a volume
    CreateSnapshot {
        #[arg(long)]
        volume: String,
        #[arg(long)]
        name: String,
    },
    /// Destroy a snapshot (deferred while clones depend on it)
    DeleteSnapshot {
        #[arg(long)]
        volume: String,
        #[arg(long)]
        name: String,
    },
    /// Grow a volume
    ExtendVolume {
        #[arg(long)]
        name: String,
        /// New size in gigabytes
        #[arg(long)]
        size: u64,
    },
    /// Create a volume as a clone of another volume (inherits its size)
    CloneVolume {
        #[arg(long)]
        name: String,
        /// Source volume name
        #[arg(long)]
        source: String,
    },
    /// Print the device node of a volume
    LocalPath {
        #[arg(long)]
        name: String,
    },
}

impl DriverArgs {
    fn into_config(self) -> DriverConfig {
        let root_helper = if self.root_helper.trim().is_empty() {
            None
        } else {
            Some(self.root_helper)
        };
        DriverConfig {
            pool: self.pool,
            zfs_binary: self.zfs_binary,
            root_helper,
            retry: RetryPolicy::new(
                self.busy_retry_attempts,
                Duration::from_secs(self.busy_retry_interval_secs),
                self.busy_retry_backoff.into(),
            ),
        }
    }
}

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.driver.into_config();
    let driver = ZfsVolumeDriver::from_config(config)?;

    info!("Using pool '{}'", driver.config().pool);
    run(&driver, cli.command)?;
    Ok(())
}

fn run(driver: &ZfsVolumeDriver, command: Commands) -> miette::Result<()> {
    match command {
        Commands::CreateVolume { name, size } => driver.create_volume(&Volume::new(name, size))?,
        // Clones take their size from the origin; only names locate datasets
        Commands::CreateVolumeFromSnapshot {
            name,
            snapshot_volume,
            snapshot,
        } => driver.create_volume_from_snapshot(
            &Volume::new(name, 0),
            &Snapshot::new(snapshot_volume, snapshot),
        )?,
        Commands::DeleteVolume { name } => driver.delete_volume(&Volume::new(name, 0))?,
        Commands::CreateSnapshot { volume, name } => {
            driver.create_snapshot(&Snapshot::new(volume, name))?
        }
        Commands::DeleteSnapshot { volume, name } => {
            driver.delete_snapshot(&Snapshot::new(volume, name))?
        }
        Commands::ExtendVolume { name, size } => {
            driver.extend_volume(&Volume::new(name, 0), size)?
        }
        Commands::CloneVolume { name, source } => {
            driver.create_cloned_volume(&Volume::new(name, 0), &Volume::new(source, 0))?
        }
        Commands::LocalPath { name } => {
            println!("{}", driver.local_path(&Volume::new(name, 0)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_driver_flags() {
        let cli = Cli::try_parse_from([
            "zvol",
            "--pool",
            "tank",
            "--root-helper",
            "",
            "--busy-retry-attempts",
            "5",
            "--busy-retry-backoff",
            "exponential",
            "delete-volume",
            "--name",
            "vol001",
        ])
        .unwrap();

        let config = cli.driver.into_config();
        assert_eq!(config.pool, "tank");
        assert_eq!(config.zfs_binary, "zfs");
        assert!(config.root_helper.is_none());
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.interval, Duration::from_secs(15));
        assert_eq!(config.retry.backoff, Backoff::Exponential);
        assert!(matches!(cli.command, Commands::DeleteVolume { name } if name == "vol001"));
    }

    #[test]
    fn test_cli_defaults_to_sudo() {
        let cli = Cli::try_parse_from([
            "zvol",
            "--pool",
            "tank",
            "create-volume",
            "--name",
            "vol001",
            "--size",
            "20",
        ])
        .unwrap();

        assert_eq!(cli.driver.into_config().root_helper.as_deref(), Some("sudo"));
    }

    #[test]
    fn test_clone_commands_take_no_size() {
        let cli = Cli::try_parse_from([
            "zvol",
            "--pool",
            "tank",
            "clone-volume",
            "--name",
            "vol003",
            "--source",
            "vol001",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::CloneVolume { name, source } if name == "vol003" && source == "vol001"
        ));

        let result = Cli::try_parse_from([
            "zvol",
            "--pool",
            "tank",
            "create-volume-from-snapshot",
            "--name",
            "vol001",
            "--size",
            "20",
            "--snapshot-volume",
            "vol002",
            "--snapshot",
            "snapity",
        ]);
        assert!(result.is_err());
    }
}
