/// Derive the full dataset path for a volume
pub fn dataset_path(pool: &str, volume_name: &str) -> String {
    format!("{}/{}", pool, volume_name)
}

/// Derive the full dataset path for a snapshot of a volume
pub fn snapshot_path(pool: &str, volume_name: &str, snapshot_name: &str) -> String {
    format!("{}@{}", dataset_path(pool, volume_name), snapshot_name)
}

/// Block device node zfs exposes for a volume dataset
pub fn device_path(pool: &str, volume_name: &str) -> String {
    format!("/dev/zvol/{}", dataset_path(pool, volume_name))
}

/// Parse `zfs get -H -r -t snapshot clones <dataset>` output into clone names
///
/// Each line is `name<TAB>property<TAB>value<TAB>source`, where value is a
/// comma-separated clone list or `-`.
pub fn parse_clones(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split('\t').nth(2))
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|clone| !clone.is_empty() && *clone != "-")
        .map(str::to_string)
        .collect()
}
