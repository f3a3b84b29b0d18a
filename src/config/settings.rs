use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fsutil::{self, ReadLimits};

use super::policy::{DEFAULT_MIN_AGE, MountPolicy, PerOpFilter};
use super::table::MountTable;
use super::{Error, Result};

/// Environment variable naming the JSON configuration file.
pub const CONFIG_ENV: &str = "NFS_COLLECTOR_CONFIG";

/// Policy entry as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    pub min_age: u64,
    pub show: bool,
    pub per_op_statistics: Option<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_age: DEFAULT_MIN_AGE,
            show: true,
            per_op_statistics: None,
        }
    }
}

impl From<&PolicyConfig> for MountPolicy {
    fn from(value: &PolicyConfig) -> Self {
        Self {
            min_age: value.min_age,
            show: value.show,
            per_op: PerOpFilter::parse(value.per_op_statistics.as_deref()),
        }
    }
}

/// Collector configuration, loaded once at start-up.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub interval_secs: u64,
    pub listen_addr: String,
    /// Gates every read of the mountstats report.
    pub collect_mountstats: bool,
    pub mountstats_path: PathBuf,
    pub rpc_client_path: PathBuf,
    pub rpc_server_path: PathBuf,
    pub osrelease_path: PathBuf,
    pub max_report_bytes: u64,
    pub max_report_lines: usize,
    pub mounts: BTreeMap<String, PolicyConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let limits = ReadLimits::default();
        Self {
            interval_secs: 10,
            listen_addr: "127.0.0.1:3000".to_owned(),
            collect_mountstats: true,
            mountstats_path: PathBuf::from("/proc/self/mountstats"),
            rpc_client_path: PathBuf::from("/proc/net/rpc/nfs"),
            rpc_server_path: PathBuf::from("/proc/net/rpc/nfsd"),
            osrelease_path: PathBuf::from("/proc/sys/kernel/osrelease"),
            max_report_bytes: limits.max_bytes,
            max_report_lines: limits.max_lines,
            mounts: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Loads the configuration named by `NFS_COLLECTOR_CONFIG`, or the
    /// defaults if the variable is unset.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(PathBuf::from(path)),
            None => {
                log::info!("{CONFIG_ENV} is not set, using default configuration");
                Ok(Self::default())
            }
        }
    }

    /// Reads and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// - [`Error::FileOpen`] if the file cannot be opened.
    /// - [`Error::Parse`] if it is not valid JSON for this schema.
    /// - [`Error::Invalid`] if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = fsutil::open_file_reader(path)?;
        let config = Self::from_reader(reader, path)?;
        log::info!(
            "Loaded configuration from `{}` ({} mount entries)",
            path.display(),
            config.mounts.len()
        );
        Ok(config)
    }

    fn from_reader<R: Read>(reader: R, origin: &Path) -> Result<Self> {
        let config: Self = serde_json::from_reader(reader).map_err(|source| Error::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(Error::Invalid("`interval_secs` must be non-zero".to_owned()));
        }
        if self.max_report_bytes == 0 || self.max_report_lines == 0 {
            return Err(Error::Invalid(
                "`max_report_bytes` and `max_report_lines` must be non-zero".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn read_limits(&self) -> ReadLimits {
        ReadLimits {
            max_bytes: self.max_report_bytes,
            max_lines: self.max_report_lines,
        }
    }

    /// Builds the read-only policy table.
    pub fn mount_table(&self) -> MountTable {
        MountTable::new(
            self.mounts
                .iter()
                .map(|(mountpoint, policy)| (mountpoint.clone(), MountPolicy::from(policy)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::config::WILDCARD;

    fn parse(json: &str) -> Result<Config> {
        Config::from_reader(json.as_bytes(), Path::new("/dummy.json"))
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse("{}").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.collect_mountstats);
        assert_eq!(config.interval(), Duration::from_secs(10));
    }

    #[test]
    fn parses_full_document() {
        let config = parse(
            r#"{
                "interval_secs": 30,
                "listen_addr": "0.0.0.0:9100",
                "collect_mountstats": false,
                "mountstats_path": "/tmp/mountstats",
                "max_report_lines": 500,
                "mounts": {
                    "all": { "min_age": 0, "show": true, "per_op_statistics": "all" },
                    "/mnt/data": { "per_op_statistics": "READ,WRITE" },
                    "/mnt/hidden": { "show": false }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.interval_secs, 30);
        assert_eq!(config.listen_addr, "0.0.0.0:9100");
        assert!(!config.collect_mountstats);
        assert_eq!(config.mountstats_path, PathBuf::from("/tmp/mountstats"));
        assert_eq!(config.read_limits().max_lines, 500);

        let table = config.mount_table();
        assert_eq!(table.len(), 3);
        assert_eq!(table.wildcard().per_op, PerOpFilter::All);
        assert_eq!(table.wildcard().min_age, 0);

        let data = table.resolve("/mnt/data");
        assert_eq!(data.min_age, DEFAULT_MIN_AGE);
        assert!(data.per_op.includes("READ"));
        assert!(!data.per_op.includes("GETATTR"));

        assert!(!table.resolve("/mnt/hidden").show);
        assert_eq!(table.resolve("/elsewhere"), table.resolve(WILDCARD));
    }

    #[test]
    fn wildcard_is_synthesized() {
        let config = parse(r#"{ "mounts": { "/mnt/a": { "min_age": 1 } } }"#).unwrap();
        let table = config.mount_table();
        assert_eq!(table.len(), 2);
        assert_eq!(table.wildcard(), &MountPolicy::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse(r#"{ "mounts": { "/mnt/a": { "minage": 1 } } }"#).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));

        let err = parse(r#"{ "intervall": 5 }"#).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn zero_interval_is_invalid() {
        let err = parse(r#"{ "interval_secs": 0 }"#).unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));
    }

    #[test]
    fn load_from_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, r#"{{ "interval_secs": 5 }}"#).unwrap();

        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.interval_secs, 5);
    }

    #[test]
    fn load_missing_file() {
        let err = Config::load("/definitely/does/not/exist.json").unwrap_err();
        match err {
            Error::FileOpen(err) => {
                assert_eq!(err.path, PathBuf::from("/definitely/does/not/exist.json"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
