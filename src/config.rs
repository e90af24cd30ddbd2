use config::{Config, ConfigError, File as ConfigFile};
use serde::Deserialize;
use std::path::PathBuf;

/// Persisted archiver settings. The engine consumes these read-only per run
/// and never writes them back.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiverConfig {
    /// Archive automatically after a recording finishes.
    #[serde(default)]
    pub enabled: bool,
    /// Copy new/changed files instead of moving old ones.
    #[serde(default)]
    pub backup_mode: bool,
    /// Skip archiving while a recording is running or about to start.
    #[serde(default = "default_true")]
    pub skip_during_records: bool,
    /// Surface an alert when the archive volume limit is reached.
    #[serde(default = "default_true")]
    pub show_limit_reached_notification: bool,
    /// Movie folder to archive from.
    pub source_path: PathBuf,
    /// Free-space limit on the source volume in whole GB.
    #[serde(default = "default_limit_gb")]
    pub source_limit_gb: u64,
    /// Directories excluded from backup-mode synchronization.
    #[serde(default)]
    pub exclude_dirs: Vec<PathBuf>,
    /// Archive folder movies are moved or copied to.
    pub target_path: PathBuf,
    /// Free-space limit on the target volume in whole GB.
    #[serde(default = "default_limit_gb")]
    pub target_limit_gb: u64,
}

fn default_true() -> bool {
    true
}

fn default_limit_gb() -> u64 {
    30
}

pub fn load_configuration() -> Result<ArchiverConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("MovieArchiver").required(false))
        .build()?;
    builder.try_deserialize::<ArchiverConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> ArchiverConfig {
        Config::builder()
            .add_source(ConfigFile::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = parse(
            r#"
            source_path = "/media/hdd/movie"
            target_path = "/media/usb/archive"
            "#,
        );
        assert!(!config.enabled);
        assert!(!config.backup_mode);
        assert!(config.skip_during_records);
        assert!(config.show_limit_reached_notification);
        assert_eq!(config.source_limit_gb, 30);
        assert_eq!(config.target_limit_gb, 30);
        assert!(config.exclude_dirs.is_empty());
    }

    #[test]
    fn test_full_config_round_trip() {
        let config = parse(
            r#"
            enabled = true
            backup_mode = true
            skip_during_records = false
            show_limit_reached_notification = false
            source_path = "/media/hdd/movie"
            source_limit_gb = 10
            exclude_dirs = ["/media/hdd/movie/keep"]
            target_path = "/media/usb/archive"
            target_limit_gb = 5
            "#,
        );
        assert!(config.enabled);
        assert!(config.backup_mode);
        assert!(!config.skip_during_records);
        assert_eq!(config.source_limit_gb, 10);
        assert_eq!(config.target_limit_gb, 5);
        assert_eq!(
            config.exclude_dirs,
            vec![PathBuf::from("/media/hdd/movie/keep")]
        );
    }
}
