// TOML config adapter - Layered converter configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use crate::adapters::tracing_log::LogLevel;
use crate::domain::errors::*;
use crate::domain::model::QualityProfile;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "livepair.toml";
/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "LIVEPAIR_";
/// Upper bound of the default job concurrency
const DEFAULT_MAX_JOBS_CAP: usize = 4;

/// Converter settings after all layers are applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Directory of the asset library receiving finished pairs
    pub library_dir: PathBuf,
    /// Parent of per-job scratch directories; system temp when unset
    pub scratch_dir: Option<PathBuf>,
    pub max_concurrent_jobs: usize,
    pub include_audio: bool,
    /// Still candidates scored per job; 1 renders the range start only
    pub still_candidates: usize,
    pub default_quality: String,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            library_dir: PathBuf::from("livepair-library"),
            scratch_dir: None,
            max_concurrent_jobs: num_cpus::get().clamp(1, DEFAULT_MAX_JOBS_CAP),
            include_audio: true,
            still_candidates: 1,
            default_quality: "balanced".to_string(),
            ffmpeg_path: None,
            ffprobe_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl ConverterConfig {
    /// Quality profile named by `default_quality`
    pub fn quality(&self) -> Result<QualityProfile, DomainError> {
        QualityProfile::parse(&self.default_quality)
    }

    /// Reject settings the converter cannot run with
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_concurrent_jobs == 0 {
            return Err(DomainError::InvalidInput(
                "max_concurrent_jobs must be at least 1".to_string(),
            ));
        }
        if self.still_candidates == 0 {
            return Err(DomainError::InvalidInput(
                "still_candidates must be at least 1".to_string(),
            ));
        }
        if self.library_dir.as_os_str().is_empty() {
            return Err(DomainError::InvalidInput(
                "library_dir must not be empty".to_string(),
            ));
        }
        self.quality()?;
        LogLevel::parse(&self.log_level)?;
        Ok(())
    }
}

/// Where the layers of a loaded configuration came from.
///
/// Loading runs before the subscriber exists, so the record is logged
/// afterwards instead of while loading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSources {
    /// Config file that was read
    pub file: Option<PathBuf>,
    /// Applied environment overrides as `NAME = value`
    pub env_overrides: Vec<String>,
    /// Number of command-line flags applied
    pub cli_overrides: usize,
}

/// Wrapper matching the `[livepair]` table of the config file
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    livepair: ConverterConfig,
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Defaults, then the config file, then `LIVEPAIR_*` variables.
    /// An explicit path must exist; the default file is optional.
    pub fn load(
        explicit_path: Option<&Path>,
    ) -> Result<(ConverterConfig, ConfigSources), DomainError> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        let file = match explicit_path {
            Some(path) => Some(path),
            None if default_path.exists() => Some(default_path),
            None => None,
        };
        let mut config = match file {
            Some(path) => Self::load_file(path)?,
            None => ConverterConfig::default(),
        };
        let env_overrides = Self::apply_env(&mut config, std::env::vars())?;
        let sources = ConfigSources {
            file: file.map(Path::to_path_buf),
            env_overrides,
            cli_overrides: 0,
        };
        Ok((config, sources))
    }

    /// Parse a config file on top of the defaults
    pub fn load_file(path: &Path) -> Result<ConverterConfig, DomainError> {
        if !path.exists() {
            return Err(DomainError::FileNotFound(format!(
                "Config file does not exist: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::InvalidInput(format!("Failed to read config file: {}", e))
        })?;
        Self::parse(&content)
    }

    /// Parse TOML text with a `[livepair]` table
    pub fn parse(content: &str) -> Result<ConverterConfig, DomainError> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| DomainError::InvalidInput(format!("Failed to parse TOML config: {}", e)))?;
        Ok(file.livepair)
    }

    /// Apply `LIVEPAIR_<KEY>` overrides from `vars`, returning the applied ones
    pub fn apply_env<I>(config: &mut ConverterConfig, vars: I) -> Result<Vec<String>, DomainError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut applied = Vec::new();
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match key {
                "LIBRARY_DIR" => config.library_dir = PathBuf::from(&value),
                "SCRATCH_DIR" => config.scratch_dir = Some(PathBuf::from(&value)),
                "MAX_CONCURRENT_JOBS" => {
                    config.max_concurrent_jobs = parse_env(&name, &value)?;
                }
                "INCLUDE_AUDIO" => config.include_audio = parse_env(&name, &value)?,
                "STILL_CANDIDATES" => config.still_candidates = parse_env(&name, &value)?,
                "DEFAULT_QUALITY" => config.default_quality = value.clone(),
                "FFMPEG_PATH" => config.ffmpeg_path = Some(PathBuf::from(&value)),
                "FFPROBE_PATH" => config.ffprobe_path = Some(PathBuf::from(&value)),
                "LOG_LEVEL" => config.log_level = value.clone(),
                _ => continue,
            }
            applied.push(format!("{} = {}", name, value));
        }
        Ok(applied)
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T, DomainError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| DomainError::InvalidInput(format!("Invalid value for {}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ConverterConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.max_concurrent_jobs >= 1 && config.max_concurrent_jobs <= 4);
        assert_eq!(config.quality().unwrap(), QualityProfile::Balanced);
    }

    #[test]
    fn test_parse_partial_table() {
        let config = TomlConfigAdapter::parse(
            r#"
            [livepair]
            library_dir = "/tmp/library"
            default_quality = "fast"
            still_candidates = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.library_dir, PathBuf::from("/tmp/library"));
        assert_eq!(config.quality().unwrap(), QualityProfile::Fast);
        assert_eq!(config.still_candidates, 3);
        assert!(config.include_audio);
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let err = TomlConfigAdapter::parse("[livepair]\nthreads = 2\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = TomlConfigAdapter::parse("[livepair]\ninclude_audio = true\n").unwrap();
        let vars = vec![
            ("LIVEPAIR_INCLUDE_AUDIO".to_string(), "false".to_string()),
            ("LIVEPAIR_MAX_CONCURRENT_JOBS".to_string(), "2".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ];
        let applied = TomlConfigAdapter::apply_env(&mut config, vars).unwrap();
        assert_eq!(
            applied,
            vec![
                "LIVEPAIR_INCLUDE_AUDIO = false".to_string(),
                "LIVEPAIR_MAX_CONCURRENT_JOBS = 2".to_string(),
            ]
        );
        assert!(!config.include_audio);
        assert_eq!(config.max_concurrent_jobs, 2);
    }

    #[test]
    fn test_env_rejects_bad_number() {
        let mut config = ConverterConfig::default();
        let vars = vec![("LIVEPAIR_STILL_CANDIDATES".to_string(), "many".to_string())];
        assert!(TomlConfigAdapter::apply_env(&mut config, vars).is_err());
    }

    #[test]
    fn test_validation_rejects_zero_and_unknown_quality() {
        let mut config = ConverterConfig::default();
        config.max_concurrent_jobs = 0;
        assert!(config.validate().is_err());

        let mut config = ConverterConfig::default();
        config.default_quality = "ultra".to_string();
        assert!(config.validate().is_err());

        let mut config = ConverterConfig::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = TomlConfigAdapter::load(Some(Path::new("/nonexistent/livepair.toml"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn test_load_records_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[livepair]\nstill_candidates = 2\n").unwrap();

        let (config, sources) = TomlConfigAdapter::load(Some(&path)).unwrap();
        assert_eq!(config.still_candidates, 2);
        assert_eq!(sources.file, Some(path));
        assert_eq!(sources.cli_overrides, 0);
    }
}
