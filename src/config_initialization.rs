//! Configuration initialization and hierarchy management

use tracing::{debug, info};

use crate::adapters::toml_config::{ConfigSources, ConverterConfig, TomlConfigAdapter};
use crate::cli::{Cli, Commands};
use crate::domain::errors::DomainError;

/// Resolve the configuration following precedence: CLI > Env > File > Defaults.
///
/// Nothing is logged here; pass the returned sources to
/// [`log_configuration_summary`] once the subscriber is installed.
pub fn initialize_configuration_hierarchy(
    cli: &Cli,
) -> Result<(ConverterConfig, ConfigSources), DomainError> {
    let (mut config, mut sources) = TomlConfigAdapter::load(cli.config.as_deref())?;
    sources.cli_overrides = apply_cli_configuration_overrides(&mut config, cli);
    config.validate()?;
    Ok((config, sources))
}

/// Lines describing where the effective configuration came from
pub fn configuration_summary(sources: &ConfigSources) -> Vec<String> {
    let mut lines = Vec::new();
    match &sources.file {
        Some(path) => lines.push(format!("Loaded configuration from {}", path.display())),
        None => lines.push("No config file found, using defaults".to_string()),
    }
    for applied in &sources.env_overrides {
        lines.push(format!("Found environment override: {}", applied));
    }
    if sources.cli_overrides > 0 {
        lines.push(format!("Applied {} command-line overrides", sources.cli_overrides));
    }
    lines
}

/// Log the configuration origin and the effective values
pub fn log_configuration_summary(config: &ConverterConfig, sources: &ConfigSources) {
    for line in configuration_summary(sources) {
        info!("{}", line);
    }
    debug!("Effective configuration: {:?}", config);
}

/// Apply CLI argument overrides to configuration, returning how many applied
pub fn apply_cli_configuration_overrides(config: &mut ConverterConfig, cli: &Cli) -> usize {
    let mut cli_overrides = 0;

    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
        cli_overrides += 1;
    }

    if let Commands::Convert(args) = &cli.command {
        if let Some(quality) = &args.quality {
            config.default_quality = quality.clone();
            cli_overrides += 1;
        }
        if let Some(library) = &args.library {
            config.library_dir = library.clone();
            cli_overrides += 1;
        }
        if let Some(jobs) = args.jobs {
            config.max_concurrent_jobs = jobs;
            cli_overrides += 1;
        }
        if args.no_audio {
            config.include_audio = false;
            cli_overrides += 1;
        }
        if let Some(candidates) = args.still_candidates {
            config.still_candidates = candidates;
            cli_overrides += 1;
        }
    }

    cli_overrides
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_convert_flags_override_config() {
        let cli = Cli::parse_from([
            "livepair",
            "--log-level",
            "debug",
            "convert",
            "a.mov",
            "--quality",
            "fast",
            "--library",
            "/tmp/lib",
            "--jobs",
            "2",
            "--no-audio",
        ]);
        let mut config = ConverterConfig::default();
        let applied = apply_cli_configuration_overrides(&mut config, &cli);

        assert_eq!(applied, 5);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.default_quality, "fast");
        assert_eq!(config.library_dir, PathBuf::from("/tmp/lib"));
        assert_eq!(config.max_concurrent_jobs, 2);
        assert!(!config.include_audio);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_jobs_fails_validation() {
        let cli = Cli::parse_from(["livepair", "convert", "a.mov", "--jobs", "0"]);
        let mut config = ConverterConfig::default();
        apply_cli_configuration_overrides(&mut config, &cli);
        assert!(matches!(config.validate(), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn test_verify_leaves_config_untouched() {
        let cli = Cli::parse_from(["livepair", "verify", "--image", "a.jpg", "--clip", "a.mov"]);
        let mut config = ConverterConfig::default();
        assert_eq!(apply_cli_configuration_overrides(&mut config, &cli), 0);
        assert_eq!(config, ConverterConfig::default());
    }

    #[test]
    fn test_summary_lists_every_layer() {
        let sources = ConfigSources {
            file: Some(PathBuf::from("livepair.toml")),
            env_overrides: vec!["LIVEPAIR_INCLUDE_AUDIO = false".to_string()],
            cli_overrides: 2,
        };
        assert_eq!(
            configuration_summary(&sources),
            vec![
                "Loaded configuration from livepair.toml".to_string(),
                "Found environment override: LIVEPAIR_INCLUDE_AUDIO = false".to_string(),
                "Applied 2 command-line overrides".to_string(),
            ]
        );
    }

    #[test]
    fn test_summary_without_file_mentions_defaults() {
        let lines = configuration_summary(&ConfigSources::default());
        assert_eq!(lines, vec!["No config file found, using defaults".to_string()]);
    }
}
