use crate::config::{ReportFormat, RunConfig};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load and parse a run configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<RunConfig> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration file '{}'", config_path.display()))?;

    let config: RunConfig = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration file '{}'", config_path.display()))?;

    config.validate()?;

    Ok(config)
}

/// Command-line values that override the configuration file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub threads: Option<usize>,
    pub shard_size: Option<usize>,
    pub format: Option<ReportFormat>,
    pub log_level: Option<String>,
    pub verify: bool,
}

/// Apply CLI overrides to a run configuration
pub fn apply_cli_overrides(config: &mut RunConfig, overrides: &CliOverrides) -> Result<()> {
    if let Some(threads) = overrides.threads {
        config.threads = threads;
    }
    if let Some(shard_size) = overrides.shard_size {
        config.shard_size = shard_size;
    }
    if let Some(format) = overrides.format {
        config.format = format;
    }
    if let Some(log_level) = &overrides.log_level {
        config.log_level = log_level.clone();
    }
    // A flag can only switch the self-check on
    if overrides.verify {
        config.verify = true;
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let yaml = r#"
threads: 0
format: json
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.threads, 0);
        assert_eq!(config.format, ReportFormat::Json);
        assert_eq!(config.shard_size, 4096);
    }

    #[test]
    fn test_load_invalid_config() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "shard_size: 0\n").unwrap();
        assert!(load_config(temp_file.path()).is_err());

        assert!(load_config(Path::new("/nonexistent/ipsummary.yaml")).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = RunConfig::default();
        let overrides = CliOverrides {
            threads: Some(8),
            shard_size: None,
            format: Some(ReportFormat::Json),
            log_level: Some("debug".to_string()),
            verify: true,
        };

        apply_cli_overrides(&mut config, &overrides).unwrap();
        assert_eq!(config.threads, 8);
        assert_eq!(config.shard_size, 4096);
        assert_eq!(config.format, ReportFormat::Json);
        assert_eq!(config.log_level, "debug");
        assert!(config.verify);

        let bad = CliOverrides {
            shard_size: Some(0),
            ..CliOverrides::default()
        };
        assert!(apply_cli_overrides(&mut config, &bad).is_err());
    }
}
