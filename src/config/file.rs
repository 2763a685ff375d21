//! Configuration file loading and validation.
//!
//! The JSON file supplies sources, categories and storage settings; CLI options
//! override the storage/classification values. Validation happens once here so
//! the rest of the crate can rely on a well-formed `Config`.

use std::path::Path;

use crate::config::types::{Cli, Config, FileConfig};
use crate::error_handling::ConfigError;

/// Reads and parses the JSON configuration file.
pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: FileConfig = serde_json::from_str(&content)?;
    log::debug!(
        "Loaded {} source(s) and {} categories from {}",
        parsed.websites.len(),
        parsed.categories.len(),
        path.display()
    );
    Ok(parsed)
}

impl Config {
    /// Builds a `Config` from a parsed file, applying CLI overrides on top.
    pub fn from_parts(file: FileConfig, cli: &Cli) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let config = Config {
            sources: file.websites,
            categories: file.categories,
            db_path: cli
                .db_path
                .clone()
                .or(file.db_path)
                .unwrap_or(defaults.db_path),
            batch_size: cli
                .batch_size
                .or(file.batch_size)
                .unwrap_or(defaults.batch_size),
            pool_size: cli
                .pool_size
                .or(file.pool_size)
                .unwrap_or(defaults.pool_size),
            confidence_threshold: cli
                .confidence_threshold
                .or(file.confidence_threshold)
                .unwrap_or(defaults.confidence_threshold),
            low_confidence_policy: cli
                .low_confidence_policy
                .or(file.low_confidence_policy)
                .unwrap_or(defaults.low_confidence_policy),
            classifier: file.classifier.unwrap_or(defaults.classifier),
            max_items_per_source: file
                .max_items_per_source
                .unwrap_or(defaults.max_items_per_source),
            workers: cli.workers,
            user_agent: defaults.user_agent,
            clear_existing: cli.clear,
            log_level: cli.log_level.clone(),
            log_format: cli.log_format.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads the file named by `cli.config` and resolves it against the CLI.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = read_file_config(&cli.config)?;
        Self::from_parts(file, cli)
    }

    /// Checks the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if self.categories.is_empty() || self.categories.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::NoCategories);
        }
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::InvalidSource {
                    name: source.url.clone(),
                    reason: "name is empty".to_string(),
                });
            }
            if let Err(e) = url::Url::parse(&source.url) {
                return Err(ConfigError::InvalidSource {
                    name: source.name.clone(),
                    reason: format!("invalid url '{}': {}", source.url, e),
                });
            }
            if let Some(selector) = &source.selector {
                if scraper::Selector::parse(selector).is_err() {
                    return Err(ConfigError::InvalidSource {
                        name: source.name.clone(),
                        reason: format!("invalid CSS selector '{}'", selector),
                    });
                }
            }
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidSetting("batch_size must be at least 1"));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::InvalidSetting("pool_size must be at least 1"));
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidSetting("workers must be at least 1"));
        }
        if self.max_items_per_source == 0 {
            return Err(ConfigError::InvalidSetting(
                "max_items_per_source must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::InvalidThreshold(self.confidence_threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{LowConfidencePolicy, SourceConfig};
    use clap::Parser;
    use std::io::Write;
    use std::path::PathBuf;

    fn file_config() -> FileConfig {
        FileConfig {
            websites: vec![SourceConfig {
                name: "Example".to_string(),
                url: "https://example.com".to_string(),
                selector: Some("h2.title".to_string()),
            }],
            categories: vec!["Sports".to_string(), "Politics".to_string()],
            db_path: Some(PathBuf::from("from_file.db")),
            batch_size: Some(20),
            ..Default::default()
        }
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let cli = Cli::parse_from([
            "headline_ingest",
            "--db-path",
            "cli.db",
            "--pool-size",
            "5",
            "--low-confidence-policy",
            "drop",
        ]);
        let config = Config::from_parts(file_config(), &cli).unwrap();
        assert_eq!(config.db_path, PathBuf::from("cli.db"));
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.pool_size, 5);
        assert_eq!(config.low_confidence_policy, LowConfidencePolicy::Drop);
        assert_eq!(config.confidence_threshold, 0.3);
    }

    #[test]
    fn test_missing_sources_rejected() {
        let cli = Cli::parse_from(["headline_ingest"]);
        let file = FileConfig {
            websites: vec![],
            ..file_config()
        };
        assert!(matches!(
            Config::from_parts(file, &cli),
            Err(ConfigError::NoSources)
        ));
    }

    #[test]
    fn test_missing_categories_rejected() {
        let cli = Cli::parse_from(["headline_ingest"]);
        let file = FileConfig {
            categories: vec![],
            ..file_config()
        };
        assert!(matches!(
            Config::from_parts(file, &cli),
            Err(ConfigError::NoCategories)
        ));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let cli = Cli::parse_from(["headline_ingest", "--batch-size", "0"]);
        assert!(matches!(
            Config::from_parts(file_config(), &cli),
            Err(ConfigError::InvalidSetting(_))
        ));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let cli = Cli::parse_from(["headline_ingest", "--confidence-threshold", "1.5"]);
        assert!(matches!(
            Config::from_parts(file_config(), &cli),
            Err(ConfigError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_invalid_source_url_rejected() {
        let cli = Cli::parse_from(["headline_ingest"]);
        let mut file = file_config();
        file.websites[0].url = "not a url".to_string();
        assert!(matches!(
            Config::from_parts(file, &cli),
            Err(ConfigError::InvalidSource { .. })
        ));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let cli = Cli::parse_from(["headline_ingest"]);
        let mut file = file_config();
        file.websites[0].selector = Some("h2[".to_string());
        assert!(matches!(
            Config::from_parts(file, &cli),
            Err(ConfigError::InvalidSource { .. })
        ));
    }

    #[test]
    fn test_read_file_config_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"websites": [{{"name": "A", "url": "https://a.example"}}], "categories": ["X"]}}"#
        )
        .unwrap();
        let parsed = read_file_config(file.path()).unwrap();
        assert_eq!(parsed.websites[0].name, "A");
        assert_eq!(parsed.categories, vec!["X"]);
    }

    #[test]
    fn test_read_missing_file_reports_path() {
        let err = read_file_config(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            read_file_config(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
