//! Configuration types and CLI options.
//!
//! This module defines the command-line options, the on-disk configuration
//! file shape and the resolved `Config` the library runs with.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::config::constants::{
    CONFIG_PATH, DB_PATH, DEFAULT_BATCH_SIZE, DEFAULT_CLASSIFIER_ENDPOINT,
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MAX_ITEMS_PER_SOURCE, DEFAULT_POOL_SIZE,
    DEFAULT_USER_AGENT,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// What happens to an item whose best classification score is under the
/// confidence threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LowConfidencePolicy {
    /// Store the item with the `Uncategorized` category
    #[default]
    Keep,
    /// Skip the item entirely
    Drop,
}

/// One configured source: a page and the selector its headlines live under.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SourceConfig {
    /// Name stored in the `source` column
    pub name: String,
    /// Page to download
    pub url: String,
    /// CSS selector for the headline elements (falls back to `h1`, `h2`, `a`)
    #[serde(default)]
    pub selector: Option<String>,
}

/// Zero-shot classification endpoint settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ClassifierConfig {
    /// Inference endpoint accepting `{"inputs", "parameters": {"candidate_labels"}}`
    #[serde(default = "default_classifier_endpoint")]
    pub endpoint: String,
    /// Bearer token sent with every request, if any
    #[serde(default)]
    pub api_token: Option<String>,
}

fn default_classifier_endpoint() -> String {
    DEFAULT_CLASSIFIER_ENDPOINT.to_string()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_classifier_endpoint(),
            api_token: None,
        }
    }
}

/// Shape of the JSON configuration file.
///
/// ```json
/// {
///   "websites": [
///     { "name": "Example", "url": "https://example.com", "selector": "h2.title" }
///   ],
///   "categories": ["Politics", "Sports", "Technology"],
///   "db_path": "headlines.db",
///   "batch_size": 50,
///   "pool_size": 3,
///   "confidence_threshold": 0.3,
///   "low_confidence_policy": "keep"
/// }
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub websites: Vec<SourceConfig>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub db_path: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub pool_size: Option<usize>,
    pub confidence_threshold: Option<f64>,
    pub low_confidence_policy: Option<LowConfidencePolicy>,
    pub max_items_per_source: Option<usize>,
    #[serde(default)]
    pub classifier: Option<ClassifierConfig>,
}

/// Command-line options.
///
/// Every storage/classification option overrides the matching value from the
/// configuration file.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "headline_ingest",
    about = "Scrape headlines, classify them and store them in SQLite"
)]
pub struct Cli {
    /// JSON configuration file (sources, categories, storage settings)
    #[arg(long, short = 'c', default_value = CONFIG_PATH)]
    pub config: PathBuf,

    /// SQLite database path (overrides `db_path` from the config file)
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Records per transactional batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Number of pooled database connections
    #[arg(long)]
    pub pool_size: Option<usize>,

    /// Best-score threshold under which items are low confidence (0.0-1.0)
    #[arg(long)]
    pub confidence_threshold: Option<f64>,

    /// What to do with low-confidence items
    #[arg(long, value_enum)]
    pub low_confidence_policy: Option<LowConfidencePolicy>,

    /// Number of sources processed concurrently
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Delete all stored headlines before scraping
    #[arg(long)]
    pub clear: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,
}

/// Library configuration (no CLI dependencies).
///
/// This is the resolved configuration the library runs with. It can be
/// constructed programmatically:
///
/// ```no_run
/// use headline_ingest::{Config, SourceConfig};
///
/// let config = Config {
///     sources: vec![SourceConfig {
///         name: "Example".into(),
///         url: "https://example.com".into(),
///         selector: Some("h2".into()),
///     }],
///     categories: vec!["Sports".into(), "Politics".into()],
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Sources to scrape
    pub sources: Vec<SourceConfig>,

    /// Candidate category labels
    pub categories: Vec<String>,

    /// Database path (SQLite file)
    pub db_path: PathBuf,

    /// Records per batch
    pub batch_size: usize,

    /// Pooled connections
    pub pool_size: usize,

    /// Confidence threshold (0.0-1.0)
    pub confidence_threshold: f64,

    /// Low-confidence handling
    pub low_confidence_policy: LowConfidencePolicy,

    /// Classification endpoint
    pub classifier: ClassifierConfig,

    /// Items kept per source
    pub max_items_per_source: usize,

    /// Sources processed concurrently
    pub workers: usize,

    /// HTTP User-Agent header value for page downloads
    pub user_agent: String,

    /// Delete existing rows before the run
    pub clear_existing: bool,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            categories: Vec::new(),
            db_path: PathBuf::from(DB_PATH),
            batch_size: DEFAULT_BATCH_SIZE,
            pool_size: DEFAULT_POOL_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            low_confidence_policy: LowConfidencePolicy::Keep,
            classifier: ClassifierConfig::default(),
            max_items_per_source: DEFAULT_MAX_ITEMS_PER_SOURCE,
            workers: 1,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            clear_existing: false,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.pool_size, 3);
        assert_eq!(config.confidence_threshold, 0.3);
        assert_eq!(config.low_confidence_policy, LowConfidencePolicy::Keep);
        assert_eq!(config.workers, 1);
        assert!(!config.clear_existing);
        assert_eq!(config.db_path, PathBuf::from("./headlines.db"));
    }

    #[test]
    fn test_file_config_parses_original_shape() {
        let json = r##"{
            "websites": [
                {"name": "Tube", "url": "https://example.com/feed", "selector": "#video-title"},
                {"name": "News", "url": "https://example.org"}
            ],
            "categories": ["Music", "Gaming"],
            "db_path": "youtube.db"
        }"##;
        let parsed: FileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.websites.len(), 2);
        assert_eq!(parsed.websites[0].selector.as_deref(), Some("#video-title"));
        assert_eq!(parsed.websites[1].selector, None);
        assert_eq!(parsed.categories, vec!["Music", "Gaming"]);
        assert_eq!(parsed.db_path, Some(PathBuf::from("youtube.db")));
        assert!(parsed.batch_size.is_none());
        assert!(parsed.classifier.is_none());
    }

    #[test]
    fn test_low_confidence_policy_deserializes_lowercase() {
        let keep: LowConfidencePolicy = serde_json::from_str("\"keep\"").unwrap();
        let drop: LowConfidencePolicy = serde_json::from_str("\"drop\"").unwrap();
        assert_eq!(keep, LowConfidencePolicy::Keep);
        assert_eq!(drop, LowConfidencePolicy::Drop);
    }

    #[test]
    fn test_classifier_config_endpoint_defaults() {
        let parsed: ClassifierConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.endpoint, DEFAULT_CLASSIFIER_ENDPOINT);
        assert!(parsed.api_token.is_none());
    }
}
