use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Default number of document pipelines allowed to run at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
/// Default per-item deadline, in milliseconds.
pub const DEFAULT_PER_ITEM_TIMEOUT_MS: u64 = 300_000;
/// Default bonus added when a query term matches an item's category.
pub const DEFAULT_CATEGORY_BONUS: f32 = 0.1;
/// Default weight applied to the keyword Jaccard term.
pub const DEFAULT_KEYWORD_WEIGHT: f32 = 1.0;
/// Default maximum number of documents in a single batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;
/// Default maximum payload size for a single document (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value as provided.
        value: String,
    },
    /// A value parsed correctly but falls outside its accepted range.
    #[error("Out of range value for {key}: {reason}")]
    OutOfRange {
        /// Variable name.
        key: &'static str,
        /// Human readable constraint that was violated.
        reason: &'static str,
    },
}

/// Runtime configuration for the docrank service.
///
/// Built once at startup and handed to the components that need it by reference; core logic
/// never reads the environment itself.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of per-document pipelines executing concurrently.
    pub max_concurrency: usize,
    /// Deadline applied to each document pipeline.
    pub per_item_timeout_ms: u64,
    /// Bonus added to the similarity score on a category match.
    pub similarity_category_bonus: f32,
    /// Weight applied to the keyword overlap term of the similarity score.
    pub similarity_keyword_weight: f32,
    /// Maximum number of documents accepted per batch.
    pub max_batch_size: usize,
    /// Maximum payload size accepted per document, in bytes.
    pub max_file_size: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Whether audit events are recorded at all.
    pub audit_log_enabled: bool,
    /// Optional JSON-lines file receiving audit events.
    pub audit_log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            per_item_timeout_ms: DEFAULT_PER_ITEM_TIMEOUT_MS,
            similarity_category_bonus: DEFAULT_CATEGORY_BONUS,
            similarity_keyword_weight: DEFAULT_KEYWORD_WEIGHT,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            server_port: None,
            audit_log_enabled: true,
            audit_log_file: None,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Self::from_env()?;
        tracing::debug!(
            max_concurrency = config.max_concurrency,
            per_item_timeout_ms = config.per_item_timeout_ms,
            category_bonus = config.similarity_category_bonus,
            keyword_weight = config.similarity_keyword_weight,
            max_batch_size = config.max_batch_size,
            server_port = ?config.server_port,
            audit_log_file = ?config.audit_log_file,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup. Unset or blank keys use defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            max_concurrency: parse_or(&get, "MAX_CONCURRENCY", defaults.max_concurrency)?,
            per_item_timeout_ms: parse_or(
                &get,
                "PER_ITEM_TIMEOUT_MS",
                defaults.per_item_timeout_ms,
            )?,
            similarity_category_bonus: parse_or(
                &get,
                "SIMILARITY_CATEGORY_BONUS",
                defaults.similarity_category_bonus,
            )?,
            similarity_keyword_weight: parse_or(
                &get,
                "SIMILARITY_KEYWORD_WEIGHT",
                defaults.similarity_keyword_weight,
            )?,
            max_batch_size: parse_or(&get, "MAX_BATCH_SIZE", defaults.max_batch_size)?,
            max_file_size: parse_or(&get, "MAX_FILE_SIZE", defaults.max_file_size)?,
            server_port: get("SERVER_PORT")
                .map(|value| parse_value("SERVER_PORT", &value))
                .transpose()?,
            audit_log_enabled: get("AUDIT_LOG_ENABLED")
                .map(|value| parse_flag("AUDIT_LOG_ENABLED", &value))
                .transpose()?
                .unwrap_or(defaults.audit_log_enabled),
            audit_log_file: get("AUDIT_LOG_FILE").map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field and range constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::OutOfRange {
                key: "MAX_CONCURRENCY",
                reason: "must be at least 1",
            });
        }
        if self.per_item_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange {
                key: "PER_ITEM_TIMEOUT_MS",
                reason: "must be greater than zero",
            });
        }
        if !(0.0..=1.0).contains(&self.similarity_category_bonus) {
            return Err(ConfigError::OutOfRange {
                key: "SIMILARITY_CATEGORY_BONUS",
                reason: "must be within [0, 1]",
            });
        }
        if !self.similarity_keyword_weight.is_finite() || self.similarity_keyword_weight < 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "SIMILARITY_KEYWORD_WEIGHT",
                reason: "must be a finite, non-negative number",
            });
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::OutOfRange {
                key: "MAX_BATCH_SIZE",
                reason: "must be at least 1",
            });
        }
        if self.max_file_size == 0 {
            return Err(ConfigError::OutOfRange {
                key: "MAX_FILE_SIZE",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
{
    get(key).map_or(Ok(default), |value| parse_value(key, &value))
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
