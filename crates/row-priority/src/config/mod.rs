use crate::workflows::prioritization::EngineConfig;
use crate::workflows::publication::PublishMode;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for a scoring or dataset sync run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub segments: SegmentSourceConfig,
    pub socrata: SocrataConfig,
    pub publish: PublishConfig,
    pub metrics: MetricsConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let storage = StorageConfig {
            blob_store_dir: PathBuf::from(
                env::var("BLOB_STORE_DIR").unwrap_or_else(|_| "./data".to_string()),
            ),
            permits_file: env::var("PERMITS_FILE")
                .unwrap_or_else(|_| "row_inspector_permit_list.csv".to_string()),
            segments_file: env::var("SEGMENTS_FILE")
                .unwrap_or_else(|_| "row_inspector_segment_list.csv".to_string()),
        };

        let segments = match (non_empty("SEGMENT_CATALOG_FILE"), non_empty("SEGMENT_DATASET")) {
            (Some(file_name), _) => SegmentSourceConfig::CatalogFile(file_name),
            (None, Some(dataset_id)) => SegmentSourceConfig::Dataset(dataset_id),
            (None, None) => SegmentSourceConfig::Unset,
        };

        let socrata = SocrataConfig {
            domain: non_empty("SO_WEB"),
            app_token: non_empty("SO_TOKEN"),
            username: non_empty("SO_KEY"),
            password: non_empty("SO_SECRET"),
            timeout: Duration::from_secs(parse_var("SO_TIMEOUT_SECS", 500)?),
        };

        let mode = match non_empty("PUBLISH_MODE") {
            Some(raw) => PublishMode::parse(&raw).ok_or(ConfigError::InvalidPublishMode(raw))?,
            None => PublishMode::Replace,
        };
        let publish = PublishConfig {
            dataset_id: non_empty("PRIORITY_DATASET"),
            mode,
        };

        let metrics = MetricsConfig {
            active_permits_file: env::var("ACTIVE_PERMITS_FILE")
                .unwrap_or_else(|_| "active_permits.csv".to_string()),
            active_dataset: non_empty("ACTIVE_DATASET"),
            weekly_dataset: non_empty("WEEK_DATASET"),
        };

        let defaults = EngineConfig::default();
        let attribute_batch_size =
            parse_var("SEGMENT_BATCH_SIZE", defaults.attribute_batch_size)?;
        if attribute_batch_size == 0 {
            return Err(ConfigError::InvalidNumber {
                var: "SEGMENT_BATCH_SIZE",
                value: "0".to_string(),
            });
        }
        let engine = EngineConfig {
            attribute_batch_size,
            recent_inspection_days: parse_var(
                "RECENT_INSPECTION_DAYS",
                defaults.recent_inspection_days,
            )?,
            zone_from_primary_only: parse_flag(
                "ZONE_FROM_PRIMARY_ONLY",
                defaults.zone_from_primary_only,
            )?,
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            storage,
            segments,
            socrata,
            publish,
            metrics,
            engine,
        })
    }
}

/// Location of the extract files inside the blob store.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub blob_store_dir: PathBuf,
    pub permits_file: String,
    pub segments_file: String,
}

/// Where segment attributes come from for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentSourceConfig {
    /// Pre-published segment table stored in the blob store.
    CatalogFile(String),
    /// Open-data dataset queried in batches of segment ids.
    Dataset(String),
    Unset,
}

/// Open-data portal credentials.
#[derive(Debug, Clone)]
pub struct SocrataConfig {
    pub domain: Option<String>,
    pub app_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub dataset_id: Option<String>,
    pub mode: PublishMode,
}

/// Targets of the permit activity summaries.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub active_permits_file: String,
    pub active_dataset: Option<String>,
    pub weekly_dataset: Option<String>,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber { var: &'static str, value: String },
    InvalidFlag { var: &'static str, value: String },
    InvalidPublishMode(String),
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { var, value } => {
                write!(f, "{var} must be a positive integer, got '{value}'")
            }
            ConfigError::InvalidFlag { var, value } => {
                write!(f, "{var} must be true or false, got '{value}'")
            }
            ConfigError::InvalidPublishMode(value) => {
                write!(f, "PUBLISH_MODE must be 'upsert' or 'replace', got '{value}'")
            }
            ConfigError::Missing(var) => write!(f, "{var} must be set"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn non_empty(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty(var) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
        None => Ok(default),
    }
}

fn parse_flag(var: &'static str, default: bool) -> Result<bool, ConfigError> {
    match non_empty(var) {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { var, value: raw }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for var in [
            "APP_ENV",
            "APP_LOG_LEVEL",
            "BLOB_STORE_DIR",
            "PERMITS_FILE",
            "SEGMENTS_FILE",
            "SEGMENT_CATALOG_FILE",
            "SEGMENT_DATASET",
            "SO_WEB",
            "SO_TOKEN",
            "SO_KEY",
            "SO_SECRET",
            "SO_TIMEOUT_SECS",
            "PRIORITY_DATASET",
            "PUBLISH_MODE",
            "SEGMENT_BATCH_SIZE",
            "RECENT_INSPECTION_DAYS",
            "ZONE_FROM_PRIMARY_ONLY",
            "ACTIVE_PERMITS_FILE",
            "ACTIVE_DATASET",
            "WEEK_DATASET",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.storage.permits_file, "row_inspector_permit_list.csv");
        assert_eq!(config.storage.segments_file, "row_inspector_segment_list.csv");
        assert_eq!(config.segments, SegmentSourceConfig::Unset);
        assert_eq!(config.socrata.timeout, Duration::from_secs(500));
        assert_eq!(config.publish.mode, PublishMode::Replace);
        assert_eq!(config.metrics.active_permits_file, "active_permits.csv");
        assert_eq!(config.metrics.active_dataset, None);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn catalog_file_takes_precedence_over_dataset() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SEGMENT_CATALOG_FILE", "segments_catalog.csv");
        env::set_var("SEGMENT_DATASET", "abcd-1234");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.segments,
            SegmentSourceConfig::CatalogFile("segments_catalog.csv".to_string())
        );
    }

    #[test]
    fn engine_overrides_are_parsed() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SEGMENT_BATCH_SIZE", "25");
        env::set_var("RECENT_INSPECTION_DAYS", "14");
        env::set_var("ZONE_FROM_PRIMARY_ONLY", "yes");
        env::set_var("PUBLISH_MODE", "UPSERT");
        env::set_var("WEEK_DATASET", " wk12-sum9 ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.metrics.weekly_dataset.as_deref(), Some("wk12-sum9"));
        assert_eq!(config.engine.attribute_batch_size, 25);
        assert_eq!(config.engine.recent_inspection_days, 14);
        assert!(config.engine.zone_from_primary_only);
        assert_eq!(config.publish.mode, PublishMode::Upsert);
    }

    #[test]
    fn rejects_zero_batch_size_and_unknown_mode() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SEGMENT_BATCH_SIZE", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                var: "SEGMENT_BATCH_SIZE",
                ..
            })
        ));

        reset_env();
        env::set_var("PUBLISH_MODE", "append");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidPublishMode(_))
        ));
    }
}
