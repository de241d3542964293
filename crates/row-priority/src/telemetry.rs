use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// HTTP stack crates held at warn unless a filter names them.
const QUIET_DEPENDENCIES: [&str; 3] = ["hyper_util", "reqwest", "rustls"];

#[derive(Debug)]
pub enum TelemetryError {
    InvalidLogLevel { value: String, source: ParseError },
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::InvalidLogLevel { value, .. } => write!(
                f,
                "APP_LOG_LEVEL '{value}' is not a valid row-priority log filter"
            ),
            TelemetryError::AlreadyInstalled(err) => {
                write!(f, "row-priority log subscriber could not be installed: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::InvalidLogLevel { source, .. } => Some(source),
            TelemetryError::AlreadyInstalled(err) => Some(&**err),
        }
    }
}

/// Installs the global subscriber for a scoring or publishing run.
///
/// `RUST_LOG` takes precedence over `APP_LOG_LEVEL`.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&config.log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)
}

/// A bare level also quiets the HTTP stack; full directive lists are used
/// as given.
fn filter_directives(level: &str) -> String {
    let level = level.trim();
    if level.contains(|c: char| c == '=' || c == ',') {
        return level.to_string();
    }
    QUIET_DEPENDENCIES
        .iter()
        .fold(level.to_string(), |directives, target| {
            format!("{directives},{target}=warn")
        })
}

fn build_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(filter_directives(level)).map_err(|source| {
        TelemetryError::InvalidLogLevel {
            value: level.to_string(),
            source,
        }
    })
}
