use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::prioritization::PipelineError;
use crate::workflows::publication::{DatasetSyncError, PublishError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Pipeline(PipelineError),
    DatasetSync(DatasetSyncError),
    Publish(PublishError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Pipeline(err) => write!(f, "scoring run failed: {}", err),
            AppError::DatasetSync(err) => write!(f, "dataset sync failed: {}", err),
            AppError::Publish(err) => write!(f, "publication error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Pipeline(err) => Some(err),
            AppError::DatasetSync(err) => Some(err),
            AppError::Publish(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<PipelineError> for AppError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

impl From<DatasetSyncError> for AppError {
    fn from(value: DatasetSyncError) -> Self {
        Self::DatasetSync(value)
    }
}

impl From<PublishError> for AppError {
    fn from(value: PublishError) -> Self {
        Self::Publish(value)
    }
}
