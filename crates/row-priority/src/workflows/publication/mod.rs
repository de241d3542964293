//! Hand-off of finished tables to the open-data portal.

mod active_permits;
mod datasets;
mod socrata;
mod weekly_summary;

pub use active_permits::{pivot_active_permits, ActivePermitsLog, PUBLISHED_DATE};
pub use datasets::{
    DatasetDefinition, DatasetRegistry, DatasetSync, DatasetSyncError, SummaryReport, SyncReport,
};
pub use socrata::SocrataClient;
pub use weekly_summary::{summarize_weekly, MeasureCounts, WeeklyMeasure, WeeklySummary};

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// One flat row as sent to the sink.
pub type PublishRecord = serde_json::Map<String, serde_json::Value>;

/// `Replace` overwrites the whole dataset; `Upsert` merges on the dataset's
/// row identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    Upsert,
    Replace,
}

impl PublishMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upsert" => Some(Self::Upsert),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upsert => "upsert",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row counts reported back by the portal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    #[serde(rename = "Rows Created", default)]
    pub rows_created: u64,
    #[serde(rename = "Rows Updated", default)]
    pub rows_updated: u64,
    #[serde(rename = "Rows Deleted", default)]
    pub rows_deleted: u64,
    #[serde(rename = "Errors", default)]
    pub errors: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("sink rejected the payload with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("publish request failed: {0}")]
    Backend(String),
    #[error("publish runtime unavailable: {0}")]
    Runtime(String),
    #[error("unreadable publish receipt: {0}")]
    Receipt(String),
}

/// Destination for finished tables. Implementations publish the records
/// verbatim and do not retry.
pub trait PublicationSink: Debug {
    fn publish(
        &self,
        dataset_id: &str,
        records: &[PublishRecord],
        mode: PublishMode,
    ) -> Result<PublishReceipt, PublishError>;
}

/// Portal field name for a table header: lowercased, spaces become
/// underscores.
pub fn portal_column(header: &str) -> String {
    header.to_lowercase().replace(' ', "_")
}
