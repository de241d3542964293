//! Inspection priority scoring for right-of-way permits.
//!
//! Permits are joined to their roadway segments, enriched with catalog
//! attributes, scored on six additive components and ranked.

mod aggregate;
mod catalog;
mod domain;
mod engine;
mod enrichment;
pub mod normalizer;
mod parser;
mod pipeline;
mod rules;
mod totalizer;

#[cfg(test)]
mod tests;

pub use aggregate::SegmentRollup;
pub use catalog::{attributes_from_table, CsvSegmentCatalog};
pub use domain::{
    EnrichedSegment, FolderRsn, FolderType, Permit, PermitDates, PermitKind, SegmentAssociation,
    SegmentAttributes, SegmentId, ZoneId,
};
pub use engine::{PriorityEngine, PriorityRun};
pub use enrichment::{ProviderError, SegmentAttributeProvider};
pub use parser::{MismatchKind, MissingKeyColumn, PermitField, SchemaMismatch};
pub use pipeline::{PipelineInputs, PriorityPipeline};
pub use rules::{
    active_deficiencies_score, count_segment_score, dapcz_score, duration_score,
    recent_inspection_score, road_class_score, ScoreFactor,
};
pub use totalizer::{ScoredPermit, COUNT_SEGMENTS, ROW_INSPECTOR_ZONE, SCORING_SUFFIX, TOTAL_SCORE};

use crate::extracts::ExtractError;
use crate::workflows::publication::PublishError;
use serde::{Deserialize, Serialize};

/// Tunables passed into [`PriorityEngine::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Segment ids per call to the attribute provider.
    pub attribute_batch_size: usize,
    /// Trailing calendar days that count as a recent inspection.
    pub recent_inspection_days: i64,
    /// Only primary segments contribute to the inspector zone.
    pub zone_from_primary_only: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            attribute_batch_size: 100,
            recent_inspection_days: 7,
            zone_from_primary_only: false,
        }
    }
}

/// Discrete contribution to a permit's priority, kept for audits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub score: u32,
    pub notes: String,
}

/// Failures that abort a run before anything is published.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),
    #[error("publishing to dataset '{dataset_id}' failed: {source}")]
    PublishFailure {
        dataset_id: String,
        #[source]
        source: PublishError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    MissingKeyColumn(#[from] MissingKeyColumn),
    #[error("segment attribute provider failed: {0}")]
    Provider(#[from] ProviderError),
}

impl From<ExtractError> for PipelineError {
    fn from(value: ExtractError) -> Self {
        Self::SourceUnavailable(value.into())
    }
}

impl From<MissingKeyColumn> for PipelineError {
    fn from(value: MissingKeyColumn) -> Self {
        Self::SourceUnavailable(value.into())
    }
}

impl From<ProviderError> for PipelineError {
    fn from(value: ProviderError) -> Self {
        Self::SourceUnavailable(value.into())
    }
}
