use super::engine::{PriorityEngine, PriorityRun};
use super::enrichment::SegmentAttributeProvider;
use super::PipelineError;
use crate::extracts::TableSource;
use crate::workflows::publication::{PublicationSink, PublishMode};
use chrono::NaiveDateTime;
use tracing::info;

/// Where a run reads its extracts and where it publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInputs {
    pub permits_key: String,
    pub segments_key: String,
    pub dataset_id: String,
    pub mode: PublishMode,
}

/// Load, score and publish. Nothing reaches the sink unless every earlier
/// stage succeeded.
pub struct PriorityPipeline<'a> {
    engine: PriorityEngine,
    source: &'a dyn TableSource,
    provider: &'a dyn SegmentAttributeProvider,
    sink: &'a dyn PublicationSink,
}

impl<'a> PriorityPipeline<'a> {
    pub fn new(
        engine: PriorityEngine,
        source: &'a dyn TableSource,
        provider: &'a dyn SegmentAttributeProvider,
        sink: &'a dyn PublicationSink,
    ) -> Self {
        Self {
            engine,
            source,
            provider,
            sink,
        }
    }

    pub fn run(
        &self,
        inputs: &PipelineInputs,
        now: NaiveDateTime,
    ) -> Result<PriorityRun, PipelineError> {
        let permits = self.source.fetch_table(&inputs.permits_key)?;
        info!(key = %inputs.permits_key, rows = permits.len(), "permits retrieved");
        let segments = self.source.fetch_table(&inputs.segments_key)?;
        info!(key = %inputs.segments_key, rows = segments.len(), "segments retrieved");

        let mut run = self.engine.score(&permits, &segments, self.provider, now)?;

        info!(
            dataset = %inputs.dataset_id,
            mode = inputs.mode.as_str(),
            rows = run.permits.len(),
            "publishing priority table"
        );
        let receipt = self
            .sink
            .publish(&inputs.dataset_id, &run.records(), inputs.mode)
            .map_err(|source| PipelineError::PublishFailure {
                dataset_id: inputs.dataset_id.clone(),
                source,
            })?;
        info!(
            created = receipt.rows_created,
            updated = receipt.rows_updated,
            deleted = receipt.rows_deleted,
            errors = receipt.errors,
            "publish receipt"
        );

        run.receipt = Some(receipt);
        Ok(run)
    }
}
