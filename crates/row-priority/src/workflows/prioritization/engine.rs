use super::aggregate::{rollup_segments, SegmentRollup};
use super::enrichment::{enrich, SegmentAttributeProvider};
use super::parser::{parse_permits, parse_segments, SchemaMismatch};
use super::rules::score_permit;
use super::totalizer::{rank, ScoredPermit};
use super::{EngineConfig, PipelineError};
use crate::extracts::Table;
use crate::workflows::publication::{PublishReceipt, PublishRecord};
use chrono::NaiveDateTime;
use tracing::{info, warn};

/// Stateless scorer that applies the engine configuration to one pair of
/// extracts.
#[derive(Debug, Clone, Default)]
pub struct PriorityEngine {
    config: EngineConfig,
}

/// Output of one scoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityRun {
    /// Ranked, one entry per permit row.
    pub permits: Vec<ScoredPermit>,
    pub mismatches: Vec<SchemaMismatch>,
    pub unresolved_segments: usize,
    /// Set once the run has been published.
    pub receipt: Option<PublishReceipt>,
}

impl PriorityRun {
    pub fn records(&self) -> Vec<PublishRecord> {
        self.permits.iter().map(ScoredPermit::to_record).collect()
    }
}

impl PriorityEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Scores every permit row. `now` only affects the recent inspection
    /// component.
    pub fn score(
        &self,
        permits: &Table,
        segments: &Table,
        provider: &dyn SegmentAttributeProvider,
        now: NaiveDateTime,
    ) -> Result<PriorityRun, PipelineError> {
        let parsed = parse_permits(permits)?;
        let associations = parse_segments(segments)?;
        info!(
            permits = parsed.permits.len(),
            associations = associations.len(),
            "extracts parsed"
        );

        for mismatch in &parsed.mismatches {
            warn!(%mismatch, "permit row degraded to fallback score");
        }

        let enrichment = enrich(&associations, provider, self.config.attribute_batch_size)?;
        let rollups = rollup_segments(&enrichment.segments, self.config.zone_from_primary_only);
        let fallback = SegmentRollup::default();

        let mut scored: Vec<ScoredPermit> = parsed
            .permits
            .into_iter()
            .map(|permit| {
                let rollup = rollups.get(&permit.folder_rsn).unwrap_or(&fallback);
                let components = score_permit(&permit, rollup, &self.config, now);
                ScoredPermit::new(permit, components, rollup)
            })
            .collect();
        rank(&mut scored);

        if let Some(top) = scored.first() {
            info!(
                permits = scored.len(),
                top_folder = %top.permit.folder_rsn,
                top_score = top.total_score,
                "permits ranked"
            );
        }

        Ok(PriorityRun {
            permits: scored,
            mismatches: parsed.mismatches,
            unresolved_segments: enrichment.unresolved,
            receipt: None,
        })
    }
}
