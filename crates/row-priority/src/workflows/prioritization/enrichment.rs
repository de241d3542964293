use super::domain::{EnrichedSegment, SegmentAssociation, SegmentAttributes, SegmentId};
use super::parser::MissingKeyColumn;
use crate::extracts::ExtractError;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("segment catalog unavailable: {0}")]
    Extract(#[from] ExtractError),
    #[error("segment catalog malformed: {0}")]
    MissingColumn(#[from] MissingKeyColumn),
    #[error("segment attribute request failed: {0}")]
    Backend(String),
    #[error("segment attribute service returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("segment attribute runtime unavailable: {0}")]
    Runtime(String),
}

/// Source of per-segment road class and zone attributes.
pub trait SegmentAttributeProvider: Debug {
    /// Attributes for the requested ids. Unknown ids are simply absent; a
    /// segment may appear more than once.
    fn fetch_segment_attributes(
        &self,
        segment_ids: &[SegmentId],
    ) -> Result<Vec<SegmentAttributes>, ProviderError>;
}

#[derive(Debug, Default)]
pub(crate) struct Enrichment {
    pub(crate) segments: Vec<EnrichedSegment>,
    /// Associations whose segment the provider did not return.
    pub(crate) unresolved: usize,
}

/// Inner join of the associations against the provider. Ids are requested
/// once each, in first-seen order, in sequential batches. When the provider
/// returns a segment twice the later row replaces the earlier one.
pub(crate) fn enrich(
    associations: &[SegmentAssociation],
    provider: &dyn SegmentAttributeProvider,
    batch_size: usize,
) -> Result<Enrichment, ProviderError> {
    let mut seen = HashSet::new();
    let unique_ids: Vec<SegmentId> = associations
        .iter()
        .filter(|association| seen.insert(&association.segment_id))
        .map(|association| association.segment_id.clone())
        .collect();

    let mut lookup: HashMap<SegmentId, SegmentAttributes> = HashMap::new();
    for (batch_index, batch) in unique_ids.chunks(batch_size.max(1)).enumerate() {
        let rows = provider.fetch_segment_attributes(batch)?;
        debug!(batch = batch_index, requested = batch.len(), returned = rows.len(), "segment attribute batch");
        for attributes in rows {
            lookup.insert(attributes.segment_id.clone(), attributes);
        }
    }

    let mut enrichment = Enrichment::default();
    for association in associations {
        match lookup.get(&association.segment_id) {
            Some(attributes) => enrichment
                .segments
                .push(EnrichedSegment::join(association, attributes)),
            None => enrichment.unresolved += 1,
        }
    }

    info!(
        requested = unique_ids.len(),
        resolved = lookup.len(),
        enriched = enrichment.segments.len(),
        unresolved = enrichment.unresolved,
        "segments enriched"
    );
    Ok(enrichment)
}
