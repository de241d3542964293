use super::domain::{SegmentAttributes, SegmentId, ZoneId};
use super::enrichment::{ProviderError, SegmentAttributeProvider};
use super::normalizer::parse_count;
use super::parser::MissingKeyColumn;
use crate::extracts::{Table, TableSource};
use std::collections::HashSet;
use tracing::{info, warn};

const SEGMENT_ID: [&str; 2] = ["segment_id", "propertyrsn"];
const ROAD_CLASS: [&str; 1] = ["road_class"];
const SPECIAL_ZONE: [&str; 3] = ["dapcz_zone", "special_zone_id", "dapcz_zone_id"];
const INSPECTOR_ZONE: [&str; 4] = [
    "inspector_zone",
    "inspector_zone_id",
    "row_inspector_zone",
    "row_inspector_zone_id",
];

/// Reads segment attributes out of a catalog table. Row order is kept so
/// that duplicate segments resolve to the last row.
pub fn attributes_from_table(table: &Table) -> Result<Vec<SegmentAttributes>, ProviderError> {
    let id_position = table
        .position_of(&SEGMENT_ID)
        .ok_or_else(|| MissingKeyColumn {
            table: table.name().to_string(),
            column: "segment_id",
        })?;

    let optional = |aliases: &[&str], column: &'static str| {
        let position = table.position_of(aliases);
        if position.is_none() {
            warn!(table = table.name(), column, "segment catalog column absent");
        }
        position
    };
    let road_class_position = optional(&ROAD_CLASS[..], "road_class");
    let special_zone_position = optional(&SPECIAL_ZONE[..], "dapcz_zone");
    let inspector_zone_position = optional(&INSPECTOR_ZONE[..], "inspector_zone");

    let cell = |row: &[Option<String>], position: Option<usize>| {
        position.and_then(|index| row[index].clone())
    };

    let attributes = table
        .rows()
        .filter_map(|row| {
            let segment_id = row[id_position].as_deref()?;
            Some(SegmentAttributes {
                segment_id: SegmentId::new(segment_id),
                road_class: cell(row, road_class_position)
                    .as_deref()
                    .and_then(parse_count),
                special_zone_id: cell(row, special_zone_position),
                inspector_zone_id: cell(row, inspector_zone_position)
                    .as_deref()
                    .map(ZoneId::new),
            })
        })
        .collect();

    Ok(attributes)
}

/// Pre-published segment table held in memory for the run.
#[derive(Debug, Clone)]
pub struct CsvSegmentCatalog {
    attributes: Vec<SegmentAttributes>,
}

impl CsvSegmentCatalog {
    pub fn from_table(table: &Table) -> Result<Self, ProviderError> {
        Ok(Self {
            attributes: attributes_from_table(table)?,
        })
    }

    pub fn load(source: &dyn TableSource, key: &str) -> Result<Self, ProviderError> {
        let table = source.fetch_table(key)?;
        let catalog = Self::from_table(&table)?;
        info!(key, segments = catalog.len(), "segment catalog loaded");
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl SegmentAttributeProvider for CsvSegmentCatalog {
    fn fetch_segment_attributes(
        &self,
        segment_ids: &[SegmentId],
    ) -> Result<Vec<SegmentAttributes>, ProviderError> {
        let wanted: HashSet<&SegmentId> = segment_ids.iter().collect();
        Ok(self
            .attributes
            .iter()
            .filter(|attributes| wanted.contains(&attributes.segment_id))
            .cloned()
            .collect())
    }
}
