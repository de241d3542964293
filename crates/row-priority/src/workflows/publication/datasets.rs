use super::{PublicationSink, PublishError, PublishMode, PublishReceipt, PublishRecord};
use crate::extracts::{CellPolicy, ExtractError, Table, TableSource};
use serde_json::Value;
use tracing::info;

/// A CSV extract that is mirrored verbatim to an open-data dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetDefinition {
    pub name: &'static str,
    pub file_name: &'static str,
    pub resource_id: &'static str,
    pub mode: PublishMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRegistry {
    definitions: Vec<DatasetDefinition>,
}

impl DatasetRegistry {
    pub fn new(definitions: Vec<DatasetDefinition>) -> Self {
        Self { definitions }
    }

    /// Datasets maintained by the ROW division.
    pub fn standard() -> Self {
        Self::new(vec![
            DatasetDefinition {
                name: "license_agreements_timeline",
                file_name: "license_agreements_timeline.csv",
                resource_id: "arae-ym9d",
                mode: PublishMode::Replace,
            },
            DatasetDefinition {
                name: "lde_site_plan_reviews",
                file_name: "lde_site_plan_reviews.csv",
                resource_id: "tnkv-vsec",
                mode: PublishMode::Upsert,
            },
            DatasetDefinition {
                name: "lde_site_plan_revisions",
                file_name: "lde_site_plan_revisions.csv",
                resource_id: "bek3-sdgd",
                mode: PublishMode::Upsert,
            },
        ])
    }

    pub fn get(&self, name: &str) -> Option<&DatasetDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.definitions.iter().map(|definition| definition.name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetSyncError {
    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),
    #[error("dataset extract unavailable: {0}")]
    Extract(#[from] ExtractError),
    #[error("extract '{key}' has no '{column}' column")]
    MissingColumn { key: String, column: &'static str },
    #[error("blob store has no modification time for '{0}'")]
    MissingTimestamp(String),
    #[error("publishing dataset '{name}' failed: {source}")]
    Publish {
        name: String,
        #[source]
        source: PublishError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub definition: DatasetDefinition,
    pub rows: usize,
    pub receipt: PublishReceipt,
}

/// Outcome of publishing a derived summary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryReport {
    pub dataset_id: String,
    pub mode: PublishMode,
    pub rows: usize,
    pub receipt: PublishReceipt,
}

pub(crate) fn publish_summary(
    sink: &dyn PublicationSink,
    name: &str,
    dataset_id: &str,
    mode: PublishMode,
    records: Vec<PublishRecord>,
) -> Result<SummaryReport, DatasetSyncError> {
    info!(
        summary = name,
        dataset = dataset_id,
        mode = mode.as_str(),
        rows = records.len(),
        "publishing summary"
    );
    let receipt = sink
        .publish(dataset_id, &records, mode)
        .map_err(|source| DatasetSyncError::Publish {
            name: name.to_string(),
            source,
        })?;
    Ok(SummaryReport {
        dataset_id: dataset_id.to_string(),
        mode,
        rows: records.len(),
        receipt,
    })
}

/// Copies registered extracts from the blob store to the portal.
pub struct DatasetSync<'a> {
    registry: &'a DatasetRegistry,
    source: &'a dyn TableSource,
    sink: &'a dyn PublicationSink,
}

impl<'a> DatasetSync<'a> {
    pub fn new(
        registry: &'a DatasetRegistry,
        source: &'a dyn TableSource,
        sink: &'a dyn PublicationSink,
    ) -> Self {
        Self {
            registry,
            source,
            sink,
        }
    }

    pub fn sync(&self, name: &str) -> Result<SyncReport, DatasetSyncError> {
        let definition = *self
            .registry
            .get(name)
            .ok_or_else(|| DatasetSyncError::UnknownDataset(name.to_string()))?;

        let table = self
            .source
            .fetch_table_with(definition.file_name, CellPolicy::Verbatim)?;
        let records = table_records(&table);
        info!(
            dataset = definition.name,
            resource = definition.resource_id,
            mode = definition.mode.as_str(),
            rows = records.len(),
            "syncing dataset"
        );

        let receipt = self
            .sink
            .publish(definition.resource_id, &records, definition.mode)
            .map_err(|source| DatasetSyncError::Publish {
                name: definition.name.to_string(),
                source,
            })?;

        Ok(SyncReport {
            definition,
            rows: records.len(),
            receipt,
        })
    }
}

/// One record per row keyed by the table's own headers; missing cells are
/// explicit nulls.
pub(crate) fn table_records(table: &Table) -> Vec<PublishRecord> {
    table
        .rows()
        .map(|row| {
            table
                .columns()
                .iter()
                .zip(row)
                .map(|(column, cell)| {
                    let value = cell.as_deref().map_or(Value::Null, Value::from);
                    (column.clone(), value)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn standard_registry_lists_division_datasets() {
        let registry = DatasetRegistry::standard();
        let reviews = registry.get("lde_site_plan_reviews").expect("registered");
        assert_eq!(reviews.resource_id, "tnkv-vsec");
        assert_eq!(reviews.mode, PublishMode::Upsert);
        assert_eq!(
            registry.get("license_agreements_timeline").map(|d| d.mode),
            Some(PublishMode::Replace)
        );
        assert_eq!(registry.names().count(), 3);
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn only_blank_cells_become_nulls() {
        let table = Table::from_csv_reader_with(
            "lde_site_plan_reviews.csv",
            Cursor::new("CASE_ID,Reviewer,Conditions\nSP-1,,None\nSP-2,Lee,NaN\n"),
            CellPolicy::Verbatim,
        )
        .expect("csv");

        let records = table_records(&table);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["CASE_ID"], Value::from("SP-1"));
        assert_eq!(records[0]["Reviewer"], Value::Null);
        assert_eq!(records[0]["Conditions"], Value::from("None"));
        assert_eq!(records[1]["Reviewer"], Value::from("Lee"));
        assert_eq!(records[1]["Conditions"], Value::from("NaN"));
    }
}
