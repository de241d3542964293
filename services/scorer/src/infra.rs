use chrono::NaiveDateTime;
use row_priority::workflows::prioritization::normalizer::parse_timestamp;
use row_priority::workflows::publication::{
    PublicationSink, PublishError, PublishMode, PublishReceipt, PublishRecord,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub(crate) fn parse_mode(raw: &str) -> Result<PublishMode, String> {
    PublishMode::parse(raw).ok_or_else(|| format!("expected 'upsert' or 'replace', got '{raw}'"))
}

pub(crate) fn parse_now(raw: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(raw)
        .ok_or_else(|| format!("failed to parse '{raw}' as a timestamp (e.g. 2024-03-15 12:00)"))
}

/// Dry-run sink that writes the payload it would have published.
#[derive(Debug, Clone)]
pub(crate) struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub(crate) fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl PublicationSink for JsonFileSink {
    fn publish(
        &self,
        dataset_id: &str,
        records: &[PublishRecord],
        mode: PublishMode,
    ) -> Result<PublishReceipt, PublishError> {
        let payload = json!({
            "dataset_id": dataset_id,
            "mode": mode,
            "records": records,
        });
        let body = serde_json::to_string_pretty(&payload)
            .map_err(|err| PublishError::Backend(err.to_string()))?;
        fs::write(&self.path, body).map_err(|err| {
            PublishError::Backend(format!("writing {}: {err}", self.path.display()))
        })?;

        info!(path = %self.path.display(), records = records.len(), "dry run payload written");
        Ok(PublishReceipt {
            rows_created: records.len() as u64,
            ..PublishReceipt::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn dry_run_sink_writes_dataset_mode_and_records() {
        let path = std::env::temp_dir().join(format!(
            "row-priority-dry-run-{}.json",
            std::process::id()
        ));
        let mut record = PublishRecord::new();
        record.insert("folder_rsn".to_string(), Value::from("100"));
        record.insert("row_inspector_zone".to_string(), Value::Null);

        let receipt = JsonFileSink::new(&path)
            .publish("x7xx-prio", &[record], PublishMode::Upsert)
            .expect("written");
        assert_eq!(receipt.rows_created, 1);

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read back")).expect("json");
        assert_eq!(written["dataset_id"], "x7xx-prio");
        assert_eq!(written["mode"], "upsert");
        assert_eq!(written["records"][0]["folder_rsn"], "100");
        assert!(written["records"][0]["row_inspector_zone"].is_null());

        fs::remove_file(path).ok();
    }

    #[test]
    fn now_accepts_dates_and_datetimes() {
        assert_eq!(
            parse_now("2024-03-15").map(|now| now.to_string()),
            Ok("2024-03-15 00:00:00".to_string())
        );
        assert!(parse_now("yesterday").is_err());
        assert_eq!(parse_mode("Replace"), Ok(PublishMode::Replace));
    }
}
