use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use row_priority::extracts::{DirectoryStore, ExtractError};
use chrono::{DateTime, Local, Utc};
use row_priority::workflows::publication::{
    ActivePermitsLog, DatasetRegistry, DatasetSync, DatasetSyncError, PublicationSink,
    PublishError, PublishMode, PublishReceipt, PublishRecord, WeeklySummary, PUBLISHED_DATE,
};
use serde_json::Value;

#[derive(Debug, Default)]
struct RecordingSink {
    published: Mutex<Vec<(String, Vec<PublishRecord>, PublishMode)>>,
}

impl PublicationSink for RecordingSink {
    fn publish(
        &self,
        dataset_id: &str,
        records: &[PublishRecord],
        mode: PublishMode,
    ) -> Result<PublishReceipt, PublishError> {
        self.published
            .lock()
            .expect("sink mutex")
            .push((dataset_id.to_string(), records.to_vec(), mode));
        Ok(PublishReceipt {
            rows_updated: records.len() as u64,
            ..PublishReceipt::default()
        })
    }
}

fn blob_store(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "row-priority-sync-{label}-{}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create blob store dir");
    dir
}

#[test]
fn publishes_registered_extract_with_its_mode() {
    let dir = blob_store("reviews");
    fs::write(
        dir.join("lde_site_plan_reviews.csv"),
        "case_number,review_status,reviewer\nSP-2024-0001,Approved,\nSP-2024-0002,Pending,Lee\n",
    )
    .expect("write extract");

    let registry = DatasetRegistry::standard();
    let store = DirectoryStore::new(&dir);
    let sink = RecordingSink::default();
    let report = DatasetSync::new(&registry, &store, &sink)
        .sync("lde_site_plan_reviews")
        .expect("sync");

    assert_eq!(report.rows, 2);
    assert_eq!(report.receipt.rows_updated, 2);

    let published = sink.published.lock().expect("sink mutex");
    let (resource_id, records, mode) = &published[0];
    assert_eq!(resource_id, "tnkv-vsec");
    assert_eq!(*mode, PublishMode::Upsert);
    assert_eq!(records[0]["case_number"], Value::from("SP-2024-0001"));
    assert_eq!(records[0]["reviewer"], Value::Null);
    assert_eq!(records[1]["reviewer"], Value::from("Lee"));

    fs::remove_dir_all(dir).ok();
}

#[test]
fn literal_text_cells_are_published_verbatim() {
    let dir = blob_store("verbatim");
    fs::write(
        dir.join("lde_site_plan_revisions.csv"),
        "CASE_ID,Conditions,Remarks\nSP-1,None, see sheet 2 \nSP-2,NULL,\n",
    )
    .expect("write extract");

    let registry = DatasetRegistry::standard();
    let store = DirectoryStore::new(&dir);
    let sink = RecordingSink::default();
    DatasetSync::new(&registry, &store, &sink)
        .sync("lde_site_plan_revisions")
        .expect("sync");

    let published = sink.published.lock().expect("sink mutex");
    let (_, records, _) = &published[0];
    assert_eq!(records[0]["Conditions"], Value::from("None"));
    assert_eq!(records[0]["Remarks"], Value::from(" see sheet 2 "));
    assert_eq!(records[1]["Conditions"], Value::from("NULL"));
    assert_eq!(records[1]["Remarks"], Value::Null);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn unknown_datasets_and_missing_extracts_fail() {
    let dir = blob_store("missing");
    let registry = DatasetRegistry::standard();
    let store = DirectoryStore::new(&dir);
    let sink = RecordingSink::default();
    let sync = DatasetSync::new(&registry, &store, &sink);

    assert!(matches!(
        sync.sync("street_banners"),
        Err(DatasetSyncError::UnknownDataset(name)) if name == "street_banners"
    ));
    assert!(matches!(
        sync.sync("license_agreements_timeline"),
        Err(DatasetSyncError::Extract(ExtractError::NotFound(_)))
    ));
    assert!(sink.published.lock().expect("sink mutex").is_empty());

    fs::remove_dir_all(dir).ok();
}

#[test]
fn active_permit_counts_are_logged_with_the_extract_time() {
    let dir = blob_store("active");
    let path = dir.join("active_permits.csv");
    fs::write(&path, "FOLDERTYPE,ACTIVEPERMITS\nDS,412\nEX,87\nRW,1290\n").expect("write extract");
    let modified = fs::metadata(&path)
        .and_then(|metadata| metadata.modified())
        .expect("mtime");
    let expected_stamp = DateTime::<Utc>::from(modified)
        .with_timezone(&Local)
        .format("%Y-%m-%dT%H:%M:00.000")
        .to_string();

    let store = DirectoryStore::new(&dir);
    let sink = RecordingSink::default();
    let report = ActivePermitsLog::new(&store, &sink)
        .publish("active_permits.csv", "actv-log1")
        .expect("log");

    assert_eq!(report.rows, 1);
    assert_eq!(report.mode, PublishMode::Upsert);

    let published = sink.published.lock().expect("sink mutex");
    let (dataset_id, records, mode) = &published[0];
    assert_eq!(dataset_id, "actv-log1");
    assert_eq!(*mode, PublishMode::Upsert);
    assert_eq!(records[0]["ds"], Value::from(412));
    assert_eq!(records[0]["rw"], Value::from(1290));
    assert_eq!(records[0][PUBLISHED_DATE], Value::from(expected_stamp));

    fs::remove_dir_all(dir).ok();
}

#[test]
fn weekly_summary_replaces_the_dataset() {
    let dir = blob_store("weekly");
    let amanda_header =
        "FOLDERTYPE,SUBCODE,\"TO_CHAR(ROUND({column},'DDD'),'YYYY-MM-DD')\",ISSUEDROWPERMITS\n";
    fs::write(
        dir.join("applications_received.csv"),
        format!(
            "{}DS,50500,2024-03-04,2\nRW,50500,2024-03-12,5\n",
            amanda_header.replace("{column}", "INDATE")
        ),
    )
    .expect("write applications");
    fs::write(
        dir.join("issued_permits.csv"),
        format!(
            "{}EX,50500,2024-03-06,1\n",
            amanda_header.replace("{column}", "ISSUEDATE")
        ),
    )
    .expect("write issued");
    fs::write(
        dir.join("Commercial DS Permit Requests.csv"),
        "Date Created,Count Permits\n2024-03-05,3\n",
    )
    .expect("write commercial");
    fs::write(
        dir.join("Residential DS Permits.csv"),
        "Date Created,Count Permits\n2024-03-13,4\n",
    )
    .expect("write residential");
    fs::write(
        dir.join("Extension and Revision Requests.csv"),
        "Created,Count Permits\n2024-03-08,6\n",
    )
    .expect("write extensions");

    let store = DirectoryStore::new(&dir);
    let sink = RecordingSink::default();
    let report = WeeklySummary::standard()
        .publish(&store, &sink, "wk12-sum9")
        .expect("summary");
    assert_eq!(report.rows, 2);

    let published = sink.published.lock().expect("sink mutex");
    let (dataset_id, records, mode) = &published[0];
    assert_eq!(dataset_id, "wk12-sum9");
    assert_eq!(*mode, PublishMode::Replace);

    assert_eq!(records[0]["date"], Value::from("2024-03-09T00:00:00.000"));
    assert_eq!(records[0]["ds_applications_received"], Value::from(5));
    assert_eq!(records[0]["ex_permits_issued"], Value::from(1));
    assert_eq!(records[0]["extension_requests"], Value::from(6));
    assert_eq!(records[1]["date"], Value::from("2024-03-16T00:00:00.000"));
    assert_eq!(records[1]["ds_applications_received"], Value::from(4));
    assert_eq!(records[1]["rw_applications_received"], Value::from(5));
    assert_eq!(records[1]["extension_requests"], Value::from(0));

    fs::remove_dir_all(dir).ok();
}
