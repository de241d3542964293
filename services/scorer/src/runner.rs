use crate::cli::{ScoreArgs, SummaryArgs, SyncArgs};
use crate::infra::JsonFileSink;
use chrono::Local;
use row_priority::config::{AppConfig, ConfigError, SegmentSourceConfig};
use row_priority::error::AppError;
use row_priority::extracts::DirectoryStore;
use row_priority::telemetry;
use row_priority::workflows::prioritization::{
    CsvSegmentCatalog, PipelineError, PipelineInputs, PriorityEngine, PriorityPipeline,
    PriorityRun, SegmentAttributeProvider,
};
use row_priority::workflows::publication::{
    ActivePermitsLog, DatasetRegistry, DatasetSync, PublicationSink, SocrataClient, SummaryReport,
    WeeklySummary,
};
use tracing::{info, warn};

const DRY_RUN_DATASET: &str = "dry-run";

fn socrata_client(
    config: &AppConfig,
    segment_dataset: Option<&str>,
) -> Result<SocrataClient, AppError> {
    let domain = config
        .socrata
        .domain
        .as_deref()
        .ok_or(ConfigError::Missing("SO_WEB"))?;
    let client = SocrataClient::new(domain, &config.socrata)?;
    Ok(match segment_dataset {
        Some(dataset_id) => client.with_segment_dataset(dataset_id),
        None => client,
    })
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let store = DirectoryStore::new(&config.storage.blob_store_dir);
    let now = args.now.unwrap_or_else(|| Local::now().naive_local());
    let mode = args.mode.unwrap_or(config.publish.mode);

    let dataset_id = match (&config.publish.dataset_id, &args.dry_run) {
        (Some(dataset_id), _) => dataset_id.clone(),
        (None, Some(_)) => DRY_RUN_DATASET.to_string(),
        (None, None) => return Err(ConfigError::Missing("PRIORITY_DATASET").into()),
    };

    let segment_dataset = match &config.segments {
        SegmentSourceConfig::Dataset(dataset_id) => Some(dataset_id.as_str()),
        SegmentSourceConfig::CatalogFile(_) => None,
        SegmentSourceConfig::Unset => {
            return Err(ConfigError::Missing("SEGMENT_CATALOG_FILE or SEGMENT_DATASET").into())
        }
    };
    let socrata = if segment_dataset.is_some() || args.dry_run.is_none() {
        Some(socrata_client(&config, segment_dataset)?)
    } else {
        None
    };

    let catalog;
    let provider: &dyn SegmentAttributeProvider = match (&config.segments, &socrata) {
        (SegmentSourceConfig::CatalogFile(file_name), _) => {
            catalog = CsvSegmentCatalog::load(&store, file_name).map_err(PipelineError::from)?;
            &catalog
        }
        (_, Some(client)) => client,
        (_, None) => return Err(ConfigError::Missing("SO_WEB").into()),
    };

    let file_sink;
    let sink: &dyn PublicationSink = match (&args.dry_run, &socrata) {
        (Some(path), _) => {
            file_sink = JsonFileSink::new(path);
            &file_sink
        }
        (None, Some(client)) => client,
        (None, None) => return Err(ConfigError::Missing("SO_WEB").into()),
    };

    let inputs = PipelineInputs {
        permits_key: config.storage.permits_file.clone(),
        segments_key: config.storage.segments_file.clone(),
        dataset_id,
        mode,
    };
    info!(
        environment = ?config.environment,
        blob_store = %store.root().display(),
        dataset = %inputs.dataset_id,
        %now,
        "starting priority run"
    );

    let pipeline = PriorityPipeline::new(
        PriorityEngine::new(config.engine.clone()),
        &store,
        provider,
        sink,
    );
    let run = pipeline.run(&inputs, now)?;
    render_run(&run, args.preview);

    Ok(())
}

fn render_run(run: &PriorityRun, preview: usize) {
    println!("Inspection priority run");
    println!("- permits scored: {}", run.permits.len());
    println!("- row defects: {}", run.mismatches.len());
    println!("- unresolved segments: {}", run.unresolved_segments);
    if let Some(receipt) = &run.receipt {
        println!(
            "- published: {} created, {} updated, {} deleted, {} errors",
            receipt.rows_created, receipt.rows_updated, receipt.rows_deleted, receipt.errors
        );
        if receipt.errors > 0 {
            warn!(errors = receipt.errors, "sink reported row errors");
        }
    }

    if preview == 0 || run.permits.is_empty() {
        return;
    }

    println!("\nTop {} permits", preview.min(run.permits.len()));
    println!("{:>4}  {:<12} {:<4} {:>5}  {:<6} breakdown", "rank", "folder", "type", "total", "zone");
    for (index, scored) in run.permits.iter().take(preview).enumerate() {
        let breakdown: Vec<String> = scored
            .components
            .iter()
            .map(|component| format!("{}={}", component.factor.column(), component.score))
            .collect();
        println!(
            "{:>4}  {:<12} {:<4} {:>5}  {:<6} {}",
            index + 1,
            scored.permit.folder_rsn,
            scored.permit.kind.code().unwrap_or("-"),
            scored.total_score,
            scored
                .row_inspector_zone
                .as_ref()
                .map(|zone| zone.as_str())
                .unwrap_or("-"),
            breakdown.join(" ")
        );
    }
}

/// Dry runs write to a file; otherwise publish through the portal client.
fn publication_sink(
    config: &AppConfig,
    dry_run: Option<&std::path::Path>,
) -> Result<Box<dyn PublicationSink>, AppError> {
    Ok(match dry_run {
        Some(path) => Box::new(JsonFileSink::new(path)),
        None => Box::new(socrata_client(config, None)?),
    })
}

/// Dataset id from the environment, or a placeholder when only writing a
/// dry-run file.
fn summary_dataset(
    dataset_id: Option<&str>,
    var: &'static str,
    dry_run: bool,
) -> Result<String, AppError> {
    match (dataset_id, dry_run) {
        (Some(dataset_id), _) => Ok(dataset_id.to_string()),
        (None, true) => Ok(DRY_RUN_DATASET.to_string()),
        (None, false) => Err(ConfigError::Missing(var).into()),
    }
}

fn render_summary(label: &str, report: &SummaryReport) {
    println!(
        "Published {label} ({} rows) to {} via {}: {} created, {} updated, {} errors",
        report.rows,
        report.dataset_id,
        report.mode,
        report.receipt.rows_created,
        report.receipt.rows_updated,
        report.receipt.errors
    );
}

pub(crate) fn run_sync(args: SyncArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let store = DirectoryStore::new(&config.storage.blob_store_dir);
    let registry = DatasetRegistry::standard();
    let sink = publication_sink(&config, args.dry_run.as_deref())?;

    let report = DatasetSync::new(&registry, &store, sink.as_ref()).sync(&args.dataset)?;
    println!(
        "Synced {} ({} rows) to {} via {}: {} created, {} updated, {} errors",
        report.definition.name,
        report.rows,
        report.definition.resource_id,
        report.definition.mode,
        report.receipt.rows_created,
        report.receipt.rows_updated,
        report.receipt.errors
    );

    Ok(())
}

pub(crate) fn run_active_permits(args: SummaryArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let store = DirectoryStore::new(&config.storage.blob_store_dir);
    let dataset_id = summary_dataset(
        config.metrics.active_dataset.as_deref(),
        "ACTIVE_DATASET",
        args.dry_run.is_some(),
    )?;
    let sink = publication_sink(&config, args.dry_run.as_deref())?;

    let report = ActivePermitsLog::new(&store, sink.as_ref())
        .publish(&config.metrics.active_permits_file, &dataset_id)?;
    render_summary("active permits", &report);

    Ok(())
}

pub(crate) fn run_weekly_summary(args: SummaryArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let store = DirectoryStore::new(&config.storage.blob_store_dir);
    let dataset_id = summary_dataset(
        config.metrics.weekly_dataset.as_deref(),
        "WEEK_DATASET",
        args.dry_run.is_some(),
    )?;
    let sink = publication_sink(&config, args.dry_run.as_deref())?;

    let report = WeeklySummary::standard().publish(&store, sink.as_ref(), &dataset_id)?;
    render_summary("weekly summary", &report);

    Ok(())
}
