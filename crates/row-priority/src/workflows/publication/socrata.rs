use super::{PublicationSink, PublishError, PublishMode, PublishReceipt, PublishRecord};
use crate::config::SocrataConfig;
use crate::extracts::Table;
use crate::workflows::prioritization::{
    attributes_from_table, ProviderError, SegmentAttributeProvider, SegmentAttributes, SegmentId,
};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tokio::runtime::Runtime;
use tracing::debug;

/// Blocking client for the Socrata open-data API. Publishes tables and
/// serves segment attributes from a published segment dataset.
pub struct SocrataClient {
    http: Client,
    runtime: Runtime,
    base_url: String,
    app_token: Option<String>,
    credentials: Option<(String, String)>,
    segment_dataset: Option<String>,
}

impl SocrataClient {
    pub fn new(domain: &str, config: &SocrataConfig) -> Result<Self, PublishError> {
        let runtime = Runtime::new().map_err(|err| PublishError::Runtime(err.to_string()))?;
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Self::map_error)?;

        let domain = domain.trim().trim_end_matches('/');
        let base_url = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        };

        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        };

        Ok(Self {
            http,
            runtime,
            base_url,
            app_token: config.app_token.clone(),
            credentials,
            segment_dataset: None,
        })
    }

    /// Serve segment attributes from this dataset.
    pub fn with_segment_dataset(mut self, dataset_id: impl Into<String>) -> Self {
        self.segment_dataset = Some(dataset_id.into());
        self
    }

    pub fn resource_url(&self, dataset_id: &str) -> String {
        format!("{}/resource/{}.json", self.base_url, dataset_id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.app_token {
            Some(token) => request.header("X-App-Token", token),
            None => request,
        };
        match &self.credentials {
            Some((username, password)) => request.basic_auth(username, Some(password)),
            None => request,
        }
    }

    fn map_error<E: std::fmt::Display>(err: E) -> PublishError {
        PublishError::Backend(err.to_string())
    }
}

impl std::fmt::Debug for SocrataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocrataClient")
            .field("base_url", &self.base_url)
            .field("segment_dataset", &self.segment_dataset)
            .finish_non_exhaustive()
    }
}

impl PublicationSink for SocrataClient {
    fn publish(
        &self,
        dataset_id: &str,
        records: &[PublishRecord],
        mode: PublishMode,
    ) -> Result<PublishReceipt, PublishError> {
        let url = self.resource_url(dataset_id);
        let request = match mode {
            PublishMode::Upsert => self.http.post(&url),
            PublishMode::Replace => self.http.put(&url),
        };
        let request = self.authorize(request).json(records);

        let (status, body) = self.runtime.block_on(async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        })
        .map_err(Self::map_error)?;

        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(%url, %mode, records = records.len(), "dataset published");

        serde_json::from_str(&body).map_err(|err| PublishError::Receipt(err.to_string()))
    }
}

impl SegmentAttributeProvider for SocrataClient {
    fn fetch_segment_attributes(
        &self,
        segment_ids: &[SegmentId],
    ) -> Result<Vec<SegmentAttributes>, ProviderError> {
        let Some(dataset_id) = &self.segment_dataset else {
            return Err(ProviderError::Backend(
                "no segment dataset configured".to_string(),
            ));
        };
        if segment_ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.resource_url(dataset_id);
        let request = self.authorize(self.http.get(&url)).query(&[
            ("$where", segment_filter(segment_ids)),
            ("$limit", "50000".to_string()),
        ]);

        let (status, body) = self.runtime.block_on(async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        })
        .map_err(|err| ProviderError::Backend(err.to_string()))?;

        if !status.is_success() {
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<serde_json::Map<String, Value>> = serde_json::from_str(&body)
            .map_err(|err| ProviderError::Backend(format!("unreadable segment rows: {err}")))?;
        attributes_from_table(&rows_to_table(dataset_id, &rows))
    }
}

/// SoQL filter for a batch of ids. Numeric ids are left bare so they match a
/// number column.
fn segment_filter(segment_ids: &[SegmentId]) -> String {
    let numeric = segment_ids
        .iter()
        .all(|id| id.as_str().parse::<i64>().is_ok());
    let values: Vec<String> = segment_ids
        .iter()
        .map(|id| {
            if numeric {
                id.as_str().to_string()
            } else {
                format!("'{}'", id.as_str().replace('\'', "''"))
            }
        })
        .collect();
    format!("segment_id in ({})", values.join(", "))
}

/// Rows from the JSON API as a table, columns in first-seen order.
fn rows_to_table(name: &str, rows: &[serde_json::Map<String, Value>]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut table = Table::new(name, columns.clone());
    for row in rows {
        table.push_row(
            columns
                .iter()
                .map(|column| match row.get(column) {
                    None | Some(Value::Null) => None,
                    Some(Value::String(text)) if text.trim().is_empty() => None,
                    Some(Value::String(text)) => Some(text.trim().to_string()),
                    Some(other) => Some(other.to_string()),
                })
                .collect(),
        );
    }
    table
}
