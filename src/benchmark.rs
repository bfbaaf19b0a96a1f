//! Loads the CPU/GPU benchmark tables from their JSON endpoints.
//!
//! Each source is a warm-up `init_url` (sets session cookies) followed by a
//! `data_url` returning `{"data": [...]}`. The CPU score lives in `cpumark`,
//! the GPU score in `g3d`; both arrive as comma-grouped strings.

use crate::config::{BenchmarkConfig, BenchmarkSource};
use crate::model::{BenchmarkEntry, FetchError};
use crate::retry::RetryPolicy;
use crate::storage::{BenchmarkKind, CatalogStore};
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

pub struct BenchmarkLoader {
    client: Client,
    config: BenchmarkConfig,
    retry: RetryPolicy,
}

impl BenchmarkLoader {
    pub fn new(config: BenchmarkConfig, retry: RetryPolicy) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .cookie_store(true)
            .build()?;
        Ok(Self { client, config, retry })
    }

    /// Refreshes both benchmark tables. A failure on one source is returned
    /// so the caller can decide to keep scoring with stale tables.
    pub async fn refresh(&self, store: &mut CatalogStore) -> Result<(), FetchError> {
        for (kind, source) in [
            (BenchmarkKind::Cpu, self.config.cpu.clone()),
            (BenchmarkKind::Gpu, self.config.gpu.clone()),
        ] {
            let entries = self.fetch_table(kind, &source).await?;
            info!("loaded {} {kind:?} benchmark entries", entries.len());
            store
                .replace_benchmarks(kind, &entries)
                .map_err(|err| FetchError::MalformedResponse(err.to_string()))?;
        }
        Ok(())
    }

    async fn fetch_table(
        &self,
        kind: BenchmarkKind,
        source: &BenchmarkSource,
    ) -> Result<Vec<BenchmarkEntry>, FetchError> {
        self.retry
            .run("benchmark warm-up", || self.get(&source.init_url, source, false))
            .await?;
        let body = self
            .retry
            .run("benchmark data", || self.get(&source.data_url, source, true))
            .await?;
        parse_benchmark_data(kind, &body)
    }

    async fn get(
        &self,
        url: &str,
        source: &BenchmarkSource,
        with_timestamp: bool,
    ) -> Result<Value, FetchError> {
        let mut request = self.client.get(url);
        for (key, value) in &source.headers {
            request = request.header(key, value);
        }
        if with_timestamp {
            request = request.query(&[("_", Utc::now().timestamp_millis().to_string())]);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16(), 0));
        }
        if with_timestamp {
            Ok(response.json().await?)
        } else {
            // warm-up body is HTML and irrelevant
            response.bytes().await?;
            Ok(Value::Null)
        }
    }
}

/// Extracts `(name, score)` pairs from the `{"data": [...]}` payload. Rows
/// missing a name or with an unparsable score are skipped with a warning.
pub fn parse_benchmark_data(
    kind: BenchmarkKind,
    body: &Value,
) -> Result<Vec<BenchmarkEntry>, FetchError> {
    let score_key = match kind {
        BenchmarkKind::Cpu => "cpumark",
        BenchmarkKind::Gpu => "g3d",
    };
    let rows = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::MalformedResponse("no data array".into()))?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(name) = row.get("name").and_then(Value::as_str) else {
            warn!("benchmark row without name skipped");
            continue;
        };
        let Some(score) = parse_score(row.get(score_key)) else {
            warn!("benchmark row {name} has no usable {score_key}, skipped");
            continue;
        };
        entries.push(BenchmarkEntry { name: name.trim().to_string(), score });
    }
    Ok(entries)
}

fn parse_score(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}
