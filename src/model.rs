// Core structs: NormalizedFields, CatalogRecord, HistoryEntry, BenchmarkEntry
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Canonical attribute set for one product hit, after vendor-specific
/// flattening. Every field except `sku` is optional so the merger can
/// distinguish "absent" from "explicitly empty".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedFields {
    pub sku: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub form_factor: Option<String>,
    pub price: Option<f64>,
    pub msrp: Option<f64>,
    pub stock: Option<i64>,
    pub cpu: Option<String>,
    pub gpu: Option<String>,
    pub gpu_memory_mode: Option<String>,
    pub ram: Option<i64>,
    pub storage: Option<i64>,
    pub os: Option<String>,
    pub screen_size: Option<f64>,
    pub screen_resolution: Option<String>,
    pub touchscreen: Option<String>,
    pub keyboard_locale: Option<String>,
    pub wifi: Option<String>,
    pub url: Option<String>,
}

/// One durable catalog row, keyed by SKU within a vendor-region table.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    pub sku: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub form_factor: Option<String>,
    pub price: f64,
    pub msrp: Option<f64>,
    pub stock: i64,
    pub cpu: Option<String>,
    pub gpu: Option<String>,
    pub gpu_memory_mode: Option<String>,
    pub ram: Option<i64>,
    pub storage: Option<i64>,
    pub os: Option<String>,
    pub screen_size: Option<f64>,
    pub screen_resolution: Option<String>,
    pub touchscreen: Option<String>,
    pub keyboard_locale: Option<String>,
    pub wifi: Option<String>,
    pub url: Option<String>,
    pub ff_score: f64,
    pub cpu_score: f64,
    pub gpu_score: f64,
    pub ram_score: f64,
    pub storage_score: f64,
    pub total_score: f64,
    pub date_added: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
    pub in_stock: bool,
    pub errors: Vec<String>,
}

/// Immutable price/stock observation; one per sync run per SKU.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub sku: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub stock: i64,
}

/// Canonical hardware name and its benchmark score.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkEntry {
    pub name: String,
    pub score: f64,
}

/// Score columns written back by the scoring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubScores {
    pub ff: f64,
    pub cpu: f64,
    pub gpu: f64,
    pub ram: f64,
    pub storage: f64,
    pub total: f64,
}

/// Per-run counters surfaced in the final log line of each sync.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SyncCounters {
    pub total_scanned: usize,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub records_skipped: usize,
    pub records_errored: usize,
    pub records_merged: usize,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0} on page {1}")]
    Status(u16, usize),
    #[error("discovery request failed: {0}")]
    Discovery(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
