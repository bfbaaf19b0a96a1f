mod benchmark;
mod config;
mod fetcher;
mod model;
mod normalizer;
mod retry;
mod scorer;
mod storage;

use benchmark::BenchmarkLoader;
use chrono::Utc;
use config::{AppConfig, CategoryConfig, load_benchmark_config, load_config};
use fetcher::{HttpSearchClient, PaginatedFetcher, save_hits};
use model::{SyncCounters, SyncError};
use normalizer::{extractor_for, normalize};
use retry::RetryPolicy;
use scorer::score_all;
use std::path::Path;
use storage::CatalogStore;
use tracing::{error, info, warn};

const CONFIG_PATH: &str = "config.json";
const BENCHMARK_CONFIG_PATH: &str = "hardware_sources.json";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match load_config(CONFIG_PATH) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("config load error: {e}");
            return;
        }
    };

    let mut store = match CatalogStore::new(&config.database_path) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to initialize storage: {e}");
            return;
        }
    };

    let retry = RetryPolicy::default();

    // Each vendor/category is an independent unit of work; a failed one
    // never aborts the rest.
    for (name, category) in &config.categories {
        match sync_category(name, category, &config, &mut store, retry).await {
            Ok(counters) => info!(
                "{name}: scanned {} across {} pages ({} failed), \
                 merged {}, skipped {}, errored {}",
                counters.total_scanned,
                counters.pages_fetched,
                counters.pages_failed,
                counters.records_merged,
                counters.records_skipped,
                counters.records_errored,
            ),
            Err(e) => error!("{name}: sync aborted: {e}"),
        }
    }

    refresh_benchmarks(&mut store, retry).await;

    for (name, category) in &config.categories {
        if let Err(e) = score_all(&store, &category.table_name(), category) {
            error!("{name}: scoring pass failed: {e}");
        }
    }
}

/// One full vendor/category sync: fetch all pages, save the raw-hit
/// artifact, then merge each normalized hit with its history append. A
/// discovery failure aborts before any write; per-record failures only
/// bump counters.
async fn sync_category(
    name: &str,
    category: &CategoryConfig,
    config: &AppConfig,
    store: &mut CatalogStore,
    retry: RetryPolicy,
) -> Result<SyncCounters, SyncError> {
    info!(
        "starting scan for {} {} ({name})",
        category.website, category.country
    );

    let client = HttpSearchClient::new(config, category)?;
    let outcome = PaginatedFetcher::new(client, retry).fetch_all().await?;

    let date = Utc::now().format("%Y-%m-%d").to_string();
    if let Err(e) = save_hits(
        Path::new(&config.save_directory),
        &category.artifact_name(&date),
        &outcome.hits,
    ) {
        warn!("{name}: failed to save raw-hit artifact: {e}");
    }

    let table = category.table_name();
    store.ensure_tables(&table)?;

    let extractor = extractor_for(&category.website);
    let mut counters = outcome.counters;
    for raw in &outcome.hits {
        let Some(fields) = normalize(extractor.as_ref(), raw) else {
            counters.records_skipped += 1;
            continue;
        };
        match store.upsert(&table, &fields, Utc::now()) {
            Ok(_) => counters.records_merged += 1,
            Err(e) => {
                warn!("{name}: merge failed for {}: {e}", fields.sku);
                counters.records_errored += 1;
            }
        }
    }

    Ok(counters)
}

/// Refreshes the benchmark tables if a benchmark config is present;
/// failures leave the existing tables in place for the scoring pass.
async fn refresh_benchmarks(store: &mut CatalogStore, retry: RetryPolicy) {
    let benchmark_config = match load_benchmark_config(BENCHMARK_CONFIG_PATH) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("no benchmark config loaded ({e}), scoring with existing tables");
            return;
        }
    };
    let loader = match BenchmarkLoader::new(benchmark_config, retry) {
        Ok(l) => l,
        Err(e) => {
            warn!("benchmark loader init failed: {e}");
            return;
        }
    };
    if let Err(e) = loader.refresh(store).await {
        warn!("benchmark refresh failed ({e}), keeping existing tables");
    }
}
