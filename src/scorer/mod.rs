// Scorer module: benchmark matching plus composite score computation.

pub mod composite;
pub mod matcher;

pub use composite::{default_form_factor_weights, score_record};

use crate::config::CategoryConfig;
use crate::model::StorageError;
use crate::storage::{BenchmarkKind, CatalogStore};
use std::collections::HashMap;
use tracing::{info, warn};

/// Batch scoring pass over one vendor-region table. Benchmark tables are
/// read once up front; per-record storage failures are logged and skipped.
pub fn score_all(
    store: &CatalogStore,
    table: &str,
    category: &CategoryConfig,
) -> Result<usize, StorageError> {
    let cpu_table = store.benchmarks(BenchmarkKind::Cpu)?;
    let gpu_table = store.benchmarks(BenchmarkKind::Gpu)?;
    if cpu_table.is_empty() && gpu_table.is_empty() {
        warn!("benchmark tables are empty, scoring {table} with size/form-factor only");
    }

    let weights = category.weights.clone().unwrap_or_default();
    let ff_weights: HashMap<String, f64> = category
        .form_factor_weights
        .clone()
        .unwrap_or_else(default_form_factor_weights);

    let records = store.records(table)?;
    let mut scored = 0;
    for record in &records {
        let scores = score_record(record, &cpu_table, &gpu_table, &weights, &ff_weights);
        match store.update_scores(table, &record.sku, &scores) {
            Ok(()) => scored += 1,
            Err(err) => warn!("score write failed for {}: {err}", record.sku),
        }
    }
    info!("scored {scored} of {} records in {table}", records.len());
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BenchmarkEntry, NormalizedFields};
    use chrono::Utc;
    use serde_json::json;

    fn category() -> CategoryConfig {
        serde_json::from_value(json!({
            "url": "https://example.com",
            "search_query": {},
            "country": "CA",
            "website": "DirectDial"
        }))
        .unwrap()
    }

    #[test]
    fn batch_pass_writes_scores_back() {
        let mut store = CatalogStore::open_in_memory().unwrap();
        store.ensure_tables("DirectDial_CA").unwrap();
        store
            .replace_benchmarks(
                BenchmarkKind::Cpu,
                &[
                    BenchmarkEntry { name: "Intel Core i3-10100".into(), score: 8000.0 },
                    BenchmarkEntry { name: "Intel Core i7-10700".into(), score: 17583.0 },
                ],
            )
            .unwrap();

        let fields = NormalizedFields {
            sku: "ABC123".into(),
            cpu: Some("Intel Core i7-10700".into()),
            form_factor: Some("Tower".into()),
            price: Some(999.0),
            stock: Some(2),
            ..Default::default()
        };
        store.upsert("DirectDial_CA", &fields, Utc::now()).unwrap();

        let scored = score_all(&store, "DirectDial_CA", &category()).unwrap();
        assert_eq!(scored, 1);

        let record = store.record("DirectDial_CA", "ABC123").unwrap().unwrap();
        assert_eq!(record.cpu_score, 1.0);
        assert!(record.total_score > 0.0 && record.total_score <= 1000.0);
    }

    #[test]
    fn unmatched_component_does_not_abort_batch() {
        let mut store = CatalogStore::open_in_memory().unwrap();
        store.ensure_tables("DirectDial_CA").unwrap();
        for (sku, cpu) in [("A1", "Banana Chip 9000"), ("A2", "N/A")] {
            let fields = NormalizedFields {
                sku: sku.into(),
                cpu: Some(cpu.into()),
                ..Default::default()
            };
            store.upsert("DirectDial_CA", &fields, Utc::now()).unwrap();
        }
        let scored = score_all(&store, "DirectDial_CA", &category()).unwrap();
        assert_eq!(scored, 2);
        let record = store.record("DirectDial_CA", "A1").unwrap().unwrap();
        assert_eq!(record.cpu_score, 0.0);
    }
}
