//! Combines normalized sub-scores into the composite product score.

use crate::config::ScoreWeights;
use crate::model::{BenchmarkEntry, CatalogRecord, SubScores};
use crate::scorer::matcher::{MatchOutcome, resolve};
use std::collections::HashMap;

/// Fixed reference ranges for the size-based sub-scores (GB, inches).
const RAM_RANGE: (f64, f64) = (4.0, 128.0);
const STORAGE_RANGE: (f64, f64) = (0.0, 2000.0);
const SCREEN_RANGE: (f64, f64) = (10.0, 18.0);

/// Default desktop form-factor weights; overridable per category.
pub fn default_form_factor_weights() -> HashMap<String, f64> {
    HashMap::from([
        ("Tower".to_string(), 0.8),
        ("SFF".to_string(), 0.6),
        ("Tiny".to_string(), 0.4),
        ("All-in-One".to_string(), 0.05),
    ])
}

/// Min-max normalization clamped to [0, 1]; degenerate ranges score 0.
fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

fn table_range(table: &[BenchmarkEntry]) -> (f64, f64) {
    let min = table.iter().map(|e| e.score).fold(f64::INFINITY, f64::min);
    let max = table.iter().map(|e| e.score).fold(f64::NEG_INFINITY, f64::max);
    (min, max)
}

/// Benchmark sub-score for one component name: resolved score normalized
/// against the benchmark table's own range. "Integrated" is a fixed 1.0
/// baseline; unmatched components degrade to 0 without aborting anything.
fn component_score(name: Option<&str>, table: &[BenchmarkEntry]) -> f64 {
    let Some(name) = name else { return 0.0 };
    match resolve(name, table) {
        MatchOutcome::Matched { score, .. } => {
            let (min, max) = table_range(table);
            normalize(score, min, max)
        }
        MatchOutcome::Integrated => 1.0,
        MatchOutcome::Unmatched => 0.0,
    }
}

/// Desktop classes use the fixed weight map; notebooks (no canonical form
/// factor, but a screen) use normalized screen size.
fn form_factor_score(record: &CatalogRecord, ff_weights: &HashMap<String, f64>) -> f64 {
    if let Some(ff) = &record.form_factor {
        return ff_weights.get(ff).copied().unwrap_or(0.0).clamp(0.0, 1.0);
    }
    if let Some(screen) = record.screen_size {
        return normalize(screen, SCREEN_RANGE.0, SCREEN_RANGE.1);
    }
    0.0
}

/// Computes all sub-scores and the weighted composite, scaled to [0, 1000].
/// Weights are normalized by their sum so category overrides cannot push the
/// composite out of range.
pub fn score_record(
    record: &CatalogRecord,
    cpu_table: &[BenchmarkEntry],
    gpu_table: &[BenchmarkEntry],
    weights: &ScoreWeights,
    ff_weights: &HashMap<String, f64>,
) -> SubScores {
    let ff = form_factor_score(record, ff_weights);
    let cpu = component_score(record.cpu.as_deref(), cpu_table);
    let gpu = component_score(record.gpu.as_deref(), gpu_table);
    let ram = record
        .ram
        .map(|r| normalize(r as f64, RAM_RANGE.0, RAM_RANGE.1))
        .unwrap_or(0.0);
    let storage = record
        .storage
        .map(|s| normalize(s as f64, STORAGE_RANGE.0, STORAGE_RANGE.1))
        .unwrap_or(0.0);

    let weighted = weights.form_factor * ff
        + weights.cpu * cpu
        + weights.gpu * gpu
        + weights.ram * ram
        + weights.storage * storage;
    let total = 1000.0 * weighted / weights.sum();

    SubScores { ff, cpu, gpu, ram, storage, total }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_table() -> Vec<BenchmarkEntry> {
        vec![
            BenchmarkEntry { name: "Intel Celeron N4500".into(), score: 1500.0 },
            BenchmarkEntry { name: "Intel Core i7-10700".into(), score: 17583.0 },
            BenchmarkEntry { name: "AMD Ryzen 9 7950X".into(), score: 45000.0 },
        ]
    }

    fn gpu_table() -> Vec<BenchmarkEntry> {
        vec![
            BenchmarkEntry { name: "GeForce GT 1030".into(), score: 2600.0 },
            BenchmarkEntry { name: "GeForce RTX 3060".into(), score: 17012.0 },
        ]
    }

    fn record(sku: &str) -> CatalogRecord {
        use chrono::Utc;
        CatalogRecord {
            sku: sku.to_string(),
            name: None,
            category: None,
            brand: None,
            form_factor: Some("Tower".to_string()),
            price: 999.0,
            msrp: None,
            stock: 1,
            cpu: Some("Intel Core i7-10700".to_string()),
            gpu: Some("GeForce RTX 3060".to_string()),
            gpu_memory_mode: None,
            ram: Some(16),
            storage: Some(512),
            os: None,
            screen_size: None,
            screen_resolution: None,
            touchscreen: None,
            keyboard_locale: None,
            wifi: None,
            url: None,
            ff_score: 0.0,
            cpu_score: 0.0,
            gpu_score: 0.0,
            ram_score: 0.0,
            storage_score: 0.0,
            total_score: 0.0,
            date_added: Utc::now(),
            date_updated: Utc::now(),
            in_stock: true,
            errors: Vec::new(),
        }
    }

    #[test]
    fn composite_stays_within_bounds() {
        let scores = score_record(
            &record("S"),
            &cpu_table(),
            &gpu_table(),
            &ScoreWeights::default(),
            &default_form_factor_weights(),
        );
        assert!(scores.total >= 0.0 && scores.total <= 1000.0);
        for sub in [scores.ff, scores.cpu, scores.gpu, scores.ram, scores.storage] {
            assert!((0.0..=1.0).contains(&sub));
        }
    }

    #[test]
    fn maxed_out_record_scores_one_thousand() {
        let mut rec = record("S");
        rec.cpu = Some("AMD Ryzen 9 7950X".to_string());
        rec.gpu = Some("GeForce RTX 3060".to_string());
        rec.ram = Some(128);
        rec.storage = Some(2000);
        rec.form_factor = Some("Max".to_string());
        let ff_weights = HashMap::from([("Max".to_string(), 1.0)]);
        let scores = score_record(
            &rec,
            &cpu_table(),
            &gpu_table(),
            &ScoreWeights::default(),
            &ff_weights,
        );
        assert!((scores.total - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn unmatched_cpu_degrades_only_that_sub_score() {
        let mut rec = record("S");
        rec.cpu = Some("Banana Chip 9000".to_string());
        let scores = score_record(
            &rec,
            &cpu_table(),
            &gpu_table(),
            &ScoreWeights::default(),
            &default_form_factor_weights(),
        );
        assert_eq!(scores.cpu, 0.0);
        assert!(scores.gpu > 0.0);
        assert!(scores.ff > 0.0);
    }

    #[test]
    fn integrated_gpu_is_fixed_baseline() {
        let mut rec = record("S");
        rec.gpu = Some("Integrated".to_string());
        let scores = score_record(
            &rec,
            &cpu_table(),
            &gpu_table(),
            &ScoreWeights::default(),
            &default_form_factor_weights(),
        );
        assert_eq!(scores.gpu, 1.0);
    }

    #[test]
    fn na_gpu_scores_zero() {
        let mut rec = record("S");
        rec.gpu = Some("N/A".to_string());
        let scores = score_record(
            &rec,
            &cpu_table(),
            &gpu_table(),
            &ScoreWeights::default(),
            &default_form_factor_weights(),
        );
        assert_eq!(scores.gpu, 0.0);
    }

    #[test]
    fn notebook_form_factor_uses_screen_size() {
        let mut rec = record("S");
        rec.form_factor = None;
        rec.screen_size = Some(14.0);
        let scores = score_record(
            &rec,
            &cpu_table(),
            &gpu_table(),
            &ScoreWeights::default(),
            &default_form_factor_weights(),
        );
        assert!((scores.ff - 0.5).abs() < 1e-9);
    }

    #[test]
    fn ram_normalizes_against_fixed_range() {
        let mut rec = record("S");
        rec.ram = Some(4);
        let scores = score_record(
            &rec,
            &cpu_table(),
            &gpu_table(),
            &ScoreWeights::default(),
            &default_form_factor_weights(),
        );
        assert_eq!(scores.ram, 0.0);

        rec.ram = Some(128);
        let scores = score_record(
            &rec,
            &cpu_table(),
            &gpu_table(),
            &ScoreWeights::default(),
            &default_form_factor_weights(),
        );
        assert_eq!(scores.ram, 1.0);

        rec.ram = Some(256);
        let scores = score_record(
            &rec,
            &cpu_table(),
            &gpu_table(),
            &ScoreWeights::default(),
            &default_form_factor_weights(),
        );
        assert_eq!(scores.ram, 1.0);
    }
}
