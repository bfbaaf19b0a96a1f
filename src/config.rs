use crate::model::ConfigError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;

/// Composite-score weights. Must be positive and sum to something sane;
/// validated at load time instead of on every access.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub form_factor: f64,
    pub cpu: f64,
    pub gpu: f64,
    pub ram: f64,
    pub storage: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            form_factor: 0.5,
            cpu: 0.499,
            gpu: 0.0005,
            ram: 0.00025,
            storage: 0.00025,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.form_factor + self.cpu + self.gpu + self.ram + self.storage
    }

    fn validate(&self, category: &str) -> Result<(), ConfigError> {
        let all = [self.form_factor, self.cpu, self.gpu, self.ram, self.storage];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Invalid(format!(
                "category {category}: weights must be finite and non-negative"
            )));
        }
        if self.sum() <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "category {category}: weights sum to zero"
            )));
        }
        Ok(())
    }
}

/// One vendor/category search, e.g. "Direct_Dial_CA_Notebooks".
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    pub url: String,
    #[serde(default)]
    pub querystring: HashMap<String, String>,
    pub search_query: serde_json::Value,
    pub country: String,
    pub website: String,
    #[serde(default)]
    pub form_type: Option<String>,
    #[serde(default)]
    pub weights: Option<ScoreWeights>,
    #[serde(default)]
    pub form_factor_weights: Option<HashMap<String, f64>>,
}

impl CategoryConfig {
    /// Artifact filename for this category on the given date (YYYY-MM-DD).
    pub fn artifact_name(&self, date: &str) -> String {
        match &self.form_type {
            Some(ft) => format!("{}_{}_{}_{}.json", self.website, self.country, ft, date),
            None => format!("{}_{}_{}.json", self.website, self.country, date),
        }
    }

    /// SQLite table suffix for this vendor-region, e.g. "DirectDial_CA".
    pub fn table_name(&self) -> String {
        format!("{}_{}", self.website, self.country)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub shared_headers: HashMap<String, String>,
    #[serde(default = "default_save_directory")]
    pub save_directory: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    pub categories: BTreeMap<String, CategoryConfig>,
}

fn default_save_directory() -> String {
    "save".to_string()
}

fn default_database_path() -> String {
    "products.db".to_string()
}

/// One benchmark source (CPU or GPU): warm-up URL plus the JSON data URL.
#[derive(Debug, Clone, Deserialize)]
pub struct BenchmarkSource {
    pub init_url: String,
    pub data_url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BenchmarkConfig {
    pub cpu: BenchmarkSource,
    pub gpu: BenchmarkSource,
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    if config.categories.is_empty() {
        return Err(ConfigError::Invalid("no categories configured".into()));
    }
    for (name, cat) in &config.categories {
        if cat.url.is_empty() {
            return Err(ConfigError::Invalid(format!("category {name}: empty url")));
        }
        if !cat.search_query.is_object() {
            return Err(ConfigError::Invalid(format!(
                "category {name}: search_query must be a JSON object"
            )));
        }
        if let Some(weights) = &cat.weights {
            weights.validate(name)?;
        }
    }
    Ok(config)
}

pub fn load_benchmark_config(path: &str) -> Result<BenchmarkConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: BenchmarkConfig = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let file = write_config(
            r#"{
                "shared_headers": {"x-api-key": "k"},
                "categories": {
                    "DirectDial_CA_Notebooks": {
                        "url": "https://example.com/search",
                        "search_query": {"q": "*", "collection": "products"},
                        "country": "CA",
                        "website": "DirectDial",
                        "form_type": "Notebooks"
                    }
                }
            }"#,
        );
        let cfg = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.save_directory, "save");
        assert_eq!(cfg.database_path, "products.db");
        let cat = &cfg.categories["DirectDial_CA_Notebooks"];
        assert_eq!(cat.table_name(), "DirectDial_CA");
        assert_eq!(
            cat.artifact_name("2024-01-31"),
            "DirectDial_CA_Notebooks_2024-01-31.json"
        );
    }

    #[test]
    fn rejects_negative_weights() {
        let file = write_config(
            r#"{
                "categories": {
                    "C": {
                        "url": "https://example.com",
                        "search_query": {},
                        "country": "US",
                        "website": "W",
                        "weights": {"cpu": -1.0}
                    }
                }
            }"#,
        );
        assert!(matches!(
            load_config(file.path().to_str().unwrap()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_non_object_search_query() {
        let file = write_config(
            r#"{
                "categories": {
                    "C": {
                        "url": "https://example.com",
                        "search_query": "laptops",
                        "country": "US",
                        "website": "W"
                    }
                }
            }"#,
        );
        assert!(load_config(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn default_weights_sum_to_one() {
        let w = ScoreWeights::default();
        assert!((w.sum() - 1.0).abs() < 1e-9);
    }
}
