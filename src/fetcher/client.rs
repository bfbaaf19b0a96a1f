use crate::config::{AppConfig, CategoryConfig};
use crate::fetcher::traits::{SearchClient, SearchPage};
use crate::model::FetchError;
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::HashMap;

/// Posts the vendor search payload and decodes the multi-search response
/// shape: `{"results": [{"found", "request_params": {"per_page"}, "hits"}]}`.
pub struct HttpSearchClient {
    client: Client,
    url: String,
    querystring: HashMap<String, String>,
    headers: HashMap<String, String>,
    search_query: Value,
}

impl HttpSearchClient {
    pub fn new(config: &AppConfig, category: &CategoryConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) hwtracker/0.1")
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: category.url.clone(),
            querystring: category.querystring.clone(),
            headers: config.shared_headers.clone(),
            search_query: category.search_query.clone(),
        })
    }

    fn payload(&self, page: usize) -> Value {
        let mut query = self.search_query.clone();
        if let Value::Object(map) = &mut query {
            map.insert("page".to_string(), json!(page));
        }
        json!({ "searches": [query] })
    }
}

#[async_trait::async_trait]
impl SearchClient for HttpSearchClient {
    async fn search(&self, page: usize) -> Result<SearchPage, FetchError> {
        let mut request = self
            .client
            .post(&self.url)
            .query(&self.querystring)
            .json(&self.payload(page));
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16(), page));
        }

        let body: Value = response.json().await?;
        parse_search_page(&body)
    }
}

/// Pulls `found`, `per_page` and the hit list out of the response body.
pub fn parse_search_page(body: &Value) -> Result<SearchPage, FetchError> {
    let result = body
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .ok_or_else(|| FetchError::MalformedResponse("no results array".into()))?;

    let found = result.get("found").and_then(Value::as_u64).unwrap_or(0);
    let per_page = result
        .get("request_params")
        .and_then(|p| p.get("per_page"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let hits = result
        .get("hits")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Ok(SearchPage { found, per_page, hits })
}
