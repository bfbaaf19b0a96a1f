use crate::model::FetchError;
use serde_json::Value;

/// One page of vendor search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub found: u64,
    pub per_page: u64,
    pub hits: Vec<Value>,
}

#[async_trait::async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, page: usize) -> Result<SearchPage, FetchError>;
}
