pub mod client;
pub mod paginated;
pub mod traits;

pub use client::HttpSearchClient;
pub use paginated::{PaginatedFetcher, save_hits};
