pub mod sqlite;

pub use sqlite::{BenchmarkKind, CatalogStore};
