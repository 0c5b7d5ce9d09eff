// Service exports
pub mod cache;
pub mod catalog;
pub mod mysql;
pub mod ollama;
pub mod search;

pub use cache::{CacheError, CacheKey, CacheManager, CachedOracle};
pub use catalog::{parse_catalog, CatalogError, CatalogSnapshot, CatalogSource, FallbackCatalog, JsonCatalog};
pub use mysql::MysqlCatalog;
pub use ollama::{OllamaClient, OllamaError};
pub use search::SearchService;
