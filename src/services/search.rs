use crate::config::Settings;
use crate::core::{Matcher, Orchestrator, SemanticSearcher};
use crate::models::{ExtractFiltersResponse, HealthResponse, PropertyRecord, SearchResult};
use crate::services::cache::{CacheManager, CachedOracle};
use crate::services::catalog::{CatalogSnapshot, FallbackCatalog, JsonCatalog};
use crate::services::mysql::MysqlCatalog;
use crate::services::ollama::OllamaClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// Request-facing search context
///
/// Owns the catalog supplier and the orchestrator; every search loads a
/// fresh snapshot and runs the cascade over it.
#[derive(Clone)]
pub struct SearchService {
    catalog: FallbackCatalog,
    orchestrator: Orchestrator,
    reply_cache: Option<Arc<CacheManager>>,
}

impl SearchService {
    pub fn new(catalog: FallbackCatalog, orchestrator: Orchestrator) -> Self {
        Self {
            catalog,
            orchestrator,
            reply_cache: None,
        }
    }

    /// Report this cache's statistics in health checks
    pub fn with_reply_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.reply_cache = Some(cache);
        self
    }

    /// Wire every collaborator from configuration
    ///
    /// Unavailable collaborators are logged and left out: no database means
    /// the JSON catalog only, no Redis means an in-process cache, a client
    /// that cannot be built means no semantic stage.
    pub async fn from_settings(settings: &Settings) -> Self {
        let mut catalog = FallbackCatalog::new()
            .with_fallback(Arc::new(JsonCatalog::new(&settings.catalog.json_path)))
            .with_max_records(settings.catalog.max_records);

        if let Some(url) = &settings.database.url {
            match MysqlCatalog::from_settings(
                url,
                settings.database.max_connections,
                settings.database.acquire_timeout_secs,
            )
            .await
            {
                Ok(db) => catalog = catalog.with_primary(Arc::new(db)),
                Err(e) => tracing::warn!("MySQL unavailable, using JSON catalog only: {}", e),
            }
        }

        let matcher = Matcher::new(settings.priority.clone(), settings.search);
        let mut orchestrator = Orchestrator::new(matcher);
        let mut reply_cache = None;

        if settings.ollama.enabled {
            match OllamaClient::from_settings(&settings.ollama) {
                Ok(client) => {
                    tracing::info!(
                        "Semantic fallback enabled (model {}, {})",
                        client.model(),
                        settings.ollama.api_url()
                    );
                    let cache = Arc::new(build_cache(settings).await);
                    let tuning = settings.search;
                    reply_cache = Some(cache.clone());
                    let searcher = SemanticSearcher::new(Arc::new(CachedOracle::new(client, cache))).with_limits(
                        tuning.semantic_chunk_size,
                        tuning.semantic_max_properties,
                        Duration::from_millis(tuning.semantic_pause_ms),
                    );
                    orchestrator = orchestrator.with_semantic(searcher);
                }
                Err(e) => tracing::warn!("Semantic fallback disabled: {}", e),
            }
        }

        let service = Self::new(catalog, orchestrator);
        match reply_cache {
            Some(cache) => service.with_reply_cache(cache),
            None => service,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Run one search over a fresh catalog snapshot
    pub async fn search(&self, query: &str, allow_semantic: bool) -> SearchResult {
        let span = tracing::info_span!("search", request_id = %Uuid::new_v4());

        async move {
            tracing::info!(query, allow_semantic, "Search requested");
            let snapshot = self.catalog.load().await;

            let mut result = self
                .orchestrator
                .search(&snapshot.properties, query, allow_semantic)
                .await;
            result.metadata.data_source = Some(snapshot.source.to_string());
            result
        }
        .instrument(span)
        .await
    }

    /// Numbers, criteria and keywords a query yields
    pub fn extract_filters(&self, query: &str) -> ExtractFiltersResponse {
        let (numbers, filters, keywords) = self.orchestrator.extract_filters(query);
        ExtractFiltersResponse {
            query: query.to_string(),
            numbers,
            filters,
            keywords,
        }
    }

    pub async fn properties(&self) -> CatalogSnapshot {
        self.catalog.load().await
    }

    pub async fn property(&self, id: i64) -> Option<PropertyRecord> {
        self.catalog
            .load()
            .await
            .properties
            .into_iter()
            .find(|p| p.id == id)
    }

    /// Degraded when a database is configured but unreachable
    pub async fn health(&self) -> HealthResponse {
        let (status, catalog_source) = if !self.catalog.has_primary() {
            ("healthy", "json")
        } else {
            match self.catalog.health_check().await {
                Ok(()) => ("healthy", "database"),
                Err(e) => {
                    tracing::warn!("Database health check failed: {}", e);
                    ("degraded", "json")
                }
            }
        };

        HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            catalog_source: catalog_source.to_string(),
            reply_cache: self.reply_cache.as_ref().map(|cache| cache.stats()),
        }
    }
}

async fn build_cache(settings: &Settings) -> CacheManager {
    let cache = &settings.cache;
    if let Some(url) = &cache.redis_url {
        match CacheManager::new(url, cache.l1_cache_size, cache.ttl_secs).await {
            Ok(manager) => return manager,
            Err(e) => tracing::warn!("Redis unavailable, using in-process cache only: {}", e),
        }
    }
    CacheManager::in_memory(cache.l1_cache_size, cache.ttl_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LISTINGS: &str = r#"[
        {"id": 1, "titulo": "Casa familiar", "tipo": "casa", "precio": 290000, "habitaciones": 3, "ubicacion": "Zona 10"},
        {"id": 2, "titulo": "Apartamento moderno", "tipo": "departamento", "precio": 600000, "habitaciones": 1, "ubicacion": "Zona 14"}
    ]"#;

    fn service_for(file: &tempfile::NamedTempFile) -> SearchService {
        let catalog = FallbackCatalog::new().with_fallback(Arc::new(JsonCatalog::new(file.path())));
        SearchService::new(catalog, Orchestrator::new(Matcher::default()))
    }

    fn catalog_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LISTINGS.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_search_reports_data_source() {
        let file = catalog_file();
        let service = service_for(&file);

        let result = service
            .search("casa de 3 habitaciones en zona 10, menos de 300 mil", true)
            .await;

        assert_eq!(result.metadata.data_source.as_deref(), Some("json"));
        assert_eq!(result.properties.len(), 1);
        assert_eq!(result.properties[0].id, 1);
    }

    #[tokio::test]
    async fn test_property_lookup() {
        let file = catalog_file();
        let service = service_for(&file);

        assert_eq!(service.property(2).await.map(|p| p.id), Some(2));
        assert!(service.property(99).await.is_none());
        assert_eq!(service.properties().await.properties.len(), 2);
    }

    #[tokio::test]
    async fn test_health_without_database() {
        let file = catalog_file();
        let health = service_for(&file).health().await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.catalog_source, "json");
        assert!(health.reply_cache.is_none());
    }

    #[tokio::test]
    async fn test_health_reports_reply_cache() {
        let file = catalog_file();
        let cache = Arc::new(CacheManager::in_memory(100, 60));
        cache.set("oracle:seen", &"{}").await.unwrap();
        let _: String = cache.get("oracle:seen").await.unwrap();

        let health = service_for(&file).with_reply_cache(cache).health().await;
        let stats = health.reply_cache.expect("cache stats expected");
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 0);
        assert!(!stats.l2_enabled);
    }

    #[test]
    fn test_extract_filters() {
        let service = SearchService::new(FallbackCatalog::new(), Orchestrator::new(Matcher::default()));
        let response = service.extract_filters("departamento de 2 habitaciones");

        assert_eq!(response.numbers, vec![2.0]);
        assert_eq!(response.filters.rooms_exact, Some(2));
        assert_eq!(response.keywords[0], "departamento");
    }
}
