use crate::models::PropertyRecord;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while loading the listing catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Anything that can supply a catalog snapshot
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load_properties(&self) -> Result<Vec<PropertyRecord>, CatalogError>;

    /// Label reported as `data_source` in search metadata
    fn name(&self) -> &'static str;

    async fn health_check(&self) -> Result<(), CatalogError> {
        Ok(())
    }
}

/// Catalog stored in a JSON file
///
/// The file holds either an array of records or an object with a
/// `propiedades` array. Records that fail to parse are skipped.
pub struct JsonCatalog {
    path: PathBuf,
}

impl JsonCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl CatalogSource for JsonCatalog {
    async fn load_properties(&self) -> Result<Vec<PropertyRecord>, CatalogError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let properties = parse_catalog(&contents)?;
        tracing::debug!("Loaded {} listings from {}", properties.len(), self.path.display());
        Ok(properties)
    }

    fn name(&self) -> &'static str {
        "json"
    }

    async fn health_check(&self) -> Result<(), CatalogError> {
        tokio::fs::metadata(&self.path).await?;
        Ok(())
    }
}

/// Parse a catalog document, skipping malformed records
pub fn parse_catalog(contents: &str) -> Result<Vec<PropertyRecord>, CatalogError> {
    let document: Value = serde_json::from_str(contents)?;

    let records = match document {
        Value::Array(records) => records,
        Value::Object(mut object) => match object.remove("propiedades") {
            Some(Value::Array(records)) => records,
            _ => {
                return Err(CatalogError::InvalidFormat(
                    "expected an array or an object with a 'propiedades' array".to_string(),
                ))
            }
        },
        _ => return Err(CatalogError::InvalidFormat("expected a JSON array".to_string())),
    };

    let properties = records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<PropertyRecord>(record) {
            Ok(property) => Some(property),
            Err(e) => {
                tracing::warn!("Skipping malformed listing: {}", e);
                None
            }
        })
        .collect();

    Ok(properties)
}

/// A loaded snapshot and where it came from
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub properties: Vec<PropertyRecord>,
    pub source: &'static str,
}

impl CatalogSnapshot {
    pub fn empty() -> Self {
        Self {
            properties: Vec::new(),
            source: "none",
        }
    }
}

/// Database first, JSON file second, empty catalog last
#[derive(Clone, Default)]
pub struct FallbackCatalog {
    primary: Option<Arc<dyn CatalogSource>>,
    fallback: Option<Arc<dyn CatalogSource>>,
    max_records: Option<usize>,
}

impl FallbackCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_primary(mut self, source: Arc<dyn CatalogSource>) -> Self {
        self.primary = Some(source);
        self
    }

    pub fn with_fallback(mut self, source: Arc<dyn CatalogSource>) -> Self {
        self.fallback = Some(source);
        self
    }

    pub fn with_max_records(mut self, max_records: Option<usize>) -> Self {
        self.max_records = max_records;
        self
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Load a snapshot; never fails
    ///
    /// An error or an empty result from the primary source falls through to
    /// the fallback; when both are unusable the snapshot is empty.
    pub async fn load(&self) -> CatalogSnapshot {
        for source in self.primary.iter().chain(self.fallback.iter()) {
            match source.load_properties().await {
                Ok(mut properties) if !properties.is_empty() => {
                    if let Some(max) = self.max_records {
                        properties.truncate(max);
                    }
                    return CatalogSnapshot {
                        properties,
                        source: source.name(),
                    };
                }
                Ok(_) => tracing::warn!("Catalog source '{}' returned no listings", source.name()),
                Err(e) => tracing::warn!("Catalog source '{}' failed: {}", source.name(), e),
            }
        }

        tracing::error!("No catalog source produced listings");
        CatalogSnapshot::empty()
    }

    /// Health of the primary source; `Ok` when none is configured
    pub async fn health_check(&self) -> Result<(), CatalogError> {
        match &self.primary {
            Some(primary) => primary.health_check().await,
            None => Ok(()),
        }
    }
}
