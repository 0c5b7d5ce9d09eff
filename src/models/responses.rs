use serde::{Deserialize, Serialize};
use crate::models::domain::{Criteria, PropertyRecord};

/// Response for the filter-extraction diagnostic endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractFiltersResponse {
    pub query: String,
    pub numbers: Vec<f64>,
    pub filters: Criteria,
    pub keywords: Vec<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub catalog_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_cache: Option<CacheStats>,
}

/// Reply cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
    pub l2_enabled: bool,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Catalog snapshot listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertiesResponse {
    pub properties: Vec<PropertyRecord>,
    pub total: usize,
    pub data_source: String,
}
