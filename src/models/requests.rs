use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to search the catalog
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, max = 500))]
    pub query: String,
    #[serde(default = "default_allow_semantic")]
    #[serde(alias = "allow_semantic", alias = "useCloud", rename = "allowSemantic")]
    pub allow_semantic: bool,
}

fn default_allow_semantic() -> bool {
    true
}

/// Request to run only the filter extractor (diagnostics)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExtractFiltersRequest {
    #[validate(length(min = 1, max = 500))]
    pub query: String,
}
