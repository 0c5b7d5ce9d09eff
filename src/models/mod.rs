// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    ActiveStrategy, Approx, Criteria, PriceRange, PriorityProfile, PropertyRecord, PropertyType,
    ScoredProperty, SearchMetadata, SearchResult, SearchStrategy, SearchTuning,
};
pub use requests::{ExtractFiltersRequest, SearchRequest};
pub use responses::{
    CacheStats, ErrorResponse, ExtractFiltersResponse, HealthResponse, PropertiesResponse,
};
