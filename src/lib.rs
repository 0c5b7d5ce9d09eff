//! Inmo Search - natural-language property search service
//!
//! This library turns free-text real-estate queries into structured criteria,
//! filters and ranks a property catalog, and falls back to a remote language
//! model and then to plain-text matching when strict filtering comes up short.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{extract_filters, extract_keywords, extract_numbers, Matcher, Orchestrator, SemanticOracle, SemanticSearcher};
pub use models::{Criteria, PropertyRecord, PropertyType, SearchRequest, SearchResult, SearchStrategy};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let query = "casa de 3 habitaciones";
        let criteria = extract_filters(query, &extract_numbers(query));
        assert_eq!(criteria.property_type, Some(PropertyType::House));
        assert_eq!(criteria.rooms_exact, Some(3));
    }
}
