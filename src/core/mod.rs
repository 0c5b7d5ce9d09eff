// Core search pipeline exports
pub mod analysis;
pub mod extractor;
pub mod filters;
pub mod keywords;
pub mod matcher;
pub mod orchestrator;
pub mod query;
pub mod scoring;
pub mod semantic;

pub use analysis::{detect_features, generate_analysis, NO_DATA_ANALYSIS};
pub use extractor::extract_filters;
pub use filters::{matches_criteria, matches_criteria_on, text_filter};
pub use keywords::{extract_keywords, extract_numbers};
pub use matcher::{Matcher, RankedResult};
pub use orchestrator::Orchestrator;
pub use query::ParsedQuery;
pub use scoring::{calculate_relevance_score, mentioned_priorities, PriorityAttribute};
pub use semantic::{SemanticOracle, SemanticSearcher};
