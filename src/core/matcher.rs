use crate::core::{
    filters::{matches_criteria_on, text_filter},
    query::ParsedQuery,
    scoring::calculate_relevance_score,
};
use crate::models::{PriorityProfile, PropertyRecord, ScoredProperty, SearchStrategy, SearchTuning};
use chrono::NaiveDate;
use std::collections::HashSet;

/// Result of the ranking stage
#[derive(Debug)]
pub struct RankedResult {
    pub properties: Vec<PropertyRecord>,
    /// Whether scoring changed the order of the working set
    pub boosted: bool,
    pub candidates: usize,
}

/// Deterministic half of the search pipeline
///
/// # Pipeline Stages
/// 1. Strict criteria filtering
/// 2. Merge with semantic candidates
/// 3. Plain-text fallback
/// 4. Scoring, ranking and truncation
#[derive(Debug, Clone)]
pub struct Matcher {
    profile: PriorityProfile,
    tuning: SearchTuning,
}

impl Matcher {
    pub fn new(profile: PriorityProfile, tuning: SearchTuning) -> Self {
        Self { profile, tuning }
    }

    pub fn with_default_profile() -> Self {
        Self {
            profile: PriorityProfile::default(),
            tuning: SearchTuning::default(),
        }
    }

    pub fn tuning(&self) -> &SearchTuning {
        &self.tuning
    }

    pub fn profile(&self) -> &PriorityProfile {
        &self.profile
    }

    /// Stage 1: properties passing every extracted criterion
    ///
    /// A query without any extractable criterion matches nothing here, which
    /// hands the decision to the fallback stages.
    pub fn exact_matches(
        &self,
        properties: &[PropertyRecord],
        query: &ParsedQuery,
        today: NaiveDate,
    ) -> Vec<PropertyRecord> {
        if query.criteria.is_empty() {
            return Vec::new();
        }

        properties
            .iter()
            .filter(|p| matches_criteria_on(p, &query.criteria, today))
            .cloned()
            .collect()
    }

    /// Stage 2: combine strict and semantic candidates
    ///
    /// Semantic results replace the strict ones when clearly richer
    /// (`|semantic| > |exact| × ratio`); otherwise up to `blend_extra` new
    /// semantic results are appended.
    pub fn merge(
        &self,
        exact: Vec<PropertyRecord>,
        semantic: Vec<PropertyRecord>,
    ) -> (Vec<PropertyRecord>, SearchStrategy) {
        if semantic.len() as f64 > exact.len() as f64 * self.tuning.semantic_replace_ratio {
            return (semantic, SearchStrategy::AiSemantic);
        }

        let known: HashSet<i64> = exact.iter().map(|p| p.id).collect();
        let extra: Vec<PropertyRecord> = semantic
            .into_iter()
            .filter(|p| !known.contains(&p.id))
            .take(self.tuning.blend_extra)
            .collect();

        if extra.is_empty() {
            return (exact, SearchStrategy::ExactFilters);
        }

        let mut merged = exact;
        merged.extend(extra);
        (merged, SearchStrategy::ExactPlusSemantic)
    }

    /// Stage 3: substring-count fallback over the whole catalog
    pub fn text_fallback(&self, properties: &[PropertyRecord], query: &ParsedQuery) -> Vec<PropertyRecord> {
        text_filter(properties, &query.lower)
    }

    /// Stage 4: score, sort, truncate and strip the working set
    pub fn rank(&self, working: Vec<PropertyRecord>, query: &ParsedQuery, today: NaiveDate) -> RankedResult {
        let candidates = working.len();

        let mut scored: Vec<ScoredProperty> = working
            .into_iter()
            .map(|property| {
                let (score, reasons) = calculate_relevance_score(
                    &property,
                    &query.lower,
                    &query.numbers,
                    &query.criteria,
                    &self.profile,
                    today,
                );
                ScoredProperty::new(property, score, reasons)
            })
            .collect();

        let mut boosted = false;
        if scored.iter().any(|s| s.match_score > 0) {
            let before: Vec<i64> = scored.iter().map(|s| s.property.id).collect();
            // Stable: ties keep their relative order
            scored.sort_by(|a, b| b.match_score.cmp(&a.match_score));
            boosted = scored.iter().map(|s| s.property.id).ne(before);
        }

        scored.truncate(self.tuning.max_results);

        RankedResult {
            properties: scored.into_iter().map(ScoredProperty::into_property).collect(),
            boosted,
            candidates,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_profile()
    }
}
