use crate::core::{
    analysis::{detect_features, generate_analysis, NO_DATA_ANALYSIS},
    matcher::Matcher,
    query::ParsedQuery,
    scoring::mentioned_priorities,
    semantic::SemanticSearcher,
};
use crate::models::{
    ActiveStrategy, Criteria, PropertyRecord, SearchMetadata, SearchResult, SearchStrategy,
};
use chrono::{Local, NaiveDate};
use tracing::{debug, info};

/// Cascade controller for one search
///
/// States: strict filtering, then an optional semantic fallback when the
/// strict set is small, then a plain-text fallback when nothing is left.
/// The working set is finally ranked, truncated and summarised.
#[derive(Clone)]
pub struct Orchestrator {
    matcher: Matcher,
    semantic: Option<SemanticSearcher>,
}

impl Orchestrator {
    pub fn new(matcher: Matcher) -> Self {
        Self {
            matcher,
            semantic: None,
        }
    }

    /// Enable the semantic fallback stage
    pub fn with_semantic(mut self, searcher: SemanticSearcher) -> Self {
        self.semantic = Some(searcher);
        self
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn semantic_enabled(&self) -> bool {
        self.semantic.is_some()
    }

    pub async fn search(&self, catalog: &[PropertyRecord], query: &str, allow_semantic: bool) -> SearchResult {
        self.search_on(catalog, query, allow_semantic, Local::now().date_naive())
            .await
    }

    /// Run the full cascade with recency evaluated against `today`
    pub async fn search_on(
        &self,
        catalog: &[PropertyRecord],
        query: &str,
        allow_semantic: bool,
        today: NaiveDate,
    ) -> SearchResult {
        let tuning = *self.matcher.tuning();
        let parsed = ParsedQuery::parse(query);
        let mut keywords = parsed.keywords.clone();
        keywords.truncate(tuning.max_keywords);

        if catalog.is_empty() {
            info!("Catalog is empty, skipping search");
            return SearchResult {
                properties: Vec::new(),
                keywords,
                analysis: NO_DATA_ANALYSIS.to_string(),
                metadata: SearchMetadata {
                    total_found: 0,
                    search_strategy: ActiveStrategy::new(SearchStrategy::None, false),
                    ai_used: false,
                    semantic_invoked: false,
                    boost_applied: false,
                    exact_matches: 0,
                    total_properties_analyzed: 0,
                    data_source: None,
                    user_query: parsed.raw,
                },
            };
        }

        // Strict stage
        let exact = self.matcher.exact_matches(catalog, &parsed, today);
        let exact_count = exact.len();
        debug!(exact_matches = exact_count, criteria = ?parsed.criteria, "Strict stage finished");

        // Semantic stage
        let mut working = exact;
        let mut stage = SearchStrategy::ExactFilters;
        let mut semantic_invoked = false;

        if exact_count < tuning.low_result_threshold && allow_semantic {
            if let Some(searcher) = &self.semantic {
                semantic_invoked = true;
                let semantic = searcher.search(catalog, &parsed.raw).await;
                debug!(semantic_matches = semantic.len(), "Semantic stage finished");
                (working, stage) = self.matcher.merge(working, semantic);
            }
        }

        // Text stage
        if working.is_empty() {
            let text = self.matcher.text_fallback(catalog, &parsed);
            if !text.is_empty() {
                debug!(text_matches = text.len(), "Text fallback used");
                working = text;
                stage = SearchStrategy::TextFilter;
            }
        }

        let ranked = self.matcher.rank(working, &parsed, today);
        let strategy = ActiveStrategy::new(stage, ranked.boosted);

        let mentioned = mentioned_priorities(&parsed.lower, &parsed.numbers, self.matcher.profile());
        let features = detect_features(&parsed.lower, &parsed.criteria, &mentioned);
        let analysis = generate_analysis(&parsed.raw, ranked.properties.len(), strategy, &features);

        info!(
            results = ranked.properties.len(),
            strategy = %strategy,
            semantic_invoked,
            "Search completed"
        );

        SearchResult {
            metadata: SearchMetadata {
                total_found: ranked.properties.len(),
                search_strategy: strategy,
                ai_used: stage.uses_ai(),
                semantic_invoked,
                boost_applied: ranked.boosted,
                exact_matches: exact_count,
                total_properties_analyzed: catalog.len(),
                data_source: None,
                user_query: parsed.raw,
            },
            properties: ranked.properties,
            keywords,
            analysis,
        }
    }

    /// Diagnostic entry point: the criteria and numbers a query yields
    pub fn extract_filters(&self, query: &str) -> (Vec<f64>, Criteria, Vec<String>) {
        let parsed = ParsedQuery::parse(query);
        (parsed.numbers, parsed.criteria, parsed.keywords)
    }
}
