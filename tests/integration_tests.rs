// Integration tests for Inmo Search

use actix_web::{http::header::ContentType, http::StatusCode, test, web, App};
use async_trait::async_trait;
use chrono::NaiveDate;
use inmo_search::core::{Matcher, Orchestrator, SemanticOracle, SemanticSearcher, NO_DATA_ANALYSIS};
use inmo_search::models::{PropertyRecord, SearchStrategy};
use inmo_search::routes::{configure_routes, handle_json_payload_error, handle_path_error, AppState};
use inmo_search::services::{parse_catalog, FallbackCatalog, JsonCatalog, SearchService};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct FixedOracle {
    reply: String,
    calls: AtomicUsize,
}

impl FixedOracle {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SemanticOracle for FixedOracle {
    async fn ask(&self, _prompt: &str, _system_prompt: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/properties.json")
}

fn sample_catalog() -> Vec<PropertyRecord> {
    parse_catalog(include_str!("../data/properties.json")).unwrap()
}

fn orchestrator_with(oracle: Arc<FixedOracle>) -> Orchestrator {
    let searcher = SemanticSearcher::new(oracle).with_limits(50, 2000, Duration::ZERO);
    Orchestrator::new(Matcher::default()).with_semantic(searcher)
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 31).unwrap()
}

fn ids(properties: &[PropertyRecord]) -> Vec<i64> {
    properties.iter().map(|p| p.id).collect()
}

#[tokio::test]
async fn test_integration_exact_filters() {
    let oracle = FixedOracle::new("");
    let result = orchestrator_with(oracle)
        .search_on(
            &sample_catalog(),
            "casa de 3 habitaciones en zona 10, menos de 300 mil",
            true,
            today(),
        )
        .await;

    assert_eq!(ids(&result.properties), vec![2]);
    assert_eq!(result.metadata.search_strategy.name(), "exact_filters");
    assert_eq!(result.metadata.exact_matches, 1);
    assert_eq!(result.metadata.total_properties_analyzed, 12);
    assert!(result.analysis.starts_with("Se encontró 1 propiedad "));
    assert!(!result.analysis.contains(". mediante"));
}

#[tokio::test]
async fn test_integration_semantic_blend() {
    let oracle = FixedOracle::new(r#"{"property_ids": [5]}"#);
    let result = orchestrator_with(oracle.clone())
        .search_on(&sample_catalog(), "casa en antigua", true, today())
        .await;

    assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.metadata.search_strategy.stage, SearchStrategy::ExactPlusSemantic);
    assert!(result.metadata.ai_used);
    assert_eq!(ids(&result.properties), vec![12, 5]);
}

#[tokio::test]
async fn test_integration_semantic_replaces() {
    let oracle = FixedOracle::new(r#"Resultado: {"property_ids": [1, 5, 12]}"#);
    let result = orchestrator_with(oracle)
        .search_on(&sample_catalog(), "casa en antigua", true, today())
        .await;

    assert_eq!(result.metadata.search_strategy.stage, SearchStrategy::AiSemantic);
    let mut found = ids(&result.properties);
    found.sort();
    assert_eq!(found, vec![1, 5, 12]);
}

#[tokio::test]
async fn test_integration_failing_oracle_keeps_exact() {
    let oracle = FixedOracle::new("");
    let result = orchestrator_with(oracle.clone())
        .search_on(&sample_catalog(), "casa en antigua", true, today())
        .await;

    assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    assert_eq!(ids(&result.properties), vec![12]);
    assert_eq!(result.metadata.search_strategy.name(), "exact_filters");
}

#[tokio::test]
async fn test_integration_chunks_large_catalog() {
    let base = sample_catalog();
    let catalog: Vec<PropertyRecord> = (0..120)
        .map(|i| {
            let mut p = base[i % base.len()].clone();
            p.id = i as i64 + 1;
            p
        })
        .collect();

    let oracle = FixedOracle::new(r#"{"property_ids": [1, 2, 3, 4]}"#);
    orchestrator_with(oracle.clone())
        .search_on(&catalog, "algo acogedor", true, today())
        .await;

    assert_eq!(oracle.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_integration_empty_catalog() {
    let oracle = FixedOracle::new(r#"{"property_ids": [1]}"#);
    let result = orchestrator_with(oracle.clone())
        .search_on(&[], "casa en zona 10", true, today())
        .await;

    assert!(result.properties.is_empty());
    assert_eq!(result.analysis, NO_DATA_ANALYSIS);
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_integration_results_are_capped() {
    let base = sample_catalog();
    let catalog: Vec<PropertyRecord> = (0..40)
        .map(|i| {
            let mut p = base[0].clone();
            p.id = i + 1;
            p
        })
        .collect();

    let result = Orchestrator::new(Matcher::default())
        .search_on(&catalog, "casa", true, today())
        .await;

    assert_eq!(result.properties.len(), 10);
    assert_eq!(result.metadata.exact_matches, 40);
    assert!(result.analysis.contains("refinar"));
}

fn test_state() -> AppState {
    let catalog = FallbackCatalog::new().with_fallback(Arc::new(JsonCatalog::new(sample_path())));
    AppState {
        search: Arc::new(SearchService::new(catalog, Orchestrator::new(Matcher::default()))),
    }
}

macro_rules! test_app {
    () => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
                .app_data(web::PathConfig::default().error_handler(handle_path_error))
                .configure(configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_route_health() {
    let app = test_app!();
    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["catalog_source"], "json");
    assert!(body.get("reply_cache").is_none());
}

#[actix_web::test]
async fn test_route_search() {
    let app = test_app!();
    let req = test::TestRequest::post()
        .uri("/api/v1/search")
        .set_json(json!({
            "query": "casa de 3 habitaciones en zona 10, menos de 300 mil",
            "allowSemantic": false
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["properties"][0]["id"], 2);
    assert_eq!(body["properties"][0]["titulo"], "Casa familiar en zona 10");
    assert!(body["properties"][0].get("_match_score").is_none());
    assert_eq!(body["metadata"]["search_strategy"], "exact_filters");
    assert_eq!(body["metadata"]["data_source"], "json");
    assert_eq!(
        body["metadata"]["user_query"],
        "casa de 3 habitaciones en zona 10, menos de 300 mil"
    );
    assert!(body["keywords"].as_array().unwrap().len() <= 5);
}

#[actix_web::test]
async fn test_route_search_validation() {
    let app = test_app!();

    for query in ["", "   "] {
        let req = test::TestRequest::post()
            .uri("/api/v1/search")
            .set_json(json!({ "query": query }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "query {:?}", query);
    }
}

#[actix_web::test]
async fn test_route_malformed_json() {
    let app = test_app!();
    let req = test::TestRequest::post()
        .uri("/api/v1/search")
        .insert_header(ContentType::json())
        .set_payload("{\"query\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_json");
    assert_eq!(body["status_code"], 400);
}

#[actix_web::test]
async fn test_route_extract_filters() {
    let app = test_app!();
    let req = test::TestRequest::post()
        .uri("/api/v1/search/filters")
        .set_json(json!({ "query": "casa entre 200 y 400 mil" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["filters"]["type"], "casa");
    assert_eq!(body["filters"]["price_range"]["min"], 200_000.0);
    assert_eq!(body["filters"]["price_range"]["max"], 400_000.0);
    assert_eq!(body["numbers"], json!([200.0, 400.0]));
}

#[actix_web::test]
async fn test_route_properties() {
    let app = test_app!();

    let req = test::TestRequest::get().uri("/api/v1/properties").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 12);
    assert_eq!(body["data_source"], "json");

    let req = test::TestRequest::get().uri("/api/v1/properties/3").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["tipo"], "departamento");

    let req = test::TestRequest::get().uri("/api/v1/properties/999").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/api/v1/properties/abc").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
