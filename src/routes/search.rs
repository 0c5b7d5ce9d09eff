use crate::models::{ErrorResponse, ExtractFiltersRequest, PropertiesResponse, SearchRequest};
use crate::services::SearchService;
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
}

/// Configure all search-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/search", web::post().to(search))
        .route("/search/filters", web::post().to(extract_filters))
        .route("/properties", web::get().to(list_properties))
        .route("/properties/{id}", web::get().to(get_property));
}

fn validation_error(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message,
        status_code: 400,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.search.health().await)
}

/// Search endpoint
///
/// POST /api/v1/search
///
/// Request body:
/// ```json
/// {
///   "query": "casa de 3 habitaciones en zona 10",
///   "allowSemantic": true
/// }
/// ```
async fn search(state: web::Data<AppState>, req: web::Json<SearchRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for search request: {:?}", errors);
        return validation_error(errors.to_string());
    }

    let query = req.query.trim();
    if query.is_empty() {
        return validation_error("query: must not be blank".to_string());
    }

    let result = state.search.search(query, req.allow_semantic).await;
    HttpResponse::Ok().json(result)
}

/// Filter extraction endpoint (diagnostics)
///
/// POST /api/v1/search/filters
async fn extract_filters(state: web::Data<AppState>, req: web::Json<ExtractFiltersRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors.to_string());
    }

    HttpResponse::Ok().json(state.search.extract_filters(req.query.trim()))
}

/// Current catalog snapshot
///
/// GET /api/v1/properties
async fn list_properties(state: web::Data<AppState>) -> impl Responder {
    let snapshot = state.search.properties().await;

    HttpResponse::Ok().json(PropertiesResponse {
        total: snapshot.properties.len(),
        data_source: snapshot.source.to_string(),
        properties: snapshot.properties,
    })
}

/// GET /api/v1/properties/{id}
async fn get_property(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    let id = path.into_inner();

    match state.search.property(id).await {
        Some(property) => HttpResponse::Ok().json(property),
        None => HttpResponse::NotFound().json(ErrorResponse {
            error: "Not found".to_string(),
            message: format!("Property {} does not exist", id),
            status_code: 404,
        }),
    }
}
