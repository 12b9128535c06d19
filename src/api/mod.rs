// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! HTTP read API.
//!
//! Three resource families under `/api/v1`, each with the same shape:
//!
//! ```text
//! GET /api/v1/films/{id}        document or 404
//! GET /api/v1/films/            listing (sort / filter / pagination)
//! GET /api/v1/films/search/     full-text search
//! ```
//!
//! Listings and searches return the stored documents as-is; the film detail
//! endpoint trims to `{id, title, description}`. Empty results are 404s with
//! a `{"detail": "..."}` body, mirroring not-found semantics for single
//! documents.

pub mod auth;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::entity::EntityKind;
use crate::read::ReadService;
use crate::search::{Page, SearchError};

pub use auth::AuthLayer;

fn default_page_size() -> usize {
    10
}

fn default_page_number() -> usize {
    1
}

/// Listing query parameters. `page[size]` / `page[number]` are clamped to at
/// least 1; filtering needs both the field name and the argument.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub filter_name: Option<String>,
    #[serde(default)]
    pub filter_arg: Option<String>,
    #[serde(rename = "page[size]", default = "default_page_size")]
    pub page_size: usize,
    #[serde(rename = "page[number]", default = "default_page_number")]
    pub page_number: usize,
}

impl ListParams {
    fn page(&self) -> Page {
        Page::new(self.page_size, self.page_number)
    }

    fn filter(&self) -> Option<(&str, &str)> {
        match (self.filter_name.as_deref(), self.filter_arg.as_deref()) {
            (Some(name), Some(arg)) => Some((name, arg)),
            _ => None,
        }
    }
}

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(rename = "page[size]", default = "default_page_size")]
    pub page_size: usize,
    #[serde(rename = "page[number]", default = "default_page_number")]
    pub page_number: usize,
}

impl SearchParams {
    fn page(&self) -> Page {
        Page::new(self.page_size, self.page_number)
    }
}

enum ApiError {
    NotFound(&'static str),
    Backend(SearchError),
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        ApiError::Backend(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({"detail": format!("{} not found", what)})),
            )
                .into_response(),
            ApiError::Backend(err) => {
                error!(error = %err, "Search backend failure serving read request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"detail": "search backend unavailable"})),
                )
                    .into_response()
            }
        }
    }
}

fn noun(entity: EntityKind) -> &'static str {
    match entity {
        EntityKind::Films => "film",
        EntityKind::Genres => "genre",
        EntityKind::Persons => "person",
    }
}

async fn detail(
    entity: EntityKind,
    reads: Arc<ReadService>,
    id: String,
) -> Result<Json<Value>, ApiError> {
    let doc = reads
        .get_by_id(entity, &id)
        .await?
        .ok_or(ApiError::NotFound(noun(entity)))?;

    // Film detail is a trimmed projection of the indexed document
    let body = match entity {
        EntityKind::Films => json!({
            "id": doc["id"],
            "title": doc["title"],
            "description": doc["description"],
        }),
        _ => doc,
    };
    Ok(Json(body))
}

async fn list(
    entity: EntityKind,
    reads: Arc<ReadService>,
    params: ListParams,
) -> Result<Json<Vec<Value>>, ApiError> {
    let docs = reads
        .get_collection(entity, params.sort.as_deref(), params.filter(), params.page())
        .await?
        .ok_or(ApiError::NotFound(noun(entity)))?;
    Ok(Json(docs))
}

async fn search(
    entity: EntityKind,
    reads: Arc<ReadService>,
    params: SearchParams,
) -> Result<Json<Vec<Value>>, ApiError> {
    let docs = reads
        .get_search(entity, &params.query, params.page())
        .await?
        .ok_or(ApiError::NotFound(noun(entity)))?;
    Ok(Json(docs))
}

fn entity_routes(entity: EntityKind) -> Router<Arc<ReadService>> {
    Router::new()
        .route(
            "/",
            get(move |State(reads): State<Arc<ReadService>>, Query(params): Query<ListParams>| {
                list(entity, reads, params)
            }),
        )
        .route(
            "/search/",
            get(move |State(reads): State<Arc<ReadService>>, Query(params): Query<SearchParams>| {
                search(entity, reads, params)
            }),
        )
        .route(
            "/:id",
            get(move |State(reads): State<Arc<ReadService>>, Path(id): Path<String>| {
                detail(entity, reads, id)
            }),
        )
}

/// Build the full application router with auth and request tracing.
pub fn router(reads: Arc<ReadService>, auth: Arc<AuthLayer>) -> Router {
    Router::new()
        .nest("/api/v1/films/", entity_routes(EntityKind::Films))
        .nest("/api/v1/genres/", entity_routes(EntityKind::Genres))
        .nest("/api/v1/persons/", entity_routes(EntityKind::Persons))
        .with_state(reads)
        .layer(axum::middleware::from_fn_with_state(auth, auth::require_bearer))
        .layer(TraceLayer::new_for_http())
}
