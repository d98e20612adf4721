use super::ApiError;
use crate::core::CmsError;
use crate::locale::LocaleConfig;
use crate::metadata::CollectionMetadata;
use crate::registry::SchemaRegistry;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// Shared state of the config routes.
#[derive(Clone)]
pub struct ConfigState {
    pub registry: Arc<SchemaRegistry>,
    pub locales: Arc<LocaleConfig>,
}

impl ConfigState {
    pub fn new(registry: Arc<SchemaRegistry>, locales: LocaleConfig) -> Self {
        Self {
            registry,
            locales: Arc::new(locales),
        }
    }
}

#[derive(Serialize)]
struct ConfigResponse {
    collections: Vec<CollectionMetadata>,
}

/// `GET /config`, `GET /config/collections/:slug` and `GET /config/locales`.
pub fn config_router(state: ConfigState) -> Router {
    Router::new()
        .route("/config", get(get_config))
        .route("/config/collections/:slug", get(get_collection))
        .route("/config/locales", get(get_locales))
        .with_state(state)
}

async fn get_config(State(state): State<ConfigState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        collections: state.registry.all().into_iter().cloned().collect(),
    })
}

async fn get_collection(
    State(state): State<ConfigState>,
    Path(slug): Path<String>,
) -> Result<Json<CollectionMetadata>, ApiError> {
    match state.registry.get(&slug) {
        Some(collection) if !collection.internal => Ok(Json(collection.metadata.clone())),
        _ => Err(CmsError::CollectionNotFound(slug).into()),
    }
}

async fn get_locales(State(state): State<ConfigState>) -> Json<LocaleConfig> {
    Json(state.locales.as_ref().clone())
}
