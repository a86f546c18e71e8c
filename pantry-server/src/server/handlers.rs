use crate::core::{CacheStats, NewRecipe, PantryError, Recipe, RecipePatch, RecordId};
use crate::service::RecipeService;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub recipes: RecipeService,
}

impl AppState {
    pub fn new(recipes: RecipeService) -> Self {
        Self { recipes }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub tag: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub backend: &'static str,
    pub ttl_secs: u64,
    pub hit_rate: f64,
    #[serde(flatten)]
    pub counters: CacheStats,
}

type ApiResult<T> = Result<Json<T>, PantryError>;

fn parse_id(raw: &str) -> Result<RecordId, PantryError> {
    raw.parse()
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, PantryError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| PantryError::Validation(rejection.body_text()))
}

/// Health check endpoint; 503 when either backend fails its ping
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let (store, cache) = state.recipes.check_backends().await;
    let status = if store.is_ok() && cache.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let describe = |result: &Result<(), PantryError>| match result {
        Ok(()) => "up".to_string(),
        Err(e) => e.to_string(),
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "healthy" } else { "degraded" },
            "service": "pantry",
            "version": env!("CARGO_PKG_VERSION"),
            "store": describe(&store),
            "cache": describe(&cache),
        })),
    )
}

/// POST /recipes
pub async fn create_recipe(
    State(state): State<AppState>,
    payload: Result<Json<NewRecipe>, JsonRejection>,
) -> ApiResult<Recipe> {
    let recipe = body(payload)?;
    debug!("REST CREATE name={}", recipe.name);

    let created = state.recipes.create(recipe).await?;
    Ok(Json(created))
}

/// GET /recipes
pub async fn list_recipes(State(state): State<AppState>) -> ApiResult<Vec<Recipe>> {
    debug!("REST LIST");
    Ok(Json(state.recipes.list().await?))
}

/// GET /recipes/{id}
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Recipe> {
    debug!("REST GET id={}", id);
    let id = parse_id(&id)?;
    Ok(Json(state.recipes.get(id).await?))
}

/// PUT /recipes/{id}
pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RecipePatch>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    debug!("REST UPDATE id={}", id);
    let id = parse_id(&id)?;
    let patch = body(payload)?;

    state.recipes.update(id, patch).await?;
    Ok(Json(MessageResponse {
        message: "Recipe has been updated",
    }))
}

/// DELETE /recipes/{id}
pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MessageResponse> {
    debug!("REST DELETE id={}", id);
    let id = parse_id(&id)?;

    state.recipes.delete(id).await?;
    Ok(Json(MessageResponse {
        message: "Recipe has been deleted",
    }))
}

/// GET /recipes/search?tag=...
pub async fn search_recipes(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Vec<Recipe>> {
    let Query(params) =
        params.map_err(|rejection| PantryError::Validation(rejection.body_text()))?;
    let tag = params
        .tag
        .ok_or_else(|| PantryError::Validation("missing tag query parameter".to_string()))?;
    debug!("REST SEARCH tag={}", tag);

    Ok(Json(state.recipes.search(&tag).await?))
}

/// GET /stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let counters = state.recipes.stats();
    Json(StatsResponse {
        backend: state.recipes.cache().name(),
        ttl_secs: state.recipes.config().ttl.as_secs(),
        hit_rate: counters.hit_rate(),
        counters,
    })
}
