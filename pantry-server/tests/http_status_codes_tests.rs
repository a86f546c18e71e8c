// HTTP Status Code Tests
// Tests that the REST API maps validation, not-found and backend failures


use async_trait::async_trait;
use pantry_server::core::Result;
use pantry_server::{
    CacheBackend, MemoryRecordStore, PantryError, RecipeService, RecordId, RecordStore,
    ServiceConfig,
};
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_helper::{spawn_server, spawn_test_server};

/// Cache whose server is unreachable
struct UnreachableCache;

#[async_trait]
impl CacheBackend for UnreachableCache {
    fn name(&self) -> &'static str {
        "unreachable"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(PantryError::cache("connection refused"))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
        Err(PantryError::cache("connection refused"))
    }

    async fn delete(&self, _keys: &[String]) -> Result<usize> {
        Err(PantryError::cache("connection refused"))
    }

    async fn ping(&self) -> Result<()> {
        Err(PantryError::cache("connection refused"))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

async fn spawn_server_without_cache() -> String {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
    let service = RecipeService::new(store, Arc::new(UnreachableCache), ServiceConfig::default());
    spawn_server(service).await
}

// ==================== SUCCESS ====================

#[tokio::test]
async fn test_create_returns_200() {
    let (base_url, _) = spawn_test_server().await;

    let response = Client::new()
        .post(format!("{}/recipes", base_url))
        .json(&json!({"name": "Tea"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// ==================== VALIDATION (400) ====================

#[tokio::test]
async fn test_create_blank_name_returns_400() {
    let (base_url, _) = spawn_test_server().await;

    let response = Client::new()
        .post(format!("{}/recipes", base_url))
        .json(&json!({"name": "   "}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_create_malformed_json_returns_400() {
    let (base_url, _) = spawn_test_server().await;

    let response = Client::new()
        .post(format!("{}/recipes", base_url))
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_wrong_field_type_returns_400() {
    let (base_url, _) = spawn_test_server().await;

    let response = Client::new()
        .post(format!("{}/recipes", base_url))
        .json(&json!({"name": "Tea", "tags": "drink"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_id_returns_400() {
    let (base_url, _) = spawn_test_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/recipes/not-a-uuid", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .delete(format!("{}/recipes/not-a-uuid", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_update_returns_400() {
    let (base_url, _) = spawn_test_server().await;

    let response = Client::new()
        .put(format!("{}/recipes/{}", base_url, RecordId::new()))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_without_tag_returns_400() {
    let (base_url, _) = spawn_test_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/recipes/search", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .get(format!("{}/recipes/search?tag=", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ==================== NOT FOUND (404) ====================

#[tokio::test]
async fn test_missing_recipe_returns_404() {
    let (base_url, _) = spawn_test_server().await;
    let client = Client::new();
    let url = format!("{}/recipes/{}", base_url, RecordId::new());

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], 404);

    // Still 404 on a second attempt: nothing was cached for it
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .put(&url)
        .json(&json!({"name": "Ghost"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.delete(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ==================== BACKEND FAILURE (500) ====================

#[tokio::test]
async fn test_cache_failure_on_read_returns_500() {
    let base_url = spawn_server_without_cache().await;
    let client = Client::new();

    for path in ["/recipes", "/recipes/search?tag=drink"] {
        let response = client
            .get(format!("{}{}", base_url, path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{path}");
    }

    let response = client
        .get(format!("{}/recipes/{}", base_url, RecordId::new()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], 500);
    assert!(body["error"].as_str().unwrap().contains("cache"));
}

#[tokio::test]
async fn test_write_succeeds_when_invalidation_fails() {
    let base_url = spawn_server_without_cache().await;

    let response = Client::new()
        .post(format!("{}/recipes", base_url))
        .json(&json!({"name": "Tea"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_reports_unreachable_cache() {
    let base_url = spawn_server_without_cache().await;

    let response = Client::new()
        .get(format!("{}/health", base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["store"], "up");
}
