//! Shared harness: a router over a fresh database file, driven in-process

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use treenode_core::{DatabaseService, LibsqlStore, NodeService};
use treenode_server::{create_router, AppState, ServerConfig};

pub struct TestApp {
    pub router: Router,
    pub store: LibsqlStore,
    _temp_dir: TempDir,
}

impl TestApp {
    pub async fn new(config: ServerConfig) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db = DatabaseService::new(temp_dir.path().join("tree.db"))
            .await
            .unwrap();
        let store = LibsqlStore::new(db);
        let service = NodeService::new(Arc::new(store.clone()), config.service.clone());
        let router = create_router(AppState::new(service, &config), &config);

        Self {
            router,
            store,
            _temp_dir: temp_dir,
        }
    }

    pub async fn with_defaults() -> Self {
        Self::new(ServerConfig::default()).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body.to_string())).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body.to_string())).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    /// Send a request with an optional raw JSON body
    pub async fn send(&self, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(raw) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(raw)
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Run raw SQL against the backing file
    pub async fn execute_sql(&self, sql: &str, params: impl libsql::params::IntoParams) {
        let conn = self.store.database().connect().unwrap();
        conn.execute(sql, params).await.unwrap();
    }
}
