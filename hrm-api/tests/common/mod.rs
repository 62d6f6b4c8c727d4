//! Common test utilities for HTTP tests
//!
//! The router runs over a `MemoryStore`, so no database is needed:
//! - seeded admin and department
//! - users inserted per test, tokens minted directly
//! - `send` drives the router with `oneshot` and decodes the JSON body

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use hrm_api::{
    app::{build_router, AppState},
    config::{ApiConfig, Config, DatabaseConfig, JwtConfig, PaginationConfig, TeamConfig},
};
use hrm_shared::{
    auth::jwt::{create_token, Claims, TokenType},
    models::{department::Department, role::Role, user::User},
    store::{DepartmentStore, MemoryStore, Store, UserStore},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 5001,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
            access_ttl_hours: 24,
        },
        teams: TeamConfig {
            default_max_size: 10,
            write_retries: 3,
        },
        pagination: PaginationConfig {
            default_limit: 10,
            max_limit: 100,
        },
        bootstrap_admin: None,
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub app: Router,
    pub admin: User,
    pub admin_token: String,
    pub department: Department,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone() as Arc<dyn Store>, config);
        let app = build_router(state.clone());

        let admin = store
            .insert_user(User::new("admin@company.com", "", "Ada", "Admin", Role::Admin))
            .await
            .unwrap();
        let admin_token = token_for(&admin);

        let now = Utc::now();
        let department = store
            .insert_department(Department {
                id: Uuid::new_v4(),
                name: "Engineering".to_string(),
                code: "ENG".to_string(),
                description: None,
                head_id: None,
                is_active: true,
                created_by: None,
                updated_by: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        Self {
            store,
            state,
            app,
            admin,
            admin_token,
            department,
        }
    }

    /// Inserts an active user with the given role and returns it with a token
    pub async fn user(&self, role: Role) -> (User, String) {
        let id = Uuid::new_v4();
        let user = self
            .store
            .insert_user(User::new(format!("{id}@company.com"), "", "Test", role.as_str(), role))
            .await
            .unwrap();
        let token = token_for(&user);
        (user, token)
    }

    pub async fn user_by_id(&self, id: Uuid) -> User {
        self.store.user_by_id(id).await.unwrap().unwrap()
    }

    /// Sends a request through the router
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body ({status}): {}", String::from_utf8_lossy(&bytes))
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }
}

pub fn token_for(user: &User) -> String {
    create_token(&Claims::new(user.id, user.role, TokenType::Access), JWT_SECRET).unwrap()
}
