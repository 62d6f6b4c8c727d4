/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use hrm_api::{app::{build_router, AppState}, config::Config};
/// use hrm_shared::{db::pool::{create_pool, DatabaseConfig}, store::PgStore};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig::new(config.database.url.clone())).await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use hrm_shared::{
    auth::middleware::{auth_middleware, AuthError},
    services::Services,
    store::Store,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend, used directly only for health and auth lookups
    pub store: Arc<dyn Store>,

    pub services: Arc<Services>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let services = Services::new(store.clone(), config.roster());
        Self {
            store,
            services: Arc::new(services),
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /api
/// ├── GET  /health                         (public)
/// ├── /auth
/// │   ├── POST /login                      (public)
/// │   ├── POST /refresh                    (public)
/// │   └── GET  /profile
/// ├── /teams
/// │   ├── GET/POST   /
/// │   ├── GET        /my-teams | /my-team | /unassigned-employees
/// │   ├── GET/PUT/DELETE /:id
/// │   ├── POST       /:id/members
/// │   └── DELETE     /:id/members/:user_id
/// ├── /holidays
/// │   ├── GET/POST   /
/// │   ├── GET        /upcoming | /stats
/// │   ├── POST       /bulk
/// │   └── GET/PUT/DELETE /:id
/// ├── /departments  GET/POST /, GET/PUT/DELETE /:id
/// └── /users        GET /roles, GET/POST /, GET/PUT/DELETE /:id
/// ```
///
/// Everything except health, login and refresh requires a bearer token.
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication (protected routes only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh));

    let team_routes = Router::new()
        .route("/", get(routes::teams::list_teams).post(routes::teams::create_team))
        .route("/my-teams", get(routes::teams::my_teams))
        .route("/my-team", get(routes::teams::my_team))
        .route("/unassigned-employees", get(routes::teams::unassigned_employees))
        .route(
            "/:id",
            get(routes::teams::get_team)
                .put(routes::teams::update_team)
                .delete(routes::teams::delete_team),
        )
        .route("/:id/members", post(routes::teams::add_member))
        .route("/:id/members/:user_id", delete(routes::teams::remove_member));

    let holiday_routes = Router::new()
        .route(
            "/",
            get(routes::holidays::list_holidays).post(routes::holidays::create_holiday),
        )
        .route("/upcoming", get(routes::holidays::upcoming_holidays))
        .route("/stats", get(routes::holidays::holiday_stats))
        .route("/bulk", post(routes::holidays::bulk_create_holidays))
        .route(
            "/:id",
            get(routes::holidays::get_holiday)
                .put(routes::holidays::update_holiday)
                .delete(routes::holidays::delete_holiday),
        );

    let department_routes = Router::new()
        .route(
            "/",
            get(routes::departments::list_departments)
                .post(routes::departments::create_department),
        )
        .route(
            "/:id",
            get(routes::departments::get_department)
                .put(routes::departments::update_department)
                .delete(routes::departments::delete_department),
        );

    let user_routes = Router::new()
        .route("/roles", get(routes::users::list_roles))
        .route("/", get(routes::users::list_users).post(routes::users::create_user))
        .route(
            "/:id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::deactivate_user),
        );

    let protected_routes = Router::new()
        .route("/auth/profile", get(routes::auth::profile))
        .nest("/teams", team_routes)
        .nest("/holidays", holiday_routes)
        .nest("/departments", department_routes)
        .nest("/users", user_routes)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let api_routes = Router::new().merge(public_routes).merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .nest("/api", api_routes)
        .fallback(route_not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Bearer authentication for the protected routes
///
/// Resolves the token to an active user and injects the
/// `AuthContext` into request extensions.
async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    auth_middleware(state.store.clone(), state.config.jwt.secret.clone(), req, next).await
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
