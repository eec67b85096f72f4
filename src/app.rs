// app.rs - Router assembly and shared handler state
//
// Route tiers follow the handler layout:
// public (no auth) → protected (bearer token + fresh user) → verified (email confirmed) → elevated (administrator)

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, Uri},
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, Environment};
use crate::database::Store;
use crate::error::ApiError;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{
    jwt_auth_middleware, require_admin, require_verified_email, validate_user_middleware, ApiResponse, ApiResult,
};
use crate::services::{FileStorage, Mailer};

/// Everything a handler needs, shared behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub files: Arc<dyn FileStorage>,
    pub config: Arc<AppConfig>,
}

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::{auth, projects};

    Router::new()
        .route("/api/auth/register", post(auth::register_post))
        .route("/api/auth/verify-email/:token", get(auth::verify_email_get))
        .route("/api/auth/resend-verification", post(auth::resend_verification_post))
        .route("/api/auth/login", post(auth::login_post))
        .route("/api/auth/forgot-password", post(auth::forgot_password_post))
        .route("/api/auth/reset-password/:token", post(auth::reset_password_post))
        .route("/api/projects/public", get(projects::public_projects_get))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{forums, user};

    Router::new()
        .route("/api/user/profile", get(user::profile_get).put(user::profile_put))
        .route("/api/user/dashboard", get(user::dashboard_get))
        .route("/api/user/check-status", get(user::check_status_get))
        .route(
            "/api/forums/project/:project_id",
            post(forums::forum_post).get(forums::forums_get),
        )
        .route(
            "/api/forums/:forum_id/discussions",
            post(forums::discussion_post).get(forums::discussions_get),
        )
        .route("/api/forums/discussions/:id", get(forums::discussion_get))
        .route("/api/forums/discussions/:id/close", patch(forums::discussion_close))
        .route("/api/forums/discussions/:id/pin", patch(forums::discussion_pin))
        .route(
            "/api/forums/discussions/:id/attachments/:file_name",
            get(forums::discussion_attachment_get),
        )
        .route(
            "/api/forums/discussions/:id/replies",
            post(forums::reply_post).get(forums::replies_get),
        )
        .route(
            "/api/forums/replies/:id",
            put(forums::reply_put).delete(forums::reply_delete),
        )
        .route("/api/forums/replies/:id/attachments/:file_name", get(forums::reply_attachment_get))
        .merge(verified_routes())
        .merge(elevated_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), validate_user_middleware))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn verified_routes() -> Router<AppState> {
    use protected::{documents, projects};

    Router::new()
        .route("/api/projects", post(projects::project_post).get(projects::projects_get))
        .route("/api/projects/:id", get(projects::project_get).put(projects::project_put))
        .route("/api/projects/:id/members", post(projects::member_post))
        .route("/api/projects/:id/join", post(projects::join_post))
        .route("/api/documents/upload/:project_id", post(documents::upload_post))
        .route("/api/documents/project/:project_id", get(documents::documents_get))
        .route("/api/documents/project/:project_id/deleted", get(documents::deleted_documents_get))
        .route(
            "/api/documents/:id",
            get(documents::document_get)
                .put(documents::document_put)
                .delete(documents::document_delete),
        )
        .route("/api/documents/:id/download", get(documents::download_get))
        .route("/api/documents/:id/permissions", put(documents::permissions_put))
        .route("/api/documents/:id/restore", patch(documents::restore_patch))
        .route_layer(middleware::from_fn(require_verified_email))
}

fn elevated_routes() -> Router<AppState> {
    use elevated::admin;

    Router::new()
        .route("/api/admin/users", get(admin::users_get))
        .route("/api/admin/stats", get(admin::stats_get))
        .route_layer(middleware::from_fn(require_admin))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
}

async fn root() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": "Research Hub API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/api/auth",
            "user": "/api/user",
            "projects": "/api/projects",
            "documents": "/api/documents",
            "forums": "/api/forums",
            "admin": "/api/admin",
            "health": "/api/health"
        }
    }))
}

async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    state.store.ping().await.map_err(|e| {
        tracing::error!("Health check failed: {}", e);
        ApiError::service_unavailable("Database unavailable")
    })?;

    Ok(ApiResponse::success(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
    })))
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {} {} not found", method, uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::database::MemoryStore;
    use crate::services::{LocalFileStorage, LogMailer};

    async fn test_app(dir: &tempfile::TempDir) -> Router {
        let files = LocalFileStorage::new(dir.path().join("uploads")).await.unwrap();
        app(AppState {
            store: Arc::new(MemoryStore::new()),
            mailer: Arc::new(LogMailer),
            files: Arc::new(files),
            config: Arc::new(AppConfig::development()),
        })
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn root_and_health_respond() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_app(&dir).await;

        let (status, body) = send(router.clone(), Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["endpoints"]["forums"], "/api/forums");

        let (status, body) = send(router, Request::get("/api/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "healthy");
    }

    #[tokio::test]
    async fn unknown_routes_get_json_404() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            test_app(&dir).await,
            Request::get("/api/nowhere").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Route GET /api/nowhere not found");
    }

    #[tokio::test]
    async fn protected_routes_need_a_bearer_token() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            test_app(&dir).await,
            Request::get("/api/projects").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Access denied. No token provided.");
    }
}
