use axum::{
    body::Body,
    extract::{
        rejection::{FormRejection, JsonRejection, QueryRejection},
        FromRequestParts, Path, Query, Request, State,
    },
    http::{header, request::Parts, HeaderValue, Method, StatusCode},
    response::Response,
    routing::{get, post},
    Form, Json, Router,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::assets::AssetStore;
use crate::auth::{Account, SessionClaims, TokenIssuer};
use crate::catalog::{CatalogIndex, CatalogView, OptionsView};
use crate::config::ServerConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::jobs::{InMemoryJobStore, JobStore};
use crate::resolver::{AssetDelivery, JobStatus, SelectionRequest, SelectionResolver};

pub const SERVICE_NAME: &str = "Sequence Server";

#[derive(Clone)]
pub struct AppState {
    pub account: Arc<Account>,
    pub tokens: Arc<TokenIssuer>,
    pub resolver: Arc<SelectionResolver>,
}

impl AppState {
    pub fn new(config: &ServerConfig, index: CatalogIndex, jobs: Arc<dyn JobStore>) -> Self {
        let tokens = TokenIssuer::new(config.secret_key.as_bytes())
            .with_session_ttl(config.session_ttl)
            .with_grant_ttl(config.grant_ttl);
        let resolver = SelectionResolver::new(
            Arc::new(index),
            jobs,
            AssetStore::new(&config.videos_dir),
            tokens.clone(),
        );
        Self {
            account: Arc::new(Account::new(&config.username, &config.password)),
            tokens: Arc::new(tokens),
            resolver: Arc::new(resolver),
        }
    }
}

/// Bearer-authenticated caller.
pub struct CurrentUser(pub SessionClaims);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| {
                let (scheme, token) = value.split_once(' ')?;
                scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
            })
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ServiceError::InvalidCredential("Not authenticated".to_string()))?;

        state.tokens.verify_session(token).map(CurrentUser)
    }
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
    token_type: &'static str,
}

#[derive(Serialize)]
struct SubmitResponse {
    job_id: String,
}

#[derive(Deserialize)]
struct VideoQuery {
    token: Option<String>,
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/login", post(login))
        .route("/options", get(options))
        .route("/catalog", get(catalog))
        .route("/generate", post(generate))
        .route("/status/{job_id}", get(job_status))
        .route("/video/{job_id}", get(video))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring malformed CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let index = config.load_catalog()?;
    info!(
        "📼 Catalog loaded: {} entries over dimensions [{}]",
        index.len(),
        index.schema().dimension_names().join(", ")
    );
    if !config.videos_dir.is_dir() {
        warn!("Video directory {} does not exist; every selection will miss", config.videos_dir.display());
    }

    let state = AppState::new(&config, index, Arc::new(InMemoryJobStore::new()));
    let app = router(state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🚀 {} listening at http://{}", SERVICE_NAME, config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": SERVICE_NAME }))
}

async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> ServiceResult<Json<LoginResponse>> {
    let Form(form) = form.map_err(|e| ServiceError::ValidationFailure(e.body_text()))?;
    state.account.authenticate(&form.username, &form.password)?;
    let access_token = state.tokens.issue_session(&form.username)?;
    Ok(Json(LoginResponse { access_token, token_type: "bearer" }))
}

async fn options(_user: CurrentUser, State(state): State<AppState>) -> Json<OptionsView> {
    Json(state.resolver.index().options())
}

async fn catalog(_user: CurrentUser, State(state): State<AppState>) -> Json<CatalogView> {
    Json(state.resolver.index().view())
}

async fn generate(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    payload: Result<Json<SelectionRequest>, JsonRejection>,
) -> ServiceResult<Json<SubmitResponse>> {
    let Json(request) = payload.map_err(|e| ServiceError::ValidationFailure(e.body_text()))?;
    let job_id = state.resolver.submit(&user.sub, &request).await?;
    Ok(Json(SubmitResponse { job_id: job_id.to_string() }))
}

async fn job_status(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ServiceResult<Json<JobStatus>> {
    Ok(Json(state.resolver.status(&job_id).await?))
}

/// The grant travels in the query string because `<video>` elements cannot
/// send headers.
async fn video(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    query: Result<Query<VideoQuery>, QueryRejection>,
    request: Request,
) -> ServiceResult<Response> {
    let Query(query) = query.map_err(|e| ServiceError::ValidationFailure(e.body_text()))?;
    let token = query
        .token
        .as_deref()
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ServiceError::InvalidCredential("Missing video token".to_string()))?;

    let delivery = state.resolver.retrieve(&job_id, token).await?;
    serve_asset(&delivery, request).await
}

/// Stream a located asset with no-cache headers. The file can still vanish
/// between the resolver's check and the open.
async fn serve_asset(delivery: &AssetDelivery, request: Request) -> ServiceResult<Response> {
    let served = ServeFile::new(&delivery.path)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});
    if served.status() == StatusCode::NOT_FOUND {
        warn!("Asset {} vanished before it could be served", delivery.asset);
        return Err(ServiceError::NotFound("File missing on server".to_string()));
    }
    let mut response = served.map(Body::new);

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store, must-revalidate"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    if let Ok(disposition) = HeaderValue::from_str(&format!("inline; filename=\"{}\"", delivery.asset)) {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok(response)
}
