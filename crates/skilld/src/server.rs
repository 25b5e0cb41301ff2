//! HTTP API for skilld.
//!
//! `POST /api/v1/skills/fetch-github` resolves a repository reference;
//! `GET /health` reports liveness.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use skill_core::{CollectionStats, FrontmatterMap, ResolveError, SkillListing};
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::github::RepoHost;
use crate::resolver::{Resolution, ResolveRequest, Resolver};

/// Shared state for HTTP handlers.
#[derive(Debug)]
pub struct AppState<H> {
    pub resolver: Arc<Resolver<H>>,
}

/// Create the HTTP router with all endpoints.
pub fn create_router<H: RepoHost + 'static>(state: Arc<AppState<H>>) -> Router {
    Router::new()
        .route("/api/v1/skills/fetch-github", post(fetch_github::<H>))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn start_server<H, F>(
    resolver: Resolver<H>,
    addr: SocketAddr,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    H: RepoHost + 'static,
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let state = Arc::new(AppState {
        resolver: Arc::new(resolver),
    });
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

// --- Request/Response types ---

/// Request payload for POST /api/v1/skills/fetch-github.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub skill_path: Option<String>,
    #[serde(default)]
    pub validate_only: bool,
}

impl From<FetchRequest> for ResolveRequest {
    fn from(req: FetchRequest) -> Self {
        Self {
            reference: req.github_url.unwrap_or_default(),
            skill_path: req.skill_path,
            validate_only: req.validate_only,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error body for a manifest that lacks required fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailedResponse {
    pub error: String,
    pub validated: bool,
    pub meta: FrontmatterMap,
    pub missing_fields: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub multiple_skills: bool,
    pub skills: Vec<SkillListing>,
    pub github_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleResponse {
    pub success: bool,
    pub content: String,
    pub github_url: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub digest: String,
    pub files: CollectionStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedResponse {
    pub success: bool,
    pub validated: bool,
    pub github_url: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub message: String,
    pub meta: FrontmatterMap,
}

/// A resolution failure rendered as a JSON error response.
#[derive(Debug)]
pub struct ApiError(pub ResolveError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let error = self.0.to_string();
        match self.0 {
            ResolveError::MissingRequiredFields { missing, meta } => (
                status,
                Json(ValidationFailedResponse {
                    error,
                    validated: false,
                    meta,
                    missing_fields: missing,
                }),
            )
                .into_response(),
            _ => (status, Json(ErrorResponse { error })).into_response(),
        }
    }
}

fn render(resolution: Resolution) -> Response {
    match resolution {
        Resolution::Listing { identity, skills } => Json(ListingResponse {
            multiple_skills: true,
            skills,
            github_url: identity.html_url(),
        })
        .into_response(),
        Resolution::Bundle(bundle) => {
            let (content, digest) = bundle.render();
            Json(BundleResponse {
                success: true,
                content,
                github_url: bundle.identity.html_url(),
                owner: bundle.identity.owner,
                repo: bundle.identity.repo,
                branch: bundle.branch,
                digest,
                files: bundle.stats,
            })
            .into_response()
        }
        Resolution::Validated(v) => Json(ValidatedResponse {
            success: true,
            validated: true,
            github_url: v.identity.html_url(),
            owner: v.identity.owner,
            repo: v.identity.repo,
            branch: v.branch,
            message: "Repository follows the add-skill standard".to_string(),
            meta: v.meta,
        })
        .into_response(),
    }
}

// --- Handlers ---

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /api/v1/skills/fetch-github - Resolve a repository reference.
async fn fetch_github<H: RepoHost + 'static>(
    State(state): State<Arc<AppState<H>>>,
    payload: Result<Json<FetchRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload.map_err(|e| {
        info!(status = %e.status(), "rejected request body");
        ApiError(ResolveError::InvalidBody(e.body_text()))
    })?;
    let request = ResolveRequest::from(req);
    let span = info_span!(
        "resolve",
        request_id = %Uuid::now_v7(),
        reference = %request.reference,
        skill_path = request.skill_path.as_deref().unwrap_or(""),
        validate_only = request.validate_only,
    );

    let resolver = Arc::clone(&state.resolver);
    let task = tokio::spawn(
        async move {
            let result = resolver.resolve(&request).await;
            if let Err(e) = &result {
                info!(status = e.status_code(), error = %e, "resolution failed");
            }
            result
        }
        .instrument(span),
    );

    match task.await {
        Ok(Ok(resolution)) => Ok(render(resolution)),
        Ok(Err(e)) => Err(ApiError(e)),
        Err(e) => {
            error!("resolution task failed: {}", e);
            Err(ApiError(ResolveError::Unexpected(e.to_string())))
        }
    }
}
