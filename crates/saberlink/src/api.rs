//! HTTP boundary: sign-in and level selection.
//!
//! ```text
//! POST /signin?name=&auth=&status=connecting   → 200 {"status":"OK","do":"set","expire":"2"}
//! PUT  /selectlevel?mapCode=&name=&auth=       → 200 {"url":"…","cover":"…"}
//! GET  /livez                                  → 200 ok
//! ```
//!
//! Every failure answers `{"status":"KO"}`: 403 for a rejected sign-in or
//! failed authentication, 404 for an unknown map, 502 when the catalog
//! can't be reached.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use saberlink_session::AuthGate;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::catalog::{CatalogError, MapCatalog};
use crate::server::ServerState;

/// The only sign-in status that creates a session.
const STATUS_CONNECTING: &str = "connecting";

/// Client polling hint returned on sign-in. Advisory; nothing enforces it.
const EXPIRE_HINT: &str = "2";

pub(crate) fn router<M: MapCatalog>(state: Arc<ServerState<M>>) -> Router {
    Router::new()
        .route("/signin", post(sign_in::<M>))
        .route("/selectlevel", put(select_level::<M>))
        .route("/livez", get(livez))
        .with_state(state)
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiError {
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Serialize)]
struct Failure {
    status: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Catalog(_) => StatusCode::BAD_GATEWAY,
        };
        tracing::warn!(%status, error = %self, "request rejected");
        (status, Json(Failure { status: "KO" })).into_response()
    }
}

// ============================================================================
// Sign-in
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct SignInParams {
    #[serde(default)]
    name: String,
    #[serde(default)]
    auth: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignInResponse {
    status: &'static str,
    #[serde(rename = "do")]
    action: &'static str,
    expire: &'static str,
}

async fn sign_in<M: MapCatalog>(
    State(state): State<Arc<ServerState<M>>>,
    Query(params): Query<SignInParams>,
) -> Result<Json<SignInResponse>, ApiError> {
    if params.status != STATUS_CONNECTING {
        return Err(ApiError::Forbidden(format!(
            "unsupported sign-in status {:?}",
            params.status
        )));
    }
    if params.name.is_empty() || params.auth.is_empty() {
        return Err(ApiError::Forbidden("name and auth are required".into()));
    }

    state
        .registry
        .lock()
        .await
        .upsert(&params.name, &params.auth, Instant::now());

    Ok(Json(SignInResponse {
        status: "OK",
        action: "set",
        expire: EXPIRE_HINT,
    }))
}

// ============================================================================
// Level selection
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct SelectLevelParams {
    #[serde(default, rename = "mapCode")]
    map_code: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    auth: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SelectLevelResponse {
    url: String,
    cover: String,
}

async fn select_level<M: MapCatalog>(
    State(state): State<Arc<ServerState<M>>>,
    Query(params): Query<SelectLevelParams>,
) -> Result<Json<SelectLevelResponse>, ApiError> {
    // Authenticate first so unauthenticated callers never reach the
    // catalog. The lock is released before the network call.
    state
        .registry
        .lock()
        .await
        .authenticate(&params.name, &params.auth)
        .map_err(|e| ApiError::Forbidden(e.to_string()))?;

    let level = state.catalog.lookup(&params.map_code).await?;

    // The session may have been reaped or replaced during the lookup;
    // `set_chosen_level` re-checks the token.
    state
        .registry
        .lock()
        .await
        .set_chosen_level(&params.name, &params.auth, level.clone())
        .map_err(|e| ApiError::Forbidden(e.to_string()))?;

    Ok(Json(SelectLevelResponse {
        url: level.url,
        cover: level.cover_url,
    }))
}

async fn livez() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
