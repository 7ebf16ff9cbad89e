use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use lessongate_common::{AccessDecision, Target};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::identity::IdentityProvider;
use super::models::ProgressRecord;
use super::service::Services;
use super::writer::RecordProgress;
use crate::config::RoutingSection;
use crate::errors::GateError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub services: Services,
    pub identity: Arc<dyn IdentityProvider>,
    pub routing: RoutingSection,
}

impl AppState {
    fn render(&self, target: &Target) -> String {
        target.to_path(&self.routing.landing_path, &self.routing.location_prefix)
    }
}

pub type SharedState = Arc<AppState>;

// ── Request / response payload types ──────────────────────────────────

/// `learnerId` defaults to the caller; naming another learner goes through
/// the permission policy.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAccessRequest {
    pub module_slug: String,
    pub section_slug: Option<String>,
    pub learner_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckAccessResponse {
    pub can_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordProgressRequest {
    pub module_slug: String,
    pub section_slug: String,
    pub status: String,
    pub completion_percentage: Option<f64>,
    pub payload: Option<serde_json::Value>,
    pub learner_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerQuery {
    pub learner_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NextDestinationResponse {
    pub redirect_to: String,
}

// ── Error handling ────────────────────────────────────────────────────

pub struct ApiError(GateError);

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = match &err {
            GateError::InvalidStatus(_)
            | GateError::InvalidPercentage(_)
            | GateError::InvalidRequest(_)
            | GateError::InvalidCatalog(_) => StatusCode::BAD_REQUEST,
            GateError::ContentNotFound { .. } | GateError::ProfileNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            GateError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GateError::Forbidden { .. } => StatusCode::FORBIDDEN,
            GateError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GateError::CatalogEmpty | GateError::EmptyModule { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = if err.is_internal() {
            error!(kind = err.kind(), error = ?err, "request failed");
            "Internal error, try again later".to_string()
        } else {
            err.to_string()
        };

        (
            status,
            Json(serde_json::json!({"error": err.kind(), "message": message})),
        )
            .into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/access/check", post(check_access))
        .route("/api/progress", get(list_progress).post(record_progress))
        .route("/api/next-destination", get(next_destination))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

/// Always 200. Every failure is a deny with a landing redirect.
async fn check_access(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Result<Json<CheckAccessRequest>, JsonRejection>,
) -> Json<CheckAccessResponse> {
    let landing = || Some(state.render(&Target::Landing));

    let caller = match state.identity.identify(&headers) {
        Ok(caller) => caller,
        Err(_) => {
            return Json(CheckAccessResponse {
                can_access: false,
                redirect_to: landing(),
                error: Some("unauthenticated".to_string()),
            });
        }
    };
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return Json(CheckAccessResponse {
                can_access: false,
                redirect_to: landing(),
                error: Some(format!("invalid_request: {}", rejection.body_text())),
            });
        }
    };

    let learner_id = req.learner_id.as_deref().unwrap_or(&caller);
    let AccessDecision {
        allowed,
        redirect_to,
    } = state
        .services
        .gate
        .check_access(
            &caller,
            learner_id,
            &req.module_slug,
            req.section_slug.as_deref(),
        )
        .await;

    Json(CheckAccessResponse {
        can_access: allowed,
        redirect_to: redirect_to.map(|target| state.render(&target)),
        error: None,
    })
}

async fn record_progress(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Result<Json<RecordProgressRequest>, JsonRejection>,
) -> Result<Json<ProgressRecord>, ApiError> {
    let caller = state.identity.identify(&headers)?;
    let Json(req) = body.map_err(|e| GateError::InvalidRequest(e.body_text()))?;

    let learner_id = req.learner_id.unwrap_or_else(|| caller.clone());
    let record = state
        .services
        .writer
        .record_progress(
            &caller,
            &learner_id,
            RecordProgress {
                module_slug: req.module_slug,
                section_slug: req.section_slug,
                status: req.status,
                completion_percentage: req.completion_percentage,
                payload: req.payload,
            },
        )
        .await?;
    Ok(Json(record))
}

async fn list_progress(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<LearnerQuery>,
) -> Result<Json<Vec<ProgressRecord>>, ApiError> {
    let caller = state.identity.identify(&headers)?;
    let learner_id = query.learner_id.unwrap_or_else(|| caller.clone());
    let records = state
        .services
        .writer
        .list_progress(&caller, &learner_id)
        .await?;
    Ok(Json(records))
}

/// Always 200; an unidentified caller goes to the landing page.
async fn next_destination(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<LearnerQuery>,
) -> Json<NextDestinationResponse> {
    let target = match state.identity.identify(&headers) {
        Ok(caller) => {
            let learner_id = query.learner_id.unwrap_or_else(|| caller.clone());
            state
                .services
                .advisor
                .next_destination(&caller, &learner_id)
                .await
        }
        Err(_) => Target::Landing,
    };
    Json(NextDestinationResponse {
        redirect_to: state.render(&target),
    })
}
