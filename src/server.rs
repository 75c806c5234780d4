//! Local HTTP API exposing grades as JSON.
//!
//! One route: `GET /grades` returns grades grouped by subject. The
//! handler reuses a stored session when it can, logs in from stored
//! credentials otherwise, and answers 401 when no session can be
//! established so a frontend can prompt for login.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use crate::api::{ApiError, EdupageClient, PortalClient};
use crate::auth::{default_sealer, SealedStore, SessionResolver, SessionStore};
use crate::config::Config;
use crate::models::{group_by_subject, Grade};

pub struct ServerState {
    config: Config,
    client: EdupageClient,
}

#[derive(Serialize)]
struct GradeItem {
    title: String,
    score: Option<f64>,
    max_points: Option<f64>,
    percent: Option<f64>,
}

#[derive(Serialize)]
struct SubjectGrades {
    subject: String,
    items: Vec<GradeItem>,
}

#[derive(Serialize)]
struct GradesPayload {
    subjects: Vec<SubjectGrades>,
}

#[derive(Serialize)]
struct ErrorDetail {
    detail: String,
}

impl From<&Grade> for GradeItem {
    fn from(grade: &Grade) -> Self {
        Self {
            title: grade.title.clone(),
            score: grade.grade_n,
            max_points: grade.max_points,
            percent: grade.percent,
        }
    }
}

fn grades_payload(grades: &[Grade]) -> GradesPayload {
    GradesPayload {
        subjects: group_by_subject(grades)
            .into_iter()
            .map(|(subject, items)| SubjectGrades {
                subject,
                items: items.iter().map(GradeItem::from).collect(),
            })
            .collect(),
    }
}

fn unauthorized(detail: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorDetail {
            detail: detail.to_string(),
        }),
    )
        .into_response()
}

async fn get_grades(State(state): State<Arc<ServerState>>) -> Response {
    // Stores are rebuilt per request so each request observes the
    // current on-disk state.
    let sessions = SessionStore::new(state.config.session_path.clone());
    let creds = SealedStore::new(state.config.creds_path.clone(), default_sealer());
    let resolver = SessionResolver::new(&state.client, &sessions, &creds);

    let handle = match resolver.resolve().await {
        Ok(handle) => handle,
        Err(e) => {
            info!(error = %e, "Request could not be authenticated");
            return unauthorized(
                "No Edupage credentials or saved session found. Please log in again.",
            );
        }
    };

    match state.client.fetch_grades(&handle).await {
        Ok(grades) => Json(grades_payload(&grades)).into_response(),
        Err(ApiError::Unauthorized) => {
            unauthorized("Edupage session expired. Please log in again.")
        }
        Err(e) => {
            warn!(error = %e, "Grade fetch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorDetail {
                    detail: "Failed to fetch grades from Edupage.".to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub fn router(config: Config) -> Router {
    let state = Arc::new(ServerState {
        config,
        client: EdupageClient::new(),
    });
    Router::new().route("/grades", get(get_grades)).with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, config: Config) -> anyhow::Result<()> {
    let app = router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Serving grades API");
    axum::serve(listener, app).await?;
    Ok(())
}
