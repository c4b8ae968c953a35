//! `POST /v1/track`: browser-side collaborators report occurrences here.
//!
//! Tracking is best-effort, so every well-formed request is answered with
//! `202 Accepted` and the session id the client should keep using.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::app_state::AppState;
use crate::authz::{AccessContext, DataAccessError, Operation};

use super::event::Properties;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackRequest {
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    pub event: TrackEvent,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackEvent {
    PageView {
        page: String,
        #[serde(default)]
        properties: Properties,
    },
    Feature {
        feature: String,
        #[serde(default)]
        properties: Properties,
    },
    Error {
        error: String,
        #[serde(default)]
        message: String,
        #[serde(default)]
        properties: Properties,
    },
    Dau,
    Event {
        name: String,
        #[serde(default)]
        properties: Properties,
    },
    DataAccessError {
        table: String,
        operation: Operation,
        #[serde(default)]
        role: Option<String>,
        error: DataAccessError,
    },
}

/// Client-reported error text; only ever logged.
#[derive(Debug, Error)]
#[error("{0}")]
struct ReportedError(String);

pub async fn track(State(app): State<AppState>, Json(req): Json<TrackRequest>) -> Response {
    let tracker = app.sessions().get_or_init(req.session.as_deref(), req.user.as_deref());

    match req.event {
        TrackEvent::PageView { page, properties } => tracker.track_page_view(&page, Some(&properties)),
        TrackEvent::Feature { feature, properties } => {
            tracker.track_feature_use(&feature, Some(&properties))
        }
        TrackEvent::Error { error, message, properties } => {
            tracker.track_error(&error, &ReportedError(message), Some(&properties))
        }
        TrackEvent::Dau => tracker.track_dau(),
        TrackEvent::Event { name, properties } => tracker.track_event(&name, Some(&properties)),
        TrackEvent::DataAccessError { table, operation, role, error } => {
            let ctx = AccessContext { table, operation, user_id: tracker.user_id(), role };
            app.authz().record_violation(&error, &ctx);
        }
    }

    let session = tracker.session_id().unwrap_or_default();
    (StatusCode::ACCEPTED, Json(json!({ "session": session }))).into_response()
}
