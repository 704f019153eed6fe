use crate::app::ErrorResponse;
use crate::ports::NotificationStore;
use crate::state;
use crate::types::{FlushSummary, PendingBatch};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

/// The periodic flush trigger. Returns aggregate counts for observability.
pub(crate) async fn flush(
    State(state): State<state::AppState>,
) -> Result<Json<FlushSummary>, (StatusCode, Json<ErrorResponse>)> {
    match state.engine.process_due_batches().await {
        Ok(summary) => Ok(Json(summary)),
        Err(err) => {
            eprintln!("flush error: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to load due batches.",
                }),
            ))
        }
    }
}

pub(crate) async fn batches_debug(
    State(state): State<state::AppState>,
) -> Result<Json<Vec<PendingBatch>>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.pending_batches() {
        Ok(batches) => Ok(Json(batches)),
        Err(err) => {
            eprintln!("debug error: failed to list batches ({err})");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to list pending batches.",
                }),
            ))
        }
    }
}
