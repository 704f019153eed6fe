use crate::app::{ErrorResponse, StatusResponse};
use crate::ports::NotificationStore;
use crate::state;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterRequest {
    #[serde(rename = "deviceToken")]
    pub(crate) device_token: String,
    #[serde(rename = "favoriteStores", default)]
    pub(crate) favorite_stores: Vec<String>,
}

/// Registration call: replaces the device's favorite stores wholesale.
pub(crate) async fn register(
    State(state): State<state::AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let device_token = request.device_token.trim();
    if device_token.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "deviceToken is required.",
            }),
        ));
    }

    let favorite_stores: Vec<String> = request
        .favorite_stores
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    if let Err(err) = state.store.upsert_subscription(device_token, &favorite_stores) {
        eprintln!("subscription error: failed to register device ({err})");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to store subscription.",
            }),
        ));
    }

    Ok(Json(StatusResponse {
        status: "registered",
    }))
}
