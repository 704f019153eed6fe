use crate::app::StatusResponse;
use crate::state;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct PriceSubmittedRequest {
    #[serde(rename = "storeName", default)]
    pub(crate) store_name: Option<String>,
}

/// Event ingress for the price-submission path. Fire-and-forget: the
/// submitting client is answered the same way whatever the engine does.
pub(crate) async fn price_submitted(
    State(state): State<state::AppState>,
    Json(request): Json<PriceSubmittedRequest>,
) -> Json<StatusResponse> {
    state.engine.on_price_submitted(request.store_name.as_deref());
    Json(StatusResponse { status: "accepted" })
}
