//! Payment-provider webhook endpoint.
//!
//! Receives the raw body (not JSON) so the HMAC signature can be verified
//! before any parsing or state change. An unverifiable event is rejected
//! with 400 and changes nothing.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::warn;

use crate::api::AppState;
use crate::domain::ProviderEvent;
use crate::error::AppError;
use crate::gateway::verify_event_signature;

pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let sig_header = headers
        .get("payment-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing payment-signature header");
            AppError::BadRequest("Missing signature header".to_string())
        })?;

    let now_secs = chrono::Utc::now().timestamp();
    if let Err(reason) = verify_event_signature(
        &body,
        sig_header,
        &state.config.payment_webhook_secret,
        now_secs,
    ) {
        warn!(reason, "Webhook signature verification failed");
        return Err(AppError::BadRequest("Invalid signature".to_string()));
    }

    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Malformed event payload: {}", e)))?;
    let (event_id, event) = ProviderEvent::from_json(&value)
        .map_err(|e| AppError::BadRequest(format!("Malformed event: {}", e)))?;

    state
        .reconciler
        .process(&event_id, &event)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(serde_json::json!({ "received": true })))
}
