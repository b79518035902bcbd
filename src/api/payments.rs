use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::checkout::{BusinessDetails, CreateIntentRequest};
use crate::domain::{Address, CartId, Country, OrderId, TaxBreakdown};
use crate::error::AppError;
use crate::gateway::ShippingMethod;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentBody {
    pub cart_id: String,
    pub email: Option<String>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub shipping_method: Option<ShippingMethod>,
    pub business: Option<BusinessBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessBody {
    pub country: String,
    pub tax_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponseBody {
    pub client_secret: String,
    pub order_id: String,
    pub tax_breakdown: TaxBreakdown,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelIntentBody {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct CancelIntentResponseBody {
    pub success: bool,
}

/// Enforce the configured checkout policy: when guest checkout is disabled
/// an authenticated caller (upstream-verified `x-user-id`) is required.
fn enforce_auth(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    if state.config.allow_guest_checkout {
        return Ok(());
    }
    if headers.get("x-user-id").and_then(|v| v.to_str().ok()).is_some() {
        return Ok(());
    }
    Err(AppError::Unauthorized(
        "authentication required for checkout".to_string(),
    ))
}

pub async fn create_intent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateIntentBody>,
) -> Result<Json<CreateIntentResponseBody>, AppError> {
    enforce_auth(&state, &headers)?;

    let cart_id = CartId::parse(&body.cart_id)
        .map_err(|_| AppError::BadRequest("Invalid cartId".to_string()))?;

    let request = CreateIntentRequest {
        cart_id,
        email: body.email,
        shipping_address: body.shipping_address,
        billing_address: body.billing_address,
        shipping_method: body.shipping_method,
        business: body.business.map(|b| BusinessDetails {
            country: Country::new(&b.country),
            tax_id: b.tax_id,
        }),
    };

    let response = state.checkout.create_payment_intent(request).await?;

    Ok(Json(CreateIntentResponseBody {
        client_secret: response.client_secret,
        order_id: response.order_id.to_string(),
        tax_breakdown: response.tax,
    }))
}

pub async fn cancel_intent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CancelIntentBody>,
) -> Result<Json<CancelIntentResponseBody>, AppError> {
    enforce_auth(&state, &headers)?;

    let order_id = OrderId::parse(&body.order_id)
        .map_err(|_| AppError::BadRequest("Invalid orderId".to_string()))?;

    state.checkout.cancel_payment_intent(&order_id).await?;

    Ok(Json(CancelIntentResponseBody { success: true }))
}
