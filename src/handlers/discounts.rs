use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    errors::ApiError,
    models::discount::{DiscountId, DiscountRecord, DiscountStatus, DiscountType},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Creates the router for discount endpoints
pub fn discounts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_discounts))
        .route("/", post(create_discount))
        .route("/:id", get(get_discount))
        .route("/:id", put(update_discount))
        .route("/:id", delete(delete_discount))
        .route("/:id/status", post(set_discount_status))
        .route("/code/:code", get(get_discount_by_code))
        .route("/code/:code/validate", get(validate_discount))
        .route("/code/:code/redeem", post(redeem_discount))
        .route("/apply", post(apply_discount))
}

/// List the full discount registry
#[utoipa::path(
    get,
    path = "/api/v1/discounts",
    summary = "List discounts",
    description = "Get every discount in the registry, in ascending id order",
    responses(
        (status = 200, description = "Discounts retrieved successfully", body = [DiscountResponse]),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Discounts"
)]
pub async fn list_discounts(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let registry = state
        .discounts
        .get_all()
        .await
        .map_err(map_service_error)?;

    let discounts: Vec<DiscountResponse> = registry
        .into_iter()
        .map(|(id, record)| DiscountResponse { id, record })
        .collect();

    Ok(success_response(discounts))
}

/// Create a new discount
#[utoipa::path(
    post,
    path = "/api/v1/discounts",
    summary = "Create discount",
    description = "Create a new discount code",
    request_body = CreateDiscountRequest,
    responses(
        (status = 201, description = "Discount created successfully", body = DiscountResponse),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Discounts"
)]
pub async fn create_discount(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDiscountRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let mut record = DiscountRecord::new(payload.code, payload.discount_type, payload.amount);
    if let Some(status) = payload.status {
        record.status = DiscountStatus::new(status);
    }
    record.max_uses = payload.max_uses;
    record.starts_at = payload.starts_at;
    record.expires_at = payload.expires_at;

    let id = state
        .discounts
        .store(record, None)
        .await
        .map_err(map_service_error)?;

    let record = state
        .discounts
        .get(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::InternalServerError)?;

    Ok(created_response(DiscountResponse { id, record }))
}

/// Get a discount by id
#[utoipa::path(
    get,
    path = "/api/v1/discounts/{id}",
    summary = "Get discount",
    params(("id" = u64, Path, description = "Discount id")),
    responses(
        (status = 200, description = "Discount retrieved successfully", body = DiscountResponse),
        (status = 404, description = "Discount not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Discounts"
)]
pub async fn get_discount(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DiscountId>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let record = state
        .discounts
        .get(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Discount {} not found", id)))?;

    Ok(success_response(DiscountResponse { id, record }))
}

/// Update a discount definition in place
#[utoipa::path(
    put,
    path = "/api/v1/discounts/{id}",
    summary = "Update discount",
    description = "Replace the definition of an existing discount. Usage count and creation time are preserved.",
    params(("id" = u64, Path, description = "Discount id")),
    request_body = CreateDiscountRequest,
    responses(
        (status = 200, description = "Discount updated successfully", body = DiscountResponse),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Discount not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Discounts"
)]
pub async fn update_discount(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DiscountId>,
    Json(payload): Json<CreateDiscountRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let existing = state
        .discounts
        .get(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Discount {} not found", id)))?;

    let mut record = DiscountRecord::new(payload.code, payload.discount_type, payload.amount);
    record.status = payload
        .status
        .map(DiscountStatus::new)
        .unwrap_or(existing.status);
    record.max_uses = payload.max_uses;
    record.starts_at = payload.starts_at;
    record.expires_at = payload.expires_at;
    // Redemption history and provenance survive definition edits
    record.uses = existing.uses;
    record.created_at = existing.created_at;

    state
        .discounts
        .store(record, Some(id))
        .await
        .map_err(map_service_error)?;

    let record = state
        .discounts
        .get(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::InternalServerError)?;

    Ok(success_response(DiscountResponse { id, record }))
}

/// Delete a discount
#[utoipa::path(
    delete,
    path = "/api/v1/discounts/{id}",
    summary = "Delete discount",
    description = "Remove a discount from the registry. Deleting an absent id is a no-op.",
    params(("id" = u64, Path, description = "Discount id")),
    responses(
        (status = 204, description = "Discount deleted"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Discounts"
)]
pub async fn delete_discount(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DiscountId>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .discounts
        .remove(id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Set the status of a discount
#[utoipa::path(
    post,
    path = "/api/v1/discounts/{id}/status",
    summary = "Set discount status",
    description = "Set the status field. Any string is accepted; only the exact value 'active' counts as active.",
    params(("id" = u64, Path, description = "Discount id")),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = DiscountResponse),
        (status = 404, description = "Discount not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Discounts"
)]
pub async fn set_discount_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DiscountId>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let updated = state
        .discounts
        .set_status(id, DiscountStatus::new(payload.status))
        .await
        .map_err(map_service_error)?;

    if !updated {
        return Err(ApiError::NotFound(format!("Discount {} not found", id)));
    }

    let record = state
        .discounts
        .get(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::InternalServerError)?;

    Ok(success_response(DiscountResponse { id, record }))
}

/// Look up a discount by code
#[utoipa::path(
    get,
    path = "/api/v1/discounts/code/{code}",
    summary = "Get discount by code",
    description = "First discount (ascending id) whose code matches",
    params(("code" = String, Path, description = "Discount code")),
    responses(
        (status = 200, description = "Discount retrieved successfully", body = DiscountResponse),
        (status = 404, description = "Unknown code", body = crate::errors::ErrorResponse),
    ),
    tag = "Discounts"
)]
pub async fn get_discount_by_code(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (id, record) = state
        .discounts
        .get_by_code(&code)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Discount code '{}' not found", code)))?;

    Ok(success_response(DiscountResponse { id, record }))
}

/// Check whether a code is currently redeemable
#[utoipa::path(
    get,
    path = "/api/v1/discounts/code/{code}/validate",
    summary = "Validate discount code",
    description = "True iff the code resolves, is active, has started, and is not maxed out. Unknown codes are invalid, not errors.",
    params(("code" = String, Path, description = "Discount code")),
    responses(
        (status = 200, description = "Validation result", body = ValidateResponse),
    ),
    tag = "Discounts"
)]
pub async fn validate_discount(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let valid = state
        .discounts
        .is_valid(&code)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ValidateResponse { code, valid }))
}

/// Record one redemption of a code
#[utoipa::path(
    post,
    path = "/api/v1/discounts/code/{code}/redeem",
    summary = "Redeem discount code",
    description = "Increment the usage count and return the new total",
    params(("code" = String, Path, description = "Discount code")),
    responses(
        (status = 200, description = "Redemption recorded", body = RedeemResponse),
        (status = 404, description = "Unknown code", body = crate::errors::ErrorResponse),
    ),
    tag = "Discounts"
)]
pub async fn redeem_discount(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let uses = state
        .discounts
        .increment_usage(&code)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Discount code '{}' not found", code)))?;

    Ok(success_response(RedeemResponse { code, uses }))
}

/// Apply a discount to a base price
#[utoipa::path(
    post,
    path = "/api/v1/discounts/apply",
    summary = "Apply discount",
    description = "Price after the discount. Flat discounts subtract; percentage discounts scale. The result is not clamped at zero.",
    request_body = ApplyDiscountRequest,
    responses(
        (status = 200, description = "Discounted price", body = ApplyResponse),
        (status = 404, description = "Unknown code", body = crate::errors::ErrorResponse),
    ),
    tag = "Discounts"
)]
pub async fn apply_discount(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ApplyDiscountRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    // Unknown codes are a pass-through at the service level; surface them as
    // 404 here so callers can tell "no discount" from "discounted to the
    // same price".
    state
        .discounts
        .get_by_code(&payload.code)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Discount code '{}' not found", payload.code))
        })?;

    let final_price = state
        .discounts
        .apply_discount(&payload.code, payload.base_price)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApplyResponse {
        code: payload.code,
        base_price: payload.base_price,
        final_price,
    }))
}

// Request DTOs

fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() {
        return Err(ValidationError::new("amount_negative"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDiscountRequest {
    #[validate(length(min = 1))]
    pub code: String,

    pub discount_type: DiscountType,

    #[validate(custom = "validate_amount")]
    pub amount: Decimal,

    /// Defaults to "active"
    pub status: Option<String>,

    pub max_uses: Option<u32>,

    pub starts_at: Option<DateTime<Utc>>,

    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyDiscountRequest {
    pub code: String,
    pub base_price: Decimal,
}

// Response DTOs

#[derive(Debug, Serialize, ToSchema)]
pub struct DiscountResponse {
    pub id: DiscountId,
    #[serde(flatten)]
    pub record: DiscountRecord,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateResponse {
    pub code: String,
    pub valid: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RedeemResponse {
    pub code: String,
    pub uses: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApplyResponse {
    pub code: String,
    pub base_price: Decimal,
    pub final_price: Decimal,
}
