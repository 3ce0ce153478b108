use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Promo Registry API",
        version = "1.0.0",
        description = r#"
# Promo Registry API

Promotional discount code registry: create, update, validate, and apply
percentage and flat-rate discounts.

## Validation semantics

A code is redeemable when it resolves, its status is `active`, its start
date (if any) has passed, its usage cap (if any) is not reached, and its
expiry (if any) is not more than 24 hours in the past.

## Error Handling

The API uses consistent error response formats with appropriate HTTP status
codes:

```json
{
  "error": "Not Found",
  "message": "Discount 42 not found",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        contact(
            name = "StateSet Support",
            email = "support@stateset.io",
            url = "https://stateset.io"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Discounts", description = "Discount registry endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::discounts::list_discounts,
        crate::handlers::discounts::create_discount,
        crate::handlers::discounts::get_discount,
        crate::handlers::discounts::update_discount,
        crate::handlers::discounts::delete_discount,
        crate::handlers::discounts::set_discount_status,
        crate::handlers::discounts::get_discount_by_code,
        crate::handlers::discounts::validate_discount,
        crate::handlers::discounts::redeem_discount,
        crate::handlers::discounts::apply_discount,
        // Health intentionally omitted from OpenAPI paths
    ),
    components(
        schemas(
            crate::models::discount::DiscountRecord,
            crate::models::discount::DiscountType,
            crate::models::discount::DiscountStatus,
            crate::handlers::discounts::CreateDiscountRequest,
            crate::handlers::discounts::SetStatusRequest,
            crate::handlers::discounts::ApplyDiscountRequest,
            crate::handlers::discounts::DiscountResponse,
            crate::handlers::discounts::ValidateResponse,
            crate::handlers::discounts::RedeemResponse,
            crate::handlers::discounts::ApplyResponse,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
