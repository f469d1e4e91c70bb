use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use parkly_types::api::Claims;
use parkly_types::{Actor, Capability};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

/// Extract and validate JWT from Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing credentials".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected a bearer token".to_string()))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// Resolves the caller and checks that their role grants `capability`.
pub fn require_capability(claims: &Claims, capability: Capability) -> ApiResult<Actor> {
    let actor = Actor::from(claims);
    if !actor.can(capability) {
        return Err(ApiError::Forbidden(format!(
            "Role '{}' may not perform this action",
            actor.role
        )));
    }
    Ok(actor)
}
