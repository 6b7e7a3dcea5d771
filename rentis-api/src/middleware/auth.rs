use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use rentis_core::permissions::{ActingUser, Role};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Admin session claims. The session collaborator is sloppy about the role
/// field (`1`, `"1"`, `"SUPERADMIN"` all occur in the wild), so it arrives
/// as raw JSON and is normalized exactly once below.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    pub sub: String,
    pub email: String,
    pub role: serde_json::Value,
    pub exp: usize,
}

/// Turns a bearer token into an `ActingUser` fact in request extensions.
/// Everything past this point reasons about `ActingUser`, never raw claims.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let role = Role::parse_value(&token_data.claims.role).map_err(|_| StatusCode::FORBIDDEN)?;

    req.extensions_mut().insert(ActingUser::admin(role));
    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}
