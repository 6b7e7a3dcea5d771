use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use rentis_guard::IdentityKey;
use std::net::SocketAddr;

use crate::error::AppError;
use crate::state::AppState;

pub const FINGERPRINT_HEADER: &str = "x-client-fingerprint";

/// Gate in front of public order creation.
///
/// Ban lookup fails closed: a store error here is a 500, because skipping a
/// ban check is a security decision. The rate-limit counter fails open: a
/// dead redis must not take bookings down with it.
pub async fn abuse_guard_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let fingerprint = req
        .headers()
        .get(FINGERPRINT_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let identity = IdentityKey::new(Some(addr.ip().to_string()), fingerprint);

    let banned = state
        .guard
        .is_banned(identity.ip.as_deref(), identity.fingerprint.as_deref())
        .await
        .map_err(|e| AppError::from(e).into_response())?;
    if banned {
        return Err(AppError::Banned("identity is banned".into()).into_response());
    }

    match state.guard.check_rate(&identity).await {
        Ok(Some(ms_before_next)) => {
            return Err(AppError::RateLimited { ms_before_next }.into_response());
        }
        Ok(None) => {}
        Err(err) => {
            tracing::warn!("rate-limit store unavailable, failing open: {err}");
        }
    }

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
