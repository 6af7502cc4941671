use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::errors::AppError;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

const COMPARE_CONTEXT: &[u8] = b"moondoom-shared-secret";

#[derive(Debug, Default, Deserialize)]
pub struct SecretQuery {
    #[serde(default)]
    secret: Option<String>,
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

fn keyed_digest(secret: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(COMPARE_CONTEXT);
    Some(mac)
}

/// Constant-time equality for shared secrets. Both sides are reduced to a
/// fixed-length MAC first so the comparison time does not depend on the
/// length or contents of either value.
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    let (Some(presented), Some(expected)) = (keyed_digest(presented), keyed_digest(expected)) else {
        return false;
    };
    presented.verify_slice(&expected.finalize().into_bytes()).is_ok()
}

/// Guard for the scheduler-triggered job endpoints.
///
/// If `CRON_SECRET` is set, the request must carry it either as
/// `Authorization: Bearer <secret>` or as `?secret=<secret>`.
/// Unset means open (dev mode).
pub async fn require_cron_secret(
    State(state): State<AppState>,
    Query(query): Query<SecretQuery>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.cron_secret.as_deref() else {
        return Ok(next.run(req).await);
    };

    match bearer_token(&req).or(query.secret.as_deref()) {
        Some(presented) if secrets_match(presented, expected) => Ok(next.run(req).await),
        _ => {
            tracing::warn!(path = %req.uri().path(), "Rejected cron request");
            Err(AppError::Unauthorized)
        }
    }
}

/// Bearer-token guard for admin endpoints. `ADMIN_TOKEN` unset disables it.
pub async fn require_admin_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.admin_token.as_deref() else {
        return Ok(next.run(req).await);
    };

    match bearer_token(&req) {
        Some(token) if secrets_match(token, expected) => Ok(next.run(req).await),
        _ => {
            tracing::warn!(path = %req.uri().path(), "Rejected admin request");
            Err(AppError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_compare_by_value() {
        assert!(secrets_match("tick", "tick"));
        assert!(!secrets_match("tock", "tick"));
        assert!(!secrets_match("tic", "tick"));
        assert!(!secrets_match("", "tick"));
    }
}
