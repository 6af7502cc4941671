use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use metrics::counter;

use crate::services::webhook::{
    handle_event, verify_signature, WebhookContext, WebhookEvent, WebhookOutcome, SIGNATURE_HEADER,
};
use crate::AppState;

/// POST /api/webhook: always 200 so the sender does not retry.
pub async fn receive(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Json<WebhookOutcome> {
    if let Some(secret) = state.config.webhook_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(secret, &body, signature) {
            tracing::warn!("Webhook: invalid signature, ignoring");
            counter!("webhook_events_total", "result" => "bad_signature").increment(1);
            return Json(WebhookOutcome::Ignored {
                reason: "invalid signature".into(),
            });
        }
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(error = %e, "Webhook: unparseable payload");
            return Json(WebhookOutcome::Ignored {
                reason: "unparseable payload".into(),
            });
        }
    };

    let ctx = WebhookContext {
        ledger: state.ledger.as_ref(),
        social: state.social.as_ref(),
        cache: state.cache.as_ref(),
        parser: state.parser.as_ref(),
        app_url: &state.config.app_url,
    };
    Json(handle_event(&event, &ctx).await)
}
