use alloy::hex;
use hmac::{Hmac, Mac};
use metrics::counter;
use serde::{Deserialize, Serialize};
use sha2::Sha512;

use super::command::{CommandParser, MarketCommand};
use crate::chain::Ledger;
use crate::db::MarketCache;
use crate::models::{same_cast, CastSnapshot, Market, MarketRow, Outcome};
use crate::social::types::ApiUser;
use crate::social::SocialApi;

type HmacSha512 = Hmac<Sha512>;

pub const SIGNATURE_HEADER: &str = "x-neynar-signature";

/// Incoming webhook payload. Only `cast.created` events are acted on.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookCast,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookCast {
    pub hash: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub parent_hash: Option<String>,
    pub author: Option<ApiUser>,
}

impl WebhookCast {
    /// A reply targets its parent; a top-level mention targets itself.
    pub fn target_hash(&self) -> &str {
        self.parent_hash
            .as_deref()
            .filter(|h| !h.is_empty())
            .unwrap_or(&self.hash)
    }
}

/// Check `X-Neynar-Signature`: hex HMAC-SHA512 of the raw body.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Ignored { reason: String },
    AlreadyExists { market_id: u64 },
    Created { market_id: u64, tx_hash: String },
    Failed { error: String },
}

impl WebhookOutcome {
    fn ignored(reason: impl Into<String>) -> Self {
        WebhookOutcome::Ignored { reason: reason.into() }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WebhookOutcome::Ignored { .. } => "ignored",
            WebhookOutcome::AlreadyExists { .. } => "already_exists",
            WebhookOutcome::Created { .. } => "created",
            WebhookOutcome::Failed { .. } => "failed",
        }
    }
}

/// Collaborators needed to turn a mention into a market.
pub struct WebhookContext<'a> {
    pub ledger: &'a dyn Ledger,
    pub social: &'a dyn SocialApi,
    pub cache: &'a dyn MarketCache,
    pub parser: &'a CommandParser,
    pub app_url: &'a str,
}

impl WebhookContext<'_> {
    fn market_link(&self, market_id: u64) -> String {
        format!("{}/market/{}", self.app_url, market_id)
    }
}

/// Handle one webhook event end to end. Never fails; errors become
/// `WebhookOutcome::Failed` and are logged.
pub async fn handle_event(event: &WebhookEvent, ctx: &WebhookContext<'_>) -> WebhookOutcome {
    let outcome = if event.kind != "cast.created" {
        WebhookOutcome::ignored(format!("event type {}", event.kind))
    } else {
        handle_cast_created(&event.data, ctx).await
    };

    counter!("webhook_events_total", "result" => outcome.label()).increment(1);
    outcome
}

async fn handle_cast_created(cast: &WebhookCast, ctx: &WebhookContext<'_>) -> WebhookOutcome {
    let Some(command) = ctx.parser.parse(&cast.text) else {
        return WebhookOutcome::ignored("no mention");
    };

    let target = cast.target_hash().to_string();
    tracing::info!(
        cast = %cast.hash,
        target = %target,
        threshold = command.threshold,
        hours = command.duration_hours,
        "Webhook: market requested"
    );

    match find_existing_market(&target, ctx.ledger, ctx.cache).await {
        Ok(Some(market_id)) => {
            tracing::info!(market_id, target = %target, "Webhook: market already exists");
            let text = format!("A market already exists for this cast: {}", ctx.market_link(market_id));
            reply(ctx, &cast.hash, &text, market_id).await;
            return WebhookOutcome::AlreadyExists { market_id };
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, target = %target, "Webhook: duplicate check failed");
            return WebhookOutcome::Failed { error: format!("duplicate check failed: {e}") };
        }
    }

    create_market(&target, &cast.hash, command, ctx).await
}

async fn create_market(
    target: &str,
    reply_to: &str,
    command: MarketCommand,
    ctx: &WebhookContext<'_>,
) -> WebhookOutcome {
    // Prefer the full hash when the social API knows the cast.
    let metadata = match ctx.social.lookup_cast(target).await {
        Ok(cast) => Some(cast),
        Err(e) => {
            tracing::warn!(error = %e, target, "Webhook: target cast lookup failed");
            None
        }
    };
    let cast_hash = metadata.as_ref().map_or(target, |c| c.hash.as_str());

    let created = match ctx
        .ledger
        .create_market(cast_hash, command.threshold, command.duration_secs())
        .await
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, cast = cast_hash, "Webhook: createMarket failed");
            return WebhookOutcome::Failed { error: e.to_string() };
        }
    };
    counter!("markets_created_total").increment(1);
    tracing::info!(market_id = created.market_id, tx = %created.tx_hash, cast = cast_hash, "Market created");

    let market = Market {
        id: created.market_id,
        cast_hash: cast_hash.to_string(),
        creator: String::new(),
        threshold: command.threshold,
        deadline: chrono::Utc::now().timestamp() + command.duration_secs() as i64,
        resolved: false,
        outcome: Outcome::Unresolved,
        moon_pool: Default::default(),
        doom_pool: Default::default(),
    };
    // The ledger copy carries the creator and the exact deadline.
    let market = match ctx.ledger.get_market(created.market_id).await {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, market_id = created.market_id, "Webhook: re-read after create failed");
            market
        }
    };

    let mut row = MarketRow::from_market(&market);
    if let Some(cast) = &metadata {
        row = row.with_cast(cast);
        if let Err(e) = ctx.cache.record_snapshot(&CastSnapshot::of(cast)).await {
            tracing::warn!(error = %e, market_id = created.market_id, "Webhook: failed to record snapshot");
        }
    }
    if let Err(e) = ctx.cache.upsert_market(&row).await {
        tracing::warn!(error = %e, market_id = created.market_id, "Webhook: failed to cache new market");
    }

    let text = format!(
        "Market #{} is live. MOON if this cast reaches {} likes within {}h, DOOM otherwise: {}",
        created.market_id,
        command.threshold,
        command.duration_hours,
        ctx.market_link(created.market_id)
    );
    reply(ctx, reply_to, &text, created.market_id).await;

    WebhookOutcome::Created {
        market_id: created.market_id,
        tx_hash: created.tx_hash,
    }
}

/// Look for a market on `cast_hash`: the cache first, then a full ledger scan.
pub async fn find_existing_market(
    cast_hash: &str,
    ledger: &dyn Ledger,
    cache: &dyn MarketCache,
) -> anyhow::Result<Option<u64>> {
    match cache.find_by_cast_hash(cast_hash).await {
        Ok(Some(row)) => return Ok(Some(row.market_id as u64)),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Webhook: cache lookup failed, scanning ledger"),
    }

    // Newest first: a repeat request is most likely for a recent cast.
    let count = ledger.market_count().await?;
    for market_id in (1..=count).rev() {
        match ledger.get_market(market_id).await {
            Ok(m) if same_cast(&m.cast_hash, cast_hash) => return Ok(Some(market_id)),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, market_id, "Webhook: ledger scan read failed"),
        }
    }
    Ok(None)
}

async fn reply(ctx: &WebhookContext<'_>, parent: &str, text: &str, market_id: u64) {
    let link = ctx.market_link(market_id);
    if let Err(e) = ctx.social.publish_reply(parent, text, Some(&link)).await {
        tracing::warn!(error = %e, market_id, "Webhook: reply not published");
    }
}
