use std::fmt::Write as _;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::Html;
use axum::Json;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::chain::TxRequest;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{Market, MarketRow, MarketStatus, Side};
use crate::AppState;

/// Stake used when the frame text input is left empty.
pub const DEFAULT_FRAME_STAKE_ETH: &str = "0.001";

// ---------------------------------------------------------------------------
// Frame request / state
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct FrameRequest {
    #[serde(default, rename = "untrustedData")]
    pub untrusted_data: UntrustedData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UntrustedData {
    pub fid: Option<u64>,
    pub button_index: Option<u32>,
    pub input_text: Option<String>,
    pub state: Option<String>,
    pub transaction_id: Option<String>,
    pub address: Option<String>,
}

impl FrameRequest {
    /// Frame clients post JSON, but a missing or malformed body still renders.
    fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    fn state(&self) -> Option<FrameState> {
        self.untrusted_data.state.as_deref().and_then(FrameState::decode)
    }
}

/// Opaque state round-tripped through the frame client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameState {
    pub market_id: u64,
}

impl FrameState {
    pub fn encode(&self) -> String {
        BASE64.encode(serde_json::to_vec(self).unwrap_or_default())
    }

    pub fn decode(raw: &str) -> Option<Self> {
        let bytes = BASE64.decode(raw.trim()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    Bet(Side),
    Claim,
}

impl FrameAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bet-moon" => Some(FrameAction::Bet(Side::Moon)),
            "bet-doom" => Some(FrameAction::Bet(Side::Doom)),
            "claim" => Some(FrameAction::Claim),
            _ => None,
        }
    }
}

/// Frame transaction payload (`eth_sendTransaction`).
pub fn frame_transaction(tx: &TxRequest) -> Value {
    json!({
        "chainId": format!("eip155:{}", tx.chain_id),
        "method": "eth_sendTransaction",
        "params": {
            "abi": [],
            "to": tx.to,
            "data": tx.data,
            "value": tx.value,
        }
    })
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

enum ButtonAction {
    Tx { target: String, post_url: String },
    Post { target: String },
    Link { target: String },
}

struct FrameButton {
    label: String,
    action: ButtonAction,
}

struct FramePage {
    title: String,
    description: String,
    image: String,
    post_url: String,
    input: Option<&'static str>,
    state: Option<FrameState>,
    buttons: Vec<FrameButton>,
}

impl FramePage {
    fn render(&self) -> String {
        let mut meta = String::new();
        let mut tag = |property: &str, content: &str| {
            let _ = writeln!(
                meta,
                r#"    <meta property="{property}" content="{}" />"#,
                escape_html(content)
            );
        };

        tag("og:title", &self.title);
        tag("og:description", &self.description);
        tag("og:image", &self.image);
        tag("fc:frame", "vNext");
        tag("fc:frame:image", &self.image);
        tag("fc:frame:image:aspect_ratio", "1.91:1");
        tag("fc:frame:post_url", &self.post_url);
        if let Some(placeholder) = self.input {
            tag("fc:frame:input:text", placeholder);
        }
        if let Some(state) = &self.state {
            tag("fc:frame:state", &state.encode());
        }
        for (i, button) in self.buttons.iter().enumerate() {
            let n = i + 1;
            tag(&format!("fc:frame:button:{n}"), &button.label);
            match &button.action {
                ButtonAction::Tx { target, post_url } => {
                    tag(&format!("fc:frame:button:{n}:action"), "tx");
                    tag(&format!("fc:frame:button:{n}:target"), target);
                    tag(&format!("fc:frame:button:{n}:post_url"), post_url);
                }
                ButtonAction::Post { target } => {
                    tag(&format!("fc:frame:button:{n}:action"), "post");
                    tag(&format!("fc:frame:button:{n}:target"), target);
                }
                ButtonAction::Link { target } => {
                    tag(&format!("fc:frame:button:{n}:action"), "link");
                    tag(&format!("fc:frame:button:{n}:target"), target);
                }
            }
        }

        format!(
            "<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"utf-8\" />\n    <title>{title}</title>\n{meta}  </head>\n  <body>\n    <h1>{title}</h1>\n    <p>{description}</p>\n  </body>\n</html>\n",
            title = escape_html(&self.title),
            description = escape_html(&self.description),
        )
    }
}

fn frame_base(config: &AppConfig, market_id: u64) -> String {
    format!("{}/frames/market/{}", config.app_url, market_id)
}

/// The market card: bet buttons while open, claim once resolved.
pub fn market_card(config: &AppConfig, market: &Market, row: Option<&MarketRow>, now: i64) -> String {
    let base = frame_base(config, market.id);
    let author = row.map_or("unknown", |r| r.author_label());
    let likes = row
        .and_then(|r| r.likes_count)
        .map_or_else(|| "?".to_string(), |l| l.to_string());

    let status = row
        .and_then(|r| r.status())
        .filter(|s| *s == MarketStatus::AdminCancelled)
        .unwrap_or_else(|| market.display_status());

    let title = format!("Market #{}: will @{}'s cast reach {} likes?", market.id, author, market.threshold);
    let description = format!(
        "{} · {}/{} likes · MOON {} ETH · DOOM {} ETH",
        status.as_str().to_uppercase(),
        likes,
        market.threshold,
        market.moon_pool,
        market.doom_pool,
    );

    let view = FrameButton {
        label: "View market".into(),
        action: ButtonAction::Link { target: config.market_url(market.id) },
    };
    let done = format!("{base}/done");

    let (buttons, input) = if market.resolved {
        (
            vec![
                FrameButton {
                    label: "Claim".into(),
                    action: ButtonAction::Tx { target: format!("{base}/tx/claim"), post_url: done },
                },
                view,
            ],
            None,
        )
    } else if status == MarketStatus::AdminCancelled || market.is_expired(now) {
        (
            vec![
                FrameButton {
                    label: "Refresh".into(),
                    action: ButtonAction::Post { target: base.clone() },
                },
                view,
            ],
            None,
        )
    } else {
        (
            vec![
                FrameButton {
                    label: "MOON".into(),
                    action: ButtonAction::Tx {
                        target: format!("{base}/tx/bet-moon"),
                        post_url: done.clone(),
                    },
                },
                FrameButton {
                    label: "DOOM".into(),
                    action: ButtonAction::Tx { target: format!("{base}/tx/bet-doom"), post_url: done },
                },
                view,
            ],
            Some("Stake in ETH (default 0.001)"),
        )
    };

    FramePage {
        title,
        description,
        image: config.frame_image_url.clone(),
        post_url: base,
        input,
        state: Some(FrameState { market_id: market.id }),
        buttons,
    }
    .render()
}

/// Shown after the wallet submits a transaction.
pub fn confirmation_card(config: &AppConfig, market_id: u64, transaction_id: Option<&str>) -> String {
    let base = frame_base(config, market_id);
    let description = match transaction_id {
        Some(tx) => format!("Transaction {tx} submitted."),
        None => "Transaction submitted.".to_string(),
    };

    FramePage {
        title: format!("Market #{market_id}: you're in"),
        description,
        image: config.frame_image_url.clone(),
        post_url: base.clone(),
        input: None,
        state: Some(FrameState { market_id }),
        buttons: vec![
            FrameButton {
                label: "Back to market".into(),
                action: ButtonAction::Post { target: base },
            },
            FrameButton {
                label: "View market".into(),
                action: ButtonAction::Link { target: config.market_url(market_id) },
            },
        ],
    }
    .render()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn render_market(state: &AppState, market_id: u64) -> Result<Html<String>, AppError> {
    let market = state.ledger.get_market(market_id).await?;
    let row = match state.cache.get_market(market_id as i64).await {
        Ok(row) => row,
        Err(e) => {
            tracing::warn!(error = %e, market_id, "Frame: cache read failed, rendering without metadata");
            None
        }
    };
    Ok(Html(market_card(&state.config, &market, row.as_ref(), Utc::now().timestamp())))
}

/// GET /frames/market/:id
pub async fn card(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Html<String>, AppError> {
    render_market(&state, id).await
}

/// POST /frames/market/:id: re-render; the frame state names the market.
pub async fn refresh(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    body: Bytes,
) -> Result<Html<String>, AppError> {
    let request = FrameRequest::from_body(&body);
    let market_id = request.state().map_or(id, |s| s.market_id);
    render_market(&state, market_id).await
}

/// POST /frames/market/:id/tx/:action: frame transaction for the wallet.
pub async fn transaction(
    State(state): State<AppState>,
    Path((id, action)): Path<(u64, String)>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let action = FrameAction::parse(&action)
        .ok_or_else(|| AppError::BadRequest(format!("unknown frame action {action:?}")))?;
    let request = FrameRequest::from_body(&body);

    let tx = match action {
        FrameAction::Bet(side) => {
            let stake = request
                .untrusted_data
                .input_text
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_FRAME_STAKE_ETH);
            super::tx::ensure_open_for_bets(&state, id).await?;
            state.tx_builder.place_bet(id, side, stake)?
        }
        FrameAction::Claim => {
            super::tx::ensure_claimable(&state, id).await?;
            state.tx_builder.claim(id)
        }
    };

    tracing::info!(
        market_id = id,
        action = ?action,
        fid = ?request.untrusted_data.fid,
        "Frame transaction requested"
    );
    Ok(Json(frame_transaction(&tx)))
}

/// POST /frames/market/:id/done
pub async fn done(State(state): State<AppState>, Path(id): Path<u64>, body: Bytes) -> Html<String> {
    let request = FrameRequest::from_body(&body);
    Html(confirmation_card(
        &state.config,
        id,
        request.untrusted_data.transaction_id.as_deref(),
    ))
}
