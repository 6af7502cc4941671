use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use chrono::Utc;
use rust_decimal::Decimal;

use moondoom::api::router::create_router;
use moondoom::chain::{CreatedMarket, Ledger, LedgerError, TxBuilder};
use moondoom::config::AppConfig;
use moondoom::db::MarketCache;
use moondoom::models::{
    same_cast, CastAuthor, CastMetadata, CastSnapshot, LikeUpdate, Market, MarketRow, MarketStatus,
    Outcome, UserBet,
};
use moondoom::services::command::CommandParser;
use moondoom::social::{LikeTally, SocialApi, SocialError, UserReputation};
use moondoom::AppState;

#[allow(dead_code)]
pub const HASH_A: &str = "0x5a1b2c3d4e5f60718293a4b5c6d7e8f901234567";
#[allow(dead_code)]
pub const HASH_B: &str = "0x9f8e7d6c5b4a39281706f5e4d3c2b1a098765432";
#[allow(dead_code)]
pub const CONTRACT: &str = "0x2222222222222222222222222222222222222222";
#[allow(dead_code)]
pub const CREATOR: &str = "0x1111111111111111111111111111111111111111";

// ---------------------------------------------------------------------------
// Market cache
// ---------------------------------------------------------------------------

/// In-memory cache applying the same merge rules as the Postgres upsert.
#[derive(Default)]
pub struct InMemoryCache {
    pub rows: Mutex<BTreeMap<i64, MarketRow>>,
    pub snapshots: Mutex<HashMap<String, CastSnapshot>>,
    pub fail_writes: AtomicBool,
    pub fail_ping: AtomicBool,
}

#[allow(dead_code)]
impl InMemoryCache {
    pub fn row(&self, market_id: i64) -> Option<MarketRow> {
        self.rows.lock().unwrap().get(&market_id).cloned()
    }

    pub fn insert_row(&self, row: MarketRow) {
        self.rows.lock().unwrap().insert(row.market_id, row);
    }

    fn check_writes(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("cache unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl MarketCache for InMemoryCache {
    async fn upsert_market(&self, row: &MarketRow) -> anyhow::Result<()> {
        self.check_writes()?;
        let mut rows = self.rows.lock().unwrap();
        let mut next = row.clone();
        next.updated_at = Some(Utc::now());

        if let Some(prev) = rows.get(&row.market_id) {
            if next.cast_hash.len() < 20 && prev.cast_hash.len() >= 20 {
                next.cast_hash = prev.cast_hash.clone();
            }
            if prev.status == MarketStatus::AdminCancelled.as_str() && !next.resolved {
                next.status = prev.status.clone();
            }
            next.author_fid = next.author_fid.or(prev.author_fid);
            next.author_username = next.author_username.or_else(|| prev.author_username.clone());
            next.author_display_name = next
                .author_display_name
                .or_else(|| prev.author_display_name.clone());
            next.author_pfp_url = next.author_pfp_url.or_else(|| prev.author_pfp_url.clone());
            next.cast_text = next.cast_text.or_else(|| prev.cast_text.clone());
            next.likes_count = next.likes_count.or(prev.likes_count);
        }

        rows.insert(row.market_id, next);
        Ok(())
    }

    async fn get_market(&self, market_id: i64) -> anyhow::Result<Option<MarketRow>> {
        Ok(self.row(market_id))
    }

    async fn get_markets_by_status(&self, status: MarketStatus) -> anyhow::Result<Vec<MarketRow>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .rev()
            .filter(|r| r.status == status.as_str())
            .cloned()
            .collect())
    }

    async fn find_by_cast_hash(&self, cast_hash: &str) -> anyhow::Result<Option<MarketRow>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|r| same_cast(&r.cast_hash, cast_hash))
            .cloned())
    }

    async fn delete_market(&self, market_id: i64) -> anyhow::Result<bool> {
        self.check_writes()?;
        Ok(self.rows.lock().unwrap().remove(&market_id).is_some())
    }

    async fn set_status(&self, market_id: i64, status: MarketStatus) -> anyhow::Result<bool> {
        self.check_writes()?;
        match self.rows.lock().unwrap().get_mut(&market_id) {
            Some(row) => {
                row.status = status.as_str().to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_cast_hash(&self, market_id: i64, cast_hash: &str) -> anyhow::Result<()> {
        self.check_writes()?;
        if let Some(row) = self.rows.lock().unwrap().get_mut(&market_id) {
            row.cast_hash = cast_hash.to_string();
        }
        Ok(())
    }

    async fn bulk_update_likes(&self, updates: &[LikeUpdate]) -> anyhow::Result<u64> {
        self.check_writes()?;
        let mut rows = self.rows.lock().unwrap();
        let mut written = 0;
        for update in updates {
            if let Some(row) = rows.get_mut(&update.market_id) {
                row.likes_count = Some(update.likes_count);
                written += 1;
            }
        }
        Ok(written)
    }

    async fn record_snapshot(&self, snapshot: &CastSnapshot) -> anyhow::Result<()> {
        self.check_writes()?;
        self.snapshots
            .lock()
            .unwrap()
            .entry(snapshot.cast_hash.to_lowercase())
            .or_insert_with(|| snapshot.clone());
        Ok(())
    }

    async fn get_snapshot(&self, cast_hash: &str) -> anyhow::Result<Option<CastSnapshot>> {
        Ok(self.snapshots.lock().unwrap().get(&cast_hash.to_lowercase()).cloned())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        if self.fail_ping.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeLedger {
    pub markets: Mutex<Vec<Market>>,
    pub bets: Mutex<HashMap<(u64, String), UserBet>>,
    pub resolve_calls: Mutex<Vec<(u64, Outcome)>>,
    pub create_calls: Mutex<Vec<(String, u64, u64)>>,
    pub fail_resolve: AtomicBool,
    pub unreadable: Mutex<HashSet<u64>>,
}

#[allow(dead_code)]
impl FakeLedger {
    pub fn with_markets(markets: Vec<Market>) -> Self {
        let ledger = Self::default();
        *ledger.markets.lock().unwrap() = markets;
        ledger
    }

    pub fn market(&self, id: u64) -> Option<Market> {
        self.markets.lock().unwrap().iter().find(|m| m.id == id).cloned()
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn market_count(&self) -> Result<u64, LedgerError> {
        Ok(self.markets.lock().unwrap().len() as u64)
    }

    async fn get_market(&self, market_id: u64) -> Result<Market, LedgerError> {
        if self.unreadable.lock().unwrap().contains(&market_id) {
            return Err(LedgerError::Other("rpc timeout".into()));
        }
        self.market(market_id).ok_or(LedgerError::MarketNotFound(market_id))
    }

    async fn get_user_bet(&self, market_id: u64, user: &str) -> Result<UserBet, LedgerError> {
        if !user.starts_with("0x") || user.len() != 42 {
            return Err(LedgerError::InvalidAddress(user.into()));
        }
        self.market(market_id).ok_or(LedgerError::MarketNotFound(market_id))?;
        Ok(self
            .bets
            .lock()
            .unwrap()
            .get(&(market_id, user.to_lowercase()))
            .cloned()
            .unwrap_or(UserBet {
                moon_stake: Decimal::ZERO,
                doom_stake: Decimal::ZERO,
                claimed: false,
            }))
    }

    async fn resolve_market(&self, market_id: u64, outcome: Outcome) -> Result<String, LedgerError> {
        if self.fail_resolve.load(Ordering::SeqCst) {
            return Err(LedgerError::Reverted(format!("0xrevert{market_id}")));
        }
        let mut markets = self.markets.lock().unwrap();
        let market = markets
            .iter_mut()
            .find(|m| m.id == market_id)
            .ok_or(LedgerError::MarketNotFound(market_id))?;
        market.resolved = true;
        market.outcome = outcome;
        self.resolve_calls.lock().unwrap().push((market_id, outcome));
        Ok(format!("0xresolve{market_id}"))
    }

    async fn create_market(
        &self,
        cast_hash: &str,
        threshold: u64,
        duration_secs: u64,
    ) -> Result<CreatedMarket, LedgerError> {
        let mut markets = self.markets.lock().unwrap();
        let market_id = markets.len() as u64 + 1;
        markets.push(Market {
            id: market_id,
            cast_hash: cast_hash.to_string(),
            creator: CREATOR.into(),
            threshold,
            deadline: Utc::now().timestamp() + duration_secs as i64,
            resolved: false,
            outcome: Outcome::Unresolved,
            moon_pool: Decimal::ZERO,
            doom_pool: Decimal::ZERO,
        });
        self.create_calls
            .lock()
            .unwrap()
            .push((cast_hash.to_string(), threshold, duration_secs));
        Ok(CreatedMarket {
            market_id,
            tx_hash: format!("0xcreate{market_id}"),
        })
    }
}

// ---------------------------------------------------------------------------
// Social API
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeSocial {
    /// Keyed by every identifier that resolves to the cast (hash or URL).
    pub casts: Mutex<HashMap<String, CastMetadata>>,
    pub failing_likes: Mutex<HashSet<String>>,
    pub scores: Mutex<HashMap<u64, f64>>,
    pub lookup_calls: Mutex<Vec<String>>,
    pub bulk_calls: Mutex<Vec<Vec<String>>>,
    pub replies: Mutex<Vec<(String, String)>>,
}

#[allow(dead_code)]
impl FakeSocial {
    pub fn add_cast(&self, cast: CastMetadata, aliases: &[&str]) {
        let mut casts = self.casts.lock().unwrap();
        for alias in aliases {
            casts.insert(alias.to_lowercase(), cast.clone());
        }
        casts.insert(cast.hash.to_lowercase(), cast);
    }

    pub fn set_likes(&self, hash: &str, likes: u64) {
        let mut casts = self.casts.lock().unwrap();
        for cast in casts.values_mut() {
            if cast.hash.eq_ignore_ascii_case(hash) {
                cast.likes_count = likes;
            }
        }
    }

    pub fn remove_cast(&self, hash: &str) {
        self.casts
            .lock()
            .unwrap()
            .retain(|_, c| !c.hash.eq_ignore_ascii_case(hash));
    }

    pub fn reply_texts(&self) -> Vec<String> {
        self.replies.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl SocialApi for FakeSocial {
    async fn lookup_cast(&self, identifier: &str) -> Result<CastMetadata, SocialError> {
        self.lookup_calls.lock().unwrap().push(identifier.to_string());
        self.casts
            .lock()
            .unwrap()
            .get(&identifier.to_lowercase())
            .cloned()
            .ok_or_else(|| SocialError::NotFound(format!("cast {identifier}")))
    }

    async fn lookup_casts(&self, hashes: &[String]) -> Result<Vec<CastMetadata>, SocialError> {
        self.bulk_calls.lock().unwrap().push(hashes.to_vec());
        let casts = self.casts.lock().unwrap();
        let mut found: Vec<CastMetadata> = Vec::new();
        for hash in hashes {
            if let Some(cast) = casts.values().find(|c| same_cast(&c.hash, hash)) {
                if !found.iter().any(|f| f.hash == cast.hash) {
                    found.push(cast.clone());
                }
            }
        }
        Ok(found)
    }

    async fn count_likes(&self, cast_hash: &str, _max_pages: u32) -> Result<LikeTally, SocialError> {
        if self.failing_likes.lock().unwrap().contains(&cast_hash.to_lowercase()) {
            return Err(SocialError::RateLimited);
        }
        // A deleted cast answers 404, the same as the live API.
        let likes = self
            .casts
            .lock()
            .unwrap()
            .get(&cast_hash.to_lowercase())
            .map(|c| c.likes_count)
            .ok_or_else(|| SocialError::NotFound(format!("reactions for {cast_hash}")))?;
        Ok(LikeTally {
            likes,
            liker_fids: (1..=likes).collect(),
            truncated: false,
        })
    }

    async fn lookup_users(&self, fids: &[u64]) -> Result<Vec<UserReputation>, SocialError> {
        let scores = self.scores.lock().unwrap();
        Ok(fids
            .iter()
            .map(|fid| UserReputation {
                fid: *fid,
                score: scores.get(fid).copied(),
            })
            .collect())
    }

    async fn publish_reply(
        &self,
        parent_hash: &str,
        text: &str,
        _embed_url: Option<&str>,
    ) -> Result<(), SocialError> {
        self.replies
            .lock()
            .unwrap()
            .push((parent_hash.to_string(), text.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

#[allow(dead_code)]
pub fn market(id: u64, cast_hash: &str, threshold: u64, deadline: i64) -> Market {
    Market {
        id,
        cast_hash: cast_hash.into(),
        creator: CREATOR.into(),
        threshold,
        deadline,
        resolved: false,
        outcome: Outcome::Unresolved,
        moon_pool: Decimal::new(5, 2),
        doom_pool: Decimal::new(2, 2),
    }
}

#[allow(dead_code)]
pub fn cast(hash: &str, username: &str, likes: u64) -> CastMetadata {
    CastMetadata {
        hash: hash.into(),
        text: format!("a cast by {username}"),
        author: CastAuthor {
            fid: 42,
            username: username.into(),
            display_name: Some(username.to_uppercase()),
            pfp_url: None,
        },
        likes_count: likes,
    }
}

#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        host: "127.0.0.1".into(),
        port: 0,
        rpc_url: "http://localhost:8545".into(),
        chain_id: 8453,
        contract_address: CONTRACT.into(),
        oracle_private_key: None,
        neynar_api_key: "test".into(),
        neynar_api_url: "http://localhost".into(),
        neynar_signer_uuid: None,
        webhook_secret: None,
        cron_secret: None,
        admin_token: None,
        app_url: "https://moondoom.test".into(),
        bot_mention: "@moondoom".into(),
        frame_image_url: "https://moondoom.test/frame.png".into(),
        indexer_delay_ms: 0,
        oracle_delay_ms: 0,
        oracle_max_reaction_pages: 10,
        oracle_reputation_score: None,
        sync_batch_size: 25,
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub ledger: Arc<FakeLedger>,
    pub social: Arc<FakeSocial>,
    pub cache: Arc<InMemoryCache>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router.clone().oneshot(request).await.unwrap()
    }
}

#[allow(dead_code)]
pub fn build_test_app(config: AppConfig, ledger: FakeLedger, social: FakeSocial) -> TestApp {
    let ledger = Arc::new(ledger);
    let social = Arc::new(social);
    let cache = Arc::new(InMemoryCache::default());

    let state = AppState {
        tx_builder: TxBuilder::new(&config.contract_address, config.chain_id).unwrap(),
        parser: Arc::new(CommandParser::new(&config.bot_mention).unwrap()),
        config,
        cache: cache.clone(),
        ledger: ledger.clone(),
        social: social.clone(),
        metrics_handle: moondoom::metrics::detached_handle(),
    };

    TestApp {
        router: create_router(state),
        ledger,
        social,
        cache,
    }
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
