use std::env;

const DEFAULT_RPC_URL: &str = "https://mainnet.base.org";
const DEFAULT_NEYNAR_URL: &str = "https://api.neynar.com";
const BASE_CHAIN_ID: u64 = 8453;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Ledger
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: String,
    /// Oracle signer. Without it the ledger client is read-only.
    pub oracle_private_key: Option<String>,

    // Social API
    pub neynar_api_key: String,
    pub neynar_api_url: String,
    /// Managed signer used to publish bot replies (optional).
    pub neynar_signer_uuid: Option<String>,

    // Endpoint secrets (unset = open, local development only)
    pub webhook_secret: Option<String>,
    pub cron_secret: Option<String>,
    pub admin_token: Option<String>,

    // Frames / links
    pub app_url: String,
    pub bot_mention: String,
    pub frame_image_url: String,

    // Jobs
    pub indexer_delay_ms: u64,
    pub oracle_delay_ms: u64,
    pub oracle_max_reaction_pages: u32,
    pub oracle_reputation_score: Option<f64>,
    pub sync_batch_size: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let app_url = env::var("APP_URL")
            .unwrap_or_else(|_| "http://localhost:8080".into())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.into()),
            chain_id: env::var("CHAIN_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(BASE_CHAIN_ID),
            contract_address: env::var("CONTRACT_ADDRESS")
                .map_err(|_| anyhow::anyhow!("CONTRACT_ADDRESS must be set"))?,
            oracle_private_key: non_empty_var("ORACLE_PRIVATE_KEY"),

            neynar_api_key: env::var("NEYNAR_API_KEY")
                .map_err(|_| anyhow::anyhow!("NEYNAR_API_KEY must be set"))?,
            neynar_api_url: env::var("NEYNAR_API_URL")
                .unwrap_or_else(|_| DEFAULT_NEYNAR_URL.into()),
            neynar_signer_uuid: non_empty_var("NEYNAR_SIGNER_UUID"),

            webhook_secret: non_empty_var("WEBHOOK_SECRET"),
            cron_secret: non_empty_var("CRON_SECRET"),
            admin_token: non_empty_var("ADMIN_TOKEN"),

            frame_image_url: env::var("FRAME_IMAGE_URL")
                .unwrap_or_else(|_| format!("{app_url}/frame.png")),
            app_url,
            bot_mention: env::var("BOT_MENTION").unwrap_or_else(|_| "@moondoom".into()),

            indexer_delay_ms: parse_or("INDEXER_DELAY_MS", 250),
            oracle_delay_ms: parse_or("ORACLE_DELAY_MS", 500),
            oracle_max_reaction_pages: parse_or("ORACLE_MAX_REACTION_PAGES", 10),
            oracle_reputation_score: env::var("ORACLE_REPUTATION_SCORE")
                .ok()
                .and_then(|v| v.parse().ok()),
            sync_batch_size: parse_or("SYNC_BATCH_SIZE", 25usize).max(1),
        })
    }

    /// Public link to a market page.
    pub fn market_url(&self, market_id: u64) -> String {
        format!("{}/market/{}", self.app_url, market_id)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
