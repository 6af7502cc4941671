use std::sync::Arc;
use std::time::Duration;

use moondoom::api::router::create_router;
use moondoom::chain::abi::MARKET_SCHEMA_VERSION;
use moondoom::chain::{ChainLedger, TxBuilder};
use moondoom::config::AppConfig;
use moondoom::db::{self, PgMarketCache};
use moondoom::services::command::CommandParser;
use moondoom::social::NeynarClient;
use moondoom::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    let metrics_handle = moondoom::metrics::init_metrics()?;

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database connected");

    let ledger = ChainLedger::new(
        &config.rpc_url,
        &config.contract_address,
        config.oracle_private_key.as_deref(),
        config.chain_id,
    )?;
    match ledger.signer_address() {
        Some(addr) => tracing::info!(oracle = %addr, schema = MARKET_SCHEMA_VERSION, "Ledger client ready"),
        None => tracing::warn!("No ORACLE_PRIVATE_KEY: ledger is read-only, resolve and webhook creation disabled"),
    }

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()?;
    let social = NeynarClient::new(
        http,
        &config.neynar_api_url,
        config.neynar_api_key.clone(),
        config.neynar_signer_uuid.clone(),
    );
    if config.neynar_signer_uuid.is_none() {
        tracing::warn!("No NEYNAR_SIGNER_UUID: bot replies disabled");
    }

    let tx_builder = TxBuilder::new(&config.contract_address, config.chain_id)?;
    let parser = CommandParser::new(&config.bot_mention)?;

    if config.cron_secret.is_none() {
        tracing::warn!("CRON_SECRET not set: cron endpoints are open");
    }
    if config.webhook_secret.is_none() {
        tracing::warn!("WEBHOOK_SECRET not set: webhook signatures are not checked");
    }

    let state = AppState {
        config,
        cache: Arc::new(PgMarketCache::new(pool)),
        ledger: Arc::new(ledger),
        social: Arc::new(social),
        tx_builder,
        parser: Arc::new(parser),
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();
}
