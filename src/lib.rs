pub mod api;
pub mod chain;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod services;
pub mod social;

use std::sync::Arc;

use crate::chain::{Ledger, TxBuilder};
use crate::config::AppConfig;
use crate::db::MarketCache;
use crate::services::command::CommandParser;
use crate::social::SocialApi;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub cache: Arc<dyn MarketCache>,
    pub ledger: Arc<dyn Ledger>,
    pub social: Arc<dyn SocialApi>,
    pub tx_builder: TxBuilder,
    pub parser: Arc<CommandParser>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
