use std::str::FromStr;

use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use super::abi::ICastMarket::{self, ICastMarketInstance, MarketView, UserBetView};
use crate::models::{Market, Outcome, UserBet};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),

    #[error("transaction not confirmed: {0}")]
    Pending(#[from] alloy::providers::PendingTransactionError),

    #[error("ledger returned an unexpected shape: {0}")]
    Decode(String),

    #[error("market {0} does not exist")]
    MarketNotFound(u64),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("transaction {0} reverted")]
    Reverted(String),

    #[error("no oracle signer configured")]
    ReadOnly,

    #[error("ledger error: {0}")]
    Other(String),
}

/// A market created through `createMarket`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedMarket {
    pub market_id: u64,
    pub tx_hash: String,
}

/// Read and write access to the on-chain market ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Number of markets created so far; ids run `1..=count`.
    async fn market_count(&self) -> Result<u64, LedgerError>;

    async fn get_market(&self, market_id: u64) -> Result<Market, LedgerError>;

    async fn get_user_bet(&self, market_id: u64, user: &str) -> Result<UserBet, LedgerError>;

    /// Submit `resolveMarket` and wait for the receipt. Returns the tx hash.
    async fn resolve_market(&self, market_id: u64, outcome: Outcome) -> Result<String, LedgerError>;

    async fn create_market(
        &self,
        cast_hash: &str,
        threshold: u64,
        duration_secs: u64,
    ) -> Result<CreatedMarket, LedgerError>;
}

/// `Ledger` backed by an alloy HTTP provider.
///
/// When constructed with an oracle key the provider signs and fills
/// transactions locally; otherwise every write returns `LedgerError::ReadOnly`.
pub struct ChainLedger {
    contract: ICastMarketInstance<DynProvider>,
    signer_address: Option<Address>,
}

impl ChainLedger {
    pub fn new(
        rpc_url: &str,
        contract_address: &str,
        oracle_private_key: Option<&str>,
        chain_id: u64,
    ) -> anyhow::Result<Self> {
        let url: reqwest::Url = rpc_url.parse()?;
        let address = Address::from_str(contract_address)
            .map_err(|e| anyhow::anyhow!("invalid CONTRACT_ADDRESS: {e}"))?;

        let (provider, signer_address) = match oracle_private_key {
            Some(key) => {
                let signer = PrivateKeySigner::from_str(key)?.with_chain_id(Some(chain_id));
                let signer_address = signer.address();
                let provider = ProviderBuilder::new()
                    .wallet(signer)
                    .connect_http(url)
                    .erased();
                (provider, Some(signer_address))
            }
            None => (ProviderBuilder::new().connect_http(url).erased(), None),
        };

        Ok(Self {
            contract: ICastMarket::new(address, provider),
            signer_address,
        })
    }

    /// Address of the oracle signer, if configured.
    pub fn signer_address(&self) -> Option<String> {
        self.signer_address.map(|a| a.to_checksum(None))
    }

    fn require_signer(&self) -> Result<(), LedgerError> {
        if self.signer_address.is_none() {
            return Err(LedgerError::ReadOnly);
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for ChainLedger {
    async fn market_count(&self) -> Result<u64, LedgerError> {
        let next = self.contract.nextMarketId().call().await?;
        let next = to_u64(next, "nextMarketId")?;
        Ok(next.saturating_sub(1))
    }

    async fn get_market(&self, market_id: u64) -> Result<Market, LedgerError> {
        let view = self.contract.getMarket(U256::from(market_id)).call().await?;
        decode_market(market_id, view)
    }

    async fn get_user_bet(&self, market_id: u64, user: &str) -> Result<UserBet, LedgerError> {
        let user = Address::from_str(user).map_err(|_| LedgerError::InvalidAddress(user.into()))?;
        let view = self
            .contract
            .getUserBet(U256::from(market_id), user)
            .call()
            .await?;
        decode_user_bet(view)
    }

    async fn resolve_market(&self, market_id: u64, outcome: Outcome) -> Result<String, LedgerError> {
        self.require_signer()?;

        let receipt = self
            .contract
            .resolveMarket(U256::from(market_id), outcome.as_u8())
            .send()
            .await?
            .get_receipt()
            .await?;

        let tx_hash = receipt.transaction_hash.to_string();
        if !receipt.status() {
            return Err(LedgerError::Reverted(tx_hash));
        }

        tracing::info!(market_id, outcome = %outcome, tx = %tx_hash, "resolveMarket confirmed");
        Ok(tx_hash)
    }

    async fn create_market(
        &self,
        cast_hash: &str,
        threshold: u64,
        duration_secs: u64,
    ) -> Result<CreatedMarket, LedgerError> {
        self.require_signer()?;

        let receipt = self
            .contract
            .createMarket(
                cast_hash.to_string(),
                U256::from(threshold),
                U256::from(duration_secs),
            )
            .send()
            .await?
            .get_receipt()
            .await?;

        let tx_hash = receipt.transaction_hash.to_string();
        if !receipt.status() {
            return Err(LedgerError::Reverted(tx_hash));
        }

        let from_event = receipt
            .inner
            .logs()
            .iter()
            .find_map(|log| log.log_decode::<ICastMarket::MarketCreated>().ok())
            .and_then(|decoded| u64::try_from(decoded.inner.data.marketId).ok());

        let market_id = match from_event {
            Some(id) => id,
            None => {
                tracing::warn!(tx = %tx_hash, "MarketCreated event not found, falling back to counter");
                self.market_count().await?
            }
        };

        Ok(CreatedMarket { market_id, tx_hash })
    }
}

fn to_u64(value: U256, field: &str) -> Result<u64, LedgerError> {
    u64::try_from(value).map_err(|_| LedgerError::Decode(format!("{field} does not fit in u64: {value}")))
}

fn wei_to_eth(value: U256) -> Result<Decimal, LedgerError> {
    Decimal::from_str(&format_ether(value))
        .map(|d| d.normalize())
        .map_err(|e| LedgerError::Decode(format!("pool amount {value}: {e}")))
}

/// Convert the named contract struct into the domain model.
///
/// An all-zero struct (no creator, id 0) is how the contract answers for an
/// id it never assigned.
pub(crate) fn decode_market(requested_id: u64, view: MarketView) -> Result<Market, LedgerError> {
    if view.creator == Address::ZERO && view.id.is_zero() {
        return Err(LedgerError::MarketNotFound(requested_id));
    }

    let id = to_u64(view.id, "id")?;
    if id != requested_id {
        return Err(LedgerError::Decode(format!(
            "requested market {requested_id}, ledger returned {id}"
        )));
    }

    let outcome = Outcome::try_from(view.outcome)
        .map_err(|raw| LedgerError::Decode(format!("unknown outcome value {raw}")))?;

    let deadline = i64::try_from(view.deadline)
        .map_err(|_| LedgerError::Decode(format!("deadline out of range: {}", view.deadline)))?;

    Ok(Market {
        id,
        cast_hash: view.castHash,
        creator: view.creator.to_checksum(None),
        threshold: to_u64(view.threshold, "threshold")?,
        deadline,
        resolved: view.resolved,
        outcome,
        moon_pool: wei_to_eth(view.moonPool)?,
        doom_pool: wei_to_eth(view.doomPool)?,
    })
}

pub(crate) fn decode_user_bet(view: UserBetView) -> Result<UserBet, LedgerError> {
    Ok(UserBet {
        moon_stake: wei_to_eth(view.moonStake)?,
        doom_stake: wei_to_eth(view.doomStake)?,
        claimed: view.claimed,
    })
}
