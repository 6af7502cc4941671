use std::str::FromStr;

use alloy::hex;
use alloy::primitives::utils::parse_ether;
use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use serde::Serialize;
use thiserror::Error;

use super::abi::ICastMarket;
use crate::models::Side;

#[derive(Debug, Error)]
pub enum CalldataError {
    #[error("invalid amount {0:?}: expected a positive ETH value")]
    InvalidAmount(String),

    #[error("invalid contract address: {0}")]
    InvalidContract(String),
}

/// An unsigned transaction for the user's wallet to sign and send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxRequest {
    pub chain_id: u64,
    pub to: String,
    pub data: String,
    /// Wei, decimal string.
    pub value: String,
}

/// Builds wallet transactions against one deployed market contract.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    contract: Address,
    chain_id: u64,
}

impl TxBuilder {
    pub fn new(contract_address: &str, chain_id: u64) -> Result<Self, CalldataError> {
        let contract = Address::from_str(contract_address)
            .map_err(|_| CalldataError::InvalidContract(contract_address.into()))?;
        Ok(Self { contract, chain_id })
    }

    pub fn place_bet(&self, market_id: u64, side: Side, amount_eth: &str) -> Result<TxRequest, CalldataError> {
        let value = parse_stake(amount_eth)?;
        let call = ICastMarket::placeBetCall {
            marketId: U256::from(market_id),
            moon: side.is_moon(),
        };
        Ok(self.request(call.abi_encode(), value))
    }

    pub fn create_market(&self, cast_hash: &str, threshold: u64, duration_secs: u64) -> TxRequest {
        let call = ICastMarket::createMarketCall {
            castHash: cast_hash.to_string(),
            threshold: U256::from(threshold),
            duration: U256::from(duration_secs),
        };
        self.request(call.abi_encode(), U256::ZERO)
    }

    pub fn claim(&self, market_id: u64) -> TxRequest {
        let call = ICastMarket::claimCall {
            marketId: U256::from(market_id),
        };
        self.request(call.abi_encode(), U256::ZERO)
    }

    fn request(&self, data: Vec<u8>, value: U256) -> TxRequest {
        TxRequest {
            chain_id: self.chain_id,
            to: self.contract.to_checksum(None),
            data: hex::encode_prefixed(data),
            value: value.to_string(),
        }
    }
}

fn parse_stake(amount_eth: &str) -> Result<U256, CalldataError> {
    let value = parse_ether(amount_eth.trim())
        .map_err(|_| CalldataError::InvalidAmount(amount_eth.into()))?;
    if value.is_zero() {
        return Err(CalldataError::InvalidAmount(amount_eth.into()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "0x2222222222222222222222222222222222222222";

    #[test]
    fn bet_encodes_selector_and_value() {
        let builder = TxBuilder::new(CONTRACT, 8453).unwrap();
        let tx = builder.place_bet(3, Side::Moon, "0.01").unwrap();

        let selector = hex::encode_prefixed(ICastMarket::placeBetCall::SELECTOR);
        assert!(tx.data.starts_with(&selector));
        assert_eq!(tx.value, "10000000000000000");
        assert_eq!(tx.chain_id, 8453);
        assert_eq!(tx.to, CONTRACT);

        let decoded = ICastMarket::placeBetCall::abi_decode(&hex::decode(&tx.data).unwrap()).unwrap();
        assert_eq!(decoded.marketId, U256::from(3u64));
        assert!(decoded.moon);
    }

    #[test]
    fn zero_or_garbage_stake_is_rejected() {
        let builder = TxBuilder::new(CONTRACT, 8453).unwrap();
        assert!(builder.place_bet(1, Side::Doom, "0").is_err());
        assert!(builder.place_bet(1, Side::Doom, "lots").is_err());
    }

    #[test]
    fn claim_carries_no_value() {
        let builder = TxBuilder::new(CONTRACT, 8453).unwrap();
        let tx = builder.claim(9);
        assert_eq!(tx.value, "0");
        let decoded = ICastMarket::claimCall::abi_decode(&hex::decode(&tx.data).unwrap()).unwrap();
        assert_eq!(decoded.marketId, U256::from(9u64));
    }
}
