use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

// ---------------------------------------------------------------------------
// Outcome: mirrors the contract's uint8 outcome field
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Unresolved,
    Moon,
    Doom,
    Cancelled,
}

impl Outcome {
    pub fn as_u8(self) -> u8 {
        match self {
            Outcome::Unresolved => 0,
            Outcome::Moon => 1,
            Outcome::Doom => 2,
            Outcome::Cancelled => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Unresolved => "UNRESOLVED",
            Outcome::Moon => "MOON",
            Outcome::Doom => "DOOM",
            Outcome::Cancelled => "CANCELLED",
        }
    }
}

impl TryFrom<u8> for Outcome {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Outcome::Unresolved),
            1 => Ok(Outcome::Moon),
            2 => Ok(Outcome::Doom),
            3 => Ok(Outcome::Cancelled),
            other => Err(other),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MarketStatus: display status stored in the index cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
    Active,
    Based,
    Erased,
    AdminCancelled,
}

impl MarketStatus {
    /// Derive the display status from ledger state.
    pub fn from_ledger(resolved: bool, outcome: Outcome) -> Self {
        if !resolved {
            return MarketStatus::Active;
        }
        match outcome {
            Outcome::Moon => MarketStatus::Based,
            Outcome::Cancelled => MarketStatus::AdminCancelled,
            Outcome::Doom | Outcome::Unresolved => MarketStatus::Erased,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MarketStatus::Active => "active",
            MarketStatus::Based => "based",
            MarketStatus::Erased => "erased",
            MarketStatus::AdminCancelled => "admin_cancelled",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(MarketStatus::Active),
            "based" => Some(MarketStatus::Based),
            "erased" => Some(MarketStatus::Erased),
            "admin_cancelled" => Some(MarketStatus::AdminCancelled),
            _ => None,
        }
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Market: decoded ledger struct (authoritative)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: u64,
    pub cast_hash: String,
    pub creator: String,
    pub threshold: u64,
    /// Unix seconds.
    pub deadline: i64,
    pub resolved: bool,
    pub outcome: Outcome,
    /// Pool totals in ETH.
    pub moon_pool: Decimal,
    pub doom_pool: Decimal,
}

impl Market {
    pub fn display_status(&self) -> MarketStatus {
        MarketStatus::from_ledger(self.resolved, self.outcome)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.deadline
    }
}

/// Per-address stake on one market, read from the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBet {
    pub moon_stake: Decimal,
    pub doom_stake: Decimal,
    pub claimed: bool,
}

// ---------------------------------------------------------------------------
// MarketRow: market_index table row (derivative cache)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MarketRow {
    pub market_id: i64,
    pub cast_hash: String,
    pub creator: String,
    pub threshold: i64,
    pub deadline: i64,
    pub resolved: bool,
    pub outcome: String,
    pub status: String,
    pub moon_pool: Decimal,
    pub doom_pool: Decimal,
    pub author_fid: Option<i64>,
    pub author_username: Option<String>,
    pub author_display_name: Option<String>,
    pub author_pfp_url: Option<String>,
    pub cast_text: Option<String>,
    pub likes_count: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MarketRow {
    /// Build a row from ledger state with no cast metadata attached.
    pub fn from_market(market: &Market) -> Self {
        Self {
            market_id: market.id as i64,
            cast_hash: market.cast_hash.clone(),
            creator: market.creator.clone(),
            threshold: market.threshold as i64,
            deadline: market.deadline,
            resolved: market.resolved,
            outcome: market.outcome.as_str().to_string(),
            status: market.display_status().as_str().to_string(),
            moon_pool: market.moon_pool,
            doom_pool: market.doom_pool,
            author_fid: None,
            author_username: None,
            author_display_name: None,
            author_pfp_url: None,
            cast_text: None,
            likes_count: None,
            updated_at: None,
        }
    }

    /// Attach resolved cast metadata.
    pub fn with_cast(mut self, cast: &super::CastMetadata) -> Self {
        if super::is_full_cast_hash(&cast.hash) {
            self.cast_hash = cast.hash.clone();
        }
        self.author_fid = Some(cast.author.fid as i64);
        self.author_username = Some(cast.author.username.clone());
        self.author_display_name = cast.author.display_name.clone();
        self.author_pfp_url = cast.author.pfp_url.clone();
        self.cast_text = Some(cast.text.clone());
        self.likes_count = Some(cast.likes_count as i64);
        self
    }

    pub fn status(&self) -> Option<MarketStatus> {
        MarketStatus::from_db_str(&self.status)
    }

    pub fn author_label(&self) -> &str {
        self.author_username.as_deref().unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_ledger_outcome() {
        assert_eq!(MarketStatus::from_ledger(false, Outcome::Unresolved), MarketStatus::Active);
        assert_eq!(MarketStatus::from_ledger(true, Outcome::Moon), MarketStatus::Based);
        assert_eq!(MarketStatus::from_ledger(true, Outcome::Doom), MarketStatus::Erased);
        assert_eq!(
            MarketStatus::from_ledger(true, Outcome::Cancelled),
            MarketStatus::AdminCancelled
        );
        // An unresolved flag wins over a stale outcome value.
        assert_eq!(MarketStatus::from_ledger(false, Outcome::Moon), MarketStatus::Active);
    }

    #[test]
    fn outcome_rejects_unknown_discriminant() {
        assert_eq!(Outcome::try_from(2), Ok(Outcome::Doom));
        assert_eq!(Outcome::try_from(7), Err(7));
    }

    #[test]
    fn status_strings_round_trip_through_db_form() {
        for status in [
            MarketStatus::Active,
            MarketStatus::Based,
            MarketStatus::Erased,
            MarketStatus::AdminCancelled,
        ] {
            assert_eq!(MarketStatus::from_db_str(status.as_str()), Some(status));
        }
        assert_eq!(MarketStatus::from_db_str("resolved"), None);
    }
}
