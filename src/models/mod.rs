pub mod cast;
pub mod market;

pub use cast::{is_full_cast_hash, same_cast, CastAuthor, CastMetadata, CastSnapshot, LikeUpdate};
pub use market::{Market, MarketRow, MarketStatus, Outcome, UserBet};

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Side: which pool a bet goes into
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Moon,
    Doom,
}

impl Side {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moon" | "yes" => Some(Side::Moon),
            "doom" | "no" => Some(Side::Doom),
            _ => None,
        }
    }

    pub fn is_moon(self) -> bool {
        matches!(self, Side::Moon)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Moon => write!(f, "MOON"),
            Side::Doom => write!(f, "DOOM"),
        }
    }
}
