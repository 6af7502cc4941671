use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Length cut-off between a full cast hash and a truncated identifier taken
/// from a cast URL. Shorter hashes go through the heal path and are
/// re-resolved before use.
pub const MIN_FULL_HASH_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastAuthor {
    pub fid: u64,
    pub username: String,
    pub display_name: Option<String>,
    pub pfp_url: Option<String>,
}

/// Cast metadata and engagement counts as reported by the social API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMetadata {
    pub hash: String,
    pub text: String,
    pub author: CastAuthor,
    pub likes_count: u64,
}

/// Proof that a cast existed at some point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CastSnapshot {
    pub cast_hash: String,
    pub author_fid: Option<i64>,
    pub likes_count: i64,
    pub captured_at: DateTime<Utc>,
}

impl CastSnapshot {
    pub fn of(cast: &CastMetadata) -> Self {
        Self {
            cast_hash: cast.hash.clone(),
            author_fid: Some(cast.author.fid as i64),
            likes_count: cast.likes_count as i64,
            captured_at: Utc::now(),
        }
    }
}

/// A refreshed like count for one cached market.
#[derive(Debug, Clone, PartialEq)]
pub struct LikeUpdate {
    pub market_id: i64,
    pub likes_count: i64,
}

/// True when `hash` is a full `0x`-prefixed hex cast hash.
pub fn is_full_cast_hash(hash: &str) -> bool {
    let Some(hex) = hash.strip_prefix("0x") else {
        return false;
    };
    hash.len() >= MIN_FULL_HASH_LEN && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// True when two identifiers name the same cast, allowing one of them to be a
/// truncated prefix (at least "0x" + 8 hex chars) of the other.
pub fn same_cast(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b {
        return true;
    }
    let (short, long) = if a.len() < b.len() { (&a, &b) } else { (&b, &a) };
    short.len() >= 10 && short.starts_with("0x") && long.starts_with(short.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_hash_matches_its_full_form() {
        let full = "0x5a1b2c3d4e5f60718293a4b5c6d7e8f901234567";
        assert!(same_cast(full, "0x5A1B2C3D4E5F60718293A4B5C6D7E8F901234567"));
        assert!(same_cast("0x5a1b2c3d", full));
        assert!(!same_cast("0x5a1b", full));
        assert!(!same_cast("0x5a1b2c3e", full));
    }

    #[test]
    fn full_hash_detection() {
        assert!(is_full_cast_hash("0x5a1b2c3d4e5f60718293a4b5c6d7e8f901234567"));
        assert!(!is_full_cast_hash("0x5a1b2c3d"));
        assert!(!is_full_cast_hash("https://warpcast.com/dan/0x5a1b2c3d"));
        assert!(!is_full_cast_hash("0xzz1b2c3d4e5f60718293a4b5c6d7e8f901234567"));
    }
}
