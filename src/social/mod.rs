pub mod neynar;
pub mod types;

pub use neynar::NeynarClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::CastMetadata;

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited by social API")]
    RateLimited,

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// Result of walking a cast's paginated like list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LikeTally {
    pub likes: u64,
    pub liker_fids: Vec<u64>,
    /// The page cap was hit before the list ended; `likes` is a lower bound.
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserReputation {
    pub fid: u64,
    pub score: Option<f64>,
}

/// External social-graph API.
#[async_trait]
pub trait SocialApi: Send + Sync {
    /// Resolve a cast URL or hash to metadata and engagement counts.
    async fn lookup_cast(&self, identifier: &str) -> Result<CastMetadata, SocialError>;

    /// Bulk lookup by full hash. Unknown hashes are simply absent.
    async fn lookup_casts(&self, hashes: &[String]) -> Result<Vec<CastMetadata>, SocialError>;

    /// Count likes by paging through reactions, stopping after `max_pages`.
    async fn count_likes(&self, cast_hash: &str, max_pages: u32) -> Result<LikeTally, SocialError>;

    async fn lookup_users(&self, fids: &[u64]) -> Result<Vec<UserReputation>, SocialError>;

    /// Publish a reply under `parent_hash`, optionally embedding a link.
    async fn publish_reply(
        &self,
        parent_hash: &str,
        text: &str,
        embed_url: Option<&str>,
    ) -> Result<(), SocialError>;
}

/// How an identifier should be resolved by the social API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Url,
    Hash,
}

impl IdentifierKind {
    pub fn classify(identifier: &str) -> Self {
        if identifier.starts_with("http://") || identifier.starts_with("https://") {
            IdentifierKind::Url
        } else {
            IdentifierKind::Hash
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IdentifierKind::Url => "url",
            IdentifierKind::Hash => "hash",
        }
    }
}

/// Canonical cast URL used to re-resolve a truncated hash.
pub fn cast_url(username: &str, partial_hash: &str) -> String {
    format!("https://warpcast.com/{username}/{partial_hash}")
}
