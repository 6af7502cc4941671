use serde::{Deserialize, Serialize};

use crate::models::{CastAuthor, CastMetadata};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiUser {
    pub fid: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub pfp_url: Option<String>,
    /// Reputation score in [0, 1]; newer API versions report it at top level.
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub experimental: Option<ApiUserExperimental>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiUserExperimental {
    #[serde(default)]
    pub neynar_user_score: Option<f64>,
}

impl ApiUser {
    pub fn reputation(&self) -> Option<f64> {
        self.score.or_else(|| {
            self.experimental
                .as_ref()
                .and_then(|e| e.neynar_user_score)
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiReactionCounts {
    #[serde(default)]
    pub likes_count: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiCast {
    pub hash: String,
    #[serde(default)]
    pub text: String,
    pub author: ApiUser,
    #[serde(default)]
    pub reactions: ApiReactionCounts,
}

impl From<ApiCast> for CastMetadata {
    fn from(cast: ApiCast) -> Self {
        CastMetadata {
            hash: cast.hash,
            text: cast.text,
            author: CastAuthor {
                fid: cast.author.fid,
                username: cast.author.username,
                display_name: cast.author.display_name,
                pfp_url: cast.author.pfp_url,
            },
            likes_count: cast.reactions.likes_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CastLookupResponse {
    pub cast: ApiCast,
}

#[derive(Debug, Deserialize)]
pub struct BulkCastsResponse {
    pub result: BulkCastsResult,
}

#[derive(Debug, Deserialize)]
pub struct BulkCastsResult {
    #[serde(default)]
    pub casts: Vec<ApiCast>,
}

#[derive(Debug, Deserialize)]
pub struct ApiReaction {
    pub user: ApiUser,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiCursor {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReactionsResponse {
    #[serde(default)]
    pub reactions: Vec<ApiReaction>,
    #[serde(default)]
    pub next: ApiCursor,
}

#[derive(Debug, Deserialize)]
pub struct BulkUsersResponse {
    #[serde(default)]
    pub users: Vec<ApiUser>,
}

#[derive(Debug, Serialize)]
pub struct PublishCastRequest<'a> {
    pub signer_uuid: &'a str,
    pub text: &'a str,
    pub parent: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Embed<'a> {
    pub url: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cast_lookup() {
        let body = r#"{
            "cast": {
                "hash": "0x5a1b2c3d4e5f60718293a4b5c6d7e8f901234567",
                "text": "gm",
                "author": {
                    "fid": 3,
                    "username": "dwr",
                    "display_name": "Dan",
                    "pfp_url": "https://example.com/dan.png"
                },
                "reactions": { "likes_count": 150, "recasts_count": 4, "likes": [] }
            }
        }"#;

        let parsed: CastLookupResponse = serde_json::from_str(body).unwrap();
        let meta: CastMetadata = parsed.cast.into();
        assert_eq!(meta.likes_count, 150);
        assert_eq!(meta.author.username, "dwr");
        assert_eq!(meta.author.display_name.as_deref(), Some("Dan"));
    }

    #[test]
    fn reactions_page_without_cursor() {
        let body = r#"{ "reactions": [ { "reaction_type": "like", "user": { "fid": 9 } } ], "next": { "cursor": null } }"#;
        let parsed: ReactionsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.reactions.len(), 1);
        assert!(parsed.next.cursor.is_none());
    }

    #[test]
    fn reputation_falls_back_to_experimental_score() {
        let body = r#"{ "users": [
            { "fid": 1, "username": "a", "score": 0.91 },
            { "fid": 2, "username": "b", "experimental": { "neynar_user_score": 0.42 } },
            { "fid": 3, "username": "c" }
        ] }"#;
        let parsed: BulkUsersResponse = serde_json::from_str(body).unwrap();
        let scores: Vec<Option<f64>> = parsed.users.iter().map(ApiUser::reputation).collect();
        assert_eq!(scores, vec![Some(0.91), Some(0.42), None]);
    }
}
