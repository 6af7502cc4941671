use std::future::Future;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::types::{
    BulkCastsResponse, BulkUsersResponse, CastLookupResponse, Embed, PublishCastRequest,
    ReactionsResponse,
};
use super::{IdentifierKind, LikeTally, SocialApi, SocialError, UserReputation};
use crate::models::CastMetadata;

const REACTIONS_PAGE_SIZE: &str = "100";
const USERS_CHUNK: usize = 100;

/// Neynar v2 client for cast lookups, reactions, users and bot replies.
#[derive(Debug, Clone)]
pub struct NeynarClient {
    http: Client,
    base_url: String,
    api_key: String,
    signer_uuid: Option<String>,
}

impl NeynarClient {
    pub fn new(http: Client, base_url: &str, api_key: String, signer_uuid: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            signer_uuid,
        }
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, SocialError> {
        let raw = format!("{}{}", self.base_url, path);
        let parsed = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        parsed.map_err(|e| SocialError::Unexpected(format!("bad URL for {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, SocialError> {
        let resp = self
            .http
            .get(url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Err(SocialError::NotFound(what.to_string())),
            StatusCode::TOO_MANY_REQUESTS => return Err(SocialError::RateLimited),
            _ => {}
        }

        let body = resp.error_for_status()?.json::<T>().await?;
        Ok(body)
    }

    async fn reactions_page(
        &self,
        cast_hash: &str,
        cursor: Option<String>,
    ) -> Result<ReactionsResponse, SocialError> {
        let mut params = vec![
            ("hash", cast_hash),
            ("types", "likes"),
            ("limit", REACTIONS_PAGE_SIZE),
        ];
        if let Some(c) = cursor.as_deref() {
            params.push(("cursor", c));
        }
        let url = self.url("/v2/farcaster/reactions/cast", &params)?;
        self.get_json(url, &format!("reactions for {cast_hash}")).await
    }
}

#[async_trait]
impl SocialApi for NeynarClient {
    async fn lookup_cast(&self, identifier: &str) -> Result<CastMetadata, SocialError> {
        let kind = IdentifierKind::classify(identifier);
        let url = self.url(
            "/v2/farcaster/cast",
            &[("identifier", identifier), ("type", kind.as_str())],
        )?;

        let resp: CastLookupResponse = self.get_json(url, &format!("cast {identifier}")).await?;
        Ok(resp.cast.into())
    }

    async fn lookup_casts(&self, hashes: &[String]) -> Result<Vec<CastMetadata>, SocialError> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }

        let joined = hashes.join(",");
        let url = self.url("/v2/farcaster/casts", &[("casts", joined.as_str())])?;
        let resp: BulkCastsResponse = self.get_json(url, "casts").await?;

        Ok(resp.result.casts.into_iter().map(CastMetadata::from).collect())
    }

    async fn count_likes(&self, cast_hash: &str, max_pages: u32) -> Result<LikeTally, SocialError> {
        let (tally, pages) =
            walk_reactions(max_pages, |cursor| self.reactions_page(cast_hash, cursor)).await?;
        tracing::debug!(
            cast_hash,
            likes = tally.likes,
            pages,
            truncated = tally.truncated,
            "Counted likes"
        );
        Ok(tally)
    }

    async fn lookup_users(&self, fids: &[u64]) -> Result<Vec<UserReputation>, SocialError> {
        let mut out = Vec::with_capacity(fids.len());

        for chunk in fids.chunks(USERS_CHUNK) {
            let joined = chunk
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let url = self.url("/v2/farcaster/user/bulk", &[("fids", joined.as_str())])?;
            let resp: BulkUsersResponse = self.get_json(url, "users").await?;

            out.extend(resp.users.iter().map(|u| UserReputation {
                fid: u.fid,
                score: u.reputation(),
            }));
        }

        Ok(out)
    }

    async fn publish_reply(
        &self,
        parent_hash: &str,
        text: &str,
        embed_url: Option<&str>,
    ) -> Result<(), SocialError> {
        let signer_uuid = self
            .signer_uuid
            .as_deref()
            .ok_or(SocialError::NotConfigured("NEYNAR_SIGNER_UUID"))?;

        let body = PublishCastRequest {
            signer_uuid,
            text,
            parent: parent_hash,
            embeds: embed_url.map(|url| Embed { url }).into_iter().collect(),
        };

        let url = self.url("/v2/farcaster/cast", &[])?;
        self.http
            .post(url)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        tracing::info!(parent = parent_hash, "Published reply cast");
        Ok(())
    }
}

/// Follow reaction cursors until the list ends or `max_pages` pages were read.
/// Returns the tally and the number of pages fetched.
async fn walk_reactions<F, Fut>(max_pages: u32, mut fetch_page: F) -> Result<(LikeTally, u32), SocialError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<ReactionsResponse, SocialError>>,
{
    let mut tally = LikeTally::default();
    let mut cursor: Option<String> = None;
    let mut pages: u32 = 0;

    loop {
        let page = fetch_page(cursor.take()).await?;
        pages += 1;

        tally.liker_fids.extend(page.reactions.iter().map(|r| r.user.fid));

        match page.next.cursor {
            Some(next) if !next.is_empty() => {
                if pages >= max_pages {
                    tally.truncated = true;
                    break;
                }
                cursor = Some(next);
            }
            _ => break,
        }
    }

    tally.likes = tally.liker_fids.len() as u64;
    Ok((tally, pages))
}
