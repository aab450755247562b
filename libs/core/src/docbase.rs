//! DocBase document fetching and post-link extraction.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::error::StoreError;

/// Title and body of a fetched document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Post {
    pub title: String,
    pub body: String,
}

/// Content-store collaborator: fetch a document by its numeric id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_post(&self, id: u64) -> Result<Post, StoreError>;
}

pub struct DocbaseClient {
    http: reqwest::Client,
    domain: String,
    token: String,
    api_base: String,
}

impl DocbaseClient {
    pub fn new(
        http: reqwest::Client,
        domain: impl Into<String>,
        token: impl Into<String>,
        api_base: Option<String>,
    ) -> Self {
        Self {
            http,
            domain: domain.into(),
            token: token.into(),
            api_base: api_base.unwrap_or_else(|| "https://api.docbase.io".into()),
        }
    }

    fn post_url(&self, id: u64) -> String {
        format!(
            "{}/teams/{}/posts/{id}",
            self.api_base.trim_end_matches('/'),
            self.domain
        )
    }
}

#[async_trait]
impl DocumentStore for DocbaseClient {
    async fn get_post(&self, id: u64) -> Result<Post, StoreError> {
        let response = self
            .http
            .get(self.post_url(id))
            .header("X-DocBaseToken", &self.token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

/// Pull the 7-digit post id out of text containing a
/// `https://{domain}.docbase.io/posts/{id}` link for the configured team.
/// Links for other teams do not match.
pub fn extract_post_id(domain: &str, text: &str) -> Option<u64> {
    let pattern = format!(
        r"https://{}\.docbase\.io/posts/([0-9]{{7}})",
        regex::escape(domain)
    );
    // The domain comes from config, so the pattern is built at runtime; this
    // path runs at most once per webhook.
    let link = Regex::new(&pattern).ok()?;
    link.captures(text)?[1].parse().ok()
}
