//! Reddit data source implementation.
//!
//! Channels are subreddit names.  Listings come from the OAuth API using an
//! application-only token (client-credentials grant), which is cached until
//! shortly before it expires.
//!
//! The JSON-to-[`Item`] conversion is split out into
//! [`RedditSource::parse_listing`] so it can be tested without the network.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{DataSource, Item};
use crate::config::RedditConfig;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
const WEB_BASE: &str = "https://reddit.com";

/// Tokens are refreshed this long before Reddit says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A `/r/{sub}/new` listing response.
#[derive(Debug, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
pub struct ListingChild {
    pub data: Post,
}

/// The subset of a Reddit "link" object the pipeline needs.
#[derive(Debug, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub permalink: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Fetches the newest posts of a subreddit.
pub struct RedditSource {
    client: Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl RedditSource {
    /// Build a source from API credentials.
    ///
    /// `timeout` bounds every HTTP call made by this source.
    pub fn new(config: &RedditConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .build()
            .context("building Reddit HTTP client")?;

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token: Mutex::new(None),
        })
    }

    /// Convert a listing into [`Item`]s for `channel`, preserving order.
    ///
    /// Relative permalinks are made absolute against `https://reddit.com`.
    pub fn parse_listing(listing: &Listing, channel: &str) -> Vec<Item> {
        listing
            .data
            .children
            .iter()
            .map(|child| {
                let post = &child.data;
                let permalink = if post.permalink.starts_with("http") {
                    post.permalink.clone()
                } else {
                    format!("{WEB_BASE}{}", post.permalink)
                };

                Item {
                    id: post.id.clone(),
                    channel: channel.to_string(),
                    author: post.author.clone(),
                    title: post.title.clone(),
                    body: post.selftext.clone(),
                    permalink,
                }
            })
            .collect()
    }

    /// Return a valid bearer token, requesting a fresh one if needed.
    fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .context("requesting Reddit access token")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Reddit token endpoint returned HTTP {status}");
        }

        let token: TokenResponse = response.json().context("decoding Reddit token")?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        tracing::debug!(expires_in = token.expires_in, "obtained Reddit access token");

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    fn forget_token(&self) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl DataSource for RedditSource {
    fn name(&self) -> &str {
        "reddit"
    }

    fn fetch(&self, channel: &str, limit: usize) -> Result<Vec<Item>> {
        let token = self.access_token()?;
        let url = format!("{API_BASE}/r/{channel}/new");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("limit", limit.to_string()), ("raw_json", "1".to_string())])
            .send()
            .with_context(|| format!("requesting r/{channel}"))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            // Revoked or expired early; the next cycle requests a new one.
            self.forget_token();
        }
        if !status.is_success() {
            bail!("r/{channel} returned HTTP {status}");
        }

        let listing: Listing = response
            .json()
            .with_context(|| format!("decoding r/{channel} listing"))?;

        let mut items = Self::parse_listing(&listing, channel);
        items.truncate(limit);
        Ok(items)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
