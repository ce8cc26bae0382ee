//! Fetches public discussion threads from the Reddit JSON endpoints.
//!
//! Two read paths feed the aggregation operations:
//! - **Search** (`/search.json`) — relevance-ordered listings, recency
//!   filtered and capped, optionally reduced to light [`ThreadSnippet`]s.
//! - **Thread detail** (`{permalink}.json`) — the primary post plus its
//!   direct replies, reduced to a bounded [`ThreadSummary`].
//!
//! All reads are single-shot: no retries, no pagination. A failed call
//! surfaces as a [`FetchError`] and the caller decides whether to degrade
//! or abort. Truncation is character based, so multi-byte text never
//! splits mid-codepoint.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Acceptable thread age for discussion searches.
pub const SEARCH_WINDOW: RecencyWindow = RecencyWindow::years(3);
/// Threads kept per search after recency filtering.
pub const DEFAULT_KEEP: usize = 3;
/// Character cap on post bodies and on the joined comment text.
pub const MAX_TEXT_CHARS: usize = 1500;
/// Character cap on listing-only snippets.
pub const SNIPPET_CHARS: usize = 220;

const SEARCH_URL: &str = "https://www.reddit.com/search.json";
const BASE_URL: &str = "https://www.reddit.com";
const USER_AGENT: &str = concat!("uniscope/", env!("CARGO_PKG_VERSION"));
/// Direct replies considered per thread, in listing order.
const MAX_COMMENTS: usize = 10;

// ============ Errors ============

/// A single outbound fetch failed. Callers choose degrade or abort.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The discussion API answered with a non-success status.
    #[error("discussion API returned status {0}")]
    Status(u16),
    /// Connect, timeout, or body-decode failure.
    #[error("discussion API request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

// ============ Data types ============

/// Age window applied to search results. Items without a numeric
/// creation timestamp never pass the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyWindow {
    seconds: i64,
}

impl RecencyWindow {
    /// Window spanning `years` 365-day years.
    pub const fn years(years: i64) -> Self {
        Self {
            seconds: years * 365 * 24 * 60 * 60,
        }
    }

    /// Oldest acceptable creation time (epoch seconds) relative to `now`.
    pub fn cutoff_from(&self, now_epoch_seconds: i64) -> i64 {
        now_epoch_seconds - self.seconds
    }
}

/// One row of a search result, as returned by the listing endpoint.
#[derive(Debug, Clone)]
pub struct ThreadListing {
    pub title: String,
    pub permalink: String,
    pub self_text: String,
    pub score: Option<i64>,
    pub subreddit: Option<String>,
    pub created_at_epoch_seconds: Option<i64>,
}

/// A fully-fetched thread: primary post plus joined direct replies,
/// bounded for prompt embedding. Serialized camelCase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub title: String,
    pub body_text: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at_epoch_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subreddit: Option<String>,
    pub top_comments_text: String,
}

/// Listing-only thread digest for operations that never follow permalinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSnippet {
    pub title: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subreddit: Option<String>,
}

// ============ Source trait ============

/// Read-only access to public discussion threads.
///
/// The orchestrator depends on this seam so fetch branches can be
/// stubbed in tests without a network.
#[async_trait]
pub trait ThreadSource: Send + Sync {
    /// Search threads for `query`, keeping at most `keep` results inside
    /// `window`, in service relevance order.
    async fn search_threads(
        &self,
        query: &str,
        window: RecencyWindow,
        keep: usize,
    ) -> Result<Vec<ThreadListing>, FetchError>;

    /// Fetch one thread by permalink and reduce it to a [`ThreadSummary`].
    async fn fetch_thread_detail(&self, permalink: &str) -> Result<ThreadSummary, FetchError>;

    /// Search-only variant returning [`ThreadSnippet`]s; no follow-up
    /// requests per result.
    async fn light_snippets(
        &self,
        query: &str,
        window: RecencyWindow,
        keep: usize,
    ) -> Result<Vec<ThreadSnippet>, FetchError>;
}

// ============ Reddit client ============

/// [`ThreadSource`] over the public Reddit JSON API.
#[derive(Clone)]
pub struct RedditClient {
    http: reqwest::Client,
}

impl RedditClient {
    /// Build a client with a stable `User-Agent` and a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("building discussion HTTP client")?;
        Ok(Self { http })
    }

    async fn search_listings(
        &self,
        query: &str,
        window: RecencyWindow,
        keep: usize,
    ) -> Result<Vec<ThreadListing>, FetchError> {
        let response = self
            .http
            .get(SEARCH_URL)
            .query(&[("q", query), ("limit", "10"), ("sort", "relevance")])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let json: Value = response.json().await?;
        let cutoff = window.cutoff_from(Utc::now().timestamp());
        let listings = recent_listings(&json, cutoff, keep);
        tracing::debug!(query, kept = listings.len(), "discussion search complete");
        Ok(listings)
    }
}

#[async_trait]
impl ThreadSource for RedditClient {
    async fn search_threads(
        &self,
        query: &str,
        window: RecencyWindow,
        keep: usize,
    ) -> Result<Vec<ThreadListing>, FetchError> {
        self.search_listings(query, window, keep).await
    }

    async fn fetch_thread_detail(&self, permalink: &str) -> Result<ThreadSummary, FetchError> {
        let url = format!("{BASE_URL}{permalink}.json");
        let response = self.http.get(&url).query(&[("limit", "20")]).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let json: Value = response.json().await?;
        Ok(summary_from_thread_json(&json, permalink))
    }

    async fn light_snippets(
        &self,
        query: &str,
        window: RecencyWindow,
        keep: usize,
    ) -> Result<Vec<ThreadSnippet>, FetchError> {
        let listings = self.search_listings(query, window, keep).await?;
        Ok(listings.iter().map(snippet_from_listing).collect())
    }
}

// ============ Payload reduction ============

/// Cut `text` to at most `max_chars` characters, preserving a prefix.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn recent_listings(search_json: &Value, cutoff: i64, keep: usize) -> Vec<ThreadListing> {
    let mut listings: Vec<ThreadListing> = search_json
        .pointer("/data/children")
        .and_then(|c| c.as_array())
        .map(|c| c.as_slice())
        .unwrap_or(&[])
        .iter()
        .filter_map(listing_from_child)
        .filter(|listing| {
            listing
                .created_at_epoch_seconds
                .is_some_and(|created| created >= cutoff)
        })
        .collect();
    listings.truncate(keep);
    listings
}

fn listing_from_child(child: &Value) -> Option<ThreadListing> {
    let data = child.get("data")?;
    Some(ThreadListing {
        title: text_field(data, "title"),
        permalink: text_field(data, "permalink"),
        self_text: text_field(data, "selftext"),
        score: data.get("score").and_then(|s| s.as_i64()),
        subreddit: data
            .get("subreddit")
            .and_then(|s| s.as_str())
            .map(|s| s.to_string()),
        created_at_epoch_seconds: data
            .get("created_utc")
            .and_then(|c| c.as_f64())
            .map(|c| c as i64),
    })
}

fn snippet_from_listing(listing: &ThreadListing) -> ThreadSnippet {
    ThreadSnippet {
        title: listing.title.clone(),
        snippet: truncate_chars(&listing.self_text, SNIPPET_CHARS),
        score: listing.score,
        subreddit: listing.subreddit.clone(),
    }
}

/// Reduce the two-listing thread payload (post listing, comment listing)
/// to a [`ThreadSummary`]. Missing pieces become empty fields, never errors.
fn summary_from_thread_json(thread_json: &Value, requested_permalink: &str) -> ThreadSummary {
    let post = thread_json.pointer("/0/data/children/0/data");
    let empty = Vec::new();
    let comments = thread_json
        .pointer("/1/data/children")
        .and_then(|c| c.as_array())
        .unwrap_or(&empty);

    let body = post.map(|p| text_field(p, "selftext")).unwrap_or_default();
    let permalink = post
        .and_then(|p| p.get("permalink"))
        .and_then(|p| p.as_str())
        .unwrap_or(requested_permalink);

    ThreadSummary {
        title: post.map(|p| text_field(p, "title")).unwrap_or_default(),
        body_text: truncate_chars(&body, MAX_TEXT_CHARS),
        url: format!("{BASE_URL}{permalink}"),
        score: post.and_then(|p| p.get("score")).and_then(|s| s.as_i64()),
        comment_count: post
            .and_then(|p| p.get("num_comments"))
            .and_then(|n| n.as_i64()),
        created_at_epoch_seconds: post
            .and_then(|p| p.get("created_utc"))
            .and_then(|c| c.as_f64())
            .map(|c| c as i64),
        subreddit: post
            .and_then(|p| p.get("subreddit"))
            .and_then(|s| s.as_str())
            .map(|s| s.to_string()),
        top_comments_text: top_comments_text(comments),
    }
}

/// Join the bodies of up to [`MAX_COMMENTS`] direct (`t1`) replies with
/// blank lines, then truncate.
fn top_comments_text(children: &[Value]) -> String {
    let bodies: Vec<&str> = children
        .iter()
        .filter(|child| child.get("kind").and_then(|k| k.as_str()) == Some("t1"))
        .take(MAX_COMMENTS)
        .filter_map(|child| child.pointer("/data/body").and_then(|b| b.as_str()))
        .filter(|body| !body.is_empty())
        .collect();
    truncate_chars(&bodies.join("\n\n"), MAX_TEXT_CHARS)
}

fn text_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}
