//! Reddit listing source (`/r/all/hot.json` by default).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::models::SourceExcerpt;
use crate::sources::{ExcerptSource, SourceError};

const REDDIT_BASE_URL: &str = "https://www.reddit.com";
const USER_AGENT: &str = concat!("storyweave/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Listing {
    data: Option<ListingData>,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Option<Vec<Child>>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    title: String,
    permalink: String,
    subreddit: String,
}

impl From<Post> for SourceExcerpt {
    fn from(post: Post) -> Self {
        SourceExcerpt {
            text: post.title,
            origin_label: format!("r/{}", post.subreddit),
            url: format!("{REDDIT_BASE_URL}{}", post.permalink),
        }
    }
}

/// Fetches posts from a Reddit listing endpoint.
#[derive(Clone)]
pub struct RedditSource {
    client: Client,
    listing_url: String,
}

impl RedditSource {
    pub fn new(listing_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            listing_url: listing_url.into(),
        }
    }
}

#[async_trait]
impl ExcerptSource for RedditSource {
    async fn fetch(&self, count: usize) -> Result<Vec<SourceExcerpt>, SourceError> {
        let response = self
            .client
            .get(&self.listing_url)
            .query(&[("limit", count)])
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let excerpts = parse_listing(&body, count)?;
        debug!(count = excerpts.len(), url = %self.listing_url, "Fetched excerpts");
        Ok(excerpts)
    }
}

/// Parses a listing body into at most `count` excerpts.
fn parse_listing(body: &str, count: usize) -> Result<Vec<SourceExcerpt>, SourceError> {
    let listing: Listing = serde_json::from_str(body)
        .map_err(|e| SourceError::InvalidPayload(e.to_string()))?;

    let children = listing
        .data
        .and_then(|d| d.children)
        .ok_or_else(|| SourceError::InvalidPayload("missing data.children".to_string()))?;

    Ok(children
        .into_iter()
        .take(count)
        .map(|c| SourceExcerpt::from(c.data))
        .collect())
}
