use std::time::Duration;

use async_trait::async_trait;
use html_escape::decode_html_entities;
use reqwest::Client;
use rss::Channel;
use serde::Serialize;

use crate::error::{AppError, FetchError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const USER_AGENT: &str = concat!("gator/", env!("CARGO_PKG_VERSION"));

/// A parsed RSS document. Text fields are already HTML-unescaped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RssFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RssItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Raw `pubDate` text; interpreting it is up to the ingestor.
    pub pub_date: String,
}

#[async_trait]
pub trait FetchFeed: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<RssFeed, FetchError>;
}

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Fetch(e.into()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FetchFeed for FeedFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<RssFeed, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let bytes = response.bytes().await?;
        parse_feed(&bytes)
    }
}

/// Parses an RSS 2.0 document and unescapes HTML entities in its titles and
/// descriptions.
pub fn parse_feed(bytes: &[u8]) -> std::result::Result<RssFeed, FetchError> {
    let channel = Channel::read_from(bytes)?;

    let items = channel
        .items()
        .iter()
        .map(|item| RssItem {
            title: unescape(item.title().unwrap_or_default()),
            link: item.link().unwrap_or_default().to_string(),
            description: unescape(item.description().unwrap_or_default()),
            pub_date: item.pub_date().unwrap_or_default().to_string(),
        })
        .collect();

    Ok(RssFeed {
        title: unescape(channel.title()),
        link: channel.link().to_string(),
        description: unescape(channel.description()),
        items,
    })
}

fn unescape(text: &str) -> String {
    decode_html_entities(text).into_owned()
}
