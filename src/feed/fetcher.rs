//! Feed fetching and parsing.
//!
//! [`FeedParser`] is the seam between the scheduler and the network.
//! [`HttpFeedParser`] is the production implementation: it downloads a URL
//! with `reqwest`, enforces size limits and hands the bytes to `feed-rs`.

use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use tracing::debug;

use super::types::{RawFeed, RawItem, MAX_DESCRIPTION_LENGTH};
use crate::config::FetcherConfig;
use crate::{GatorError, Result};

/// Turns a feed URL into raw items.
#[async_trait]
pub trait FeedParser: Send + Sync {
    /// Fetch and parse the feed at `url`.
    async fn fetch(&self, url: &str) -> Result<RawFeed>;
}

/// HTTP feed parser with timeouts and a size cap.
pub struct HttpFeedParser {
    client: Client,
    max_feed_size: u64,
}

impl HttpFeedParser {
    /// Create a parser from fetcher settings.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GatorError::Fetch(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_feed_size {
            return Err(GatorError::Fetch(format!(
                "feed too large: {} bytes (max {} bytes)",
                size, self.max_feed_size
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedParser for HttpFeedParser {
    async fn fetch(&self, url: &str) -> Result<RawFeed> {
        validate_url(url)?;
        debug!("Fetching feed {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatorError::Fetch(format!("failed to fetch feed: {e}")))?;

        if !response.status().is_success() {
            return Err(GatorError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            self.check_size(content_length)?;
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatorError::Fetch(format!("failed to read response: {e}")))?;
        self.check_size(bytes.len() as u64)?;

        parse_feed(&bytes)
    }
}

/// Check that a feed URL is absolute, has a host, and uses http or https.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| GatorError::Validation(format!("invalid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(GatorError::Validation(format!(
                "unsupported URL scheme: {scheme}"
            )));
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(GatorError::Validation("URL has no host".to_string()));
    }

    Ok(())
}

/// Parse feed bytes (RSS 0.9x/1.0/2.0, Atom, JSON Feed) into raw items.
///
/// Entry dates are rendered as RFC 3339 text; entries without a date get an
/// empty string and are rejected later by the ingester, as are years RFC 3339
/// cannot hold.
pub fn parse_feed(bytes: &[u8]) -> Result<RawFeed> {
    let feed =
        parser::parse(bytes).map_err(|e| GatorError::Fetch(format!("failed to parse feed: {e}")))?;

    let title = feed.title.map(|t| t.content).unwrap_or_default();

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let description = entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body))
                .map(|d| truncate_description(&strip_html(&d)))
                .unwrap_or_default();
            let published_at = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default();

            RawItem {
                title,
                link,
                description,
                published_at,
            }
        })
        .collect();

    Ok(RawFeed { title, items })
}

/// Strip HTML tags and decode common entities, collapsing whitespace.
fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut entity: Option<String> = None;

    for ch in html.chars() {
        if let Some(buf) = entity.as_mut() {
            if ch == ';' {
                push_entity(&mut out, buf);
                entity = None;
            } else if ch.is_alphanumeric() || ch == '#' {
                buf.push(ch);
            } else {
                out.push('&');
                out.push_str(buf);
                out.push(ch);
                entity = None;
            }
            continue;
        }

        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            '&' if !in_tag => entity = Some(String::new()),
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }

    if let Some(buf) = entity {
        out.push('&');
        out.push_str(&buf);
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_entity(out: &mut String, entity: &str) {
    match entity {
        "amp" => out.push('&'),
        "lt" => out.push('<'),
        "gt" => out.push('>'),
        "quot" => out.push('"'),
        "apos" => out.push('\''),
        "nbsp" => out.push(' '),
        _ => match parse_numeric_entity(entity).and_then(char::from_u32) {
            Some(c) => out.push(c),
            None => {
                out.push('&');
                out.push_str(entity);
                out.push(';');
            }
        },
    }
}

/// Parse a numeric HTML entity body (e.g. "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    let digits = entity.strip_prefix('#')?;
    match digits
        .strip_prefix('x')
        .or_else(|| digits.strip_prefix('X'))
    {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => digits.parse().ok(),
    }
}

fn truncate_description(text: &str) -> String {
    text.chars().take(MAX_DESCRIPTION_LENGTH).collect()
}
