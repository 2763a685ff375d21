//! HTML page extraction.
//!
//! Downloads a page with retry, then collects the text of every element
//! matching the source's selector (or the `h1`, `h2`, `a` fallbacks).

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use scraper::{Html, Selector};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::config::{
    SourceConfig, DEFAULT_SELECTORS, FETCH_RETRY_INITIAL_DELAY_MS, FETCH_RETRY_MAX_ATTEMPTS,
    FETCH_RETRY_MAX_DELAY_SECS, MAX_PAGE_BODY_SIZE,
};
use crate::error_handling::ExtractionError;

use super::{Extractor, RawItem};

/// Backoff between page fetch attempts: 500ms, 1s, 2s, ... capped at the
/// max delay, with jitter.
fn fetch_retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(2)
        .factor(FETCH_RETRY_INITIAL_DELAY_MS / 2)
        .max_delay(Duration::from_secs(FETCH_RETRY_MAX_DELAY_SECS))
        .map(jitter)
        .take(FETCH_RETRY_MAX_ATTEMPTS.saturating_sub(1))
}

/// Extracts text items from HTML pages over HTTP.
pub struct HtmlExtractor {
    client: reqwest::Client,
    max_items: usize,
    max_body_size: usize,
}

impl HtmlExtractor {
    pub fn new(client: reqwest::Client, max_items: usize) -> Self {
        HtmlExtractor {
            client,
            max_items,
            max_body_size: MAX_PAGE_BODY_SIZE,
        }
    }

    /// Downloads `url`, retrying transient failures.
    async fn fetch_page(&self, url: &str) -> Result<String, ExtractionError> {
        RetryIf::spawn(
            fetch_retry_strategy(),
            || self.fetch_once(url),
            |e: &ExtractionError| {
                let retry = e.is_retriable();
                if retry {
                    log::warn!("Fetching {url} failed: {e}. Retrying");
                }
                retry
            },
        )
        .await
    }

    async fn fetch_once(&self, url: &str) -> Result<String, ExtractionError> {
        let request_error = |source| ExtractionError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(length) = response.content_length() {
            let size = usize::try_from(length).unwrap_or(usize::MAX);
            if size > self.max_body_size {
                return Err(ExtractionError::BodyTooLarge {
                    url: url.to_string(),
                    size,
                    limit: self.max_body_size,
                });
            }
        }

        let body = response.bytes().await.map_err(request_error)?;
        if body.len() > self.max_body_size {
            return Err(ExtractionError::BodyTooLarge {
                url: url.to_string(),
                size: body.len(),
                limit: self.max_body_size,
            });
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl Extractor for HtmlExtractor {
    async fn extract(&self, source: &SourceConfig) -> Result<Vec<RawItem>, ExtractionError> {
        let html = self.fetch_page(&source.url).await?;
        let texts = extract_texts(&html, source.selector.as_deref(), self.max_items)?;
        debug!("Extracted {} item(s) from {}", texts.len(), source.name);
        Ok(texts
            .into_iter()
            .map(|text| RawItem::new(source.name.clone(), text))
            .collect())
    }
}

/// Collects trimmed, non-empty element texts from `html`.
///
/// With a configured selector, matches are returned in document order. Without
/// one, each fallback selector is applied in turn (all `h1`s, then `h2`s, then
/// `a`s). At most `limit` items are returned.
///
/// Synchronous because the parsed document is not `Send`.
pub fn extract_texts(
    html: &str,
    selector: Option<&str>,
    limit: usize,
) -> Result<Vec<String>, ExtractionError> {
    let selectors: Vec<Selector> = match selector {
        Some(s) => vec![Selector::parse(s).map_err(|_| ExtractionError::InvalidSelector(s.to_string()))?],
        None => DEFAULT_SELECTORS
            .iter()
            .map(|s| Selector::parse(s).map_err(|_| ExtractionError::InvalidSelector(s.to_string())))
            .collect::<Result<_, _>>()?,
    };

    let document = Html::parse_document(html);
    let texts = selectors
        .iter()
        .flat_map(|sel| document.select(sel))
        .map(|element| {
            element
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty())
        .take(limit)
        .collect();
    Ok(texts)
}
