//! Open Graph image extraction.
//!
//! [`OgImageFetcher`] performs exactly one GET per call and never reports an
//! error to its caller: every failure is funnelled through [`absorb`], which
//! logs it and yields `None`. A failed fetch therefore looks the same as a
//! page without an `og:image` tag.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{info, warn};

use crate::config::FetcherConfig;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
pub const DEFAULT_USER_AGENT: &str = concat!("og-preview/", env!("CARGO_PKG_VERSION"));

static OG_IMAGE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:image"]"#).expect("static og:image selector")
});

#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// The `og:image` URL of the page at `url`, if one could be found.
    async fn extract_image(&self, url: &str) -> Option<String>;
}

/// Why a fetch produced no document to inspect.
#[derive(Debug, thiserror::Error)]
pub enum FetchFailure {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("failed to read body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

impl FetchFailure {
    pub fn is_timeout(&self) -> bool {
        match self {
            FetchFailure::Request(e) | FetchFailure::Body(e) => e.is_timeout(),
            FetchFailure::TooLarge { .. } => false,
        }
    }
}

/// The single place fetch failures are swallowed.
pub fn absorb(url: &str, failure: FetchFailure) -> Option<String> {
    warn!(
        url = %url,
        timeout = failure.is_timeout(),
        error = %failure,
        "og:image fetch failed; treating as no image"
    );
    None
}

/// First `og:image` content in the document. Blank content counts as absent.
pub fn parse_og_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&OG_IMAGE)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone)]
pub struct OgImageFetcher {
    http: Client,
    max_body_bytes: usize,
}

impl OgImageFetcher {
    pub fn new(timeout: Duration, max_body_bytes: usize, user_agent: &str) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self {
            http,
            max_body_bytes,
        })
    }

    pub fn from_config(cfg: &FetcherConfig) -> reqwest::Result<Self> {
        Self::new(
            Duration::from_secs(cfg.timeout_seconds),
            cfg.max_body_bytes,
            &cfg.user_agent,
        )
    }

    async fn fetch_body(&self, url: &str) -> Result<String, FetchFailure> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(FetchFailure::Request)?;

        let limit = self.max_body_bytes;
        if let Some(len) = response.content_length() {
            if len as usize > limit {
                return Err(FetchFailure::TooLarge { limit });
            }
        }

        // chunked responses carry no length; stop reading once past the cap
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(FetchFailure::Body)? {
            if body.len() + chunk.len() > limit {
                return Err(FetchFailure::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl MetadataFetcher for OgImageFetcher {
    async fn extract_image(&self, url: &str) -> Option<String> {
        let body = match self.fetch_body(url).await {
            Ok(body) => body,
            Err(failure) => return absorb(url, failure),
        };
        let image_url = parse_og_image(&body);
        info!(url = %url, image_url = ?image_url, "extracted og:image");
        image_url
    }
}
