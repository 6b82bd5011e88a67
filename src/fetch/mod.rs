//! Page title lookup for URL entries.
//!
//! [`TitleFetcher`] never fails: any problem means the title is unknown.

use crate::models::parse_url;
use regex::Regex;
use std::io::Read;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::instrument;

/// Only the head of a page is read when looking for its title.
const MAX_BODY_BYTES: u64 = 512 * 1024;

/// Connect timeout, capped by the overall timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").unwrap_or_else(|_| unreachable!())
});

static NUMERIC_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap_or_else(|_| unreachable!())
});

/// Looks up the title of a web page.
pub trait TitleFetcher: Send + Sync {
    /// Returns the page title, or `None` if it cannot be determined.
    fn fetch_title(&self, url: &str) -> Option<String>;
}

/// Fetches titles over HTTP.
///
/// If no HTTP client can be built, every lookup yields `None`.
pub struct HttpTitleFetcher {
    client: Option<reqwest::blocking::Client>,
}

impl HttpTitleFetcher {
    /// Creates a fetcher whose requests give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::from_builder(
            reqwest::blocking::Client::builder()
                .timeout(timeout)
                .connect_timeout(CONNECT_TIMEOUT.min(timeout))
                .user_agent(concat!("sarathi/", env!("CARGO_PKG_VERSION"))),
        )
    }

    fn from_builder(builder: reqwest::blocking::ClientBuilder) -> Self {
        let client = builder
            .build()
            .inspect_err(|err| {
                tracing::warn!("Failed to build title HTTP client, titles are disabled: {err}");
            })
            .ok();
        Self { client }
    }

    fn fetch(&self, url: &str) -> Result<Option<String>, String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| "no HTTP client".to_string())?;
        let url = parse_url(url).ok_or_else(|| format!("not a URL: {url}"))?;
        let response = client
            .get(url)
            .send()
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }

        let mut body = Vec::new();
        response
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut body)
            .map_err(|e| e.to_string())?;

        Ok(extract_title(&String::from_utf8_lossy(&body)))
    }
}

impl TitleFetcher for HttpTitleFetcher {
    #[instrument(skip(self), fields(operation = "fetch.title"))]
    fn fetch_title(&self, url: &str) -> Option<String> {
        let (title, status) = match self.fetch(url) {
            Ok(Some(title)) => (Some(title), "success"),
            Ok(None) => (None, "no_title"),
            Err(cause) => {
                tracing::warn!(url, cause, "Could not fetch page title");
                (None, "error")
            },
        };
        metrics::counter!("title_fetch_total", "status" => status).increment(1);
        title
    }
}

/// Extracts and cleans the `<title>` of an HTML document.
///
/// Common entities are decoded and whitespace is collapsed. An empty
/// title counts as none.
#[must_use]
pub fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE_PATTERN.captures(html)?.get(1)?.as_str();
    let decoded = decode_entities(raw);
    let title = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    Some(title).filter(|t| !t.is_empty())
}

fn decode_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures<'_>| {
        let code = &caps[1];
        let parsed = code
            .strip_prefix('x')
            .map_or_else(|| code.parse::<u32>().ok(), |hex| u32::from_str_radix(hex, 16).ok());
        parsed
            .and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    });

    numeric
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
