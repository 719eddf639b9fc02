//! Blocking HTTP client for article pages.

use super::SourceError;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use std::time::Duration;

pub(crate) const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; mediumconv/0.1; +https://github.com/mediumconv)";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;

/// Fetches article HTML. One request per call; failures are returned, not retried.
#[derive(Debug)]
pub struct Fetcher {
    inner: reqwest::blocking::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, SourceError> {
        Self::builder().build()
    }

    pub fn builder() -> FetcherBuilder {
        FetcherBuilder::default()
    }

    /// GET `url` and return the body as text. Non-2xx statuses are errors.
    pub fn fetch_html(&self, url: &str) -> Result<String, SourceError> {
        log::debug!("GET {}", url);
        let response = self
            .inner
            .get(url)
            .send()
            .map_err(|source| SourceError::Network {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response
            .text()
            .map_err(|source| SourceError::BodyRead { source })
    }
}

/// Builder for [Fetcher] with optional User-Agent, timeout, and session cookie.
#[derive(Debug)]
pub struct FetcherBuilder {
    user_agent: Option<String>,
    timeout_secs: u64,
    cookie: Option<String>,
}

impl Default for FetcherBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cookie: None,
        }
    }
}

impl FetcherBuilder {
    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Raw `Cookie` header sent with every request, e.g. a member session for paywalled posts.
    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        let cookie = cookie.into();
        self.cookie = (!cookie.trim().is_empty()).then_some(cookie);
        self
    }

    pub fn build(self) -> Result<Fetcher, SourceError> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let mut headers = HeaderMap::new();
        if let Some(cookie) = &self.cookie {
            let value = HeaderValue::from_str(cookie.trim()).map_err(|e| SourceError::Parse {
                message: format!("invalid cookie header: {}", e),
            })?;
            headers.insert(COOKIE, value);
        }
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|source| SourceError::Client { source })?;
        Ok(Fetcher { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accepts_cookie_and_timeout() -> Result<(), SourceError> {
        Fetcher::builder()
            .user_agent("test-agent")
            .timeout_secs(5)
            .cookie("sid=abc; uid=1")
            .build()?;
        Ok(())
    }

    #[test]
    fn blank_cookie_is_ignored() {
        let builder = Fetcher::builder().cookie("   ");
        assert!(builder.cookie.is_none());
    }

    #[test]
    fn cookie_with_control_characters_is_rejected() {
        let result = Fetcher::builder().cookie("sid=abc\nInjected: 1").build();
        assert!(matches!(result, Err(SourceError::Parse { .. })));
    }
}
