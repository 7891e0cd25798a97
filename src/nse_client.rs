use crate::config;
use crate::error::UpstreamError;
use crate::models::OptionChainSnapshot;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::{seq::SliceRandom, thread_rng};
use reqwest::{header, Client};
use tracing::{debug, error, warn};

/// Anything able to produce a fresh option chain snapshot.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn fetch(&self) -> Result<OptionChainSnapshot, UpstreamError>;
}

// -----------------------------------------------
// CLIENT WRAPPER WITH SESSION COOKIES
// -----------------------------------------------
pub struct NSEClient {
    client: Client,
    symbol: String,
}

impl NSEClient {
    pub fn new(symbol: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            symbol: symbol.into(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Hit the landing page so the cookie jar picks up the session cookies
    /// the API insists on. Best-effort: a failure here still lets the API
    /// call go ahead.
    async fn warmup(&self) {
        let res = self
            .client
            .get(config::NSE_BASE_URL)
            .header(header::ACCEPT, config::HEADER_ACCEPT_HTML)
            .header(header::REFERER, config::HEADER_REFERER_HOME)
            .send()
            .await;

        match res {
            Ok(res) => debug!(status = %res.status(), "NSE session warmup"),
            Err(e) => warn!(error = %e, "NSE session warmup failed, trying API anyway"),
        }
    }

    // -----------------------------------------------
    // FETCH OPTION CHAIN (single attempt, no retry)
    // -----------------------------------------------
    pub async fn fetch_option_chain(&self) -> Result<OptionChainSnapshot, UpstreamError> {
        self.warmup().await;

        let url = config::nse_option_chain_url(&self.symbol);
        let res = self
            .client
            .get(&url)
            .header(header::ACCEPT, config::HEADER_ACCEPT_JSON)
            .header(header::REFERER, config::HEADER_REFERER_DERIVATIVES)
            .header("X-Requested-With", config::HEADER_X_REQUESTED_WITH)
            .send()
            .await
            .inspect_err(|e| warn!(url = %url, error = %e, "Option chain request failed"))?;

        let status = res.status();
        let text = res.text().await?;

        if !status.is_success() {
            let excerpt = excerpt(&text);
            warn!(url = %url, status = %status, body = %excerpt, "Option chain request rejected");
            return Err(UpstreamError::Status { status, excerpt });
        }

        parse_chain_body(&text)
    }
}

#[async_trait]
impl ChainSource for NSEClient {
    async fn fetch(&self) -> Result<OptionChainSnapshot, UpstreamError> {
        self.fetch_option_chain().await
    }
}

/// Strictly parse an option chain body. On failure the error carries the
/// head of the body for diagnostics.
pub fn parse_chain_body(text: &str) -> Result<OptionChainSnapshot, UpstreamError> {
    match serde_json::from_str(text.trim()) {
        Ok(raw) => Ok(OptionChainSnapshot::new(raw)),
        Err(source) => {
            let excerpt = excerpt(text);
            error!(error = %source, body = %excerpt, "NSE parse error");
            Err(UpstreamError::Parse { excerpt, source })
        }
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(config::BODY_EXCERPT_CHARS).collect()
}

// -----------------------------------------------
// HTTP CLIENT BUILDER
// -----------------------------------------------
fn build_client() -> Result<Client> {
    let mut headers = header::HeaderMap::new();

    // Rotating Accept-Language headers (fingerprint avoidance)
    let lang = config::ACCEPT_LANGUAGES
        .choose(&mut thread_rng())
        .copied()
        .unwrap_or("en-US,en;q=0.9");
    headers.insert(header::ACCEPT_LANGUAGE, header::HeaderValue::from_str(lang)?);
    headers.insert(header::CONNECTION, header::HeaderValue::from_static("keep-alive"));

    Client::builder()
        .default_headers(headers)
        .cookie_store(true) // crucial for NSE
        .gzip(true)
        .user_agent(config::USER_AGENT)
        .timeout(config::HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_body() {
        let body = r#"  {"filtered":{"data":[{"strikePrice":26500}]}}  "#;
        let snapshot = parse_chain_body(body).unwrap();
        assert_eq!(snapshot.rows().len(), 1);
    }

    #[test]
    fn test_parse_html_body_keeps_excerpt() {
        let body = format!("<html>{}</html>", "x".repeat(1000));
        match parse_chain_body(&body) {
            Err(UpstreamError::Parse { excerpt, .. }) => {
                assert_eq!(excerpt.chars().count(), config::BODY_EXCERPT_CHARS);
                assert!(excerpt.starts_with("<html>"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_body_fails() {
        assert!(matches!(
            parse_chain_body(""),
            Err(UpstreamError::Parse { .. })
        ));
    }

    #[test]
    fn test_client_builds() {
        let client = NSEClient::new("NIFTY").unwrap();
        assert_eq!(client.symbol(), "NIFTY");
    }
}
