use std::time::Duration;

use log::{info, warn};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};

use crate::config::FetchConfig;
use crate::error::FetchError;

const DEFAULT_USER_AGENT: &str = concat!("apiscout/", env!("CARGO_PKG_VERSION"));
const SPEC_ACCEPT: &str = "application/json, application/yaml;q=0.9, text/yaml;q=0.9, */*;q=0.8";

/// Build an HTTP client carrying the configured timeout, user agent and
/// extra headers. Header entries that are not valid HTTP are skipped.
pub fn build_client(config: &FetchConfig) -> Result<reqwest::Client, FetchError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!("skipping invalid header {name}"),
        }
    }
    reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(
            config
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        )
        .default_headers(headers)
        .build()
        .map_err(FetchError::Client)
}

/// Map a transport failure to [`FetchError`], separating timeouts.
pub fn classify(url: &str, timeout: Duration, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        FetchError::Request {
            url: url.to_string(),
            source: err,
        }
    }
}

/// Downloads specification documents.
#[derive(Debug, Clone)]
pub struct SpecFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl SpecFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(config)?,
            timeout: config.timeout(),
        })
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch_with_timeout(url, self.timeout).await
    }

    /// Fetch with a per-call deadline overriding the configured one.
    pub async fn fetch_with_timeout(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, FetchError> {
        info!("fetching {url}");
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, SPEC_ACCEPT)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(url, timeout, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout,
                }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;
        Ok(bytes.to_vec())
    }
}
