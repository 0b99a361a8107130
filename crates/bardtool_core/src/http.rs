use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use crate::error::MigrationError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 bardtool/0.2";
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

pub fn build_client(settings: &HttpSettings, follow_redirects: bool) -> Result<Client> {
    let policy = if follow_redirects {
        Policy::limited(10)
    } else {
        Policy::none()
    };
    Client::builder()
        .timeout(Duration::from_millis(settings.timeout_ms))
        .user_agent(settings.user_agent.clone())
        .redirect(policy)
        .build()
        .context("failed to build HTTP client")
}

/// Remote page and asset downloads. Failures are per URL; callers never retry.
pub trait HtmlFetcher {
    fn fetch_text(&mut self, url: &str) -> Result<String, MigrationError>;
    fn fetch_bytes(&mut self, url: &str) -> Result<FetchedBytes, MigrationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBytes {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings, true)?,
        })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, MigrationError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|error| MigrationError::network(url, describe(&error)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(MigrationError::network(url, format!("HTTP {}", status.as_u16())));
        }
        Ok(response)
    }
}

impl HtmlFetcher for HttpFetcher {
    fn fetch_text(&mut self, url: &str) -> Result<String, MigrationError> {
        self.get(url)?
            .text()
            .map_err(|error| MigrationError::network(url, describe(&error)))
    }

    fn fetch_bytes(&mut self, url: &str) -> Result<FetchedBytes, MigrationError> {
        let response = self.get(url)?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let bytes = response
            .bytes()
            .map_err(|error| MigrationError::network(url, describe(&error)))?;
        Ok(FetchedBytes {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

pub(crate) fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "timed out".to_string()
    } else {
        error.to_string()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::{FetchedBytes, HtmlFetcher};
    use crate::error::MigrationError;

    /// Serves canned bodies; unknown URLs fail like a 404.
    #[derive(Default)]
    pub struct MockFetcher {
        pub pages: HashMap<String, Vec<u8>>,
        pub requests: Vec<String>,
    }

    impl MockFetcher {
        pub fn with(mut self, url: &str, body: &[u8]) -> Self {
            self.pages.insert(url.to_string(), body.to_vec());
            self
        }
    }

    impl HtmlFetcher for MockFetcher {
        fn fetch_text(&mut self, url: &str) -> Result<String, MigrationError> {
            let fetched = self.fetch_bytes(url)?;
            Ok(String::from_utf8_lossy(&fetched.bytes).into_owned())
        }

        fn fetch_bytes(&mut self, url: &str) -> Result<FetchedBytes, MigrationError> {
            self.requests.push(url.to_string());
            match self.pages.get(url) {
                Some(body) => Ok(FetchedBytes {
                    bytes: body.clone(),
                    content_type: None,
                }),
                None => Err(MigrationError::network(url, "HTTP 404")),
            }
        }
    }
}
