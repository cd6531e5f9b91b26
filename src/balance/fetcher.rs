use super::BalanceSource;
use crate::config::defaults::FETCH_TIMEOUT;
use crate::config::Credentials;
use crate::error::{ExporterError, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Longest first line accepted from the billing API.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Balance inquiry against the Stream Telecom HTTP API.
///
/// Issues `GET <api_url>?user=<login>&pwd=<password>&balance=1` and returns
/// the first line of the response body. Only the first line is read from
/// the network. No retries happen here.
pub struct HttpBalanceSource {
    client: Client,
    api_url: String,
    credentials: Arc<Credentials>,
}

impl HttpBalanceSource {
    pub fn new(api_url: impl Into<String>, credentials: Arc<Credentials>) -> Result<Self> {
        Self::with_timeout(api_url, credentials, FETCH_TIMEOUT)
    }

    pub fn with_timeout(
        api_url: impl Into<String>,
        credentials: Arc<Credentials>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| fetch_error(&credentials, "Cannot create request", e))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            credentials,
        })
    }

    fn request_url(&self) -> Result<Url> {
        Url::parse_with_params(
            &self.api_url,
            &[
                ("user", self.credentials.login()),
                ("pwd", self.credentials.password()),
                ("balance", "1"),
            ],
        )
        .map_err(|e| fetch_error(&self.credentials, "Cannot create request", e))
    }
}

#[async_trait]
impl BalanceSource for HttpBalanceSource {
    async fn fetch_balance(&self) -> Result<String> {
        let url = self.request_url()?;

        // reqwest errors carry the full URL, query string included.
        let mut response = self.client.get(url).send().await.map_err(|e| {
            fetch_error(
                &self.credentials,
                &format!("Request error ({})", self.api_url),
                e.without_url(),
            )
        })?;

        debug!("Balance API responded with status {}", response.status());

        let mut line: Vec<u8> = Vec::new();
        loop {
            if let Some(end) = line.iter().position(|&b| b == b'\n') {
                line.truncate(end);
                break;
            }
            if line.len() > MAX_LINE_LENGTH {
                break;
            }

            let chunk = response.chunk().await.map_err(|e| {
                fetch_error(&self.credentials, "Cannot parse response body", e.without_url())
            })?;
            match chunk {
                Some(chunk) => line.extend_from_slice(&chunk),
                None if line.is_empty() => {
                    return Err(fetch_error(&self.credentials, "Cannot parse response body", "empty body"));
                }
                None => break,
            }
        }

        if line.len() > MAX_LINE_LENGTH {
            return Err(fetch_error(
                &self.credentials,
                "Cannot parse response body",
                format!("first line is longer than {} bytes", MAX_LINE_LENGTH),
            ));
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

fn fetch_error(credentials: &Credentials, context: &str, err: impl Display) -> ExporterError {
    ExporterError::Fetch(credentials.redact(&format!("{}: {}", context, err)))
}
