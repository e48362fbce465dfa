//! Blocking HTTP sender backed by `reqwest`.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::config::HttpConfig;
use crate::error::{MtomError, Result};
use crate::transport::{HttpPost, HttpResponse};
use crate::xop::package::HttpHeaders;

/// Posts packages with a shared `reqwest` blocking client.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: Client,
}

impl ReqwestSender {
    /// `timeout` of `None` means the request may take arbitrarily long.
    pub fn new(timeout: Option<Duration>, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| MtomError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Use a preconfigured client (custom TLS roots, proxies, ...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        Self::new(timeout, &config.user_agent)
    }
}

impl HttpPost for ReqwestSender {
    fn post(&self, address: &str, body: Vec<u8>, headers: &HttpHeaders) -> Result<HttpResponse> {
        let mut request = self.client.post(address).body(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .map_err(|e| MtomError::Http(format!("POST {address} failed: {e}")))?;

        let status = response.status().as_u16();
        let headers: HttpHeaders = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .map_err(|e| MtomError::Http(format!("failed to read response from {address}: {e}")))?
            .to_vec();

        debug!(address, status, size = body.len(), "Received response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
