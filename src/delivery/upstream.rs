#![forbid(unsafe_code)]

use super::{DeliveryError, DeliveryRequest, DeliveryResponse, DeliverySink};
use crate::config::RelayConfig;
use crate::error::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;

const SEND_PATH: [&str; 4] = ["product", "origination", "sms", "send"];

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub account_id: String,
    pub token: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl UpstreamSettings {
    /// `None` when the token or account id is missing, i.e. log-only mode.
    pub fn from_config(config: &RelayConfig) -> Option<Self> {
        Some(Self {
            base_url: config.upstream_base_url.clone(),
            account_id: config.account_id()?.to_string(),
            token: config.token()?.to_string(),
            timeout: config.upstream_timeout(),
            connect_timeout: config.upstream_connect_timeout(),
        })
    }
}

/// reqwest-backed sink for the provider's origination SMS endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    endpoint: Url,
    authorization: HeaderValue,
}

impl UpstreamClient {
    pub fn new(settings: UpstreamSettings) -> Result<Self> {
        let endpoint = send_endpoint(&settings.base_url, &settings.account_id)?;

        let mut authorization = HeaderValue::from_str(&format!("Basic {}", settings.token))
            .map_err(|err| crate::err!("invalid delivery token: {err}"))?;
        authorization.set_sensitive(true);

        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .context("failed to build upstream http client")?;

        Ok(Self {
            client,
            endpoint,
            authorization,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl DeliverySink for UpstreamClient {
    async fn deliver(
        &self,
        request: &DeliveryRequest,
    ) -> Result<DeliveryResponse, DeliveryError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, self.authorization.clone())
            .json(request)
            .send()
            .await
            .map_err(DeliveryError::Transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
            });
        }

        // A bare `null` acknowledgement carries no guid and reads as a rejection.
        let bytes = response.bytes().await.map_err(DeliveryError::Body)?;
        let decoded: Option<DeliveryResponse> = serde_json::from_slice(&bytes)?;
        Ok(decoded.unwrap_or_default())
    }
}

/// `{base}/account/{account_id}/product/origination/sms/send`, with the
/// account id percent-encoded as a single path segment.
pub fn send_endpoint(base_url: &str, account_id: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .with_context(|| format!("invalid upstream base url `{base_url}`"))?;

    url.path_segments_mut()
        .map_err(|_| crate::err!("upstream base url `{base_url}` cannot carry a path"))?
        .pop_if_empty()
        .push("account")
        .push(account_id)
        .extend(SEND_PATH);

    Ok(url)
}
