use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use shockbot_common::DeviceConfig;
use shockbot_core::{ActuationRequest, DeviceApi};
use shockbot_store::CompleteCredentials;
use tracing::debug;

const OPERATE_PATH: &str = "/api/apioperate";
const OP_SHOCK: u8 = 0;

/// Replies the vendor sends when the command was delivered.
const SUCCESS_PREFIXES: [&str; 2] = ["Operation Succeeded", "Operation Attempted"];

#[derive(Debug, Clone)]
pub struct PiShockClient {
    client: Client,
    api_base: String,
    operator_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct OperateRequest<'a> {
    username: &'a str,
    apikey: &'a str,
    code: &'a str,
    name: &'a str,
    op: u8,
    duration: u8,
    intensity: u8,
}

impl PiShockClient {
    pub fn new(api_base: &str, operator_name: &str, timeout_ms: u64) -> Result<Self> {
        let api_base = api_base.trim().trim_end_matches('/');
        if api_base.is_empty() {
            bail!("device api base url is empty");
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .default_headers(headers)
            .build()
            .with_context(|| "failed to build device HTTP client")?;

        Ok(Self {
            client,
            api_base: api_base.to_string(),
            operator_name: operator_name.to_string(),
        })
    }

    pub fn from_config(config: &DeviceConfig) -> Result<Self> {
        Self::new(&config.api_base, &config.operator_name, config.timeout_ms)
    }

    pub async fn operate(
        &self,
        credentials: CompleteCredentials<'_>,
        request: &ActuationRequest,
    ) -> Result<()> {
        let body = OperateRequest {
            username: credentials.username,
            apikey: credentials.api_key,
            code: credentials.device_code,
            name: &self.operator_name,
            op: OP_SHOCK,
            duration: request.duration_seconds(),
            intensity: request.intensity(),
        };
        let response = self
            .client
            .post(format!("{}{OPERATE_PATH}", self.api_base))
            .json(&body)
            .send()
            .await
            .with_context(|| "failed to reach device api")?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("device api returned {} {}", status.as_u16(), text.trim());
        }
        let text = text.trim();
        if text.is_empty() {
            bail!("device api returned an empty response");
        }
        if !SUCCESS_PREFIXES.iter().any(|prefix| text.starts_with(prefix)) {
            bail!("{text}");
        }
        debug!(response = text, "device api accepted operation");
        Ok(())
    }
}

#[async_trait]
impl DeviceApi for PiShockClient {
    async fn shock(
        &self,
        credentials: CompleteCredentials<'_>,
        request: &ActuationRequest,
    ) -> Result<()> {
        self.operate(credentials, request).await
    }
}
