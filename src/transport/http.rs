use super::DeviceTransport;
use crate::{
    http_client::{device_client, handle_http_response},
    protocol::{Message, Request},
};
use anyhow::{Context, Result};
use log::info;
use reqwest::{Client, Url};
use serde_json::Value;

/// One HTTP call per request against the device's settings endpoints
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    // API endpoint constants
    const STATUS_ENDPOINT: &str = "settings/status";
    const CONFIG_ENDPOINT: &str = "settings/configfile";
    const SCAN_ENDPOINT: &str = "settings/scanwifi";

    pub fn new(base: Url) -> Result<Self> {
        Ok(Self {
            client: device_client()?,
            base,
        })
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("failed to build url for {path}"))
    }

    /// GET request returning the parsed JSON body
    async fn get(&self, path: &str) -> Result<Value> {
        let url = self.build_url(path)?;
        info!("GET {url}");

        let res = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to send GET request to {url}"))?;

        let body = handle_http_response(res, &format!("GET {url}")).await?;
        serde_json::from_str(&body).with_context(|| format!("failed to parse response of {url}"))
    }

    /// POST request with JSON body
    async fn post_json(&self, path: &str, body: &Value) -> Result<String> {
        let url = self.build_url(path)?;
        info!("POST {url}");

        let res = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .with_context(|| format!("failed to send POST request to {url}"))?;

        handle_http_response(res, &format!("POST {url}")).await
    }
}

impl DeviceTransport for HttpTransport {
    async fn request(&self, request: Request) -> Result<Option<Message>> {
        let message = match request {
            Request::GetConfig => {
                let raw = self.get(Self::CONFIG_ENDPOINT).await?;
                Message::config(raw).context("failed to decode configuration")?
            }
            Request::Status => {
                let raw = self.get(Self::STATUS_ENDPOINT).await?;
                Message::status(&raw).context("failed to decode status")?
            }
            Request::ScanWifi => {
                let raw = self.get(Self::SCAN_ENDPOINT).await?;
                Message::scan(&raw).context("failed to decode scan result")?
            }
            Request::SaveConfig(config) => {
                self.post_json(Self::CONFIG_ENDPOINT, &config).await?;
                return Ok(None);
            }
        };

        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_endpoints_onto_base() {
        let transport =
            HttpTransport::new(Url::parse("http://192.168.4.1/device/").unwrap()).unwrap();

        assert_eq!(
            transport.build_url("/settings/status").unwrap().as_str(),
            "http://192.168.4.1/device/settings/status"
        );
        assert_eq!(
            transport.build_url(HttpTransport::SCAN_ENDPOINT).unwrap().as_str(),
            "http://192.168.4.1/device/settings/scanwifi"
        );
    }
}
