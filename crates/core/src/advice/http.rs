use crate::advice::error::TransportError;
use crate::advice::{AdvisorClient, AdvisorRequest};
use crate::config::Settings;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};

#[derive(Debug, Clone)]
pub struct HttpAdvisorClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpAdvisorClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("failed to build advisor http client")?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.clone(),
        })
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }
}

#[async_trait::async_trait]
impl AdvisorClient for HttpAdvisorClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_recommendations(&self, request: &AdvisorRequest) -> anyhow::Result<String> {
        let res = self
            .http
            .post(&self.endpoint)
            .headers(Self::headers())
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError {
                stage: if e.is_timeout() { "timeout" } else { "send" },
                detail: e.to_string(),
                raw_body: None,
                raw_body_json: None,
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|e| TransportError {
            stage: "read_body",
            detail: e.to_string(),
            raw_body: None,
            raw_body_json: None,
        })?;

        if !status.is_success() {
            let raw_body_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(TransportError {
                stage: "http",
                detail: format!("status={status}"),
                raw_body: Some(text),
                raw_body_json,
            }
            .into());
        }

        tracing::debug!(%status, body_len = text.len(), "recommendation service replied");
        Ok(text)
    }
}
