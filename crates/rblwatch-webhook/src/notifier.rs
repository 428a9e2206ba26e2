//! HTTP webhook notifier.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rblwatch_core::{Alert, RblError, Result, RunRecord};
use rblwatch_engine::Notifier;
use reqwest::Client as HttpClient;
use tracing::{debug, warn};
use url::Url;

use crate::payload::WebhookPayload;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts alerts as JSON to a webhook endpoint
#[derive(Clone, Debug)]
pub struct WebhookNotifier {
    inner: Arc<NotifierInner>,
}

#[derive(Debug)]
struct NotifierInner {
    http: HttpClient,
    url: Url,
}

impl WebhookNotifier {
    /// Notifier for `url` with default settings
    pub fn new(url: impl AsRef<str>) -> Result<Self> {
        Self::builder(url).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(url: impl AsRef<str>) -> WebhookNotifierBuilder {
        WebhookNotifierBuilder::new(url)
    }

    /// Endpoint alerts are posted to
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    async fn post(&self, payload: &WebhookPayload) -> Result<()> {
        debug!(url = %self.inner.url, alerts = payload.alerts.len(), "POST webhook");

        let response = self
            .inner
            .http
            .post(self.inner.url.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| RblError::Notify(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        warn!(url = %self.inner.url, status = status.as_u16(), "webhook rejected alerts");
        Err(RblError::Notify(format!(
            "webhook returned {status}: {}",
            body.chars().take(200).collect::<String>()
        )))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, alert: &Alert) -> Result<()> {
        self.post(&WebhookPayload::single(alert)).await
    }

    async fn notify_run(&self, run: &RunRecord, alerts: &[Alert]) -> Result<()> {
        if alerts.is_empty() {
            return Ok(());
        }
        self.post(&WebhookPayload::for_run(run, alerts)).await
    }
}

/// Builder for configuring a [`WebhookNotifier`]
pub struct WebhookNotifierBuilder {
    url: String,
    timeout: Duration,
    user_agent: String,
}

impl WebhookNotifierBuilder {
    /// Create a new builder for the given endpoint
    #[must_use]
    pub fn new(url: impl AsRef<str>) -> Self {
        Self {
            url: url.as_ref().to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("rblwatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the notifier; fails on a malformed or non-HTTP URL
    pub fn build(self) -> Result<WebhookNotifier> {
        let url = Url::parse(&self.url)
            .map_err(|e| RblError::Config(format!("invalid webhook url '{}': {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RblError::Config(format!(
                "webhook url must be http or https, got '{}'",
                url.scheme()
            )));
        }

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| RblError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(WebhookNotifier {
            inner: Arc::new(NotifierInner { http, url }),
        })
    }
}
