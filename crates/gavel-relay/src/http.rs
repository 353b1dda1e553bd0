//! HTTP client for the relay sidecar.
//!
//! The sidecar fans events out to the actual relay network; the engine only
//! ever talks to it. A non-200 response or transport error is a failed
//! publish — the engine retries on a later pass, so no retry logic lives
//! here.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};

use gavel_types::{MarketError, Result};

use crate::event::RelayEvent;
use crate::publisher::RelayPublisher;

pub struct HttpRelay {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRelay {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| MarketError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl RelayPublisher for HttpRelay {
    async fn publish_event(&self, event: &RelayEvent) -> bool {
        let url = format!("{}/events", self.base_url);
        match self.http.post(&url).json(event).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(event_id = %event.id, kind = event.kind, "published event");
                true
            }
            Ok(response) => {
                error!(
                    event_id = %event.id,
                    status = %response.status(),
                    "relay sidecar rejected event"
                );
                false
            }
            Err(e) => {
                error!(event_id = %event.id, "failed to reach relay sidecar: {e}");
                false
            }
        }
    }
}
