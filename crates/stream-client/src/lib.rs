//! Real-time opportunity feed client.
//!
//! Owns the live WebSocket stream (connect, keepalive, reconnect with
//! backoff), the arrival buffer between the feed and the displayed list, and
//! the periodic snapshot fetch client.

use async_trait::async_trait;
use reqwest::Client;

use matching_core::{FeedError, Opportunity, SnapshotSource};

pub mod buffer;
pub mod websocket;

pub use buffer::ArrivalBuffer;
pub use websocket::{
    OpportunityStream, StreamConfig, StreamEvent, StreamMessage, StreamSession,
};

/// Fetches the periodic opportunity snapshot over HTTP.
///
/// One GET per call; the snapshot source is a black box to the pipeline, so
/// retry and backoff live with the caller's schedule, not here.
#[derive(Clone)]
pub struct SnapshotClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl SnapshotClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    /// Attach a bearer token for authenticated snapshot endpoints
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub async fn fetch(&self) -> Result<Vec<Opportunity>, FeedError> {
        let url = format!("{}/api/opportunities", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FeedError::Api(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FeedError::Api(format!(
                "snapshot fetch failed: HTTP {}",
                response.status()
            )));
        }

        response
            .json::<Vec<Opportunity>>()
            .await
            .map_err(|e| FeedError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SnapshotSource for SnapshotClient {
    async fn fetch_opportunities(&self) -> Result<Vec<Opportunity>, FeedError> {
        self.fetch().await
    }
}
