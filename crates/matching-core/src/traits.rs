use async_trait::async_trait;

use crate::{FeedError, Opportunity};

/// Trait for periodic snapshot sources.
///
/// The pipeline treats a snapshot source as a black box: one fetch per call,
/// no retry or backoff at this layer.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_opportunities(&self) -> Result<Vec<Opportunity>, FeedError>;
}
