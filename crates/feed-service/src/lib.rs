//! Feed service: wires the live stream, arrival buffer, snapshot fetch, and
//! display pipeline into one running loop.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;

use feed_pipeline::{merge, process, FeedFilter, FeedView};
use matching_core::{Opportunity, UserProfile};
use matching_engine::MatchingEngine;
use stream_client::{ArrivalBuffer, SnapshotClient, StreamConfig, StreamEvent, StreamSession};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// WebSocket endpoint, e.g. "wss://api.example.com/ws/opportunities"
    pub ws_url: String,
    /// REST base URL for the snapshot fetch
    pub api_url: String,
    pub token: String,
    pub snapshot_interval: Duration,
    pub flush_interval: Duration,
}

impl ServiceConfig {
    /// Read configuration from the environment (`.env` supported)
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ws_url: std::env::var("SCHOLARSTREAM_WS_URL")
                .context("SCHOLARSTREAM_WS_URL is not set")?,
            api_url: std::env::var("SCHOLARSTREAM_API_URL")
                .context("SCHOLARSTREAM_API_URL is not set")?,
            token: std::env::var("SCHOLARSTREAM_TOKEN")
                .context("SCHOLARSTREAM_TOKEN is not set")?,
            snapshot_interval: env_secs("SCHOLARSTREAM_SNAPSHOT_INTERVAL_SECS", 300),
            flush_interval: env_secs("SCHOLARSTREAM_FLUSH_INTERVAL_SECS", 60),
        })
    }
}

fn env_secs(key: &str, default: u64) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(default))
}

fn load_profile() -> Result<UserProfile> {
    match std::env::var("SCHOLARSTREAM_PROFILE") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading profile {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing profile {path}"))
        }
        Err(_) => Ok(UserProfile::default()),
    }
}

pub async fn run() -> Result<()> {
    let config = ServiceConfig::from_env()?;
    let profile = load_profile()?;
    run_service(config, profile).await
}

/// Merge the flushed live set with the latest snapshot, rank against the
/// profile, and run the display pipeline.
pub fn assemble_view(
    engine: &MatchingEngine,
    live: &[Opportunity],
    snapshot: &[Opportunity],
    profile: &UserProfile,
    filter: &FeedFilter,
) -> FeedView {
    let pool = merge(live.to_vec(), snapshot.to_vec());
    let ranked = engine.rank(pool, profile);
    process(ranked, profile, filter)
}

pub async fn run_service(config: ServiceConfig, profile: UserProfile) -> Result<()> {
    let engine = MatchingEngine::new();
    let snapshot_client = SnapshotClient::new(&config.api_url).with_token(&config.token);
    let filter = FeedFilter::default();

    let (session, mut events) =
        StreamSession::connect(StreamConfig::new(&config.ws_url, &config.token));

    let mut buffer = ArrivalBuffer::new();
    let mut live: Vec<Opportunity> = Vec::new();
    let mut snapshot: Vec<Opportunity> = Vec::new();

    let mut snapshot_timer = tokio::time::interval(config.snapshot_interval);
    let mut flush_timer = tokio::time::interval(config.flush_interval);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(StreamEvent::Connected) => {
                        tracing::info!("Live opportunity stream active");
                    }
                    Ok(StreamEvent::Arrived(opp)) => {
                        if buffer.on_arrive(opp) {
                            tracing::info!("{} new opportunities waiting", buffer.count());
                        }
                    }
                    Ok(StreamEvent::ConnectionLost) => {
                        tracing::warn!(
                            "Live stream lost after max reconnect attempts; \
                             continuing with snapshots only"
                        );
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Dropped {} stream events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            _ = snapshot_timer.tick() => {
                match snapshot_client.fetch().await {
                    Ok(items) => {
                        tracing::info!("Snapshot fetched: {} opportunities", items.len());
                        buffer.mark_displayed(items.iter().map(|o| o.id.clone()));
                        snapshot = items;
                        log_view(&assemble_view(&engine, &live, &snapshot, &profile, &filter));
                    }
                    Err(e) => {
                        tracing::warn!("Snapshot fetch failed: {}", e);
                    }
                }
            }
            _ = flush_timer.tick() => {
                let flushed = buffer.flush();
                if !flushed.is_empty() {
                    tracing::info!("Revealing {} buffered opportunities", flushed.len());
                    let mut next = flushed;
                    next.extend(live.drain(..));
                    live = next;
                    log_view(&assemble_view(&engine, &live, &snapshot, &profile, &filter));
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested");
                break;
            }
        }
    }

    session.close().await;
    Ok(())
}

fn log_view(view: &FeedView) {
    tracing::info!(
        "Feed: {} total, {} urgent, {} high match ({} scholarships, {} hackathons, \
         {} bounties, {} competitions)",
        view.all.len(),
        view.urgent.len(),
        view.high_match.len(),
        view.by_type.scholarships.len(),
        view.by_type.hackathons.len(),
        view.by_type.bounties.len(),
        view.by_type.competitions.len(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    fn opportunity(id: &str, name: &str, source_url: Option<&str>) -> Opportunity {
        let mut opp: Opportunity =
            serde_json::from_str(&format!(r#"{{"id":"{id}","name":"{name}"}}"#)).unwrap();
        opp.source_url = source_url.map(str::to_string);
        opp.deadline = (Utc::now() + ChronoDuration::days(30))
            .format("%Y-%m-%d")
            .to_string();
        opp.discovered_at = Utc::now().to_rfc3339();
        opp
    }

    #[test]
    fn stream_and_snapshot_copies_collapse_to_one() {
        let engine = MatchingEngine::new();
        let profile = UserProfile::default();

        // Same listing observed over the stream (id "x") and in the snapshot
        // (id "y") under one source URL
        let live = vec![opportunity("x", "Dev Grant", Some("https://example.com/grant"))];
        let snapshot = vec![opportunity("y", "Dev Grant (mirror)", Some("https://example.com/grant"))];

        let view = assemble_view(&engine, &live, &snapshot, &profile, &FeedFilter::default());
        assert_eq!(view.all.len(), 1);
        assert_eq!(view.all[0].id, "x");
    }

    #[test]
    fn assembled_view_is_ranked_and_bucketed() {
        let engine = MatchingEngine::new();
        let profile = UserProfile::default();

        let mut hackathon = opportunity("h", "Campus Hackathon", None);
        hackathon.description = "48 hour hackathon".to_string();
        let scholarship = opportunity("s", "Merit Scholarship", None);

        let view = assemble_view(
            &engine,
            &[hackathon],
            &[scholarship],
            &profile,
            &FeedFilter::default(),
        );
        assert_eq!(view.all.len(), 2);
        assert_eq!(view.by_type.hackathons.len(), 1);
        assert_eq!(view.by_type.scholarships.len(), 1);
        for opp in &view.all {
            assert!(opp.match_score >= 30);
            assert!(opp.match_tier.is_some());
        }
    }

    #[test]
    fn env_secs_falls_back_to_default() {
        assert_eq!(env_secs("SCHOLARSTREAM_TEST_UNSET_VAR", 42), Duration::from_secs(42));
    }
}
