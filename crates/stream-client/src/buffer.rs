use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use matching_core::Opportunity;

/// How long a flushed item counts as "recently added" for highlighting
const RECENTLY_ADDED_WINDOW: Duration = Duration::from_secs(30);

/// Holding area between the live feed and the displayed list.
///
/// Arrivals accumulate here until the caller flushes; `flush()` is the only
/// transition that moves items into the displayed set, so a flush can never
/// interleave with a partially applied arrival.
#[derive(Default)]
pub struct ArrivalBuffer {
    /// Pending items, newest-first
    pending: Vec<Opportunity>,
    /// Ids already shown to the user; arrivals with these ids are rejected
    displayed: HashSet<String>,
    recently_added: HashMap<String, Instant>,
}

impl ArrivalBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept an arrival unless its id is already buffered or displayed.
    /// Returns false on rejection.
    pub fn on_arrive(&mut self, opportunity: Opportunity) -> bool {
        if opportunity.id.is_empty() {
            return false;
        }
        if self.displayed.contains(&opportunity.id) {
            return false;
        }
        if self.pending.iter().any(|p| p.id == opportunity.id) {
            return false;
        }

        self.pending.insert(0, opportunity);
        true
    }

    pub fn count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Atomically drain the buffer, newest-first.
    ///
    /// Returned ids join the displayed set and are marked recently added for
    /// the highlight window. Flushing an empty buffer is a no-op.
    pub fn flush(&mut self) -> Vec<Opportunity> {
        if self.pending.is_empty() {
            return Vec::new();
        }

        let now = Instant::now();
        let drained = std::mem::take(&mut self.pending);
        for opportunity in &drained {
            self.displayed.insert(opportunity.id.clone());
            self.recently_added.insert(opportunity.id.clone(), now);
        }
        self.prune_recent(now);

        drained
    }

    /// Whether an id was flushed within the highlight window.
    /// Display-only: never affects scoring or ordering.
    pub fn is_recently_added(&self, id: &str) -> bool {
        self.recently_added
            .get(id)
            .map(|at| at.elapsed() < RECENTLY_ADDED_WINDOW)
            .unwrap_or(false)
    }

    /// Register externally displayed ids (the snapshot-merge path), so the
    /// live feed cannot re-deliver items the user already sees.
    pub fn mark_displayed<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.displayed.extend(ids);
    }

    fn prune_recent(&mut self, now: Instant) {
        self.recently_added
            .retain(|_, at| now.duration_since(*at) < RECENTLY_ADDED_WINDOW);
    }
}
