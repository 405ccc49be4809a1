//! Host pause accounting.
//!
//! Rust has no collector of its own, but embedders often host one (a script
//! runtime, an arena compactor). A [`PauseSource`] reports cumulative pause
//! time per collector; the logger turns any growth observed while an event
//! was open into synthetic `GC` children of that event.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Cumulative statistics of one collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorStats {
    pub name: String,
    pub collection_count: u64,
    pub total_pause_millis: u64,
}

pub trait PauseSource: Send + Sync {
    fn collectors(&self) -> Vec<CollectorStats>;
}

/// A pause observed since the previous poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewPause {
    pub collector: String,
    pub collection_count: u64,
    pub pause_nanos: u64,
}

pub(crate) struct PauseTracker {
    source: Box<dyn PauseSource>,
    last_totals: Mutex<HashMap<String, u64>>,
}

impl PauseTracker {
    pub(crate) fn new(source: Box<dyn PauseSource>) -> Self {
        PauseTracker {
            source,
            last_totals: Mutex::new(HashMap::new()),
        }
    }

    /// Collectors whose cumulative pause time grew since the last call.
    pub(crate) fn poll(&self) -> Vec<NewPause> {
        let mut last_totals = self.last_totals.lock();
        let mut pauses = Vec::new();
        for stats in self.source.collectors() {
            let last = last_totals.get(&stats.name).copied().unwrap_or(0);
            if stats.total_pause_millis > last {
                pauses.push(NewPause {
                    collector: stats.name.clone(),
                    collection_count: stats.collection_count,
                    pause_nanos: (stats.total_pause_millis - last) * 1_000_000,
                });
                last_totals.insert(stats.name, stats.total_pause_millis);
            }
        }
        pauses
    }
}
