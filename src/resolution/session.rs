use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

use super::filter_cache::FilterConditionCache;
use crate::store::{RecordCache, SiteCache};

/// Snapshot of a session's cache occupancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub generation: u64,
    pub cached_records: usize,
    pub cached_sites: usize,
    pub cached_filter_conditions: usize,
}

/// Owns every cache used while resolving references.
///
/// One session is meant to be driven by one export or import run. Call
/// [`ResolutionSession::begin_run`] at the start of each run to drop what the
/// previous run cached.
#[derive(Debug, Default)]
pub struct ResolutionSession {
    filter_conditions: FilterConditionCache,
    records: RecordCache,
    sites: SiteCache,
    generation: AtomicU64,
}

impl ResolutionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all caches and starts a new cache generation.
    pub fn begin_run(&self) -> u64 {
        self.clear();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, "starting resolution run");
        generation
    }

    /// Empties every cache without advancing the generation.
    pub fn clear(&self) {
        self.filter_conditions.clear();
        self.records.clear();
        self.sites.clear();
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn filter_conditions(&self) -> &FilterConditionCache {
        &self.filter_conditions
    }

    pub fn records(&self) -> &RecordCache {
        &self.records
    }

    pub fn sites(&self) -> &SiteCache {
        &self.sites
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            generation: self.generation(),
            cached_records: self.records.len(),
            cached_sites: self.sites.len(),
            cached_filter_conditions: self.filter_conditions.len(),
        }
    }
}
