use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ObjectStore, TranslationRecordStore};
use crate::errors::Result;
use crate::types::{LiveObject, SiteIdentity, TranslationRecord};

/// In-memory object and translation record store.
///
/// Counts every lookup so callers can observe how many trips reached the
/// store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: HashMap<(String, i64), LiveObject>,
    records: HashMap<(String, i64), TranslationRecord>,
    sites: Vec<SiteIdentity>,
    object_lookups: AtomicUsize,
    record_lookups: AtomicUsize,
    site_lookups: AtomicUsize,
}

fn key(object_type: &str, id: i64) -> (String, i64) {
    (object_type.to_lowercase(), id)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a live object.
    pub fn insert_object(&mut self, object: LiveObject) {
        self.objects.insert(key(&object.object_type, object.id), object);
    }

    /// Inserts or replaces a translation record.
    pub fn insert_record(&mut self, record: TranslationRecord) {
        self.records.insert(key(&record.object_type, record.id), record);
    }

    /// Inserts or replaces a site, matched by id.
    pub fn insert_site(&mut self, site: SiteIdentity) {
        self.sites.retain(|s| s.id != site.id);
        self.sites.push(site);
    }

    pub fn remove_object(&mut self, object_type: &str, id: i64) -> Option<LiveObject> {
        self.objects.remove(&key(object_type, id))
    }

    pub fn remove_record(&mut self, object_type: &str, id: i64) -> Option<TranslationRecord> {
        self.records.remove(&key(object_type, id))
    }

    pub fn object_lookups(&self) -> usize {
        self.object_lookups.load(Ordering::Relaxed)
    }

    pub fn record_lookups(&self) -> usize {
        self.record_lookups.load(Ordering::Relaxed)
    }

    pub fn site_lookups(&self) -> usize {
        self.site_lookups.load(Ordering::Relaxed)
    }

    pub fn reset_counters(&self) {
        self.object_lookups.store(0, Ordering::Relaxed);
        self.record_lookups.store(0, Ordering::Relaxed);
        self.site_lookups.store(0, Ordering::Relaxed);
    }
}

impl ObjectStore for MemoryStore {
    fn get_live_object_by_id(&self, object_type: &str, id: i64) -> Result<Option<LiveObject>> {
        self.object_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self.objects.get(&key(object_type, id)).cloned())
    }

    fn get_site_by_name(&self, name: &str) -> Result<Option<SiteIdentity>> {
        self.site_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .sites
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    fn get_site_by_id(&self, id: i64) -> Result<Option<SiteIdentity>> {
        self.site_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self.sites.iter().find(|s| s.id == id).cloned())
    }
}

impl TranslationRecordStore for MemoryStore {
    fn get_record(&self, object_type: &str, id: i64) -> Result<Option<TranslationRecord>> {
        self.record_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self.records.get(&key(object_type, id)).cloned())
    }
}
