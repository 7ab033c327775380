use dashmap::DashMap;
use tracing::{debug, trace};

use super::{ObjectStore, SiteCache, TranslationRecordStore};
use crate::catalog::TypeMetadata;
use crate::errors::Result;
use crate::types::{FieldValue, LiveObject, TranslationRecord};

/// Session-wide cache of translation records keyed by `(object type, id)`.
///
/// Negative results are cached as `None`, so a missing row is looked up at
/// most once per run.
#[derive(Debug, Default)]
pub struct RecordCache {
    entries: DashMap<(String, i64), Option<TranslationRecord>>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` on a miss; `Some(None)` for a cached absent row.
    pub fn get(&self, object_type: &str, id: i64) -> Option<Option<TranslationRecord>> {
        self.entries
            .get(&(object_type.to_lowercase(), id))
            .map(|entry| entry.value().clone())
    }

    pub fn insert(&self, object_type: &str, id: i64, record: Option<TranslationRecord>) {
        self.entries.insert((object_type.to_lowercase(), id), record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Layered record lookup: session cache, then the translation record store,
/// then a projection of the live object.
pub struct RecordSource<'a> {
    records: &'a dyn TranslationRecordStore,
    objects: &'a dyn ObjectStore,
    cache: &'a RecordCache,
    sites: &'a SiteCache,
}

impl<'a> RecordSource<'a> {
    pub fn new(
        records: &'a dyn TranslationRecordStore,
        objects: &'a dyn ObjectStore,
        cache: &'a RecordCache,
        sites: &'a SiteCache,
    ) -> Self {
        Self {
            records,
            objects,
            cache,
            sites,
        }
    }

    /// Returns the translation record for `(meta.object_type, id)`.
    ///
    /// Ids `<= 0` short-circuit to `None` without touching any layer.
    pub fn get(&self, meta: &TypeMetadata, id: i64) -> Result<Option<TranslationRecord>> {
        if id <= 0 {
            return Ok(None);
        }
        let object_type = meta.object_type.as_str();

        if let Some(cached) = self.cache.get(object_type, id) {
            trace!(object_type, id, "record cache hit");
            return Ok(cached);
        }

        let record = match self.records.get_record(object_type, id)? {
            Some(record) => Some(record),
            None => match self.objects.get_live_object_by_id(object_type, id)? {
                Some(object) => {
                    debug!(object_type, id, "no translation record, projecting live object");
                    Some(self.project(meta, &object)?)
                }
                None => None,
            },
        };

        self.cache.insert(object_type, id, record.clone());
        Ok(record)
    }

    /// Builds a flat record from a live object using the type's column layout.
    pub fn project(&self, meta: &TypeMetadata, object: &LiveObject) -> Result<TranslationRecord> {
        let mut record = TranslationRecord::new(meta.object_type.clone(), object.id);

        record.guid = meta
            .guid_column
            .as_deref()
            .and_then(|c| object.value(c))
            .and_then(|v| v.as_guid());
        record.code_name = meta
            .code_name_column
            .as_deref()
            .and_then(|c| object.value(c))
            .and_then(FieldValue::to_text)
            .filter(|s| !s.is_empty());

        if let Some(column) = meta.site_id_column.as_deref() {
            record.site_name = self
                .sites
                .by_id(self.objects, object.int_value(column))?
                .map(|site| site.name);
        }
        record.parent_id = meta
            .parent_id_column
            .as_deref()
            .map(|c| object.int_value(c))
            .unwrap_or(0);
        record.group_id = meta
            .group_id_column
            .as_deref()
            .map(|c| object.int_value(c))
            .unwrap_or(0);
        record.extra = object.columns.clone();

        Ok(record)
    }
}
