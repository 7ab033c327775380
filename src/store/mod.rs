/// Backing-store interfaces consumed by the resolver, plus the session-level
/// caches layered on top of them.
mod memory;
mod records;
mod sites;

pub use memory::MemoryStore;
pub use records::{RecordCache, RecordSource};
pub use sites::SiteCache;

use crate::errors::Result;
use crate::types::{LiveObject, SiteIdentity, TranslationRecord};

/// Access to live objects and sites.
///
/// Absent rows are `Ok(None)`; `Err` is reserved for backing-store failures.
pub trait ObjectStore {
    fn get_live_object_by_id(&self, object_type: &str, id: i64) -> Result<Option<LiveObject>>;

    fn get_site_by_name(&self, name: &str) -> Result<Option<SiteIdentity>>;

    fn get_site_by_id(&self, id: i64) -> Result<Option<SiteIdentity>>;
}

/// Access to flat translation records.
pub trait TranslationRecordStore {
    fn get_record(&self, object_type: &str, id: i64) -> Result<Option<TranslationRecord>>;
}
