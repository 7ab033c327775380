use dashmap::DashMap;
use tracing::trace;

use super::ObjectStore;
use crate::errors::Result;
use crate::types::SiteIdentity;

/// Session-wide site cache, indexed both by case-insensitive name and by id.
///
/// Misses are cached too: a site that does not exist stays absent until the
/// cache is cleared.
#[derive(Debug, Default)]
pub struct SiteCache {
    by_name: DashMap<String, Option<SiteIdentity>>,
    by_id: DashMap<i64, Option<SiteIdentity>>,
}

impl SiteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_name(&self, store: &dyn ObjectStore, name: &str) -> Result<Option<SiteIdentity>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let key = name.to_lowercase();
        if let Some(hit) = self.by_name.get(&key) {
            trace!(site = %name, "site cache hit");
            return Ok(hit.value().clone());
        }

        let site = store.get_site_by_name(name)?;
        if let Some(found) = &site {
            self.by_id.insert(found.id, site.clone());
        }
        self.by_name.insert(key, site.clone());
        Ok(site)
    }

    pub fn by_id(&self, store: &dyn ObjectStore, id: i64) -> Result<Option<SiteIdentity>> {
        if id <= 0 {
            return Ok(None);
        }
        if let Some(hit) = self.by_id.get(&id) {
            trace!(site_id = id, "site cache hit");
            return Ok(hit.value().clone());
        }

        let site = store.get_site_by_id(id)?;
        if let Some(found) = &site {
            self.by_name.insert(found.name.to_lowercase(), site.clone());
        }
        self.by_id.insert(id, site.clone());
        Ok(site)
    }

    pub fn len(&self) -> usize {
        self.by_id.len().max(self.by_name.len())
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty() && self.by_name.is_empty()
    }

    pub fn clear(&self) {
        self.by_name.clear();
        self.by_id.clear();
    }
}
