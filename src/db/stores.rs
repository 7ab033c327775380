use super::connection::Database;
use crate::errors::Result;
use crate::store::{ObjectStore, TranslationRecordStore};
use crate::types::{LiveObject, SiteIdentity, TranslationRecord};

impl ObjectStore for Database {
    fn get_live_object_by_id(&self, object_type: &str, id: i64) -> Result<Option<LiveObject>> {
        self.get_object(object_type, id)
    }

    fn get_site_by_name(&self, name: &str) -> Result<Option<SiteIdentity>> {
        self.find_site(name)
    }

    fn get_site_by_id(&self, id: i64) -> Result<Option<SiteIdentity>> {
        self.get_site(id)
    }
}

impl TranslationRecordStore for Database {
    fn get_record(&self, object_type: &str, id: i64) -> Result<Option<TranslationRecord>> {
        self.get_translation(object_type, id)
    }
}
