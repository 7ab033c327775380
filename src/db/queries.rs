use std::collections::BTreeMap;

use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::connection::Database;
use crate::errors::{RefTreeError, Result};
use crate::types::*;

// ---------------------------------------------------------------------------
// Helper: map a rusqlite row to domain types
// ---------------------------------------------------------------------------

fn parse_guid(idx: usize, text: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_columns(idx: usize, json: &str) -> rusqlite::Result<BTreeMap<String, FieldValue>> {
    serde_json::from_str(json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Maps a row from the `sites` table to a `SiteIdentity`.
fn row_to_site(row: &rusqlite::Row) -> rusqlite::Result<SiteIdentity> {
    let guid: String = row.get("guid")?;
    Ok(SiteIdentity {
        id: row.get("id")?,
        name: row.get("name")?,
        guid: parse_guid(2, &guid)?,
    })
}

/// Maps a row from the `objects` table to a `LiveObject`.
fn row_to_object(row: &rusqlite::Row) -> rusqlite::Result<LiveObject> {
    let columns: String = row.get("columns")?;
    Ok(LiveObject {
        object_type: row.get("object_type")?,
        id: row.get("id")?,
        columns: parse_columns(2, &columns)?,
    })
}

/// Maps a row from the `translations` table to a `TranslationRecord`.
fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<TranslationRecord> {
    let guid: Option<String> = row.get("guid")?;
    let extra: String = row.get("extra")?;
    Ok(TranslationRecord {
        object_type: row.get("object_type")?,
        id: row.get("id")?,
        guid: guid.as_deref().map(|g| parse_guid(2, g)).transpose()?,
        code_name: row.get("code_name")?,
        site_name: row.get("site_name")?,
        group_id: row.get("group_id")?,
        parent_id: row.get("parent_id")?,
        extra: parse_columns(7, &extra)?,
    })
}

// ---------------------------------------------------------------------------
// Site operations
// ---------------------------------------------------------------------------

impl Database {
    /// Inserts or replaces a site.
    pub fn upsert_site(&self, site: &SiteIdentity) -> Result<()> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO sites (id, name, guid) VALUES (?1, ?2, ?3)",
                params![site.id, site.name, site.guid.to_string()],
            )
            .map_err(|e| RefTreeError::Database {
                message: format!("failed to upsert site: {e}"),
                operation: "upsert_site".to_string(),
            })?;
        Ok(())
    }

    pub fn get_site(&self, id: i64) -> Result<Option<SiteIdentity>> {
        self.conn()
            .query_row(
                "SELECT id, name, guid FROM sites WHERE id = ?1",
                params![id],
                row_to_site,
            )
            .optional()
            .map_err(|e| RefTreeError::Database {
                message: format!("failed to get site by id: {e}"),
                operation: "get_site".to_string(),
            })
    }

    /// Looks up a site by name, ignoring case.
    pub fn find_site(&self, name: &str) -> Result<Option<SiteIdentity>> {
        self.conn()
            .query_row(
                "SELECT id, name, guid FROM sites WHERE name = ?1 COLLATE NOCASE",
                params![name],
                row_to_site,
            )
            .optional()
            .map_err(|e| RefTreeError::Database {
                message: format!("failed to get site by name: {e}"),
                operation: "find_site".to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Object operations
// ---------------------------------------------------------------------------

impl Database {
    /// Inserts or replaces a live object.
    pub fn upsert_object(&self, object: &LiveObject) -> Result<()> {
        let columns = serde_json::to_string(&object.columns)?;
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO objects (object_type, id, columns) VALUES (?1, ?2, ?3)",
                params![object.object_type, object.id, columns],
            )
            .map_err(|e| RefTreeError::Database {
                message: format!("failed to upsert object: {e}"),
                operation: "upsert_object".to_string(),
            })?;
        Ok(())
    }

    /// Inserts or replaces a batch of objects inside a single transaction.
    pub fn upsert_objects(&self, objects: &[LiveObject]) -> Result<()> {
        let tx = self.conn().unchecked_transaction().map_err(|e| {
            RefTreeError::Database {
                message: format!("failed to begin transaction: {e}"),
                operation: "upsert_objects".to_string(),
            }
        })?;

        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT OR REPLACE INTO objects (object_type, id, columns) VALUES (?1, ?2, ?3)",
                )
                .map_err(|e| RefTreeError::Database {
                    message: format!("failed to prepare statement: {e}"),
                    operation: "upsert_objects".to_string(),
                })?;

            for object in objects {
                let columns = serde_json::to_string(&object.columns)?;
                stmt.execute(params![object.object_type, object.id, columns])
                    .map_err(|e| RefTreeError::Database {
                        message: format!("failed to upsert object: {e}"),
                        operation: "upsert_objects".to_string(),
                    })?;
            }
        }

        tx.commit().map_err(|e| RefTreeError::Database {
            message: format!("failed to commit transaction: {e}"),
            operation: "upsert_objects".to_string(),
        })
    }

    pub fn get_object(&self, object_type: &str, id: i64) -> Result<Option<LiveObject>> {
        self.conn()
            .query_row(
                "SELECT object_type, id, columns FROM objects WHERE object_type = ?1 AND id = ?2",
                params![object_type, id],
                row_to_object,
            )
            .optional()
            .map_err(|e| RefTreeError::Database {
                message: format!("failed to get object: {e}"),
                operation: "get_object".to_string(),
            })
    }

    /// Deletes an object; returns whether a row was removed.
    pub fn delete_object(&self, object_type: &str, id: i64) -> Result<bool> {
        let removed = self
            .conn()
            .execute(
                "DELETE FROM objects WHERE object_type = ?1 AND id = ?2",
                params![object_type, id],
            )
            .map_err(|e| RefTreeError::Database {
                message: format!("failed to delete object: {e}"),
                operation: "delete_object".to_string(),
            })?;
        Ok(removed > 0)
    }
}

// ---------------------------------------------------------------------------
// Translation record operations
// ---------------------------------------------------------------------------

impl Database {
    /// Inserts or replaces a translation record.
    pub fn upsert_translation(&self, record: &TranslationRecord) -> Result<()> {
        let extra = serde_json::to_string(&record.extra)?;
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO translations
                    (object_type, id, guid, code_name, site_name, group_id, parent_id, extra)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.object_type,
                    record.id,
                    record.guid.map(|g| g.to_string()),
                    record.code_name,
                    record.site_name,
                    record.group_id,
                    record.parent_id,
                    extra,
                ],
            )
            .map_err(|e| RefTreeError::Database {
                message: format!("failed to upsert translation record: {e}"),
                operation: "upsert_translation".to_string(),
            })?;
        Ok(())
    }

    pub fn get_translation(&self, object_type: &str, id: i64) -> Result<Option<TranslationRecord>> {
        self.conn()
            .query_row(
                "SELECT object_type, id, guid, code_name, site_name, group_id, parent_id, extra
                 FROM translations WHERE object_type = ?1 AND id = ?2",
                params![object_type, id],
                row_to_record,
            )
            .optional()
            .map_err(|e| RefTreeError::Database {
                message: format!("failed to get translation record: {e}"),
                operation: "get_translation".to_string(),
            })
    }

    pub fn delete_translation(&self, object_type: &str, id: i64) -> Result<bool> {
        let removed = self
            .conn()
            .execute(
                "DELETE FROM translations WHERE object_type = ?1 AND id = ?2",
                params![object_type, id],
            )
            .map_err(|e| RefTreeError::Database {
                message: format!("failed to delete translation record: {e}"),
                operation: "delete_translation".to_string(),
            })?;
        Ok(removed > 0)
    }

    /// Number of rows in each table: `(sites, objects, translations)`.
    pub fn counts(&self) -> Result<(u64, u64, u64)> {
        self.conn()
            .query_row(
                "SELECT (SELECT COUNT(*) FROM sites),
                        (SELECT COUNT(*) FROM objects),
                        (SELECT COUNT(*) FROM translations)",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)? as u64,
                        row.get::<_, i64>(1)? as u64,
                        row.get::<_, i64>(2)? as u64,
                    ))
                },
            )
            .map_err(|e| RefTreeError::Database {
                message: format!("failed to count rows: {e}"),
                operation: "counts".to_string(),
            })
    }

    /// Deletes all rows from every table.
    pub fn clear(&self) -> Result<()> {
        self.conn()
            .execute_batch(
                "DELETE FROM translations;
                 DELETE FROM objects;
                 DELETE FROM sites;",
            )
            .map_err(|e| RefTreeError::Database {
                message: format!("failed to clear database: {e}"),
                operation: "clear".to_string(),
            })
    }
}
