use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::metadata::TypeMetadata;
use crate::errors::{RefTreeError, Result};

/// Source of per-type metadata. Lookups are case-insensitive on the type name.
pub trait TypeMetadataProvider {
    /// Returns the metadata for `object_type`, or `None` for unknown types.
    fn type_info(&self, object_type: &str) -> Option<&TypeMetadata>;
}

/// On-disk shape of a catalog file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    types: Vec<TypeMetadata>,
}

/// In-memory type catalog, usually loaded from a TOML file:
///
/// ```toml
/// [[types]]
/// object_type = "shop.product"
/// guid_column = "ProductGUID"
/// file_name_fields = ["ProductName"]
/// category = { object_type = "shop.category", column = "ProductCategoryID" }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    /// Keyed by lowercased object type.
    types: HashMap<String, TypeMetadata>,
    /// Insertion order of the lowercased keys.
    order: Vec<String>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a catalog from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(contents)?;
        let mut catalog = Self::new();
        for meta in file.types {
            catalog.insert(meta)?;
        }
        catalog.check_references();
        Ok(catalog)
    }

    /// Loads a catalog file. A missing file yields an empty catalog.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no catalog file, starting with an empty catalog");
            return Ok(Self::new());
        }
        let contents = fs::read_to_string(path).map_err(|e| RefTreeError::Catalog {
            message: format!("failed to read catalog '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Serializes the catalog back to TOML, in insertion order.
    pub fn to_toml_string(&self) -> Result<String> {
        let file = CatalogFile {
            types: self.iter().cloned().collect(),
        };
        toml::to_string_pretty(&file).map_err(|e| RefTreeError::Catalog {
            message: format!("failed to serialize catalog: {e}"),
        })
    }

    /// Adds a type definition after validating it. Redefining a type is an error.
    pub fn insert(&mut self, meta: TypeMetadata) -> Result<()> {
        validate(&meta)?;
        let key = meta.object_type.to_lowercase();
        if self.types.contains_key(&key) {
            return Err(RefTreeError::Catalog {
                message: format!("object type '{}' is defined twice", meta.object_type),
            });
        }
        self.order.push(key.clone());
        self.types.insert(key, meta);
        Ok(())
    }

    /// Builder-style variant of [`TypeCatalog::insert`].
    pub fn with_type(mut self, meta: TypeMetadata) -> Result<Self> {
        self.insert(meta)?;
        Ok(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeMetadata> {
        self.order.iter().filter_map(|k| self.types.get(k))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Logs every referenced type that has no definition. Such edges resolve
    /// to `None` at resolution time.
    fn check_references(&self) {
        for meta in self.iter() {
            let referenced = meta
                .parent_object_type
                .iter()
                .chain(meta.category.iter().map(|c| &c.object_type))
                .chain(meta.filter_dependencies.iter().map(|d| &d.object_type));
            for target in referenced {
                if !self.types.contains_key(&target.to_lowercase()) {
                    warn!(
                        object_type = %meta.object_type,
                        target = %target,
                        "catalog references an undefined object type"
                    );
                }
            }
        }
    }
}

impl TypeMetadataProvider for TypeCatalog {
    fn type_info(&self, object_type: &str) -> Option<&TypeMetadata> {
        self.types.get(&object_type.to_lowercase())
    }
}

fn validate(meta: &TypeMetadata) -> Result<()> {
    let fail = |message: String| Err(RefTreeError::Catalog { message });

    if meta.object_type.trim().is_empty() {
        return fail("object type name must not be empty".to_string());
    }
    if meta.parent_object_type.is_some() != meta.parent_id_column.is_some() {
        return fail(format!(
            "object type '{}' must declare both parent_object_type and parent_id_column, or neither",
            meta.object_type
        ));
    }
    if let Some(category) = &meta.category {
        if category.object_type.trim().is_empty() || category.column.trim().is_empty() {
            return fail(format!(
                "object type '{}' has an incomplete category binding",
                meta.object_type
            ));
        }
    }
    for (i, dep) in meta.filter_dependencies.iter().enumerate() {
        if dep.column.trim().is_empty() || dep.object_type.trim().is_empty() {
            return fail(format!(
                "object type '{}' has an incomplete filter dependency at position {i}",
                meta.object_type
            ));
        }
    }
    Ok(())
}
