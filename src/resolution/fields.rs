use crate::catalog::TypeMetadata;
use crate::types::{AdditionalFields, FieldValue, LiveObject, TranslationRecord};

/// Decides which extra columns a type needs for naming and filtering, and
/// extracts their values.
///
/// Field order is always: file-name fields as declared, then the category
/// column, then each filter dependency column as declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditionalFieldsResolver;

impl AdditionalFieldsResolver {
    pub fn new() -> Self {
        Self
    }

    /// Ordered, duplicate-free list of the extra columns `meta` needs.
    pub fn field_names(&self, meta: &TypeMetadata) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        };

        for field in &meta.file_name_fields {
            push(field.as_str());
        }
        if let Some(category) = &meta.category {
            push(category.column.as_str());
        }
        for dep in &meta.filter_dependencies {
            push(dep.column.as_str());
        }
        names
    }

    /// Extracts additional field values from a live object.
    pub fn field_values(&self, object: &LiveObject, meta: &TypeMetadata) -> AdditionalFields {
        collect(meta, |column| object.value(column))
    }

    /// Extracts additional field values from a flat translation record.
    pub fn record_values(&self, record: &TranslationRecord, meta: &TypeMetadata) -> AdditionalFields {
        collect(meta, |column| record.extra_value(column))
    }
}

fn collect<'v>(
    meta: &TypeMetadata,
    lookup: impl Fn(&str) -> Option<&'v FieldValue>,
) -> AdditionalFields {
    let mut fields = AdditionalFields::new();

    // A missing file-name field is recorded as NULL rather than rejected.
    for name in &meta.file_name_fields {
        let value = lookup(name.as_str()).cloned().unwrap_or(FieldValue::Null);
        fields.insert(name.clone(), value);
    }

    // Only an assigned category is recorded.
    if let Some(category) = &meta.category {
        let category_id = lookup(category.column.as_str()).map(FieldValue::as_int).unwrap_or(0);
        if category_id > 0 {
            fields.insert(category.column.clone(), FieldValue::Int(category_id));
        }
    }

    for dep in &meta.filter_dependencies {
        let id = lookup(dep.column.as_str()).map(FieldValue::as_int).unwrap_or(0);
        fields.insert(dep.column.clone(), FieldValue::Int(id));
    }

    fields
}
