use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::Result;

/// A single column value carried in additional fields and flat records.
///
/// The JSON form is untagged: `null`, a number or a string. A `Guid` writes
/// as its hyphenated string and every JSON string reads back as `Text`, so
/// values compare and hash by their JSON form: `Guid(g) == Text(g.to_string())`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Int(i64),
    Guid(Uuid),
    Text(String),
}

/// Borrowed view of a value as it appears in JSON.
#[derive(PartialEq, Eq, Hash)]
enum Canonical<'a> {
    Null,
    Int(i64),
    Text(Cow<'a, str>),
}

impl FieldValue {
    fn canonical(&self) -> Canonical<'_> {
        match self {
            FieldValue::Null => Canonical::Null,
            FieldValue::Int(i) => Canonical::Int(*i),
            FieldValue::Guid(g) => Canonical::Text(Cow::Owned(g.hyphenated().to_string())),
            FieldValue::Text(s) => Canonical::Text(Cow::Borrowed(s)),
        }
    }

    /// Coerces the value to an integer id. Anything that is not a number
    /// (or a numeric string) becomes `0`.
    pub fn as_int(&self) -> i64 {
        match self {
            FieldValue::Int(i) => *i,
            FieldValue::Text(s) => s.trim().parse().unwrap_or(0),
            FieldValue::Guid(_) | FieldValue::Null => 0,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders text-like values as a string: `Text` as is, `Guid` hyphenated.
    pub fn to_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Guid(g) => Some(g.hyphenated().to_string()),
            _ => None,
        }
    }

    /// Returns the value as a UUID, parsing text values if needed.
    pub fn as_guid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Guid(g) => Some(*g),
            FieldValue::Text(s) => Uuid::parse_str(s.trim()).ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for FieldValue {}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = FieldValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("null, an integer or a string")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<FieldValue, E> {
                Ok(FieldValue::Null)
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<FieldValue, E> {
                Ok(FieldValue::Null)
            }

            fn visit_some<D: Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> std::result::Result<FieldValue, D::Error> {
                deserializer.deserialize_any(self)
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<FieldValue, E> {
                Ok(FieldValue::Int(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<FieldValue, E> {
                i64::try_from(value)
                    .map(FieldValue::Int)
                    .map_err(|_| E::custom(format!("integer {value} is out of range")))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<FieldValue, E> {
                Ok(FieldValue::Text(value.to_string()))
            }

            fn visit_string<E: de::Error>(self, value: String) -> std::result::Result<FieldValue, E> {
                Ok(FieldValue::Text(value))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Guid(value)
    }
}

/// Looks up a column by exact name, falling back to a case-insensitive match.
pub(crate) fn lookup_column<'a>(
    columns: &'a BTreeMap<String, FieldValue>,
    name: &str,
) -> Option<&'a FieldValue> {
    columns.get(name).or_else(|| {
        columns
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}

/// Insertion-ordered map of additional field values with unique keys.
///
/// Re-inserting an existing key replaces the value in place, so the key keeps
/// its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdditionalFields {
    entries: Vec<(String, FieldValue)>,
}

impl AdditionalFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Reads a key as an integer id; missing keys and NULL read as `0`.
    pub fn int_value(&self, key: &str) -> i64 {
        self.get(key).map(FieldValue::as_int).unwrap_or(0)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for AdditionalFields {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        let mut fields = AdditionalFields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

impl Serialize for AdditionalFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AdditionalFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = AdditionalFields;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field names to values")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut fields = AdditionalFields::new();
                while let Some((k, v)) = access.next_entry::<String, FieldValue>()? {
                    fields.insert(k, v);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// An object loaded from the backing store with all of its columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveObject {
    pub object_type: String,
    pub id: i64,
    pub columns: BTreeMap<String, FieldValue>,
}

impl LiveObject {
    pub fn new(object_type: impl Into<String>, id: i64) -> Self {
        Self {
            object_type: object_type.into(),
            id,
            columns: BTreeMap::new(),
        }
    }

    /// Builder-style column setter.
    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.columns.insert(name.into(), value.into());
        self
    }

    /// Returns the raw value of a column. Column names match case-insensitively.
    pub fn value(&self, column: &str) -> Option<&FieldValue> {
        lookup_column(&self.columns, column)
    }

    /// Returns a column coerced to an integer id (`0` if missing or non-numeric).
    pub fn int_value(&self, column: &str) -> i64 {
        self.value(column).map(FieldValue::as_int).unwrap_or(0)
    }
}

/// A flat, cached projection of an object used for translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub object_type: String,
    pub id: i64,
    pub guid: Option<Uuid>,
    pub code_name: Option<String>,
    pub site_name: Option<String>,
    pub group_id: i64,
    pub parent_id: i64,
    #[serde(default)]
    pub extra: BTreeMap<String, FieldValue>,
}

impl TranslationRecord {
    pub fn new(object_type: impl Into<String>, id: i64) -> Self {
        Self {
            object_type: object_type.into(),
            id,
            guid: None,
            code_name: None,
            site_name: None,
            group_id: 0,
            parent_id: 0,
            extra: BTreeMap::new(),
        }
    }

    pub fn extra_value(&self, column: &str) -> Option<&FieldValue> {
        lookup_column(&self.extra, column)
    }
}

/// A site as known to the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteIdentity {
    pub id: i64,
    pub name: String,
    pub guid: Uuid,
}

/// The portable identity of an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectIdentity {
    pub object_type: String,
    pub id: i64,
    /// Nil when the type has no GUID column.
    pub guid: Uuid,
    pub code_name: Option<String>,
}

/// Identity plus site, parent and group references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationReference {
    pub identity: ObjectIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<Box<TranslationReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<TranslationReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Box<TranslationReference>>,
}

impl TranslationReference {
    /// A leaf reference with no dependencies.
    pub fn leaf(identity: ObjectIdentity) -> Self {
        Self {
            identity,
            site: None,
            parent: None,
            group: None,
        }
    }
}

/// Which edge of the graph led to a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyEdge {
    Parent,
    Group,
    Category,
    /// Index into the type's declared filter dependencies.
    Filter(usize),
}

/// A translation reference extended with additional fields, a category and
/// filter dependencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedTranslationReference {
    pub identity: ObjectIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<Box<TranslationReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<ExtendedTranslationReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Box<ExtendedTranslationReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Box<ExtendedTranslationReference>>,
    #[serde(default)]
    pub additional_fields: AdditionalFields,
    /// One slot per declared filter dependency, in declaration order.
    #[serde(default)]
    pub filter_dependencies: Vec<Option<ExtendedTranslationReference>>,
}

impl ExtendedTranslationReference {
    /// Projects the extended tree down to the base reference shape.
    pub fn to_base(&self) -> TranslationReference {
        TranslationReference {
            identity: self.identity.clone(),
            site: self.site.clone(),
            parent: self.parent.as_ref().map(|p| Box::new(p.to_base())),
            group: self.group.as_ref().map(|g| Box::new(g.to_base())),
        }
    }

    /// Direct dependencies that resolved, tagged with the edge they came from.
    pub fn dependencies(&self) -> Vec<(DependencyEdge, &ExtendedTranslationReference)> {
        let mut deps = Vec::new();
        if let Some(parent) = &self.parent {
            deps.push((DependencyEdge::Parent, parent.as_ref()));
        }
        if let Some(group) = &self.group {
            deps.push((DependencyEdge::Group, group.as_ref()));
        }
        if let Some(category) = &self.category {
            deps.push((DependencyEdge::Category, category.as_ref()));
        }
        for (i, slot) in self.filter_dependencies.iter().enumerate() {
            if let Some(dep) = slot {
                deps.push((DependencyEdge::Filter(i), dep));
            }
        }
        deps
    }

    /// Hex SHA-256 of the canonical JSON form of the whole tree.
    ///
    /// Identical data yields an identical fingerprint across runs.
    pub fn fingerprint(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&json);
        Ok(hex::encode(hasher.finalize()))
    }
}
