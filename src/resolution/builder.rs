use std::collections::HashSet;

use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::fields::AdditionalFieldsResolver;
use super::session::ResolutionSession;
use crate::catalog::{TypeMetadata, TypeMetadataProvider};
use crate::config::{DEFAULT_GROUP_OBJECT_TYPE, DEFAULT_SITE_OBJECT_TYPE};
use crate::errors::{RefTreeError, Result};
use crate::store::{ObjectStore, RecordSource, TranslationRecordStore};
use crate::types::*;

/// The `(object type, id)` nodes on the current recursion path.
///
/// Meeting a node that is already on the path means the data (or the
/// metadata) forms a cycle; that edge resolves to `None`.
#[derive(Debug, Default)]
struct ResolutionPath {
    nodes: HashSet<(String, i64)>,
}

impl ResolutionPath {
    fn enter(&mut self, object_type: &str, id: i64) -> bool {
        self.nodes.insert((object_type.to_lowercase(), id))
    }

    fn leave(&mut self, object_type: &str, id: i64) {
        self.nodes.remove(&(object_type.to_lowercase(), id));
    }
}

/// Where the columns of the node being resolved come from.
enum NodeSource<'r> {
    Live(&'r LiveObject),
    Record(&'r TranslationRecord),
}

impl NodeSource<'_> {
    fn id(&self) -> i64 {
        match self {
            NodeSource::Live(object) => object.id,
            NodeSource::Record(record) => record.id,
        }
    }

    fn guid(&self, meta: &TypeMetadata) -> Uuid {
        let guid = match self {
            NodeSource::Live(object) => meta
                .guid_column
                .as_deref()
                .and_then(|c| object.value(c))
                .and_then(FieldValue::as_guid),
            NodeSource::Record(record) => record.guid,
        };
        guid.unwrap_or_else(Uuid::nil)
    }

    fn code_name(&self, meta: &TypeMetadata) -> Option<String> {
        match self {
            NodeSource::Live(object) => meta
                .code_name_column
                .as_deref()
                .and_then(|c| object.value(c))
                .and_then(FieldValue::to_text)
                .filter(|s| !s.is_empty()),
            NodeSource::Record(record) => record.code_name.clone().filter(|s| !s.is_empty()),
        }
    }

    fn parent_id(&self, meta: &TypeMetadata) -> i64 {
        match self {
            NodeSource::Live(object) => meta
                .parent_id_column
                .as_deref()
                .map(|c| object.int_value(c))
                .unwrap_or(0),
            NodeSource::Record(record) => record.parent_id,
        }
    }

    fn group_id(&self, meta: &TypeMetadata) -> i64 {
        match self {
            NodeSource::Live(object) => meta
                .group_id_column
                .as_deref()
                .map(|c| object.int_value(c))
                .unwrap_or(0),
            NodeSource::Record(record) => record.group_id,
        }
    }

    fn additional_fields(
        &self,
        fields: &AdditionalFieldsResolver,
        meta: &TypeMetadata,
    ) -> AdditionalFields {
        match self {
            NodeSource::Live(object) => fields.field_values(object, meta),
            NodeSource::Record(record) => fields.record_values(record, meta),
        }
    }
}

/// Builds translation reference trees by recursively resolving the site,
/// parent, group, category and filter dependencies of an object.
///
/// Each builder borrows the catalog, the stores and a [`ResolutionSession`]
/// whose caches are shared by every resolution it performs. Trees are rebuilt
/// on every call and never share nodes: an object reachable over two edges is
/// resolved once per edge, with the record cache keeping that cheap.
pub struct ReferenceGraphBuilder<'a> {
    catalog: &'a dyn TypeMetadataProvider,
    objects: &'a dyn ObjectStore,
    source: RecordSource<'a>,
    session: &'a ResolutionSession,
    fields: Option<AdditionalFieldsResolver>,
    site_object_type: String,
    group_object_type: String,
}

impl<'a> ReferenceGraphBuilder<'a> {
    /// Creates a builder that produces extended references.
    pub fn new(
        catalog: &'a dyn TypeMetadataProvider,
        objects: &'a dyn ObjectStore,
        records: &'a dyn TranslationRecordStore,
        session: &'a ResolutionSession,
    ) -> Self {
        Self {
            catalog,
            objects,
            source: RecordSource::new(records, objects, session.records(), session.sites()),
            session,
            fields: Some(AdditionalFieldsResolver::new()),
            site_object_type: DEFAULT_SITE_OBJECT_TYPE.to_string(),
            group_object_type: DEFAULT_GROUP_OBJECT_TYPE.to_string(),
        }
    }

    /// Drops the additional-fields resolver. Only the base entry points work
    /// afterwards; the extended ones fail with a configuration error.
    pub fn without_additional_fields(mut self) -> Self {
        self.fields = None;
        self
    }

    pub fn with_fields_resolver(mut self, fields: AdditionalFieldsResolver) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_site_object_type(mut self, object_type: impl Into<String>) -> Self {
        self.site_object_type = object_type.into();
        self
    }

    pub fn with_group_object_type(mut self, object_type: impl Into<String>) -> Self {
        self.group_object_type = object_type.into();
        self
    }

    pub fn session(&self) -> &ResolutionSession {
        self.session
    }

    fn fields(&self) -> Result<AdditionalFieldsResolver> {
        self.fields.ok_or_else(RefTreeError::fields_not_configured)
    }

    /// Ordered extra columns the type needs. Unknown types need none.
    pub fn field_names(&self, object_type: &str) -> Result<Vec<String>> {
        let fields = self.fields()?;
        Ok(self
            .catalog
            .type_info(object_type)
            .map(|meta| fields.field_names(meta))
            .unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Extended entry points
    // ------------------------------------------------------------------

    /// Resolves an object that is already in memory. The root itself costs no
    /// store round trip; its dependencies go through the record cache.
    pub fn from_live_object(
        &self,
        object: &LiveObject,
    ) -> Result<Option<ExtendedTranslationReference>> {
        let fields = self.fields()?;
        let Some(meta) = self.lookup_type(&object.object_type, object.id) else {
            return Ok(None);
        };
        debug!(object_type = %meta.object_type, id = object.id, "resolving live object");

        let mut path = ResolutionPath::default();
        path.enter(&meta.object_type, object.id);
        let reference = self.compose(meta, &NodeSource::Live(object), &fields, &mut path)?;
        Ok(Some(reference))
    }

    /// Resolves an object by type and id.
    pub fn from_identity(
        &self,
        object_type: &str,
        id: i64,
    ) -> Result<Option<ExtendedTranslationReference>> {
        let fields = self.fields()?;
        debug!(object_type, id, "resolving object");
        let mut path = ResolutionPath::default();
        self.resolve(object_type, id, &fields, &mut path)
    }

    fn resolve(
        &self,
        object_type: &str,
        id: i64,
        fields: &AdditionalFieldsResolver,
        path: &mut ResolutionPath,
    ) -> Result<Option<ExtendedTranslationReference>> {
        let Some(meta) = self.lookup_type(object_type, id) else {
            return Ok(None);
        };
        if !path.enter(&meta.object_type, id) {
            warn!(object_type = %meta.object_type, id, "dependency cycle detected, edge left empty");
            return Ok(None);
        }

        let reference = match self.source.get(meta, id)? {
            Some(record) => Some(self.compose(meta, &NodeSource::Record(&record), fields, path)?),
            None => {
                trace!(object_type = %meta.object_type, id, "object not found");
                None
            }
        };

        path.leave(&meta.object_type, id);
        Ok(reference)
    }

    fn compose(
        &self,
        meta: &TypeMetadata,
        node: &NodeSource<'_>,
        fields: &AdditionalFieldsResolver,
        path: &mut ResolutionPath,
    ) -> Result<ExtendedTranslationReference> {
        let identity = self.identity(meta, node);
        // Category and filter dependency ids are read from these values.
        let additional_fields = node.additional_fields(fields, meta);
        let site = self.site(meta, node)?.map(Box::new);

        let parent = match self.parent_edge(meta, node) {
            Some((parent_type, parent_id)) => self
                .resolve(parent_type, parent_id, fields, path)?
                .map(Box::new),
            None => None,
        };

        let group = match node.group_id(meta) {
            id if id > 0 => self
                .resolve(&self.group_object_type, id, fields, path)?
                .map(Box::new),
            _ => None,
        };

        let category = match &meta.category {
            Some(binding) => self
                .resolve(
                    &binding.object_type,
                    additional_fields.int_value(&binding.column),
                    fields,
                    path,
                )?
                .map(Box::new),
            None => None,
        };

        let mut filter_dependencies = Vec::with_capacity(meta.filter_dependencies.len());
        for dep in &meta.filter_dependencies {
            let id = additional_fields.int_value(&dep.column);
            filter_dependencies.push(self.resolve(&dep.object_type, id, fields, path)?);
        }

        Ok(ExtendedTranslationReference {
            identity,
            site,
            parent,
            group,
            category,
            additional_fields,
            filter_dependencies,
        })
    }

    // ------------------------------------------------------------------
    // Base entry points
    // ------------------------------------------------------------------

    /// Resolves identity, site, parent and group only. Works without an
    /// additional-fields resolver.
    pub fn base_from_identity(
        &self,
        object_type: &str,
        id: i64,
    ) -> Result<Option<TranslationReference>> {
        let mut path = ResolutionPath::default();
        self.resolve_base(object_type, id, &mut path)
    }

    pub fn base_from_live_object(&self, object: &LiveObject) -> Result<Option<TranslationReference>> {
        let Some(meta) = self.lookup_type(&object.object_type, object.id) else {
            return Ok(None);
        };
        let mut path = ResolutionPath::default();
        path.enter(&meta.object_type, object.id);
        self.compose_base(meta, &NodeSource::Live(object), &mut path)
            .map(Some)
    }

    fn resolve_base(
        &self,
        object_type: &str,
        id: i64,
        path: &mut ResolutionPath,
    ) -> Result<Option<TranslationReference>> {
        let Some(meta) = self.lookup_type(object_type, id) else {
            return Ok(None);
        };
        if !path.enter(&meta.object_type, id) {
            warn!(object_type = %meta.object_type, id, "dependency cycle detected, edge left empty");
            return Ok(None);
        }

        let reference = match self.source.get(meta, id)? {
            Some(record) => Some(self.compose_base(meta, &NodeSource::Record(&record), path)?),
            None => None,
        };

        path.leave(&meta.object_type, id);
        Ok(reference)
    }

    fn compose_base(
        &self,
        meta: &TypeMetadata,
        node: &NodeSource<'_>,
        path: &mut ResolutionPath,
    ) -> Result<TranslationReference> {
        let identity = self.identity(meta, node);
        let site = self.site(meta, node)?.map(Box::new);
        let parent = match self.parent_edge(meta, node) {
            Some((parent_type, parent_id)) => self
                .resolve_base(parent_type, parent_id, path)?
                .map(Box::new),
            None => None,
        };
        let group = match node.group_id(meta) {
            id if id > 0 => self
                .resolve_base(&self.group_object_type, id, path)?
                .map(Box::new),
            _ => None,
        };

        Ok(TranslationReference {
            identity,
            site,
            parent,
            group,
        })
    }

    // ------------------------------------------------------------------
    // Private helpers
    // ------------------------------------------------------------------

    /// The base case: no type, a non-positive id or an unknown type.
    fn lookup_type(&self, object_type: &str, id: i64) -> Option<&'a TypeMetadata> {
        if id <= 0 || object_type.trim().is_empty() {
            return None;
        }
        let catalog: &'a dyn TypeMetadataProvider = self.catalog;
        let meta = catalog.type_info(object_type);
        if meta.is_none() {
            debug!(object_type, id, "unknown object type");
        }
        meta
    }

    fn identity(&self, meta: &TypeMetadata, node: &NodeSource<'_>) -> ObjectIdentity {
        ObjectIdentity {
            object_type: meta.object_type.clone(),
            id: node.id(),
            guid: node.guid(meta),
            code_name: node.code_name(meta),
        }
    }

    /// The parent type and id to follow, if the type has a parent edge.
    ///
    /// Main objects reuse the parent-id column for an unrelated key, so they
    /// never get one.
    fn parent_edge<'m>(&self, meta: &'m TypeMetadata, node: &NodeSource<'_>) -> Option<(&'m str, i64)> {
        if !meta.role.follows_parent() {
            trace!(object_type = %meta.object_type, "main object, parent edge skipped");
            return None;
        }
        let parent_type = meta.parent_object_type.as_deref()?;
        let parent_id = node.parent_id(meta);
        (parent_id > 0).then_some((parent_type, parent_id))
    }

    /// Site reference, only for types that declare a site column.
    fn site(&self, meta: &TypeMetadata, node: &NodeSource<'_>) -> Result<Option<TranslationReference>> {
        let Some(column) = meta.site_id_column.as_deref() else {
            return Ok(None);
        };
        let sites = self.session.sites();
        let site = match node {
            NodeSource::Live(object) => sites.by_id(self.objects, object.int_value(column))?,
            NodeSource::Record(record) => match record.site_name.as_deref() {
                Some(name) => sites.by_name(self.objects, name)?,
                None => None,
            },
        };

        Ok(site.map(|site| {
            TranslationReference::leaf(ObjectIdentity {
                object_type: self.site_object_type.clone(),
                id: site.id,
                guid: site.guid,
                code_name: Some(site.name),
            })
        }))
    }
}
