use reftree::catalog::*;
use reftree::errors::{RefTreeError, Result};
use reftree::resolution::{ReferenceGraphBuilder, ResolutionSession};
use reftree::store::{MemoryStore, ObjectStore, TranslationRecordStore};
use reftree::types::*;
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn guid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

/// Catalog covering every dependency edge the builder follows.
fn fixture_catalog() -> TypeCatalog {
    let types = vec![
        TypeMetadata::new("shop.product")
            .with_guid_column("ProductGUID")
            .with_file_name_fields(["ProductName"])
            .with_category("shop.category", "ProductCategoryID"),
        TypeMetadata::new("shop.category")
            .with_guid_column("CategoryGUID")
            .with_code_name_column("CategoryName"),
        TypeMetadata::new("shop.discount")
            .with_code_name_column("DiscountName")
            .with_filter_dependency("DiscountBrandID", "shop.brand")
            .with_filter_dependency("DiscountCollectionID", "shop.collection"),
        TypeMetadata::new("shop.brand").with_code_name_column("BrandName"),
        TypeMetadata::new("shop.collection").with_code_name_column("CollectionName"),
        TypeMetadata::new("cms.class")
            .with_code_name_column("ClassName")
            .with_parent("cms.class", "ClassInheritsFromClassID")
            .with_role(HierarchyRole::Main),
        TypeMetadata::new("cms.form")
            .with_code_name_column("FormName")
            .with_site_column("FormSiteID")
            .with_parent("cms.class", "FormClassID"),
        TypeMetadata::new("cms.query")
            .with_code_name_column("QueryName")
            .with_parent("cms.form", "QueryFormID"),
        TypeMetadata::new("community.group")
            .with_guid_column("GroupGUID")
            .with_code_name_column("GroupName"),
        TypeMetadata::new("board.message")
            .with_group_column("MessageGroupID")
            .with_filter_dependency("MessageAuthorGroupID", "community.group"),
        TypeMetadata::new("test.node")
            .with_code_name_column("NodeName")
            .with_parent("test.node", "NodeParentID"),
    ];

    let mut catalog = TypeCatalog::new();
    for meta in types {
        catalog.insert(meta).expect("fixture type should be valid");
    }
    catalog
}

fn fixture_store() -> MemoryStore {
    let mut store = MemoryStore::new();

    store.insert_site(SiteIdentity {
        id: 1,
        name: "DancingGoat".to_string(),
        guid: guid(0x51),
    });

    store.insert_object(
        LiveObject::new("shop.product", 42)
            .with_column("ProductGUID", guid(42))
            .with_column("ProductName", "Widget")
            .with_column("ProductCategoryID", 7),
    );
    store.insert_object(
        LiveObject::new("shop.product", 43)
            .with_column("ProductName", "Orphan")
            .with_column("ProductCategoryID", 99),
    );
    store.insert_object(
        LiveObject::new("shop.category", 7)
            .with_column("CategoryGUID", guid(7))
            .with_column("CategoryName", "Gadgets"),
    );

    store.insert_object(
        LiveObject::new("shop.discount", 1)
            .with_column("DiscountName", "Summer")
            .with_column("DiscountBrandID", 404)
            .with_column("DiscountCollectionID", "8"),
    );
    store.insert_object(LiveObject::new("shop.collection", 8).with_column("CollectionName", "Summer"));

    store.insert_object(LiveObject::new("cms.class", 3).with_column("ClassName", "Base"));
    let mut inherited = TranslationRecord::new("cms.class", 5);
    inherited.code_name = Some("Derived".to_string());
    inherited.parent_id = 3;
    store.insert_record(inherited);

    store.insert_object(
        LiveObject::new("cms.form", 10)
            .with_column("FormName", "ContactUs")
            .with_column("FormSiteID", 1)
            .with_column("FormClassID", 3),
    );
    let mut form_record = TranslationRecord::new("cms.form", 11);
    form_record.code_name = Some("Newsletter".to_string());
    form_record.site_name = Some("dancinggoat".to_string());
    store.insert_record(form_record);

    store.insert_object(
        LiveObject::new("cms.query", 20)
            .with_column("QueryName", "SelectAll")
            .with_column("QueryFormID", 10),
    );

    store.insert_object(
        LiveObject::new("community.group", 9)
            .with_column("GroupGUID", guid(9))
            .with_column("GroupName", "Editors"),
    );
    store.insert_object(
        LiveObject::new("board.message", 5)
            .with_column("MessageGroupID", 9)
            .with_column("MessageAuthorGroupID", 9),
    );

    store.insert_object(
        LiveObject::new("test.node", 1)
            .with_column("NodeName", "one")
            .with_column("NodeParentID", 2),
    );
    store.insert_object(
        LiveObject::new("test.node", 2)
            .with_column("NodeName", "two")
            .with_column("NodeParentID", 1),
    );

    store
}

#[test]
fn test_scenario_product_with_category() {
    init_tracing();
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    let product = builder
        .from_identity("shop.product", 42)
        .expect("resolution should succeed")
        .expect("product should resolve");

    assert_eq!(product.identity.object_type, "shop.product");
    assert_eq!(product.identity.id, 42);
    assert_eq!(product.identity.guid, guid(42));
    assert_eq!(product.identity.code_name, None);

    let keys: Vec<&str> = product.additional_fields.keys().collect();
    assert_eq!(keys, vec!["ProductName", "ProductCategoryID"]);
    assert_eq!(
        product.additional_fields.get("ProductName"),
        Some(&FieldValue::Text("Widget".to_string()))
    );
    assert_eq!(
        product.additional_fields.get("ProductCategoryID"),
        Some(&FieldValue::Int(7))
    );

    let expected_category = builder
        .from_identity("shop.category", 7)
        .expect("resolution should succeed");
    assert_eq!(product.category.as_deref(), expected_category.as_ref());
    assert_eq!(product.parent, None);
    assert_eq!(product.site, None);
    assert!(product.filter_dependencies.is_empty());

    let category = product.category.expect("category should resolve");
    assert_eq!(category.identity.code_name.as_deref(), Some("Gadgets"));
    assert_eq!(category.identity.guid, guid(7));
}

#[test]
fn test_non_positive_ids_short_circuit_for_every_type() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    for meta in catalog.iter() {
        for id in [0, -5] {
            let result = builder
                .from_identity(&meta.object_type, id)
                .expect("resolution should succeed");
            assert!(result.is_none(), "{} {id} should not resolve", meta.object_type);
        }
    }
    assert!(builder.from_identity("", 42).unwrap().is_none());
    assert_eq!(store.record_lookups(), 0, "no store trips for short-circuited ids");
    assert_eq!(store.object_lookups(), 0);
}

#[test]
fn test_unknown_type_and_missing_row_resolve_to_none() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    assert!(builder.from_identity("no.such.type", 1).unwrap().is_none());
    assert!(builder.from_identity("shop.product", 1000).unwrap().is_none());
}

#[test]
fn test_deleted_category_leaves_empty_edge() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    let product = builder.from_identity("shop.product", 43).unwrap().unwrap();
    assert_eq!(product.category, None);
    assert_eq!(product.additional_fields.int_value("ProductCategoryID"), 99);
}

#[test]
fn test_main_object_never_gets_a_parent() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    // The record carries parent id 3 and class 3 exists.
    assert!(builder.from_identity("cms.class", 3).unwrap().is_some());

    let class = builder.from_identity("cms.class", 5).unwrap().unwrap();
    assert_eq!(class.identity.code_name.as_deref(), Some("Derived"));
    assert_eq!(class.parent, None);

    let base = builder.base_from_identity("cms.class", 5).unwrap().unwrap();
    assert_eq!(base.parent, None);
}

#[test]
fn test_filter_dependencies_keep_positions() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    let discount = builder.from_identity("shop.discount", 1).unwrap().unwrap();
    assert_eq!(discount.filter_dependencies.len(), 2);
    assert_eq!(discount.filter_dependencies[0], None);

    let collection = discount.filter_dependencies[1]
        .as_ref()
        .expect("collection should resolve");
    assert_eq!(collection.identity.object_type, "shop.collection");
    assert_eq!(collection.identity.id, 8);

    // The numeric string was coerced when it was copied into the fields.
    assert_eq!(
        discount.additional_fields.get("DiscountCollectionID"),
        Some(&FieldValue::Int(8))
    );
    assert_eq!(
        discount.dependencies().iter().map(|(edge, _)| *edge).collect::<Vec<_>>(),
        vec![DependencyEdge::Filter(1)]
    );
}

#[test]
fn test_site_resolved_only_for_types_with_site_column() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    let form = builder.from_identity("cms.form", 10).unwrap().unwrap();
    let site = form.site.as_ref().expect("form should have a site");
    assert_eq!(site.identity.object_type, "cms.site");
    assert_eq!(site.identity.id, 1);
    assert_eq!(site.identity.guid, guid(0x51));
    assert_eq!(site.identity.code_name.as_deref(), Some("DancingGoat"));

    let parent = form.parent.as_ref().expect("form should have a parent class");
    assert_eq!(parent.identity.code_name.as_deref(), Some("Base"));

    // The query's parent form has a site, but the query does not inherit it.
    let query = builder.from_identity("cms.query", 20).unwrap().unwrap();
    assert_eq!(query.site, None);
    assert!(query.parent.as_ref().unwrap().site.is_some());
}

#[test]
fn test_site_from_record_is_matched_by_name() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    let form = builder.from_identity("cms.form", 11).unwrap().unwrap();
    assert_eq!(form.site.unwrap().identity.id, 1);
    assert_eq!(form.parent, None);
}

#[test]
fn test_shared_target_is_resolved_on_each_edge() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    let message = builder.from_identity("board.message", 5).unwrap().unwrap();
    let group = message.group.as_deref().expect("group should resolve");
    let author_group = message.filter_dependencies[0]
        .as_ref()
        .expect("author group should resolve");

    assert_eq!(group, author_group);
    assert_eq!(group.identity.code_name.as_deref(), Some("Editors"));
    assert_eq!(group.identity.guid, guid(9));
    // One store trip per distinct row despite two edges.
    assert_eq!(store.record_lookups(), 2);
}

#[test]
fn test_cycle_resolves_to_empty_edge() {
    init_tracing();
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    let one = builder.from_identity("test.node", 1).unwrap().unwrap();
    let two = one.parent.as_deref().expect("node two should resolve");
    assert_eq!(two.identity.code_name.as_deref(), Some("two"));
    assert_eq!(two.parent, None, "edge back to node one closes the cycle");

    let base = builder.base_from_identity("test.node", 2).unwrap().unwrap();
    assert_eq!(base.parent.as_ref().unwrap().identity.id, 1);
    assert_eq!(base.parent.as_ref().unwrap().parent, None);
}

#[test]
fn test_resolution_is_idempotent_and_cached() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    let first = builder.from_identity("shop.product", 42).unwrap();
    assert_eq!(store.record_lookups(), 2);
    assert_eq!(store.object_lookups(), 2);

    let second = builder.from_identity("shop.product", 42).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.as_ref().unwrap().fingerprint().unwrap(),
        second.as_ref().unwrap().fingerprint().unwrap()
    );
    assert_eq!(store.record_lookups(), 2, "second pass should be served from cache");
    assert_eq!(store.object_lookups(), 2);

    session.begin_run();
    let third = builder.from_identity("shop.product", 42).unwrap();
    assert_eq!(first, third);
    assert_eq!(store.record_lookups(), 4);
}

#[test]
fn test_live_object_root_skips_store() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    let object = store
        .get_live_object_by_id("shop.product", 42)
        .unwrap()
        .unwrap();
    store.reset_counters();

    let from_object = builder.from_live_object(&object).unwrap().unwrap();
    assert_eq!(store.record_lookups(), 1, "only the category is looked up");

    let from_identity = builder.from_identity("shop.product", 42).unwrap().unwrap();
    assert_eq!(from_object, from_identity);
}

#[test]
fn test_live_object_without_id_is_none() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    let unsaved = LiveObject::new("shop.product", 0).with_column("ProductName", "Draft");
    assert!(builder.from_live_object(&unsaved).unwrap().is_none());
}

#[test]
fn test_base_reference_matches_extended_projection() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    let extended = builder.from_identity("cms.query", 20).unwrap().unwrap();
    let base = builder.base_from_identity("cms.query", 20).unwrap().unwrap();
    assert_eq!(extended.to_base(), base);
}

#[test]
fn test_missing_fields_resolver_is_a_configuration_error() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder =
        ReferenceGraphBuilder::new(&catalog, &store, &store, &session).without_additional_fields();

    let err = builder.from_identity("shop.product", 42).unwrap_err();
    assert!(matches!(err, RefTreeError::Configuration { .. }));
    assert!(err.to_string().contains("not configured for additional fields"));
    assert!(matches!(
        builder.field_names("shop.product"),
        Err(RefTreeError::Configuration { .. })
    ));

    // Base references do not need additional fields.
    assert!(builder.base_from_identity("shop.product", 42).unwrap().is_some());
}

#[test]
fn test_custom_group_object_type() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session)
        .with_group_object_type("missing.group");

    let message = builder.from_identity("board.message", 5).unwrap().unwrap();
    assert_eq!(message.group, None);
    assert!(message.filter_dependencies[0].is_some());
}

/// Record store that fails for one object type.
struct FailingRecords<'a> {
    inner: &'a MemoryStore,
    failing_type: &'static str,
}

impl TranslationRecordStore for FailingRecords<'_> {
    fn get_record(&self, object_type: &str, id: i64) -> Result<Option<TranslationRecord>> {
        if object_type.eq_ignore_ascii_case(self.failing_type) {
            return Err(RefTreeError::Store {
                message: "connection reset".to_string(),
                object_type: object_type.to_string(),
            });
        }
        self.inner.get_record(object_type, id)
    }
}

#[test]
fn test_store_error_aborts_whole_resolution() {
    let catalog = fixture_catalog();
    let store = fixture_store();
    let records = FailingRecords {
        inner: &store,
        failing_type: "shop.category",
    };
    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &records, &session);

    let err = builder.from_identity("shop.product", 42).unwrap_err();
    match err {
        RefTreeError::Store { object_type, .. } => assert_eq!(object_type, "shop.category"),
        other => panic!("expected store error, got {other:?}"),
    }

    // Types that never touch the failing one still resolve.
    assert!(builder.from_identity("shop.collection", 8).unwrap().is_some());
}

#[test]
fn test_empty_code_name_reads_as_absent_for_records_and_live_objects() {
    let catalog = fixture_catalog();
    let mut store = MemoryStore::new();
    let live = LiveObject::new("shop.category", 30)
        .with_column("CategoryGUID", guid(30))
        .with_column("CategoryName", "");
    store.insert_object(live.clone());
    let mut record = TranslationRecord::new("shop.category", 30);
    record.guid = Some(guid(30));
    record.code_name = Some(String::new());
    store.insert_record(record);

    let session = ResolutionSession::new();
    let builder = ReferenceGraphBuilder::new(&catalog, &store, &store, &session);

    let from_record = builder.from_identity("shop.category", 30).unwrap().unwrap();
    let from_live = builder.from_live_object(&live).unwrap().unwrap();
    assert_eq!(from_record.identity.code_name, None);
    assert_eq!(from_record.identity, from_live.identity);
}
