/// Object type metadata and the catalog that serves it.
mod metadata;
mod provider;

pub use metadata::{CategoryBinding, FilterDependency, HierarchyRole, TypeMetadata};
pub use provider::{TypeCatalog, TypeMetadataProvider};
