use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::catalog::TypeCatalog;
use crate::config::{get_reftree_dir, load_config, save_config, ResolverConfig};
use crate::db::Database;
use crate::errors::{RefTreeError, Result};
use crate::resolution::{FilterConditionCache, ReferenceGraphBuilder, ResolutionSession, SessionStats};
use crate::types::*;

/// Ties a project's configuration, type catalog, SQLite store and resolution
/// session together.
pub struct RefTree {
    db: Database,
    catalog: TypeCatalog,
    config: ResolverConfig,
    session: ResolutionSession,
    project_root: PathBuf,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

impl RefTree {
    /// Initializes a new project at the given root.
    ///
    /// Creates the `.reftree` directory, writes a default configuration and
    /// an empty catalog file (unless one exists), and initializes a fresh
    /// database.
    pub fn init(project_root: &Path) -> Result<Self> {
        let config = ResolverConfig::default();
        save_config(project_root, &config)?;

        let catalog_path = config.catalog_path(project_root);
        if !catalog_path.exists() {
            fs::write(&catalog_path, "").map_err(|e| RefTreeError::Catalog {
                message: format!("failed to create catalog '{}': {e}", catalog_path.display()),
            })?;
        }
        let catalog = TypeCatalog::load(&catalog_path)?;
        let db = Database::initialize(&config.database_path(project_root))?;

        info!(root = %project_root.display(), "initialized reftree project");
        Ok(Self {
            db,
            catalog,
            config,
            session: ResolutionSession::new(),
            project_root: project_root.to_path_buf(),
        })
    }

    /// Opens an existing project, loading its configuration and catalog.
    pub fn open(project_root: &Path) -> Result<Self> {
        let config = load_config(project_root)?;
        let db_path = config.database_path(project_root);

        if !db_path.exists() {
            return Err(RefTreeError::Config {
                message: format!(
                    "no reftree database found at '{}'; initialize the project first",
                    db_path.display()
                ),
            });
        }

        let catalog = TypeCatalog::load(&config.catalog_path(project_root))?;
        let db = Database::open(&db_path)?;
        info!(
            root = %project_root.display(),
            types = catalog.len(),
            "opened reftree project"
        );
        Ok(Self {
            db,
            catalog,
            config,
            session: ResolutionSession::new(),
            project_root: project_root.to_path_buf(),
        })
    }

    /// Returns `true` if a project has been initialized at the given root.
    pub fn is_initialized(project_root: &Path) -> bool {
        match load_config(project_root) {
            Ok(config) => config.database_path(project_root).exists(),
            Err(_) => get_reftree_dir(project_root).exists(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

impl RefTree {
    fn builder(&self) -> ReferenceGraphBuilder<'_> {
        ReferenceGraphBuilder::new(&self.catalog, &self.db, &self.db, &self.session)
            .with_site_object_type(self.config.site_object_type.clone())
            .with_group_object_type(self.config.group_object_type.clone())
    }

    /// Starts a new export/import run, dropping everything cached so far.
    pub fn begin_run(&self) -> u64 {
        self.session.begin_run()
    }

    /// Resolves the extended reference of an object by type and id.
    pub fn resolve(&self, object_type: &str, id: i64) -> Result<Option<ExtendedTranslationReference>> {
        self.builder().from_identity(object_type, id)
    }

    /// Resolves the extended reference of an object that is already loaded.
    pub fn resolve_object(&self, object: &LiveObject) -> Result<Option<ExtendedTranslationReference>> {
        self.builder().from_live_object(object)
    }

    /// Resolves only identity, site, parent and group.
    pub fn resolve_base(&self, object_type: &str, id: i64) -> Result<Option<TranslationReference>> {
        self.builder().base_from_identity(object_type, id)
    }

    /// Ordered additional field names of a type.
    pub fn field_names(&self, object_type: &str) -> Result<Vec<String>> {
        self.builder().field_names(object_type)
    }

    pub fn filter_conditions(&self) -> &FilterConditionCache {
        self.session.filter_conditions()
    }

    pub fn session_stats(&self) -> SessionStats {
        self.session.stats()
    }
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl RefTree {
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}
