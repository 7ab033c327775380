use serde::{Deserialize, Serialize};

/// Where a type sits in its hierarchy.
///
/// A `Main` type is the root of its own hierarchy. If it has a parent-id
/// column, that column holds an unrelated foreign key, so it is never followed
/// as a parent edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyRole {
    Main,
    #[default]
    Child,
}

impl HierarchyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            HierarchyRole::Main => "main",
            HierarchyRole::Child => "child",
        }
    }

    /// Whether the parent-id column is a real dependency edge.
    pub fn follows_parent(&self) -> bool {
        matches!(self, HierarchyRole::Child)
    }
}

/// Category binding of a type: the column holding the category id and the
/// category's object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBinding {
    pub object_type: String,
    pub column: String,
}

/// A declared foreign-key column that takes part in inclusion filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDependency {
    pub column: String,
    pub object_type: String,
}

/// Read-only per-type metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMetadata {
    pub object_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_name_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id_column: Option<String>,
    #[serde(default)]
    pub file_name_fields: Vec<String>,
    #[serde(default)]
    pub role: HierarchyRole,
    // Sub-tables must follow plain keys in TOML output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryBinding>,
    #[serde(default)]
    pub filter_dependencies: Vec<FilterDependency>,
}

impl TypeMetadata {
    /// Metadata with no columns declared; fill in the rest with struct update
    /// syntax or the builder methods.
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            guid_column: None,
            code_name_column: None,
            site_id_column: None,
            parent_object_type: None,
            parent_id_column: None,
            group_id_column: None,
            file_name_fields: Vec::new(),
            role: HierarchyRole::Child,
            category: None,
            filter_dependencies: Vec::new(),
        }
    }

    pub fn with_guid_column(mut self, column: impl Into<String>) -> Self {
        self.guid_column = Some(column.into());
        self
    }

    pub fn with_code_name_column(mut self, column: impl Into<String>) -> Self {
        self.code_name_column = Some(column.into());
        self
    }

    pub fn with_site_column(mut self, column: impl Into<String>) -> Self {
        self.site_id_column = Some(column.into());
        self
    }

    pub fn with_parent(
        mut self,
        parent_object_type: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.parent_object_type = Some(parent_object_type.into());
        self.parent_id_column = Some(column.into());
        self
    }

    pub fn with_group_column(mut self, column: impl Into<String>) -> Self {
        self.group_id_column = Some(column.into());
        self
    }

    pub fn with_category(
        mut self,
        category_object_type: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.category = Some(CategoryBinding {
            object_type: category_object_type.into(),
            column: column.into(),
        });
        self
    }

    pub fn with_file_name_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_name_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filter_dependency(
        mut self,
        column: impl Into<String>,
        object_type: impl Into<String>,
    ) -> Self {
        self.filter_dependencies.push(FilterDependency {
            column: column.into(),
            object_type: object_type.into(),
        });
        self
    }

    pub fn with_role(mut self, role: HierarchyRole) -> Self {
        self.role = role;
        self
    }

    pub fn is_main_object(&self) -> bool {
        self.role == HierarchyRole::Main
    }
}
