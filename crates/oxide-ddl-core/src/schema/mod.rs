//! The schema model: pure data describing tables, columns, constraints,
//! indexes and the other objects a schema can hold.
//!
//! Everything here is plain data with accessors. Validation lives in
//! [`crate::validate`], SQL rendering in [`crate::generate`].
//!
//! ```rust
//! use oxide_ddl_core::schema::{bigint, text, IndexDefinition, TableDefinition};
//!
//! let users = TableDefinition::builder("users")
//!     .column(bigint("id").primary_key().auto_increment().build())
//!     .column(text("email").not_null().unique().build())
//!     .index(IndexDefinition::builder("idx_users_email", "users").column("email").build())
//!     .build();
//! assert_eq!(users.primary_key_columns(), vec!["id"]);
//! ```

mod column;
mod constraint;
mod index;
mod objects;
mod table;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use column::{
    bigint, boolean, column, date, integer, jsonb, numeric, smallint, text, timestamp,
    timestamptz, uuid, varchar, ColumnBuilder, ColumnDefinition, DefaultValue, ForeignKeyAction,
    ForeignKeyRef, GeneratedColumn, Literal, Sentinel, TypeAffinity,
};
pub use constraint::{ConstraintBuilder, ConstraintDefinition, ConstraintKind, ExclusionElement};
pub use index::{
    IndexBuilder, IndexColumn, IndexDefinition, IndexMethod, IndexTarget, NullsOrder,
    SortDirection,
};
pub use objects::{
    EnumType, ExtensionDefinition, FunctionBody, FunctionDefinition, PolicyCommand,
    PolicyDefinition, SequenceDefinition, TriggerDefinition, TriggerEvent, TriggerTiming,
    ViewDefinition, Volatility,
};
pub use table::{
    PartitionStrategy, Partitioning, TableBuilder, TableDefinition, TableExtensions,
    TableOptions, TenantMarker,
};

/// An optionally schema-qualified object name.
///
/// Serialized as the dotted string form (`"auth.users"`, `"orders"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct QualifiedName {
    /// Schema, if any.
    pub schema: Option<String>,
    /// Object name.
    pub name: String,
}

impl QualifiedName {
    /// Creates a qualified name.
    #[must_use]
    pub fn new(schema: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.map(ToString::to_string),
            name: name.into(),
        }
    }

    /// Whether two names refer to the same object when an absent schema is
    /// read as `default_schema`.
    #[must_use]
    pub fn matches(&self, other: &Self, default_schema: &str) -> bool {
        self.name == other.name
            && self.schema.as_deref().unwrap_or(default_schema)
                == other.schema.as_deref().unwrap_or(default_schema)
    }
}

impl From<&str> for QualifiedName {
    fn from(value: &str) -> Self {
        match value.split_once('.') {
            Some((schema, name)) if !schema.is_empty() && !name.is_empty() => Self {
                schema: Some(schema.to_string()),
                name: name.to_string(),
            },
            _ => Self {
                schema: None,
                name: value.to_string(),
            },
        }
    }
}

impl From<String> for QualifiedName {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<QualifiedName> for String {
    fn from(value: QualifiedName) -> Self {
        value.to_string()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A `key = value` storage parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageOption {
    /// Parameter name.
    pub key: String,
    /// Parameter value, emitted verbatim.
    pub value: String,
}

impl StorageOption {
    /// Creates a storage option.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for StorageOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.key, self.value)
    }
}

/// A whole-schema snapshot: every object the validator, generator and
/// differ look at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaModel {
    /// Tables in declaration order.
    pub tables: Vec<TableDefinition>,
    /// Enum types.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<EnumType>,
    /// Standalone sequences.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sequences: Vec<SequenceDefinition>,
    /// Stored functions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionDefinition>,
    /// Triggers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<TriggerDefinition>,
    /// Row-level-security policies.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<PolicyDefinition>,
    /// Views and materialized views.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<ViewDefinition>,
    /// Extensions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<ExtensionDefinition>,
}

impl SchemaModel {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a schema holding only the given tables.
    #[must_use]
    pub fn from_tables(tables: Vec<TableDefinition>) -> Self {
        Self {
            tables,
            ..Self::default()
        }
    }

    /// Appends a table.
    #[must_use]
    pub fn with_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }

    /// Looks up a table by qualified name. An unqualified name matches a
    /// table with or without a schema when the table name is unambiguous.
    #[must_use]
    pub fn table(&self, name: &QualifiedName) -> Option<&TableDefinition> {
        if name.schema.is_some() {
            return self
                .tables
                .iter()
                .find(|t| t.name == name.name && t.schema == name.schema);
        }
        let mut candidates = self.tables.iter().filter(|t| t.name == name.name);
        let first = candidates.next()?;
        if first.schema.is_none() {
            return Some(first);
        }
        match candidates.find(|t| t.schema.is_none()) {
            Some(unqualified) => Some(unqualified),
            None => Some(first),
        }
    }

    /// Finds the table `name` refers to, treating an unqualified name and
    /// one qualified with `default_schema` as the same.
    #[must_use]
    pub fn table_matching(&self, name: &QualifiedName, default_schema: &str) -> Option<&TableDefinition> {
        self.tables
            .iter()
            .find(|t| t.qualified_name().matches(name, default_schema))
    }

    /// Whether an enum type with this (unqualified or qualified) name exists.
    #[must_use]
    pub fn has_enum(&self, type_name: &str) -> bool {
        let wanted = QualifiedName::from(type_name);
        self.enums
            .iter()
            .any(|e| e.name == wanted || (wanted.schema.is_none() && e.name.name == wanted.name))
    }

    /// Whether the schema holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_parsing() {
        let qn = QualifiedName::from("auth.users");
        assert_eq!(qn.schema.as_deref(), Some("auth"));
        assert_eq!(qn.name, "users");
        assert_eq!(qn.to_string(), "auth.users");

        let qn = QualifiedName::from("users");
        assert_eq!(qn.schema, None);
        assert_eq!(qn.to_string(), "users");

        let qn = QualifiedName::from(".odd");
        assert_eq!(qn.schema, None);
        assert_eq!(qn.name, ".odd");
    }

    #[test]
    fn qualified_name_matching_with_default_schema() {
        let a = QualifiedName::from("public.users");
        let b = QualifiedName::from("users");
        assert!(a.matches(&b, "public"));
        assert!(!a.matches(&b, "main"));
    }

    #[test]
    fn table_lookup_prefers_exact_schema() {
        let schema = SchemaModel::new()
            .with_table(TableDefinition::builder("users").schema("auth").build())
            .with_table(TableDefinition::builder("users").build());
        let found = schema.table(&"users".into()).unwrap();
        assert_eq!(found.schema, None);
        let found = schema.table(&"auth.users".into()).unwrap();
        assert_eq!(found.schema.as_deref(), Some("auth"));
        assert!(schema.table(&"billing.users".into()).is_none());
    }

    #[test]
    fn schema_model_json_defaults() {
        let model: SchemaModel = serde_json::from_str(r#"{"tables": []}"#).unwrap();
        assert!(model.is_empty());
        let model: SchemaModel =
            serde_json::from_str(r#"{"enums": [{"name": "mood", "values": ["sad", "ok"]}]}"#)
                .unwrap();
        assert!(model.has_enum("mood"));
        assert!(!model.has_enum("public.mood"));
    }
}
