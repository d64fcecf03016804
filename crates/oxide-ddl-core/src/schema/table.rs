//! Table definitions.

use serde::{Deserialize, Serialize};

use super::column::ColumnDefinition;
use super::constraint::{ConstraintDefinition, ConstraintKind};
use super::index::IndexDefinition;
use super::{QualifiedName, StorageOption};

/// Declarative partitioning strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionStrategy {
    /// PARTITION BY RANGE.
    Range,
    /// PARTITION BY LIST.
    List,
    /// PARTITION BY HASH.
    Hash,
}

impl PartitionStrategy {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Range => "RANGE",
            Self::List => "LIST",
            Self::Hash => "HASH",
        }
    }
}

/// `PARTITION BY strategy (columns)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partitioning {
    /// Strategy.
    pub strategy: PartitionStrategy,
    /// Partition key columns or expressions.
    pub columns: Vec<String>,
}

/// Storage-level table options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    /// CREATE TEMPORARY TABLE.
    pub temporary: bool,
    /// CREATE UNLOGGED TABLE.
    pub unlogged: bool,
    /// TABLESPACE name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tablespace: Option<String>,
    /// `WITH (key = value, ...)`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub with: Vec<StorageOption>,
    /// SQLite `WITHOUT ROWID`.
    pub without_rowid: bool,
    /// SQLite `STRICT`.
    pub strict: bool,
}

impl TableOptions {
    /// Whether every option is at its default.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }
}

/// How a multi-tenant platform should treat a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantMarker {
    /// Rows belong to a tenant.
    TenantScoped,
    /// Rows are shared across tenants.
    Shared,
}

/// Platform-specific table extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableExtensions {
    /// CockroachDB `LOCALITY` clause body (`REGIONAL BY ROW`, `GLOBAL`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    /// CockroachDB zone configuration (`num_replicas = 5`, ...).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub zone_config: Vec<StorageOption>,
    /// Explicit tenant classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantMarker>,
}

impl TableExtensions {
    /// Whether no extension is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A complete table definition.
///
/// Column, constraint and index order is significant: generated DDL follows
/// declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Schema, if qualified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDefinition>,
    /// Table-level constraints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintDefinition>,
    /// Indexes on the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDefinition>,
    /// Parent tables (`INHERITS`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inherits: Vec<QualifiedName>,
    /// Declarative partitioning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partitioning: Option<Partitioning>,
    /// Storage options.
    #[serde(default, skip_serializing_if = "TableOptions::is_default")]
    pub options: TableOptions,
    /// Table comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Platform extensions.
    #[serde(default, skip_serializing_if = "TableExtensions::is_empty")]
    pub extensions: TableExtensions,
}

impl TableDefinition {
    /// Creates an empty table definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
            inherits: Vec::new(),
            partitioning: None,
            options: TableOptions::default(),
            comment: None,
            extensions: TableExtensions::default(),
        }
    }

    /// Starts building a table.
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder::new(name)
    }

    /// The schema-qualified name.
    #[must_use]
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether the table has a column with this name.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Primary key columns, from the PRIMARY KEY constraint when present,
    /// otherwise from column flags in declaration order.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&str> {
        for constraint in &self.constraints {
            if let ConstraintKind::PrimaryKey { columns } = &constraint.kind {
                return columns.iter().map(String::as_str).collect();
            }
        }
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Whether the primary key spans more than one column, or is declared
    /// as a table constraint.
    #[must_use]
    pub fn has_table_level_primary_key(&self) -> bool {
        self.constraints.iter().any(ConstraintDefinition::is_primary_key)
            || self.columns.iter().filter(|c| c.primary_key).count() > 1
    }

    /// Every table this one references through a foreign key (column-level
    /// or table constraint), in declaration order, without duplicates.
    #[must_use]
    pub fn referenced_tables(&self) -> Vec<QualifiedName> {
        let mut out: Vec<QualifiedName> = Vec::new();
        let column_refs = self
            .columns
            .iter()
            .filter_map(|c| c.references.as_ref().map(|r| &r.table));
        let constraint_refs = self.constraints.iter().filter_map(|c| match &c.kind {
            ConstraintKind::ForeignKey {
                references_table, ..
            } => Some(references_table),
            _ => None,
        });
        for table in column_refs.chain(constraint_refs) {
            if !out.contains(table) {
                out.push(table.clone());
            }
        }
        out
    }
}

/// Accumulating builder for [`TableDefinition`].
#[derive(Debug, Clone)]
#[must_use]
pub struct TableBuilder {
    table: TableDefinition,
}

impl TableBuilder {
    /// Creates a builder for an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: TableDefinition::new(name),
        }
    }

    /// Sets the schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.table.schema = Some(schema.into());
        self
    }

    /// Appends a column.
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.table.columns.push(column);
        self
    }

    /// Appends a table constraint.
    pub fn constraint(mut self, constraint: ConstraintDefinition) -> Self {
        self.table.constraints.push(constraint);
        self
    }

    /// Appends an index.
    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.table.indexes.push(index);
        self
    }

    /// Adds a parent table.
    pub fn inherits(mut self, parent: impl Into<QualifiedName>) -> Self {
        self.table.inherits.push(parent.into());
        self
    }

    /// Sets declarative partitioning.
    pub fn partition_by<I, S>(mut self, strategy: PartitionStrategy, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table.partitioning = Some(Partitioning {
            strategy,
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Replaces the storage options.
    pub fn options(mut self, options: TableOptions) -> Self {
        self.table.options = options;
        self
    }

    /// Marks the table UNLOGGED.
    pub fn unlogged(mut self) -> Self {
        self.table.options.unlogged = true;
        self
    }

    /// Marks the table TEMPORARY.
    pub fn temporary(mut self) -> Self {
        self.table.options.temporary = true;
        self
    }

    /// Sets the tablespace.
    pub fn tablespace(mut self, tablespace: impl Into<String>) -> Self {
        self.table.options.tablespace = Some(tablespace.into());
        self
    }

    /// Adds a `WITH` storage parameter.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.table.options.with.push(StorageOption::new(key, value));
        self
    }

    /// Sets the table comment.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.table.comment = Some(comment.into());
        self
    }

    /// Sets the CockroachDB locality.
    pub fn locality(mut self, locality: impl Into<String>) -> Self {
        self.table.extensions.locality = Some(locality.into());
        self
    }

    /// Adds a CockroachDB zone configuration entry.
    pub fn zone_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.table
            .extensions
            .zone_config
            .push(StorageOption::new(key, value));
        self
    }

    /// Sets the explicit tenant classification.
    pub fn tenant(mut self, marker: TenantMarker) -> Self {
        self.table.extensions.tenant = Some(marker);
        self
    }

    /// Finalizes the table.
    #[must_use]
    pub fn build(self) -> TableDefinition {
        self.table
    }
}
