//! Index definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{QualifiedName, StorageOption};

/// Index access method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMethod {
    /// B-tree (default).
    #[default]
    #[serde(alias = "b-tree")]
    BTree,
    /// Hash.
    Hash,
    /// Generalized inverted index.
    Gin,
    /// Generalized search tree.
    Gist,
    /// Block range index.
    Brin,
    /// Space-partitioned GiST.
    SpGist,
    /// Any other access method, spelled as given.
    Custom(String),
}

impl IndexMethod {
    /// The SQL keyword for `USING`.
    #[must_use]
    pub fn as_sql(&self) -> &str {
        match self {
            Self::BTree => "btree",
            Self::Hash => "hash",
            Self::Gin => "gin",
            Self::Gist => "gist",
            Self::Brin => "brin",
            Self::SpGist => "spgist",
            Self::Custom(name) => name,
        }
    }

    /// Whether entries are kept in a defined order, so that ASC/DESC and
    /// NULLS FIRST/LAST are meaningful.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::BTree)
    }
}

impl fmt::Display for IndexMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Sort direction of an index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// NULL placement of an index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullsOrder {
    /// NULLS FIRST.
    First,
    /// NULLS LAST.
    Last,
}

/// What an index key is built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexTarget {
    /// A plain column.
    Column(String),
    /// An expression, emitted verbatim inside parentheses.
    Expression(String),
}

/// One key of an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexColumn {
    /// Column or expression.
    pub target: IndexTarget,
    /// Sort direction, if specified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<SortDirection>,
    /// NULL ordering, if specified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nulls: Option<NullsOrder>,
}

impl IndexColumn {
    /// A plain column key with default ordering.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            target: IndexTarget::Column(name.into()),
            direction: None,
            nulls: None,
        }
    }

    /// An expression key with default ordering.
    #[must_use]
    pub fn expression(expr: impl Into<String>) -> Self {
        Self {
            target: IndexTarget::Expression(expr.into()),
            direction: None,
            nulls: None,
        }
    }

    /// The column name, when the key is a plain column.
    #[must_use]
    pub fn column_name(&self) -> Option<&str> {
        match &self.target {
            IndexTarget::Column(name) => Some(name),
            IndexTarget::Expression(_) => None,
        }
    }

    /// Whether the key carries an explicit direction or NULL ordering.
    #[must_use]
    pub fn has_ordering(&self) -> bool {
        self.direction.is_some() || self.nulls.is_some()
    }
}

/// An index on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,
    /// Owning table.
    pub table: QualifiedName,
    /// Ordered index keys.
    pub columns: Vec<IndexColumn>,
    /// Access method.
    #[serde(default)]
    pub method: IndexMethod,
    /// Whether this is a UNIQUE index.
    #[serde(default)]
    pub unique: bool,
    /// Partial index predicate (WHERE clause).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    /// Covering (INCLUDE) columns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Storage parameters (`WITH (...)`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage: Vec<StorageOption>,
    /// Tablespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tablespace: Option<String>,
}

impl IndexDefinition {
    /// Starts building an index.
    pub fn builder(name: impl Into<String>, table: impl Into<QualifiedName>) -> IndexBuilder {
        IndexBuilder::new(name, table)
    }

    /// Names of the plain-column keys, in key order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(IndexColumn::column_name)
    }

    /// Whether any key is an expression.
    #[must_use]
    pub fn has_expressions(&self) -> bool {
        self.columns
            .iter()
            .any(|c| matches!(c.target, IndexTarget::Expression(_)))
    }

    /// Qualified path used in issue locations and affected-object lists.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.table.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Accumulating builder for [`IndexDefinition`].
#[derive(Debug, Clone)]
#[must_use]
pub struct IndexBuilder {
    index: IndexDefinition,
}

impl IndexBuilder {
    /// Creates a builder for a non-unique btree index.
    pub fn new(name: impl Into<String>, table: impl Into<QualifiedName>) -> Self {
        Self {
            index: IndexDefinition {
                name: name.into(),
                table: table.into(),
                columns: Vec::new(),
                method: IndexMethod::BTree,
                unique: false,
                predicate: None,
                include: Vec::new(),
                storage: Vec::new(),
                tablespace: None,
            },
        }
    }

    /// Adds a plain column key.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.index.columns.push(IndexColumn::column(name));
        self
    }

    /// Adds a column key with explicit ordering.
    pub fn column_ordered(
        mut self,
        name: impl Into<String>,
        direction: SortDirection,
        nulls: Option<NullsOrder>,
    ) -> Self {
        self.index.columns.push(IndexColumn {
            target: IndexTarget::Column(name.into()),
            direction: Some(direction),
            nulls,
        });
        self
    }

    /// Adds an expression key.
    pub fn expression(mut self, expr: impl Into<String>) -> Self {
        self.index.columns.push(IndexColumn::expression(expr));
        self
    }

    /// Sets the access method.
    pub fn method(mut self, method: IndexMethod) -> Self {
        self.index.method = method;
        self
    }

    /// Marks the index UNIQUE.
    pub fn unique(mut self) -> Self {
        self.index.unique = true;
        self
    }

    /// Sets the partial-index predicate.
    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.index.predicate = Some(predicate.into());
        self
    }

    /// Adds a covering column.
    pub fn include(mut self, column: impl Into<String>) -> Self {
        self.index.include.push(column.into());
        self
    }

    /// Adds a storage parameter.
    pub fn storage(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.index.storage.push(StorageOption::new(key, value));
        self
    }

    /// Sets the tablespace.
    pub fn tablespace(mut self, tablespace: impl Into<String>) -> Self {
        self.index.tablespace = Some(tablespace.into());
        self
    }

    /// Finalizes the index.
    #[must_use]
    pub fn build(self) -> IndexDefinition {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_in_order() {
        let idx = IndexDefinition::builder("idx_orders_customer", "sales.orders")
            .column("customer_id")
            .column_ordered("created_at", SortDirection::Desc, Some(NullsOrder::Last))
            .include("total")
            .predicate("deleted_at IS NULL")
            .build();

        assert_eq!(idx.table.schema.as_deref(), Some("sales"));
        assert_eq!(
            idx.column_names().collect::<Vec<_>>(),
            vec!["customer_id", "created_at"]
        );
        assert_eq!(idx.include, vec!["total"]);
        assert_eq!(idx.predicate.as_deref(), Some("deleted_at IS NULL"));
        assert_eq!(idx.qualified_name(), "sales.idx_orders_customer");
        assert!(!idx.has_expressions());
    }

    #[test]
    fn only_btree_is_ordered() {
        assert!(IndexMethod::BTree.is_ordered());
        assert!(!IndexMethod::Gin.is_ordered());
        assert!(!IndexMethod::Custom("hnsw".into()).is_ordered());
    }

    #[test]
    fn method_deserializes_from_lowercase() {
        let m: IndexMethod = serde_json::from_str("\"gin\"").unwrap();
        assert_eq!(m, IndexMethod::Gin);
        let m: IndexMethod = serde_json::from_str(r#"{"custom": "ivfflat"}"#).unwrap();
        assert_eq!(m.as_sql(), "ivfflat");
    }
}
