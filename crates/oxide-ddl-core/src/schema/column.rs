//! Column definitions and the column builder.
//!
//! A [`ColumnDefinition`] stores the declared SQL type as written
//! (`varchar(255)`, `uuid`, `text[]`); dialect-specific resolution happens in
//! the validator and generators, never here.

use serde::{Deserialize, Serialize};

use crate::capability::types;

use super::QualifiedName;

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyAction {
    /// No action.
    NoAction,
    /// Restrict deletion/update.
    Restrict,
    /// Cascade the operation.
    Cascade,
    /// Set to NULL.
    SetNull,
    /// Set to default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// A column-level reference to a column in another table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// The referenced table.
    pub table: QualifiedName,
    /// The referenced column.
    pub column: String,
    /// Action on delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ForeignKeyAction>,
    /// Action on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ForeignKeyAction>,
}

/// A literal default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    /// NULL.
    Null,
    /// Boolean literal.
    Boolean(bool),
    /// Integer literal.
    Integer(i64),
    /// Float literal.
    Float(f64),
    /// String literal. Strings that spell a SQL keyword or a function call
    /// (`now()`, `CURRENT_TIMESTAMP`) are emitted unquoted.
    String(String),
    /// JSON object or array, serialized to text and cast to the column type.
    Json(serde_json::Value),
}

/// Symbolic defaults whose SQL spelling depends on the dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentinel {
    /// An empty JSON object.
    EmptyObject,
    /// An empty array (native array or JSON array, depending on the column).
    EmptyArray,
    /// A freshly generated random UUID.
    GenRandomUuid,
    /// The current timestamp.
    CurrentTimestamp,
    /// The current date.
    CurrentDate,
    /// CockroachDB's `unique_rowid()`.
    UniqueRowId,
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// A literal value.
    Literal(Literal),
    /// Raw SQL emitted verbatim.
    Raw(String),
    /// A dialect-dependent sentinel.
    Sentinel(Sentinel),
}

/// A generated (computed) column expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedColumn {
    /// The SQL expression.
    pub expression: String,
    /// `STORED` when true, `VIRTUAL` otherwise.
    #[serde(default = "default_true")]
    pub stored: bool,
}

/// SQLite type affinity, derived from the declared type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeAffinity {
    /// INTEGER affinity.
    Integer,
    /// TEXT affinity.
    Text,
    /// BLOB affinity.
    Blob,
    /// REAL affinity.
    Real,
    /// NUMERIC affinity.
    Numeric,
}

const fn default_true() -> bool {
    true
}

/// A complete column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Declared SQL type, as written.
    pub data_type: String,
    /// Whether the column is nullable.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Whether this is a (single-column) primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Whether this column is unique.
    #[serde(default)]
    pub unique: bool,
    /// Whether this column auto-increments.
    #[serde(default)]
    pub auto_increment: bool,
    /// Generated column expression, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<GeneratedColumn>,
    /// Default value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Foreign key reference, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ForeignKeyRef>,
    /// Check constraint expression, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    /// Number of array dimensions (0 for scalars).
    #[serde(default)]
    pub array_dimensions: u8,
    /// Collation for string columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    /// Column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ColumnDefinition {
    /// Creates a new nullable column definition.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            unique: false,
            auto_increment: false,
            generated: None,
            default: None,
            references: None,
            check: None,
            array_dimensions: 0,
            collation: None,
            comment: None,
        }
    }

    /// The lower-cased base type with width modifiers and array suffixes
    /// removed (`VARCHAR(255)[]` → `varchar`).
    #[must_use]
    pub fn base_type(&self) -> String {
        types::base_type(&self.data_type)
    }

    /// Whether the column holds an array, either through
    /// `array_dimensions` or an array suffix on the declared type.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.array_dimensions > 0 || types::is_array_type(&self.data_type)
    }

    /// The declared type including array suffixes implied by
    /// `array_dimensions`.
    #[must_use]
    pub fn declared_type(&self) -> String {
        if self.array_dimensions > 0 && !types::is_array_type(&self.data_type) {
            let mut ty = self.data_type.clone();
            for _ in 0..self.array_dimensions {
                ty.push_str("[]");
            }
            ty
        } else {
            self.data_type.clone()
        }
    }

    /// Whether the column is computed.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.generated.is_some()
    }

    /// SQLite type affinity of the declared type.
    #[must_use]
    pub fn affinity(&self) -> TypeAffinity {
        types::affinity(&self.data_type)
    }
}

/// Column definition builder.
///
/// Each step consumes and returns the accumulator; [`ColumnBuilder::build`]
/// produces the immutable [`ColumnDefinition`].
#[derive(Debug, Clone)]
#[must_use]
pub struct ColumnBuilder {
    column: ColumnDefinition,
}

impl ColumnBuilder {
    /// Creates a new column builder with name and declared type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            column: ColumnDefinition::new(name, data_type),
        }
    }

    /// Marks the column as NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.column.nullable = false;
        self
    }

    /// Marks the column as nullable (default).
    pub fn nullable(mut self) -> Self {
        self.column.nullable = true;
        self
    }

    /// Marks the column as PRIMARY KEY.
    pub fn primary_key(mut self) -> Self {
        self.column.primary_key = true;
        self.column.nullable = false; // Primary keys are implicitly NOT NULL
        self
    }

    /// Marks the column as UNIQUE.
    pub fn unique(mut self) -> Self {
        self.column.unique = true;
        self
    }

    /// Marks the column as auto-incrementing.
    pub fn auto_increment(mut self) -> Self {
        self.column.auto_increment = true;
        self
    }

    /// Makes the column a stored generated column.
    pub fn generated(mut self, expression: impl Into<String>) -> Self {
        self.column.generated = Some(GeneratedColumn {
            expression: expression.into(),
            stored: true,
        });
        self
    }

    /// Makes the column a virtual generated column.
    pub fn generated_virtual(mut self, expression: impl Into<String>) -> Self {
        self.column.generated = Some(GeneratedColumn {
            expression: expression.into(),
            stored: false,
        });
        self
    }

    /// Sets any default value.
    pub fn default_value(mut self, value: DefaultValue) -> Self {
        self.column.default = Some(value);
        self
    }

    /// Sets a boolean default value.
    pub fn default_bool(self, value: bool) -> Self {
        self.default_value(DefaultValue::Literal(Literal::Boolean(value)))
    }

    /// Sets an integer default value.
    pub fn default_int(self, value: i64) -> Self {
        self.default_value(DefaultValue::Literal(Literal::Integer(value)))
    }

    /// Sets a float default value.
    pub fn default_float(self, value: f64) -> Self {
        self.default_value(DefaultValue::Literal(Literal::Float(value)))
    }

    /// Sets a string default value.
    pub fn default_str(self, value: impl Into<String>) -> Self {
        self.default_value(DefaultValue::Literal(Literal::String(value.into())))
    }

    /// Sets a NULL default value.
    pub fn default_null(self) -> Self {
        self.default_value(DefaultValue::Literal(Literal::Null))
    }

    /// Sets a JSON object/array default value.
    pub fn default_json(self, value: serde_json::Value) -> Self {
        self.default_value(DefaultValue::Literal(Literal::Json(value)))
    }

    /// Sets a raw SQL expression as default, emitted verbatim (SQLite gets it
    /// parenthesised unless it is a plain literal).
    pub fn default_raw(self, expr: impl Into<String>) -> Self {
        self.default_value(DefaultValue::Raw(expr.into()))
    }

    /// Sets a sentinel default.
    pub fn default_sentinel(self, sentinel: Sentinel) -> Self {
        self.default_value(DefaultValue::Sentinel(sentinel))
    }

    /// Sets a foreign key reference.
    pub fn references(mut self, table: impl Into<QualifiedName>, column: impl Into<String>) -> Self {
        self.column.references = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
            on_delete: None,
            on_update: None,
        });
        self
    }

    /// Sets a foreign key reference with full options.
    pub fn references_full(
        mut self,
        table: impl Into<QualifiedName>,
        column: impl Into<String>,
        on_delete: Option<ForeignKeyAction>,
        on_update: Option<ForeignKeyAction>,
    ) -> Self {
        self.column.references = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
            on_delete,
            on_update,
        });
        self
    }

    /// Adds a CHECK constraint.
    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.column.check = Some(expr.into());
        self
    }

    /// Declares the column as an array with the given number of dimensions.
    pub fn array(mut self, dimensions: u8) -> Self {
        self.column.array_dimensions = dimensions;
        self
    }

    /// Sets the collation for string columns.
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.column.collation = Some(collation.into());
        self
    }

    /// Sets the column comment.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.column.comment = Some(comment.into());
        self
    }

    /// Builds the column definition.
    #[must_use]
    pub fn build(self) -> ColumnDefinition {
        self.column
    }
}

// =============================================================================
// Shorthand Functions for Common Types
// =============================================================================

/// Creates a column builder for an arbitrary declared type.
pub fn column(name: impl Into<String>, data_type: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, data_type)
}

/// Creates an INTEGER column builder.
pub fn integer(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, "integer")
}

/// Creates a SMALLINT column builder.
pub fn smallint(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, "smallint")
}

/// Creates a BIGINT column builder.
pub fn bigint(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, "bigint")
}

/// Creates a NUMERIC column builder.
pub fn numeric(name: impl Into<String>, precision: u16, scale: u16) -> ColumnBuilder {
    ColumnBuilder::new(name, format!("numeric({precision}, {scale})"))
}

/// Creates a VARCHAR column builder.
pub fn varchar(name: impl Into<String>, len: u32) -> ColumnBuilder {
    ColumnBuilder::new(name, format!("varchar({len})"))
}

/// Creates a TEXT column builder.
pub fn text(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, "text")
}

/// Creates a BOOLEAN column builder.
pub fn boolean(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, "boolean")
}

/// Creates a UUID column builder.
pub fn uuid(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, "uuid")
}

/// Creates a JSONB column builder.
pub fn jsonb(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, "jsonb")
}

/// Creates a TIMESTAMP column builder.
pub fn timestamp(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, "timestamp")
}

/// Creates a TIMESTAMPTZ column builder.
pub fn timestamptz(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, "timestamptz")
}

/// Creates a DATE column builder.
pub fn date(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, "date")
}
