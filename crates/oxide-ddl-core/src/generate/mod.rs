//! Dialect-specific DDL generation.
//!
//! Two families cover every registered dialect: [`PostgresGenerator`]
//! (PostgreSQL, CockroachDB, Nile) and [`SqliteGenerator`] (SQLite, D1).
//! Each is parameterised by the dialect's capability set, so platform
//! differences come from data rather than from separate implementations.
//!
//! ```rust
//! use oxide_ddl_core::capability::Dialect;
//! use oxide_ddl_core::generate::{generator_for, GenerateOptions};
//! use oxide_ddl_core::schema::{numeric, text, TableDefinition};
//!
//! let table = TableDefinition::builder("invoices")
//!     .column(text("order").not_null().build())
//!     .column(numeric("amount", 10, 2).build())
//!     .build();
//! let generator = generator_for(Dialect::Postgres);
//! let stmt = generator
//!     .generate_create_table(&table, &GenerateOptions::default())
//!     .unwrap();
//! assert!(stmt.sql.contains("\"order\" text NOT NULL"));
//! assert!(stmt.sql.contains("    amount numeric(10, 2)"));
//! ```

pub mod changes;
mod default;
mod postgres;
mod quote;
mod sqlite;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use default::{is_sql_expression, render_default};
pub use postgres::PostgresGenerator;
pub use quote::{is_reserved_word, needs_quoting, quote_identifier, quote_literal, quote_qualified};
pub use sqlite::SqliteGenerator;

use crate::capability::{
    capabilities_for, Dialect, DialectCapabilitySet, DialectFamily, Feature,
};
use crate::diff::ordering::dependency_order;
use crate::error::{DdlError, Result};
use crate::schema::{
    ColumnDefinition, ConstraintDefinition, ConstraintKind, EnumType, ExtensionDefinition,
    ForeignKeyAction, ForeignKeyRef, FunctionBody, FunctionDefinition, GeneratedColumn,
    IndexColumn, IndexDefinition, IndexMethod, IndexTarget, NullsOrder, PolicyDefinition,
    QualifiedName, SchemaModel, SequenceDefinition, SortDirection, TableDefinition,
    TriggerDefinition, ViewDefinition,
};

/// Broad statement category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    /// CREATE ...
    Create,
    /// ALTER ... (and multi-statement table recreations)
    Alter,
    /// DROP ...
    Drop,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "CREATE",
            Self::Alter => "ALTER",
            Self::Drop => "DROP",
        })
    }
}

/// What a statement does, at the granularity the planner orders by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// CREATE TABLE.
    CreateTable,
    /// DROP TABLE.
    DropTable,
    /// Shadow-table recreation.
    RecreateTable,
    /// ADD COLUMN.
    AddColumn,
    /// DROP COLUMN.
    DropColumn,
    /// ALTER COLUMN (type, nullability, default, identity, expression).
    AlterColumn,
    /// ADD CONSTRAINT.
    AddConstraint,
    /// DROP CONSTRAINT.
    DropConstraint,
    /// DROP and re-ADD of a constraint under the same name, in one statement.
    ReplaceConstraint,
    /// CREATE INDEX.
    CreateIndex,
    /// DROP INDEX.
    DropIndex,
    /// CREATE TYPE ... AS ENUM.
    CreateType,
    /// CREATE SEQUENCE / ALTER SEQUENCE.
    CreateSequence,
    /// CREATE FUNCTION.
    CreateFunction,
    /// CREATE TRIGGER.
    CreateTrigger,
    /// CREATE POLICY / ENABLE ROW LEVEL SECURITY.
    CreatePolicy,
    /// CREATE VIEW / CREATE MATERIALIZED VIEW.
    CreateView,
    /// CREATE EXTENSION.
    CreateExtension,
    /// COMMENT ON.
    Comment,
    /// Table-level settings (locality, zone configuration).
    TableSettings,
}

/// One emitted DDL statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedStatement {
    /// SQL text without a trailing semicolon. Recreations hold several
    /// statements separated by `;\n`.
    pub sql: String,
    /// Statement category.
    pub kind: StatementKind,
    /// What the statement does.
    pub operation: Operation,
    /// Whether applying it can lose data or reject existing rows.
    pub destructive: bool,
    /// Objects the statement touches (`table`, `table.column`, index names).
    pub affected: Vec<String>,
}

impl GeneratedStatement {
    /// Creates a non-destructive statement with no affected objects.
    #[must_use]
    pub fn new(kind: StatementKind, operation: Operation, sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            kind,
            operation,
            destructive: false,
            affected: Vec::new(),
        }
    }

    /// Sets the destructive flag.
    #[must_use]
    pub fn destructive(mut self, destructive: bool) -> Self {
        self.destructive = destructive;
        self
    }

    /// Records an affected object.
    #[must_use]
    pub fn affecting(mut self, object: impl Into<String>) -> Self {
        self.affected.push(object.into());
        self
    }
}

impl fmt::Display for GeneratedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Knobs for generated DDL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// `IF NOT EXISTS` on CREATE statements.
    pub if_not_exists: bool,
    /// `IF EXISTS` on DROP statements.
    pub if_exists: bool,
    /// `CASCADE` on DROP statements (Postgres family).
    pub cascade: bool,
    /// Emit `GENERATED BY DEFAULT AS IDENTITY` instead of `SERIAL` types.
    pub identity_columns: bool,
    /// Emit `COMMENT ON` statements.
    pub comments: bool,
    /// `CREATE/DROP INDEX CONCURRENTLY` where supported.
    pub concurrently: bool,
}

/// Dialect-specific DDL generation.
///
/// Default methods hold the statement skeletons shared by both families;
/// implementations override column rendering, table options and ALTER
/// planning.
pub trait DdlGenerator: fmt::Debug + Send + Sync {
    /// The capability set this generator emits for.
    fn capabilities(&self) -> &'static DialectCapabilitySet;

    /// Target dialect.
    fn dialect(&self) -> Dialect {
        self.capabilities().dialect
    }

    /// Target dialect family.
    fn family(&self) -> DialectFamily {
        self.capabilities().family()
    }

    /// Quotes an identifier when needed.
    fn quote_identifier(&self, ident: &str) -> String {
        quote::quote_identifier(ident, self.family())
    }

    /// Quotes a possibly schema-qualified name.
    fn quote_qualified(&self, name: &QualifiedName) -> String {
        quote::quote_qualified(name, self.family())
    }

    /// Typed error for a construct this dialect cannot express.
    fn unsupported(&self, object: &str, construct: &str) -> DdlError {
        DdlError::UnsupportedConstruct {
            object: object.to_string(),
            construct: construct.to_string(),
            dialect: self.dialect().to_string(),
        }
    }

    /// Fails unless the dialect supports `feature`.
    ///
    /// # Errors
    ///
    /// [`DdlError::UnsupportedConstruct`] naming `object` and `construct`.
    fn require(&self, feature: Feature, object: &str, construct: &str) -> Result<()> {
        if self.capabilities().supports(feature) {
            Ok(())
        } else {
            Err(self.unsupported(object, construct))
        }
    }

    // ------------------------------------------------------------------
    // Columns and constraints
    // ------------------------------------------------------------------

    /// The SQL type emitted for `column`.
    ///
    /// # Errors
    ///
    /// [`DdlError::InvalidAutoIncrement`] for an auto-increment column the
    /// dialect cannot express.
    fn column_type(
        &self,
        table: &TableDefinition,
        column: &ColumnDefinition,
        options: &GenerateOptions,
    ) -> Result<String>;

    /// `GENERATED ALWAYS AS (...)` clause.
    fn generated_clause(&self, generated: &GeneratedColumn) -> String {
        let storage = if generated.stored { "STORED" } else { "VIRTUAL" };
        format!(" GENERATED ALWAYS AS ({}) {storage}", generated.expression)
    }

    /// Identity clause following the type (Postgres family only).
    fn identity_clause(&self, _column: &ColumnDefinition, _options: &GenerateOptions) -> &'static str {
        ""
    }

    /// Keyword following an inline PRIMARY KEY on an auto-increment column.
    fn autoincrement_keyword(&self) -> &'static str {
        ""
    }

    /// `COLLATE` clause.
    fn collate_clause(&self, collation: &str) -> String {
        format!(" COLLATE {collation}")
    }

    /// Renders one column definition.
    ///
    /// # Errors
    ///
    /// Propagates type and default rendering errors.
    fn column_definition(
        &self,
        table: &TableDefinition,
        column: &ColumnDefinition,
        options: &GenerateOptions,
    ) -> Result<String> {
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.column_type(table, column, options)?
        );
        sql.push_str(self.identity_clause(column, options));

        if let Some(generated) = &column.generated {
            sql.push_str(&self.generated_clause(generated));
        }

        let inline_primary_key = column.primary_key && !table.has_table_level_primary_key();
        if inline_primary_key {
            sql.push_str(" PRIMARY KEY");
            if column.auto_increment {
                sql.push_str(self.autoincrement_keyword());
            }
        } else {
            if !column.nullable {
                sql.push_str(" NOT NULL");
            }
            if column.unique {
                sql.push_str(" UNIQUE");
            }
        }

        if let Some(default) = render_default(self.capabilities(), table, column)? {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default);
        }

        if let Some(reference) = &column.references {
            sql.push_str(&self.references_clause(reference));
        }

        if let Some(check) = &column.check {
            sql.push_str(&format!(" CHECK ({check})"));
        }

        if let Some(collation) = &column.collation {
            sql.push_str(&self.collate_clause(collation));
        }

        Ok(sql)
    }

    /// ` REFERENCES table (column) [ON DELETE ..] [ON UPDATE ..]`.
    fn references_clause(&self, reference: &ForeignKeyRef) -> String {
        let mut sql = format!(
            " REFERENCES {} ({})",
            self.quote_qualified(&reference.table),
            self.quote_identifier(&reference.column)
        );
        push_actions(&mut sql, reference.on_delete, reference.on_update);
        sql
    }

    /// Joins quoted column names.
    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Renders a table constraint.
    ///
    /// # Errors
    ///
    /// [`DdlError::UnsupportedConstruct`] for an exclusion constraint the
    /// dialect cannot express.
    fn table_constraint(
        &self,
        table: &TableDefinition,
        constraint: &ConstraintDefinition,
    ) -> Result<String> {
        let mut sql = String::new();
        if let Some(name) = &constraint.name {
            sql.push_str(&format!("CONSTRAINT {} ", self.quote_identifier(name)));
        }
        match &constraint.kind {
            ConstraintKind::PrimaryKey { columns } => {
                sql.push_str(&format!("PRIMARY KEY ({})", self.column_list(columns)));
            }
            ConstraintKind::Unique { columns } => {
                sql.push_str(&format!("UNIQUE ({})", self.column_list(columns)));
            }
            ConstraintKind::Check { expression } => {
                sql.push_str(&format!("CHECK ({expression})"));
            }
            ConstraintKind::ForeignKey {
                columns,
                references_table,
                references_columns,
                on_delete,
                on_update,
                deferrable,
            } => {
                sql.push_str(&format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    self.column_list(columns),
                    self.quote_qualified(references_table),
                    self.column_list(references_columns)
                ));
                push_actions(&mut sql, *on_delete, *on_update);
                if *deferrable {
                    sql.push_str(" DEFERRABLE INITIALLY DEFERRED");
                }
            }
            ConstraintKind::Exclusion {
                method,
                elements,
                predicate,
            } => {
                let object = format!(
                    "{}.{}",
                    table.qualified_name(),
                    constraint.effective_name(&table.name)
                );
                self.require(Feature::ExclusionConstraints, &object, "exclusion constraints")?;
                let elements = elements
                    .iter()
                    .map(|e| format!("{} WITH {}", e.expression, e.operator))
                    .collect::<Vec<_>>()
                    .join(", ");
                sql.push_str(&format!("EXCLUDE USING {method} ({elements})"));
                if let Some(predicate) = predicate {
                    sql.push_str(&format!(" WHERE ({predicate})"));
                }
            }
        }
        Ok(sql)
    }

    // ------------------------------------------------------------------
    // Tables
    // ------------------------------------------------------------------

    /// `CREATE [TEMPORARY] TABLE`.
    fn create_table_keyword(&self, table: &TableDefinition) -> String {
        if table.options.temporary {
            "CREATE TEMPORARY TABLE".to_string()
        } else {
            "CREATE TABLE".to_string()
        }
    }

    /// Text following the closing parenthesis of CREATE TABLE.
    ///
    /// # Errors
    ///
    /// [`DdlError::UnsupportedConstruct`] for table features the dialect
    /// cannot express.
    fn table_suffix(&self, table: &TableDefinition) -> Result<String>;

    /// Generates CREATE TABLE. Columns, then constraints, in declaration
    /// order. Every column error is collected before failing.
    ///
    /// # Errors
    ///
    /// [`DdlError::EmptyTable`], or the column/constraint errors (folded
    /// with [`DdlError::from_many`]).
    fn generate_create_table(
        &self,
        table: &TableDefinition,
        options: &GenerateOptions,
    ) -> Result<GeneratedStatement> {
        let name = table.qualified_name();
        if table.columns.is_empty() {
            return Err(DdlError::EmptyTable(name.to_string()));
        }

        let mut lines = Vec::new();
        let mut errors = Vec::new();
        for column in &table.columns {
            match self.column_definition(table, column, options) {
                Ok(definition) => lines.push(format!("    {definition}")),
                Err(err) => errors.push(err),
            }
        }

        let flagged: Vec<String> = table
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        let has_pk_constraint = table
            .constraints
            .iter()
            .any(ConstraintDefinition::is_primary_key);
        if flagged.len() > 1 && !has_pk_constraint {
            lines.push(format!("    PRIMARY KEY ({})", self.column_list(&flagged)));
        }

        for constraint in &table.constraints {
            match self.table_constraint(table, constraint) {
                Ok(definition) => lines.push(format!("    {definition}")),
                Err(err) => errors.push(err),
            }
        }

        let suffix = match self.table_suffix(table) {
            Ok(suffix) => suffix,
            Err(err) => {
                errors.push(err);
                String::new()
            }
        };
        if let Some(err) = DdlError::from_many(errors) {
            return Err(err);
        }

        let mut sql = self.create_table_keyword(table);
        sql.push(' ');
        if options.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.quote_qualified(&name));
        sql.push_str(" (\n");
        sql.push_str(&lines.join(",\n"));
        sql.push_str("\n)");
        sql.push_str(&suffix);

        Ok(
            GeneratedStatement::new(StatementKind::Create, Operation::CreateTable, sql)
                .affecting(name.to_string()),
        )
    }

    /// Generates DROP TABLE. Always destructive.
    fn generate_drop_table(&self, name: &QualifiedName, options: &GenerateOptions) -> GeneratedStatement {
        let mut sql = String::from("DROP TABLE ");
        if options.if_exists {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&self.quote_qualified(name));
        if options.cascade && self.family() == DialectFamily::Postgres {
            sql.push_str(" CASCADE");
        }
        GeneratedStatement::new(StatementKind::Drop, Operation::DropTable, sql)
            .destructive(true)
            .affecting(name.to_string())
    }

    /// Statements turning `from` into `to`. Both describe the same table.
    ///
    /// # Errors
    ///
    /// Rendering errors of the target shape, or
    /// [`DdlError::UnsupportedConstruct`] for changes the dialect cannot
    /// apply.
    fn generate_alter_table(
        &self,
        from: &TableDefinition,
        to: &TableDefinition,
        options: &GenerateOptions,
    ) -> Result<Vec<GeneratedStatement>>;

    /// Whether turning `from` into `to` needs a full table recreation.
    fn requires_recreation(&self, _from: &TableDefinition, _to: &TableDefinition) -> bool {
        false
    }

    /// Statements that follow CREATE TABLE: comments and platform settings.
    fn generate_table_extras(
        &self,
        table: &TableDefinition,
        options: &GenerateOptions,
    ) -> Vec<GeneratedStatement> {
        let mut out = self.table_settings(table);
        if !options.comments || !self.capabilities().supports(Feature::Comments) {
            return out;
        }
        let name = table.qualified_name();
        if let Some(comment) = &table.comment {
            out.push(self.comment_on_table(&name, Some(comment)));
        }
        for column in &table.columns {
            if let Some(comment) = &column.comment {
                out.push(self.comment_on_column(&name, &column.name, Some(comment)));
            }
        }
        out
    }

    /// Platform settings applied after CREATE TABLE.
    fn table_settings(&self, _table: &TableDefinition) -> Vec<GeneratedStatement> {
        Vec::new()
    }

    /// `COMMENT ON TABLE`; `None` clears the comment.
    fn comment_on_table(&self, table: &QualifiedName, comment: Option<&str>) -> GeneratedStatement {
        let text = comment.map_or_else(|| "NULL".to_string(), quote_literal);
        GeneratedStatement::new(
            StatementKind::Alter,
            Operation::Comment,
            format!("COMMENT ON TABLE {} IS {text}", self.quote_qualified(table)),
        )
        .affecting(table.to_string())
    }

    /// `COMMENT ON COLUMN`; `None` clears the comment.
    fn comment_on_column(
        &self,
        table: &QualifiedName,
        column: &str,
        comment: Option<&str>,
    ) -> GeneratedStatement {
        let text = comment.map_or_else(|| "NULL".to_string(), quote_literal);
        GeneratedStatement::new(
            StatementKind::Alter,
            Operation::Comment,
            format!(
                "COMMENT ON COLUMN {}.{} IS {text}",
                self.quote_qualified(table),
                self.quote_identifier(column)
            ),
        )
        .affecting(format!("{table}.{column}"))
    }

    // ------------------------------------------------------------------
    // Indexes
    // ------------------------------------------------------------------

    /// Renders one index key.
    fn index_key(&self, key: &IndexColumn) -> String {
        let mut sql = match &key.target {
            IndexTarget::Column(name) => self.quote_identifier(name),
            IndexTarget::Expression(expr) => format!("({expr})"),
        };
        match key.direction {
            Some(SortDirection::Asc) => sql.push_str(" ASC"),
            Some(SortDirection::Desc) => sql.push_str(" DESC"),
            None => {}
        }
        match key.nulls {
            Some(NullsOrder::First) => sql.push_str(" NULLS FIRST"),
            Some(NullsOrder::Last) => sql.push_str(" NULLS LAST"),
            None => {}
        }
        sql
    }

    /// `name ON table` part of CREATE INDEX.
    fn index_target(&self, index: &IndexDefinition) -> String {
        format!(
            "{} ON {}",
            self.quote_identifier(&index.name),
            self.quote_qualified(&index.table)
        )
    }

    /// Storage parameters and tablespace following the key list.
    fn index_storage_clause(&self, index: &IndexDefinition) -> String {
        if !index.storage.is_empty() || index.tablespace.is_some() {
            warn!(
                index = %index.qualified_name(),
                dialect = %self.dialect(),
                "Ignoring index storage parameters"
            );
        }
        String::new()
    }

    /// Generates CREATE INDEX.
    ///
    /// # Errors
    ///
    /// [`DdlError::UnsupportedConstruct`] for index features the dialect
    /// cannot express.
    fn generate_create_index(
        &self,
        index: &IndexDefinition,
        options: &GenerateOptions,
    ) -> Result<GeneratedStatement> {
        let object = index.qualified_name();
        let caps = self.capabilities();
        if index.columns.is_empty() {
            return Err(self.unsupported(&object, "an index without keys"));
        }
        if !caps.supports_index_method(&index.method) {
            return Err(self.unsupported(&object, &format!("index method '{}'", index.method)));
        }
        if !index.include.is_empty() {
            self.require(Feature::CoveringIndexes, &object, "included (covering) columns")?;
        }
        if index.predicate.is_some() {
            self.require(Feature::PartialIndexes, &object, "partial indexes")?;
        }
        if index.has_expressions() {
            self.require(Feature::ExpressionIndexes, &object, "expression indexes")?;
        }
        if !index.method.is_ordered() && index.columns.iter().any(IndexColumn::has_ordering) {
            return Err(self.unsupported(
                &object,
                &format!("key ordering on a {} index", index.method),
            ));
        }

        let mut sql = String::from("CREATE ");
        if index.unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        if options.concurrently && caps.supports(Feature::ConcurrentIndexes) {
            sql.push_str("CONCURRENTLY ");
        }
        if options.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.index_target(index));
        if index.method != IndexMethod::BTree {
            sql.push_str(&format!(" USING {}", index.method.as_sql()));
        }
        let keys: Vec<String> = index.columns.iter().map(|k| self.index_key(k)).collect();
        sql.push_str(&format!(" ({})", keys.join(", ")));
        if !index.include.is_empty() {
            sql.push_str(&format!(" INCLUDE ({})", self.column_list(&index.include)));
        }
        sql.push_str(&self.index_storage_clause(index));
        if let Some(predicate) = &index.predicate {
            sql.push_str(&format!(" WHERE {predicate}"));
        }

        Ok(
            GeneratedStatement::new(StatementKind::Create, Operation::CreateIndex, sql)
                .destructive(index.unique)
                .affecting(object)
                .affecting(index.table.to_string()),
        )
    }

    /// Generates DROP INDEX.
    fn generate_drop_index(&self, index: &IndexDefinition, options: &GenerateOptions) -> GeneratedStatement {
        let mut sql = String::from("DROP INDEX ");
        if options.concurrently && self.capabilities().supports(Feature::ConcurrentIndexes) {
            sql.push_str("CONCURRENTLY ");
        }
        if options.if_exists {
            sql.push_str("IF EXISTS ");
        }
        let name = QualifiedName::new(index.table.schema.as_deref(), index.name.clone());
        sql.push_str(&self.quote_qualified(&name));
        if options.cascade && self.family() == DialectFamily::Postgres {
            sql.push_str(" CASCADE");
        }
        GeneratedStatement::new(StatementKind::Drop, Operation::DropIndex, sql)
            .affecting(index.qualified_name())
            .affecting(index.table.to_string())
    }

    // ------------------------------------------------------------------
    // Other schema objects
    // ------------------------------------------------------------------

    /// Generates `CREATE TYPE ... AS ENUM`.
    ///
    /// # Errors
    ///
    /// [`DdlError::UnsupportedConstruct`] without enum support.
    fn generate_create_enum(&self, enum_type: &EnumType) -> Result<GeneratedStatement> {
        let object = enum_type.name.to_string();
        self.require(Feature::Enums, &object, "enum types")?;
        let values = enum_type
            .values
            .iter()
            .map(|v| quote_literal(v))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "CREATE TYPE {} AS ENUM ({values})",
            self.quote_qualified(&enum_type.name)
        );
        Ok(GeneratedStatement::new(StatementKind::Create, Operation::CreateType, sql).affecting(object))
    }

    /// Generates CREATE SEQUENCE. Ownership is attached separately, once
    /// the owning table exists.
    ///
    /// # Errors
    ///
    /// [`DdlError::UnsupportedConstruct`] without sequence support.
    fn generate_create_sequence(
        &self,
        sequence: &SequenceDefinition,
        options: &GenerateOptions,
    ) -> Result<GeneratedStatement> {
        let object = sequence.name.to_string();
        self.require(Feature::Sequences, &object, "sequences")?;
        let mut sql = String::from("CREATE SEQUENCE ");
        if options.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.quote_qualified(&sequence.name));
        if let Some(increment) = sequence.increment {
            sql.push_str(&format!(" INCREMENT BY {increment}"));
        }
        if let Some(start) = sequence.start {
            sql.push_str(&format!(" START WITH {start}"));
        }
        Ok(GeneratedStatement::new(StatementKind::Create, Operation::CreateSequence, sql).affecting(object))
    }

    /// Generates CREATE FUNCTION. The body is dollar-quoted; statement
    /// lists become a `BEGIN ... END` block for plpgsql.
    ///
    /// # Errors
    ///
    /// [`DdlError::UnsupportedConstruct`] without function support or for
    /// an unavailable language.
    fn generate_create_function(&self, function: &FunctionDefinition) -> Result<GeneratedStatement> {
        let object = function.name.to_string();
        self.require(Feature::Functions, &object, "stored functions")?;
        if !self.capabilities().supports_language(&function.language) {
            return Err(self.unsupported(&object, &format!("language {}", function.language)));
        }

        let body = match &function.body {
            FunctionBody::Raw(raw) => raw.clone(),
            FunctionBody::Statements(statements) if function.language.eq_ignore_ascii_case("plpgsql") => {
                let inner: String = statements
                    .iter()
                    .map(|s| format!("    {};\n", s.trim_end_matches(';')))
                    .collect();
                format!("\nBEGIN\n{inner}END;\n")
            }
            FunctionBody::Statements(statements) => {
                let joined = statements
                    .iter()
                    .map(|s| s.trim_end_matches(';'))
                    .collect::<Vec<_>>()
                    .join(";\n");
                format!("\n{joined};\n")
            }
        };
        let tag = if body.contains("$$") { "$fn$" } else { "$$" };

        let mut sql = String::from("CREATE ");
        if function.or_replace {
            sql.push_str("OR REPLACE ");
        }
        sql.push_str(&format!(
            "FUNCTION {}({}) RETURNS {} LANGUAGE {}",
            self.quote_qualified(&function.name),
            function.arguments,
            function.returns,
            function.language
        ));
        if let Some(volatility) = function.volatility {
            sql.push(' ');
            sql.push_str(volatility.as_sql());
        }
        sql.push_str(&format!(" AS {tag}{body}{tag}"));
        Ok(GeneratedStatement::new(StatementKind::Create, Operation::CreateFunction, sql).affecting(object))
    }

    /// Generates CREATE TRIGGER.
    ///
    /// # Errors
    ///
    /// [`DdlError::UnsupportedConstruct`] for triggers the dialect cannot
    /// express.
    fn generate_create_trigger(
        &self,
        trigger: &TriggerDefinition,
        options: &GenerateOptions,
    ) -> Result<GeneratedStatement>;

    /// Generates `ALTER TABLE ... ENABLE ROW LEVEL SECURITY`.
    ///
    /// # Errors
    ///
    /// [`DdlError::UnsupportedConstruct`] without row-level security.
    fn generate_enable_row_level_security(&self, table: &QualifiedName) -> Result<GeneratedStatement> {
        let object = table.to_string();
        self.require(Feature::RowLevelSecurity, &object, "row-level security")?;
        let sql = format!(
            "ALTER TABLE {} ENABLE ROW LEVEL SECURITY",
            self.quote_qualified(table)
        );
        Ok(GeneratedStatement::new(StatementKind::Alter, Operation::CreatePolicy, sql).affecting(object))
    }

    /// Generates CREATE POLICY.
    ///
    /// # Errors
    ///
    /// [`DdlError::UnsupportedConstruct`] without row-level security.
    fn generate_create_policy(&self, policy: &PolicyDefinition) -> Result<GeneratedStatement> {
        let object = format!("{}.{}", policy.table, policy.name);
        self.require(Feature::RowLevelSecurity, &object, "row-level security policies")?;
        let mut sql = format!(
            "CREATE POLICY {} ON {} FOR {}",
            self.quote_identifier(&policy.name),
            self.quote_qualified(&policy.table),
            policy.command.as_sql()
        );
        if !policy.roles.is_empty() {
            let roles = policy
                .roles
                .iter()
                .map(|r| {
                    if r.eq_ignore_ascii_case("public") {
                        "PUBLIC".to_string()
                    } else {
                        self.quote_identifier(r)
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" TO {roles}"));
        }
        if let Some(using) = &policy.using {
            sql.push_str(&format!(" USING ({using})"));
        }
        if let Some(check) = &policy.with_check {
            sql.push_str(&format!(" WITH CHECK ({check})"));
        }
        Ok(
            GeneratedStatement::new(StatementKind::Create, Operation::CreatePolicy, sql)
                .affecting(object)
                .affecting(policy.table.to_string()),
        )
    }

    /// Generates CREATE [MATERIALIZED] VIEW.
    ///
    /// # Errors
    ///
    /// [`DdlError::UnsupportedConstruct`] without view support.
    fn generate_create_view(&self, view: &ViewDefinition, options: &GenerateOptions) -> Result<GeneratedStatement> {
        let object = view.name.to_string();
        let mut sql = String::from("CREATE ");
        if view.materialized {
            self.require(Feature::MaterializedViews, &object, "materialized views")?;
            sql.push_str("MATERIALIZED ");
        } else {
            self.require(Feature::Views, &object, "views")?;
        }
        sql.push_str("VIEW ");
        if options.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&format!("{} AS {}", self.quote_qualified(&view.name), view.query));
        Ok(GeneratedStatement::new(StatementKind::Create, Operation::CreateView, sql).affecting(object))
    }

    /// Generates CREATE EXTENSION.
    ///
    /// # Errors
    ///
    /// [`DdlError::UnsupportedConstruct`] without extension support.
    fn generate_create_extension(&self, extension: &ExtensionDefinition) -> Result<GeneratedStatement> {
        self.require(Feature::Extensions, &extension.name, "extensions")?;
        let mut sql = format!(
            "CREATE EXTENSION IF NOT EXISTS {}",
            self.quote_identifier(&extension.name)
        );
        if let Some(schema) = &extension.schema {
            sql.push_str(&format!(" SCHEMA {}", self.quote_identifier(schema)));
        }
        Ok(
            GeneratedStatement::new(StatementKind::Create, Operation::CreateExtension, sql)
                .affecting(extension.name.clone()),
        )
    }

    /// Generates the whole schema: extensions, enums, sequences, tables in
    /// foreign-key dependency order, sequence ownership, indexes, comments
    /// and settings, views, functions, triggers, then row-level security
    /// and policies.
    ///
    /// # Errors
    ///
    /// The first object that cannot be rendered.
    fn generate_schema(&self, model: &SchemaModel, options: &GenerateOptions) -> Result<Vec<GeneratedStatement>> {
        debug!(
            dialect = %self.dialect(),
            tables = model.tables.len(),
            "Generating schema"
        );
        let mut out = Vec::new();

        for extension in &model.extensions {
            out.push(self.generate_create_extension(extension)?);
        }
        for enum_type in &model.enums {
            out.push(self.generate_create_enum(enum_type)?);
        }
        for sequence in &model.sequences {
            out.push(self.generate_create_sequence(sequence, options)?);
        }

        let tables: Vec<&TableDefinition> = model.tables.iter().collect();
        let ordering = dependency_order(&tables, self.capabilities().default_schema);
        if !ordering.cycle.is_empty() {
            warn!(
                tables = ?ordering.cycle.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "Foreign key cycle; creating tables in declaration order"
            );
        }
        let ordered: Vec<&TableDefinition> = ordering.order.iter().map(|&i| tables[i]).collect();
        for table in &ordered {
            out.push(self.generate_create_table(table, options)?);
        }

        for sequence in &model.sequences {
            if let Some(owner) = &sequence.owned_by {
                let sql = format!(
                    "ALTER SEQUENCE {} OWNED BY {owner}",
                    self.quote_qualified(&sequence.name)
                );
                out.push(
                    GeneratedStatement::new(StatementKind::Alter, Operation::CreateSequence, sql)
                        .affecting(sequence.name.to_string()),
                );
            }
        }

        for table in &ordered {
            for index in &table.indexes {
                out.push(self.generate_create_index(index, options)?);
            }
        }
        for table in &ordered {
            out.extend(self.generate_table_extras(table, options));
        }
        for view in &model.views {
            out.push(self.generate_create_view(view, options)?);
        }
        for function in &model.functions {
            out.push(self.generate_create_function(function)?);
        }
        for trigger in &model.triggers {
            out.push(self.generate_create_trigger(trigger, options)?);
        }

        let mut secured: Vec<&QualifiedName> = Vec::new();
        for policy in &model.policies {
            if !secured.contains(&&policy.table) {
                secured.push(&policy.table);
                out.push(self.generate_enable_row_level_security(&policy.table)?);
            }
            out.push(self.generate_create_policy(policy)?);
        }

        Ok(out)
    }
}

fn push_actions(sql: &mut String, on_delete: Option<ForeignKeyAction>, on_update: Option<ForeignKeyAction>) {
    if let Some(action) = on_delete {
        sql.push_str(" ON DELETE ");
        sql.push_str(action.as_sql());
    }
    if let Some(action) = on_update {
        sql.push_str(" ON UPDATE ");
        sql.push_str(action.as_sql());
    }
}

/// The generator for `dialect`'s family, bound to its capability set.
#[must_use]
pub fn generator_for(dialect: Dialect) -> Box<dyn DdlGenerator> {
    let caps = capabilities_for(dialect);
    match caps.family() {
        DialectFamily::Postgres => Box::new(PostgresGenerator::new(caps)),
        DialectFamily::Sqlite => Box::new(SqliteGenerator::new(caps)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{integer, text, PolicyCommand};
    use pretty_assertions::assert_eq;

    #[test]
    fn generator_for_every_dialect() {
        for dialect in Dialect::ALL {
            let generator = generator_for(dialect);
            assert_eq!(generator.dialect(), dialect);
            assert_eq!(generator.family(), dialect.family());
        }
    }

    #[test]
    fn drop_table_is_destructive() {
        let generator = generator_for(Dialect::Postgres);
        let options = GenerateOptions {
            if_exists: true,
            cascade: true,
            ..GenerateOptions::default()
        };
        let stmt = generator.generate_drop_table(&QualifiedName::from("app.user"), &options);
        assert_eq!(stmt.sql, "DROP TABLE IF EXISTS app.\"user\" CASCADE");
        assert!(stmt.destructive);
        assert_eq!(stmt.kind, StatementKind::Drop);
        assert_eq!(stmt.affected, vec!["app.user".to_string()]);

        let sqlite = generator_for(Dialect::Sqlite).generate_drop_table(&QualifiedName::from("t"), &options);
        assert_eq!(sqlite.sql, "DROP TABLE IF EXISTS t");
    }

    #[test]
    fn schema_is_emitted_in_dependency_order() {
        let model = SchemaModel::from_tables(vec![
            TableDefinition::builder("posts")
                .column(integer("id").primary_key().build())
                .column(integer("author_id").references("users", "id").build())
                .index(IndexDefinition::builder("idx_posts_author", "posts").column("author_id").build())
                .build(),
            TableDefinition::builder("users")
                .column(integer("id").primary_key().build())
                .column(text("name").build())
                .build(),
        ]);
        let model = SchemaModel {
            policies: vec![PolicyDefinition {
                name: "own_posts".into(),
                table: QualifiedName::from("posts"),
                command: PolicyCommand::Select,
                roles: vec!["app_user".into()],
                using: Some("author_id = current_setting('app.user')::int".into()),
                with_check: None,
            }],
            ..model
        };
        let stmts = generator_for(Dialect::Postgres)
            .generate_schema(&model, &GenerateOptions::default())
            .unwrap();
        let ops: Vec<(Operation, &str)> = stmts
            .iter()
            .map(|s| (s.operation, s.affected[0].as_str()))
            .collect();
        assert_eq!(
            ops,
            vec![
                (Operation::CreateTable, "users"),
                (Operation::CreateTable, "posts"),
                (Operation::CreateIndex, "idx_posts_author"),
                (Operation::CreatePolicy, "posts"),
                (Operation::CreatePolicy, "posts.own_posts"),
            ]
        );
        assert_eq!(stmts[3].sql, "ALTER TABLE posts ENABLE ROW LEVEL SECURITY");
        assert_eq!(
            stmts[4].sql,
            "CREATE POLICY own_posts ON posts FOR SELECT TO app_user \
             USING (author_id = current_setting('app.user')::int)"
        );
    }

    #[test]
    fn function_bodies_are_dollar_quoted() {
        let function = FunctionDefinition {
            name: QualifiedName::from("touch_updated_at"),
            arguments: String::new(),
            returns: "trigger".into(),
            language: "plpgsql".into(),
            body: FunctionBody::Statements(vec![
                "NEW.updated_at = now()".into(),
                "RETURN NEW;".into(),
            ]),
            volatility: None,
            or_replace: true,
        };
        let stmt = generator_for(Dialect::Postgres)
            .generate_create_function(&function)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE OR REPLACE FUNCTION touch_updated_at() RETURNS trigger LANGUAGE plpgsql AS $$\n\
             BEGIN\n    NEW.updated_at = now();\n    RETURN NEW;\nEND;\n$$"
        );
        assert!(generator_for(Dialect::Nile)
            .generate_create_function(&function)
            .is_err());
    }

    #[test]
    fn enums_need_support() {
        let mood = EnumType {
            name: QualifiedName::from("mood"),
            values: vec!["happy".into(), "it's fine".into()],
        };
        assert_eq!(
            generator_for(Dialect::Postgres)
                .generate_create_enum(&mood)
                .unwrap()
                .sql,
            "CREATE TYPE mood AS ENUM ('happy', 'it''s fine')"
        );
        assert!(matches!(
            generator_for(Dialect::D1).generate_create_enum(&mood),
            Err(DdlError::UnsupportedConstruct { ref construct, .. }) if construct == "enum types"
        ));
    }

    #[test]
    fn comments_only_when_requested() {
        let table = TableDefinition::builder("t")
            .column(integer("id").comment("row id").build())
            .comment("things")
            .build();
        let generator = generator_for(Dialect::Postgres);
        assert!(generator
            .generate_table_extras(&table, &GenerateOptions::default())
            .is_empty());
        let options = GenerateOptions {
            comments: true,
            ..GenerateOptions::default()
        };
        let sql: Vec<String> = generator
            .generate_table_extras(&table, &options)
            .into_iter()
            .map(|s| s.sql)
            .collect();
        assert_eq!(
            sql,
            vec![
                "COMMENT ON TABLE t IS 'things'".to_string(),
                "COMMENT ON COLUMN t.id IS 'row id'".to_string(),
            ]
        );
    }
}
