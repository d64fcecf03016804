//! Table-level checks: structure, reserved names, table options,
//! constraints, foreign keys and indexes.

use std::collections::HashSet;

use crate::capability::{DialectFamily, Feature};
use crate::schema::{
    ConstraintDefinition, ConstraintKind, IndexDefinition, IndexMethod, QualifiedName,
    TableDefinition,
};

use super::{Checks, FeatureCode, IssueCategory};

impl Checks<'_> {
    pub(super) fn table(&mut self, table: &TableDefinition) {
        let location = table.qualified_name().to_string();

        if table.columns.is_empty() {
            self.error(
                IssueCategory::Feature,
                FeatureCode::EmptyTable,
                &location,
                "Table has no columns".to_string(),
                None,
            );
        }

        if let Some(reason) = self
            .caps
            .reserved
            .collision(&table.qualified_name(), self.caps.default_schema)
        {
            self.error(
                IssueCategory::Feature,
                FeatureCode::ReservedObject,
                &location,
                format!("Reserved by {}: {reason}", self.caps.dialect),
                Some("Rename the table or move it to another schema"),
            );
        }

        let mut seen = HashSet::new();
        for column in &table.columns {
            if !seen.insert(column.name.as_str()) {
                self.error(
                    IssueCategory::Constraint,
                    FeatureCode::DuplicateColumn,
                    &format!("{location}.{}", column.name),
                    format!("Column '{}' is declared more than once", column.name),
                    None,
                );
            }
        }

        for column in &table.columns {
            self.column(table, column);
        }
        self.table_features(table, &location);

        for constraint in &table.constraints {
            self.constraint(table, &location, constraint);
        }
        for column in &table.columns {
            if let Some(reference) = &column.references {
                self.foreign_key_target(
                    &format!("{location}.{}", column.name),
                    &reference.table,
                    std::slice::from_ref(&reference.column),
                );
            }
        }

        for index in &table.indexes {
            self.index(table, index);
        }
    }

    fn table_features(&mut self, table: &TableDefinition, location: &str) {
        let dialect = self.caps.dialect;

        if table.partitioning.is_some() && !self.caps.supports(Feature::Partitioning) {
            self.error(
                IssueCategory::Feature,
                FeatureCode::Partitioning,
                location,
                format!("Declarative partitioning is not supported by {dialect}"),
                Some("Split the data into separate tables, or rely on indexes on the partition key"),
            );
        }
        if !table.inherits.is_empty() && !self.caps.supports(Feature::Inheritance) {
            self.error(
                IssueCategory::Feature,
                FeatureCode::Inheritance,
                location,
                format!("Table inheritance is not supported by {dialect}"),
                Some("Copy the parent columns into this table"),
            );
        }
        if table.options.unlogged && !self.caps.supports(Feature::UnloggedTables) {
            self.warning(
                IssueCategory::Feature,
                FeatureCode::UnloggedTable,
                location,
                format!("UNLOGGED is not supported by {dialect}; the table is created logged"),
            );
        }
        if table.options.tablespace.is_some() && !self.caps.supports(Feature::Tablespaces) {
            self.warning(
                IssueCategory::Feature,
                FeatureCode::Tablespace,
                location,
                format!("Tablespaces are not supported by {dialect}; TABLESPACE is ignored"),
            );
        }
        if table.extensions.locality.is_some() && !self.caps.supports(Feature::Locality) {
            self.warning(
                IssueCategory::Feature,
                FeatureCode::Locality,
                location,
                format!("LOCALITY is not supported by {dialect} and is ignored"),
            );
        }
        if !table.extensions.zone_config.is_empty() && !self.caps.supports(Feature::ZoneConfig) {
            self.warning(
                IssueCategory::Feature,
                FeatureCode::ZoneConfig,
                location,
                format!("Zone configuration is not supported by {dialect} and is ignored"),
            );
        }
        if (table.options.strict || table.options.without_rowid)
            && self.caps.family() != DialectFamily::Sqlite
        {
            self.warning(
                IssueCategory::Feature,
                FeatureCode::SqliteTableOptions,
                location,
                format!("STRICT and WITHOUT ROWID are SQLite options and are ignored for {dialect}"),
            );
        }
        if table.comment.is_some() && !self.caps.supports(Feature::Comments) {
            self.info(
                IssueCategory::Feature,
                FeatureCode::Comment,
                location,
                format!("Table comments are not emitted for {dialect}"),
            );
        }
    }

    fn constraint(
        &mut self,
        table: &TableDefinition,
        table_location: &str,
        constraint: &ConstraintDefinition,
    ) {
        let location = format!(
            "{table_location}.{}",
            constraint.effective_name(&table.name)
        );

        if matches!(constraint.kind, ConstraintKind::Exclusion { .. })
            && !self.caps.supports(Feature::ExclusionConstraints)
        {
            let alternative = if self.caps.supports(Feature::Triggers) {
                "Enforce the rule with a trigger"
            } else {
                "Enforce the rule in the application"
            };
            self.error(
                IssueCategory::Constraint,
                FeatureCode::ExclusionConstraint,
                &location,
                format!(
                    "Exclusion constraints are not supported by {}",
                    self.caps.dialect
                ),
                Some(alternative),
            );
        }

        if !matches!(constraint.kind, ConstraintKind::Exclusion { .. }) {
            for column in constraint.columns() {
                if !table.has_column(column) {
                    self.error(
                        IssueCategory::Constraint,
                        FeatureCode::ConstraintUnknownColumn,
                        &location,
                        format!("Constraint names unknown column '{column}'"),
                        None,
                    );
                }
            }
        }

        if let ConstraintKind::ForeignKey {
            references_table,
            references_columns,
            ..
        } = &constraint.kind
        {
            self.foreign_key_target(&location, references_table, references_columns);
        }
    }

    /// Cross-table check of a foreign key target. Platform-managed tables
    /// are outside the snapshot and accepted as targets.
    fn foreign_key_target(&mut self, location: &str, target: &QualifiedName, columns: &[String]) {
        match self.schema.table(target) {
            Some(referenced) => {
                for column in columns {
                    if !referenced.has_column(column) {
                        self.error(
                            IssueCategory::Constraint,
                            FeatureCode::ForeignKeyUnknownColumn,
                            location,
                            format!("Foreign key references unknown column '{target}.{column}'"),
                            None,
                        );
                    }
                }
            }
            None if self
                .caps
                .reserved
                .collision(target, self.caps.default_schema)
                .is_some() => {}
            None => self.error(
                IssueCategory::Constraint,
                FeatureCode::ForeignKeyUnknownTable,
                location,
                format!("Foreign key references unknown table '{target}'"),
                None,
            ),
        }
    }

    fn index(&mut self, table: &TableDefinition, index: &IndexDefinition) {
        let dialect = self.caps.dialect;
        let location = index.qualified_name();

        if !self.caps.supports_index_method(&index.method) {
            let alternative = self
                .caps
                .supports_index_method(&IndexMethod::BTree)
                .then_some("Use a btree index");
            self.error(
                IssueCategory::Index,
                FeatureCode::IndexMethod,
                &location,
                format!("Index method '{}' is not supported by {dialect}", index.method),
                alternative,
            );
        }
        if index.predicate.is_some() && !self.caps.supports(Feature::PartialIndexes) {
            self.error(
                IssueCategory::Index,
                FeatureCode::PartialIndex,
                &location,
                format!("Partial indexes are not supported by {dialect}"),
                Some("Index all rows and filter in queries"),
            );
        }
        if !index.include.is_empty() && !self.caps.supports(Feature::CoveringIndexes) {
            self.error(
                IssueCategory::Index,
                FeatureCode::CoveringIndex,
                &location,
                format!("Covering (INCLUDE) indexes are not supported by {dialect}"),
                Some("Append the included columns to the index key"),
            );
        }
        if !index.method.is_ordered() && index.columns.iter().any(|c| c.has_ordering()) {
            self.error(
                IssueCategory::Index,
                FeatureCode::IndexOrdering,
                &location,
                format!(
                    "Index method '{}' does not support ASC/DESC or NULLS ordering",
                    index.method
                ),
                Some("Remove the ordering options, or use a btree index"),
            );
        }
        if index.has_expressions() && !self.caps.supports(Feature::ExpressionIndexes) {
            let alternative = self
                .caps
                .supports(Feature::GeneratedColumns)
                .then_some("Index a stored generated column holding the expression");
            self.error(
                IssueCategory::Index,
                FeatureCode::ExpressionIndex,
                &location,
                format!("Expression indexes are not supported by {dialect}"),
                alternative,
            );
        }

        let named = index.column_names().chain(index.include.iter().map(String::as_str));
        for column in named {
            if !table.has_column(column) {
                self.error(
                    IssueCategory::Index,
                    FeatureCode::IndexUnknownColumn,
                    &location,
                    format!("Index names unknown column '{column}' of '{}'", table.name),
                    None,
                );
            }
        }

        let ignored_storage = !index.storage.is_empty() && self.caps.family() == DialectFamily::Sqlite;
        let ignored_tablespace =
            index.tablespace.is_some() && !self.caps.supports(Feature::Tablespaces);
        if ignored_storage || ignored_tablespace {
            self.warning(
                IssueCategory::Index,
                FeatureCode::IndexStorage,
                &location,
                format!("Index storage parameters and tablespace are ignored for {dialect}"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::capability::{capabilities_for, Dialect};
    use crate::schema::{
        bigint, integer, text, timestamptz, ConstraintBuilder, IndexDefinition, IndexMethod,
        NullsOrder, PartitionStrategy, SchemaModel, SortDirection, TableDefinition,
    };
    use crate::validate::{validate, FeatureCode, Severity};

    fn users() -> TableDefinition {
        TableDefinition::builder("users")
            .column(bigint("id").primary_key().build())
            .column(text("email").not_null().build())
            .build()
    }

    #[test]
    fn foreign_keys_are_checked_across_tables() {
        let posts = TableDefinition::builder("posts")
            .column(bigint("id").primary_key().build())
            .column(bigint("author_id").references("users", "id").build())
            .column(bigint("editor_id").references("users", "uid").build())
            .constraint(
                ConstraintBuilder::foreign_key(["id"], "missing", ["id"]).build(),
            )
            .build();
        let schema = SchemaModel::from_tables(vec![users(), posts]);
        let result = validate(&schema, capabilities_for(Dialect::Postgres)).unwrap();
        let codes: Vec<FeatureCode> = result.errors().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                FeatureCode::ForeignKeyUnknownTable,
                FeatureCode::ForeignKeyUnknownColumn,
            ]
        );
        let unknown_column = result
            .issues_for(FeatureCode::ForeignKeyUnknownColumn)
            .next()
            .unwrap();
        assert_eq!(unknown_column.location, "posts.editor_id");
    }

    #[test]
    fn platform_tables_are_valid_foreign_key_targets() {
        let todos = TableDefinition::builder("todos")
            .column(crate::schema::uuid("tenant_id").references("tenants", "id").build())
            .column(crate::schema::uuid("id").build())
            .constraint(ConstraintBuilder::primary_key(["tenant_id", "id"]).build())
            .build();
        let result = validate(
            &SchemaModel::from_tables(vec![todos]),
            capabilities_for(Dialect::Nile),
        )
        .unwrap();
        assert_eq!(
            result.issues_for(FeatureCode::ForeignKeyUnknownTable).count(),
            0
        );
    }

    #[test]
    fn reserved_and_empty_tables() {
        let schema = SchemaModel::from_tables(vec![TableDefinition::new("sqlite_sequence")]);
        let result = validate(&schema, capabilities_for(Dialect::Sqlite)).unwrap();
        let codes: Vec<FeatureCode> = result.errors().map(|i| i.code).collect();
        assert_eq!(codes, vec![FeatureCode::EmptyTable, FeatureCode::ReservedObject]);
    }

    #[test]
    fn sqlite_rejects_postgres_index_features() {
        let table = TableDefinition::builder("events")
            .column(integer("id").primary_key().build())
            .column(text("payload").build())
            .column(timestamptz("at").build())
            .index(
                IndexDefinition::builder("idx_events_payload", "events")
                    .column("payload")
                    .method(IndexMethod::Gin)
                    .build(),
            )
            .index(
                IndexDefinition::builder("idx_events_at", "events")
                    .column("at")
                    .include("payload")
                    .build(),
            )
            .build();
        let result = validate(
            &SchemaModel::from_tables(vec![table]),
            capabilities_for(Dialect::Sqlite),
        )
        .unwrap();
        let codes: Vec<FeatureCode> = result.errors().map(|i| i.code).collect();
        assert_eq!(codes, vec![FeatureCode::IndexMethod, FeatureCode::CoveringIndex]);
    }

    #[test]
    fn ordering_on_gin_is_rejected_even_on_postgres() {
        let table = TableDefinition::builder("docs")
            .column(integer("id").primary_key().build())
            .column(text("body").build())
            .index(
                IndexDefinition::builder("idx_docs_body", "docs")
                    .column_ordered("body", SortDirection::Desc, Some(NullsOrder::Last))
                    .method(IndexMethod::Gin)
                    .build(),
            )
            .index(
                IndexDefinition::builder("idx_docs_missing", "docs")
                    .column("title")
                    .build(),
            )
            .build();
        let result = validate(
            &SchemaModel::from_tables(vec![table]),
            capabilities_for(Dialect::Postgres),
        )
        .unwrap();
        let codes: Vec<FeatureCode> = result.errors().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![FeatureCode::IndexOrdering, FeatureCode::IndexUnknownColumn]
        );
    }

    #[test]
    fn partitioning_and_options_on_cockroach() {
        let table = TableDefinition::builder("metrics")
            .column(bigint("id").primary_key().build())
            .partition_by(PartitionStrategy::Range, ["id"])
            .unlogged()
            .tablespace("fast")
            .build();
        let result = validate(
            &SchemaModel::from_tables(vec![table]),
            capabilities_for(Dialect::CockroachDb),
        )
        .unwrap();
        assert_eq!(result.issues_for(FeatureCode::Partitioning).count(), 1);
        let severities: Vec<Severity> = result
            .issues_for(FeatureCode::UnloggedTable)
            .chain(result.issues_for(FeatureCode::Tablespace))
            .map(|i| i.severity)
            .collect();
        assert_eq!(severities, vec![Severity::Warning, Severity::Warning]);
    }

    #[test]
    fn exclusion_constraint_on_sqlite_suggests_trigger() {
        let table = TableDefinition::builder("bookings")
            .column(integer("room_id").build())
            .constraint(
                ConstraintBuilder::exclusion()
                    .exclude("room_id", "=")
                    .build(),
            )
            .build();
        let result = validate(
            &SchemaModel::from_tables(vec![table]),
            capabilities_for(Dialect::Sqlite),
        )
        .unwrap();
        let issue = result
            .issues_for(FeatureCode::ExclusionConstraint)
            .next()
            .unwrap();
        assert_eq!(
            issue.alternative.as_deref(),
            Some("Enforce the rule with a trigger")
        );
        assert_eq!(issue.location, "bookings.bookings_room_id_excl");
    }
}
