//! PostgreSQL family generator (PostgreSQL, CockroachDB, Nile).

use tracing::warn;

use crate::capability::{types, DialectCapabilitySet, Feature};
use crate::error::{DdlError, Result};
use crate::schema::{
    ColumnDefinition, ConstraintDefinition, ConstraintKind, GeneratedColumn, IndexDefinition, QualifiedName,
    StorageOption, TableDefinition, TriggerDefinition, TriggerEvent,
};

use super::changes::{requires_backfill, ColumnChange, TableChanges};
use super::{
    render_default, DdlGenerator, GenerateOptions, GeneratedStatement, Operation, StatementKind,
};

/// Generator for the PostgreSQL family.
#[derive(Debug, Clone, Copy)]
pub struct PostgresGenerator {
    caps: &'static DialectCapabilitySet,
}

impl PostgresGenerator {
    /// Creates a generator bound to a capability set.
    #[must_use]
    pub const fn new(caps: &'static DialectCapabilitySet) -> Self {
        Self { caps }
    }

    fn storage_list(options: &[StorageOption]) -> String {
        options
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether an auto-increment column is emitted as IDENTITY.
    fn uses_identity(&self, column: &ColumnDefinition, options: &GenerateOptions) -> bool {
        column.auto_increment && options.identity_columns && self.caps.supports(Feature::Identity)
    }

    /// The integer type behind an auto-increment column.
    fn integer_base(&self, table: &TableDefinition, column: &ColumnDefinition) -> Result<&'static str> {
        let canonical = types::normalized(&column.data_type);
        let base = types::serial_base(&canonical).unwrap_or(canonical.as_str());
        match base {
            "smallint" => Ok("smallint"),
            "integer" => Ok("integer"),
            "bigint" => Ok("bigint"),
            _ => Err(DdlError::InvalidAutoIncrement {
                table: table.qualified_name().to_string(),
                column: column.name.clone(),
                data_type: column.data_type.clone(),
                dialect: self.caps.dialect.to_string(),
            }),
        }
    }

    /// The type used in `ALTER COLUMN ... TYPE`, where serial pseudo-types
    /// are not accepted.
    fn storage_type(&self, table: &TableDefinition, column: &ColumnDefinition) -> Result<String> {
        if column.auto_increment || types::is_serial(&types::normalized(&column.data_type)) {
            Ok(self.integer_base(table, column)?.to_string())
        } else {
            Ok(column.declared_type())
        }
    }

    fn partition_key(&self, table: &TableDefinition, key: &str) -> String {
        if table.has_column(key) {
            self.quote_identifier(key)
        } else {
            format!("({key})")
        }
    }

    fn alter(&self, table: &QualifiedName, action: &str) -> String {
        format!("ALTER TABLE {} {action}", self.quote_qualified(table))
    }

    fn zone_config(&self, table: &TableDefinition) -> Option<GeneratedStatement> {
        if table.extensions.zone_config.is_empty() {
            return None;
        }
        let name = table.qualified_name();
        if !self.caps.supports(Feature::ZoneConfig) {
            warn!(table = %name, dialect = %self.caps.dialect, "Ignoring zone configuration");
            return None;
        }
        let sql = self.alter(
            &name,
            &format!(
                "CONFIGURE ZONE USING {}",
                Self::storage_list(&table.extensions.zone_config)
            ),
        );
        Some(
            GeneratedStatement::new(StatementKind::Alter, Operation::TableSettings, sql)
                .affecting(name.to_string()),
        )
    }

    /// `ADD CONSTRAINT name ...` with the name synthesized when absent.
    fn named_constraint(&self, table: &TableDefinition, constraint: &ConstraintDefinition) -> Result<String> {
        let mut named = constraint.clone();
        if named.name.is_none() {
            named.name = Some(constraint.effective_name(&table.name));
        }
        self.table_constraint(table, &named)
    }

    /// Column-level constraints as table constraints, for ALTER.
    fn column_constraint(
        &self,
        table: &TableDefinition,
        column: &ColumnDefinition,
        kind: ColumnConstraint,
    ) -> Option<ConstraintDefinition> {
        let columns = vec![column.name.clone()];
        let (suffix, kind) = match kind {
            ColumnConstraint::Unique => (
                "key",
                column.unique.then(|| ConstraintKind::Unique { columns }),
            ),
            ColumnConstraint::Check => (
                "check",
                column
                    .check
                    .clone()
                    .map(|expression| ConstraintKind::Check { expression }),
            ),
            ColumnConstraint::ForeignKey => (
                "fkey",
                column.references.as_ref().map(|r| ConstraintKind::ForeignKey {
                    columns,
                    references_table: r.table.clone(),
                    references_columns: vec![r.column.clone()],
                    on_delete: r.on_delete,
                    on_update: r.on_update,
                    deferrable: false,
                }),
            ),
        };
        kind.map(|kind| ConstraintDefinition {
            name: Some(format!("{}_{}_{suffix}", table.name, column.name)),
            kind,
        })
    }

    /// Drop, add or replace one column-level constraint.
    fn column_constraint_change(
        &self,
        from: &TableDefinition,
        to: &TableDefinition,
        change: &ColumnChange<'_>,
        kind: ColumnConstraint,
    ) -> Result<Option<GeneratedStatement>> {
        let name = to.qualified_name();
        let affected = format!("{name}.{}", change.to.name);
        let old = self.column_constraint(from, change.from, kind);
        let new = self.column_constraint(to, change.to, kind);
        let stmt = match (old, new) {
            (None, None) => return Ok(None),
            (Some(old), None) => GeneratedStatement::new(
                StatementKind::Alter,
                Operation::DropConstraint,
                self.drop_constraint_sql(&name, &old.effective_name(&from.name)),
            ),
            (None, Some(new)) => GeneratedStatement::new(
                StatementKind::Alter,
                Operation::AddConstraint,
                self.alter(&name, &format!("ADD {}", self.table_constraint(to, &new)?)),
            )
            .destructive(true),
            (Some(old), Some(new)) => GeneratedStatement::new(
                StatementKind::Alter,
                Operation::ReplaceConstraint,
                format!(
                    "{}, ADD {}",
                    self.drop_constraint_sql(&name, &old.effective_name(&from.name)),
                    self.table_constraint(to, &new)?
                ),
            )
            .destructive(true),
        };
        Ok(Some(stmt.affecting(affected)))
    }

    fn drop_constraint_sql(&self, table: &QualifiedName, constraint: &str) -> String {
        self.alter(
            table,
            &format!("DROP CONSTRAINT IF EXISTS {}", self.quote_identifier(constraint)),
        )
    }

    fn alter_column(
        &self,
        from: &TableDefinition,
        to: &TableDefinition,
        change: &ColumnChange<'_>,
        options: &GenerateOptions,
    ) -> Result<Vec<GeneratedStatement>> {
        let name = to.qualified_name();
        let column = change.to;
        let quoted = self.quote_identifier(&column.name);
        let affected = format!("{name}.{}", column.name);
        let alter_column = |action: String, destructive: bool| {
            GeneratedStatement::new(
                StatementKind::Alter,
                Operation::AlterColumn,
                self.alter(&name, &format!("ALTER COLUMN {quoted} {action}")),
            )
            .destructive(destructive)
            .affecting(affected.clone())
        };
        let mut out = Vec::new();

        // A new or changed expression cannot be altered in place.
        if change.generated_changed && column.generated.is_some() {
            out.push(
                GeneratedStatement::new(
                    StatementKind::Alter,
                    Operation::DropColumn,
                    self.alter(&name, &format!("DROP COLUMN {quoted}")),
                )
                .destructive(true)
                .affecting(affected.clone()),
            );
            out.push(
                GeneratedStatement::new(
                    StatementKind::Alter,
                    Operation::AddColumn,
                    self.alter(
                        &name,
                        &format!("ADD COLUMN {}", self.column_definition(to, column, options)?),
                    ),
                )
                .destructive(true)
                .affecting(affected.clone()),
            );
            return Ok(out);
        }

        if change.type_changed {
            let ty = self.storage_type(to, column)?;
            let mut action = format!("TYPE {ty}");
            if let Some(collation) = &column.collation {
                action.push_str(&self.collate_clause(collation));
            }
            if !change.widening {
                action.push_str(&format!(" USING {quoted}::{ty}"));
            }
            out.push(alter_column(action, !change.widening));
        }

        if change.nullability_changed {
            if column.nullable {
                out.push(alter_column("DROP NOT NULL".to_string(), false));
            } else {
                out.push(alter_column("SET NOT NULL".to_string(), true));
            }
        }

        if change.default_changed && !column.auto_increment {
            match render_default(self.caps, to, column)? {
                Some(default) => out.push(alter_column(format!("SET DEFAULT {default}"), false)),
                None => out.push(alter_column("DROP DEFAULT".to_string(), false)),
            }
        }

        if change.identity_changed {
            if column.auto_increment {
                if !self.caps.supports(Feature::Identity) {
                    return Err(self.unsupported(&affected, "adding an identity to an existing column"));
                }
                let ty = self.integer_base(to, column)?;
                if !types::is_integer(&types::normalized(&change.from.data_type)) {
                    out.push(alter_column(format!("TYPE {ty} USING {quoted}::{ty}"), true));
                }
                out.push(alter_column("ADD GENERATED BY DEFAULT AS IDENTITY".to_string(), false));
            } else if options.identity_columns {
                out.push(alter_column("DROP IDENTITY IF EXISTS".to_string(), false));
            } else {
                out.push(alter_column("DROP DEFAULT".to_string(), false));
            }
        }

        if change.generated_changed {
            out.push(alter_column("DROP EXPRESSION".to_string(), false));
        }

        if change.unique_changed {
            out.extend(self.column_constraint_change(from, to, change, ColumnConstraint::Unique)?);
        }
        if change.references_changed {
            out.extend(self.column_constraint_change(from, to, change, ColumnConstraint::ForeignKey)?);
        }
        if change.check_changed {
            out.extend(self.column_constraint_change(from, to, change, ColumnConstraint::Check)?);
        }

        if change.comment_changed && options.comments && self.caps.supports(Feature::Comments) {
            out.push(self.comment_on_column(&name, &column.name, column.comment.as_deref()));
        }

        Ok(out)
    }

    fn primary_key_change(&self, from: &TableDefinition, to: &TableDefinition) -> GeneratedStatement {
        let name = to.qualified_name();
        let old_name = pk_constraint_name(from);
        let new_columns: Vec<String> = to.primary_key_columns().iter().map(ToString::to_string).collect();
        let mut actions = Vec::new();
        if !from.primary_key_columns().is_empty() {
            actions.push(format!(
                "DROP CONSTRAINT IF EXISTS {}",
                self.quote_identifier(&old_name)
            ));
        }
        if !new_columns.is_empty() {
            actions.push(format!(
                "ADD CONSTRAINT {} PRIMARY KEY ({})",
                self.quote_identifier(&pk_constraint_name(to)),
                self.column_list(&new_columns)
            ));
        }
        GeneratedStatement::new(
            StatementKind::Alter,
            Operation::ReplaceConstraint,
            self.alter(&name, &actions.join(", ")),
        )
        .destructive(!new_columns.is_empty())
        .affecting(name.to_string())
    }

    fn options_change(&self, from: &TableDefinition, to: &TableDefinition) -> Result<Vec<GeneratedStatement>> {
        let name = to.qualified_name();
        let object = name.to_string();
        if from.partitioning != to.partitioning {
            return Err(self.unsupported(&object, "changing the partitioning of an existing table"));
        }
        if from.inherits != to.inherits {
            return Err(self.unsupported(&object, "changing the inheritance of an existing table"));
        }
        if from.options.temporary != to.options.temporary {
            return Err(self.unsupported(&object, "changing a table to or from TEMPORARY"));
        }

        let mut actions = Vec::new();
        if from.options.unlogged != to.options.unlogged && self.caps.supports(Feature::UnloggedTables) {
            let keyword = if to.options.unlogged { "SET UNLOGGED" } else { "SET LOGGED" };
            actions.push(keyword.to_string());
        }
        if from.options.tablespace != to.options.tablespace && self.caps.supports(Feature::Tablespaces) {
            let tablespace = to.options.tablespace.as_deref().unwrap_or("pg_default");
            actions.push(format!("SET TABLESPACE {}", self.quote_identifier(tablespace)));
        }
        let reset: Vec<&str> = from
            .options
            .with
            .iter()
            .filter(|o| !to.options.with.iter().any(|n| n.key == o.key))
            .map(|o| o.key.as_str())
            .collect();
        if !reset.is_empty() {
            actions.push(format!("RESET ({})", reset.join(", ")));
        }
        let set: Vec<StorageOption> = to
            .options
            .with
            .iter()
            .filter(|o| !from.options.with.contains(o))
            .cloned()
            .collect();
        if !set.is_empty() {
            actions.push(format!("SET ({})", Self::storage_list(&set)));
        }

        Ok(actions
            .into_iter()
            .map(|action| {
                GeneratedStatement::new(StatementKind::Alter, Operation::TableSettings, self.alter(&name, &action))
                    .affecting(object.clone())
            })
            .collect())
    }

    fn extensions_change(&self, from: &TableDefinition, to: &TableDefinition) -> Vec<GeneratedStatement> {
        let name = to.qualified_name();
        let mut out = Vec::new();
        if from.extensions.locality != to.extensions.locality && self.caps.supports(Feature::Locality) {
            let locality = to.extensions.locality.as_deref().unwrap_or("REGIONAL BY TABLE");
            out.push(
                GeneratedStatement::new(
                    StatementKind::Alter,
                    Operation::TableSettings,
                    self.alter(&name, &format!("SET LOCALITY {locality}")),
                )
                .affecting(name.to_string()),
            );
        }
        if from.extensions.zone_config != to.extensions.zone_config {
            out.extend(self.zone_config(to));
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
enum ColumnConstraint {
    Unique,
    Check,
    ForeignKey,
}

fn pk_constraint_name(table: &TableDefinition) -> String {
    table
        .constraints
        .iter()
        .find(|c| c.is_primary_key())
        .map_or_else(|| format!("{}_pkey", table.name), |c| c.effective_name(&table.name))
}

impl DdlGenerator for PostgresGenerator {
    fn capabilities(&self) -> &'static DialectCapabilitySet {
        self.caps
    }

    fn column_type(
        &self,
        table: &TableDefinition,
        column: &ColumnDefinition,
        options: &GenerateOptions,
    ) -> Result<String> {
        if !column.auto_increment {
            return Ok(column.declared_type());
        }
        let base = self.integer_base(table, column)?;
        if self.uses_identity(column, options) {
            return Ok(base.to_string());
        }
        Ok(types::serial_for(base).unwrap_or("SERIAL").to_string())
    }

    fn identity_clause(&self, column: &ColumnDefinition, options: &GenerateOptions) -> &'static str {
        if self.uses_identity(column, options) {
            " GENERATED BY DEFAULT AS IDENTITY"
        } else {
            ""
        }
    }

    fn generated_clause(&self, generated: &GeneratedColumn) -> String {
        format!(" GENERATED ALWAYS AS ({}) STORED", generated.expression)
    }

    fn collate_clause(&self, collation: &str) -> String {
        format!(" COLLATE \"{}\"", collation.replace('"', "\"\""))
    }

    fn create_table_keyword(&self, table: &TableDefinition) -> String {
        if table.options.temporary {
            return "CREATE TEMPORARY TABLE".to_string();
        }
        if table.options.unlogged {
            if self.caps.supports(Feature::UnloggedTables) {
                return "CREATE UNLOGGED TABLE".to_string();
            }
            warn!(
                table = %table.qualified_name(),
                dialect = %self.caps.dialect,
                "Ignoring UNLOGGED"
            );
        }
        "CREATE TABLE".to_string()
    }

    fn table_suffix(&self, table: &TableDefinition) -> Result<String> {
        let object = table.qualified_name().to_string();
        let mut sql = String::new();

        if !table.inherits.is_empty() {
            self.require(Feature::Inheritance, &object, "table inheritance")?;
            let parents = table
                .inherits
                .iter()
                .map(|p| self.quote_qualified(p))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" INHERITS ({parents})"));
        }

        if let Some(partitioning) = &table.partitioning {
            self.require(Feature::Partitioning, &object, "declarative partitioning")?;
            let keys = partitioning
                .columns
                .iter()
                .map(|k| self.partition_key(table, k))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(
                " PARTITION BY {} ({keys})",
                partitioning.strategy.as_sql()
            ));
        }

        if !table.options.with.is_empty() {
            sql.push_str(&format!(" WITH ({})", Self::storage_list(&table.options.with)));
        }

        if let Some(tablespace) = &table.options.tablespace {
            if self.caps.supports(Feature::Tablespaces) {
                sql.push_str(&format!(" TABLESPACE {}", self.quote_identifier(tablespace)));
            } else {
                warn!(table = %object, dialect = %self.caps.dialect, "Ignoring TABLESPACE");
            }
        }

        if let Some(locality) = &table.extensions.locality {
            if self.caps.supports(Feature::Locality) {
                sql.push_str(&format!(" LOCALITY {locality}"));
            } else {
                warn!(table = %object, dialect = %self.caps.dialect, "Ignoring LOCALITY");
            }
        }

        if table.options.strict || table.options.without_rowid {
            warn!(table = %object, "Ignoring SQLite table options");
        }

        Ok(sql)
    }

    fn table_settings(&self, table: &TableDefinition) -> Vec<GeneratedStatement> {
        self.zone_config(table).into_iter().collect()
    }

    fn index_storage_clause(&self, index: &IndexDefinition) -> String {
        let mut sql = String::new();
        if !index.storage.is_empty() {
            sql.push_str(&format!(" WITH ({})", Self::storage_list(&index.storage)));
        }
        if let Some(tablespace) = &index.tablespace {
            if self.caps.supports(Feature::Tablespaces) {
                sql.push_str(&format!(" TABLESPACE {}", self.quote_identifier(tablespace)));
            } else {
                warn!(index = %index.qualified_name(), dialect = %self.caps.dialect, "Ignoring TABLESPACE");
            }
        }
        sql
    }

    fn generate_alter_table(
        &self,
        from: &TableDefinition,
        to: &TableDefinition,
        options: &GenerateOptions,
    ) -> Result<Vec<GeneratedStatement>> {
        let changes = TableChanges::between(from, to);
        if changes.is_empty() {
            return Ok(Vec::new());
        }
        let name = to.qualified_name();
        let mut out = Vec::new();

        for column in &changes.added {
            let mut column = (*column).clone();
            // The key is attached by the primary key statement below.
            if changes.primary_key_changed {
                column.primary_key = false;
            }
            out.push(
                GeneratedStatement::new(
                    StatementKind::Alter,
                    Operation::AddColumn,
                    self.alter(
                        &name,
                        &format!("ADD COLUMN {}", self.column_definition(to, &column, options)?),
                    ),
                )
                .destructive(requires_backfill(&column) || column.unique)
                .affecting(format!("{name}.{}", column.name)),
            );
        }

        for column in &changes.removed {
            out.push(
                GeneratedStatement::new(
                    StatementKind::Alter,
                    Operation::DropColumn,
                    self.alter(&name, &format!("DROP COLUMN {}", self.quote_identifier(&column.name))),
                )
                .destructive(true)
                .affecting(format!("{name}.{}", column.name)),
            );
        }

        for change in &changes.altered {
            out.extend(self.alter_column(from, to, change, options)?);
        }

        // Same-named constraints whose definition changed are replaced in
        // one statement.
        let replaced: Vec<String> = changes
            .added_constraints
            .iter()
            .map(|c| c.effective_name(&to.name))
            .filter(|n| {
                changes
                    .removed_constraints
                    .iter()
                    .any(|r| &r.effective_name(&from.name) == n)
            })
            .collect();

        for constraint in &changes.removed_constraints {
            let constraint_name = constraint.effective_name(&from.name);
            if replaced.contains(&constraint_name) {
                continue;
            }
            out.push(
                GeneratedStatement::new(
                    StatementKind::Alter,
                    Operation::DropConstraint,
                    self.drop_constraint_sql(&name, &constraint_name),
                )
                .affecting(format!("{name}.{constraint_name}")),
            );
        }

        if changes.primary_key_changed {
            out.push(self.primary_key_change(from, to));
        }

        for constraint in &changes.added_constraints {
            let constraint_name = constraint.effective_name(&to.name);
            let definition = self.named_constraint(to, constraint)?;
            let (operation, sql) = if replaced.contains(&constraint_name) {
                (
                    Operation::ReplaceConstraint,
                    format!(
                        "{}, ADD {definition}",
                        self.drop_constraint_sql(&name, &constraint_name)
                    ),
                )
            } else {
                (Operation::AddConstraint, self.alter(&name, &format!("ADD {definition}")))
            };
            out.push(
                GeneratedStatement::new(StatementKind::Alter, operation, sql)
                    .destructive(true)
                    .affecting(format!("{name}.{constraint_name}")),
            );
        }

        if changes.options_changed {
            out.extend(self.options_change(from, to)?);
        }
        if changes.extensions_changed {
            out.extend(self.extensions_change(from, to));
        }
        if changes.comment_changed && options.comments && self.caps.supports(Feature::Comments) {
            out.push(self.comment_on_table(&name, to.comment.as_deref()));
        }

        Ok(out)
    }

    fn generate_create_trigger(
        &self,
        trigger: &TriggerDefinition,
        _options: &GenerateOptions,
    ) -> Result<GeneratedStatement> {
        let object = format!("{}.{}", trigger.table, trigger.name);
        self.require(Feature::Triggers, &object, "triggers")?;
        let Some(function) = &trigger.function else {
            return Err(self.unsupported(&object, "a trigger without a function to execute"));
        };
        if trigger.events.is_empty() {
            return Err(self.unsupported(&object, "a trigger without events"));
        }
        if trigger.for_each_row && trigger.events.contains(&TriggerEvent::Truncate) {
            return Err(self.unsupported(&object, "a row-level TRUNCATE trigger"));
        }

        let events = trigger
            .events
            .iter()
            .map(|e| e.as_sql())
            .collect::<Vec<_>>()
            .join(" OR ");
        let mut sql = format!(
            "CREATE TRIGGER {} {} {events} ON {} FOR EACH {}",
            self.quote_identifier(&trigger.name),
            trigger.timing.as_sql(),
            self.quote_qualified(&trigger.table),
            if trigger.for_each_row { "ROW" } else { "STATEMENT" }
        );
        if let Some(condition) = &trigger.condition {
            sql.push_str(&format!(" WHEN ({condition})"));
        }
        sql.push_str(&format!(" EXECUTE FUNCTION {}()", self.quote_qualified(function)));

        Ok(
            GeneratedStatement::new(StatementKind::Create, Operation::CreateTrigger, sql)
                .affecting(object)
                .affecting(trigger.table.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{capabilities_for, Dialect};
    use crate::schema::{
        bigint, column, integer, text, timestamptz, uuid, varchar, ConstraintBuilder, IndexMethod,
        NullsOrder, PartitionStrategy, Sentinel, SortDirection, TriggerTiming,
    };
    use pretty_assertions::assert_eq;

    fn pg() -> PostgresGenerator {
        PostgresGenerator::new(capabilities_for(Dialect::Postgres))
    }

    fn sql_of(stmts: &[GeneratedStatement]) -> Vec<&str> {
        stmts.iter().map(|s| s.sql.as_str()).collect()
    }

    #[test]
    fn create_table_with_serial_and_quoting() {
        let table = TableDefinition::builder("user")
            .column(bigint("id").primary_key().auto_increment().build())
            .column(varchar("Email", 255).not_null().unique().build())
            .column(text("order").collation("C").build())
            .column(timestamptz("created_at").not_null().default_sentinel(Sentinel::CurrentTimestamp).build())
            .build();
        let stmt = pg().generate_create_table(&table, &GenerateOptions::default()).unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE TABLE \"user\" (\n    \
             id BIGSERIAL PRIMARY KEY,\n    \
             \"Email\" varchar(255) NOT NULL UNIQUE,\n    \
             \"order\" text COLLATE \"C\",\n    \
             created_at timestamptz NOT NULL DEFAULT CURRENT_TIMESTAMP\n)"
        );
        assert_eq!(stmt.operation, Operation::CreateTable);
        assert!(!stmt.destructive);
    }

    #[test]
    fn identity_columns_option() {
        let table = TableDefinition::builder("events")
            .column(integer("id").primary_key().auto_increment().build())
            .build();
        let options = GenerateOptions {
            identity_columns: true,
            ..GenerateOptions::default()
        };
        let stmt = pg().generate_create_table(&table, &options).unwrap();
        assert!(stmt
            .sql
            .contains("id integer GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY"));
    }

    #[test]
    fn auto_increment_needs_an_integer() {
        let table = TableDefinition::builder("t")
            .column(text("id").primary_key().auto_increment().build())
            .column(uuid("other").auto_increment().build())
            .build();
        let err = pg().generate_create_table(&table, &GenerateOptions::default()).unwrap_err();
        match err {
            DdlError::Multiple(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected two errors, got {other:?}"),
        }
    }

    #[test]
    fn composite_key_constraints_and_options() {
        let table = TableDefinition::builder("measurements")
            .schema("metrics")
            .column(uuid("tenant_id").primary_key().build())
            .column(timestamptz("taken_at").primary_key().build())
            .column(column("value", "double precision").generated("raw * 2").build())
            .constraint(ConstraintBuilder::check("value >= 0").named("positive").build())
            .partition_by(PartitionStrategy::Range, ["taken_at"])
            .with_option("fillfactor", "70")
            .build();
        let stmt = pg().generate_create_table(&table, &GenerateOptions::default()).unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE TABLE metrics.measurements (\n    \
             tenant_id uuid NOT NULL,\n    \
             taken_at timestamptz NOT NULL,\n    \
             value double precision GENERATED ALWAYS AS (raw * 2) STORED,\n    \
             PRIMARY KEY (tenant_id, taken_at),\n    \
             CONSTRAINT positive CHECK (value >= 0)\n\
             ) PARTITION BY RANGE (taken_at) WITH (fillfactor = 70)"
        );

        let crdb = PostgresGenerator::new(capabilities_for(Dialect::CockroachDb));
        assert!(matches!(
            crdb.generate_create_table(&table, &GenerateOptions::default()),
            Err(DdlError::UnsupportedConstruct { ref construct, .. }) if construct == "declarative partitioning"
        ));
    }

    #[test]
    fn cockroach_locality_and_zone() {
        let table = TableDefinition::builder("accounts")
            .column(uuid("id").primary_key().default_sentinel(Sentinel::GenRandomUuid).build())
            .locality("REGIONAL BY ROW")
            .zone_config("num_replicas", "5")
            .build();
        let crdb = PostgresGenerator::new(capabilities_for(Dialect::CockroachDb));
        let options = GenerateOptions::default();
        let stmt = crdb.generate_create_table(&table, &options).unwrap();
        assert!(stmt.sql.ends_with(") LOCALITY REGIONAL BY ROW"));
        assert_eq!(
            sql_of(&crdb.generate_table_extras(&table, &options)),
            vec!["ALTER TABLE accounts CONFIGURE ZONE USING num_replicas = 5"]
        );
        assert!(!pg().generate_create_table(&table, &options).unwrap().sql.contains("LOCALITY"));
        assert!(pg().generate_table_extras(&table, &options).is_empty());
    }

    #[test]
    fn index_rendering() {
        let index = IndexDefinition::builder("idx_docs_body", "docs")
            .method(IndexMethod::Gin)
            .column("body")
            .storage("fastupdate", "off")
            .build();
        let stmt = pg().generate_create_index(&index, &GenerateOptions::default()).unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE INDEX idx_docs_body ON docs USING gin (body) WITH (fastupdate = off)"
        );

        let index = IndexDefinition::builder("idx_orders_recent", "orders")
            .column_ordered("created_at", SortDirection::Desc, Some(NullsOrder::Last))
            .include("total")
            .predicate("deleted_at IS NULL")
            .unique()
            .build();
        let options = GenerateOptions {
            concurrently: true,
            if_not_exists: true,
            ..GenerateOptions::default()
        };
        let stmt = pg().generate_create_index(&index, &options).unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE UNIQUE INDEX CONCURRENTLY IF NOT EXISTS idx_orders_recent ON orders \
             (created_at DESC NULLS LAST) INCLUDE (total) WHERE deleted_at IS NULL"
        );
        assert!(stmt.destructive);
    }

    #[test]
    fn adding_a_nullable_column_is_safe() {
        let from = TableDefinition::builder("t")
            .column(integer("id").primary_key().build())
            .build();
        let to = TableDefinition::builder("t")
            .column(integer("id").primary_key().build())
            .column(text("note").build())
            .column(integer("rank").not_null().build())
            .build();
        let stmts = pg().generate_alter_table(&from, &to, &GenerateOptions::default()).unwrap();
        assert_eq!(
            sql_of(&stmts),
            vec![
                "ALTER TABLE t ADD COLUMN note text",
                "ALTER TABLE t ADD COLUMN rank integer NOT NULL",
            ]
        );
        assert!(!stmts[0].destructive);
        assert!(stmts[1].destructive);
        assert_eq!(stmts[0].affected, vec!["t.note".to_string()]);
    }

    #[test]
    fn column_alterations_in_order() {
        let from = TableDefinition::builder("orders")
            .column(integer("qty").build())
            .column(varchar("code", 10).not_null().build())
            .column(text("status").default_str("new").build())
            .column(text("old").build())
            .build();
        let to = TableDefinition::builder("orders")
            .column(bigint("qty").not_null().build())
            .column(varchar("code", 5).build())
            .column(text("status").unique().build())
            .build();
        let stmts = pg().generate_alter_table(&from, &to, &GenerateOptions::default()).unwrap();
        assert_eq!(
            sql_of(&stmts),
            vec![
                "ALTER TABLE orders DROP COLUMN old",
                "ALTER TABLE orders ALTER COLUMN qty TYPE bigint",
                "ALTER TABLE orders ALTER COLUMN qty SET NOT NULL",
                "ALTER TABLE orders ALTER COLUMN code TYPE varchar(5) USING code::varchar(5)",
                "ALTER TABLE orders ALTER COLUMN code DROP NOT NULL",
                "ALTER TABLE orders ALTER COLUMN status DROP DEFAULT",
                "ALTER TABLE orders ADD CONSTRAINT orders_status_key UNIQUE (status)",
            ]
        );
        let destructive: Vec<bool> = stmts.iter().map(|s| s.destructive).collect();
        assert_eq!(destructive, vec![true, false, true, true, false, false, true]);
    }

    #[test]
    fn padded_char_to_text_is_destructive() {
        let from = TableDefinition::builder("codes")
            .column(column("c", "char(3)").build())
            .build();
        let to = TableDefinition::builder("codes").column(text("c").build()).build();
        let stmts = pg().generate_alter_table(&from, &to, &GenerateOptions::default()).unwrap();
        assert_eq!(
            sql_of(&stmts),
            vec!["ALTER TABLE codes ALTER COLUMN c TYPE text USING c::text"]
        );
        assert!(stmts[0].destructive);

        let wider = TableDefinition::builder("codes")
            .column(column("c", "char(5)").build())
            .build();
        let stmts = pg().generate_alter_table(&from, &wider, &GenerateOptions::default()).unwrap();
        assert_eq!(sql_of(&stmts), vec!["ALTER TABLE codes ALTER COLUMN c TYPE char(5)"]);
        assert!(!stmts[0].destructive);
    }

    #[test]
    fn generated_expression_changes() {
        let from = TableDefinition::builder("t")
            .column(integer("total").generated("a + b").build())
            .build();
        let plain = TableDefinition::builder("t").column(integer("total").build()).build();
        let stmts = pg().generate_alter_table(&from, &plain, &GenerateOptions::default()).unwrap();
        assert_eq!(sql_of(&stmts), vec!["ALTER TABLE t ALTER COLUMN total DROP EXPRESSION"]);

        let changed = TableDefinition::builder("t")
            .column(integer("total").generated("a * b").build())
            .build();
        let stmts = pg().generate_alter_table(&from, &changed, &GenerateOptions::default()).unwrap();
        assert_eq!(
            sql_of(&stmts),
            vec![
                "ALTER TABLE t DROP COLUMN total",
                "ALTER TABLE t ADD COLUMN total integer GENERATED ALWAYS AS (a * b) STORED",
            ]
        );
    }

    #[test]
    fn constraint_and_key_changes() {
        let from = TableDefinition::builder("line_items")
            .column(integer("order_id").primary_key().build())
            .column(integer("line").not_null().build())
            .column(integer("qty").build())
            .constraint(ConstraintBuilder::check("qty > 0").named("qty_positive").build())
            .constraint(ConstraintBuilder::unique(["qty"]).build())
            .build();
        let to = TableDefinition::builder("line_items")
            .column(integer("order_id").not_null().build())
            .column(integer("line").not_null().build())
            .column(integer("qty").build())
            .constraint(ConstraintBuilder::primary_key(["order_id", "line"]).build())
            .constraint(ConstraintBuilder::check("qty >= 1").named("qty_positive").build())
            .build();
        let stmts = pg().generate_alter_table(&from, &to, &GenerateOptions::default()).unwrap();
        assert_eq!(
            sql_of(&stmts),
            vec![
                "ALTER TABLE line_items DROP CONSTRAINT IF EXISTS line_items_qty_key",
                "ALTER TABLE line_items DROP CONSTRAINT IF EXISTS line_items_pkey, \
                 ADD CONSTRAINT line_items_pkey PRIMARY KEY (order_id, line)",
                "ALTER TABLE line_items DROP CONSTRAINT IF EXISTS qty_positive, \
                 ADD CONSTRAINT qty_positive CHECK (qty >= 1)",
            ]
        );
        let ops: Vec<Operation> = stmts.iter().map(|s| s.operation).collect();
        assert_eq!(
            ops,
            vec![
                Operation::DropConstraint,
                Operation::ReplaceConstraint,
                Operation::ReplaceConstraint,
            ]
        );
    }

    #[test]
    fn structural_changes_that_cannot_be_altered() {
        let from = TableDefinition::builder("t").column(integer("id").build()).build();
        let to = TableDefinition::builder("t")
            .column(integer("id").build())
            .partition_by(PartitionStrategy::Hash, ["id"])
            .build();
        assert!(matches!(
            pg().generate_alter_table(&from, &to, &GenerateOptions::default()),
            Err(DdlError::UnsupportedConstruct { .. })
        ));
    }

    #[test]
    fn triggers_execute_a_function() {
        let trigger = TriggerDefinition {
            name: "touch".into(),
            table: QualifiedName::from("documents"),
            timing: TriggerTiming::Before,
            events: vec![TriggerEvent::Insert, TriggerEvent::Update],
            for_each_row: true,
            condition: None,
            function: Some(QualifiedName::from("touch_updated_at")),
            body: Vec::new(),
        };
        let stmt = pg()
            .generate_create_trigger(&trigger, &GenerateOptions::default())
            .unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE TRIGGER touch BEFORE INSERT OR UPDATE ON documents FOR EACH ROW \
             EXECUTE FUNCTION touch_updated_at()"
        );

        let nile = PostgresGenerator::new(capabilities_for(Dialect::Nile));
        assert!(nile
            .generate_create_trigger(&trigger, &GenerateOptions::default())
            .is_err());
    }
}
