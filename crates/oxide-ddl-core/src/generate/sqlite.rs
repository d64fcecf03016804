//! SQLite family generator (SQLite, Cloudflare D1).
//!
//! SQLite's ALTER TABLE covers little beyond ADD COLUMN and RENAME, so most
//! changes go through a full table recreation: build a shadow table with
//! the target shape, copy the common columns, drop the original and rename
//! the shadow into place.

use tracing::{info, warn};

use crate::capability::{types, DialectCapabilitySet, Feature};
use crate::error::{DdlError, Result};
use crate::schema::{
    ColumnDefinition, DefaultValue, IndexColumn, IndexDefinition, IndexTarget, Literal,
    SortDirection, TableDefinition, TriggerDefinition, TriggerEvent, TypeAffinity,
};

use super::changes::{ColumnChange, TableChanges};
use super::{
    is_sql_expression, DdlGenerator, GenerateOptions, GeneratedStatement, Operation, StatementKind,
};

/// Generator for the SQLite family.
#[derive(Debug, Clone, Copy)]
pub struct SqliteGenerator {
    caps: &'static DialectCapabilitySet,
}

impl SqliteGenerator {
    /// Creates a generator bound to a capability set.
    #[must_use]
    pub const fn new(caps: &'static DialectCapabilitySet) -> Self {
        Self { caps }
    }

    /// Types SQLite has no storage class for are kept as JSON or text.
    fn maps_to_text(column: &ColumnDefinition, canonical: &str) -> bool {
        column.is_array()
            || types::is_uuid(canonical)
            || types::is_json(canonical)
            || types::is_range(canonical)
            || types::is_network(canonical)
            || types::is_geometry(canonical)
    }

    /// STRICT tables accept only INTEGER, REAL, TEXT, BLOB and ANY.
    fn strict_type(column: &ColumnDefinition, canonical: &str) -> &'static str {
        if Self::maps_to_text(column, canonical) {
            return "TEXT";
        }
        if canonical == "boolean" {
            return "INTEGER";
        }
        if matches!(
            canonical,
            "date" | "time" | "timetz" | "timestamp" | "timestamptz" | "datetime" | "interval"
        ) {
            return "TEXT";
        }
        match column.affinity() {
            TypeAffinity::Integer => "INTEGER",
            TypeAffinity::Text => "TEXT",
            TypeAffinity::Blob => "BLOB",
            TypeAffinity::Real => "REAL",
            TypeAffinity::Numeric => "ANY",
        }
    }

    fn recreate_table(
        &self,
        from: &TableDefinition,
        to: &TableDefinition,
        changes: &TableChanges<'_>,
        options: &GenerateOptions,
    ) -> Result<GeneratedStatement> {
        let name = to.qualified_name();
        let quoted = self.quote_qualified(&name);

        let mut shadow = to.clone();
        shadow.name = format!("_{}_new", to.name);
        shadow.indexes.clear();
        let shadow_name = self.quote_qualified(&shadow.qualified_name());
        let create_options = GenerateOptions {
            if_not_exists: false,
            ..options.clone()
        };
        let create = self.generate_create_table(&shadow, &create_options)?;

        let common: Vec<String> = to
            .columns
            .iter()
            .filter(|c| !c.is_generated())
            .filter(|c| from.column(&c.name).is_some_and(|old| !old.is_generated()))
            .map(|c| self.quote_identifier(&c.name))
            .collect();

        let transactional = self.caps.supports(Feature::TransactionalDdl);
        let mut parts = vec!["PRAGMA defer_foreign_keys = ON".to_string()];
        if transactional {
            parts.push("BEGIN".to_string());
        }
        parts.push(create.sql);
        if !common.is_empty() {
            let columns = common.join(", ");
            parts.push(format!(
                "INSERT INTO {shadow_name} ({columns}) SELECT {columns} FROM {quoted}"
            ));
        }
        parts.push(format!("DROP TABLE {quoted}"));
        parts.push(format!(
            "ALTER TABLE {shadow_name} RENAME TO {}",
            self.quote_identifier(&to.name)
        ));
        for index in &to.indexes {
            parts.push(self.generate_create_index(index, options)?.sql);
        }
        if transactional {
            parts.push("COMMIT".to_string());
        }

        info!(
            table = %name,
            dialect = %self.caps.dialect,
            copied = common.len(),
            "Recreating table"
        );

        let mut stmt = GeneratedStatement::new(StatementKind::Alter, Operation::RecreateTable, parts.join(";\n"))
            .destructive(changes.is_destructive())
            .affecting(name.to_string());
        for column in &changes.removed {
            stmt = stmt.affecting(format!("{name}.{}", column.name));
        }
        for column in &changes.added {
            stmt = stmt.affecting(format!("{name}.{}", column.name));
        }
        for change in &changes.altered {
            stmt = stmt.affecting(format!("{name}.{}", change.to.name));
        }
        Ok(stmt)
    }
}

/// Whether `ALTER TABLE ... ADD COLUMN` accepts the column as is.
///
/// SQLite refuses PRIMARY KEY and UNIQUE columns, stored generated columns,
/// non-constant defaults, NOT NULL without a non-null default, and foreign
/// keys with a non-null default.
fn safe_to_add(column: &ColumnDefinition) -> bool {
    if column.primary_key || column.unique || column.auto_increment {
        return false;
    }
    if column.generated.as_ref().is_some_and(|g| g.stored) {
        return false;
    }
    let non_null_default = match &column.default {
        None | Some(DefaultValue::Literal(Literal::Null)) => false,
        Some(DefaultValue::Literal(Literal::String(s))) if is_sql_expression(s) => return false,
        Some(DefaultValue::Literal(_)) => true,
        Some(DefaultValue::Raw(_) | DefaultValue::Sentinel(_)) => return false,
    };
    if column.references.is_some() && non_null_default {
        return false;
    }
    column.nullable || non_null_default || column.is_generated()
}

impl DdlGenerator for SqliteGenerator {
    fn capabilities(&self) -> &'static DialectCapabilitySet {
        self.caps
    }

    fn column_type(
        &self,
        table: &TableDefinition,
        column: &ColumnDefinition,
        _options: &GenerateOptions,
    ) -> Result<String> {
        let canonical = types::normalized(&column.data_type);
        if column.auto_increment {
            let inline_key = column.primary_key && !table.has_table_level_primary_key();
            if !inline_key || !types::is_integer(&canonical) {
                return Err(DdlError::InvalidAutoIncrement {
                    table: table.qualified_name().to_string(),
                    column: column.name.clone(),
                    data_type: column.data_type.clone(),
                    dialect: self.caps.dialect.to_string(),
                });
            }
            return Ok("INTEGER".to_string());
        }
        if table.options.strict {
            return Ok(Self::strict_type(column, &canonical).to_string());
        }
        if Self::maps_to_text(column, &canonical) {
            return Ok("TEXT".to_string());
        }
        if types::is_serial(&canonical) {
            return Ok("INTEGER".to_string());
        }
        Ok(column.data_type.clone())
    }

    fn autoincrement_keyword(&self) -> &'static str {
        " AUTOINCREMENT"
    }

    fn table_suffix(&self, table: &TableDefinition) -> Result<String> {
        let object = table.qualified_name().to_string();
        if table.partitioning.is_some() {
            return Err(self.unsupported(&object, "declarative partitioning"));
        }
        if !table.inherits.is_empty() {
            return Err(self.unsupported(&object, "table inheritance"));
        }
        if table.options.unlogged
            || table.options.tablespace.is_some()
            || !table.options.with.is_empty()
            || !table.extensions.is_empty() && table.extensions.tenant.is_none()
        {
            warn!(table = %object, dialect = %self.caps.dialect, "Ignoring storage options");
        }

        let mut options = Vec::new();
        if table.options.strict {
            options.push("STRICT");
        }
        if table.options.without_rowid {
            options.push("WITHOUT ROWID");
        }
        if options.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" {}", options.join(", ")))
        }
    }

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
        if key.nulls.is_some() {
            warn!(key = %sql, "Ignoring NULLS ordering on SQLite");
        }
        sql
    }

    fn index_target(&self, index: &IndexDefinition) -> String {
        let name = match &index.table.schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(&index.name)
            ),
            None => self.quote_identifier(&index.name),
        };
        format!("{name} ON {}", self.quote_identifier(&index.table.name))
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
        if self.requires_recreation(from, to) {
            return Ok(vec![self.recreate_table(from, to, &changes, options)?]);
        }

        let name = to.qualified_name();
        let quoted = self.quote_qualified(&name);
        let mut out = Vec::new();
        for column in &changes.added {
            out.push(
                GeneratedStatement::new(
                    StatementKind::Alter,
                    Operation::AddColumn,
                    format!(
                        "ALTER TABLE {quoted} ADD COLUMN {}",
                        self.column_definition(to, column, options)?
                    ),
                )
                .affecting(format!("{name}.{}", column.name)),
            );
        }
        for column in &changes.removed {
            out.push(
                GeneratedStatement::new(
                    StatementKind::Alter,
                    Operation::DropColumn,
                    format!(
                        "ALTER TABLE {quoted} DROP COLUMN {}",
                        self.quote_identifier(&column.name)
                    ),
                )
                .destructive(true)
                .affecting(format!("{name}.{}", column.name)),
            );
        }
        Ok(out)
    }

    fn requires_recreation(&self, from: &TableDefinition, to: &TableDefinition) -> bool {
        let changes = TableChanges::between(from, to);
        (!changes.removed.is_empty() && !self.caps.supports(Feature::DropColumn))
            || changes.altered.iter().any(ColumnChange::is_structural)
            || !changes.added_constraints.is_empty()
            || !changes.removed_constraints.is_empty()
            || changes.primary_key_changed
            || changes.options_changed
            || changes.added.iter().any(|c| !safe_to_add(c))
    }

    fn generate_create_trigger(
        &self,
        trigger: &TriggerDefinition,
        options: &GenerateOptions,
    ) -> Result<GeneratedStatement> {
        let object = format!("{}.{}", trigger.table, trigger.name);
        self.require(Feature::Triggers, &object, "triggers")?;
        let [event] = trigger.events.as_slice() else {
            return Err(self.unsupported(&object, "a trigger on several events"));
        };
        if *event == TriggerEvent::Truncate {
            return Err(self.unsupported(&object, "TRUNCATE triggers"));
        }
        if !trigger.for_each_row {
            return Err(self.unsupported(&object, "statement-level triggers"));
        }
        if trigger.body.is_empty() {
            return Err(self.unsupported(&object, "a trigger without a body"));
        }

        let mut sql = String::from("CREATE TRIGGER ");
        if options.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&format!(
            "{} {} {} ON {} FOR EACH ROW",
            self.quote_identifier(&trigger.name),
            trigger.timing.as_sql(),
            event.as_sql(),
            self.quote_qualified(&trigger.table)
        ));
        if let Some(condition) = &trigger.condition {
            sql.push_str(&format!(" WHEN {condition}"));
        }
        sql.push_str("\nBEGIN\n");
        for statement in &trigger.body {
            sql.push_str(&format!("    {};\n", statement.trim_end_matches(';')));
        }
        sql.push_str("END");

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
        bigint, boolean, column, integer, jsonb, numeric, text, uuid, ConstraintBuilder, IndexMethod,
        NullsOrder, PartitionStrategy, QualifiedName, Sentinel, TriggerTiming,
    };
    use pretty_assertions::assert_eq;

    fn sqlite() -> SqliteGenerator {
        SqliteGenerator::new(capabilities_for(Dialect::Sqlite))
    }

    fn d1() -> SqliteGenerator {
        SqliteGenerator::new(capabilities_for(Dialect::D1))
    }

    #[test]
    fn create_table_with_autoincrement() {
        let table = TableDefinition::builder("posts")
            .column(integer("id").primary_key().auto_increment().build())
            .column(text("title").not_null().build())
            .column(boolean("published").not_null().default_bool(false).build())
            .column(text("tags").array(1).build())
            .column(uuid("public_id").not_null().unique().build())
            .column(numeric("price", 10, 2).build())
            .build();
        let stmt = sqlite().generate_create_table(&table, &GenerateOptions::default()).unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE TABLE posts (\n    \
             id INTEGER PRIMARY KEY AUTOINCREMENT,\n    \
             title text NOT NULL,\n    \
             published boolean NOT NULL DEFAULT 0,\n    \
             tags TEXT,\n    \
             public_id TEXT NOT NULL UNIQUE,\n    \
             price numeric(10, 2)\n)"
        );
    }

    #[test]
    fn autoincrement_requires_integer_primary_key() {
        let not_key = TableDefinition::builder("t")
            .column(integer("n").auto_increment().build())
            .build();
        assert!(matches!(
            sqlite().generate_create_table(&not_key, &GenerateOptions::default()),
            Err(DdlError::InvalidAutoIncrement { ref column, .. }) if column == "n"
        ));
        let composite = TableDefinition::builder("t")
            .column(integer("a").primary_key().auto_increment().build())
            .column(integer("b").primary_key().build())
            .build();
        assert!(sqlite()
            .generate_create_table(&composite, &GenerateOptions::default())
            .is_err());
        let serial = TableDefinition::builder("t")
            .column(column("id", "serial").primary_key().build())
            .build();
        assert_eq!(
            sqlite()
                .generate_create_table(&serial, &GenerateOptions::default())
                .unwrap()
                .sql,
            "CREATE TABLE t (\n    id INTEGER PRIMARY KEY\n)"
        );
    }

    #[test]
    fn strict_and_without_rowid() {
        let table = TableDefinition::builder("kv")
            .column(text("key").primary_key().build())
            .column(jsonb("value").build())
            .column(bigint("version").not_null().default_int(1).build())
            .column(column("score", "double precision").build())
            .column(boolean("active").build())
            .options(crate::schema::TableOptions {
                strict: true,
                without_rowid: true,
                ..Default::default()
            })
            .build();
        let stmt = sqlite().generate_create_table(&table, &GenerateOptions::default()).unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE TABLE kv (\n    \
             \"key\" TEXT PRIMARY KEY,\n    \
             value TEXT,\n    \
             version INTEGER NOT NULL DEFAULT 1,\n    \
             score REAL,\n    \
             active INTEGER\n\
             ) STRICT, WITHOUT ROWID"
        );
    }

    #[test]
    fn refuses_what_sqlite_cannot_express() {
        let partitioned = TableDefinition::builder("t")
            .column(integer("id").build())
            .partition_by(PartitionStrategy::List, ["id"])
            .build();
        assert!(matches!(
            sqlite().generate_create_table(&partitioned, &GenerateOptions::default()),
            Err(DdlError::UnsupportedConstruct { ref construct, .. }) if construct == "declarative partitioning"
        ));

        let gin = IndexDefinition::builder("idx", "t")
            .method(IndexMethod::Gin)
            .column("id")
            .build();
        assert!(sqlite().generate_create_index(&gin, &GenerateOptions::default()).is_err());
        let covering = IndexDefinition::builder("idx", "t")
            .column("id")
            .include("name")
            .build();
        assert!(sqlite()
            .generate_create_index(&covering, &GenerateOptions::default())
            .is_err());
    }

    #[test]
    fn indexes_drop_nulls_ordering() {
        let index = IndexDefinition::builder("idx_events_at", "main.events")
            .column_ordered("at", SortDirection::Desc, Some(NullsOrder::First))
            .predicate("at IS NOT NULL")
            .build();
        let stmt = sqlite().generate_create_index(&index, &GenerateOptions::default()).unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE INDEX main.idx_events_at ON events (at DESC) WHERE at IS NOT NULL"
        );
    }

    #[test]
    fn nullable_addition_stays_on_add_column() {
        let from = TableDefinition::builder("t").column(integer("a").build()).build();
        let to = TableDefinition::builder("t")
            .column(integer("a").build())
            .column(text("b").build())
            .column(integer("c").not_null().default_int(0).build())
            .build();
        assert!(!sqlite().requires_recreation(&from, &to));
        let stmts = sqlite().generate_alter_table(&from, &to, &GenerateOptions::default()).unwrap();
        let sql: Vec<&str> = stmts.iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE t ADD COLUMN b text",
                "ALTER TABLE t ADD COLUMN c integer NOT NULL DEFAULT 0",
            ]
        );
        assert!(stmts.iter().all(|s| !s.destructive));
    }

    #[test]
    fn unsafe_additions_force_recreation() {
        let from = TableDefinition::builder("t").column(integer("a").build()).build();
        for added in [
            integer("b").not_null().build(),
            integer("b").unique().build(),
            column("b", "timestamp").default_sentinel(Sentinel::CurrentTimestamp).build(),
            integer("b").references("other", "id").default_int(1).build(),
            integer("b").generated("a * 2").build(),
        ] {
            let to = TableDefinition::builder("t")
                .column(integer("a").build())
                .column(added.clone())
                .build();
            assert!(sqlite().requires_recreation(&from, &to), "{added:?}");
        }
        let virtual_column = TableDefinition::builder("t")
            .column(integer("a").build())
            .column(integer("b").generated_virtual("a * 2").build())
            .build();
        assert!(!sqlite().requires_recreation(&from, &virtual_column));
    }

    #[test]
    fn dropping_a_column_recreates_the_table() {
        let from = TableDefinition::builder("t")
            .column(integer("a").build())
            .column(text("b").build())
            .index(IndexDefinition::builder("idx_t_a", "t").column("a").build())
            .build();
        let to = TableDefinition::builder("t")
            .column(integer("a").build())
            .index(IndexDefinition::builder("idx_t_a", "t").column("a").build())
            .build();
        let stmts = sqlite().generate_alter_table(&from, &to, &GenerateOptions::default()).unwrap();
        assert_eq!(stmts.len(), 1);
        let stmt = &stmts[0];
        assert_eq!(stmt.operation, Operation::RecreateTable);
        assert!(stmt.destructive);
        assert_eq!(stmt.affected, vec!["t".to_string(), "t.b".to_string()]);
        assert_eq!(
            stmt.sql,
            "PRAGMA defer_foreign_keys = ON;\n\
             BEGIN;\n\
             CREATE TABLE _t_new (\n    a integer\n);\n\
             INSERT INTO _t_new (a) SELECT a FROM t;\n\
             DROP TABLE t;\n\
             ALTER TABLE _t_new RENAME TO t;\n\
             CREATE INDEX idx_t_a ON t (a);\n\
             COMMIT"
        );

        let d1 = d1().generate_alter_table(&from, &to, &GenerateOptions::default()).unwrap();
        assert!(!d1[0].sql.contains("BEGIN"));
        assert!(!d1[0].sql.contains("COMMIT"));
    }

    #[test]
    fn recreation_skips_generated_columns_in_the_copy() {
        let from = TableDefinition::builder("t")
            .column(integer("a").build())
            .column(integer("double_a").generated("a * 2").build())
            .build();
        let to = TableDefinition::builder("t")
            .column(bigint("a").build())
            .column(integer("double_a").generated("a * 2").build())
            .build();
        let stmts = sqlite().generate_alter_table(&from, &to, &GenerateOptions::default()).unwrap();
        assert!(stmts[0].sql.contains("INSERT INTO _t_new (a) SELECT a FROM t"));
        assert!(!stmts[0].destructive);
    }

    #[test]
    fn constraint_changes_recreate() {
        let from = TableDefinition::builder("t").column(integer("a").build()).build();
        let to = TableDefinition::builder("t")
            .column(integer("a").build())
            .constraint(ConstraintBuilder::check("a > 0").build())
            .build();
        assert!(sqlite().requires_recreation(&from, &to));
    }

    #[test]
    fn triggers_have_a_single_event_and_a_body() {
        let mut trigger = TriggerDefinition {
            name: "audit_insert".into(),
            table: QualifiedName::from("orders"),
            timing: TriggerTiming::After,
            events: vec![TriggerEvent::Insert],
            for_each_row: true,
            condition: Some("NEW.total > 100".into()),
            function: None,
            body: vec!["INSERT INTO audit (order_id) VALUES (NEW.id);".into()],
        };
        let stmt = sqlite()
            .generate_create_trigger(&trigger, &GenerateOptions::default())
            .unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE TRIGGER audit_insert AFTER INSERT ON orders FOR EACH ROW WHEN NEW.total > 100\n\
             BEGIN\n    INSERT INTO audit (order_id) VALUES (NEW.id);\nEND"
        );

        trigger.events.push(TriggerEvent::Update);
        assert!(sqlite()
            .generate_create_trigger(&trigger, &GenerateOptions::default())
            .is_err());
    }
}
