//! Platform-specific content rules for CockroachDB and Nile.

use std::collections::HashMap;

use crate::capability::types;
use crate::schema::{
    ColumnDefinition, ConstraintKind, DefaultValue, QualifiedName, TableDefinition,
};

use super::{Checks, FeatureCode, IssueCategory, TenantClass};

/// Schema and table name.
type TableKey = (String, String);

/// Key for `name` with an absent schema read as `default_schema`.
fn table_key(name: &QualifiedName, default_schema: &str) -> TableKey {
    (
        name.schema.as_deref().unwrap_or(default_schema).to_string(),
        name.name.clone(),
    )
}

/// Whether a column takes its values from a sequence.
fn is_sequence_backed(column: &ColumnDefinition) -> bool {
    if column.auto_increment || types::is_serial(&types::normalized(&column.data_type)) {
        return true;
    }
    matches!(&column.default, Some(DefaultValue::Raw(raw)) if raw.to_ascii_lowercase().contains("nextval("))
}

impl Checks<'_> {
    pub(super) fn cockroachdb(&mut self) {
        let schema = self.schema;

        for table in &schema.tables {
            let location = table.qualified_name().to_string();
            for column in table.columns.iter().filter(|c| is_sequence_backed(c)) {
                self.warning(
                    IssueCategory::DataType,
                    FeatureCode::CrdbSerial,
                    &format!("{location}.{}", column.name),
                    "SERIAL on CockroachDB uses unique_rowid(): values are unique but neither \
                     sequential nor gap-free; prefer UUID keys with gen_random_uuid()"
                        .to_string(),
                );
            }
            if let Some(locality) = &table.extensions.locality {
                self.info(
                    IssueCategory::Feature,
                    FeatureCode::CrdbLocality,
                    &location,
                    format!("Table locality {locality} requires a multi-region database"),
                );
            }
            if !table.extensions.zone_config.is_empty() {
                self.info(
                    IssueCategory::Feature,
                    FeatureCode::CrdbZoneConfig,
                    &location,
                    "Zone configuration is applied with ALTER TABLE ... CONFIGURE ZONE".to_string(),
                );
            }
        }

        for trigger in &schema.triggers {
            self.warning(
                IssueCategory::Trigger,
                FeatureCode::CrdbTriggerPreview,
                &format!("{}.{}", trigger.table, trigger.name),
                "Triggers are a preview feature on CockroachDB; check version support".to_string(),
            );
        }
    }

    pub(super) fn nile(&mut self) {
        let schema = self.schema;
        let tenant_column = self.policy.tenant_column().to_string();
        let default_schema = self.caps.default_schema;
        let classes: HashMap<TableKey, TenantClass> = schema
            .tables
            .iter()
            .map(|t| (table_key(&t.qualified_name(), default_schema), self.policy.classify(t)))
            .collect();

        for table in &schema.tables {
            let location = table.qualified_name().to_string();
            let key = table_key(&table.qualified_name(), default_schema);
            match classes.get(&key).copied() {
                Some(TenantClass::TenantScoped) => {
                    self.tenant_scoped(table, &location, &tenant_column);
                }
                Some(TenantClass::Shared) => self.shared(table, &location, &classes),
                Some(TenantClass::Unclassified) | None => self.warning(
                    IssueCategory::Feature,
                    FeatureCode::NileUnclassifiedTable,
                    &location,
                    format!(
                        "Table has no {tenant_column} column and is not declared shared; \
                         it is visible to every tenant"
                    ),
                ),
            }
        }

        for sequence in &schema.sequences {
            let location = sequence.name.to_string();
            // An unqualified owner lives in the sequence's schema.
            let class = sequence.owning_table().and_then(|owner| {
                let owner = QualifiedName::from(owner);
                let schema_name = owner
                    .schema
                    .as_deref()
                    .or(sequence.name.schema.as_deref())
                    .unwrap_or(default_schema);
                classes
                    .get(&(schema_name.to_string(), owner.name))
                    .copied()
            });
            if class == Some(TenantClass::TenantScoped) {
                self.error(
                    IssueCategory::Feature,
                    FeatureCode::NileTenantSequence,
                    &location,
                    "Sequences cannot back tenant-scoped tables on Nile".to_string(),
                    Some("Use UUID keys generated with gen_random_uuid()"),
                );
            } else {
                self.info(
                    IssueCategory::Feature,
                    FeatureCode::NileSharedSequence,
                    &location,
                    "Sequence is shared by all tenants".to_string(),
                );
            }
        }
    }

    fn tenant_scoped(&mut self, table: &TableDefinition, location: &str, tenant_column: &str) {
        match table.column(tenant_column) {
            None => self.error(
                IssueCategory::Constraint,
                FeatureCode::NileMissingTenantId,
                location,
                format!("Tenant-scoped table has no {tenant_column} column"),
                Some("Add a NOT NULL uuid tenant column referencing tenants(id)"),
            ),
            Some(column) => {
                if !types::is_uuid(&types::normalized(&column.data_type)) {
                    self.error(
                        IssueCategory::DataType,
                        FeatureCode::NileTenantIdType,
                        &format!("{location}.{tenant_column}"),
                        format!(
                            "{tenant_column} must be uuid, found '{}'",
                            column.data_type
                        ),
                        Some("Declare the tenant column as uuid"),
                    );
                }
                if !table.primary_key_columns().contains(&tenant_column) {
                    self.error(
                        IssueCategory::Constraint,
                        FeatureCode::NileTenantPrimaryKey,
                        location,
                        format!("{tenant_column} must be part of the primary key"),
                        Some("Use a composite PRIMARY KEY (tenant_id, id)"),
                    );
                }
            }
        }

        for column in table.columns.iter().filter(|c| is_sequence_backed(c)) {
            self.error(
                IssueCategory::DataType,
                FeatureCode::NileTenantSequence,
                &format!("{location}.{}", column.name),
                "Sequence-backed columns are not allowed in tenant-scoped tables".to_string(),
                Some("Use a uuid column with gen_random_uuid()"),
            );
        }
    }

    fn shared(
        &mut self,
        table: &TableDefinition,
        location: &str,
        classes: &HashMap<TableKey, TenantClass>,
    ) {
        for column in table.columns.iter().filter(|c| is_sequence_backed(c)) {
            self.info(
                IssueCategory::DataType,
                FeatureCode::NileSharedSequence,
                &format!("{location}.{}", column.name),
                "Sequence in a shared table is shared by all tenants".to_string(),
            );
        }

        let mut targets: Vec<&QualifiedName> = table
            .columns
            .iter()
            .filter_map(|c| c.references.as_ref().map(|r| &r.table))
            .collect();
        targets.extend(table.constraints.iter().filter_map(|c| match &c.kind {
            ConstraintKind::ForeignKey {
                references_table, ..
            } => Some(references_table),
            _ => None,
        }));

        for target in targets {
            let key = table_key(target, self.caps.default_schema);
            if classes.get(&key) == Some(&TenantClass::TenantScoped) {
                self.error(
                    IssueCategory::Constraint,
                    FeatureCode::NileSharedReferencesTenant,
                    location,
                    format!("Shared table references tenant-scoped table '{target}'"),
                    Some("Reference shared tables only, or make this table tenant-scoped"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::capability::{capabilities_for, Dialect};
    use crate::schema::{
        bigint, column, integer, text, uuid, ConstraintBuilder, QualifiedName, SchemaModel,
        SequenceDefinition, TableDefinition, TenantMarker,
    };
    use crate::validate::{
        validate, DefaultTenantPolicy, FeatureCode, Severity, Validator,
    };

    fn todos() -> TableDefinition {
        TableDefinition::builder("todos")
            .column(uuid("tenant_id").not_null().references("tenants", "id").build())
            .column(uuid("id").not_null().build())
            .column(text("title").build())
            .constraint(ConstraintBuilder::primary_key(["tenant_id", "id"]).build())
            .build()
    }

    #[test]
    fn well_formed_tenant_table_is_clean() {
        let result = validate(
            &SchemaModel::new().with_table(todos()),
            capabilities_for(Dialect::Nile),
        )
        .unwrap();
        assert!(result.valid);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn tenant_table_rules() {
        let table = TableDefinition::builder("notes")
            .column(text("tenant_id").not_null().build())
            .column(column("id", "serial").primary_key().build())
            .build();
        let result = validate(
            &SchemaModel::new().with_table(table),
            capabilities_for(Dialect::Nile),
        )
        .unwrap();
        let codes: Vec<FeatureCode> = result.errors().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                FeatureCode::NileTenantIdType,
                FeatureCode::NileTenantPrimaryKey,
                FeatureCode::NileTenantSequence,
            ]
        );
    }

    #[test]
    fn marked_table_without_tenant_column() {
        let table = TableDefinition::builder("notes")
            .column(uuid("id").primary_key().build())
            .tenant(TenantMarker::TenantScoped)
            .build();
        let result = validate(
            &SchemaModel::new().with_table(table),
            capabilities_for(Dialect::Nile),
        )
        .unwrap();
        assert_eq!(result.issues_for(FeatureCode::NileMissingTenantId).count(), 1);
    }

    #[test]
    fn shared_tables_must_not_reference_tenant_data() {
        let plans = TableDefinition::builder("plans")
            .column(bigint("id").primary_key().auto_increment().build())
            .column(uuid("featured_todo").build())
            .column(uuid("featured_tenant").build())
            .constraint(
                ConstraintBuilder::foreign_key(
                    ["featured_tenant", "featured_todo"],
                    "todos",
                    ["tenant_id", "id"],
                )
                .build(),
            )
            .build();
        let schema = SchemaModel::from_tables(vec![todos(), plans]);
        let result = Validator::new(capabilities_for(Dialect::Nile))
            .with_tenant_policy(DefaultTenantPolicy::new().with_shared_table("plans"))
            .validate(&schema)
            .unwrap();
        assert_eq!(
            result.errors().map(|i| i.code).collect::<Vec<_>>(),
            vec![FeatureCode::NileSharedReferencesTenant]
        );
        let info = result.issues_for(FeatureCode::NileSharedSequence).next().unwrap();
        assert_eq!(info.severity, Severity::Info);
        assert_eq!(info.location, "plans.id");
    }

    #[test]
    fn same_named_tables_are_classified_per_schema() {
        let tenant_todos = TableDefinition::builder("todos")
            .schema("app")
            .column(uuid("tenant_id").not_null().build())
            .column(uuid("id").not_null().build())
            .constraint(ConstraintBuilder::primary_key(["tenant_id", "id"]).build())
            .build();
        let shared_todos = TableDefinition::builder("todos")
            .column(integer("id").primary_key().build())
            .tenant(TenantMarker::Shared)
            .build();
        let plans = TableDefinition::builder("plans")
            .column(integer("todo").references("todos", "id").build())
            .tenant(TenantMarker::Shared)
            .build();
        let sequence = |name: &str, owner: &str| SequenceDefinition {
            name: QualifiedName::from(name),
            owned_by: Some(owner.to_string()),
            start: None,
            increment: None,
        };
        let schema = SchemaModel {
            sequences: vec![
                sequence("app.todo_seq", "todos.n"),
                sequence("public.shared_seq", "public.todos.n"),
            ],
            ..SchemaModel::from_tables(vec![tenant_todos, shared_todos, plans])
        };
        let result = validate(&schema, capabilities_for(Dialect::Nile)).unwrap();

        assert_eq!(result.issues_for(FeatureCode::NileSharedReferencesTenant).count(), 0);
        assert_eq!(
            result
                .issues_for(FeatureCode::NileTenantSequence)
                .map(|i| i.location.as_str())
                .collect::<Vec<_>>(),
            vec!["app.todo_seq"]
        );
        assert_eq!(
            result
                .issues_for(FeatureCode::NileSharedSequence)
                .map(|i| i.location.as_str())
                .collect::<Vec<_>>(),
            vec!["public.shared_seq"]
        );
    }

    #[test]
    fn unclassified_tables_warn() {
        let table = TableDefinition::builder("settings")
            .column(integer("id").primary_key().build())
            .build();
        let result = validate(
            &SchemaModel::new().with_table(table),
            capabilities_for(Dialect::Nile),
        )
        .unwrap();
        assert!(result.valid);
        assert_eq!(
            result.warnings().map(|i| i.code).collect::<Vec<_>>(),
            vec![FeatureCode::NileUnclassifiedTable]
        );
    }

    #[test]
    fn cockroach_serial_and_locality() {
        let table = TableDefinition::builder("events")
            .column(column("id", "bigserial").primary_key().build())
            .locality("REGIONAL BY ROW")
            .build();
        let result = validate(
            &SchemaModel::new().with_table(table),
            capabilities_for(Dialect::CockroachDb),
        )
        .unwrap();
        assert!(result.valid);
        assert_eq!(result.issues_for(FeatureCode::CrdbSerial).count(), 1);
        assert_eq!(
            result.issues_for(FeatureCode::CrdbLocality).next().map(|i| i.severity),
            Some(Severity::Info)
        );
    }
}
