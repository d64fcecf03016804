//! Column type and column feature checks.

use crate::capability::{types, Dialect, DialectFamily, Feature};
use crate::schema::{ColumnDefinition, DefaultValue, Sentinel, TableDefinition};

use super::{Checks, FeatureCode, IssueCategory};

impl Checks<'_> {
    pub(super) fn column(&mut self, table: &TableDefinition, column: &ColumnDefinition) {
        let location = format!("{}.{}", table.qualified_name(), column.name);
        self.column_type(&location, column);
        self.column_features(table, &location, column);
    }

    /// Type support. Arrays and the base type are checked independently so
    /// an unsupported array of an unsupported type reports both.
    fn column_type(&mut self, location: &str, column: &ColumnDefinition) {
        let dialect = self.caps.dialect;
        let canonical = types::normalized(&column.data_type);

        if column.is_array() && !self.caps.supports(Feature::Arrays) {
            self.error(
                IssueCategory::DataType,
                FeatureCode::ArrayType,
                location,
                format!(
                    "Array type '{}' is not supported by {dialect}",
                    column.declared_type()
                ),
                Some("Store the values as a JSON array, or move them into a child table"),
            );
        }

        if self.caps.is_always_supported(&canonical) {
            return;
        }

        let (feature, code, alternative) = if types::is_uuid(&canonical) {
            (
                Feature::Uuid,
                FeatureCode::UuidType,
                Some("Use TEXT holding the 36-character canonical form (or a 16-byte BLOB)"),
            )
        } else if canonical == "json" {
            (
                Feature::Json,
                FeatureCode::JsonType,
                Some("Use TEXT holding serialized JSON"),
            )
        } else if canonical == "jsonb" {
            let alternative = if self.caps.supports(Feature::Json) {
                "Use JSON; binary storage and jsonb operators are not available"
            } else {
                "Use TEXT holding serialized JSON"
            };
            (Feature::Jsonb, FeatureCode::JsonbType, Some(alternative))
        } else if types::is_serial(&canonical) {
            let alternative = match self.caps.family() {
                DialectFamily::Sqlite => "Use INTEGER PRIMARY KEY, optionally with AUTOINCREMENT",
                DialectFamily::Postgres => "Use an integer column with a sequence default",
            };
            (Feature::Serial, FeatureCode::SerialType, Some(alternative))
        } else if types::is_range(&canonical) {
            (
                Feature::RangeTypes,
                FeatureCode::RangeType,
                Some("Use separate lower and upper bound columns with a CHECK constraint"),
            )
        } else if types::is_network(&canonical) {
            (
                Feature::NetworkTypes,
                FeatureCode::NetworkType,
                Some("Use TEXT and validate addresses in the application"),
            )
        } else if types::is_geometry(&canonical) {
            (Feature::Geometry, FeatureCode::GeometryType, None)
        } else if self.schema.has_enum(&types::base_type(&column.data_type)) {
            (
                Feature::Enums,
                FeatureCode::EnumType,
                Some("Use TEXT with a CHECK (column IN (...)) constraint"),
            )
        } else {
            if !self.caps.is_known_type(&canonical) && !self.caps.accepts_unknown_types {
                self.warning(
                    IssueCategory::DataType,
                    FeatureCode::UnknownType,
                    location,
                    format!(
                        "Type '{}' is not a built-in {dialect} type; it must exist as a domain, \
                         extension or user-defined type",
                        column.data_type
                    ),
                );
            }
            return;
        };

        if !self.caps.supports(feature) {
            self.error(
                IssueCategory::DataType,
                code,
                location,
                format!(
                    "Type '{}' is not supported by {dialect}",
                    column.data_type
                ),
                alternative,
            );
        }
    }

    fn column_features(&mut self, table: &TableDefinition, location: &str, column: &ColumnDefinition) {
        let dialect = self.caps.dialect;
        let canonical = types::normalized(&column.data_type);

        if let Some(generated) = &column.generated {
            if !self.caps.supports(Feature::GeneratedColumns) {
                self.error(
                    IssueCategory::Feature,
                    FeatureCode::GeneratedColumn,
                    location,
                    format!("Generated columns are not supported by {dialect}"),
                    Some("Compute the value in a view or in the application"),
                );
            }
            if column.default.is_some() {
                self.warning(
                    IssueCategory::Feature,
                    FeatureCode::GeneratedWithDefault,
                    location,
                    "Column is generated; its default value is ignored".to_string(),
                );
            }
            if !generated.stored && self.caps.family() == DialectFamily::Postgres {
                self.warning(
                    IssueCategory::Feature,
                    FeatureCode::VirtualGeneratedColumn,
                    location,
                    format!("VIRTUAL generated columns are emitted as STORED for {dialect}"),
                );
            }
        }

        if column.auto_increment {
            if !types::is_integer(&canonical) {
                let alternative = if self.caps.supports(Feature::Uuid) {
                    "Use a UUID column with a gen_random_uuid() default"
                } else {
                    "Use an INTEGER column"
                };
                self.error(
                    IssueCategory::DataType,
                    FeatureCode::AutoIncrementType,
                    location,
                    format!(
                        "Auto-increment requires an integer type, found '{}'",
                        column.data_type
                    ),
                    Some(alternative),
                );
            } else if self.caps.family() == DialectFamily::Sqlite
                && (!column.primary_key || table.has_table_level_primary_key())
            {
                self.error(
                    IssueCategory::Constraint,
                    FeatureCode::AutoIncrementPrimaryKey,
                    location,
                    format!("{dialect} AUTOINCREMENT is only allowed on an INTEGER PRIMARY KEY"),
                    Some("Declare the column as the table's sole INTEGER PRIMARY KEY"),
                );
            }
        }

        if column.default == Some(DefaultValue::Sentinel(Sentinel::UniqueRowId))
            && dialect != Dialect::CockroachDb
        {
            self.error(
                IssueCategory::Feature,
                FeatureCode::UniqueRowIdDefault,
                location,
                format!("unique_rowid() is specific to CockroachDB and unavailable on {dialect}"),
                Some("Use a UUID column with gen_random_uuid(), or an auto-increment integer"),
            );
        }

        if column.comment.is_some() && !self.caps.supports(Feature::Comments) {
            self.info(
                IssueCategory::Feature,
                FeatureCode::Comment,
                location,
                format!("Column comments are not emitted for {dialect}"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::capability::{capabilities_for, Dialect};
    use crate::schema::{
        bigint, column, integer, jsonb, text, timestamptz, uuid, SchemaModel, Sentinel,
        TableDefinition,
    };
    use crate::validate::{validate, FeatureCode, Severity};

    fn schema_with(table: TableDefinition) -> SchemaModel {
        SchemaModel::new().with_table(table)
    }

    #[test]
    fn every_unsupported_type_is_reported() {
        let table = TableDefinition::builder("events")
            .column(integer("id").primary_key().build())
            .column(uuid("ref").build())
            .column(text("tags").array(1).build())
            .column(column("during", "tstzrange").build())
            .column(column("origin", "inet").build())
            .column(column("area", "polygon").build())
            .build();
        let result = validate(&schema_with(table), capabilities_for(Dialect::Sqlite)).unwrap();
        let codes: Vec<FeatureCode> = result.errors().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                FeatureCode::UuidType,
                FeatureCode::ArrayType,
                FeatureCode::RangeType,
                FeatureCode::NetworkType,
                FeatureCode::GeometryType,
            ]
        );
        let geometry = result.issues_for(FeatureCode::GeometryType).next().unwrap();
        assert_eq!(geometry.alternative, None);
        assert_eq!(geometry.location, "events.area");
    }

    #[test]
    fn jsonb_on_sqlite_suggests_json() {
        let table = TableDefinition::builder("docs")
            .column(integer("id").primary_key().build())
            .column(jsonb("body").build())
            .build();
        let result = validate(&schema_with(table), capabilities_for(Dialect::Sqlite)).unwrap();
        let issue = result.issues_for(FeatureCode::JsonbType).next().unwrap();
        assert!(issue.alternative.as_deref().unwrap().starts_with("Use JSON"));
    }

    #[test]
    fn unknown_postgres_type_is_a_warning() {
        let table = TableDefinition::builder("docs")
            .column(column("body", "my_domain").build())
            .build();
        let result = validate(&schema_with(table), capabilities_for(Dialect::Postgres)).unwrap();
        assert!(result.valid);
        assert_eq!(
            result.warnings().next().map(|i| i.code),
            Some(FeatureCode::UnknownType)
        );
    }

    #[test]
    fn sqlite_autoincrement_needs_sole_integer_primary_key() {
        let table = TableDefinition::builder("counters")
            .column(integer("seq").auto_increment().build())
            .column(text("code").auto_increment().build())
            .build();
        let result = validate(&schema_with(table), capabilities_for(Dialect::Sqlite)).unwrap();
        let codes: Vec<FeatureCode> = result.errors().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                FeatureCode::AutoIncrementPrimaryKey,
                FeatureCode::AutoIncrementType
            ]
        );

        let ok = TableDefinition::builder("counters")
            .column(bigint("id").primary_key().auto_increment().build())
            .build();
        assert!(validate(&schema_with(ok), capabilities_for(Dialect::Sqlite))
            .unwrap()
            .valid);
    }

    #[test]
    fn generated_column_with_default_warns() {
        let table = TableDefinition::builder("orders")
            .column(integer("qty").build())
            .column(
                integer("double_qty")
                    .generated("qty * 2")
                    .default_int(0)
                    .build(),
            )
            .build();
        let result = validate(&schema_with(table), capabilities_for(Dialect::Postgres)).unwrap();
        assert!(result.valid);
        assert_eq!(result.issues_for(FeatureCode::GeneratedWithDefault).count(), 1);
    }

    #[test]
    fn unique_rowid_only_on_cockroach() {
        let table = TableDefinition::builder("t")
            .column(
                bigint("id")
                    .primary_key()
                    .default_sentinel(Sentinel::UniqueRowId)
                    .build(),
            )
            .column(timestamptz("at").build())
            .build();
        let schema = schema_with(table);
        let pg = validate(&schema, capabilities_for(Dialect::Postgres)).unwrap();
        assert_eq!(pg.issues_for(FeatureCode::UniqueRowIdDefault).count(), 1);
        let crdb = validate(&schema, capabilities_for(Dialect::CockroachDb)).unwrap();
        assert_eq!(crdb.issues_for(FeatureCode::UniqueRowIdDefault).count(), 0);
    }

    #[test]
    fn comments_are_info_on_sqlite() {
        let table = TableDefinition::builder("t")
            .column(integer("id").primary_key().comment("surrogate key").build())
            .build();
        let result = validate(&schema_with(table), capabilities_for(Dialect::Sqlite)).unwrap();
        assert!(result.valid);
        let issue = result.issues_for(FeatureCode::Comment).next().unwrap();
        assert_eq!(issue.severity, Severity::Info);
    }
}
