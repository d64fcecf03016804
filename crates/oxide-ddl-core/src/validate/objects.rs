//! Checks for schema objects other than tables.

use crate::capability::{Dialect, DialectFamily, Feature};
use crate::schema::QualifiedName;

use super::{Checks, FeatureCode, IssueCategory};

impl Checks<'_> {
    pub(super) fn objects(&mut self) {
        let schema = self.schema;
        let dialect = self.caps.dialect;

        if !self.caps.supports(Feature::Enums) {
            for enum_type in &schema.enums {
                self.error(
                    IssueCategory::DataType,
                    FeatureCode::EnumType,
                    &enum_type.name.to_string(),
                    format!("Enum types are not supported by {dialect}"),
                    Some("Use TEXT with a CHECK (column IN (...)) constraint"),
                );
            }
        }

        if !self.caps.supports(Feature::Sequences) {
            let alternative = match self.caps.family() {
                DialectFamily::Sqlite => Some("Use an INTEGER PRIMARY KEY column"),
                DialectFamily::Postgres => None,
            };
            for sequence in &schema.sequences {
                self.error(
                    IssueCategory::Feature,
                    FeatureCode::Sequences,
                    &sequence.name.to_string(),
                    format!("Sequences are not supported by {dialect}"),
                    alternative,
                );
            }
        }

        for function in &schema.functions {
            let location = function.name.to_string();
            if !self.caps.supports(Feature::Functions) {
                self.error(
                    IssueCategory::Function,
                    FeatureCode::Functions,
                    &location,
                    format!("Stored functions are not supported by {dialect}"),
                    Some("Move the logic into the application"),
                );
            } else if !self.caps.supports_language(&function.language) {
                self.error(
                    IssueCategory::Function,
                    FeatureCode::FunctionLanguage,
                    &location,
                    format!(
                        "Function language '{}' is not available on {dialect}",
                        function.language
                    ),
                    Some("Rewrite the function in plpgsql or sql"),
                );
            }
        }

        self.triggers();
        self.policies();

        for view in &schema.views {
            let location = view.name.to_string();
            if view.materialized && !self.caps.supports(Feature::MaterializedViews) {
                let alternative = self
                    .caps
                    .supports(Feature::Views)
                    .then_some("Use a plain view, or a table refreshed by the application");
                self.error(
                    IssueCategory::Feature,
                    FeatureCode::MaterializedView,
                    &location,
                    format!("Materialized views are not supported by {dialect}"),
                    alternative,
                );
            } else if !view.materialized && !self.caps.supports(Feature::Views) {
                self.error(
                    IssueCategory::Feature,
                    FeatureCode::View,
                    &location,
                    format!("Views are not supported by {dialect}"),
                    None,
                );
            }
        }

        if !self.caps.supports(Feature::Extensions) {
            let alternative = match dialect {
                Dialect::Nile => Some("Use the extensions Nile installs by default (pgvector, postgis, pg_trgm, ...)"),
                _ => None,
            };
            for extension in &schema.extensions {
                self.error(
                    IssueCategory::Feature,
                    FeatureCode::Extension,
                    &extension.name,
                    format!("CREATE EXTENSION is not supported by {dialect}"),
                    alternative,
                );
            }
        }
    }

    fn triggers(&mut self) {
        let schema = self.schema;
        let dialect = self.caps.dialect;

        for trigger in &schema.triggers {
            let location = format!("{}.{}", trigger.table, trigger.name);
            if !self.caps.supports(Feature::Triggers) {
                let alternative = match dialect {
                    Dialect::Nile => "Run the logic in the application or a background job",
                    _ => "Move the logic into the application",
                };
                self.error(
                    IssueCategory::Trigger,
                    FeatureCode::Triggers,
                    &location,
                    format!("Triggers are not supported by {dialect}"),
                    Some(alternative),
                );
                continue;
            }

            self.require_table(
                &trigger.table,
                &location,
                IssueCategory::Trigger,
                FeatureCode::TriggerUnknownTable,
                "Trigger",
            );

            let missing = match self.caps.family() {
                DialectFamily::Postgres => trigger.function.is_none(),
                DialectFamily::Sqlite => trigger.body.is_empty(),
            };
            if missing {
                let (message, alternative) = match self.caps.family() {
                    DialectFamily::Postgres => (
                        format!("{dialect} triggers must EXECUTE FUNCTION; none is given"),
                        "Name a trigger function",
                    ),
                    DialectFamily::Sqlite => (
                        format!("{dialect} triggers need an inline BEGIN ... END body; none is given"),
                        "Provide the trigger body statements",
                    ),
                };
                self.error(
                    IssueCategory::Trigger,
                    FeatureCode::TriggerAction,
                    &location,
                    message,
                    Some(alternative),
                );
            }
        }
    }

    fn policies(&mut self) {
        let schema = self.schema;
        let dialect = self.caps.dialect;

        for policy in &schema.policies {
            let location = format!("{}.{}", policy.table, policy.name);
            if !self.caps.supports(Feature::RowLevelSecurity) {
                let alternative = match dialect {
                    Dialect::Nile => "Rely on Nile tenant isolation through the tenant_id column",
                    _ => "Filter rows in the application",
                };
                self.error(
                    IssueCategory::Feature,
                    FeatureCode::Policies,
                    &location,
                    format!("Row-level security policies are not supported by {dialect}"),
                    Some(alternative),
                );
                continue;
            }
            self.require_table(
                &policy.table,
                &location,
                IssueCategory::Feature,
                FeatureCode::PolicyUnknownTable,
                "Policy",
            );
        }
    }

    fn require_table(
        &mut self,
        table: &QualifiedName,
        location: &str,
        category: IssueCategory,
        code: FeatureCode,
        what: &str,
    ) {
        if self.schema.table(table).is_none() {
            self.error(
                category,
                code,
                location,
                format!("{what} is attached to unknown table '{table}'"),
                None,
            );
        }
    }
}
