//! Schema diffing and migration planning.
//!
//! [`plan_migration`] compares two schema snapshots and produces the
//! statements that turn the first into the second. Statements are grouped
//! in phases so that additions land before removals:
//!
//! 1. new extensions, types, sequences and tables (dependency order)
//! 2. additive changes (ADD COLUMN, ADD CONSTRAINT, CREATE INDEX)
//! 3. in-place modifications (ALTER COLUMN, replaced constraints and
//!    indexes, table recreations, comments, new views, functions,
//!    triggers and policies)
//! 4. drops (DROP INDEX, DROP CONSTRAINT, DROP COLUMN)
//! 5. dropped tables (reverse dependency order)
//!
//! ```rust
//! use oxide_ddl_core::capability::Dialect;
//! use oxide_ddl_core::diff::plan_migration;
//! use oxide_ddl_core::generate::{generator_for, GenerateOptions};
//! use oxide_ddl_core::schema::{integer, text, SchemaModel, TableDefinition};
//!
//! let from = SchemaModel::new().with_table(
//!     TableDefinition::builder("notes").column(integer("id").primary_key().build()).build(),
//! );
//! let to = SchemaModel::new().with_table(
//!     TableDefinition::builder("notes")
//!         .column(integer("id").primary_key().build())
//!         .column(text("body").build())
//!         .build(),
//! );
//! let generator = generator_for(Dialect::Postgres);
//! let plan = plan_migration(&from, &to, generator.as_ref(), &GenerateOptions::default()).unwrap();
//! assert_eq!(plan.to_sql(), "ALTER TABLE notes ADD COLUMN body text;");
//! assert!(!plan.has_destructive());
//! ```

pub mod ordering;

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

pub use ordering::{dependency_order, DependencyOrder};

use crate::capability::{types, DialectCapabilitySet};
use crate::error::Result;
use crate::generate::{
    quote_literal, DdlGenerator, GenerateOptions, GeneratedStatement, Operation, StatementKind,
};
use crate::schema::{EnumType, QualifiedName, SchemaModel, TableDefinition};
use crate::validate::{FeatureCode, IssueCategory, Severity, ValidationIssue};

/// Minimum normalized similarity score (0.0 to 1.0) for a (removed, added)
/// pair to be reported as a possible rename.
const RENAME_SIMILARITY_THRESHOLD: f64 = 0.4;

// ================================================================
// String similarity helpers
// ================================================================

/// Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let n = b.len();
    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];
    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}

/// Normalized similarity in `[0.0, 1.0]`; 1.0 means identical.
#[allow(clippy::cast_precision_loss)]
fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(a, b) as f64 / max_len as f64)
}

/// Greedy one-to-one pairing of `(old, new, score)` candidates, highest
/// score first.
fn best_pairs(mut candidates: Vec<(String, String, f64)>) -> Vec<(String, String, f64)> {
    candidates.sort_by(|a, b| b.2.total_cmp(&a.2));
    let mut taken_old: Vec<String> = Vec::new();
    let mut taken_new: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for (old, new, score) in candidates {
        if taken_old.contains(&old) || taken_new.contains(&new) {
            continue;
        }
        taken_old.push(old.clone());
        taken_new.push(new.clone());
        out.push((old, new, score));
    }
    out
}

// ================================================================
// Public types
// ================================================================

/// A non-blocking note attached to a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    /// A removed and an added column with the same type and similar
    /// names. The plan drops and adds; a rename would keep the data.
    PossibleRename {
        /// Table containing the columns.
        table: String,
        /// The removed column.
        old_column: String,
        /// The added column.
        new_column: String,
        /// Name similarity score.
        similarity: f64,
    },
    /// A dropped and a created table with identical columns and similar
    /// names.
    PossibleTableRename {
        /// The dropped table.
        old_table: String,
        /// The created table.
        new_table: String,
        /// Name similarity score.
        similarity: f64,
    },
    /// New tables reference each other in a cycle and are created in
    /// declaration order.
    DependencyCycle {
        /// Tables in the cycle.
        tables: Vec<String>,
    },
    /// A non-table object was removed or redefined; the plan leaves it
    /// untouched.
    ObjectNeedsManualMigration {
        /// Qualified object name.
        object: String,
        /// What changed.
        reason: String,
    },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PossibleRename {
                table,
                old_column,
                new_column,
                similarity,
            } => write!(
                f,
                "{table}: '{old_column}' -> '{new_column}' may be a rename (similarity {similarity:.2})"
            ),
            Self::PossibleTableRename {
                old_table,
                new_table,
                similarity,
            } => write!(
                f,
                "table '{old_table}' -> '{new_table}' may be a rename (similarity {similarity:.2})"
            ),
            Self::DependencyCycle { tables } => write!(
                f,
                "foreign key cycle between {}; tables are created in declaration order",
                tables.join(", ")
            ),
            Self::ObjectNeedsManualMigration { object, reason } => {
                write!(f, "{object}: {reason}; migrate it manually")
            }
        }
    }
}

/// An ordered migration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationPlan {
    /// Statements in execution order.
    pub statements: Vec<GeneratedStatement>,
    /// Notes that do not block the plan.
    pub warnings: Vec<PlanWarning>,
}

impl MigrationPlan {
    /// Whether the plan has no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Whether any statement can lose data or reject existing rows.
    #[must_use]
    pub fn has_destructive(&self) -> bool {
        self.statements.iter().any(|s| s.destructive)
    }

    /// The destructive statements.
    pub fn destructive_statements(&self) -> impl Iterator<Item = &GeneratedStatement> {
        self.statements.iter().filter(|s| s.destructive)
    }

    /// The whole plan as one SQL script.
    #[must_use]
    pub fn to_sql(&self) -> String {
        self.statements
            .iter()
            .map(|s| format!("{};", s.sql))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// SHA-256 of [`MigrationPlan::to_sql`], hex encoded.
    #[must_use]
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(self.to_sql().as_bytes()))
    }

    /// Checks the plan against the dialect's batch limits.
    #[must_use]
    pub fn check_limits(&self, caps: &DialectCapabilitySet) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if let Some(max) = caps.limits.max_statement_bytes {
            for stmt in self.statements.iter().filter(|s| s.sql.len() > max) {
                let location = stmt.affected.first().cloned().unwrap_or_default();
                issues.push(
                    ValidationIssue::new(
                        Severity::Error,
                        IssueCategory::Feature,
                        FeatureCode::StatementTooLarge,
                        location,
                        format!(
                            "Statement is {} bytes; {} accepts at most {max}",
                            stmt.sql.len(),
                            caps.dialect
                        ),
                    )
                    .with_alternative("Split the change into several migrations"),
                );
            }
        }
        if let Some(max) = caps.limits.max_statements_per_batch {
            let count: usize = self.statements.iter().map(|s| s.sql.split(";\n").count()).sum();
            if count > max {
                issues.push(
                    ValidationIssue::new(
                        Severity::Error,
                        IssueCategory::Feature,
                        FeatureCode::TooManyStatements,
                        "plan",
                        format!(
                            "Plan holds {count} statements; {} accepts at most {max} per batch",
                            caps.dialect
                        ),
                    )
                    .with_alternative("Split the plan into several batches"),
                );
            }
        }
        issues
    }
}

// ================================================================
// Planning
// ================================================================

/// Statements collected per phase.
#[derive(Debug, Default)]
struct Phases {
    create: Vec<GeneratedStatement>,
    additive: Vec<GeneratedStatement>,
    modify: Vec<GeneratedStatement>,
    drops: Vec<GeneratedStatement>,
    drop_tables: Vec<GeneratedStatement>,
}

impl Phases {
    fn route(&mut self, stmt: GeneratedStatement) {
        match stmt.operation {
            Operation::CreateExtension
            | Operation::CreateType
            | Operation::CreateSequence
            | Operation::CreateTable => self.create.push(stmt),
            Operation::AddColumn | Operation::AddConstraint | Operation::CreateIndex => {
                self.additive.push(stmt);
            }
            Operation::AlterColumn
            | Operation::ReplaceConstraint
            | Operation::RecreateTable
            | Operation::Comment
            | Operation::TableSettings
            | Operation::CreateView
            | Operation::CreateFunction
            | Operation::CreateTrigger
            | Operation::CreatePolicy => self.modify.push(stmt),
            Operation::DropIndex | Operation::DropConstraint | Operation::DropColumn => {
                self.drops.push(stmt);
            }
            Operation::DropTable => self.drop_tables.push(stmt),
        }
    }

    fn into_statements(self) -> Vec<GeneratedStatement> {
        let mut out = self.create;
        out.extend(self.additive);
        out.extend(self.modify);
        out.extend(self.drops);
        out.extend(self.drop_tables);
        out
    }
}

struct Planner<'a> {
    from: &'a SchemaModel,
    to: &'a SchemaModel,
    generator: &'a dyn DdlGenerator,
    options: &'a GenerateOptions,
    default_schema: &'static str,
    phases: Phases,
    warnings: Vec<PlanWarning>,
}

/// Plans the migration from `from` to `to`.
///
/// # Errors
///
/// The first statement the generator cannot render.
pub fn plan_migration(
    from: &SchemaModel,
    to: &SchemaModel,
    generator: &dyn DdlGenerator,
    options: &GenerateOptions,
) -> Result<MigrationPlan> {
    let mut planner = Planner {
        from,
        to,
        generator,
        options,
        default_schema: generator.capabilities().default_schema,
        phases: Phases::default(),
        warnings: Vec::new(),
    };
    planner.leading_objects()?;
    planner.tables()?;
    planner.trailing_objects()?;

    let plan = MigrationPlan {
        statements: planner.phases.into_statements(),
        warnings: planner.warnings,
    };
    debug!(
        dialect = %generator.dialect(),
        statements = plan.statements.len(),
        destructive = plan.destructive_statements().count(),
        warnings = plan.warnings.len(),
        "Planned migration"
    );
    Ok(plan)
}

impl Planner<'_> {
    fn same(&self, a: &QualifiedName, b: &QualifiedName) -> bool {
        a.matches(b, self.default_schema)
    }

    fn manual(&mut self, object: impl Into<String>, reason: &str) {
        let warning = PlanWarning::ObjectNeedsManualMigration {
            object: object.into(),
            reason: reason.to_string(),
        };
        warn!(%warning, "Object left out of the plan");
        self.warnings.push(warning);
    }

    /// Extensions, enum types and sequences.
    fn leading_objects(&mut self) -> Result<()> {
        let (from, to) = (self.from, self.to);

        for extension in &to.extensions {
            if !from.extensions.iter().any(|e| e.name == extension.name) {
                self.phases.route(self.generator.generate_create_extension(extension)?);
            }
        }

        for enum_type in &to.enums {
            let Some(old) = from.enums.iter().find(|e| self.same(&e.name, &enum_type.name)) else {
                self.phases.route(self.generator.generate_create_enum(enum_type)?);
                continue;
            };
            if old.values == enum_type.values {
                continue;
            }
            let kept: Vec<&String> = enum_type
                .values
                .iter()
                .filter(|v| old.values.contains(v))
                .collect();
            let preserved = kept.len() == old.values.len() && kept.iter().zip(&old.values).all(|(a, b)| *a == b);
            if !preserved {
                self.manual(enum_type.name.to_string(), "enum labels were removed or reordered");
                continue;
            }
            self.add_enum_values(&old.values, enum_type);
        }

        for sequence in &to.sequences {
            match from.sequences.iter().find(|s| self.same(&s.name, &sequence.name)) {
                None => self
                    .phases
                    .route(self.generator.generate_create_sequence(sequence, self.options)?),
                Some(old) if old != sequence => {
                    self.manual(sequence.name.to_string(), "sequence definition changed");
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// `ALTER TYPE ... ADD VALUE` for labels appended or inserted between
    /// existing ones.
    fn add_enum_values(&mut self, old: &[String], enum_type: &EnumType) {
        let quoted = self.generator.quote_qualified(&enum_type.name);
        for (i, value) in enum_type.values.iter().enumerate() {
            if old.contains(value) {
                continue;
            }
            let mut sql = format!("ALTER TYPE {quoted} ADD VALUE {}", quote_literal(value));
            if let Some(next) = enum_type.values[i + 1..].iter().find(|v| old.contains(v)) {
                sql.push_str(&format!(" BEFORE {}", quote_literal(next)));
            }
            self.phases.route(
                GeneratedStatement::new(StatementKind::Alter, Operation::CreateType, sql)
                    .affecting(enum_type.name.to_string()),
            );
        }
    }

    fn tables(&mut self) -> Result<()> {
        let (from, to) = (self.from, self.to);

        let created: Vec<&TableDefinition> = to
            .tables
            .iter()
            .filter(|t| from.table_matching(&t.qualified_name(), self.default_schema).is_none())
            .collect();
        let dropped: Vec<&TableDefinition> = from
            .tables
            .iter()
            .filter(|t| to.table_matching(&t.qualified_name(), self.default_schema).is_none())
            .collect();

        self.table_renames(&dropped, &created);

        let ordering = dependency_order(&created, self.default_schema);
        if !ordering.is_acyclic() {
            let tables: Vec<String> = ordering.cycle.iter().map(ToString::to_string).collect();
            warn!(?tables, "Foreign key cycle between new tables");
            self.warnings.push(PlanWarning::DependencyCycle { tables });
        }
        for &i in &ordering.order {
            let table = created[i];
            self.phases
                .route(self.generator.generate_create_table(table, self.options)?);
            for index in &table.indexes {
                self.phases
                    .route(self.generator.generate_create_index(index, self.options)?);
            }
            for stmt in self.generator.generate_table_extras(table, self.options) {
                self.phases.route(stmt);
            }
        }

        for table in &to.tables {
            if let Some(old) = from.table_matching(&table.qualified_name(), self.default_schema) {
                self.existing_table(old, table)?;
            }
        }

        let ordering = dependency_order(&dropped, self.default_schema);
        for &i in ordering.order.iter().rev() {
            let stmt = self
                .generator
                .generate_drop_table(&dropped[i].qualified_name(), self.options);
            self.phases.route(stmt);
        }
        Ok(())
    }

    fn table_renames(&mut self, dropped: &[&TableDefinition], created: &[&TableDefinition]) {
        let mut candidates = Vec::new();
        for old in dropped {
            for new in created {
                if same_shape(old, new) {
                    let score = similarity(&old.name, &new.name);
                    if score >= RENAME_SIMILARITY_THRESHOLD {
                        candidates.push((old.qualified_name().to_string(), new.qualified_name().to_string(), score));
                    }
                }
            }
        }
        for (old_table, new_table, similarity) in best_pairs(candidates) {
            self.warnings.push(PlanWarning::PossibleTableRename {
                old_table,
                new_table,
                similarity,
            });
        }
    }

    fn column_renames(&mut self, old: &TableDefinition, new: &TableDefinition) {
        let mut candidates = Vec::new();
        for removed in old.columns.iter().filter(|c| !new.has_column(&c.name)) {
            for added in new.columns.iter().filter(|c| !old.has_column(&c.name)) {
                if types::normalized(&removed.data_type) != types::normalized(&added.data_type) {
                    continue;
                }
                let score = similarity(&removed.name, &added.name);
                if score >= RENAME_SIMILARITY_THRESHOLD {
                    candidates.push((removed.name.clone(), added.name.clone(), score));
                }
            }
        }
        let table = new.qualified_name().to_string();
        for (old_column, new_column, similarity) in best_pairs(candidates) {
            self.warnings.push(PlanWarning::PossibleRename {
                table: table.clone(),
                old_column,
                new_column,
                similarity,
            });
        }
    }

    fn existing_table(&mut self, old: &TableDefinition, new: &TableDefinition) -> Result<()> {
        self.column_renames(old, new);
        let recreated = self.generator.requires_recreation(old, new);

        // Index drops go first so that a dropped column never takes an
        // index with it before its DROP INDEX runs.
        if !recreated {
            for index in &old.indexes {
                if !new.indexes.iter().any(|i| i.name == index.name) {
                    self.phases
                        .route(self.generator.generate_drop_index(index, self.options));
                }
            }
        }

        // A column dropped and re-added in the same alter is one change and
        // keeps its order.
        let statements = self.generator.generate_alter_table(old, new, self.options)?;
        let readded: Vec<String> = statements
            .iter()
            .filter(|s| s.operation == Operation::DropColumn)
            .filter_map(|s| s.affected.first())
            .filter(|column| {
                statements.iter().any(|s| {
                    s.operation == Operation::AddColumn && s.affected.first() == Some(*column)
                })
            })
            .cloned()
            .collect();
        for stmt in statements {
            let paired = matches!(stmt.operation, Operation::AddColumn | Operation::DropColumn)
                && stmt.affected.first().is_some_and(|c| readded.contains(c));
            if paired {
                self.phases.modify.push(stmt);
            } else {
                self.phases.route(stmt);
            }
        }

        if recreated {
            return Ok(());
        }
        for index in &new.indexes {
            match old.indexes.iter().find(|i| i.name == index.name) {
                None => self
                    .phases
                    .route(self.generator.generate_create_index(index, self.options)?),
                Some(previous) if previous != index => {
                    let drop = self.generator.generate_drop_index(previous, self.options);
                    let create = self.generator.generate_create_index(index, self.options)?;
                    self.phases.modify.push(drop);
                    self.phases.modify.push(create);
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Views, functions, triggers and policies.
    fn trailing_objects(&mut self) -> Result<()> {
        let (from, to) = (self.from, self.to);

        for view in &to.views {
            match from.views.iter().find(|v| self.same(&v.name, &view.name)) {
                None => self
                    .phases
                    .route(self.generator.generate_create_view(view, self.options)?),
                Some(old) if old != view => self.manual(view.name.to_string(), "view definition changed"),
                Some(_) => {}
            }
        }
        for function in &to.functions {
            match from.functions.iter().find(|f| self.same(&f.name, &function.name)) {
                None => self
                    .phases
                    .route(self.generator.generate_create_function(function)?),
                Some(old) if old != function => {
                    self.manual(function.name.to_string(), "function definition changed");
                }
                Some(_) => {}
            }
        }
        for trigger in &to.triggers {
            let location = format!("{}.{}", trigger.table, trigger.name);
            match from
                .triggers
                .iter()
                .find(|t| t.name == trigger.name && self.same(&t.table, &trigger.table))
            {
                None => self
                    .phases
                    .route(self.generator.generate_create_trigger(trigger, self.options)?),
                Some(old) if old != trigger => self.manual(location, "trigger definition changed"),
                Some(_) => {}
            }
        }
        for policy in &to.policies {
            let location = format!("{}.{}", policy.table, policy.name);
            let existing = from
                .policies
                .iter()
                .find(|p| p.name == policy.name && self.same(&p.table, &policy.table));
            match existing {
                None => {
                    let secured = from.policies.iter().any(|p| self.same(&p.table, &policy.table))
                        || self.phases.modify.iter().any(|s| {
                            s.operation == Operation::CreatePolicy
                                && s.affected.len() == 1
                                && s.affected[0] == policy.table.to_string()
                        });
                    if !secured {
                        self.phases
                            .route(self.generator.generate_enable_row_level_security(&policy.table)?);
                    }
                    self.phases.route(self.generator.generate_create_policy(policy)?);
                }
                Some(old) if old != policy => self.manual(location, "policy definition changed"),
                Some(_) => {}
            }
        }

        for view in &from.views {
            if !to.views.iter().any(|v| self.same(&v.name, &view.name)) {
                self.manual(view.name.to_string(), "view was removed");
            }
        }
        for function in &from.functions {
            if !to.functions.iter().any(|f| self.same(&f.name, &function.name)) {
                self.manual(function.name.to_string(), "function was removed");
            }
        }
        for trigger in &from.triggers {
            if !to
                .triggers
                .iter()
                .any(|t| t.name == trigger.name && self.same(&t.table, &trigger.table))
            {
                self.manual(format!("{}.{}", trigger.table, trigger.name), "trigger was removed");
            }
        }
        for policy in &from.policies {
            if !to
                .policies
                .iter()
                .any(|p| p.name == policy.name && self.same(&p.table, &policy.table))
            {
                self.manual(format!("{}.{}", policy.table, policy.name), "policy was removed");
            }
        }
        Ok(())
    }
}

/// Same column names and canonical types, in any order.
fn same_shape(a: &TableDefinition, b: &TableDefinition) -> bool {
    a.columns.len() == b.columns.len()
        && a.columns.iter().all(|c| {
            b.column(&c.name)
                .is_some_and(|other| types::normalized(&other.data_type) == types::normalized(&c.data_type))
        })
}
