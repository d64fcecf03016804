//! Validation issues and stable feature codes.
//!
//! Feature codes are part of the public contract. Never renumber or reuse a
//! code; add new variants with new codes only.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capability::Dialect;

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Purely informational.
    Info,
    /// Representable, but risky or semantically different.
    Warning,
    /// The dialect cannot represent the construct.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// What kind of schema object an issue is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCategory {
    /// Column types.
    DataType,
    /// Indexes.
    Index,
    /// Constraints and keys.
    Constraint,
    /// Table-level and platform features.
    Feature,
    /// Functions.
    Function,
    /// Triggers.
    Trigger,
}

/// Stable, machine-readable issue codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum FeatureCode {
    // Types (DDL_T)
    /// Type name unknown to the dialect.
    UnknownType,
    /// `uuid` unsupported.
    UuidType,
    /// `json` unsupported.
    JsonType,
    /// `jsonb` unsupported.
    JsonbType,
    /// Array columns unsupported.
    ArrayType,
    /// Enum types unsupported.
    EnumType,
    /// Range types unsupported.
    RangeType,
    /// Network types unsupported.
    NetworkType,
    /// Geometric types unsupported.
    GeometryType,
    /// SERIAL pseudo-types unsupported.
    SerialType,

    // Columns (DDL_C)
    /// Generated columns unsupported.
    GeneratedColumn,
    /// Auto-increment on a non-integer type.
    AutoIncrementType,
    /// SQLite AUTOINCREMENT outside a sole INTEGER PRIMARY KEY.
    AutoIncrementPrimaryKey,
    /// `unique_rowid()` default outside CockroachDB.
    UniqueRowIdDefault,
    /// Comments are not emitted.
    Comment,
    /// Two columns with the same name.
    DuplicateColumn,
    /// A generated column also declares a default.
    GeneratedWithDefault,
    /// VIRTUAL generated column emitted as STORED.
    VirtualGeneratedColumn,

    // Indexes (DDL_I)
    /// Index method unsupported.
    IndexMethod,
    /// Partial indexes unsupported.
    PartialIndex,
    /// Covering indexes unsupported.
    CoveringIndex,
    /// ASC/DESC/NULLS on an unordered index method.
    IndexOrdering,
    /// Expression indexes unsupported.
    ExpressionIndex,
    /// Index names an unknown column.
    IndexUnknownColumn,
    /// Index storage parameters or tablespace are ignored.
    IndexStorage,

    // Constraints (DDL_K)
    /// Exclusion constraints unsupported.
    ExclusionConstraint,
    /// Foreign key to an unknown table.
    ForeignKeyUnknownTable,
    /// Foreign key to an unknown column.
    ForeignKeyUnknownColumn,
    /// Constraint names an unknown column.
    ConstraintUnknownColumn,

    // Functions (DDL_F), triggers (DDL_R), policies (DDL_P), sequences (DDL_S)
    /// Functions unsupported.
    Functions,
    /// Function language unsupported.
    FunctionLanguage,
    /// Triggers unsupported.
    Triggers,
    /// Trigger on an unknown table.
    TriggerUnknownTable,
    /// Trigger without an action for the dialect family.
    TriggerAction,
    /// Row-level security unsupported.
    Policies,
    /// Policy on an unknown table.
    PolicyUnknownTable,
    /// Sequences unsupported.
    Sequences,

    // Tables and platform (DDL_X)
    /// Partitioning unsupported.
    Partitioning,
    /// Inheritance unsupported.
    Inheritance,
    /// UNLOGGED unsupported.
    UnloggedTable,
    /// Tablespaces unsupported.
    Tablespace,
    /// LOCALITY unsupported.
    Locality,
    /// Zone configuration unsupported.
    ZoneConfig,
    /// Collides with a platform-managed object.
    ReservedObject,
    /// Materialized views unsupported.
    MaterializedView,
    /// Views unsupported.
    View,
    /// CREATE EXTENSION unsupported.
    Extension,
    /// Table without columns.
    EmptyTable,
    /// SQLite table options on a non-SQLite dialect.
    SqliteTableOptions,

    // Limits (DDL_L)
    /// Statement exceeds the dialect's size limit.
    StatementTooLarge,
    /// Batch exceeds the dialect's statement-count limit.
    TooManyStatements,

    // CockroachDB
    /// SERIAL maps to `unique_rowid()`.
    CrdbSerial,
    /// Triggers are a preview feature.
    CrdbTriggerPreview,
    /// LOCALITY configured.
    CrdbLocality,
    /// Zone configuration configured.
    CrdbZoneConfig,

    // Nile
    /// Sequence or SERIAL/IDENTITY on a tenant-scoped table.
    NileTenantSequence,
    /// `tenant_id` is not a UUID.
    NileTenantIdType,
    /// `tenant_id` is not part of the primary key.
    NileTenantPrimaryKey,
    /// A shared table references a tenant-scoped table.
    NileSharedReferencesTenant,
    /// A table marked tenant-scoped has no `tenant_id`.
    NileMissingTenantId,
    /// Sequence on a shared table (allowed).
    NileSharedSequence,
    /// Table neither tenant-scoped nor classified shared.
    NileUnclassifiedTable,
}

impl FeatureCode {
    /// Every code, in declaration order.
    pub const ALL: &'static [Self] = &[
        Self::UnknownType,
        Self::UuidType,
        Self::JsonType,
        Self::JsonbType,
        Self::ArrayType,
        Self::EnumType,
        Self::RangeType,
        Self::NetworkType,
        Self::GeometryType,
        Self::SerialType,
        Self::GeneratedColumn,
        Self::AutoIncrementType,
        Self::AutoIncrementPrimaryKey,
        Self::UniqueRowIdDefault,
        Self::Comment,
        Self::DuplicateColumn,
        Self::GeneratedWithDefault,
        Self::VirtualGeneratedColumn,
        Self::IndexMethod,
        Self::PartialIndex,
        Self::CoveringIndex,
        Self::IndexOrdering,
        Self::ExpressionIndex,
        Self::IndexUnknownColumn,
        Self::IndexStorage,
        Self::ExclusionConstraint,
        Self::ForeignKeyUnknownTable,
        Self::ForeignKeyUnknownColumn,
        Self::ConstraintUnknownColumn,
        Self::Functions,
        Self::FunctionLanguage,
        Self::Triggers,
        Self::TriggerUnknownTable,
        Self::TriggerAction,
        Self::Policies,
        Self::PolicyUnknownTable,
        Self::Sequences,
        Self::Partitioning,
        Self::Inheritance,
        Self::UnloggedTable,
        Self::Tablespace,
        Self::Locality,
        Self::ZoneConfig,
        Self::ReservedObject,
        Self::MaterializedView,
        Self::View,
        Self::Extension,
        Self::EmptyTable,
        Self::SqliteTableOptions,
        Self::StatementTooLarge,
        Self::TooManyStatements,
        Self::CrdbSerial,
        Self::CrdbTriggerPreview,
        Self::CrdbLocality,
        Self::CrdbZoneConfig,
        Self::NileTenantSequence,
        Self::NileTenantIdType,
        Self::NileTenantPrimaryKey,
        Self::NileSharedReferencesTenant,
        Self::NileMissingTenantId,
        Self::NileSharedSequence,
        Self::NileUnclassifiedTable,
    ];

    /// The stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownType => "DDL_T001",
            Self::UuidType => "DDL_T002",
            Self::JsonType => "DDL_T003",
            Self::JsonbType => "DDL_T004",
            Self::ArrayType => "DDL_T005",
            Self::EnumType => "DDL_T006",
            Self::RangeType => "DDL_T007",
            Self::NetworkType => "DDL_T008",
            Self::GeometryType => "DDL_T009",
            Self::SerialType => "DDL_T010",
            Self::GeneratedColumn => "DDL_C001",
            Self::AutoIncrementType => "DDL_C002",
            Self::AutoIncrementPrimaryKey => "DDL_C003",
            Self::UniqueRowIdDefault => "DDL_C004",
            Self::Comment => "DDL_C005",
            Self::DuplicateColumn => "DDL_C006",
            Self::GeneratedWithDefault => "DDL_C007",
            Self::VirtualGeneratedColumn => "DDL_C008",
            Self::IndexMethod => "DDL_I001",
            Self::PartialIndex => "DDL_I002",
            Self::CoveringIndex => "DDL_I003",
            Self::IndexOrdering => "DDL_I004",
            Self::ExpressionIndex => "DDL_I005",
            Self::IndexUnknownColumn => "DDL_I006",
            Self::IndexStorage => "DDL_I007",
            Self::ExclusionConstraint => "DDL_K001",
            Self::ForeignKeyUnknownTable => "DDL_K002",
            Self::ForeignKeyUnknownColumn => "DDL_K003",
            Self::ConstraintUnknownColumn => "DDL_K004",
            Self::Functions => "DDL_F001",
            Self::FunctionLanguage => "DDL_F002",
            Self::Triggers => "DDL_R001",
            Self::TriggerUnknownTable => "DDL_R002",
            Self::TriggerAction => "DDL_R003",
            Self::Policies => "DDL_P001",
            Self::PolicyUnknownTable => "DDL_P002",
            Self::Sequences => "DDL_S001",
            Self::Partitioning => "DDL_X001",
            Self::Inheritance => "DDL_X002",
            Self::UnloggedTable => "DDL_X003",
            Self::Tablespace => "DDL_X004",
            Self::Locality => "DDL_X005",
            Self::ZoneConfig => "DDL_X006",
            Self::ReservedObject => "DDL_X007",
            Self::MaterializedView => "DDL_X008",
            Self::View => "DDL_X009",
            Self::Extension => "DDL_X010",
            Self::EmptyTable => "DDL_X011",
            Self::SqliteTableOptions => "DDL_X012",
            Self::StatementTooLarge => "DDL_L001",
            Self::TooManyStatements => "DDL_L002",
            Self::CrdbSerial => "CRDB_E100",
            Self::CrdbTriggerPreview => "CRDB_W200",
            Self::CrdbLocality => "CRDB_I300",
            Self::CrdbZoneConfig => "CRDB_I301",
            Self::NileTenantSequence => "NILE_E001",
            Self::NileTenantIdType => "NILE_E002",
            Self::NileTenantPrimaryKey => "NILE_E003",
            Self::NileSharedReferencesTenant => "NILE_E004",
            Self::NileMissingTenantId => "NILE_E005",
            Self::NileSharedSequence => "NILE_I001",
            Self::NileUnclassifiedTable => "NILE_W001",
        }
    }

    /// Looks a code up by its string form.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == code)
    }
}

impl fmt::Display for FeatureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<FeatureCode> for &'static str {
    fn from(code: FeatureCode) -> Self {
        code.as_str()
    }
}

impl TryFrom<String> for FeatureCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown feature code '{value}'"))
    }
}

/// One finding of the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Severity.
    pub severity: Severity,
    /// Object category.
    pub category: IssueCategory,
    /// Stable code.
    pub code: FeatureCode,
    /// Qualified path (`table`, `table.column`, `schema.index`).
    pub location: String,
    /// Human-readable message.
    pub message: String,
    /// Recommended substitute, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
    /// Documentation reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl ValidationIssue {
    /// Creates an issue without alternative or documentation.
    #[must_use]
    pub fn new(
        severity: Severity,
        category: IssueCategory,
        code: FeatureCode,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            code,
            location: location.into(),
            message: message.into(),
            alternative: None,
            documentation: None,
        }
    }

    /// Sets the alternative suggestion.
    #[must_use]
    pub fn with_alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternative = Some(alternative.into());
        self
    }

    /// Sets the alternative only when one exists.
    #[must_use]
    pub fn with_optional_alternative(mut self, alternative: Option<&str>) -> Self {
        self.alternative = alternative.map(ToString::to_string);
        self
    }

    /// Sets the documentation reference.
    #[must_use]
    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.severity, self.code, self.location, self.message
        )?;
        if let Some(alternative) = &self.alternative {
            write!(f, " (alternative: {alternative})")?;
        }
        Ok(())
    }
}

/// Issue counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Errors.
    pub errors: usize,
    /// Warnings.
    pub warnings: usize,
    /// Informational notes.
    pub info: usize,
}

/// Outcome of validating a schema against a dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Target dialect.
    pub dialect: Dialect,
    /// `true` exactly when there are no errors.
    pub valid: bool,
    /// Every issue, in discovery order.
    pub issues: Vec<ValidationIssue>,
    /// Counts per severity.
    pub summary: ValidationSummary,
}

impl ValidationResult {
    /// Builds a result, deriving `valid` and the summary from the issues.
    #[must_use]
    pub fn from_issues(dialect: Dialect, issues: Vec<ValidationIssue>) -> Self {
        let mut summary = ValidationSummary::default();
        for issue in &issues {
            match issue.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.info += 1,
            }
        }
        Self {
            dialect,
            valid: summary.errors == 0,
            issues,
            summary,
        }
    }

    /// Issues with error severity.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.with_severity(Severity::Error)
    }

    /// Issues with warning severity.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.with_severity(Severity::Warning)
    }

    /// Issues with info severity.
    pub fn infos(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.with_severity(Severity::Info)
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    /// Issues carrying `code`.
    pub fn issues_for(&self, code: FeatureCode) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }
}
