//! Schema validation against a dialect's capability set.
//!
//! Validation is total for well-formed input: every check runs and every
//! finding is collected; nothing short-circuits. The only error path is
//! input that cannot be assigned any SQL (see [`DdlError::MalformedFunction`]).
//!
//! ```rust
//! use oxide_ddl_core::capability::{capabilities_for, Dialect};
//! use oxide_ddl_core::schema::{text, uuid, SchemaModel, TableDefinition};
//! use oxide_ddl_core::validate::{validate, FeatureCode};
//!
//! let schema = SchemaModel::new().with_table(
//!     TableDefinition::builder("users")
//!         .column(uuid("id").primary_key().build())
//!         .column(text("email").not_null().build())
//!         .build(),
//! );
//! let result = validate(&schema, capabilities_for(Dialect::Sqlite)).unwrap();
//! assert!(!result.valid);
//! assert_eq!(result.issues_for(FeatureCode::UuidType).count(), 1);
//! ```

mod columns;
mod issue;
mod objects;
mod platform;
mod tables;
mod tenant;

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

pub use issue::{
    FeatureCode, IssueCategory, Severity, ValidationIssue, ValidationResult, ValidationSummary,
};
pub use tenant::{DefaultTenantPolicy, NameHeuristicPolicy, TenantClass, TenantPolicy};

use crate::capability::{Dialect, DialectCapabilitySet};
use crate::error::{DdlError, Result};
use crate::schema::{FunctionBody, SchemaModel};

static BEGIN_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bbegin\b").expect("Invalid BEGIN keyword regex"));

static END_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bend\b").expect("Invalid END keyword regex"));

/// Validates schemas against one dialect.
#[derive(Debug)]
pub struct Validator<'a> {
    caps: &'a DialectCapabilitySet,
    policy: Box<dyn TenantPolicy>,
}

impl<'a> Validator<'a> {
    /// Creates a validator using [`DefaultTenantPolicy`].
    #[must_use]
    pub fn new(caps: &'a DialectCapabilitySet) -> Self {
        Self {
            caps,
            policy: Box::new(DefaultTenantPolicy::default()),
        }
    }

    /// Replaces the tenant classification policy.
    #[must_use]
    pub fn with_tenant_policy(mut self, policy: impl TenantPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Validates `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`DdlError::MalformedFunction`] for a `sql`-language function
    /// whose raw body embeds a `BEGIN ... END` block.
    pub fn validate(&self, schema: &SchemaModel) -> Result<ValidationResult> {
        reject_malformed(schema)?;
        debug!(
            dialect = %self.caps.dialect,
            tables = schema.tables.len(),
            "Validating schema"
        );

        let mut checks = Checks {
            caps: self.caps,
            schema,
            policy: self.policy.as_ref(),
            issues: Vec::new(),
        };
        for table in &schema.tables {
            checks.table(table);
        }
        checks.objects();
        match self.caps.dialect {
            Dialect::CockroachDb => checks.cockroachdb(),
            Dialect::Nile => checks.nile(),
            Dialect::Postgres | Dialect::Sqlite | Dialect::D1 => {}
        }

        let result = ValidationResult::from_issues(self.caps.dialect, checks.issues);
        debug!(
            dialect = %self.caps.dialect,
            errors = result.summary.errors,
            warnings = result.summary.warnings,
            info = result.summary.info,
            "Schema validated"
        );
        Ok(result)
    }
}

/// Validates `schema` against `caps` with the default tenant policy.
///
/// # Errors
///
/// See [`Validator::validate`].
pub fn validate(schema: &SchemaModel, caps: &DialectCapabilitySet) -> Result<ValidationResult> {
    Validator::new(caps).validate(schema)
}

fn reject_malformed(schema: &SchemaModel) -> Result<()> {
    for function in &schema.functions {
        if !function.language.eq_ignore_ascii_case("sql") {
            continue;
        }
        let FunctionBody::Raw(body) = &function.body else {
            continue;
        };
        if let Some(begin) = BEGIN_KEYWORD.find(body) {
            let rest = &body[begin.end()..];
            let atomic = rest.trim_start().to_ascii_lowercase().starts_with("atomic");
            if !atomic && END_KEYWORD.is_match(rest) {
                return Err(DdlError::MalformedFunction {
                    function: function.name.to_string(),
                    reason: "a BEGIN ... END block requires language plpgsql, not sql".into(),
                });
            }
        }
    }
    Ok(())
}

/// Shared state of one validation pass.
struct Checks<'a> {
    caps: &'a DialectCapabilitySet,
    schema: &'a SchemaModel,
    policy: &'a dyn TenantPolicy,
    issues: Vec<ValidationIssue>,
}

impl Checks<'_> {
    fn report(
        &mut self,
        severity: Severity,
        category: IssueCategory,
        code: FeatureCode,
        location: &str,
        message: String,
        alternative: Option<&str>,
    ) {
        self.issues.push(
            ValidationIssue::new(severity, category, code, location, message)
                .with_optional_alternative(alternative),
        );
    }

    fn error(
        &mut self,
        category: IssueCategory,
        code: FeatureCode,
        location: &str,
        message: String,
        alternative: Option<&str>,
    ) {
        self.report(Severity::Error, category, code, location, message, alternative);
    }

    fn warning(
        &mut self,
        category: IssueCategory,
        code: FeatureCode,
        location: &str,
        message: String,
    ) {
        self.report(Severity::Warning, category, code, location, message, None);
    }

    fn info(&mut self, category: IssueCategory, code: FeatureCode, location: &str, message: String) {
        self.report(Severity::Info, category, code, location, message, None);
    }
}
