//! Subcommand implementations.
//!
//! Each command writes its report to `out` and returns the process exit
//! status, so the commands can be driven from tests with in-memory
//! buffers.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use oxide_ddl_core::capability::{capabilities_for, Dialect};
use oxide_ddl_core::diff::plan_migration;
use oxide_ddl_core::generate::{generator_for, GenerateOptions};
use oxide_ddl_core::schema::SchemaModel;
use oxide_ddl_core::tracking::{create_tracking_table, insert_record_sql, MigrationRecord};
use oxide_ddl_core::transform;
use oxide_ddl_core::validate::{NameHeuristicPolicy, Validator};

/// Everything went through.
pub const EXIT_OK: u8 = 0;
/// `validate --strict` found errors.
pub const EXIT_INVALID: u8 = 1;
/// `diff` produced destructive statements without `--allow-destructive`.
pub const EXIT_DESTRUCTIVE: u8 = 2;

/// Flags of the `validate` command.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub strict: bool,
    pub json: bool,
    pub name_heuristics: bool,
}

/// Flags of the `diff` command.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    pub allow_destructive: bool,
    pub json: bool,
    pub record: Option<String>,
    pub batch: u32,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            allow_destructive: false,
            json: false,
            record: None,
            batch: 1,
        }
    }
}

/// Reads a JSON schema snapshot.
pub fn load_schema(path: &Path) -> Result<SchemaModel> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema {}", path.display()))?;
    let schema: SchemaModel = serde_json::from_str(&text)
        .with_context(|| format!("Invalid schema snapshot {}", path.display()))?;
    debug!(path = %path.display(), tables = schema.tables.len(), "Loaded schema");
    Ok(schema)
}

fn read_script(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Joins statements the way [`MigrationPlan::to_sql`] does.
///
/// [`MigrationPlan::to_sql`]: oxide_ddl_core::diff::MigrationPlan::to_sql
fn script<'a>(statements: impl IntoIterator<Item = &'a str>) -> String {
    statements
        .into_iter()
        .map(|sql| format!("{sql};"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn capabilities(dialect: Dialect, out: &mut dyn Write) -> Result<u8> {
    serde_json::to_writer_pretty(&mut *out, capabilities_for(dialect))?;
    writeln!(out)?;
    Ok(EXIT_OK)
}

pub fn validate(
    dialect: Dialect,
    schema_path: &Path,
    options: &ValidateOptions,
    out: &mut dyn Write,
) -> Result<u8> {
    let schema = load_schema(schema_path)?;
    let mut validator = Validator::new(capabilities_for(dialect));
    if options.name_heuristics {
        validator = validator.with_tenant_policy(NameHeuristicPolicy::default());
    }
    let result = validator.validate(&schema)?;

    if options.json {
        serde_json::to_writer_pretty(&mut *out, &result)?;
        writeln!(out)?;
    } else {
        for issue in &result.issues {
            writeln!(out, "{issue}")?;
        }
        writeln!(
            out,
            "{dialect}: {} error(s), {} warning(s), {} info",
            result.summary.errors, result.summary.warnings, result.summary.info
        )?;
    }

    if options.strict && !result.valid {
        warn!(%dialect, errors = result.summary.errors, "Schema is not valid");
        return Ok(EXIT_INVALID);
    }
    Ok(EXIT_OK)
}

pub fn generate(
    dialect: Dialect,
    schema_path: &Path,
    options: &GenerateOptions,
    out: &mut dyn Write,
) -> Result<u8> {
    let schema = load_schema(schema_path)?;
    let statements = generator_for(dialect).generate_schema(&schema, options)?;
    info!(%dialect, statements = statements.len(), "Generated schema");
    writeln!(out, "{}", script(statements.iter().map(|s| s.sql.as_str())))?;
    Ok(EXIT_OK)
}

pub fn diff(
    dialect: Dialect,
    from_path: &Path,
    to_path: &Path,
    options: &DiffOptions,
    out: &mut dyn Write,
) -> Result<u8> {
    let from = load_schema(from_path)?;
    let to = load_schema(to_path)?;
    let generator = generator_for(dialect);
    let plan = plan_migration(&from, &to, generator.as_ref(), &GenerateOptions::default())?;

    for warning in &plan.warnings {
        warn!("{warning}");
    }
    for issue in plan.check_limits(capabilities_for(dialect)) {
        warn!("{issue}");
    }

    if options.json {
        serde_json::to_writer_pretty(&mut *out, &plan)?;
        writeln!(out)?;
    } else if plan.is_empty() {
        info!(%dialect, "No changes detected");
    } else {
        writeln!(out, "{}", plan.to_sql())?;
        if let Some(name) = &options.record {
            let record = MigrationRecord::for_plan(name, &plan, options.batch);
            let tracking = create_tracking_table(dialect);
            let insert = insert_record_sql(&record, dialect);
            writeln!(out)?;
            writeln!(out, "{}", script([tracking.sql.as_str(), insert.as_str()]))?;
        }
    }

    info!(
        %dialect,
        statements = plan.statements.len(),
        checksum = %plan.checksum(),
        "Planned migration"
    );

    if plan.has_destructive() && !options.allow_destructive {
        for stmt in plan.destructive_statements() {
            warn!(sql = %stmt.sql, "Destructive statement");
        }
        return Ok(EXIT_DESTRUCTIVE);
    }
    Ok(EXIT_OK)
}

pub fn rewrite(
    dialect: Dialect,
    input: &Path,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<u8> {
    let sql = read_script(input)?;
    let result = transform::rewrite(&sql, dialect);
    for change in &result.changes {
        let first_line = change.original.lines().next().unwrap_or_default();
        writeln!(
            err,
            "{} {} ({} match(es)): {first_line}",
            change.rule, change.description, change.matches
        )?;
    }
    if !result.modified {
        info!(%dialect, "Script needs no rewriting");
    }
    write!(out, "{}", result.sql)?;
    Ok(EXIT_OK)
}
