//! Default value rendering.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::capability::{types, Dialect, DialectCapabilitySet, DialectFamily};
use crate::error::{DdlError, Result};
use crate::schema::{ColumnDefinition, DefaultValue, Literal, Sentinel, TableDefinition};

use super::quote::quote_literal;

/// String defaults that are SQL keywords or function calls and are emitted
/// unquoted.
static SQL_EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)^\s*(?:current_timestamp|current_date|current_time|localtimestamp|localtime|current_user|session_user|true|false|null|[a-z_][a-z0-9_]*(?:\.[a-z_][a-z0-9_]*)?\s*\(.*\))\s*$",
    )
    .expect("Invalid SQL expression regex")
});

/// What SQLite takes after `DEFAULT` without parentheses: literals,
/// signed numbers and the `CURRENT_*` keywords.
static SQLITE_BARE_DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)^(?:current_timestamp|current_date|current_time|true|false|null|[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:e[+-]?\d+)?|0x[0-9a-f]+|'(?:[^']|'')*'|x'[0-9a-f]*')$",
    )
    .expect("Invalid SQLite default regex")
});

/// Canonical 36-character UUID v4 text built from `randomblob`.
const SQLITE_RANDOM_UUID: &str = "(lower(hex(randomblob(4))) || '-' || lower(hex(randomblob(2))) \
     || '-4' || substr(lower(hex(randomblob(2))), 2) || '-' \
     || substr('89ab', 1 + (abs(random()) % 4), 1) || substr(lower(hex(randomblob(2))), 2) \
     || '-' || lower(hex(randomblob(6))))";

/// Whether a string default spells a keyword (`CURRENT_TIMESTAMP`, `NULL`,
/// `TRUE`) or a function call (`now()`, `gen_random_uuid()`).
#[must_use]
pub fn is_sql_expression(value: &str) -> bool {
    SQL_EXPRESSION.is_match(value)
}

/// Renders the `DEFAULT` expression of `column`, or `None` when the column
/// has no default. Generated columns never carry one.
///
/// # Errors
///
/// Returns [`DdlError::UnsupportedDefault`] for a sentinel or literal the
/// dialect cannot express.
pub fn render_default(
    caps: &DialectCapabilitySet,
    table: &TableDefinition,
    column: &ColumnDefinition,
) -> Result<Option<String>> {
    let Some(default) = &column.default else {
        return Ok(None);
    };
    if column.is_generated() {
        warn!(
            table = %table.qualified_name(),
            column = %column.name,
            "Ignoring default on generated column"
        );
        return Ok(None);
    }

    let ctx = Context { caps, table, column };
    let sql = match default {
        DefaultValue::Raw(expr) => ctx.expression(expr),
        DefaultValue::Sentinel(sentinel) => ctx.sentinel(*sentinel)?,
        DefaultValue::Literal(literal) => ctx.literal(literal)?,
    };
    Ok(Some(sql))
}

struct Context<'a> {
    caps: &'a DialectCapabilitySet,
    table: &'a TableDefinition,
    column: &'a ColumnDefinition,
}

impl Context<'_> {
    fn unsupported(&self, reason: impl Into<String>) -> DdlError {
        DdlError::UnsupportedDefault {
            table: self.table.qualified_name().to_string(),
            column: self.column.name.clone(),
            reason: reason.into(),
        }
    }

    fn canonical(&self) -> String {
        types::normalized(&self.column.data_type)
    }

    fn is_postgres(&self) -> bool {
        self.caps.family() == DialectFamily::Postgres
    }

    /// `'text'::type` on the Postgres family, the plain literal otherwise.
    fn cast(&self, text: &str) -> String {
        if self.is_postgres() {
            format!("{}::{}", quote_literal(text), self.column.declared_type())
        } else {
            quote_literal(text)
        }
    }

    /// An expression as written, parenthesised on SQLite unless it is one
    /// of the bare forms SQLite accepts.
    fn expression(&self, expr: &str) -> String {
        let expr = expr.trim();
        if self.is_postgres() || SQLITE_BARE_DEFAULT.is_match(expr) || is_parenthesized(expr) {
            expr.to_string()
        } else {
            format!("({expr})")
        }
    }

    fn sentinel(&self, sentinel: Sentinel) -> Result<String> {
        let canonical = self.canonical();
        match sentinel {
            Sentinel::EmptyObject => {
                if types::is_json(&canonical) {
                    Ok(self.cast("{}"))
                } else if types::is_textual(&canonical) || !self.is_postgres() {
                    Ok(quote_literal("{}"))
                } else {
                    Err(self.unsupported(format!(
                        "an empty object needs a json or text column, found '{}'",
                        self.column.data_type
                    )))
                }
            }
            Sentinel::EmptyArray => {
                if self.column.is_array() && self.is_postgres() {
                    Ok(self.cast("{}"))
                } else if types::is_json(&canonical) {
                    Ok(self.cast("[]"))
                } else if types::is_textual(&canonical)
                    || self.column.is_array()
                    || !self.is_postgres()
                {
                    Ok(quote_literal("[]"))
                } else {
                    Err(self.unsupported(format!(
                        "an empty array needs an array, json or text column, found '{}'",
                        self.column.data_type
                    )))
                }
            }
            Sentinel::GenRandomUuid => Ok(match self.caps.family() {
                DialectFamily::Postgres => "gen_random_uuid()".to_string(),
                DialectFamily::Sqlite => SQLITE_RANDOM_UUID.to_string(),
            }),
            Sentinel::CurrentTimestamp => Ok("CURRENT_TIMESTAMP".to_string()),
            Sentinel::CurrentDate => Ok("CURRENT_DATE".to_string()),
            Sentinel::UniqueRowId => {
                if self.caps.dialect == Dialect::CockroachDb {
                    Ok("unique_rowid()".to_string())
                } else {
                    Err(self.unsupported(format!(
                        "unique_rowid() is not available on {}",
                        self.caps.dialect
                    )))
                }
            }
        }
    }

    fn literal(&self, literal: &Literal) -> Result<String> {
        match literal {
            Literal::Null => Ok("NULL".to_string()),
            Literal::Boolean(value) => Ok(match (self.caps.family(), *value) {
                (DialectFamily::Postgres, true) => "TRUE".to_string(),
                (DialectFamily::Postgres, false) => "FALSE".to_string(),
                (DialectFamily::Sqlite, true) => "1".to_string(),
                (DialectFamily::Sqlite, false) => "0".to_string(),
            }),
            Literal::Integer(value) => Ok(value.to_string()),
            Literal::Float(value) if value.is_finite() => Ok(value.to_string()),
            Literal::Float(value) => Err(self.unsupported(format!("{value} is not a finite number"))),
            Literal::String(value) if is_sql_expression(value) => Ok(self.expression(value)),
            Literal::String(value) => Ok(quote_literal(value)),
            Literal::Json(value) => self.json(value),
        }
    }

    fn json(&self, value: &Value) -> Result<String> {
        if self.column.is_array() && self.is_postgres() {
            let Value::Array(items) = value else {
                return Err(self.unsupported("an array column needs a JSON array default"));
            };
            let text = array_literal(items).ok_or_else(|| {
                self.unsupported("array defaults may only hold scalars and nested arrays")
            })?;
            return Ok(self.cast(&text));
        }
        let serialized = value.to_string();
        if types::is_json(&self.canonical()) {
            Ok(self.cast(&serialized))
        } else {
            Ok(quote_literal(&serialized))
        }
    }
}

/// Whether the first parenthesis of `expr` closes at its last character.
fn is_parenthesized(expr: &str) -> bool {
    if !expr.starts_with('(') {
        return false;
    }
    let mut depth = 0usize;
    let mut quoted = false;
    for (i, c) in expr.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i + 1 == expr.len();
                }
            }
            _ => {}
        }
    }
    false
}

/// Postgres array input syntax: `["a", 1]` → `{"a",1}`.
fn array_literal(items: &[Value]) -> Option<String> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        let part = match item {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Value::Array(inner) => array_literal(inner)?,
            Value::Object(_) => return None,
        };
        parts.push(part);
    }
    Some(format!("{{{}}}", parts.join(",")))
}
