//! Schema objects other than tables: enum types, sequences, functions,
//! triggers, row-level-security policies, views and extensions.

use serde::{Deserialize, Serialize};

use super::QualifiedName;

/// `CREATE TYPE name AS ENUM (...)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    /// Type name.
    pub name: QualifiedName,
    /// Labels in declaration order.
    pub values: Vec<String>,
}

/// A standalone sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDefinition {
    /// Sequence name.
    pub name: QualifiedName,
    /// Owning `table.column`, when the sequence backs a column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
    /// START WITH.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    /// INCREMENT BY.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment: Option<i64>,
}

impl SequenceDefinition {
    /// The table name part of `owned_by`.
    #[must_use]
    pub fn owning_table(&self) -> Option<&str> {
        self.owned_by
            .as_deref()
            .and_then(|o| o.rsplit_once('.').map(|(table, _)| table))
    }
}

/// Body of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionBody {
    /// Body text emitted verbatim between dollar quotes.
    Raw(String),
    /// A list of statements joined with `;` inside a `BEGIN ... END` block
    /// (plpgsql) or emitted as-is (sql).
    Statements(Vec<String>),
}

/// Function volatility category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volatility {
    /// IMMUTABLE.
    Immutable,
    /// STABLE.
    Stable,
    /// VOLATILE.
    Volatile,
}

impl Volatility {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Immutable => "IMMUTABLE",
            Self::Stable => "STABLE",
            Self::Volatile => "VOLATILE",
        }
    }
}

/// A stored function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name.
    pub name: QualifiedName,
    /// Argument list as written (`a integer, b text`).
    #[serde(default)]
    pub arguments: String,
    /// Return type (`trigger`, `integer`, `SETOF users`, ...).
    pub returns: String,
    /// Language (`plpgsql`, `sql`, ...).
    pub language: String,
    /// Function body.
    pub body: FunctionBody,
    /// Volatility, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility: Option<Volatility>,
    /// Emit `CREATE OR REPLACE`.
    #[serde(default)]
    pub or_replace: bool,
}

/// When a trigger fires relative to the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerTiming {
    /// BEFORE.
    Before,
    /// AFTER.
    After,
    /// INSTEAD OF.
    InsteadOf,
}

impl TriggerTiming {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Before => "BEFORE",
            Self::After => "AFTER",
            Self::InsteadOf => "INSTEAD OF",
        }
    }
}

/// Event a trigger reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerEvent {
    /// INSERT.
    Insert,
    /// UPDATE.
    Update,
    /// DELETE.
    Delete,
    /// TRUNCATE.
    Truncate,
}

impl TriggerEvent {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
        }
    }
}

/// A table trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDefinition {
    /// Trigger name.
    pub name: String,
    /// Table the trigger is attached to.
    pub table: QualifiedName,
    /// Timing.
    pub timing: TriggerTiming,
    /// Events, at least one.
    pub events: Vec<TriggerEvent>,
    /// FOR EACH ROW (true) or FOR EACH STATEMENT.
    #[serde(default = "default_true")]
    pub for_each_row: bool,
    /// Optional WHEN condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Function to execute (Postgres family).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<QualifiedName>,
    /// Inline body statements (SQLite family).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<String>,
}

const fn default_true() -> bool {
    true
}

/// Command a policy applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyCommand {
    /// ALL.
    #[default]
    All,
    /// SELECT.
    Select,
    /// INSERT.
    Insert,
    /// UPDATE.
    Update,
    /// DELETE.
    Delete,
}

impl PolicyCommand {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// A row-level-security policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDefinition {
    /// Policy name.
    pub name: String,
    /// Protected table.
    pub table: QualifiedName,
    /// Command the policy applies to.
    #[serde(default)]
    pub command: PolicyCommand,
    /// Roles (empty means PUBLIC).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// USING expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
    /// WITH CHECK expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_check: Option<String>,
}

/// A view or materialized view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    /// View name.
    pub name: QualifiedName,
    /// Defining query.
    pub query: String,
    /// Whether the view is materialized.
    #[serde(default)]
    pub materialized: bool,
}

/// `CREATE EXTENSION`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDefinition {
    /// Extension name.
    pub name: String,
    /// Target schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_owner_table() {
        let seq = SequenceDefinition {
            name: "orders_id_seq".into(),
            owned_by: Some("sales.orders.id".into()),
            start: None,
            increment: None,
        };
        assert_eq!(seq.owning_table(), Some("sales.orders"));
    }

    #[test]
    fn trigger_defaults_to_row_level() {
        let json = r#"{"name": "touch", "table": "users", "timing": "before",
                       "events": ["update"], "function": "set_updated_at"}"#;
        let trigger: TriggerDefinition = serde_json::from_str(json).unwrap();
        assert!(trigger.for_each_row);
        assert_eq!(trigger.timing.as_sql(), "BEFORE");
        assert_eq!(trigger.events, vec![TriggerEvent::Update]);
    }

    #[test]
    fn function_body_variants() {
        let json = r#"{"name": "add", "arguments": "a int, b int", "returns": "int",
                       "language": "sql", "body": {"raw": "SELECT a + b"}}"#;
        let f: FunctionDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(f.body, FunctionBody::Raw("SELECT a + b".into()));
        assert!(!f.or_replace);
    }
}
