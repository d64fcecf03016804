//! Regex-driven rewriting of SQL scripts for platforms that reject parts
//! of the PostgreSQL or SQLite surface.
//!
//! Each dialect owns an ordered [`RuleSet`]. [`rewrite`] applies the rules
//! one after the other to the whole script, so a rule sees the output of
//! the rules before it. Order is part of each set's contract: Nile strips
//! function and trigger definitions before it looks for `GRANT` or policy
//! statements, which keeps those rules from matching inside a function
//! body.
//!
//! ```rust
//! use oxide_ddl_core::capability::Dialect;
//! use oxide_ddl_core::transform::rewrite;
//!
//! let result = rewrite("CREATE UNLOGGED TABLE cache (k text);", Dialect::CockroachDb);
//! assert_eq!(result.sql, "CREATE TABLE cache (k text);");
//! assert_eq!(result.changes[0].rule, "CRDB-TF-003");
//! ```

mod rules;

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::capability::Dialect;

/// How far a rule's replacement reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    /// Exactly the text the pattern matched.
    Match,
    /// The pattern matches a statement head; the statement runs through
    /// its quoted body (`$tag$ … $tag$` or `'…'`) to the next semicolon.
    /// Heads without a closed body are left alone.
    QuotedBody,
}

/// One rewrite rule.
#[derive(Debug, Clone)]
pub struct TransformRule {
    /// Stable rule code (`NILE-TF-001`).
    pub code: &'static str,
    /// What the rule does.
    pub description: &'static str,
    /// What the rule matches.
    pub pattern: Regex,
    /// Replacement text; may reference capture groups (`$1`).
    pub replacement: &'static str,
    /// How far a match is extended before it is replaced.
    pub extent: Extent,
}

/// A replaced span of the script.
#[derive(Debug)]
struct Edit {
    range: Range<usize>,
    replacement: String,
}

impl TransformRule {
    /// Compiles a rule. Only called while building the static rule sets.
    fn new(
        code: &'static str,
        description: &'static str,
        pattern: &str,
        replacement: &'static str,
    ) -> Self {
        Self {
            code,
            description,
            pattern: Regex::new(pattern).expect("Invalid transform rule regex"),
            replacement,
            extent: Extent::Match,
        }
    }

    const fn spanning_quoted_body(mut self) -> Self {
        self.extent = Extent::QuotedBody;
        self
    }

    /// Non-overlapping edits in script order.
    fn edits(&self, sql: &str) -> Vec<Edit> {
        match self.extent {
            Extent::Match => self
                .pattern
                .captures_iter(sql)
                .filter_map(|caps| {
                    let whole = caps.get(0)?;
                    let mut replacement = String::new();
                    caps.expand(self.replacement, &mut replacement);
                    Some(Edit {
                        range: whole.range(),
                        replacement,
                    })
                })
                .collect(),
            Extent::QuotedBody => {
                let mut edits = Vec::new();
                let mut cursor = 0;
                for head in self.pattern.find_iter(sql) {
                    if head.start() < cursor {
                        continue;
                    }
                    if let Some(end) = quoted_statement_end(sql, head.end()) {
                        edits.push(Edit {
                            range: head.start()..end,
                            replacement: self.replacement.to_string(),
                        });
                        cursor = end;
                    }
                }
                edits
            }
        }
    }
}

static BODY_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:[A-Za-z_][A-Za-z0-9_]*)?\$|(?i:\bAS\s+')").expect("Invalid body quote regex")
});

/// End of the statement whose head ends at `from`: past its quoted body,
/// the next semicolon and the rest of that line.
fn quoted_statement_end(sql: &str, from: usize) -> Option<usize> {
    let rest = &sql[from..];
    let open = BODY_OPEN.find(rest)?;
    // A semicolon before the body means the head belongs to another
    // statement shape.
    if rest[..open.start()].contains(';') {
        return None;
    }
    let body = open.end();
    let close = if open.as_str().starts_with('$') {
        let tag = open.as_str();
        body + rest[body..].find(tag)? + tag.len()
    } else {
        body + closing_quote(&rest[body..])?
    };
    let semicolon = close + rest[close..].find(';')?;
    Some(from + semicolon + 1 + line_end_len(&rest[semicolon + 1..]))
}

/// Length of a single-quoted body up to and including its closing quote.
/// `''` is an escaped quote.
fn closing_quote(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

/// Trailing blanks and one line break, as `LINE_END` in the rule lists.
fn line_end_len(rest: &str) -> usize {
    let trimmed = rest.trim_start_matches([' ', '\t']);
    let blanks = rest.len() - trimmed.len();
    if trimmed.starts_with("\r\n") {
        blanks + 2
    } else if trimmed.starts_with('\n') {
        blanks + 1
    } else {
        blanks
    }
}

fn splice(sql: &str, edits: &[Edit]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    for edit in edits {
        out.push_str(&sql[last..edit.range.start]);
        out.push_str(&edit.replacement);
        last = edit.range.end;
    }
    out.push_str(&sql[last..]);
    out
}

/// An ordered list of rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<TransformRule>,
}

impl RuleSet {
    /// The rules in application order.
    #[must_use]
    pub fn rules(&self) -> &[TransformRule] {
        &self.rules
    }

    /// Rule codes in application order.
    #[must_use]
    pub fn codes(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.code).collect()
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set rewrites nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// What one rule changed in a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformChange {
    /// Code of the rule that fired.
    pub rule: &'static str,
    /// Description of the rule that fired.
    pub description: &'static str,
    /// Every matched fragment, trimmed, one per line.
    pub original: String,
    /// What the first fragment was replaced with, trimmed.
    pub replacement: String,
    /// Number of fragments replaced.
    pub matches: usize,
}

/// Outcome of [`rewrite`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteResult {
    /// The rewritten script.
    pub sql: String,
    /// One entry per rule that changed the script, in rule order.
    pub changes: Vec<TransformChange>,
    /// Whether the script differs from the input.
    pub modified: bool,
}

static NILE: LazyLock<RuleSet> = LazyLock::new(rules::nile);
static COCKROACHDB: LazyLock<RuleSet> = LazyLock::new(rules::cockroachdb);
static D1: LazyLock<RuleSet> = LazyLock::new(rules::d1);
static IDENTITY: LazyLock<RuleSet> = LazyLock::new(RuleSet::default);

/// The rule set of `dialect`. PostgreSQL and SQLite have no rules.
#[must_use]
pub fn rule_set_for(dialect: Dialect) -> &'static RuleSet {
    match dialect {
        Dialect::Nile => &NILE,
        Dialect::CockroachDb => &COCKROACHDB,
        Dialect::D1 => &D1,
        Dialect::Postgres | Dialect::Sqlite => &IDENTITY,
    }
}

/// Rewrites `sql` with the rule set of `dialect`.
#[must_use]
pub fn rewrite(sql: &str, dialect: Dialect) -> RewriteResult {
    apply(sql, rule_set_for(dialect))
}

/// Rewrites `sql` with an explicit rule set.
#[must_use]
pub fn apply(sql: &str, rules: &RuleSet) -> RewriteResult {
    let mut current = sql.to_string();
    let mut changes = Vec::new();

    for rule in rules.rules() {
        let edits = rule.edits(&current);
        let Some(first) = edits.first() else {
            continue;
        };
        let rewritten = splice(&current, &edits);
        if rewritten == current {
            continue;
        }
        changes.push(TransformChange {
            rule: rule.code,
            description: rule.description,
            original: edits
                .iter()
                .map(|e| current[e.range.clone()].trim())
                .collect::<Vec<_>>()
                .join("\n"),
            replacement: first.replacement.trim().to_string(),
            matches: edits.len(),
        });
        debug!(rule = rule.code, matches = edits.len(), "Applied transform rule");
        current = rewritten;
    }

    RewriteResult {
        modified: current != sql,
        sql: current,
        changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn codes(result: &RewriteResult) -> Vec<&'static str> {
        result.changes.iter().map(|c| c.rule).collect()
    }

    #[test]
    fn rule_order_is_stable() {
        assert_eq!(
            rule_set_for(Dialect::Nile).codes(),
            vec![
                "NILE-TF-001",
                "NILE-TF-002",
                "NILE-TF-003",
                "NILE-TF-004",
                "NILE-TF-005",
                "NILE-TF-006",
                "NILE-TF-007",
                "NILE-TF-008",
            ]
        );
        assert_eq!(
            rule_set_for(Dialect::CockroachDb).codes(),
            vec!["CRDB-TF-001", "CRDB-TF-002", "CRDB-TF-003"]
        );
        assert_eq!(rule_set_for(Dialect::D1).codes(), vec!["D1-TF-001", "D1-TF-002"]);
        assert!(rule_set_for(Dialect::Postgres).is_empty());
        assert!(rule_set_for(Dialect::Sqlite).is_empty());
    }

    #[test]
    fn nile_strips_unsupported_statements() {
        let sql = concat!(
            "CREATE EXTENSION IF NOT EXISTS \"uuid-ossp\";\n",
            "CREATE TABLE todos (\n",
            "    id uuid DEFAULT uuid_generate_v4(),\n",
            "    tenant_id uuid NOT NULL\n",
            ");\n",
            "CREATE FUNCTION touch() RETURNS trigger LANGUAGE plpgsql AS $$\n",
            "BEGIN\n",
            "    NEW.updated_at = now();\n",
            "    RETURN NEW;\n",
            "END;\n",
            "$$;\n",
            "CREATE TRIGGER todos_touch BEFORE UPDATE ON todos FOR EACH ROW EXECUTE FUNCTION touch();\n",
            "ALTER TABLE todos ENABLE ROW LEVEL SECURITY;\n",
            "CREATE POLICY own ON todos USING (tenant_id = current_setting('app.tenant')::uuid);\n",
            "GRANT SELECT ON todos TO app;\n",
        );
        let result = rewrite(sql, Dialect::Nile);
        assert_eq!(
            result.sql,
            "CREATE TABLE todos (\n    id uuid DEFAULT gen_random_uuid(),\n    tenant_id uuid NOT NULL\n);\n"
        );
        assert!(result.modified);
        assert_eq!(
            codes(&result),
            vec![
                "NILE-TF-001",
                "NILE-TF-002",
                "NILE-TF-003",
                "NILE-TF-004",
                "NILE-TF-005",
                "NILE-TF-007",
                "NILE-TF-008",
            ]
        );
        assert_eq!(result.changes[6].original, "uuid_generate_v4()");
        assert_eq!(result.changes[6].replacement, "gen_random_uuid()");
        assert_eq!(result.changes[4].original, "GRANT SELECT ON todos TO app;");
        assert_eq!(result.changes[4].replacement, "");
    }

    #[test]
    fn function_bodies_are_removed_before_grants_are_searched() {
        let sql = concat!(
            "CREATE OR REPLACE FUNCTION setup() RETURNS void LANGUAGE plpgsql AS $$\n",
            "BEGIN\n",
            "    GRANT SELECT ON todos TO app;\n",
            "END;\n",
            "$$;\n",
        );
        let result = rewrite(sql, Dialect::Nile);
        assert_eq!(result.sql, "");
        assert_eq!(codes(&result), vec!["NILE-TF-001"]);
    }

    #[test]
    fn cockroach_rewrites() {
        let sql = "CREATE EXTENSION pgcrypto;\nCREATE UNLOGGED TABLE cache (id uuid DEFAULT UUID_GENERATE_V4());\n";
        let result = rewrite(sql, Dialect::CockroachDb);
        assert_eq!(result.sql, "CREATE TABLE cache (id uuid DEFAULT gen_random_uuid());\n");
        assert_eq!(codes(&result), vec!["CRDB-TF-001", "CRDB-TF-002", "CRDB-TF-003"]);
    }

    #[test]
    fn d1_strips_transactions_and_foreign_key_pragmas() {
        let sql = concat!(
            "PRAGMA foreign_keys = ON;\n",
            "BEGIN TRANSACTION;\n",
            "CREATE TABLE t (a INTEGER);\n",
            "CREATE TRIGGER t_ai AFTER INSERT ON t FOR EACH ROW\n",
            "BEGIN\n",
            "    DELETE FROM t WHERE a < 0;\n",
            "END;\n",
            "PRAGMA defer_foreign_keys = ON;\n",
            "COMMIT;\n",
        );
        let result = rewrite(sql, Dialect::D1);
        assert_eq!(
            result.sql,
            concat!(
                "CREATE TABLE t (a INTEGER);\n",
                "CREATE TRIGGER t_ai AFTER INSERT ON t FOR EACH ROW\n",
                "BEGIN\n",
                "    DELETE FROM t WHERE a < 0;\n",
                "END;\n",
                "PRAGMA defer_foreign_keys = ON;\n",
            )
        );
        assert_eq!(codes(&result), vec!["D1-TF-001", "D1-TF-002"]);
        assert_eq!(result.changes[0].matches, 2);
        assert_eq!(result.changes[0].original, "BEGIN TRANSACTION;\nCOMMIT;");
    }

    #[test]
    fn one_change_per_rule_that_fired() {
        let result = rewrite("BEGIN;\nCREATE TABLE t (a INTEGER);\nCOMMIT;\n", Dialect::D1);
        assert_eq!(result.sql, "CREATE TABLE t (a INTEGER);\n");
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].matches, 2);
        assert_eq!(result.changes[0].replacement, "");
    }

    #[test]
    fn custom_dollar_tags_stay_within_their_function() {
        let sql = concat!(
            "CREATE FUNCTION a() RETURNS int LANGUAGE sql AS $body$ SELECT 1 $body$;\n",
            "CREATE TABLE keep (id uuid, tenant_id uuid);\n",
            "CREATE FUNCTION b() RETURNS int LANGUAGE sql AS $$ SELECT 2 $$;\n",
        );
        let result = rewrite(sql, Dialect::Nile);
        assert_eq!(result.sql, "CREATE TABLE keep (id uuid, tenant_id uuid);\n");
        assert_eq!(codes(&result), vec!["NILE-TF-001"]);
        assert_eq!(result.changes[0].matches, 2);
    }

    #[test]
    fn nested_dollar_quotes_close_on_their_own_tag() {
        let sql = concat!(
            "CREATE OR REPLACE FUNCTION run() RETURNS void AS $outer$\n",
            "BEGIN\n",
            "    EXECUTE $$GRANT SELECT ON t TO app$$;\n",
            "END;\n",
            "$outer$ LANGUAGE plpgsql;\n",
            "CREATE TABLE t (id uuid);\n",
        );
        let result = rewrite(sql, Dialect::Nile);
        assert_eq!(result.sql, "CREATE TABLE t (id uuid);\n");
        assert_eq!(codes(&result), vec!["NILE-TF-001"]);
    }

    #[test]
    fn single_quoted_bodies_are_removed_whole() {
        let sql = concat!(
            "CREATE FUNCTION add_one(i integer) RETURNS integer\n",
            "    AS 'SELECT i + 1; -- it''s fine' LANGUAGE sql IMMUTABLE;\n",
            "CREATE TABLE t (id uuid);\n",
        );
        let result = rewrite(sql, Dialect::Nile);
        assert_eq!(result.sql, "CREATE TABLE t (id uuid);\n");
        assert_eq!(codes(&result), vec!["NILE-TF-001"]);
    }

    #[test]
    fn unclosed_bodies_are_left_alone() {
        let sql = "CREATE FUNCTION f() RETURNS int AS $x$ SELECT 1;\nCREATE TABLE t (id uuid);\n";
        let result = rewrite(sql, Dialect::Nile);
        assert_eq!(result.sql, sql);
        assert!(result.changes.is_empty());
    }

    #[test]
    fn statements_after_a_trigger_are_handled_separately() {
        let sql = concat!(
            "CREATE TRIGGER t_audit AFTER INSERT ON t FOR EACH ROW EXECUTE FUNCTION audit();\n",
            "GRANT SELECT ON t TO app; CREATE TABLE u (id uuid);\n",
            "CREATE POLICY p ON t USING (true);\n",
            "CREATE TABLE v (id uuid);\n",
        );
        let result = rewrite(sql, Dialect::Nile);
        assert_eq!(result.sql, "CREATE TABLE u (id uuid);\nCREATE TABLE v (id uuid);\n");
        assert_eq!(codes(&result), vec!["NILE-TF-002", "NILE-TF-004", "NILE-TF-005"]);
    }

    #[test]
    fn identity_dialects_leave_sql_alone() {
        let sql = "CREATE EXTENSION pgcrypto;\nGRANT ALL ON t TO app;\n";
        for dialect in [Dialect::Postgres, Dialect::Sqlite] {
            let result = rewrite(sql, dialect);
            assert_eq!(result.sql, sql);
            assert!(!result.modified);
            assert!(result.changes.is_empty());
        }
    }

    #[test]
    fn untouched_scripts_are_not_modified() {
        let result = rewrite("CREATE TABLE t (id uuid);\n", Dialect::Nile);
        assert!(!result.modified);
        assert!(result.changes.is_empty());
    }
}
