//! The per-dialect rule lists.

use super::{RuleSet, TransformRule};

/// Whole statements are matched from the start of their line up to and
/// including the terminating semicolon and line break.
const LINE_END: &str = r";[ \t]*(?:\r?\n)?";

fn statement(head: &str) -> String {
    format!(r"(?im)^[ \t]*{head}[^;]*{LINE_END}")
}

fn create_extension() -> String {
    statement(r"CREATE\s+EXTENSION\b")
}

const UUID_GENERATE_V4: &str = r"(?i)\buuid_generate_v4\s*\(\s*\)";

pub(super) fn nile() -> RuleSet {
    RuleSet {
        rules: vec![
            TransformRule::new(
                "NILE-TF-001",
                "Remove function definitions",
                r"(?im)^[ \t]*CREATE\s+(?:OR\s+REPLACE\s+)?(?:FUNCTION|PROCEDURE)\b",
                "",
            )
            .spanning_quoted_body(),
            TransformRule::new(
                "NILE-TF-002",
                "Remove trigger definitions",
                &format!(
                    r"(?im)^[ \t]*CREATE\s+(?:OR\s+REPLACE\s+)?(?:CONSTRAINT\s+)?TRIGGER\b[^;]*?\bEXECUTE\s+(?:FUNCTION|PROCEDURE)\s+[^;]*{LINE_END}"
                ),
                "",
            ),
            TransformRule::new(
                "NILE-TF-003",
                "Remove row-level security toggles",
                &format!(
                    r"(?im)^[ \t]*ALTER\s+TABLE\s+[^;]*?\b(?:ENABLE|DISABLE|(?:NO\s+)?FORCE)\s+ROW\s+LEVEL\s+SECURITY\s*{LINE_END}"
                ),
                "",
            ),
            TransformRule::new(
                "NILE-TF-004",
                "Remove row-level security policies",
                &statement(r"(?:CREATE|ALTER|DROP)\s+POLICY\b"),
                "",
            ),
            TransformRule::new("NILE-TF-005", "Remove GRANT statements", &statement(r"GRANT\b"), ""),
            TransformRule::new("NILE-TF-006", "Remove REVOKE statements", &statement(r"REVOKE\b"), ""),
            TransformRule::new(
                "NILE-TF-007",
                "Remove CREATE EXTENSION statements",
                &create_extension(),
                "",
            ),
            TransformRule::new(
                "NILE-TF-008",
                "Replace uuid_generate_v4() with gen_random_uuid()",
                UUID_GENERATE_V4,
                "gen_random_uuid()",
            ),
        ],
    }
}

pub(super) fn cockroachdb() -> RuleSet {
    RuleSet {
        rules: vec![
            TransformRule::new(
                "CRDB-TF-001",
                "Remove CREATE EXTENSION statements",
                &create_extension(),
                "",
            ),
            TransformRule::new(
                "CRDB-TF-002",
                "Replace uuid_generate_v4() with gen_random_uuid()",
                UUID_GENERATE_V4,
                "gen_random_uuid()",
            ),
            TransformRule::new(
                "CRDB-TF-003",
                "Drop the UNLOGGED table modifier",
                r"(?i)\bCREATE\s+UNLOGGED\s+TABLE\b",
                "CREATE TABLE",
            ),
        ],
    }
}

pub(super) fn d1() -> RuleSet {
    RuleSet {
        rules: vec![
            TransformRule::new(
                "D1-TF-001",
                "Remove explicit transaction statements",
                &format!(
                    r"(?im)^[ \t]*(?:BEGIN(?:\s+(?:DEFERRED|IMMEDIATE|EXCLUSIVE))?(?:\s+TRANSACTION)?|COMMIT(?:\s+TRANSACTION)?|END\s+TRANSACTION|ROLLBACK(?:\s+TRANSACTION)?)\s*{LINE_END}"
                ),
                "",
            ),
            TransformRule::new(
                "D1-TF-002",
                "Remove PRAGMA foreign_keys statements",
                &statement(r"PRAGMA\s+foreign_keys\b"),
                "",
            ),
        ],
    }
}
