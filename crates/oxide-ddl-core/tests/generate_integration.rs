//! Integration tests for DDL generation.
//!
//! These tests render whole schemas through `generator_for()` and check
//! quoting, statement order and the refusal paths of each family.

mod common;

use common::{blog, generate, invoices, position};
use oxide_ddl_core::capability::Dialect;
use oxide_ddl_core::generate::{generator_for, GenerateOptions, Operation};
use oxide_ddl_core::schema::{text, SchemaModel, TableDefinition};
use oxide_ddl_core::DdlError;
use pretty_assertions::assert_eq;

#[test]
fn reserved_words_are_quoted_and_plain_names_are_not() {
    let schema = SchemaModel::from_tables(vec![invoices()]);
    for dialect in Dialect::ALL {
        let sql = &generate(&schema, dialect)[0];
        assert!(sql.contains("\n    \"order\" integer NOT NULL"), "{dialect}: {sql}");
        assert!(sql.contains("\n    amount numeric(10, 2)"), "{dialect}: {sql}");
        assert!(!sql.contains("\"amount\""), "{dialect}: {sql}");
        assert!(sql.starts_with("CREATE TABLE invoices ("), "{dialect}: {sql}");
    }
}

#[test]
fn tables_follow_foreign_keys_and_indexes_follow_tables() {
    for dialect in [Dialect::Postgres, Dialect::Sqlite] {
        let statements = generate(&blog(), dialect);
        let authors = position(&statements, "CREATE TABLE authors");
        let posts = position(&statements, "CREATE TABLE posts");
        let comments = position(&statements, "CREATE TABLE comments");
        let index = position(&statements, "CREATE INDEX idx_posts_author");
        assert!(authors < posts && posts < comments, "{dialect}: {statements:#?}");
        assert!(comments < index, "{dialect}: {statements:#?}");
    }
}

#[test]
fn foreign_key_actions_are_rendered() {
    let statements = generate(&blog(), Dialect::Postgres);
    let comments = &statements[position(&statements, "CREATE TABLE comments")];
    assert!(comments.contains("FOREIGN KEY (post_id) REFERENCES posts (id) ON DELETE CASCADE"));
    assert!(comments.contains("author_id bigint REFERENCES authors (id)"));
}

#[test]
fn json_snapshots_render() {
    let json = r#"{
        "tables": [{
            "name": "events",
            "columns": [
                {"name": "id", "data_type": "bigint", "nullable": false,
                 "primary_key": true, "auto_increment": true},
                {"name": "payload", "data_type": "jsonb",
                 "default": {"sentinel": "empty_object"}}
            ],
            "indexes": [{
                "name": "idx_events_payload",
                "table": "events",
                "columns": [{"target": {"column": "payload"}}],
                "method": "gin"
            }]
        }]
    }"#;
    let schema: SchemaModel = serde_json::from_str(json).unwrap();

    let statements = generator_for(Dialect::Postgres)
        .generate_schema(&schema, &GenerateOptions::default())
        .unwrap();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[0].sql,
        "CREATE TABLE events (\n    id BIGSERIAL PRIMARY KEY,\n    payload jsonb DEFAULT '{}'::jsonb\n)"
    );
    assert_eq!(statements[1].operation, Operation::CreateIndex);
    assert_eq!(
        statements[1].sql,
        "CREATE INDEX idx_events_payload ON events USING gin (payload)"
    );

    let err = generator_for(Dialect::Sqlite)
        .generate_schema(&schema, &GenerateOptions::default())
        .unwrap_err();
    assert!(
        matches!(err, DdlError::UnsupportedConstruct { ref object, .. } if object == "idx_events_payload"),
        "{err}"
    );
}

#[test]
fn if_not_exists_reaches_every_create() {
    let options = GenerateOptions {
        if_not_exists: true,
        ..GenerateOptions::default()
    };
    let statements = generator_for(Dialect::Sqlite)
        .generate_schema(&blog(), &options)
        .unwrap();
    assert!(statements
        .iter()
        .all(|s| s.sql.starts_with("CREATE TABLE IF NOT EXISTS") || s.sql.starts_with("CREATE INDEX IF NOT EXISTS")));
}

#[test]
fn sqlite_expression_defaults_are_parenthesised() {
    let table = TableDefinition::builder("codes")
        .column(text("code").default_str("lower('X')").build())
        .column(text("at").default_raw("datetime('now')").build())
        .column(text("seen").default_str("CURRENT_TIMESTAMP").build())
        .build();
    let sql = &generate(&SchemaModel::from_tables(vec![table]), Dialect::Sqlite)[0];
    assert_eq!(
        sql,
        "CREATE TABLE codes (\n    code text DEFAULT (lower('X')),\n    at text DEFAULT (datetime('now')),\n    seen text DEFAULT CURRENT_TIMESTAMP\n)"
    );

    let from = TableDefinition::builder("codes").column(text("code").build()).build();
    let to = TableDefinition::builder("codes")
        .column(text("code").build())
        .column(text("at").default_raw("datetime('now')").build())
        .build();
    let statements = generator_for(Dialect::D1)
        .generate_alter_table(&from, &to, &GenerateOptions::default())
        .unwrap();
    // A non-constant default cannot be added in place; the shadow table
    // carries it instead.
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].operation, Operation::RecreateTable);
    assert!(
        statements[0].sql.contains("\n    at text DEFAULT (datetime('now'))\n"),
        "{}",
        statements[0].sql
    );
}
