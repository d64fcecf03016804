#![allow(dead_code)]

use oxide_ddl_core::capability::{capabilities_for, Dialect};
use oxide_ddl_core::diff::{plan_migration, MigrationPlan};
use oxide_ddl_core::generate::{generator_for, GenerateOptions};
use oxide_ddl_core::schema::{
    bigint, integer, numeric, text, timestamptz, uuid, varchar, ConstraintBuilder,
    ForeignKeyAction, IndexDefinition, SchemaModel, TableDefinition,
};
use oxide_ddl_core::validate::{validate, ValidationResult};

/// `users(id uuid primary key, email text not null, created_at timestamptz default now())`
pub fn users_with_uuid() -> TableDefinition {
    TableDefinition::builder("users")
        .column(uuid("id").primary_key().build())
        .column(text("email").not_null().build())
        .column(timestamptz("created_at").default_raw("now()").build())
        .build()
}

/// A table with one reserved-word column and one plain column.
pub fn invoices() -> TableDefinition {
    TableDefinition::builder("invoices")
        .column(bigint("id").primary_key().build())
        .column(integer("order").not_null().build())
        .column(numeric("amount", 10, 2).build())
        .build()
}

/// Three tables linked by foreign keys, declared children first.
pub fn blog() -> SchemaModel {
    SchemaModel::from_tables(vec![
        TableDefinition::builder("comments")
            .column(bigint("id").primary_key().build())
            .column(bigint("post_id").not_null().build())
            .column(bigint("author_id").references("authors", "id").build())
            .column(text("body").not_null().build())
            .constraint(
                ConstraintBuilder::foreign_key(["post_id"], "posts", ["id"])
                    .on_delete(ForeignKeyAction::Cascade)
                    .build(),
            )
            .build(),
        TableDefinition::builder("posts")
            .column(bigint("id").primary_key().build())
            .column(bigint("author_id").not_null().references("authors", "id").build())
            .column(varchar("title", 200).not_null().build())
            .index(
                IndexDefinition::builder("idx_posts_author", "posts")
                    .column("author_id")
                    .build(),
            )
            .build(),
        TableDefinition::builder("authors")
            .column(bigint("id").primary_key().build())
            .column(text("name").not_null().build())
            .build(),
    ])
}

pub fn check(schema: &SchemaModel, dialect: Dialect) -> ValidationResult {
    validate(schema, capabilities_for(dialect))
        .unwrap_or_else(|e| panic!("Validation failed on {dialect}: {e}"))
}

pub fn generate(schema: &SchemaModel, dialect: Dialect) -> Vec<String> {
    generator_for(dialect)
        .generate_schema(schema, &GenerateOptions::default())
        .unwrap_or_else(|e| panic!("Generation failed on {dialect}: {e}"))
        .into_iter()
        .map(|s| s.sql)
        .collect()
}

pub fn plan(from: &SchemaModel, to: &SchemaModel, dialect: Dialect) -> MigrationPlan {
    let generator = generator_for(dialect);
    plan_migration(from, to, generator.as_ref(), &GenerateOptions::default())
        .unwrap_or_else(|e| panic!("Planning failed on {dialect}: {e}"))
}

/// Index of the first statement containing `needle`.
pub fn position(statements: &[String], needle: &str) -> usize {
    statements
        .iter()
        .position(|s| s.contains(needle))
        .unwrap_or_else(|| panic!("No statement contains {needle:?}:\n{statements:#?}"))
}
