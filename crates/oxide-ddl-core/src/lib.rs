//! # oxide-ddl-core
//!
//! Dialect-aware schema validation, DDL generation and migration planning.
//!
//! This crate provides:
//! - A schema model describing tables, columns, constraints, indexes and
//!   the other objects a schema can hold
//! - A capability registry for PostgreSQL, CockroachDB, Nile, SQLite and
//!   Cloudflare D1
//! - A validator reporting what a dialect cannot express
//! - DDL generators for the PostgreSQL and SQLite families
//! - A differ turning two schema snapshots into an ordered migration plan
//! - A rule engine rewriting SQL scripts for restricted platforms
//!
//! Everything is synchronous and pure: functions take immutable input and
//! return data, so they can be called from any thread.
//!
//! ## Validate, then generate
//!
//! ```rust
//! use oxide_ddl_core::prelude::*;
//!
//! let schema = SchemaModel::new().with_table(
//!     TableDefinition::builder("orders")
//!         .column(bigint("id").primary_key().auto_increment().build())
//!         .column(text("order").not_null().build())
//!         .build(),
//! );
//!
//! let caps = capabilities_for(Dialect::Postgres);
//! assert!(validate(&schema, caps).unwrap().valid);
//!
//! let generator = generator_for(Dialect::Postgres);
//! let statements = generator
//!     .generate_schema(&schema, &GenerateOptions::default())
//!     .unwrap();
//! assert_eq!(
//!     statements[0].sql,
//!     "CREATE TABLE orders (\n    id BIGSERIAL PRIMARY KEY,\n    \"order\" text NOT NULL\n)"
//! );
//! ```
//!
//! ## Plan a migration
//!
//! ```rust
//! use oxide_ddl_core::prelude::*;
//!
//! let from = SchemaModel::new().with_table(
//!     TableDefinition::builder("t")
//!         .column(integer("a").build())
//!         .column(text("b").build())
//!         .build(),
//! );
//! let to = SchemaModel::new().with_table(
//!     TableDefinition::builder("t").column(integer("a").build()).build(),
//! );
//!
//! let generator = generator_for(Dialect::Sqlite);
//! let plan = plan_migration(&from, &to, generator.as_ref(), &GenerateOptions::default()).unwrap();
//! assert_eq!(plan.statements.len(), 1);
//! assert!(plan.has_destructive());
//! ```

pub mod capability;
pub mod diff;
pub mod error;
pub mod generate;
pub mod schema;
pub mod tracking;
pub mod transform;
pub mod validate;

pub use capability::{capabilities_for, Dialect, DialectCapabilitySet, Feature};
pub use diff::{plan_migration, MigrationPlan, PlanWarning};
pub use error::{DdlError, Result};
pub use generate::{generator_for, DdlGenerator, GenerateOptions, GeneratedStatement};
pub use schema::{ColumnDefinition, IndexDefinition, SchemaModel, TableDefinition};
pub use transform::{rewrite, RewriteResult};
pub use validate::{validate, ValidationIssue, ValidationResult, Validator};

/// The common imports.
pub mod prelude {
    pub use crate::capability::{capabilities_for, Dialect, DialectFamily, Feature};
    pub use crate::diff::{plan_migration, MigrationPlan, PlanWarning};
    pub use crate::error::{DdlError, Result};
    pub use crate::generate::{
        generator_for, DdlGenerator, GenerateOptions, GeneratedStatement, Operation,
        StatementKind,
    };
    pub use crate::schema::{
        bigint, boolean, column, date, integer, jsonb, numeric, smallint, text, timestamp,
        timestamptz, uuid, varchar, ConstraintBuilder, IndexDefinition, QualifiedName,
        SchemaModel, TableDefinition,
    };
    pub use crate::transform::rewrite;
    pub use crate::validate::{validate, FeatureCode, Severity, ValidationResult, Validator};
}
