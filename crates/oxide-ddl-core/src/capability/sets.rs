//! Literal capability tables.
//!
//! `postgres` and `sqlite` are base sets. Platform dialects start from their
//! family's base and apply an override list; flags they do not mention carry
//! over unchanged.

use std::collections::BTreeSet;

use crate::schema::IndexMethod;

use super::{Dialect, DialectCapabilitySet, Feature, ReservedObjects, TransactionLimits};

use super::Feature::{
    AddConstraint, AlterColumnDefault, AlterColumnNullability, AlterColumnType, Arrays, Comments,
    ConcurrentIndexes, CoveringIndexes, DropColumn, DropConstraint, Enums, ExclusionConstraints,
    ExpressionIndexes, Extensions, Functions, GeneratedColumns, Geometry, Identity, Inheritance,
    Json, Jsonb, Locality, MaterializedViews, NetworkTypes, PartialIndexes, Partitioning,
    RangeTypes, RenameColumn, RowLevelSecurity, Sequences, Serial, Tablespaces, TenantIsolation,
    TransactionalDdl, Triggers, UnloggedTables, Uuid, Views, ZoneConfig,
};

const POSTGRES_ALWAYS: &[&str] = &[
    "smallint",
    "integer",
    "bigint",
    "numeric",
    "real",
    "double precision",
    "text",
    "varchar",
    "char",
    "boolean",
    "date",
    "time",
    "timetz",
    "timestamp",
    "timestamptz",
    "interval",
    "bytea",
];

const POSTGRES_KNOWN: &[&str] = &[
    "money", "bit", "varbit", "xml", "tsvector", "tsquery", "citext", "oid", "name",
];

const SQLITE_ALWAYS: &[&str] = &["integer", "text", "blob", "real", "numeric"];

const SQLITE_KNOWN: &[&str] = &[
    "smallint",
    "bigint",
    "tinyint",
    "mediumint",
    "varchar",
    "char",
    "boolean",
    "double precision",
    "date",
    "timestamp",
    "datetime",
];

fn features(list: &[Feature]) -> BTreeSet<Feature> {
    list.iter().copied().collect()
}

pub(super) fn postgres() -> DialectCapabilitySet {
    DialectCapabilitySet {
        dialect: Dialect::Postgres,
        default_schema: "public",
        features: features(&[
            Json,
            Jsonb,
            Arrays,
            Serial,
            Identity,
            Sequences,
            Uuid,
            Enums,
            RangeTypes,
            NetworkTypes,
            Geometry,
            GeneratedColumns,
            Triggers,
            Functions,
            RowLevelSecurity,
            Views,
            MaterializedViews,
            Partitioning,
            PartialIndexes,
            CoveringIndexes,
            ExpressionIndexes,
            ConcurrentIndexes,
            ExclusionConstraints,
            TransactionalDdl,
            DropColumn,
            AlterColumnType,
            AlterColumnNullability,
            AlterColumnDefault,
            AddConstraint,
            DropConstraint,
            RenameColumn,
            Extensions,
            Comments,
            Tablespaces,
            UnloggedTables,
            Inheritance,
        ]),
        index_methods: vec![
            IndexMethod::BTree,
            IndexMethod::Hash,
            IndexMethod::Gin,
            IndexMethod::Gist,
            IndexMethod::Brin,
            IndexMethod::SpGist,
        ],
        always_supported_types: POSTGRES_ALWAYS.to_vec(),
        known_types: POSTGRES_KNOWN.to_vec(),
        accepts_unknown_types: false,
        reserved: ReservedObjects {
            schemas: vec!["pg_catalog", "information_schema", "pg_toast"],
            tables: Vec::new(),
            table_prefixes: vec!["pg_"],
        },
        function_languages: vec!["sql", "plpgsql"],
        limits: TransactionLimits::default(),
    }
}

pub(super) fn cockroachdb(base: &DialectCapabilitySet) -> DialectCapabilitySet {
    base.with_overrides(
        Dialect::CockroachDb,
        &[
            (Locality, true),
            (ZoneConfig, true),
            (RangeTypes, false),
            (ExclusionConstraints, false),
            (RowLevelSecurity, false),
            (Partitioning, false),
            (Inheritance, false),
            (Extensions, false),
            (Tablespaces, false),
            (UnloggedTables, false),
        ],
    )
    .with_index_methods(vec![IndexMethod::BTree, IndexMethod::Gin, IndexMethod::Gist])
    .with_reserved(ReservedObjects {
        schemas: vec!["pg_catalog", "information_schema", "crdb_internal", "pg_extension"],
        tables: Vec::new(),
        table_prefixes: vec!["crdb_internal"],
    })
}

pub(super) fn nile(base: &DialectCapabilitySet) -> DialectCapabilitySet {
    base.with_overrides(
        Dialect::Nile,
        &[
            (TenantIsolation, true),
            (Triggers, false),
            (Functions, false),
            (RowLevelSecurity, false),
            (Extensions, false),
            (MaterializedViews, false),
            (Partitioning, false),
            (Inheritance, false),
            (ExclusionConstraints, false),
            (Tablespaces, false),
            (UnloggedTables, false),
        ],
    )
    .with_reserved(ReservedObjects {
        schemas: vec![
            "pg_catalog",
            "information_schema",
            "users",
            "auth",
            "nile",
        ],
        tables: vec!["tenants", "tenant_users"],
        table_prefixes: vec!["pg_", "nile_"],
    })
    .with_languages(Vec::new())
}

pub(super) fn sqlite() -> DialectCapabilitySet {
    DialectCapabilitySet {
        dialect: Dialect::Sqlite,
        default_schema: "main",
        features: features(&[
            Json,
            GeneratedColumns,
            Triggers,
            Views,
            PartialIndexes,
            ExpressionIndexes,
            TransactionalDdl,
            RenameColumn,
        ]),
        index_methods: vec![IndexMethod::BTree],
        always_supported_types: SQLITE_ALWAYS.to_vec(),
        known_types: SQLITE_KNOWN.to_vec(),
        accepts_unknown_types: true,
        reserved: ReservedObjects {
            schemas: vec!["temp"],
            tables: Vec::new(),
            table_prefixes: vec!["sqlite_"],
        },
        function_languages: Vec::new(),
        limits: TransactionLimits {
            max_statement_bytes: Some(1_000_000),
            max_statements_per_batch: None,
        },
    }
}

pub(super) fn d1(base: &DialectCapabilitySet) -> DialectCapabilitySet {
    base.with_overrides(Dialect::D1, &[(TransactionalDdl, false)])
        .with_reserved(ReservedObjects {
            schemas: vec!["temp"],
            tables: vec!["d1_migrations"],
            table_prefixes: vec!["sqlite_", "_cf_"],
        })
        .with_limits(TransactionLimits {
            max_statement_bytes: Some(100_000),
            max_statements_per_batch: Some(1_000),
        })
}
