//! Capability registry: what each target dialect can express.
//!
//! Every dialect has one [`DialectCapabilitySet`], built once per process
//! and shared read-only. Platform dialects are composed from their family's
//! base set plus an explicit override list (see [`sets`]).

mod sets;
pub mod types;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::schema::{IndexMethod, QualifiedName};

/// A registered target dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL.
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    /// CockroachDB.
    #[serde(alias = "crdb")]
    CockroachDb,
    /// Nile multi-tenant Postgres.
    Nile,
    /// SQLite.
    Sqlite,
    /// Cloudflare D1.
    #[serde(alias = "cloudflare-d1")]
    D1,
}

impl Dialect {
    /// Every registered dialect.
    pub const ALL: [Self; 5] = [
        Self::Postgres,
        Self::CockroachDb,
        Self::Nile,
        Self::Sqlite,
        Self::D1,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::CockroachDb => "cockroachdb",
            Self::Nile => "nile",
            Self::Sqlite => "sqlite",
            Self::D1 => "d1",
        }
    }

    /// The SQL family whose generator renders this dialect.
    #[must_use]
    pub const fn family(self) -> DialectFamily {
        match self {
            Self::Postgres | Self::CockroachDb | Self::Nile => DialectFamily::Postgres,
            Self::Sqlite | Self::D1 => DialectFamily::Sqlite,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown dialect name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dialect '{0}' (expected one of: postgres, cockroachdb, nile, sqlite, d1)")]
pub struct ParseDialectError(pub String);

impl FromStr for Dialect {
    type Err = ParseDialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "cockroachdb" | "crdb" => Ok(Self::CockroachDb),
            "nile" => Ok(Self::Nile),
            "sqlite" => Ok(Self::Sqlite),
            "d1" | "cloudflare-d1" => Ok(Self::D1),
            _ => Err(ParseDialectError(s.to_string())),
        }
    }
}

/// Dialect families that share a SQL generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectFamily {
    /// Postgres-compatible.
    Postgres,
    /// SQLite-compatible.
    Sqlite,
}

/// Boolean capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// `json` column type.
    Json,
    /// `jsonb` column type.
    Jsonb,
    /// Native array columns.
    Arrays,
    /// SERIAL pseudo-types.
    Serial,
    /// `GENERATED ... AS IDENTITY`.
    Identity,
    /// Standalone sequences.
    Sequences,
    /// `uuid` column type.
    Uuid,
    /// Enum types.
    Enums,
    /// Range types.
    RangeTypes,
    /// inet/cidr/macaddr.
    NetworkTypes,
    /// Geometric/spatial types.
    Geometry,
    /// Generated (computed) columns.
    GeneratedColumns,
    /// Triggers.
    Triggers,
    /// Stored functions.
    Functions,
    /// Row-level security policies.
    RowLevelSecurity,
    /// Plain views.
    Views,
    /// Materialized views.
    MaterializedViews,
    /// Declarative partitioning.
    Partitioning,
    /// Partial (WHERE) indexes.
    PartialIndexes,
    /// Covering (INCLUDE) indexes.
    CoveringIndexes,
    /// Expression indexes.
    ExpressionIndexes,
    /// `CREATE INDEX CONCURRENTLY`.
    ConcurrentIndexes,
    /// EXCLUDE constraints.
    ExclusionConstraints,
    /// DDL inside transactions.
    TransactionalDdl,
    /// `ALTER TABLE ... DROP COLUMN`.
    DropColumn,
    /// `ALTER COLUMN ... TYPE`.
    AlterColumnType,
    /// `ALTER COLUMN ... SET/DROP NOT NULL`.
    AlterColumnNullability,
    /// `ALTER COLUMN ... SET/DROP DEFAULT`.
    AlterColumnDefault,
    /// `ALTER TABLE ... ADD CONSTRAINT`.
    AddConstraint,
    /// `ALTER TABLE ... DROP CONSTRAINT`.
    DropConstraint,
    /// `ALTER TABLE ... RENAME COLUMN`.
    RenameColumn,
    /// CockroachDB multi-region LOCALITY.
    Locality,
    /// CockroachDB zone configuration.
    ZoneConfig,
    /// Tenant-isolated tables.
    TenantIsolation,
    /// `CREATE EXTENSION`.
    Extensions,
    /// `COMMENT ON`.
    Comments,
    /// Tablespaces.
    Tablespaces,
    /// UNLOGGED tables.
    UnloggedTables,
    /// Table inheritance.
    Inheritance,
}

/// Platform-managed objects a user schema must not collide with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReservedObjects {
    /// Reserved schemas.
    pub schemas: Vec<&'static str>,
    /// Reserved tables, optionally schema-qualified.
    pub tables: Vec<&'static str>,
    /// Reserved table-name prefixes.
    pub table_prefixes: Vec<&'static str>,
}

impl ReservedObjects {
    /// Describes why `table` is reserved, if it is.
    #[must_use]
    pub fn collision(&self, table: &QualifiedName, default_schema: &str) -> Option<String> {
        if let Some(schema) = &table.schema {
            if self.schemas.iter().any(|s| s.eq_ignore_ascii_case(schema)) {
                return Some(format!("schema '{schema}' is managed by the platform"));
            }
        }
        let exact = self.tables.iter().any(|reserved| {
            QualifiedName::from(*reserved).matches(table, default_schema)
        });
        if exact {
            return Some(format!("table '{table}' is managed by the platform"));
        }
        self.table_prefixes
            .iter()
            .find(|prefix| table.name.to_ascii_lowercase().starts_with(**prefix))
            .map(|prefix| format!("table names starting with '{prefix}' are reserved"))
    }
}

/// Size limits on migration batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransactionLimits {
    /// Maximum bytes of a single statement.
    pub max_statement_bytes: Option<usize>,
    /// Maximum statements in one batch.
    pub max_statements_per_batch: Option<usize>,
}

/// Everything a dialect can and cannot express.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialectCapabilitySet {
    /// Owning dialect.
    pub dialect: Dialect,
    /// Schema an unqualified name resolves to.
    pub default_schema: &'static str,
    /// Supported boolean features.
    pub features: BTreeSet<Feature>,
    /// Supported index methods.
    pub index_methods: Vec<IndexMethod>,
    /// Canonical base types that pass validation unconditionally.
    pub always_supported_types: Vec<&'static str>,
    /// Further canonical base types the dialect knows by name.
    pub known_types: Vec<&'static str>,
    /// Whether unknown type names are accepted (SQLite affinity).
    pub accepts_unknown_types: bool,
    /// Platform-managed objects.
    pub reserved: ReservedObjects,
    /// Supported function languages.
    pub function_languages: Vec<&'static str>,
    /// Batch limits.
    pub limits: TransactionLimits,
}

impl DialectCapabilitySet {
    /// The dialect family.
    #[must_use]
    pub const fn family(&self) -> DialectFamily {
        self.dialect.family()
    }

    /// Whether a boolean feature is supported.
    #[must_use]
    pub fn supports(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Whether an index method is supported. Custom methods need extension
    /// support.
    #[must_use]
    pub fn supports_index_method(&self, method: &IndexMethod) -> bool {
        match method {
            IndexMethod::Custom(_) => self.supports(Feature::Extensions),
            known => self.index_methods.contains(known),
        }
    }

    /// Whether a canonical base type passes unconditionally.
    #[must_use]
    pub fn is_always_supported(&self, canonical: &str) -> bool {
        self.always_supported_types.contains(&canonical)
    }

    /// Whether a canonical base type is known by name.
    #[must_use]
    pub fn is_known_type(&self, canonical: &str) -> bool {
        self.is_always_supported(canonical) || self.known_types.contains(&canonical)
    }

    /// Whether functions may be written in `language`.
    #[must_use]
    pub fn supports_language(&self, language: &str) -> bool {
        self.function_languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language))
    }

    /// Copy of this set with boolean features switched on or off.
    #[must_use]
    pub fn with_overrides(&self, dialect: Dialect, overrides: &[(Feature, bool)]) -> Self {
        let mut set = self.clone();
        set.dialect = dialect;
        for &(feature, enabled) in overrides {
            if enabled {
                set.features.insert(feature);
            } else {
                set.features.remove(&feature);
            }
        }
        set
    }

    /// Replaces the supported index methods.
    #[must_use]
    pub fn with_index_methods(mut self, methods: Vec<IndexMethod>) -> Self {
        self.index_methods = methods;
        self
    }

    /// Replaces the reserved object list.
    #[must_use]
    pub fn with_reserved(mut self, reserved: ReservedObjects) -> Self {
        self.reserved = reserved;
        self
    }

    /// Replaces the supported function languages.
    #[must_use]
    pub fn with_languages(mut self, languages: Vec<&'static str>) -> Self {
        self.function_languages = languages;
        self
    }

    /// Replaces the batch limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: TransactionLimits) -> Self {
        self.limits = limits;
        self
    }
}

static REGISTRY: LazyLock<[DialectCapabilitySet; 5]> = LazyLock::new(|| {
    let postgres = sets::postgres();
    let sqlite = sets::sqlite();
    [
        sets::cockroachdb(&postgres),
        sets::nile(&postgres),
        sets::d1(&sqlite),
        postgres,
        sqlite,
    ]
});

/// The capability set of `dialect`.
#[must_use]
pub fn capabilities_for(dialect: Dialect) -> &'static DialectCapabilitySet {
    let index = match dialect {
        Dialect::CockroachDb => 0,
        Dialect::Nile => 1,
        Dialect::D1 => 2,
        Dialect::Postgres => 3,
        Dialect::Sqlite => 4,
    };
    &REGISTRY[index]
}
