//! Tenant classification for multi-tenant platforms.
//!
//! Whether a table is tenant-scoped decides which content rules apply to
//! it, so classification is a policy the caller can replace.

use std::collections::BTreeSet;
use std::fmt;

use crate::schema::{TableDefinition, TenantMarker};

/// How a table is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenantClass {
    /// Rows belong to a tenant.
    TenantScoped,
    /// Rows are shared across tenants.
    Shared,
    /// Neither; the validator warns.
    Unclassified,
}

/// Decides whether a table is tenant-scoped or shared.
pub trait TenantPolicy: fmt::Debug + Send + Sync {
    /// Name of the tenant identifier column.
    fn tenant_column(&self) -> &str;

    /// Classifies `table`.
    fn classify(&self, table: &TableDefinition) -> TenantClass;
}

/// The default policy: an explicit marker wins, then presence of the tenant
/// column, then an explicit list of shared table names.
#[derive(Debug, Clone)]
pub struct DefaultTenantPolicy {
    tenant_column: String,
    shared_tables: BTreeSet<String>,
}

impl Default for DefaultTenantPolicy {
    fn default() -> Self {
        Self {
            tenant_column: "tenant_id".to_string(),
            shared_tables: BTreeSet::new(),
        }
    }
}

impl DefaultTenantPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a different tenant column name.
    #[must_use]
    pub fn with_tenant_column(mut self, column: impl Into<String>) -> Self {
        self.tenant_column = column.into();
        self
    }

    /// Declares a table (plain or schema-qualified name) as shared.
    #[must_use]
    pub fn with_shared_table(mut self, table: impl Into<String>) -> Self {
        self.shared_tables.insert(table.into());
        self
    }
}

impl TenantPolicy for DefaultTenantPolicy {
    fn tenant_column(&self) -> &str {
        &self.tenant_column
    }

    fn classify(&self, table: &TableDefinition) -> TenantClass {
        match table.extensions.tenant {
            Some(TenantMarker::TenantScoped) => return TenantClass::TenantScoped,
            Some(TenantMarker::Shared) => return TenantClass::Shared,
            None => {}
        }
        if table.has_column(&self.tenant_column) {
            return TenantClass::TenantScoped;
        }
        let qualified = table.qualified_name().to_string();
        if self.shared_tables.contains(&table.name) || self.shared_tables.contains(&qualified) {
            TenantClass::Shared
        } else {
            TenantClass::Unclassified
        }
    }
}

/// Opt-in policy that additionally treats tables whose names contain a hint
/// (`config`, `lookup`, ...) as shared.
///
/// Name matching is imprecise; prefer explicit markers or
/// [`DefaultTenantPolicy::with_shared_table`].
#[derive(Debug, Clone)]
pub struct NameHeuristicPolicy {
    inner: DefaultTenantPolicy,
    hints: Vec<String>,
}

impl Default for NameHeuristicPolicy {
    fn default() -> Self {
        Self {
            inner: DefaultTenantPolicy::default(),
            hints: ["config", "lookup", "setting", "reference", "countries", "currencies"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl NameHeuristicPolicy {
    /// Wraps `inner` with the default hint list.
    #[must_use]
    pub fn new(inner: DefaultTenantPolicy) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Replaces the hint list.
    #[must_use]
    pub fn with_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints = hints.into_iter().map(Into::into).collect();
        self
    }
}

impl TenantPolicy for NameHeuristicPolicy {
    fn tenant_column(&self) -> &str {
        self.inner.tenant_column()
    }

    fn classify(&self, table: &TableDefinition) -> TenantClass {
        match self.inner.classify(table) {
            TenantClass::Unclassified => {
                let name = table.name.to_ascii_lowercase();
                if self.hints.iter().any(|hint| name.contains(hint.as_str())) {
                    TenantClass::Shared
                } else {
                    TenantClass::Unclassified
                }
            }
            class => class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{text, uuid};

    fn table(name: &str, tenant: bool) -> TableDefinition {
        let mut builder = TableDefinition::builder(name).column(uuid("id").primary_key().build());
        if tenant {
            builder = builder.column(uuid("tenant_id").not_null().build());
        }
        builder.build()
    }

    #[test]
    fn default_policy_uses_column_and_shared_list() {
        let policy = DefaultTenantPolicy::new().with_shared_table("plans");
        assert_eq!(policy.classify(&table("todos", true)), TenantClass::TenantScoped);
        assert_eq!(policy.classify(&table("plans", false)), TenantClass::Shared);
        assert_eq!(
            policy.classify(&table("app_config", false)),
            TenantClass::Unclassified
        );
    }

    #[test]
    fn explicit_marker_wins() {
        let policy = DefaultTenantPolicy::new();
        let marked = TableDefinition::builder("audit")
            .column(text("tenant_id").build())
            .tenant(TenantMarker::Shared)
            .build();
        assert_eq!(policy.classify(&marked), TenantClass::Shared);
    }

    #[test]
    fn heuristic_is_opt_in() {
        let heuristic = NameHeuristicPolicy::default();
        assert_eq!(
            heuristic.classify(&table("app_config", false)),
            TenantClass::Shared
        );
        assert_eq!(
            heuristic.classify(&table("todos", false)),
            TenantClass::Unclassified
        );
        let custom = NameHeuristicPolicy::default().with_hints(["catalog"]);
        assert_eq!(
            custom.classify(&table("product_catalog", false)),
            TenantClass::Shared
        );
        assert_eq!(custom.tenant_column(), "tenant_id");
    }
}
