//! Table-level constraints.

use serde::{Deserialize, Serialize};

use super::column::ForeignKeyAction;
use super::QualifiedName;

/// One element of an EXCLUDE constraint: an expression and the operator it
/// must not overlap on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionElement {
    /// Column or expression.
    pub expression: String,
    /// Operator (`=`, `&&`, ...).
    pub operator: String,
}

/// The variant-specific payload of a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintKind {
    /// PRIMARY KEY (columns).
    PrimaryKey {
        /// Key columns.
        columns: Vec<String>,
    },
    /// UNIQUE (columns).
    Unique {
        /// Unique columns.
        columns: Vec<String>,
    },
    /// CHECK (expression).
    Check {
        /// Boolean expression text.
        expression: String,
    },
    /// FOREIGN KEY (columns) REFERENCES table (columns).
    ForeignKey {
        /// Referencing columns.
        columns: Vec<String>,
        /// Referenced table.
        references_table: QualifiedName,
        /// Referenced columns.
        references_columns: Vec<String>,
        /// ON DELETE action.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_delete: Option<ForeignKeyAction>,
        /// ON UPDATE action.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_update: Option<ForeignKeyAction>,
        /// DEFERRABLE INITIALLY DEFERRED.
        #[serde(default)]
        deferrable: bool,
    },
    /// EXCLUDE USING method (element WITH operator, ...).
    Exclusion {
        /// Index method backing the constraint.
        #[serde(default = "default_exclusion_method")]
        method: String,
        /// Excluded elements.
        elements: Vec<ExclusionElement>,
        /// Optional WHERE predicate.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        predicate: Option<String>,
    },
}

fn default_exclusion_method() -> String {
    "gist".to_string()
}

/// A table-level constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintDefinition {
    /// Explicit name; the generator synthesizes one when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Variant payload.
    #[serde(flatten)]
    pub kind: ConstraintKind,
}

impl ConstraintDefinition {
    /// Columns the constraint covers. CHECK constraints have none;
    /// exclusion constraints report elements that are plain identifiers.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        match &self.kind {
            ConstraintKind::PrimaryKey { columns }
            | ConstraintKind::Unique { columns }
            | ConstraintKind::ForeignKey { columns, .. } => {
                columns.iter().map(String::as_str).collect()
            }
            ConstraintKind::Check { .. } => Vec::new(),
            ConstraintKind::Exclusion { elements, .. } => elements
                .iter()
                .map(|e| e.expression.as_str())
                .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
                .collect(),
        }
    }

    /// The explicit name, or the PostgreSQL-style synthesized one
    /// (`<table>_<cols>_pkey`, `_key`, `_check`, `_fkey`, `_excl`).
    #[must_use]
    pub fn effective_name(&self, table: &str) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let cols = self.columns().join("_");
        match &self.kind {
            ConstraintKind::PrimaryKey { .. } => format!("{table}_pkey"),
            ConstraintKind::Unique { .. } => format!("{table}_{cols}_key"),
            ConstraintKind::Check { .. } => format!("{table}_check"),
            ConstraintKind::ForeignKey { .. } => format!("{table}_{cols}_fkey"),
            ConstraintKind::Exclusion { .. } if cols.is_empty() => format!("{table}_excl"),
            ConstraintKind::Exclusion { .. } => format!("{table}_{cols}_excl"),
        }
    }

    /// Whether this is a PRIMARY KEY constraint.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        matches!(self.kind, ConstraintKind::PrimaryKey { .. })
    }
}

/// Accumulating builder for [`ConstraintDefinition`].
///
/// ```rust
/// use oxide_ddl_core::schema::{ConstraintBuilder, ForeignKeyAction};
///
/// let fk = ConstraintBuilder::foreign_key(["customer_id"], "customers", ["id"])
///     .on_delete(ForeignKeyAction::Cascade)
///     .named("orders_customer_fk")
///     .build();
/// assert_eq!(fk.effective_name("orders"), "orders_customer_fk");
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct ConstraintBuilder {
    constraint: ConstraintDefinition,
}

impl ConstraintBuilder {
    fn from_kind(kind: ConstraintKind) -> Self {
        Self {
            constraint: ConstraintDefinition { name: None, kind },
        }
    }

    /// PRIMARY KEY over the given columns.
    pub fn primary_key<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_kind(ConstraintKind::PrimaryKey {
            columns: columns.into_iter().map(Into::into).collect(),
        })
    }

    /// UNIQUE over the given columns.
    pub fn unique<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_kind(ConstraintKind::Unique {
            columns: columns.into_iter().map(Into::into).collect(),
        })
    }

    /// CHECK with the given boolean expression.
    pub fn check(expression: impl Into<String>) -> Self {
        Self::from_kind(ConstraintKind::Check {
            expression: expression.into(),
        })
    }

    /// FOREIGN KEY from `columns` to `table(references)`.
    pub fn foreign_key<I, S, J, T>(columns: I, table: impl Into<QualifiedName>, references: J) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::from_kind(ConstraintKind::ForeignKey {
            columns: columns.into_iter().map(Into::into).collect(),
            references_table: table.into(),
            references_columns: references.into_iter().map(Into::into).collect(),
            on_delete: None,
            on_update: None,
            deferrable: false,
        })
    }

    /// EXCLUDE USING gist with no elements yet.
    pub fn exclusion() -> Self {
        Self::from_kind(ConstraintKind::Exclusion {
            method: default_exclusion_method(),
            elements: Vec::new(),
            predicate: None,
        })
    }

    /// Sets the constraint name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.constraint.name = Some(name.into());
        self
    }

    /// Sets ON DELETE (foreign keys only; ignored otherwise).
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        if let ConstraintKind::ForeignKey { on_delete, .. } = &mut self.constraint.kind {
            *on_delete = Some(action);
        }
        self
    }

    /// Sets ON UPDATE (foreign keys only; ignored otherwise).
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        if let ConstraintKind::ForeignKey { on_update, .. } = &mut self.constraint.kind {
            *on_update = Some(action);
        }
        self
    }

    /// Marks a foreign key DEFERRABLE INITIALLY DEFERRED.
    pub fn deferrable(mut self) -> Self {
        if let ConstraintKind::ForeignKey { deferrable, .. } = &mut self.constraint.kind {
            *deferrable = true;
        }
        self
    }

    /// Adds an exclusion element (exclusion constraints only).
    pub fn exclude(mut self, expression: impl Into<String>, operator: impl Into<String>) -> Self {
        if let ConstraintKind::Exclusion { elements, .. } = &mut self.constraint.kind {
            elements.push(ExclusionElement {
                expression: expression.into(),
                operator: operator.into(),
            });
        }
        self
    }

    /// Sets the exclusion index method.
    pub fn using(mut self, index_method: impl Into<String>) -> Self {
        if let ConstraintKind::Exclusion { method, .. } = &mut self.constraint.kind {
            *method = index_method.into();
        }
        self
    }

    /// Finalizes the constraint.
    #[must_use]
    pub fn build(self) -> ConstraintDefinition {
        self.constraint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_names_follow_postgres_conventions() {
        let pk = ConstraintBuilder::primary_key(["tenant_id", "id"]).build();
        assert_eq!(pk.effective_name("orders"), "orders_pkey");

        let uq = ConstraintBuilder::unique(["email"]).build();
        assert_eq!(uq.effective_name("users"), "users_email_key");

        let fk = ConstraintBuilder::foreign_key(["user_id"], "users", ["id"]).build();
        assert_eq!(fk.effective_name("posts"), "posts_user_id_fkey");

        let ck = ConstraintBuilder::check("amount > 0").build();
        assert_eq!(ck.effective_name("payments"), "payments_check");

        let ex = ConstraintBuilder::exclusion()
            .exclude("room_id", "=")
            .exclude("tstzrange(starts_at, ends_at)", "&&")
            .build();
        assert_eq!(ex.effective_name("bookings"), "bookings_room_id_excl");
    }

    #[test]
    fn modifiers_only_touch_matching_variants() {
        let uq = ConstraintBuilder::unique(["email"])
            .on_delete(ForeignKeyAction::Cascade)
            .build();
        assert_eq!(
            uq.kind,
            ConstraintKind::Unique {
                columns: vec!["email".into()]
            }
        );
    }

    #[test]
    fn deserializes_flattened_kind() {
        let json = r#"{"name": "fk_author", "type": "foreign_key", "columns": ["author_id"],
                       "references_table": "public.authors", "references_columns": ["id"],
                       "on_delete": "set_null"}"#;
        let c: ConstraintDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(c.name.as_deref(), Some("fk_author"));
        match c.kind {
            ConstraintKind::ForeignKey {
                references_table,
                on_delete,
                deferrable,
                ..
            } => {
                assert_eq!(references_table.to_string(), "public.authors");
                assert_eq!(on_delete, Some(ForeignKeyAction::SetNull));
                assert!(!deferrable);
            }
            other => panic!("expected foreign key, got {other:?}"),
        }
    }
}
