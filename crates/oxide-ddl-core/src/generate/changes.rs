//! Column-level change classification shared by both dialect families.

use crate::capability::types;
use crate::schema::{ColumnDefinition, ConstraintDefinition, TableDefinition};

/// How one column differs between two table shapes. Primary key
/// membership is compared per table, see [`TableChanges`].
#[derive(Debug, Clone, Copy)]
pub struct ColumnChange<'a> {
    /// Column before the change.
    pub from: &'a ColumnDefinition,
    /// Column after the change.
    pub to: &'a ColumnDefinition,
    /// Declared type (or collation) differs.
    pub type_changed: bool,
    /// The type change cannot lose data.
    pub widening: bool,
    /// Nullability differs.
    pub nullability_changed: bool,
    /// Default differs.
    pub default_changed: bool,
    /// Auto-increment differs.
    pub identity_changed: bool,
    /// Generation expression (or stored/virtual) differs.
    pub generated_changed: bool,
    /// Column UNIQUE flag differs.
    pub unique_changed: bool,
    /// Column REFERENCES differs.
    pub references_changed: bool,
    /// Column CHECK differs.
    pub check_changed: bool,
    /// Comment differs.
    pub comment_changed: bool,
}

impl<'a> ColumnChange<'a> {
    /// Compares two versions of the same column. Returns `None` when they
    /// are identical.
    #[must_use]
    pub fn between(from: &'a ColumnDefinition, to: &'a ColumnDefinition) -> Option<Self> {
        let type_changed = type_signature(from) != type_signature(to) || from.collation != to.collation;
        let change = Self {
            from,
            to,
            type_changed,
            widening: type_changed
                && from.collation == to.collation
                && from.is_array() == to.is_array()
                && is_widening(&from.data_type, &to.data_type),
            nullability_changed: from.nullable != to.nullable,
            default_changed: from.default != to.default,
            identity_changed: from.auto_increment != to.auto_increment,
            generated_changed: from.generated != to.generated,
            unique_changed: from.unique != to.unique,
            references_changed: from.references != to.references,
            check_changed: from.check != to.check,
            comment_changed: from.comment != to.comment,
        };
        change.has_changes().then_some(change)
    }

    /// Whether anything differs.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.type_changed || self.comment_changed || self.has_non_comment_changes()
    }

    fn has_non_comment_changes(&self) -> bool {
        self.nullability_changed
            || self.default_changed
            || self.identity_changed
            || self.generated_changed
            || self.unique_changed
            || self.references_changed
            || self.check_changed
    }

    /// Whether anything beyond the comment differs.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        self.type_changed || self.has_non_comment_changes()
    }

    /// Whether NOT NULL is being added.
    #[must_use]
    pub fn tightens_nullability(&self) -> bool {
        self.from.nullable && !self.to.nullable
    }

    /// Whether applying the change can lose data or reject existing rows.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        (self.type_changed && !self.widening)
            || self.tightens_nullability()
            || (self.unique_changed && self.to.unique)
            || (self.references_changed && self.to.references.is_some())
            || (self.check_changed && self.to.check.is_some())
            || (self.generated_changed && self.to.generated.is_some())
    }
}

/// Everything that differs between two shapes of one table.
#[derive(Debug, Clone)]
pub struct TableChanges<'a> {
    /// Columns only in the target.
    pub added: Vec<&'a ColumnDefinition>,
    /// Columns only in the source.
    pub removed: Vec<&'a ColumnDefinition>,
    /// Columns in both that differ, in target order.
    pub altered: Vec<ColumnChange<'a>>,
    /// Table constraints only in the target (matched by effective name).
    pub added_constraints: Vec<&'a ConstraintDefinition>,
    /// Table constraints only in the source.
    pub removed_constraints: Vec<&'a ConstraintDefinition>,
    /// The primary key column list differs.
    pub primary_key_changed: bool,
    /// Partitioning, inheritance or storage options differ.
    pub options_changed: bool,
    /// Platform extensions (locality, zone configuration) differ.
    pub extensions_changed: bool,
    /// Table comment differs.
    pub comment_changed: bool,
}

impl<'a> TableChanges<'a> {
    /// Classifies the changes from `from` to `to`. Primary keys are
    /// compared as column lists, so moving a key between a column flag
    /// and a table constraint is not a change.
    #[must_use]
    pub fn between(from: &'a TableDefinition, to: &'a TableDefinition) -> Self {
        let added = to
            .columns
            .iter()
            .filter(|c| !from.has_column(&c.name))
            .collect();
        let removed = from
            .columns
            .iter()
            .filter(|c| !to.has_column(&c.name))
            .collect();
        let altered = to
            .columns
            .iter()
            .filter_map(|c| from.column(&c.name).and_then(|old| ColumnChange::between(old, c)))
            .collect();

        let keyed = |table: &'a TableDefinition| -> Vec<(String, &'a ConstraintDefinition)> {
            table
                .constraints
                .iter()
                .filter(|c| !c.is_primary_key())
                .map(|c| (c.effective_name(&table.name), c))
                .collect()
        };
        let old_constraints = keyed(from);
        let new_constraints = keyed(to);
        let added_constraints = new_constraints
            .iter()
            .filter(|(name, c)| !old_constraints.iter().any(|(n, o)| n == name && o.kind == c.kind))
            .map(|(_, c)| *c)
            .collect();
        let removed_constraints = old_constraints
            .iter()
            .filter(|(name, c)| !new_constraints.iter().any(|(n, o)| n == name && o.kind == c.kind))
            .map(|(_, c)| *c)
            .collect();

        Self {
            added,
            removed,
            altered,
            added_constraints,
            removed_constraints,
            primary_key_changed: from.primary_key_columns() != to.primary_key_columns(),
            options_changed: from.options != to.options
                || from.partitioning != to.partitioning
                || from.inherits != to.inherits,
            extensions_changed: from.extensions != to.extensions,
            comment_changed: from.comment != to.comment,
        }
    }

    /// Whether the two shapes are identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.altered.is_empty()
            && self.added_constraints.is_empty()
            && self.removed_constraints.is_empty()
            && !self.primary_key_changed
            && !self.options_changed
            && !self.extensions_changed
            && !self.comment_changed
    }

    /// Whether applying the changes can lose data or reject existing rows.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        !self.removed.is_empty()
            || self.altered.iter().any(ColumnChange::is_destructive)
            || !self.added_constraints.is_empty()
            || self.primary_key_changed
            || self.added.iter().any(|c| requires_backfill(c))
    }
}

/// A NOT NULL column without a default cannot be added to a table that
/// already has rows.
#[must_use]
pub fn requires_backfill(column: &ColumnDefinition) -> bool {
    !column.nullable && column.default.is_none() && !column.is_generated() && !column.auto_increment
}

fn type_signature(column: &ColumnDefinition) -> (String, Vec<u32>, bool) {
    (
        types::normalized(&column.data_type),
        types::type_modifiers(&column.data_type),
        column.is_array(),
    )
}

/// Digits an integer type can hold.
fn integer_digits(canonical: &str) -> Option<u32> {
    match types::serial_base(canonical).unwrap_or(canonical) {
        "smallint" => Some(5),
        "integer" => Some(10),
        "bigint" => Some(19),
        _ => None,
    }
}

/// Whether changing a column from `from` to `to` keeps every value:
/// `smallint→integer→bigint`, `real→double precision`, `integer→numeric`
/// with enough digits, growing `varchar`/`char` lengths, `varchar` to
/// `text`, `numeric(p,s)` to a type with room for all digits, and
/// `timestamp→timestamptz`.
///
/// `char(n)` to `varchar` or `text` is not widening: the cast drops the
/// trailing pad spaces of every stored value.
#[must_use]
pub fn is_widening(from: &str, to: &str) -> bool {
    let (old, new) = (types::normalized(from), types::normalized(to));
    let (old_mods, new_mods) = (types::type_modifiers(from), types::type_modifiers(to));
    if old == new && old_mods == new_mods {
        return true;
    }

    if let (Some(old_digits), Some(new_digits)) = (integer_digits(&old), integer_digits(&new)) {
        return new_digits >= old_digits;
    }
    if let Some(digits) = integer_digits(&old) {
        return new == "numeric"
            && match new_mods.as_slice() {
                [] => true,
                [precision] => *precision >= digits,
                [precision, scale, ..] => precision.saturating_sub(*scale) >= digits,
            };
    }

    match (old.as_str(), new.as_str()) {
        ("real", "double precision") | ("timestamp", "timestamptz") => true,
        ("varchar", "text") => true,
        ("varchar", "varchar") => match (old_mods.first(), new_mods.first()) {
            (_, None) => true,
            (Some(old_len), Some(new_len)) => new_len >= old_len,
            (None, Some(_)) => false,
        },
        ("char", "char") => matches!(
            (old_mods.first(), new_mods.first()),
            (Some(old_len), Some(new_len)) if new_len >= old_len
        ),
        ("numeric", "numeric") => match (old_mods.as_slice(), new_mods.as_slice()) {
            (_, []) => true,
            ([], _) => false,
            (old_m, new_m) => {
                let (old_p, old_s) = (old_m[0], old_m.get(1).copied().unwrap_or(0));
                let (new_p, new_s) = (new_m[0], new_m.get(1).copied().unwrap_or(0));
                new_s >= old_s && new_p.saturating_sub(new_s) >= old_p.saturating_sub(old_s)
            }
        },
        _ => false,
    }
}
