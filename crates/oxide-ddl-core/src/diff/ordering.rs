//! Foreign-key dependency ordering of tables.
//!
//! A stable topological sort: among the tables whose dependencies are all
//! placed, the earliest declared one goes next. Self-references and
//! references to tables outside the input are ignored. Tables caught in a
//! cycle keep their declaration order after every orderable table.

use crate::schema::{QualifiedName, TableDefinition};

/// The result of ordering tables by their foreign-key dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyOrder {
    /// Indices into the input slice, dependencies first.
    pub order: Vec<usize>,
    /// Tables involved in (or depending on) a cycle, in declaration order.
    pub cycle: Vec<QualifiedName>,
}

impl DependencyOrder {
    /// Whether every table could be ordered.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        self.cycle.is_empty()
    }
}

/// Orders `tables` so that every table comes after the tables it
/// references.
#[must_use]
pub fn dependency_order(tables: &[&TableDefinition], default_schema: &str) -> DependencyOrder {
    let names: Vec<QualifiedName> = tables.iter().map(|t| t.qualified_name()).collect();
    let dependencies: Vec<Vec<usize>> = tables
        .iter()
        .enumerate()
        .map(|(index, table)| {
            let mut deps: Vec<usize> = table
                .referenced_tables()
                .iter()
                .filter_map(|target| names.iter().position(|n| n.matches(target, default_schema)))
                .filter(|&dep| dep != index)
                .collect();
            deps.sort_unstable();
            deps.dedup();
            deps
        })
        .collect();

    let mut placed = vec![false; tables.len()];
    let mut order = Vec::with_capacity(tables.len());
    while let Some(next) = (0..tables.len())
        .find(|&i| !placed[i] && dependencies[i].iter().all(|&d| placed[d]))
    {
        placed[next] = true;
        order.push(next);
    }

    let stuck: Vec<usize> = (0..tables.len()).filter(|&i| !placed[i]).collect();
    let cycle = stuck.iter().map(|&i| names[i].clone()).collect();
    order.extend(stuck);

    DependencyOrder { order, cycle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{integer, ConstraintBuilder};

    fn table(name: &str, refs: &[&str]) -> TableDefinition {
        let mut builder = TableDefinition::builder(name).column(integer("id").primary_key().build());
        for (i, target) in refs.iter().enumerate() {
            builder = builder.column(integer(format!("ref_{i}")).references(*target, "id").build());
        }
        builder.build()
    }

    fn names(tables: &[&TableDefinition], order: &DependencyOrder) -> Vec<String> {
        order.order.iter().map(|&i| tables[i].name.clone()).collect()
    }

    #[test]
    fn referenced_tables_come_first() {
        let comments = table("comments", &["posts", "users"]);
        let posts = table("posts", &["users"]);
        let users = table("users", &[]);
        let tags = table("tags", &[]);
        let tables = [&comments, &posts, &users, &tags];
        let order = dependency_order(&tables, "public");
        assert!(order.is_acyclic());
        assert_eq!(names(&tables, &order), vec!["users", "posts", "comments", "tags"]);
    }

    #[test]
    fn independent_tables_keep_declaration_order() {
        let a = table("a", &[]);
        let b = table("b", &[]);
        let c = table("c", &[]);
        let tables = [&c, &a, &b];
        assert_eq!(names(&tables, &dependency_order(&tables, "main")), vec!["c", "a", "b"]);
    }

    #[test]
    fn self_and_external_references_are_ignored() {
        let employees = table("employees", &["employees", "auth.users"]);
        let tables = [&employees];
        let order = dependency_order(&tables, "public");
        assert!(order.is_acyclic());
        assert_eq!(order.order, vec![0]);
    }

    #[test]
    fn default_schema_matches_unqualified_names() {
        let orders = table("orders", &["public.customers"]);
        let customers = table("customers", &[]);
        let tables = [&orders, &customers];
        assert_eq!(
            names(&tables, &dependency_order(&tables, "public")),
            vec!["customers", "orders"]
        );
    }

    #[test]
    fn cycles_fall_back_to_declaration_order() {
        let a = TableDefinition::builder("a")
            .column(integer("id").primary_key().build())
            .column(integer("b_id").build())
            .constraint(ConstraintBuilder::foreign_key(["b_id"], "b", ["id"]).build())
            .build();
        let b = table("b", &["a"]);
        let leaf = table("leaf", &[]);
        let tables = [&a, &b, &leaf];
        let order = dependency_order(&tables, "public");
        assert_eq!(names(&tables, &order), vec!["leaf", "a", "b"]);
        assert_eq!(
            order.cycle,
            vec![QualifiedName::from("a"), QualifiedName::from("b")]
        );
    }
}
