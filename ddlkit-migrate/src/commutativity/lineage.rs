//! Snapshot lineage graph.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::ddl::{Ddl, Dialect};
use crate::error::{MigrateResult, MigrationError};
use crate::snapshot::{ORIGIN_ID, RenameHint, Snapshot};

/// The DAG formed by a set of snapshots and their `prevIds`.
///
/// [`ORIGIN_ID`] is an implicit node with an empty schema. Every other id
/// must be present exactly once and reachable from the origin.
#[derive(Debug, Clone)]
pub struct Lineage {
    nodes: HashMap<String, Snapshot>,
    children: BTreeMap<String, Vec<String>>,
    /// Parents before children; ties broken by id.
    order: Vec<String>,
    empty: Ddl,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl Lineage {
    /// Build and check the graph.
    pub fn build(snapshots: Vec<Snapshot>, dialect: Dialect) -> MigrateResult<Self> {
        let mut nodes = HashMap::with_capacity(snapshots.len());
        for snapshot in snapshots {
            if snapshot.dialect != dialect {
                return Err(MigrationError::DialectMismatch {
                    id: snapshot.id,
                    expected: dialect,
                    found: snapshot.dialect,
                });
            }
            if snapshot.id == ORIGIN_ID {
                return Err(MigrationError::lineage(format!(
                    "snapshot uses the reserved origin id {}",
                    ORIGIN_ID
                )));
            }
            if let Some(previous) = nodes.insert(snapshot.id.clone(), snapshot) {
                return Err(MigrationError::lineage(format!(
                    "duplicate snapshot id {}",
                    previous.id
                )));
            }
        }

        let mut children: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut ids: Vec<&String> = nodes.keys().collect();
        ids.sort();
        for id in ids {
            let snapshot = &nodes[id];
            for parent in &snapshot.prev_ids {
                if parent != ORIGIN_ID && !nodes.contains_key(parent) {
                    return Err(MigrationError::lineage(format!(
                        "snapshot {} points at unknown parent {}",
                        id, parent
                    )));
                }
                children.entry(parent.clone()).or_default().push(id.clone());
            }
        }

        let mut lineage = Self {
            nodes,
            children,
            order: Vec::new(),
            empty: Ddl::empty(),
        };
        lineage.order = lineage.topological_order()?;
        debug!(
            snapshots = lineage.nodes.len(),
            branch_points = lineage.branch_points().len(),
            "Built lineage"
        );
        Ok(lineage)
    }

    /// Depth-first walk over parent edges. Revisiting a node that is still on
    /// the stack is a cycle.
    fn topological_order(&self) -> MigrateResult<Vec<String>> {
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut order = vec![ORIGIN_ID.to_string()];
        let mut ids: Vec<&String> = self.nodes.keys().collect();
        ids.sort();

        for id in ids {
            let mut stack: Vec<&str> = Vec::new();
            self.visit(id, &mut marks, &mut stack, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        id: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
        order: &mut Vec<String>,
    ) -> MigrateResult<()> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|s| *s == id).unwrap_or(0);
                let mut cycle: Vec<&str> = stack[start..].to_vec();
                cycle.push(id);
                return Err(MigrationError::lineage(format!(
                    "cycle detected: {}",
                    cycle.join(" -> ")
                )));
            }
            None => {}
        }
        if id == ORIGIN_ID {
            return Ok(());
        }

        marks.insert(id, Mark::Visiting);
        stack.push(id);
        if let Some(snapshot) = self.nodes.get(id) {
            for parent in &snapshot.prev_ids {
                self.visit(parent, marks, stack, order)?;
            }
        }
        stack.pop();
        marks.insert(id, Mark::Done);
        order.push(id.to_string());
        Ok(())
    }

    /// Look up a snapshot.
    pub fn get(&self, id: &str) -> Option<&Snapshot> {
        self.nodes.get(id)
    }

    /// Schema at a node; the origin is empty.
    pub fn ddl(&self, id: &str) -> &Ddl {
        self.nodes.get(id).map(|s| &s.ddl).unwrap_or(&self.empty)
    }

    /// Number of snapshots, origin excluded.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if there are no snapshots.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of a node.
    pub fn children(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Nodes with two or more children, parents first.
    pub fn branch_points(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| self.children(id).len() >= 2)
            .map(String::as_str)
            .collect()
    }

    /// Snapshots without children, in lineage order.
    pub fn heads(&self) -> Vec<&Snapshot> {
        self.order
            .iter()
            .filter(|id| self.children(id).is_empty())
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    /// `id` and every node below it.
    pub fn descendants(&self, id: &str) -> BTreeSet<&str> {
        let mut seen = BTreeSet::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(known) = self.known(next) {
                if seen.insert(known) {
                    pending.extend(self.children(known).iter().map(String::as_str));
                }
            }
        }
        seen
    }

    /// `id` and every node above it, origin included.
    pub fn ancestors(&self, id: &str) -> BTreeSet<&str> {
        let mut seen = BTreeSet::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(known) = self.known(next) {
                if seen.insert(known) {
                    if let Some(snapshot) = self.nodes.get(known) {
                        pending.extend(snapshot.prev_ids.iter().map(String::as_str));
                    }
                }
            }
        }
        seen
    }

    /// Leaves reachable from `id`, in lineage order.
    pub fn leaves(&self, id: &str) -> Vec<&str> {
        let below = self.descendants(id);
        self.order
            .iter()
            .map(String::as_str)
            .filter(|n| below.contains(n) && self.children(n).is_empty())
            .collect()
    }

    /// Whether `descendant` is reachable from `ancestor`.
    pub fn reachable(&self, ancestor: &str, descendant: &str) -> bool {
        self.ancestors(descendant).contains(ancestor)
    }

    /// Nearest common ancestor of several nodes.
    pub fn common_ancestor<S: AsRef<str>>(&self, ids: &[S]) -> &str {
        let mut shared: Option<BTreeSet<&str>> = None;
        for id in ids {
            let ancestors = self.ancestors(id.as_ref());
            shared = Some(match shared {
                None => ancestors,
                Some(acc) => acc.intersection(&ancestors).copied().collect(),
            });
        }
        let shared = shared.unwrap_or_default();
        self.order
            .iter()
            .rev()
            .map(String::as_str)
            .find(|id| shared.contains(id))
            .unwrap_or(ORIGIN_ID)
    }

    /// Renames recorded on the way from `ancestor` (exclusive) to `head`
    /// (inclusive), in application order.
    pub fn path_renames(&self, ancestor: &str, head: &str) -> Vec<RenameHint> {
        let above = self.ancestors(head);
        let below = self.descendants(ancestor);
        self.order
            .iter()
            .filter(|id| id.as_str() != ancestor)
            .filter(|id| above.contains(id.as_str()) && below.contains(id.as_str()))
            .filter_map(|id| self.nodes.get(id))
            .flat_map(|s| s.renames.iter().cloned())
            .collect()
    }

    /// Interned id, so returned borrows live as long as the graph.
    fn known(&self, id: &str) -> Option<&str> {
        if id == ORIGIN_ID {
            return self.order.first().map(String::as_str);
        }
        self.nodes.get_key_value(id).map(|(k, _)| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, parents: &[&str]) -> Snapshot {
        Snapshot::new(
            Dialect::Postgresql,
            parents.iter().map(|p| p.to_string()).collect(),
            Ddl::empty(),
        )
        .with_id(id)
    }

    fn diamond() -> Lineage {
        Lineage::build(
            vec![
                node("m", &["a", "b"]),
                node("b", &["p"]),
                node("a", &["p"]),
                node("p", &[ORIGIN_ID]),
            ],
            Dialect::Postgresql,
        )
        .unwrap()
    }

    #[test]
    fn test_input_order_is_irrelevant() {
        let lineage = diamond();
        assert_eq!(lineage.branch_points(), vec!["p"]);
        assert_eq!(lineage.leaves("a"), vec!["m"]);
        assert_eq!(lineage.heads().len(), 1);
        assert_eq!(lineage.common_ancestor(&["a", "b"]), "p");
        assert!(lineage.reachable("p", "m"));
        assert!(!lineage.reachable("a", "b"));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = Lineage::build(
            vec![node("a", &["c"]), node("b", &["a"]), node("c", &["b"])],
            Dialect::Postgresql,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cycle detected"));
    }

    #[test]
    fn test_dangling_parent_is_rejected() {
        let err = Lineage::build(vec![node("a", &["ghost"])], Dialect::Postgresql).unwrap_err();
        assert!(err.to_string().contains("unknown parent ghost"));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let err = Lineage::build(
            vec![node("a", &[ORIGIN_ID]), node("a", &[ORIGIN_ID])],
            Dialect::Postgresql,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate snapshot id a"));
    }

    #[test]
    fn test_dialect_mismatch() {
        let snapshot = Snapshot::new(Dialect::Mysql, vec![ORIGIN_ID.into()], Ddl::empty());
        let err = Lineage::build(vec![snapshot], Dialect::Postgresql).unwrap_err();
        assert!(matches!(err, MigrationError::DialectMismatch { .. }));
    }

    #[test]
    fn test_path_renames_follow_the_branch() {
        use crate::ddl::{EntityKey, EntityKind};

        let hint = RenameHint::new(
            EntityKind::Table,
            EntityKey::in_schema("public", "users"),
            EntityKey::in_schema("public", "people"),
        );
        let lineage = Lineage::build(
            vec![
                node("p", &[ORIGIN_ID]),
                node("a", &["p"]).with_renames(vec![hint.clone()]),
                node("b", &["p"]),
            ],
            Dialect::Postgresql,
        )
        .unwrap();
        assert_eq!(lineage.path_renames("p", "a"), vec![hint]);
        assert!(lineage.path_renames("p", "b").is_empty());
    }
}
