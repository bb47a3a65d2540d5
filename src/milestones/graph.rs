use std::collections::{BTreeMap, BTreeSet, VecDeque};
use uuid::Uuid;

/// Directed acyclic graph of milestone dependencies within one project.
///
/// An edge `a -> b` means milestone `a` depends on milestone `b`. Every
/// insertion is checked so the graph never holds a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeSet<Uuid>,
    dependencies: BTreeMap<Uuid, BTreeSet<Uuid>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: Uuid) {
        self.nodes.insert(id);
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.nodes.contains(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(BTreeSet::len).sum()
    }

    pub fn dependencies_of(&self, id: Uuid) -> Vec<Uuid> {
        self.dependencies
            .get(&id)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Milestones that directly depend on `id`.
    pub fn dependents_of(&self, id: Uuid) -> Vec<Uuid> {
        self.dependencies
            .iter()
            .filter(|(_, deps)| deps.contains(&id))
            .map(|(node, _)| *node)
            .collect()
    }

    /// Path of dependencies leading from `from` to `to`, if one exists.
    pub fn find_path(&self, from: Uuid, to: Uuid) -> Option<Vec<Uuid>> {
        let mut parents: BTreeMap<Uuid, Uuid> = BTreeMap::new();
        let mut seen = BTreeSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![to];
                let mut cursor = to;
                while let Some(parent) = parents.get(&cursor) {
                    path.push(*parent);
                    cursor = *parent;
                }
                path.reverse();
                return Some(path);
            }
            for next in self.dependencies_of(current) {
                if seen.insert(next) {
                    parents.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Whether adding `from -> to` would close a cycle.
    pub fn would_create_cycle(&self, from: Uuid, to: Uuid) -> bool {
        from == to || self.find_path(to, from).is_some()
    }

    /// Insert `from -> to`. On rejection the graph is unchanged and the
    /// returned path shows the cycle that the edge would have closed.
    pub fn insert_edge(&mut self, from: Uuid, to: Uuid) -> Result<(), Vec<Uuid>> {
        if from == to {
            return Err(vec![from, from]);
        }
        if let Some(mut path) = self.find_path(to, from) {
            path.push(to);
            return Err(path);
        }
        self.nodes.insert(from);
        self.nodes.insert(to);
        self.dependencies.entry(from).or_default().insert(to);
        Ok(())
    }

    pub fn clear_dependencies(&mut self, id: Uuid) {
        self.dependencies.remove(&id);
    }

    pub fn remove_node(&mut self, id: Uuid) {
        self.nodes.remove(&id);
        self.dependencies.remove(&id);
        for deps in self.dependencies.values_mut() {
            deps.remove(&id);
        }
        self.dependencies.retain(|_, deps| !deps.is_empty());
    }

    /// Dependencies-first ordering (Kahn's algorithm).
    pub fn topological_order(&self) -> Vec<Uuid> {
        let mut remaining: BTreeMap<Uuid, usize> = self
            .nodes
            .iter()
            .map(|id| (*id, self.dependencies.get(id).map_or(0, BTreeSet::len)))
            .collect();
        let mut ready: VecDeque<Uuid> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = ready.pop_front() {
            order.push(id);
            for dependent in self.dependents_of(id) {
                if let Some(count) = remaining.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(dependent);
                    }
                }
            }
        }
        order
    }
}
