//! Identity graph over users and contact-attribute keys.
//!
//! Nodes are real user IDs plus [`MatchKey`]s. Each user row contributes an
//! edge to its phone key and an edge to its email key, so two users end up
//! in the same component exactly when a chain of shared keys links them.
//!
//! Connectivity is tracked incrementally with a disjoint-set forest over an
//! arena of interned nodes; the edge set is kept only for reporting.
//!
//! # Invariants
//!
//! 1. **One node per value:** `index[nodes[i]] == i` for every arena slot.
//! 2. **Tagged nodes:** users and keys are distinct enum variants, so a key
//!    can never collide with a user ID whatever its text.
//! 3. **Set semantics:** re-adding an edge or node is a no-op.
//! 4. **Forest shape:** `parent[root] == root`; `size[root]` is the number of
//!    nodes in that root's component. Non-root `size` entries are stale.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::{MatchKey, UserId, UserRecord};
use crate::normalize::Normalizer;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    User(UserId),
    Key(MatchKey),
}

impl Node {
    pub fn as_user(&self) -> Option<&UserId> {
        match self {
            Self::User(id) => Some(id),
            Self::Key(_) => None,
        }
    }

    pub fn as_key(&self) -> Option<&MatchKey> {
        match self {
            Self::User(_) => None,
            Self::Key(key) => Some(key),
        }
    }
}

#[derive(Default, Debug, Clone)]
pub struct IdentityGraph {
    nodes: Vec<Node>,
    index: FxHashMap<Node, usize>,
    parent: Vec<usize>,
    size: Vec<usize>,
    /// Undirected edges stored as (lower, higher) arena indices.
    edges: FxHashSet<(usize, usize)>,
}

impl IdentityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a node, returning its arena index.
    pub fn add_node(&mut self, node: Node) -> usize {
        if let Some(&i) = self.index.get(&node) {
            return i;
        }
        let i = self.nodes.len();
        self.nodes.push(node.clone());
        self.index.insert(node, i);
        self.parent.push(i);
        self.size.push(1);
        i
    }

    /// Add an undirected edge, interning both ends.
    pub fn add_edge(&mut self, a: Node, b: Node) {
        let a = self.add_node(a);
        let b = self.add_node(b);
        if a == b {
            return;
        }
        if self.edges.insert((a.min(b), a.max(b))) {
            self.union(a, b);
        }
    }

    /// Insert a user row: its ID node plus one edge per match key.
    ///
    /// The ID node is added even when no key survives normalization, so the
    /// user still forms its own component.
    pub fn add_record(&mut self, record: &UserRecord, normalizer: &Normalizer) {
        self.add_node(Node::User(record.id.clone()));
        for key in normalizer.keys(record) {
            self.add_edge(Node::User(record.id.clone()), Node::Key(key));
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn user_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.as_user().is_some()).count()
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.index.contains_key(node)
    }

    /// Whether two nodes are in the same component. Unknown nodes are
    /// connected to nothing.
    pub fn connected(&self, a: &Node, b: &Node) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&a), Some(&b)) => self.root(a) == self.root(b),
            _ => false,
        }
    }

    /// Connected components as groups of nodes, in first-seen order of
    /// their earliest node.
    pub fn components(&self) -> Vec<Vec<&Node>> {
        let mut slot_of_root: FxHashMap<usize, usize> = FxHashMap::default();
        let mut components: Vec<Vec<&Node>> = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            let root = self.root(i);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                components.push(Vec::with_capacity(self.size[root]));
                components.len() - 1
            });
            components[slot].push(node);
        }
        components
    }

    /// Root lookup without compression; the forest stays shallow because
    /// unions go by size and `find_mut` halves paths during construction.
    fn root(&self, mut i: usize) -> usize {
        while self.parent[i] != i {
            i = self.parent[i];
        }
        i
    }

    fn find_mut(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find_mut(a);
        let rb = self.find_mut(b);
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] { (ra, rb) } else { (rb, ra) };
        self.parent[small] = big;
        self.size[big] += self.size[small];
    }
}

/// Build the identity graph for a user table.
pub fn build_graph(records: &[UserRecord], normalizer: &Normalizer) -> IdentityGraph {
    let mut graph = IdentityGraph::new();
    for record in records {
        graph.add_record(record, normalizer);
    }
    tracing::debug!(
        rows = records.len(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "identity graph built"
    );
    graph
}
