//! Directed graphs over solver atoms.
//!
//! A thin wrapper over `petgraph`'s adjacency-map graph providing the
//! operations the solver pipeline needs: weakly- and strongly-connected
//! components, condensation, predecessor/successor queries, node-merging
//! `map`, and `sequence`. Nodes are inserted in sorted order so component
//! traversals and error reports are reproducible.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::hash::Hash;

use petgraph::Direction::{Incoming, Outgoing};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

/// A directed graph with set-like nodes. Edges carry no weight; an edge
/// `a → b` encodes `a <: b`.
#[derive(Debug, Clone)]
pub struct Graph<A: Copy + Ord + Hash> {
    inner: DiGraphMap<A, ()>,
}

impl<A: Copy + Ord + Hash> Default for Graph<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Copy + Ord + Hash> Graph<A> {
    pub fn new() -> Self {
        Self {
            inner: DiGraphMap::new(),
        }
    }

    /// Build from edges. Self-loops are dropped (`a <: a` is trivially
    /// satisfied); nodes are added in sorted order for determinism.
    pub fn from_edges(edges: impl IntoIterator<Item = (A, A)>) -> Self {
        let edges: Vec<(A, A)> = edges.into_iter().collect();
        let nodes: BTreeSet<A> = edges.iter().flat_map(|&(a, b)| [a, b]).collect();
        let mut g = Self::new();
        for n in nodes {
            g.inner.add_node(n);
        }
        for (a, b) in edges {
            if a != b {
                g.inner.add_edge(a, b, ());
            }
        }
        g
    }

    pub fn add_node(&mut self, node: A) {
        self.inner.add_node(node);
    }

    pub fn add_edge(&mut self, from: A, to: A) {
        if from != to {
            self.inner.add_edge(from, to, ());
        }
    }

    pub fn contains(&self, node: A) -> bool {
        self.inner.contains_node(node)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn nodes(&self) -> Vec<A> {
        let mut nodes: Vec<A> = self.inner.nodes().collect();
        nodes.sort();
        nodes
    }

    pub fn edges(&self) -> Vec<(A, A)> {
        let mut edges: Vec<(A, A)> = self.inner.all_edges().map(|(a, b, _)| (a, b)).collect();
        edges.sort();
        edges
    }

    /// Direct successors: all `b` with `node → b`.
    pub fn succs(&self, node: A) -> BTreeSet<A> {
        self.inner.neighbors_directed(node, Outgoing).collect()
    }

    /// Direct predecessors: all `a` with `a → node`.
    pub fn preds(&self, node: A) -> BTreeSet<A> {
        self.inner.neighbors_directed(node, Incoming).collect()
    }

    pub fn remove_node(&mut self, node: A) {
        self.inner.remove_node(node);
    }

    pub fn remove_nodes(&mut self, nodes: &BTreeSet<A>) {
        for &n in nodes {
            self.inner.remove_node(n);
        }
    }

    /// Weakly-connected components, each as a set of vertices.
    pub fn wccs(&self) -> Vec<BTreeSet<A>> {
        let mut visited: BTreeSet<A> = BTreeSet::new();
        let mut components = Vec::new();
        for start in self.nodes() {
            if visited.contains(&start) {
                continue;
            }
            let mut component = BTreeSet::new();
            let mut queue = VecDeque::from([start]);
            while let Some(n) = queue.pop_front() {
                if !component.insert(n) {
                    continue;
                }
                visited.insert(n);
                queue.extend(self.inner.neighbors_directed(n, Outgoing));
                queue.extend(self.inner.neighbors_directed(n, Incoming));
            }
            components.push(component);
        }
        components
    }

    /// Strongly-connected components, ordered by smallest member.
    pub fn sccs(&self) -> Vec<BTreeSet<A>> {
        let mut components: Vec<BTreeSet<A>> = tarjan_scc(&self.inner)
            .into_iter()
            .map(|comp| comp.into_iter().collect())
            .collect();
        components.sort_by_key(|comp| comp.first().copied());
        components
    }

    /// Condense to the DAG of strongly-connected components. Returns the
    /// components and a graph over their indices that preserves
    /// reachability.
    pub fn condensation(&self) -> (Vec<BTreeSet<A>>, Graph<usize>) {
        let components = self.sccs();
        let mut index: BTreeMap<A, usize> = BTreeMap::new();
        for (i, comp) in components.iter().enumerate() {
            for &node in comp {
                index.insert(node, i);
            }
        }
        let mut condensed = Graph::new();
        for i in 0..components.len() {
            condensed.add_node(i);
        }
        for (a, b) in self.edges() {
            condensed.add_edge(index[&a], index[&b]);
        }
        (components, condensed)
    }

    /// Relabel nodes through `f`, merging nodes that map to the same label
    /// and dropping any resulting self-loops.
    pub fn map<B: Copy + Ord + Hash>(&self, f: impl Fn(A) -> B) -> Graph<B> {
        let mut g = Graph::new();
        for n in self.nodes() {
            g.add_node(f(n));
        }
        for (a, b) in self.edges() {
            g.add_edge(f(a), f(b));
        }
        g
    }

    /// Turn a graph of optional labels into an optional graph: `None` when
    /// any node is `None`.
    pub fn sequence(optional: &Graph<Option<A>>) -> Option<Graph<A>> {
        if optional.nodes().iter().any(Option::is_none) {
            return None;
        }
        Some(optional.map(|n| n.unwrap_or_else(|| unreachable!("checked all nodes are Some"))))
    }
}
