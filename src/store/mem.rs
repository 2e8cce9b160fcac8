//! In-memory triple store with dual indexing.
//!
//! Subject lookups go through a `DashMap`; incoming term edges live in a
//! `petgraph` graph so descendant traversal is a direct `Incoming` walk.

use std::sync::RwLock;

use dashmap::DashMap;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::store::{StoreResult, TripleSource};
use crate::term::{Object, TermId, Triple};

/// Concurrent in-memory store. All data is lost on process exit.
pub struct MemStore {
    /// Subject → triples (source of truth).
    by_subject: DashMap<TermId, Vec<Triple>>,
    /// Term-to-term edges, weighted by predicate.
    graph: RwLock<DiGraph<TermId, TermId>>,
    /// TermId → NodeIndex mapping for O(1) node lookups.
    node_index: DashMap<TermId, NodeIndex>,
    /// Literal value → (predicate, subject) pairs.
    by_value: DashMap<String, Vec<(TermId, TermId)>>,
    triple_count: std::sync::atomic::AtomicUsize,
}

impl MemStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            by_subject: DashMap::new(),
            graph: RwLock::new(DiGraph::new()),
            node_index: DashMap::new(),
            by_value: DashMap::new(),
            triple_count: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Build a store from a batch of triples.
    pub fn from_triples<I: IntoIterator<Item = Triple>>(triples: I) -> Self {
        let store = Self::new();
        for triple in triples {
            store.insert(&triple);
        }
        store
    }

    /// Ensure a node exists for the given term, returning its NodeIndex.
    fn ensure_node(&self, term: &TermId) -> NodeIndex {
        if let Some(idx) = self.node_index.get(term) {
            return *idx.value();
        }
        let mut graph = self.graph.write().expect("graph lock poisoned");
        // Double-check after acquiring write lock
        if let Some(idx) = self.node_index.get(term) {
            return *idx.value();
        }
        let idx = graph.add_node(term.clone());
        self.node_index.insert(term.clone(), idx);
        idx
    }

    /// Insert a triple. Exact duplicates are ignored.
    pub fn insert(&self, triple: &Triple) {
        {
            let mut rows = self.by_subject.entry(triple.subject.clone()).or_default();
            if rows.contains(triple) {
                return;
            }
            rows.push(triple.clone());
        }

        match &triple.object {
            Object::Term(object) => {
                let subj_idx = self.ensure_node(&triple.subject);
                let obj_idx = self.ensure_node(object);
                let mut graph = self.graph.write().expect("graph lock poisoned");
                graph.add_edge(subj_idx, obj_idx, triple.predicate.clone());
            }
            Object::Literal(literal) => {
                self.by_value
                    .entry(literal.value.clone())
                    .or_default()
                    .push((triple.predicate.clone(), triple.subject.clone()));
            }
        }

        self.triple_count
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    /// Number of distinct triples.
    pub fn triple_count(&self) -> usize {
        self.triple_count
            .load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Number of distinct subjects.
    pub fn subject_count(&self) -> usize {
        self.by_subject.len()
    }

    /// All triples, sorted.
    pub fn all_triples(&self) -> Vec<Triple> {
        let mut all: Vec<Triple> = self
            .by_subject
            .iter()
            .flat_map(|e| e.value().clone())
            .collect();
        all.sort();
        all
    }
}

impl TripleSource for MemStore {
    fn triples_with_subject(&self, subject: &TermId) -> StoreResult<Vec<Triple>> {
        Ok(self
            .by_subject
            .get(subject)
            .map(|rows| rows.value().clone())
            .unwrap_or_default())
    }

    fn subjects_with_object(
        &self,
        predicate: &TermId,
        object: &TermId,
    ) -> StoreResult<Vec<TermId>> {
        let obj_idx = match self.node_index.get(object) {
            Some(idx) => *idx.value(),
            None => return Ok(vec![]),
        };
        let graph = self.graph.read().expect("graph lock poisoned");
        Ok(graph
            .edges_directed(obj_idx, Direction::Incoming)
            .filter(|e| e.weight() == predicate)
            .filter_map(|e| graph.node_weight(e.source()).cloned())
            .collect())
    }

    fn subjects_with_value(&self, predicate: &TermId, value: &str) -> StoreResult<Vec<TermId>> {
        Ok(self
            .by_value
            .get(value)
            .map(|rows| {
                rows.value()
                    .iter()
                    .filter(|(p, _)| p == predicate)
                    .map(|(_, s)| s.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemStore")
            .field("subjects", &self.subject_count())
            .field("triples", &self.triple_count())
            .finish()
    }
}
