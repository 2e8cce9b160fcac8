//! Closure engine: ancestor and descendant closures over hierarchy predicates.
//!
//! Each call runs a breadth-first traversal with its own visited set, so
//! closures for different seeds never share state and can be computed in
//! parallel. The hierarchy graph is not required to be acyclic.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};

use crate::error::{ClosureError, TraversalLimit};
use crate::store::{StoreResult, TripleSource};
use crate::term::{Object, TermId, vocab};

/// Which way to walk the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    /// Follow `seed --predicate--> parent` edges.
    Ancestors,
    /// Follow the same edges inward, towards children.
    Descendants,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Ancestors => write!(f, "ancestors"),
            Direction::Descendants => write!(f, "descendants"),
        }
    }
}

/// Optional traversal ceilings. Exceeding one is an error, never a truncation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosureLimits {
    /// Maximum hop distance from the seed.
    pub max_depth: Option<usize>,
    /// Maximum number of terms in one closure, seed included.
    pub max_terms: Option<usize>,
}

/// The hierarchy relation: which predicates to follow and where to stop.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    predicates: Vec<TermId>,
    universal_root: Option<TermId>,
}

impl Hierarchy {
    pub fn new<I, T>(predicates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TermId>,
    {
        Self {
            predicates: predicates.into_iter().map(Into::into).collect(),
            universal_root: None,
        }
    }

    /// A universal root (usually `owl:Thing`) is never entered by an
    /// ancestor walk; its direct children are the top-level terms.
    pub fn with_universal_root(mut self, root: impl Into<TermId>) -> Self {
        self.universal_root = Some(root.into());
        self
    }

    pub fn predicates(&self) -> &[TermId] {
        &self.predicates
    }

    pub fn universal_root(&self) -> Option<&TermId> {
        self.universal_root.as_ref()
    }

    pub fn is_hierarchy_predicate(&self, predicate: &TermId) -> bool {
        self.predicates.contains(predicate)
    }

    fn admits(&self, term: &TermId, from: &TermId) -> bool {
        !term.is_blank() && term != from && self.universal_root.as_ref() != Some(term)
    }
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new([vocab::RDFS_SUBCLASS_OF, vocab::RDFS_SUBPROPERTY_OF])
            .with_universal_root(vocab::OWL_THING)
    }
}

/// The closure of one seed in one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosureResult {
    pub seed: TermId,
    pub direction: Direction,
    /// Seed first, then breadth-first discovery order. Each term once.
    pub terms: Vec<TermId>,
    /// Every hierarchy edge traversed, as `(parent, child)`.
    pub edges: Vec<(TermId, TermId)>,
    /// Groups of terms that form a cycle within the closure.
    pub cycles: Vec<Vec<TermId>>,
    /// Largest hop distance reached.
    pub depth: usize,
}

/// Direct hierarchy neighbours of `term`, sorted.
///
/// Parents are the non-blank objects of `term`'s hierarchy triples;
/// children are the subjects pointing at `term` through one.
pub fn direct_neighbors<S: TripleSource + ?Sized>(
    source: &S,
    term: &TermId,
    hierarchy: &Hierarchy,
    direction: Direction,
) -> StoreResult<Vec<TermId>> {
    let mut neighbors: Vec<TermId> = match direction {
        Direction::Ancestors => source
            .triples_with_subject(term)?
            .into_iter()
            .filter(|t| hierarchy.is_hierarchy_predicate(&t.predicate))
            .filter_map(|t| match t.object {
                Object::Term(parent) => Some(parent),
                Object::Literal(_) => None,
            })
            .collect(),
        Direction::Descendants => {
            let mut children = Vec::new();
            for predicate in hierarchy.predicates() {
                children.extend(source.subjects_with_object(predicate, term)?);
            }
            children
        }
    };
    neighbors.retain(|n| hierarchy.admits(n, term));
    neighbors.sort();
    neighbors.dedup();
    Ok(neighbors)
}

/// Compute the reflexive closure of `seed` in `direction`.
///
/// A seed absent from the store yields a closure holding only the seed;
/// callers check existence separately.
pub fn compute_closure<S: TripleSource + ?Sized>(
    source: &S,
    seed: &TermId,
    hierarchy: &Hierarchy,
    direction: Direction,
    limits: ClosureLimits,
) -> Result<ClosureResult, ClosureError> {
    let mut visited: HashSet<TermId> = HashSet::new();
    let mut terms = vec![seed.clone()];
    let mut edges = Vec::new();
    let mut depth_reached = 0;

    let mut queue: VecDeque<(TermId, usize)> = VecDeque::new();
    visited.insert(seed.clone());
    queue.push_back((seed.clone(), 0));

    while let Some((term, depth)) = queue.pop_front() {
        for next in direct_neighbors(source, &term, hierarchy, direction)? {
            match direction {
                Direction::Ancestors => edges.push((next.clone(), term.clone())),
                Direction::Descendants => edges.push((term.clone(), next.clone())),
            }
            if !visited.insert(next.clone()) {
                continue;
            }
            let next_depth = depth + 1;
            if limits.max_depth.is_some_and(|max| next_depth > max) {
                return Err(ClosureError::LimitExceeded {
                    seed: seed.to_string(),
                    limit: TraversalLimit::Depth(limits.max_depth.unwrap_or_default()),
                });
            }
            if limits.max_terms.is_some_and(|max| terms.len() >= max) {
                return Err(ClosureError::LimitExceeded {
                    seed: seed.to_string(),
                    limit: TraversalLimit::Terms(limits.max_terms.unwrap_or_default()),
                });
            }
            depth_reached = depth_reached.max(next_depth);
            terms.push(next.clone());
            queue.push_back((next, next_depth));
        }
    }

    let cycles = find_cycles(&terms, &edges);
    tracing::debug!(
        seed = %seed,
        %direction,
        terms = terms.len(),
        depth = depth_reached,
        cycles = cycles.len(),
        "computed closure"
    );

    Ok(ClosureResult {
        seed: seed.clone(),
        direction,
        terms,
        edges,
        cycles,
        depth: depth_reached,
    })
}

/// Strongly connected components with more than one member, in term order.
fn find_cycles(terms: &[TermId], edges: &[(TermId, TermId)]) -> Vec<Vec<TermId>> {
    let position: HashMap<&TermId, usize> = terms.iter().enumerate().map(|(i, t)| (t, i)).collect();
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for i in 0..terms.len() {
        graph.add_node(i);
    }
    for (parent, child) in edges {
        if let (Some(&p), Some(&c)) = (position.get(parent), position.get(child)) {
            graph.add_edge(p, c, ());
        }
    }
    let mut cycles: Vec<Vec<TermId>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|mut component| {
            component.sort_unstable();
            component.into_iter().map(|i| terms[i].clone()).collect()
        })
        .collect();
    cycles.sort_by_key(|c| position.get(&c[0]).copied());
    cycles
}

impl ClosureResult {
    pub fn contains(&self, term: &TermId) -> bool {
        self.terms.contains(term)
    }

    /// Terms other than the seed.
    pub fn related(&self) -> &[TermId] {
        &self.terms[1..]
    }

    pub fn is_cyclic(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// Adjacency pointing away from the seed: parents for an ancestor
    /// closure, children for a descendant closure.
    fn outward(&self) -> HashMap<&TermId, Vec<&TermId>> {
        let mut next: HashMap<&TermId, Vec<&TermId>> = HashMap::new();
        for (parent, child) in &self.edges {
            let (from, to) = match self.direction {
                Direction::Ancestors => (child, parent),
                Direction::Descendants => (parent, child),
            };
            next.entry(from).or_default().push(to);
        }
        next
    }

    /// Nearest terms away from the seed that satisfy `stop`, falling back to
    /// the frontier (maximal ancestors or leaf descendants) on paths where
    /// nothing does. These are the terms kept when intermediates are pruned.
    ///
    /// Returned in discovery order; the seed itself is never an anchor.
    pub fn anchors(&self, stop: impl Fn(&TermId) -> bool) -> Vec<TermId> {
        let next = self.outward();
        let mut found: HashSet<&TermId> = HashSet::new();
        let mut seen: HashSet<&TermId> = HashSet::from([&self.seed]);
        let mut queue = VecDeque::from([&self.seed]);

        while let Some(term) = queue.pop_front() {
            let onward = next.get(term).map(Vec::as_slice).unwrap_or_default();
            for &candidate in onward {
                if !seen.insert(candidate) {
                    continue;
                }
                let frontier = next.get(candidate).is_none_or(|n| n.is_empty());
                if stop(candidate) || frontier {
                    found.insert(candidate);
                } else {
                    queue.push_back(candidate);
                }
            }
        }

        self.terms
            .iter()
            .filter(|t| found.contains(t))
            .cloned()
            .collect()
    }

    /// For an ancestor closure: the nearest terms above `term` that satisfy
    /// `keep`, without any frontier fallback. Used to hang a term under
    /// whatever part of its lineage survived assembly.
    pub fn nearest_above(&self, term: &TermId, keep: impl Fn(&TermId) -> bool) -> Vec<TermId> {
        let next = self.outward();
        let mut found: HashSet<&TermId> = HashSet::new();
        let mut seen: HashSet<&TermId> = HashSet::new();
        let Some(start) = self.terms.iter().find(|t| *t == term) else {
            return Vec::new();
        };
        seen.insert(start);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for &candidate in next.get(current).map(Vec::as_slice).unwrap_or_default() {
                if !seen.insert(candidate) {
                    continue;
                }
                if keep(candidate) {
                    found.insert(candidate);
                } else {
                    queue.push_back(candidate);
                }
            }
        }
        self.terms
            .iter()
            .filter(|t| found.contains(t))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use crate::term::Triple;

    fn id(s: &str) -> TermId {
        TermId::from(s)
    }

    fn sub(child: &str, parent: &str) -> Triple {
        Triple::new(child, vocab::RDFS_SUBCLASS_OF, parent)
    }

    fn names(terms: &[TermId]) -> Vec<&str> {
        terms.iter().map(TermId::as_str).collect()
    }

    fn animals() -> MemStore {
        MemStore::from_triples(vec![
            sub("EX:animal", vocab::OWL_THING),
            sub("EX:mammal", "EX:animal"),
            sub("EX:dog", "EX:mammal"),
            sub("EX:cat", "EX:mammal"),
            sub("EX:puppy", "EX:dog"),
        ])
    }

    #[test]
    fn ancestors_stop_below_universal_root() {
        let store = animals();
        let result = compute_closure(
            &store,
            &id("EX:dog"),
            &Hierarchy::default(),
            Direction::Ancestors,
            ClosureLimits::default(),
        )
        .unwrap();
        assert_eq!(names(&result.terms), vec!["EX:dog", "EX:mammal", "EX:animal"]);
        assert_eq!(result.depth, 2);
        assert!(result.edges.contains(&(id("EX:mammal"), id("EX:dog"))));
    }

    #[test]
    fn descendants_in_sorted_breadth_first_order() {
        let store = animals();
        let result = compute_closure(
            &store,
            &id("EX:mammal"),
            &Hierarchy::default(),
            Direction::Descendants,
            ClosureLimits::default(),
        )
        .unwrap();
        assert_eq!(
            names(&result.terms),
            vec!["EX:mammal", "EX:cat", "EX:dog", "EX:puppy"]
        );
    }

    #[test]
    fn cycle_terminates_with_each_term_once() {
        let store = MemStore::from_triples(vec![
            sub("EX:A", "EX:B"),
            sub("EX:B", "EX:C"),
            sub("EX:C", "EX:A"),
        ]);
        let result = compute_closure(
            &store,
            &id("EX:A"),
            &Hierarchy::default(),
            Direction::Ancestors,
            ClosureLimits::default(),
        )
        .unwrap();
        assert_eq!(names(&result.terms), vec!["EX:A", "EX:B", "EX:C"]);
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(result.cycles[0].len(), 3);
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let store = MemStore::from_triples(vec![
            sub("EX:d", "EX:b"),
            sub("EX:d", "EX:c"),
            sub("EX:b", "EX:a"),
            sub("EX:c", "EX:a"),
        ]);
        let result = compute_closure(
            &store,
            &id("EX:d"),
            &Hierarchy::default(),
            Direction::Ancestors,
            ClosureLimits::default(),
        )
        .unwrap();
        assert_eq!(result.terms.len(), 4);
        assert!(!result.is_cyclic());
    }

    #[test]
    fn blank_parents_are_ignored() {
        let store = MemStore::from_triples(vec![sub("EX:a", "_:r0"), sub("EX:a", "EX:b")]);
        let parents =
            direct_neighbors(&store, &id("EX:a"), &Hierarchy::default(), Direction::Ancestors)
                .unwrap();
        assert_eq!(parents, vec![id("EX:b")]);
    }

    #[test]
    fn unknown_seed_yields_only_itself() {
        let store = MemStore::new();
        let result = compute_closure(
            &store,
            &id("EX:none"),
            &Hierarchy::default(),
            Direction::Descendants,
            ClosureLimits::default(),
        )
        .unwrap();
        assert_eq!(names(&result.terms), vec!["EX:none"]);
        assert!(result.related().is_empty());
    }

    #[test]
    fn depth_limit_is_reported() {
        let store = animals();
        let err = compute_closure(
            &store,
            &id("EX:puppy"),
            &Hierarchy::default(),
            Direction::Ancestors,
            ClosureLimits {
                max_depth: Some(1),
                max_terms: None,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ClosureError::LimitExceeded {
                limit: TraversalLimit::Depth(1),
                ..
            }
        ));
    }

    #[test]
    fn term_limit_is_reported() {
        let store = animals();
        let err = compute_closure(
            &store,
            &id("EX:animal"),
            &Hierarchy::default(),
            Direction::Descendants,
            ClosureLimits {
                max_depth: None,
                max_terms: Some(3),
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ClosureError::LimitExceeded {
                limit: TraversalLimit::Terms(3),
                ..
            }
        ));
    }

    #[test]
    fn anchors_skip_uncovered_intermediates() {
        // Root -> X -> Y -> Seed
        let store = MemStore::from_triples(vec![
            sub("EX:X", "EX:Root"),
            sub("EX:Y", "EX:X"),
            sub("EX:Seed", "EX:Y"),
        ]);
        let result = compute_closure(
            &store,
            &id("EX:Seed"),
            &Hierarchy::default(),
            Direction::Ancestors,
            ClosureLimits::default(),
        )
        .unwrap();
        // Nothing covered: fall back to the maximal ancestor.
        assert_eq!(result.anchors(|_| false), vec![id("EX:Root")]);
        // A covered intermediate is the nearest anchor.
        assert_eq!(result.anchors(|t| t.as_str() == "EX:X"), vec![id("EX:X")]);
    }

    #[test]
    fn descendant_anchors_are_leaves() {
        let store = animals();
        let result = compute_closure(
            &store,
            &id("EX:animal"),
            &Hierarchy::default(),
            Direction::Descendants,
            ClosureLimits::default(),
        )
        .unwrap();
        assert_eq!(result.anchors(|_| false), vec![id("EX:cat"), id("EX:puppy")]);
    }

    #[test]
    fn nearest_above_finds_retained_ancestor() {
        let store = animals();
        let result = compute_closure(
            &store,
            &id("EX:puppy"),
            &Hierarchy::default(),
            Direction::Ancestors,
            ClosureLimits::default(),
        )
        .unwrap();
        let kept = result.nearest_above(&id("EX:puppy"), |t| t.as_str() == "EX:animal");
        assert_eq!(kept, vec![id("EX:animal")]);
        assert!(result.nearest_above(&id("EX:other"), |_| true).is_empty());
    }
}
