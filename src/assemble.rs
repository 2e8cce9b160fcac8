//! Merge & prune assembler: many import specs in, one term set out.
//!
//! Assembly runs in two passes. The collect pass turns each spec and its
//! closures into a list of term contributions and policy edges, looking at
//! nothing but that spec and the set of covered IDs. The merge pass folds
//! the contributions together in spec order and then places terms that no
//! policy gave a parent. Merging never drops a collected term or edge.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::closure::ClosureResult;
use crate::import::{ImportSpec, Intermediates, Relation};
use crate::project::LabelLookup;
use crate::term::TermId;

/// Closures computed for one spec, index-aligned with the spec sequence.
#[derive(Debug, Clone, Default)]
pub struct SeedClosures {
    /// Ancestor closure of the seed. Needed for `ancestors` and placement.
    pub ancestors: Option<ClosureResult>,
    /// Descendant closure of the seed, when `descendants` is requested.
    pub descendants: Option<ClosureResult>,
    /// Direct parents, when `parents` is requested.
    pub parents: Vec<TermId>,
    /// Direct children, when `children` is requested.
    pub children: Vec<TermId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssembleOptions {
    /// Link covered terms without a policy edge to their nearest retained
    /// ancestors. Off by default: a placement edge can be superseded once
    /// another spec gives the term a parent, so adding specs may drop it.
    pub placement: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Coverage {
    /// Named directly by at least one spec.
    Covered,
    /// Pulled in only through another spec's relations.
    Synthetic,
}

/// Why a synthetic term is present: it is `relation` of the requester `of`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Reason {
    pub relation: Relation,
    pub of: TermId,
}

/// Annotation predicates selected for a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PredicateSelection {
    All,
    Only(Vec<TermId>),
}

impl PredicateSelection {
    fn from_spec(predicates: Option<&Vec<TermId>>) -> Self {
        match predicates {
            Some(list) => PredicateSelection::Only(list.clone()),
            None => PredicateSelection::All,
        }
    }

    /// Union: `All` absorbs any restriction.
    fn merge(&mut self, other: Option<&Vec<TermId>>) {
        let Some(theirs) = other else {
            *self = PredicateSelection::All;
            return;
        };
        if let PredicateSelection::Only(mine) = self {
            for p in theirs {
                push_unique(mine, p.clone());
            }
        }
    }

    pub fn includes(&self, predicate: &TermId) -> bool {
        match self {
            PredicateSelection::All => true,
            PredicateSelection::Only(list) => list.contains(predicate),
        }
    }
}

/// A retained term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Term {
    pub id: TermId,
    pub label: Option<String>,
    pub coverage: Coverage,
    /// Source groups of the specs that contributed this term.
    pub sources: Vec<String>,
    pub reasons: Vec<Reason>,
    pub predicates: PredicateSelection,
    /// Provenance IRIs from the contributing specs.
    pub imported_from: Vec<String>,
}

impl Term {
    pub fn is_covered(&self) -> bool {
        self.coverage == Coverage::Covered
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// A hierarchy triple present in the store.
    Hierarchy,
    /// Collapses pruned intermediates between a seed and its anchor.
    Bypass,
    /// From an explicit `Parent ID`.
    Override,
    /// Hangs a parentless covered term under its nearest retained ancestor.
    Placement,
}

/// Directed parent → child link between two retained terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub parent: TermId,
    pub child: TermId,
    pub kind: EdgeKind,
}

/// The assembled terms and the edges connecting them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TermSet {
    terms: Vec<Term>,
    edges: Vec<Edge>,
    #[serde(skip)]
    index: HashMap<TermId, usize>,
}

impl PartialEq for TermSet {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms && self.edges == other.edges
    }
}

impl Eq for TermSet {}

impl TermSet {
    /// Terms in order of first appearance.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn get(&self, id: &TermId) -> Option<&Term> {
        self.index.get(id).map(|&i| &self.terms[i])
    }

    pub fn contains(&self, id: &TermId) -> bool {
        self.index.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &TermId> {
        self.terms.iter().map(|t| &t.id)
    }

    pub fn parents_of<'a>(&'a self, id: &'a TermId) -> impl Iterator<Item = &'a TermId> + 'a {
        self.edges
            .iter()
            .filter(move |e| &e.child == id)
            .map(|e| &e.parent)
    }

    pub fn children_of<'a>(&'a self, id: &'a TermId) -> impl Iterator<Item = &'a TermId> + 'a {
        self.edges
            .iter()
            .filter(move |e| &e.parent == id)
            .map(|e| &e.child)
    }

    /// Terms with no retained parent, in term order.
    pub fn roots(&self) -> Vec<&Term> {
        let children: HashSet<&TermId> = self.edges.iter().map(|e| &e.child).collect();
        self.terms
            .iter()
            .filter(|t| !children.contains(&t.id))
            .collect()
    }

    pub fn has_edge(&self, parent: &str, child: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.parent.as_str() == parent && e.child.as_str() == child)
    }
}

// ---------------------------------------------------------------------------
// Collect pass
// ---------------------------------------------------------------------------

struct Contribution {
    spec: usize,
    term: TermId,
    covered: bool,
    reason: Option<Reason>,
}

#[derive(Default)]
struct Collected {
    terms: Vec<Contribution>,
    edges: Vec<Edge>,
}

impl Collected {
    fn term(&mut self, spec: usize, term: &TermId, reason: Option<Reason>) {
        self.terms.push(Contribution {
            spec,
            term: term.clone(),
            covered: reason.is_none(),
            reason,
        });
    }

    fn edge(&mut self, parent: &TermId, child: &TermId, kind: EdgeKind) {
        self.edges.push(Edge {
            parent: parent.clone(),
            child: child.clone(),
            kind,
        });
    }

    /// Terms of `closure` other than the seed, with every traversed edge.
    fn closure(&mut self, spec: usize, closure: &ClosureResult, relation: Relation) {
        for term in closure.related() {
            self.term(spec, term, Some(reason(relation, &closure.seed)));
        }
        for (parent, child) in &closure.edges {
            self.edge(parent, child, EdgeKind::Hierarchy);
        }
    }

    /// Only the anchors of `closure`, linked straight to the seed.
    fn pruned(
        &mut self,
        spec: usize,
        closure: &ClosureResult,
        relation: Relation,
        covered: &HashSet<&TermId>,
    ) {
        let seed = &closure.seed;
        for anchor in closure.anchors(|t| covered.contains(t)) {
            self.term(spec, &anchor, Some(reason(relation, seed)));
            let (parent, child) = match relation {
                Relation::Descendants => (seed, &anchor),
                _ => (&anchor, seed),
            };
            let direct = closure
                .edges
                .iter()
                .any(|(p, c)| p == parent && c == child);
            let kind = if direct {
                EdgeKind::Hierarchy
            } else {
                EdgeKind::Bypass
            };
            self.edge(parent, child, kind);
        }
    }
}

fn reason(relation: Relation, of: &TermId) -> Reason {
    Reason {
        relation,
        of: of.clone(),
    }
}

fn collect(
    index: usize,
    spec: &ImportSpec,
    closures: &SeedClosures,
    covered: &HashSet<&TermId>,
) -> Collected {
    let mut out = Collected::default();
    let seed = &spec.id;
    out.term(index, seed, None);

    for relation in &spec.related {
        match relation {
            Relation::Ancestors => {
                let Some(closure) = &closures.ancestors else {
                    continue;
                };
                match spec.intermediates {
                    Intermediates::All => out.closure(index, closure, Relation::Ancestors),
                    Intermediates::None => {
                        out.pruned(index, closure, Relation::Ancestors, covered)
                    }
                }
            }
            Relation::Descendants => {
                let Some(closure) = &closures.descendants else {
                    continue;
                };
                match spec.intermediates {
                    Intermediates::All => out.closure(index, closure, Relation::Descendants),
                    Intermediates::None => {
                        out.pruned(index, closure, Relation::Descendants, covered)
                    }
                }
            }
            Relation::Parents => {
                for parent in &closures.parents {
                    out.term(index, parent, Some(reason(Relation::Parents, seed)));
                    out.edge(parent, seed, EdgeKind::Hierarchy);
                }
            }
            Relation::Children => {
                for child in &closures.children {
                    out.term(index, child, Some(reason(Relation::Children, seed)));
                    out.edge(seed, child, EdgeKind::Hierarchy);
                }
            }
        }
    }

    if let Some(parent) = &spec.parent {
        // The override replaces whatever parents the policies gave the seed.
        out.edges.retain(|e| &e.child != seed);
        out.term(index, parent, Some(reason(Relation::Parents, seed)));
        out.edge(parent, seed, EdgeKind::Override);
    }

    out
}

// ---------------------------------------------------------------------------
// Merge pass
// ---------------------------------------------------------------------------

/// Assemble the term set for `specs`.
///
/// `closures[i]` belongs to `specs[i]`. Labels come from `labels`, falling
/// back to the spec's own `Label` for seeds.
pub fn assemble<L: LabelLookup + ?Sized>(
    specs: &[ImportSpec],
    closures: &[SeedClosures],
    labels: &L,
    options: AssembleOptions,
) -> TermSet {
    let covered: HashSet<&TermId> = specs.iter().map(|s| &s.id).collect();
    let empty = SeedClosures::default();

    let collected: Vec<Collected> = specs
        .iter()
        .enumerate()
        .map(|(i, spec)| collect(i, spec, closures.get(i).unwrap_or(&empty), &covered))
        .collect();

    let mut terms: Vec<Term> = Vec::new();
    let mut index: HashMap<TermId, usize> = HashMap::new();
    for contribution in collected.iter().flat_map(|c| &c.terms) {
        let spec = &specs[contribution.spec];
        let position = *index.entry(contribution.term.clone()).or_insert_with(|| {
            let label = labels.label(&contribution.term).map(str::to_string).or_else(|| {
                (contribution.covered && spec.id == contribution.term)
                    .then(|| spec.label.clone())
                    .flatten()
            });
            terms.push(Term {
                id: contribution.term.clone(),
                label,
                coverage: Coverage::Synthetic,
                sources: Vec::new(),
                reasons: Vec::new(),
                predicates: PredicateSelection::from_spec(spec.predicates.as_ref()),
                imported_from: Vec::new(),
            });
            terms.len() - 1
        });
        let term = &mut terms[position];
        if contribution.covered {
            term.coverage = Coverage::Covered;
        }
        term.predicates.merge(spec.predicates.as_ref());
        if let Some(source) = &spec.source {
            push_unique(&mut term.sources, source.clone());
        }
        if let Some(iri) = &spec.imported_from {
            push_unique(&mut term.imported_from, iri.clone());
        }
        if let Some(reason) = &contribution.reason {
            push_unique(&mut term.reasons, reason.clone());
        }
    }

    let mut seen: HashSet<(TermId, TermId)> = HashSet::new();
    let mut edges: Vec<Edge> = Vec::new();
    for edge in collected.iter().flat_map(|c| &c.edges) {
        if edge.parent == edge.child {
            continue;
        }
        if seen.insert((edge.parent.clone(), edge.child.clone())) {
            edges.push(edge.clone());
        }
    }

    if options.placement {
        let placed = place(specs, closures, &terms, &index, &edges, &mut seen);
        edges.extend(placed);
    }

    tracing::debug!(
        specs = specs.len(),
        terms = terms.len(),
        edges = edges.len(),
        "assembled term set"
    );

    TermSet {
        terms,
        edges,
        index,
    }
}

/// Placement edges for parentless terms, from the nearest retained terms
/// above them in any ancestor closure that contains them.
fn place(
    specs: &[ImportSpec],
    closures: &[SeedClosures],
    terms: &[Term],
    index: &HashMap<TermId, usize>,
    edges: &[Edge],
    seen: &mut HashSet<(TermId, TermId)>,
) -> Vec<Edge> {
    let has_parent: HashSet<&TermId> = edges.iter().map(|e| &e.child).collect();
    let overridden: HashSet<&TermId> = specs
        .iter()
        .filter(|s| s.parent.is_some())
        .map(|s| &s.id)
        .collect();
    let lineages: Vec<&ClosureResult> = closures.iter().filter_map(|c| c.ancestors.as_ref()).collect();

    let mut placed = Vec::new();
    for term in terms {
        if has_parent.contains(&term.id) || overridden.contains(&term.id) {
            continue;
        }
        for lineage in lineages.iter().filter(|l| l.contains(&term.id)) {
            let nearest =
                lineage.nearest_above(&term.id, |t| t != &term.id && index.contains_key(t));
            for parent in nearest {
                if seen.insert((parent.clone(), term.id.clone())) {
                    placed.push(Edge {
                        parent,
                        child: term.id.clone(),
                        kind: EdgeKind::Placement,
                    });
                }
            }
        }
    }
    placed
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::{ClosureLimits, Direction, Hierarchy, compute_closure, direct_neighbors};
    use crate::store::MemStore;
    use crate::term::{Triple, vocab};

    fn id(s: &str) -> TermId {
        TermId::from(s)
    }

    fn sub(child: &str, parent: &str) -> Triple {
        Triple::new(child, vocab::RDFS_SUBCLASS_OF, parent)
    }

    fn chain() -> MemStore {
        // Root -> X -> Y -> Seed
        MemStore::from_triples(vec![
            sub("EX:X", "EX:Root"),
            sub("EX:Y", "EX:X"),
            sub("EX:Seed", "EX:Y"),
        ])
    }

    fn closures_for(store: &MemStore, specs: &[ImportSpec]) -> Vec<SeedClosures> {
        let hierarchy = Hierarchy::default();
        specs
            .iter()
            .map(|spec| {
                let closure = |direction| {
                    compute_closure(store, &spec.id, &hierarchy, direction, ClosureLimits::default())
                        .unwrap()
                };
                let direct = |direction| {
                    direct_neighbors(store, &spec.id, &hierarchy, direction).unwrap()
                };
                SeedClosures {
                    ancestors: Some(closure(Direction::Ancestors)),
                    descendants: spec
                        .requests(Relation::Descendants)
                        .then(|| closure(Direction::Descendants)),
                    parents: if spec.requests(Relation::Parents) {
                        direct(Direction::Ancestors)
                    } else {
                        Vec::new()
                    },
                    children: if spec.requests(Relation::Children) {
                        direct(Direction::Descendants)
                    } else {
                        Vec::new()
                    },
                }
            })
            .collect()
    }

    fn run(store: &MemStore, specs: &[ImportSpec]) -> TermSet {
        let closures = closures_for(store, specs);
        assemble(specs, &closures, &HashMap::new(), AssembleOptions::default())
    }

    fn ids(set: &TermSet) -> Vec<&str> {
        set.ids().map(TermId::as_str).collect()
    }

    #[test]
    fn intermediates_all_keeps_chain() {
        let store = chain();
        let specs = vec![
            ImportSpec::new("EX:Root"),
            ImportSpec::new("EX:Seed").related([Relation::Ancestors]),
        ];
        let set = run(&store, &specs);
        assert_eq!(ids(&set), vec!["EX:Root", "EX:Seed", "EX:Y", "EX:X"]);
        assert!(set.has_edge("EX:Root", "EX:X"));
        assert!(set.has_edge("EX:X", "EX:Y"));
        assert!(set.has_edge("EX:Y", "EX:Seed"));
        assert!(!set.has_edge("EX:Root", "EX:Seed"));
    }

    #[test]
    fn intermediates_none_bypasses_chain() {
        let store = chain();
        let specs = vec![
            ImportSpec::new("EX:Root"),
            ImportSpec::new("EX:Seed")
                .related([Relation::Ancestors])
                .intermediates(Intermediates::None),
        ];
        let set = run(&store, &specs);
        assert_eq!(ids(&set), vec!["EX:Root", "EX:Seed"]);
        assert_eq!(set.edges().len(), 1);
        assert_eq!(set.edges()[0].kind, EdgeKind::Bypass);
        assert!(set.has_edge("EX:Root", "EX:Seed"));
    }

    #[test]
    fn conflicting_intermediates_keep_full_chain() {
        let store = chain();
        let specs = vec![
            ImportSpec::new("EX:Seed").related([Relation::Ancestors]),
            ImportSpec::new("EX:Seed")
                .related([Relation::Ancestors])
                .intermediates(Intermediates::None),
        ];
        let set = run(&store, &specs);
        assert!(set.contains(&id("EX:X")));
        assert!(set.contains(&id("EX:Y")));
        assert!(set.has_edge("EX:Root", "EX:X"));
        assert!(set.has_edge("EX:X", "EX:Y"));
        assert!(set.has_edge("EX:Y", "EX:Seed"));

        // The pruned request still contributes its bypass edge.
        let bypass: Vec<&Edge> = set
            .edges()
            .iter()
            .filter(|e| e.kind == EdgeKind::Bypass)
            .collect();
        assert_eq!(bypass.len(), 1);
        assert_eq!(bypass[0].parent.as_str(), "EX:Root");
        assert_eq!(bypass[0].child.as_str(), "EX:Seed");
        assert_eq!(set.edges().len(), 4);
    }

    #[test]
    fn children_are_synthetic() {
        let store = MemStore::from_triples(vec![
            sub("EX:dog", "EX:animal"),
            sub("EX:cat", "EX:animal"),
        ]);
        let specs = vec![ImportSpec::new("EX:animal").related([Relation::Children])];
        let set = run(&store, &specs);
        assert_eq!(ids(&set), vec!["EX:animal", "EX:cat", "EX:dog"]);
        let cat = set.get(&id("EX:cat")).unwrap();
        assert_eq!(cat.coverage, Coverage::Synthetic);
        assert_eq!(
            cat.reasons,
            vec![Reason {
                relation: Relation::Children,
                of: id("EX:animal")
            }]
        );
        assert!(set.get(&id("EX:animal")).unwrap().is_covered());
    }

    #[test]
    fn named_term_is_covered_even_if_pulled_in_first() {
        let store = chain();
        let specs = vec![
            ImportSpec::new("EX:Seed").related([Relation::Ancestors]),
            ImportSpec::new("EX:X"),
        ];
        let set = run(&store, &specs);
        assert!(set.get(&id("EX:X")).unwrap().is_covered());
        assert!(!set.get(&id("EX:Y")).unwrap().is_covered());
    }

    #[test]
    fn placement_links_to_nearest_retained_ancestor() {
        let store = chain();
        let specs = vec![ImportSpec::new("EX:Root"), ImportSpec::new("EX:Seed")];
        let closures = closures_for(&store, &specs);
        let placed = assemble(
            &specs,
            &closures,
            &HashMap::new(),
            AssembleOptions { placement: true },
        );
        assert_eq!(placed.edges().len(), 1);
        assert_eq!(placed.edges()[0].kind, EdgeKind::Placement);
        assert!(placed.has_edge("EX:Root", "EX:Seed"));

        assert!(run(&store, &specs).edges().is_empty());
    }

    #[test]
    fn default_assembly_keeps_edges_when_specs_are_added() {
        let store = chain();
        let base = vec![
            ImportSpec::new("EX:Root"),
            ImportSpec::new("EX:Seed").related([Relation::Ancestors]),
        ];
        let small = run(&store, &base);

        for extra in [
            ImportSpec::new("EX:Y"),
            ImportSpec::new("EX:Seed").related([Relation::Parents]),
        ] {
            let mut specs = base.clone();
            specs.push(extra);
            let large = run(&store, &specs);
            for term in small.ids() {
                assert!(large.contains(term), "{term} was dropped");
            }
            for edge in small.edges() {
                assert!(large.has_edge(edge.parent.as_str(), edge.child.as_str()));
            }
        }
    }

    #[test]
    fn parent_override_replaces_hierarchy_parent() {
        let store = chain();
        let specs = vec![
            ImportSpec::new("EX:Seed")
                .related([Relation::Parents])
                .parent("EX:Other"),
        ];
        let set = run(&store, &specs);
        assert!(set.has_edge("EX:Other", "EX:Seed"));
        assert!(!set.has_edge("EX:Y", "EX:Seed"));
        assert!(set.contains(&id("EX:Y")));
    }

    #[test]
    fn assembly_is_idempotent() {
        let store = chain();
        let specs = vec![
            ImportSpec::new("EX:Seed").related([Relation::Ancestors, Relation::Parents]),
            ImportSpec::new("EX:X").related([Relation::Descendants]),
        ];
        assert_eq!(run(&store, &specs), run(&store, &specs));
    }

    #[test]
    fn predicate_selections_are_unioned() {
        let store = chain();
        let mut a = ImportSpec::new("EX:Seed");
        a.predicates = Some(vec![id(vocab::RDFS_LABEL)]);
        let mut b = ImportSpec::new("EX:Seed");
        b.predicates = Some(vec![id("IAO:0000115")]);
        let set = run(&store, &[a.clone(), b]);
        let seed = set.get(&id("EX:Seed")).unwrap();
        assert_eq!(
            seed.predicates,
            PredicateSelection::Only(vec![id(vocab::RDFS_LABEL), id("IAO:0000115")])
        );

        let set = run(&store, &[a, ImportSpec::new("EX:Seed")]);
        assert_eq!(
            set.get(&id("EX:Seed")).unwrap().predicates,
            PredicateSelection::All
        );
    }
}
