//! Stanza resolution: a term's full description as one unit.
//!
//! A stanza is every triple whose subject is the root term, plus the triples
//! of every blank node reachable from it through object positions (OWL
//! restrictions, lists, axiom annotations). Expansion never crosses into
//! another named subject, so a stanza has exactly one non-blank root.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use crate::store::{StoreResult, TripleSource};
use crate::term::{Object, TermId, Triple, vocab};

/// The ordered triples describing one root term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stanza {
    root: TermId,
    triples: Vec<Triple>,
}

/// Outcome of resolving a stanza.
#[derive(Debug, Clone)]
pub struct StanzaResolution {
    pub stanza: Stanza,
    /// Blank-node references that pointed back at an already expanded node.
    pub revisits: usize,
}

/// Resolve the stanza rooted at `root`.
///
/// Triples are ordered breadth-first by subject, sorted within a subject.
/// A root without triples yields an empty stanza, not an error.
pub fn resolve_stanza<S: TripleSource + ?Sized>(
    source: &S,
    root: &TermId,
) -> StoreResult<StanzaResolution> {
    let mut triples = Vec::new();
    let mut expanded: HashSet<TermId> = HashSet::new();
    let mut revisits = 0;
    let mut queue = VecDeque::new();

    expanded.insert(root.clone());
    queue.push_back(root.clone());

    while let Some(subject) = queue.pop_front() {
        let mut rows = source.triples_with_subject(&subject)?;
        rows.sort();
        rows.dedup();
        for triple in rows {
            if let Object::Term(object) = &triple.object {
                if object.is_blank() {
                    if expanded.insert(object.clone()) {
                        queue.push_back(object.clone());
                    } else {
                        revisits += 1;
                    }
                }
            }
            triples.push(triple);
        }
    }

    if revisits > 0 {
        tracing::debug!(root = %root, revisits, "blank-node cycle cut off in stanza");
    }

    Ok(StanzaResolution {
        stanza: Stanza {
            root: root.clone(),
            triples,
        },
        revisits,
    })
}

impl Stanza {
    pub fn root(&self) -> &TermId {
        &self.root
    }

    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Triples whose subject is the root itself.
    pub fn root_triples(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter().filter(|t| t.subject == self.root)
    }

    /// Term objects of the root for `predicate`.
    pub fn objects<'a>(&'a self, predicate: &'a str) -> impl Iterator<Item = &'a TermId> + 'a {
        self.root_triples()
            .filter(move |t| t.predicate.as_str() == predicate)
            .filter_map(|t| t.object.as_term())
    }

    /// Literal values of the root for `predicate`.
    pub fn values<'a>(&'a self, predicate: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.root_triples()
            .filter(move |t| t.predicate.as_str() == predicate)
            .filter_map(|t| t.object.as_literal())
            .map(|l| l.value.as_str())
    }

    pub fn label(&self) -> Option<&str> {
        self.values(vocab::RDFS_LABEL).next()
    }

    /// `rdf:type` objects of the root.
    pub fn types(&self) -> Vec<&TermId> {
        self.objects(vocab::RDF_TYPE).collect()
    }

    /// Every triple nested under `blank`, including its own.
    pub fn nested(&self, blank: &TermId) -> Vec<&Triple> {
        let mut subjects: HashSet<&TermId> = HashSet::new();
        let mut queue = VecDeque::from([blank]);
        subjects.insert(blank);
        while let Some(subject) = queue.pop_front() {
            for triple in self.triples.iter().filter(|t| &t.subject == subject) {
                if let Some(object) = triple.object.as_term().filter(|o| o.is_blank()) {
                    if subjects.insert(object) {
                        queue.push_back(object);
                    }
                }
            }
        }
        self.triples
            .iter()
            .filter(|t| subjects.contains(&t.subject))
            .collect()
    }

    /// Named terms referenced anywhere under `blank`.
    pub fn nested_terms(&self, blank: &TermId) -> Vec<&TermId> {
        let mut terms: Vec<&TermId> = self
            .nested(blank)
            .into_iter()
            .filter_map(|t| t.object.as_term())
            .filter(|o| !o.is_blank())
            .collect();
        terms.sort();
        terms.dedup();
        terms
    }
}
