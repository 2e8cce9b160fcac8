//! Triple store collaborators.
//!
//! The extraction core only needs a read-only query capability, expressed by
//! the [`TripleSource`] trait. Two backends implement it:
//!
//! - [`MemStore`]: concurrent in-memory indices (DashMap + petgraph)
//! - [`DurableStore`]: an on-disk redb database built by `ontoslice load`
//!
//! [`load_statements`] reads RDFTab `statements` tables into triples.

pub mod durable;
pub mod load;
pub mod mem;

pub use durable::DurableStore;
pub use load::load_statements;
pub use mem::MemStore;

pub use crate::error::StoreResult;

use crate::term::{Object, TermId, Triple, vocab};

/// Read-only query interface over a statements table.
///
/// Implementations make no ordering promise; callers sort what they need.
/// Any `Err` is treated as the store being unavailable and aborts extraction.
pub trait TripleSource: Send + Sync {
    /// All triples whose subject is `subject`.
    fn triples_with_subject(&self, subject: &TermId) -> StoreResult<Vec<Triple>>;

    /// Subjects of all triples `(?, predicate, object)` with a term object.
    fn subjects_with_object(&self, predicate: &TermId, object: &TermId)
    -> StoreResult<Vec<TermId>>;

    /// Subjects of all triples `(?, predicate, "value")` with a literal object.
    fn subjects_with_value(&self, predicate: &TermId, value: &str) -> StoreResult<Vec<TermId>>;

    /// Whether the term is the subject of at least one triple.
    fn contains_subject(&self, subject: &TermId) -> StoreResult<bool> {
        Ok(!self.triples_with_subject(subject)?.is_empty())
    }

    /// The first `rdfs:label` of a term, by literal order.
    fn label_of(&self, subject: &TermId) -> StoreResult<Option<String>> {
        let label = TermId::from(vocab::RDFS_LABEL);
        Ok(self
            .triples_with_subject(subject)?
            .into_iter()
            .filter(|t| t.predicate == label)
            .filter_map(|t| match t.object {
                Object::Literal(l) => Some(l.value),
                Object::Term(_) => None,
            })
            .min())
    }
}

impl<S: TripleSource + ?Sized> TripleSource for &S {
    fn triples_with_subject(&self, subject: &TermId) -> StoreResult<Vec<Triple>> {
        (**self).triples_with_subject(subject)
    }

    fn subjects_with_object(
        &self,
        predicate: &TermId,
        object: &TermId,
    ) -> StoreResult<Vec<TermId>> {
        (**self).subjects_with_object(predicate, object)
    }

    fn subjects_with_value(&self, predicate: &TermId, value: &str) -> StoreResult<Vec<TermId>> {
        (**self).subjects_with_value(predicate, value)
    }
}

impl<S: TripleSource + ?Sized> TripleSource for Box<S> {
    fn triples_with_subject(&self, subject: &TermId) -> StoreResult<Vec<Triple>> {
        (**self).triples_with_subject(subject)
    }

    fn subjects_with_object(
        &self,
        predicate: &TermId,
        object: &TermId,
    ) -> StoreResult<Vec<TermId>> {
        (**self).subjects_with_object(predicate, object)
    }

    fn subjects_with_value(&self, predicate: &TermId, value: &str) -> StoreResult<Vec<TermId>> {
        (**self).subjects_with_value(predicate, value)
    }
}
