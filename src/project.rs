//! Projection of terms and their values into output-ready strings.
//!
//! A term is shown as its label, its CURIE or its IRI. Whatever is asked
//! for, resolution falls back along `label → CURIE → IRI` order, so a
//! missing label or an unknown prefix is never an error.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::assemble::TermSet;
use crate::error::ImportError;
use crate::prefix::PrefixMap;
use crate::stanza::Stanza;
use crate::term::{Object, TermId, vocab};

/// Label lookup collaborator.
pub trait LabelLookup {
    fn label(&self, term: &TermId) -> Option<&str>;
}

impl LabelLookup for HashMap<TermId, String> {
    fn label(&self, term: &TermId) -> Option<&str> {
        self.get(term).map(String::as_str)
    }
}

impl LabelLookup for TermSet {
    fn label(&self, term: &TermId) -> Option<&str> {
        self.get(term).and_then(|t| t.label.as_deref())
    }
}

/// How a term is written out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueFormat {
    #[serde(alias = "label", alias = "LABEL")]
    Label,
    #[serde(rename = "CURIE", alias = "curie")]
    Curie,
    #[default]
    #[serde(rename = "IRI", alias = "iri")]
    Iri,
}

impl FromStr for ValueFormat {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "label" => Ok(ValueFormat::Label),
            "curie" => Ok(ValueFormat::Curie),
            "iri" => Ok(ValueFormat::Iri),
            _ => Err(ImportError::UnknownValueFormat {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ValueFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueFormat::Label => write!(f, "label"),
            ValueFormat::Curie => write!(f, "CURIE"),
            ValueFormat::Iri => write!(f, "IRI"),
        }
    }
}

/// The best available representation of a term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Labeled(String),
    CurieOnly(String),
    IriOnly(String),
}

impl Resolved {
    pub fn as_str(&self) -> &str {
        match self {
            Resolved::Labeled(s) | Resolved::CurieOnly(s) | Resolved::IriOnly(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Resolved::Labeled(s) | Resolved::CurieOnly(s) | Resolved::IriOnly(s) => s,
        }
    }
}

/// A table column: a pseudo-column for the term itself, or a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Column {
    Curie,
    Iri,
    Label,
    Predicate(TermId),
}

impl Column {
    /// `CURIE`, `IRI` and `label` name the pseudo-columns; anything else is
    /// a predicate.
    pub fn parse(name: &str) -> Self {
        match name {
            "CURIE" => Column::Curie,
            "IRI" => Column::Iri,
            "label" => Column::Label,
            other => Column::Predicate(TermId::from(other)),
        }
    }
}

/// Resolves terms with a label lookup and a prefix table.
pub struct Projector<'a, L: LabelLookup + ?Sized> {
    labels: &'a L,
    prefixes: &'a PrefixMap,
}

impl<'a, L: LabelLookup + ?Sized> Projector<'a, L> {
    pub fn new(labels: &'a L, prefixes: &'a PrefixMap) -> Self {
        Self { labels, prefixes }
    }

    fn curie(&self, term: &TermId) -> Option<String> {
        if term.is_curie() {
            return Some(term.to_string());
        }
        let iri = term.iri()?;
        self.prefixes.contract(iri).map(|c| c.to_string())
    }

    fn iri(&self, term: &TermId) -> Option<String> {
        self.prefixes.expand(term)
    }

    /// Resolve `term` in `format`, falling back in label, CURIE, IRI order.
    pub fn resolve(&self, term: &TermId, format: ValueFormat) -> Resolved {
        let label = || self.labels.label(term).map(|l| Resolved::Labeled(l.to_string()));
        let curie = || self.curie(term).map(Resolved::CurieOnly);
        let iri = || self.iri(term).map(Resolved::IriOnly);
        let resolved = match format {
            ValueFormat::Label => label().or_else(curie).or_else(iri),
            ValueFormat::Curie => curie().or_else(iri),
            ValueFormat::Iri => iri().or_else(curie),
        };
        resolved.unwrap_or_else(|| Resolved::CurieOnly(term.to_string()))
    }

    /// The values of `column` for the root of `stanza`, in stanza order.
    pub fn project(&self, stanza: &Stanza, column: &Column, format: ValueFormat) -> Vec<String> {
        let root = stanza.root();
        match column {
            Column::Curie => vec![self.resolve(root, ValueFormat::Curie).into_string()],
            Column::Iri => vec![self.resolve(root, ValueFormat::Iri).into_string()],
            Column::Label => self
                .labels
                .label(root)
                .or_else(|| stanza.label())
                .map(|l| vec![l.to_string()])
                .unwrap_or_default(),
            Column::Predicate(predicate) => stanza
                .root_triples()
                .filter(|t| &t.predicate == predicate)
                .map(|t| match &t.object {
                    Object::Literal(l) => l.value.clone(),
                    Object::Term(o) => self.resolve(o, format).into_string(),
                })
                .collect(),
        }
    }

    /// [`Projector::project`] joined by `split`; empty when there is no value.
    pub fn project_joined(
        &self,
        stanza: &Stanza,
        column: &Column,
        format: ValueFormat,
        split: &str,
    ) -> String {
        self.project(stanza, column, format).join(split)
    }
}

/// Whether `predicate` is one of the hierarchy/type predicates that import
/// modules rebuild from edges rather than copy.
pub fn is_structural(predicate: &TermId) -> bool {
    matches!(
        predicate.as_str(),
        vocab::RDF_TYPE | vocab::RDFS_SUBCLASS_OF | vocab::RDFS_SUBPROPERTY_OF
    )
}
