//! Core identifier and statement types.
//!
//! Every node of the ontology graph is identified by a [`TermId`], which holds
//! a CURIE (`OBI:0100046`), a bracketed IRI (`<http://…>`) or a blank-node
//! label (`_:b0`). Statements are [`Triple`]s whose object is either another
//! term or a [`Literal`].

use serde::{Deserialize, Serialize};

/// Well-known vocabulary used by the extractor.
pub mod vocab {
    pub const RDF_TYPE: &str = "rdf:type";
    pub const RDFS_LABEL: &str = "rdfs:label";
    pub const RDFS_SUBCLASS_OF: &str = "rdfs:subClassOf";
    pub const RDFS_SUBPROPERTY_OF: &str = "rdfs:subPropertyOf";
    pub const OWL_THING: &str = "owl:Thing";
    pub const OWL_CLASS: &str = "owl:Class";
    pub const OWL_ANNOTATION_PROPERTY: &str = "owl:AnnotationProperty";
    pub const OWL_DATATYPE_PROPERTY: &str = "owl:DatatypeProperty";
    pub const OWL_OBJECT_PROPERTY: &str = "owl:ObjectProperty";
    pub const OWL_NAMED_INDIVIDUAL: &str = "owl:NamedIndividual";
    /// IAO "imported from".
    pub const IMPORTED_FROM: &str = "IAO:0000412";

    /// OWL entity types that get an `rdf:type` declaration in import modules.
    pub const ENTITY_TYPES: [&str; 5] = [
        OWL_CLASS,
        OWL_ANNOTATION_PROPERTY,
        OWL_DATATYPE_PROPERTY,
        OWL_OBJECT_PROPERTY,
        OWL_NAMED_INDIVIDUAL,
    ];

    /// OWL property types, whose hierarchy predicate is `rdfs:subPropertyOf`.
    pub const PROPERTY_TYPES: [&str; 3] = [
        OWL_ANNOTATION_PROPERTY,
        OWL_DATATYPE_PROPERTY,
        OWL_OBJECT_PROPERTY,
    ];
}

/// Identifier of an ontology term: CURIE, bracketed IRI, or blank node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermId(String);

impl TermId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blank nodes are written `_:label`.
    pub fn is_blank(&self) -> bool {
        self.0.starts_with("_:")
    }

    /// Full IRIs are written `<http://…>` (or bare, when they contain `://`).
    pub fn is_iri(&self) -> bool {
        (self.0.starts_with('<') && self.0.ends_with('>')) || self.0.contains("://")
    }

    /// A CURIE is anything that is neither blank nor a full IRI and has a prefix.
    pub fn is_curie(&self) -> bool {
        !self.is_blank() && !self.is_iri() && self.0.contains(':')
    }

    /// The IRI text without angle brackets, if this is a full IRI.
    pub fn iri(&self) -> Option<&str> {
        if !self.is_iri() {
            return None;
        }
        Some(self.0.trim_start_matches('<').trim_end_matches('>'))
    }
}

impl std::fmt::Display for TermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TermId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TermId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for TermId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for TermId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A literal value with optional datatype or language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl Literal {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }
}

/// The object position of a triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Object {
    Term(TermId),
    Literal(Literal),
}

impl Object {
    pub fn as_term(&self) -> Option<&TermId> {
        match self {
            Object::Term(t) => Some(t),
            Object::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Object::Literal(l) => Some(l),
            Object::Term(_) => None,
        }
    }

    /// The object is a blank node (a nested structure such as a restriction).
    pub fn is_blank(&self) -> bool {
        self.as_term().is_some_and(TermId::is_blank)
    }
}

/// A single subject–predicate–object statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: TermId,
    pub predicate: TermId,
    pub object: Object,
}

impl Triple {
    /// A triple whose object is another term.
    pub fn new(
        subject: impl Into<TermId>,
        predicate: impl Into<TermId>,
        object: impl Into<TermId>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: Object::Term(object.into()),
        }
    }

    /// A triple whose object is a literal.
    pub fn literal(
        subject: impl Into<TermId>,
        predicate: impl Into<TermId>,
        literal: Literal,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: Object::Literal(literal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_shapes() {
        assert!(TermId::from("_:b1").is_blank());
        assert!(TermId::from("<http://purl.obolibrary.org/obo/OBI_1>").is_iri());
        assert!(TermId::from("OBI:0100046").is_curie());
        assert!(!TermId::from("_:b1").is_curie());
        assert_eq!(
            TermId::from("<http://example.org/x>").iri(),
            Some("http://example.org/x")
        );
    }

    #[test]
    fn blank_objects() {
        let t = Triple::new("EX:a", vocab::RDFS_SUBCLASS_OF, "_:r1");
        assert!(t.object.is_blank());
        let l = Triple::literal("EX:a", vocab::RDFS_LABEL, Literal::plain("a"));
        assert!(!l.object.is_blank());
        assert_eq!(l.object.as_literal().map(|l| l.value.as_str()), Some("a"));
    }
}
