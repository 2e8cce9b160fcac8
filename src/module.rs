//! Import module construction.
//!
//! Turns an [`Extraction`] into the triples of an import module: entity
//! declarations, one hierarchy triple per retained edge, the selected
//! annotations of each term, complete blank-node axioms, and an optional
//! provenance annotation.

use std::collections::HashMap;

use crate::extract::Extraction;
use crate::project::is_structural;
use crate::store::{StoreResult, TripleSource};
use crate::term::{Object, TermId, Triple, vocab};

#[derive(Debug, Clone)]
pub struct ModuleOptions {
    /// Annotation property used for provenance.
    pub imported_from_property: TermId,
}

impl Default for ModuleOptions {
    fn default() -> Self {
        Self {
            imported_from_property: TermId::from(vocab::IMPORTED_FROM),
        }
    }
}

fn is_builtin(term: &TermId) -> bool {
    ["owl:", "rdf:", "rdfs:", "xsd:"]
        .iter()
        .any(|p| term.as_str().starts_with(p))
}

/// Caches whether predicates are declared `owl:AnnotationProperty`.
struct AnnotationProperties<'a, S: ?Sized> {
    source: &'a S,
    known: HashMap<TermId, bool>,
}

impl<S: TripleSource + ?Sized> AnnotationProperties<'_, S> {
    fn check(&mut self, predicate: &TermId) -> StoreResult<bool> {
        if let Some(&known) = self.known.get(predicate) {
            return Ok(known);
        }
        let declared = self.source.triples_with_subject(predicate)?.iter().any(|t| {
            t.predicate.as_str() == vocab::RDF_TYPE
                && t.object.as_term().map(TermId::as_str) == Some(vocab::OWL_ANNOTATION_PROPERTY)
        });
        self.known.insert(predicate.clone(), declared);
        Ok(declared)
    }
}

/// Build the module triples for `extraction`, in term order.
pub fn build_module<S: TripleSource + ?Sized>(
    source: &S,
    extraction: &Extraction,
    options: &ModuleOptions,
) -> StoreResult<Vec<Triple>> {
    let terms = &extraction.terms;
    let mut annotation_properties = AnnotationProperties {
        source,
        known: HashMap::new(),
    };
    let mut out: Vec<Triple> = Vec::new();

    for term in terms.terms() {
        let stanza = extraction.stanza(&term.id);
        let types: Vec<&TermId> = stanza.map(|s| s.types()).unwrap_or_default();

        for ty in types.iter().filter(|t| vocab::ENTITY_TYPES.contains(&t.as_str())) {
            out.push(Triple::new(term.id.clone(), vocab::RDF_TYPE, (*ty).clone()));
        }

        let is_property = types
            .iter()
            .any(|t| vocab::PROPERTY_TYPES.contains(&t.as_str()));
        let is_class = types.iter().any(|t| t.as_str() == vocab::OWL_CLASS);
        let hierarchy_predicate = if is_property {
            vocab::RDFS_SUBPROPERTY_OF
        } else if is_class {
            vocab::RDFS_SUBCLASS_OF
        } else {
            vocab::RDF_TYPE
        };
        for parent in terms.parents_of(&term.id) {
            out.push(Triple::new(
                term.id.clone(),
                hierarchy_predicate,
                parent.clone(),
            ));
        }

        let Some(stanza) = stanza else {
            continue;
        };
        for triple in stanza.root_triples() {
            let selected = term.predicates.includes(&triple.predicate);
            match &triple.object {
                Object::Literal(_) => {
                    if selected && !is_structural(&triple.predicate) {
                        out.push(triple.clone());
                    }
                }
                Object::Term(object) if object.is_blank() => {
                    if !(selected || is_structural(&triple.predicate)) {
                        continue;
                    }
                    let complete = stanza
                        .nested_terms(object)
                        .iter()
                        .all(|t| is_builtin(t) || terms.contains(t));
                    if complete {
                        out.push(triple.clone());
                        out.extend(stanza.nested(object).into_iter().cloned());
                    }
                }
                Object::Term(object) => {
                    if !selected || is_structural(&triple.predicate) {
                        continue;
                    }
                    if terms.contains(object) || annotation_properties.check(&triple.predicate)? {
                        out.push(triple.clone());
                    }
                }
            }
        }

        for iri in &term.imported_from {
            out.push(Triple::new(
                term.id.clone(),
                options.imported_from_property.clone(),
                TermId::new(format!("<{iri}>")),
            ));
        }
    }

    tracing::debug!(triples = out.len(), "built import module");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractConfig;
    use crate::extract::Extractor;
    use crate::import::{ImportTerm, Relation};
    use crate::store::MemStore;
    use crate::term::Literal;

    fn store() -> MemStore {
        MemStore::from_triples(vec![
            Triple::new("EX:animal", vocab::RDF_TYPE, vocab::OWL_CLASS),
            Triple::new("EX:dog", vocab::RDF_TYPE, vocab::OWL_CLASS),
            Triple::new("EX:dog", vocab::RDFS_SUBCLASS_OF, "EX:animal"),
            Triple::literal("EX:dog", vocab::RDFS_LABEL, Literal::plain("dog")),
            Triple::literal("EX:dog", "IAO:0000115", Literal::plain("a barking animal")),
            Triple::new("EX:dog", "EX:eats", "EX:bone"),
            Triple::new("EX:dog", "rdfs:seeAlso", "<http://dogs.example.com>"),
            Triple::new("rdfs:seeAlso", vocab::RDF_TYPE, vocab::OWL_ANNOTATION_PROPERTY),
            Triple::new("EX:dog", vocab::RDFS_SUBCLASS_OF, "_:r1"),
            Triple::new("_:r1", vocab::RDF_TYPE, "owl:Restriction"),
            Triple::new("_:r1", "owl:onProperty", "EX:has-part"),
            Triple::new("_:r1", "owl:someValuesFrom", "EX:tail"),
            Triple::new("EX:has-part", vocab::RDF_TYPE, vocab::OWL_OBJECT_PROPERTY),
            Triple::new("EX:tail", vocab::RDF_TYPE, vocab::OWL_CLASS),
            Triple::new("EX:part-of", vocab::RDF_TYPE, vocab::OWL_OBJECT_PROPERTY),
            Triple::new("EX:part-of", vocab::RDFS_SUBPROPERTY_OF, "EX:relation"),
        ])
    }

    fn module_for(store: &MemStore, terms: &[ImportTerm], config: ExtractConfig) -> Vec<Triple> {
        let extraction = Extractor::new(store, config).extract(terms, None).unwrap();
        build_module(store, &extraction, &ModuleOptions::default()).unwrap()
    }

    #[test]
    fn declarations_hierarchy_and_annotations() {
        let store = store();
        let triples = module_for(
            &store,
            &[ImportTerm::new("EX:dog").with_related([Relation::Ancestors])],
            ExtractConfig {
                imported_from: Some("http://example.com/animals.owl".into()),
                ..Default::default()
            },
        );
        assert!(triples.contains(&Triple::new("EX:dog", vocab::RDF_TYPE, vocab::OWL_CLASS)));
        assert!(triples.contains(&Triple::new("EX:dog", vocab::RDFS_SUBCLASS_OF, "EX:animal")));
        assert!(triples.contains(&Triple::literal(
            "EX:dog",
            "IAO:0000115",
            Literal::plain("a barking animal")
        )));
        // Annotation property values are kept even when the object is not retained.
        assert!(triples.contains(&Triple::new(
            "EX:dog",
            "rdfs:seeAlso",
            "<http://dogs.example.com>"
        )));
        // Relations to terms outside the module are dropped.
        assert!(!triples.iter().any(|t| t.predicate.as_str() == "EX:eats"));
        // The restriction refers to terms outside the module.
        assert!(!triples.iter().any(|t| t.subject.as_str() == "_:r1"));
        assert!(triples.contains(&Triple::new(
            "EX:animal",
            vocab::IMPORTED_FROM,
            "<http://example.com/animals.owl>"
        )));
    }

    #[test]
    fn complete_restrictions_are_kept() {
        let store = store();
        let triples = module_for(
            &store,
            &[
                ImportTerm::new("EX:dog"),
                ImportTerm::new("EX:has-part"),
                ImportTerm::new("EX:tail"),
            ],
            ExtractConfig::default(),
        );
        assert!(triples.contains(&Triple::new("EX:dog", vocab::RDFS_SUBCLASS_OF, "_:r1")));
        assert!(triples.contains(&Triple::new("_:r1", "owl:someValuesFrom", "EX:tail")));
    }

    #[test]
    fn properties_use_sub_property_of() {
        let store = store();
        let triples = module_for(
            &store,
            &[ImportTerm::new("EX:part-of").with_related([Relation::Parents])],
            ExtractConfig::default(),
        );
        assert!(triples.contains(&Triple::new(
            "EX:part-of",
            vocab::RDFS_SUBPROPERTY_OF,
            "EX:relation"
        )));
        assert!(triples.contains(&Triple::new(
            "EX:part-of",
            vocab::RDF_TYPE,
            vocab::OWL_OBJECT_PROPERTY
        )));
    }

    #[test]
    fn predicate_selection_limits_annotations() {
        let store = store();
        let triples = module_for(
            &store,
            &[ImportTerm::new("EX:dog")],
            ExtractConfig {
                predicates: vec![vocab::RDFS_LABEL.into()],
                ..Default::default()
            },
        );
        assert!(triples.contains(&Triple::literal("EX:dog", vocab::RDFS_LABEL, Literal::plain("dog"))));
        assert!(!triples.iter().any(|t| t.predicate.as_str() == "IAO:0000115"));
    }
}
