//! The extraction pipeline.
//!
//! [`Extractor`] wires the stages together: requested identifiers are
//! resolved against the store, seed stanzas are fetched, closures are
//! computed per spec, and the assembler merges everything into a
//! [`TermSet`]. Term-level problems are collected as [`TermDiagnostic`]s and
//! extraction continues; store failures abort with no output.

use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;

use crate::assemble::{AssembleOptions, SeedClosures, TermSet, assemble};
use crate::closure::{Direction, compute_closure, direct_neighbors};
use crate::config::ExtractConfig;
use crate::error::{ClosureError, CycleSite, ImportError, SliceResult, TermDiagnostic};
use crate::import::{ImportSpec, ImportTerm, Relation, SourceTable};
use crate::stanza::{Stanza, StanzaResolution, resolve_stanza};
use crate::store::{StoreResult, TripleSource};
use crate::term::{TermId, vocab};

/// Everything an extraction produced.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub terms: TermSet,
    /// Stanza of every retained term.
    pub stanzas: BTreeMap<TermId, Stanza>,
    /// The resolved specs that took part, in input order.
    pub specs: Vec<ImportSpec>,
    pub diagnostics: Vec<TermDiagnostic>,
}

impl Extraction {
    pub fn stanza(&self, id: &TermId) -> Option<&Stanza> {
        self.stanzas.get(id)
    }
}

/// Outcome of looking an input identifier up in the store.
enum Lookup {
    Found(TermId),
    Missing(TermDiagnostic),
}

/// Runs extractions against one triple source.
pub struct Extractor<'a, S: TripleSource + ?Sized> {
    source: &'a S,
    config: ExtractConfig,
}

impl<'a, S: TripleSource + ?Sized> Extractor<'a, S> {
    pub fn new(source: &'a S, config: ExtractConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Resolve an identifier or label to a term in the store.
    ///
    /// A term exists if it is a subject or has hierarchy children. Otherwise
    /// the input is tried as an exact `rdfs:label`.
    pub fn resolve_id(&self, raw: &str) -> StoreResult<Result<TermId, TermDiagnostic>> {
        Ok(match self.lookup(raw)? {
            Lookup::Found(id) => Ok(id),
            Lookup::Missing(diagnostic) => Err(diagnostic),
        })
    }

    fn lookup(&self, raw: &str) -> StoreResult<Lookup> {
        let id = TermId::from(raw.trim());
        if self.source.contains_subject(&id)? {
            return Ok(Lookup::Found(id));
        }
        let hierarchy = self.config.hierarchy();
        if !direct_neighbors(self.source, &id, &hierarchy, Direction::Descendants)?.is_empty() {
            return Ok(Lookup::Found(id));
        }

        let mut matches = self
            .source
            .subjects_with_value(&TermId::from(vocab::RDFS_LABEL), raw.trim())?;
        matches.retain(|m| !m.is_blank());
        matches.sort();
        matches.dedup();
        Ok(match matches.len() {
            0 => Lookup::Missing(TermDiagnostic::TermNotFound {
                term: raw.to_string(),
            }),
            1 => Lookup::Found(matches.remove(0)),
            _ => Lookup::Missing(TermDiagnostic::AmbiguousLabel {
                label: raw.to_string(),
                candidates: matches.iter().map(TermId::to_string).collect(),
            }),
        })
    }

    /// Resolve predicate names, reporting the ones that fail.
    fn resolve_predicates(
        &self,
        names: &[String],
        diagnostics: &mut Vec<TermDiagnostic>,
    ) -> StoreResult<Vec<TermId>> {
        let mut resolved = Vec::new();
        for name in names {
            match self.lookup(name)? {
                Lookup::Found(id) => {
                    if !resolved.contains(&id) {
                        resolved.push(id);
                    }
                }
                // Predicates used only in predicate position have no
                // stanza; keep well-formed identifiers as written.
                Lookup::Missing(TermDiagnostic::TermNotFound { .. })
                    if name.contains(':') && !name.contains(' ') =>
                {
                    let id = TermId::from(name.as_str());
                    if !resolved.contains(&id) {
                        resolved.push(id);
                    }
                }
                Lookup::Missing(diagnostic) => report(diagnostics, diagnostic),
            }
        }
        Ok(resolved)
    }

    /// Turn raw import rows into resolved specs. Rows whose ID cannot be
    /// resolved are dropped with a diagnostic.
    pub fn resolve_specs(
        &self,
        terms: &[ImportTerm],
        sources: Option<&SourceTable>,
        diagnostics: &mut Vec<TermDiagnostic>,
    ) -> SliceResult<Vec<ImportSpec>> {
        let default_predicates = self.resolve_predicates(&self.config.predicates, diagnostics)?;
        let mut specs = Vec::with_capacity(terms.len());

        for term in terms {
            let id = match self.lookup(&term.id)? {
                Lookup::Found(id) => id,
                Lookup::Missing(diagnostic) => {
                    report(diagnostics, diagnostic);
                    continue;
                }
            };

            let parent_raw = term.parent_id.as_deref().or(term.parent_label.as_deref());
            let parent = match parent_raw {
                None => None,
                Some(raw) => match self.lookup(raw)? {
                    Lookup::Found(parent) => Some(parent),
                    // An override parent outside the store is still asserted.
                    Lookup::Missing(diagnostic @ TermDiagnostic::TermNotFound { .. }) => {
                        report(diagnostics, diagnostic);
                        term.parent_id.as_deref().map(TermId::from)
                    }
                    Lookup::Missing(diagnostic) => {
                        report(diagnostics, diagnostic);
                        None
                    }
                },
            };

            let mut spec = ImportSpec::new(id);
            spec.label = term.label.clone();
            spec.parent = parent;
            spec.related = term.related.clone();
            spec.intermediates = self.config.intermediates;
            spec.source = term.source.clone();
            spec.imported_from = self.config.imported_from.clone();

            let mut predicates = default_predicates.clone();
            if let Some(table) = sources {
                let name = term.source.as_deref().ok_or(ImportError::MissingSource)?;
                let group = table.get(name)?;
                if let Some(intermediates) = group.intermediates {
                    spec.intermediates = intermediates;
                }
                if group.iri.is_some() {
                    spec.imported_from = group.iri.clone();
                }
                for p in self.resolve_predicates(&group.predicates, diagnostics)? {
                    if !predicates.contains(&p) {
                        predicates.push(p);
                    }
                }
            }
            spec.predicates = (!predicates.is_empty()).then_some(predicates);
            specs.push(spec);
        }
        Ok(specs)
    }

    /// Compute the closures one spec needs.
    fn closures_for(&self, spec: &ImportSpec) -> Result<SeedClosures, ClosureError> {
        let hierarchy = self.config.hierarchy();
        let limits = self.config.limits;
        let closure = |direction| compute_closure(self.source, &spec.id, &hierarchy, direction, limits);

        let wants_lineage = spec.requests(Relation::Ancestors) || self.config.placement;
        Ok(SeedClosures {
            ancestors: wants_lineage
                .then(|| closure(Direction::Ancestors))
                .transpose()?,
            descendants: spec
                .requests(Relation::Descendants)
                .then(|| closure(Direction::Descendants))
                .transpose()?,
            parents: if spec.requests(Relation::Parents) {
                direct_neighbors(self.source, &spec.id, &hierarchy, Direction::Ancestors)?
            } else {
                Vec::new()
            },
            children: if spec.requests(Relation::Children) {
                direct_neighbors(self.source, &spec.id, &hierarchy, Direction::Descendants)?
            } else {
                Vec::new()
            },
        })
    }

    fn fetch_stanzas(
        &self,
        ids: &[TermId],
    ) -> StoreResult<Vec<(TermId, StanzaResolution)>> {
        let fetch = |id: &TermId| resolve_stanza(self.source, id).map(|r| (id.clone(), r));
        if self.config.parallel {
            ids.par_iter().map(fetch).collect()
        } else {
            ids.iter().map(fetch).collect()
        }
    }

    /// Run a full extraction for `terms`.
    pub fn extract(
        &self,
        terms: &[ImportTerm],
        sources: Option<&SourceTable>,
    ) -> SliceResult<Extraction> {
        let mut diagnostics = Vec::new();
        let specs = self.resolve_specs(terms, sources, &mut diagnostics)?;

        let closures: Vec<SeedClosures> = if self.config.parallel {
            specs
                .par_iter()
                .map(|spec| self.closures_for(spec))
                .collect::<Result<_, _>>()?
        } else {
            specs
                .iter()
                .map(|spec| self.closures_for(spec))
                .collect::<Result<_, _>>()?
        };

        for closure in closures
            .iter()
            .flat_map(|c| c.ancestors.iter().chain(c.descendants.iter()))
            .filter(|c| c.is_cyclic())
        {
            report(
                &mut diagnostics,
                TermDiagnostic::CyclicStructure {
                    root: closure.seed.to_string(),
                    site: CycleSite::Hierarchy,
                    revisits: closure.cycles.iter().map(Vec::len).sum(),
                },
            );
        }

        // Stanzas of every term that can end up in the result.
        let mut candidates: Vec<TermId> = Vec::new();
        let mut seen = HashSet::new();
        for (spec, found) in specs.iter().zip(&closures) {
            let related = found
                .ancestors
                .iter()
                .chain(found.descendants.iter())
                .flat_map(|c| c.terms.iter())
                .chain(&found.parents)
                .chain(&found.children)
                .chain(spec.parent.iter());
            for id in std::iter::once(&spec.id).chain(related) {
                if seen.insert(id.clone()) {
                    candidates.push(id.clone());
                }
            }
        }
        let resolutions = self.fetch_stanzas(&candidates)?;

        let seeds: HashSet<&TermId> = specs.iter().map(|s| &s.id).collect();
        let mut labels: HashMap<TermId, String> = HashMap::new();
        let mut stanzas: BTreeMap<TermId, Stanza> = BTreeMap::new();
        for (id, resolution) in resolutions {
            if resolution.revisits > 0 && seeds.contains(&id) {
                report(
                    &mut diagnostics,
                    TermDiagnostic::CyclicStructure {
                        root: id.to_string(),
                        site: CycleSite::Stanza,
                        revisits: resolution.revisits,
                    },
                );
            }
            if let Some(label) = resolution.stanza.label() {
                labels.insert(id.clone(), label.to_string());
            }
            stanzas.insert(id, resolution.stanza);
        }

        let terms = assemble(
            &specs,
            &closures,
            &labels,
            AssembleOptions {
                placement: self.config.placement,
            },
        );
        stanzas.retain(|id, _| terms.contains(id));

        for diagnostic in predicate_conflicts(&specs) {
            report(&mut diagnostics, diagnostic);
        }

        tracing::info!(
            specs = specs.len(),
            terms = terms.len(),
            edges = terms.edges().len(),
            diagnostics = diagnostics.len(),
            "extraction complete"
        );

        Ok(Extraction {
            terms,
            stanzas,
            specs,
            diagnostics,
        })
    }
}

/// Record a diagnostic once and log it.
fn report(diagnostics: &mut Vec<TermDiagnostic>, diagnostic: TermDiagnostic) {
    if diagnostics.contains(&diagnostic) {
        return;
    }
    tracing::warn!("{diagnostic}");
    diagnostics.push(diagnostic);
}

/// Terms named by specs from different sources with different predicate
/// selections. The assembler applies the union; this makes it visible.
fn predicate_conflicts(specs: &[ImportSpec]) -> Vec<TermDiagnostic> {
    let mut by_term: BTreeMap<&TermId, Vec<&ImportSpec>> = BTreeMap::new();
    for spec in specs {
        by_term.entry(&spec.id).or_default().push(spec);
    }
    by_term
        .into_iter()
        .filter(|(_, group)| group.iter().any(|s| s.predicates != group[0].predicates))
        .map(|(term, group)| {
            let mut sources: Vec<String> = group
                .iter()
                .map(|s| s.source.clone().unwrap_or_else(|| "(default)".into()))
                .collect();
            sources.dedup();
            TermDiagnostic::PredicateConflict {
                term: term.to_string(),
                sources,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{Intermediates, SourceConfig};
    use crate::store::MemStore;
    use crate::term::{Literal, Triple};

    fn sub(child: &str, parent: &str) -> Triple {
        Triple::new(child, vocab::RDFS_SUBCLASS_OF, parent)
    }

    fn label(term: &str, text: &str) -> Triple {
        Triple::literal(term, vocab::RDFS_LABEL, Literal::plain(text))
    }

    fn store() -> MemStore {
        MemStore::from_triples(vec![
            sub("EX:animal", vocab::OWL_THING),
            sub("EX:dog", "EX:animal"),
            sub("EX:cat", "EX:animal"),
            label("EX:animal", "animal"),
            label("EX:dog", "dog"),
            label("EX:cat", "cat"),
            label("EX:cat2", "cat"),
        ])
    }

    #[test]
    fn resolves_ids_and_labels() {
        let store = store();
        let ex = Extractor::new(&store, ExtractConfig::default());
        assert_eq!(ex.resolve_id("EX:dog").unwrap(), Ok(TermId::from("EX:dog")));
        assert_eq!(ex.resolve_id("dog").unwrap(), Ok(TermId::from("EX:dog")));
        assert!(matches!(
            ex.resolve_id("cat").unwrap(),
            Err(TermDiagnostic::AmbiguousLabel { candidates, .. }) if candidates.len() == 2
        ));
        assert!(matches!(
            ex.resolve_id("EX:none").unwrap(),
            Err(TermDiagnostic::TermNotFound { .. })
        ));
    }

    #[test]
    fn term_referenced_only_as_parent_exists() {
        let store = MemStore::from_triples(vec![sub("EX:a", "EX:b")]);
        let ex = Extractor::new(&store, ExtractConfig::default());
        assert_eq!(ex.resolve_id("EX:b").unwrap(), Ok(TermId::from("EX:b")));
    }

    #[test]
    fn missing_terms_are_reported_and_skipped() {
        let store = store();
        let ex = Extractor::new(&store, ExtractConfig::default());
        let result = ex
            .extract(
                &[
                    ImportTerm::new("EX:none"),
                    ImportTerm::new("dog").with_related([Relation::Ancestors]),
                ],
                None,
            )
            .unwrap();
        assert_eq!(
            result.diagnostics,
            vec![TermDiagnostic::TermNotFound {
                term: "EX:none".into()
            }]
        );
        let ids: Vec<&str> = result.terms.ids().map(TermId::as_str).collect();
        assert_eq!(ids, vec!["EX:dog", "EX:animal"]);
        assert_eq!(
            result.terms.get(&TermId::from("EX:dog")).unwrap().label.as_deref(),
            Some("dog")
        );
        assert!(result.stanza(&TermId::from("EX:animal")).is_some());
    }

    #[test]
    fn source_table_sets_policy_per_group() {
        let store = store();
        let ex = Extractor::new(&store, ExtractConfig::default());
        let table = SourceTable::new(
            "sources.tsv",
            vec![SourceConfig {
                source: "ex".into(),
                iri: Some("http://example.com/ex.owl".into()),
                intermediates: Some(Intermediates::None),
                predicates: vec!["rdfs:label".into()],
            }],
        );
        let mut diagnostics = Vec::new();
        let specs = ex
            .resolve_specs(
                &[ImportTerm::new("EX:dog").with_source("ex")],
                Some(&table),
                &mut diagnostics,
            )
            .unwrap();
        assert_eq!(specs[0].intermediates, Intermediates::None);
        assert_eq!(specs[0].imported_from.as_deref(), Some("http://example.com/ex.owl"));
        assert_eq!(specs[0].predicates, Some(vec![TermId::from(vocab::RDFS_LABEL)]));

        let err = ex
            .resolve_specs(&[ImportTerm::new("EX:dog")], Some(&table), &mut diagnostics)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::SliceError::Import(ImportError::MissingSource)
        ));
    }

    #[test]
    fn predicate_conflict_is_reported() {
        let store = store();
        let ex = Extractor::new(&store, ExtractConfig::default());
        let table = SourceTable::new(
            "sources.tsv",
            vec![
                SourceConfig {
                    source: "a".into(),
                    predicates: vec!["rdfs:label".into()],
                    ..Default::default()
                },
                SourceConfig {
                    source: "b".into(),
                    ..Default::default()
                },
            ],
        );
        let result = ex
            .extract(
                &[
                    ImportTerm::new("EX:dog").with_source("a"),
                    ImportTerm::new("EX:dog").with_source("b"),
                ],
                Some(&table),
            )
            .unwrap();
        assert!(result.diagnostics.iter().any(|d| matches!(
            d,
            TermDiagnostic::PredicateConflict { sources, .. } if sources == &vec!["a".to_string(), "b".to_string()]
        )));
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let store = store();
        let request = [
            ImportTerm::new("EX:animal").with_related([Relation::Descendants]),
            ImportTerm::new("EX:dog").with_related([Relation::Ancestors]),
        ];
        let parallel = Extractor::new(&store, ExtractConfig::default())
            .extract(&request, None)
            .unwrap();
        let sequential = Extractor::new(
            &store,
            ExtractConfig {
                parallel: false,
                ..Default::default()
            },
        )
        .extract(&request, None)
        .unwrap();
        assert_eq!(parallel.terms, sequential.terms);
    }
}
