//! CURIE ⇄ IRI resolution from an RDFTab-style `prefix` table.

use std::path::Path;

use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::term::TermId;

/// Ordered prefix → namespace table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrefixMap {
    entries: Vec<(String, String)>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The prefixes every ontology store carries.
    pub fn standard() -> Self {
        let mut map = Self::new();
        map.insert("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#");
        map.insert("rdfs", "http://www.w3.org/2000/01/rdf-schema#");
        map.insert("xsd", "http://www.w3.org/2001/XMLSchema#");
        map.insert("owl", "http://www.w3.org/2002/07/owl#");
        map
    }

    /// Add or replace a prefix.
    pub fn insert(&mut self, prefix: impl Into<String>, base: impl Into<String>) {
        let prefix = prefix.into();
        let base = base.into();
        match self.entries.iter_mut().find(|(p, _)| *p == prefix) {
            Some(entry) => entry.1 = base,
            None => self.entries.push((prefix, base)),
        }
    }

    /// Load a two-column `prefix<TAB>base` table. A `prefix base` header row is skipped.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::Io { source: e })?;
        let mut map = Self::standard();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut cols = line.split('\t');
            let (Some(prefix), Some(base)) = (cols.next(), cols.next()) else {
                return Err(StoreError::Parse {
                    path: path.display().to_string(),
                    line: i + 1,
                    message: "expected two tab-separated columns".into(),
                });
            };
            if i == 0 && prefix == "prefix" && base == "base" {
                continue;
            }
            map.insert(prefix.trim(), base.trim());
        }
        Ok(map)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, b)| (p.as_str(), b.as_str()))
    }

    /// Expand a CURIE to its IRI. Bracketed IRIs pass through unchanged.
    pub fn expand(&self, id: &TermId) -> Option<String> {
        if let Some(iri) = id.iri() {
            return Some(iri.to_string());
        }
        let (prefix, local) = id.as_str().split_once(':')?;
        self.entries
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, base)| format!("{base}{local}"))
    }

    /// Contract an IRI to a CURIE using the longest matching namespace.
    pub fn contract(&self, iri: &str) -> Option<TermId> {
        self.entries
            .iter()
            .filter(|(_, base)| iri.starts_with(base.as_str()) && iri.len() > base.len())
            .max_by_key(|(_, base)| base.len())
            .map(|(prefix, base)| TermId::new(format!("{prefix}:{}", &iri[base.len()..])))
    }
}
