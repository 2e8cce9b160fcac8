//! Import table expansion.
//!
//! Rewrites an import table so that every term of the extracted set is an
//! explicit row, with a reason saying why it is there.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::assemble::TermSet;
use crate::import::{ImportSpec, Relation};
use crate::term::TermId;

/// Requesters listed by name before switching to a count.
pub const DEFAULT_REASON_LIMIT: usize = 3;

pub const DEFINED_IN_INPUT: &str = "defined in input";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedRow {
    #[serde(rename = "ID")]
    pub id: TermId,
    #[serde(rename = "Label")]
    pub label: Option<String>,
    #[serde(rename = "Parent ID")]
    pub parent_id: Option<TermId>,
    #[serde(rename = "Source")]
    pub source: Option<String>,
    #[serde(rename = "Reason")]
    pub reason: String,
}

impl ExpandedRow {
    pub const HEADERS: [&'static str; 5] = ["ID", "Label", "Parent ID", "Source", "Reason"];

    pub fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.label.clone().unwrap_or_default(),
            self.parent_id.as_ref().map(TermId::to_string).unwrap_or_default(),
            self.source.clone().unwrap_or_default(),
            self.reason.clone(),
        ]
    }
}

/// One row per term of `terms`, sorted by ID.
pub fn expand(specs: &[ImportSpec], terms: &TermSet, limit: usize) -> Vec<ExpandedRow> {
    let named: BTreeMap<&TermId, &ImportSpec> =
        specs.iter().rev().map(|s| (&s.id, s)).collect();

    let display = |id: &TermId| -> String {
        let label = named
            .get(id)
            .and_then(|s| s.label.as_deref())
            .or_else(|| terms.get(id).and_then(|t| t.label.as_deref()));
        match label {
            Some(l) if l.contains(' ') => format!("'{l}'"),
            Some(l) => l.to_string(),
            None => id.to_string(),
        }
    };

    let mut rows: Vec<ExpandedRow> = terms
        .terms()
        .iter()
        .map(|term| {
            if let Some(spec) = named.get(&term.id) {
                return ExpandedRow {
                    id: term.id.clone(),
                    label: spec.label.clone().or_else(|| term.label.clone()),
                    parent_id: spec.parent.clone(),
                    source: spec.source.clone(),
                    reason: DEFINED_IN_INPUT.to_string(),
                };
            }
            let mut parts = Vec::new();
            for relation in Relation::ALL {
                let mut requesters: Vec<String> = term
                    .reasons
                    .iter()
                    .filter(|r| r.relation == relation)
                    .map(|r| display(&r.of))
                    .collect();
                requesters.sort();
                requesters.dedup();
                if requesters.is_empty() {
                    continue;
                }
                let role = relation.role();
                if requesters.len() > limit {
                    parts.push(format!("{role} of {} terms", requesters.len()));
                } else {
                    parts.push(format!("{role} of {}", requesters.join(", ")));
                }
            }
            ExpandedRow {
                id: term.id.clone(),
                label: term.label.clone(),
                parent_id: None,
                source: term.sources.first().cloned(),
                reason: parts.join(" & "),
            }
        })
        .collect();

    rows.sort_by(|a, b| a.id.cmp(&b.id));
    rows
}
