//! Indented hierarchy view of an extracted term set.

use std::collections::HashSet;

use crate::assemble::TermSet;
use crate::project::{LabelLookup, Projector, ValueFormat};
use crate::term::TermId;

/// Render `terms` as an indented tree, one term per line.
///
/// Roots come first in term order, followed by anything not reachable from
/// a root. Terms with several parents appear once under each.
pub fn render_tree<L: LabelLookup + ?Sized>(
    terms: &TermSet,
    projector: &Projector<'_, L>,
    format: ValueFormat,
) -> String {
    let mut out = String::new();
    let mut visited: HashSet<&TermId> = HashSet::new();
    let mut path: Vec<&TermId> = Vec::new();

    for root in terms.roots() {
        walk(terms, projector, format, &root.id, 0, &mut path, &mut visited, &mut out);
    }
    for term in terms.terms() {
        if !visited.contains(&term.id) {
            walk(terms, projector, format, &term.id, 0, &mut path, &mut visited, &mut out);
        }
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn walk<'t, L: LabelLookup + ?Sized>(
    terms: &'t TermSet,
    projector: &Projector<'_, L>,
    format: ValueFormat,
    id: &'t TermId,
    depth: usize,
    path: &mut Vec<&'t TermId>,
    visited: &mut HashSet<&'t TermId>,
    out: &mut String,
) {
    let indent = "  ".repeat(depth);
    let name = projector.resolve(id, format).into_string();
    if name == id.as_str() {
        out.push_str(&format!("{indent}- {id}"));
    } else {
        out.push_str(&format!("{indent}- {name} [{id}]"));
    }
    if path.contains(&id) {
        out.push_str(" (cycle)\n");
        return;
    }
    out.push('\n');
    visited.insert(id);

    path.push(id);
    let mut children: Vec<&TermId> = terms.children_of(id).collect();
    children.sort();
    children.dedup();
    for child in children {
        walk(terms, projector, format, child, depth + 1, path, visited, out);
    }
    path.pop();
}
