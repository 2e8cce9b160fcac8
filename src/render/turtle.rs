//! Minimal Turtle writer for module triples.

use crate::prefix::PrefixMap;
use crate::term::{Literal, Object, TermId, Triple, vocab};

fn is_safe_local(local: &str) -> bool {
    !local.ends_with('.')
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Write a term so that it parses as Turtle: CURIEs with a known prefix and
/// a plain local name stay compact, everything else becomes `<iri>`.
fn term(id: &TermId, prefixes: &PrefixMap) -> String {
    if id.is_blank() {
        return id.to_string();
    }
    if let Some(iri) = id.iri() {
        return format!("<{iri}>");
    }
    match (id.as_str().split_once(':'), prefixes.expand(id)) {
        (Some((_, local)), Some(_)) if is_safe_local(local) => id.to_string(),
        (_, Some(iri)) => format!("<{iri}>"),
        _ => id.to_string(),
    }
}

fn literal(lit: &Literal, prefixes: &PrefixMap) -> String {
    let escaped = lit
        .value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t");
    match (&lit.language, &lit.datatype) {
        (Some(lang), _) => format!("\"{escaped}\"@{lang}"),
        (None, Some(dt)) => format!("\"{escaped}\"^^{}", term(&TermId::from(dt.as_str()), prefixes)),
        (None, None) => format!("\"{escaped}\""),
    }
}

/// Serialise `triples` grouped by subject, subjects in first-appearance order.
pub fn write_turtle(triples: &[Triple], prefixes: &PrefixMap) -> String {
    let mut out = String::new();
    for (prefix, base) in prefixes.iter() {
        out.push_str(&format!("@prefix {prefix}: <{base}> .\n"));
    }

    let mut subjects: Vec<&TermId> = Vec::new();
    for triple in triples {
        if !subjects.contains(&&triple.subject) {
            subjects.push(&triple.subject);
        }
    }

    for subject in subjects {
        out.push('\n');
        out.push_str(&term(subject, prefixes));
        let statements: Vec<String> = triples
            .iter()
            .filter(|t| &t.subject == subject)
            .map(|t| {
                let predicate = if t.predicate.as_str() == vocab::RDF_TYPE {
                    "a".to_string()
                } else {
                    term(&t.predicate, prefixes)
                };
                let object = match &t.object {
                    Object::Term(o) => term(o, prefixes),
                    Object::Literal(l) => literal(l, prefixes),
                };
                format!("{predicate} {object}")
            })
            .collect();
        out.push(' ');
        out.push_str(&statements.join(" ;\n    "));
        out.push_str(" .\n");
    }
    out
}
