//! Loader for RDFTab `statements` tables exported as TSV.
//!
//! Columns: `stanza subject predicate object value datatype language`.
//! Exactly one of `object` / `value` is set per row; empty cells are NULL.

use std::path::Path;

use crate::error::{StoreError, StoreResult};
use crate::term::{Literal, Object, TermId, Triple};

const COLUMNS: usize = 7;

/// Read every statement row of a TSV file.
pub fn load_statements(path: &Path) -> StoreResult<Vec<Triple>> {
    let content = std::fs::read_to_string(path).map_err(|e| StoreError::Io { source: e })?;
    parse_statements(&content, &path.display().to_string())
}

/// Parse statement rows from TSV text. `origin` names the input in errors.
pub fn parse_statements(content: &str, origin: &str) -> StoreResult<Vec<Triple>> {
    let mut triples = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split('\t').collect();
        if i == 0 && cells.first() == Some(&"stanza") {
            continue;
        }
        let parse_err = |message: String| StoreError::Parse {
            path: origin.to_string(),
            line: i + 1,
            message,
        };
        if cells.len() < 4 || cells.len() > COLUMNS {
            return Err(parse_err(format!(
                "expected 4 to {COLUMNS} columns, found {}",
                cells.len()
            )));
        }
        let cell = |n: usize| {
            cells
                .get(n)
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string)
        };

        let (Some(subject), Some(predicate)) = (cell(1), cell(2)) else {
            return Err(parse_err("subject and predicate are required".into()));
        };
        let object = match (cell(3), cell(4)) {
            (Some(object), None) => Object::Term(TermId::new(object)),
            (None, Some(value)) => Object::Literal(Literal {
                value: unescape(&value),
                datatype: cell(5),
                language: cell(6),
            }),
            (Some(_), Some(_)) => {
                return Err(parse_err("both object and value are set".into()));
            }
            (None, None) => {
                return Err(parse_err("neither object nor value is set".into()));
            }
        };
        triples.push(Triple {
            subject: TermId::new(subject),
            predicate: TermId::new(predicate),
            object,
        });
    }
    Ok(triples)
}

/// TSV exports escape tabs and newlines inside literal values.
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
