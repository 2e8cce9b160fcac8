//! Output writers.
//!
//! The extraction core hands a [`TermSet`](crate::assemble::TermSet) or a
//! list of module triples to one of these writers; none of them feeds back
//! into extraction.

pub mod table;
pub mod tree;
pub mod turtle;

pub use table::{ColumnSpec, ExportOptions, TableFormat, export_table, parse_columns};
pub use tree::render_tree;
pub use turtle::write_turtle;

use serde::Serialize;

use crate::error::RenderError;

/// Pretty-printed JSON of any serialisable value.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RenderError> {
    serde_json::to_string_pretty(value).map_err(|e| RenderError::Format {
        message: e.to_string(),
    })
}

/// Write rows as delimited text. Cells holding the delimiter, a quote or a
/// line break are quoted for CSV; for TSV those characters are escaped.
pub fn write_delimited(headers: Option<&[String]>, rows: &[Vec<String>], delimiter: char) -> String {
    let mut out = String::new();
    let mut line = |cells: &[String]| {
        let joined: Vec<String> = cells.iter().map(|c| escape_cell(c, delimiter)).collect();
        out.push_str(&joined.join(&delimiter.to_string()));
        out.push('\n');
    };
    if let Some(headers) = headers {
        line(headers);
    }
    for row in rows {
        line(row);
    }
    out
}

fn escape_cell(cell: &str, delimiter: char) -> String {
    if delimiter == '\t' {
        return cell
            .replace('\\', "\\\\")
            .replace('\t', "\\t")
            .replace('\n', "\\n");
    }
    if cell.contains(delimiter) || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
