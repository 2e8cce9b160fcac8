//! Tabular export of term stanzas.
//!
//! Columns name predicates or the pseudo-columns `CURIE`, `IRI` and `label`.
//! A header of the form `"<column> [<format>]"` renders that column in its
//! own value format instead of the default one.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{RenderError, SliceResult};
use crate::project::{Column, LabelLookup, Projector, ValueFormat};
use crate::render::{to_json, write_delimited};
use crate::stanza::Stanza;

static RE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\[([A-Za-z]+)\]$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Tsv,
    Csv,
    Json,
}

impl FromStr for TableFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tsv" => Ok(TableFormat::Tsv),
            "csv" => Ok(TableFormat::Csv),
            "json" => Ok(TableFormat::Json),
            _ => Err(RenderError::UnknownFormat {
                format: s.to_string(),
                supported: "tsv, csv, json".into(),
            }),
        }
    }
}

/// One output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Header as written by the user.
    pub header: String,
    pub column: Column,
    /// Overrides the default value format for this column.
    pub format: Option<ValueFormat>,
}

/// Parse column headers, splitting off any `[format]` suffix.
pub fn parse_columns(headers: &[String]) -> SliceResult<Vec<ColumnSpec>> {
    headers
        .iter()
        .map(|header| {
            let header = header.trim();
            let (name, format) = match RE_HEADER.captures(header) {
                Some(caps) => (
                    caps[1].to_string(),
                    Some(ValueFormat::from_str(&caps[2])?),
                ),
                None => (header.to_string(), None),
            };
            Ok(ColumnSpec {
                header: header.to_string(),
                column: Column::parse(&name),
                format,
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub columns: Vec<ColumnSpec>,
    pub value_format: ValueFormat,
    pub format: TableFormat,
    /// Joins multiple values in one cell.
    pub split: String,
    pub headers: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            columns: parse_columns(&["CURIE".into(), "label".into()]).unwrap_or_default(),
            value_format: ValueFormat::Iri,
            format: TableFormat::Tsv,
            split: "|".into(),
            headers: true,
        }
    }
}

/// Export one row per stanza.
pub fn export_table<L: LabelLookup + ?Sized>(
    stanzas: &[&Stanza],
    projector: &Projector<'_, L>,
    options: &ExportOptions,
) -> Result<String, RenderError> {
    let rows: Vec<Vec<String>> = stanzas
        .iter()
        .map(|stanza| {
            options
                .columns
                .iter()
                .map(|c| {
                    projector.project_joined(
                        stanza,
                        &c.column,
                        c.format.unwrap_or(options.value_format),
                        &options.split,
                    )
                })
                .collect()
        })
        .collect();
    let headers: Vec<String> = options.columns.iter().map(|c| c.header.clone()).collect();

    match options.format {
        TableFormat::Tsv | TableFormat::Csv => {
            let delimiter = if options.format == TableFormat::Csv { ',' } else { '\t' };
            let headers = options.headers.then_some(headers.as_slice());
            Ok(write_delimited(headers, &rows, delimiter))
        }
        TableFormat::Json => {
            let objects: Vec<Value> = rows
                .into_iter()
                .map(|row| {
                    let map: Map<String, Value> = headers
                        .iter()
                        .cloned()
                        .zip(row.into_iter().map(Value::String))
                        .collect();
                    Value::Object(map)
                })
                .collect();
            to_json(&objects)
        }
    }
}
