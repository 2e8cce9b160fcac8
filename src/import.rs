//! Import specifications: which terms to extract, and how.
//!
//! An import table has one row per requested term with the columns `ID`
//! (required), `Label`, `Parent ID`, `Parent Label`, `Related` and `Source`.
//! A companion source table, keyed by `Source`, supplies `IRI`,
//! `Intermediates` and `Predicates` for every row of that source group.
//! Tables ending in `.csv` are comma separated, everything else is TSV.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ImportError;
use crate::term::TermId;

/// Relation set member requested through the `Related` column.
///
/// Declaration order is the order reasons are listed in expanded tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Ancestors,
    Children,
    Descendants,
    Parents,
}

impl Relation {
    pub const ALL: [Relation; 4] = [
        Relation::Ancestors,
        Relation::Children,
        Relation::Descendants,
        Relation::Parents,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Relation::Ancestors => "ancestors",
            Relation::Children => "children",
            Relation::Descendants => "descendants",
            Relation::Parents => "parents",
        }
    }

    /// What a term pulled in by this relation is to its requester.
    pub fn role(self) -> &'static str {
        match self {
            Relation::Ancestors => "ancestor",
            Relation::Children => "child",
            Relation::Descendants => "descendant",
            Relation::Parents => "parent",
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Parse a `Related` cell. Keywords may be separated by spaces or commas;
/// duplicates are dropped, first occurrence wins.
pub fn parse_related(term: &str, text: &str) -> Result<Vec<Relation>, ImportError> {
    let mut relations = Vec::new();
    for keyword in text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|k| !k.is_empty())
    {
        let relation = match keyword.to_lowercase().as_str() {
            "ancestors" => Relation::Ancestors,
            "children" => Relation::Children,
            "descendants" => Relation::Descendants,
            "parents" => Relation::Parents,
            _ => {
                return Err(ImportError::UnknownRelation {
                    term: term.to_string(),
                    keyword: keyword.to_string(),
                });
            }
        };
        if !relations.contains(&relation) {
            relations.push(relation);
        }
    }
    Ok(relations)
}

/// Whether chain terms between a seed and its anchors are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intermediates {
    #[default]
    All,
    None,
}

impl FromStr for Intermediates {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Intermediates::All),
            "none" => Ok(Intermediates::None),
            _ => Err(ImportError::UnknownIntermediates {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Intermediates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intermediates::All => write!(f, "all"),
            Intermediates::None => write!(f, "none"),
        }
    }
}

/// One row of an import table, as written. Identifiers are not yet resolved
/// against the store and may be labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportTerm {
    pub id: String,
    pub label: Option<String>,
    pub parent_id: Option<String>,
    pub parent_label: Option<String>,
    pub related: Vec<Relation>,
    pub source: Option<String>,
}

impl ImportTerm {
    /// A bare term request, e.g. from `--term`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_related(mut self, related: impl IntoIterator<Item = Relation>) -> Self {
        self.related = related.into_iter().collect();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Import rows for terms named on the command line. Each one requests its
/// ancestors unless `no_hierarchy` is set.
pub fn command_line_terms<S: Into<String>>(
    raw: impl IntoIterator<Item = S>,
    no_hierarchy: bool,
) -> Vec<ImportTerm> {
    raw.into_iter()
        .map(|id| {
            let term = ImportTerm::new(id);
            if no_hierarchy {
                term
            } else {
                term.with_related([Relation::Ancestors])
            }
        })
        .collect()
}

/// Per-source settings from the source table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceConfig {
    pub source: String,
    /// Provenance IRI for the `imported from` annotation.
    pub iri: Option<String>,
    pub intermediates: Option<Intermediates>,
    /// Predicate IDs or labels; empty means all predicates.
    pub predicates: Vec<String>,
}

/// All rows of a source table, in file order.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    path: String,
    sources: Vec<SourceConfig>,
}

impl SourceTable {
    pub fn new(path: impl Into<String>, sources: Vec<SourceConfig>) -> Self {
        Self {
            path: path.into(),
            sources,
        }
    }

    /// Look up a source group by name.
    pub fn get(&self, source: &str) -> Result<&SourceConfig, ImportError> {
        self.sources
            .iter()
            .find(|s| s.source == source)
            .ok_or_else(|| ImportError::UnknownSource {
                source_name: source.to_string(),
                path: self.path.clone(),
            })
    }
}

/// An import row with identifiers resolved and policies settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSpec {
    pub id: TermId,
    pub label: Option<String>,
    /// Explicit parent override from `Parent ID`.
    pub parent: Option<TermId>,
    pub related: Vec<Relation>,
    pub intermediates: Intermediates,
    /// Annotation predicates to copy; `None` means all.
    pub predicates: Option<Vec<TermId>>,
    pub source: Option<String>,
    pub imported_from: Option<String>,
}

impl ImportSpec {
    pub fn new(id: impl Into<TermId>) -> Self {
        Self {
            id: id.into(),
            label: None,
            parent: None,
            related: Vec::new(),
            intermediates: Intermediates::All,
            predicates: None,
            source: None,
            imported_from: None,
        }
    }

    pub fn related(mut self, related: impl IntoIterator<Item = Relation>) -> Self {
        self.related = related.into_iter().collect();
        self
    }

    pub fn intermediates(mut self, intermediates: Intermediates) -> Self {
        self.intermediates = intermediates;
        self
    }

    pub fn parent(mut self, parent: impl Into<TermId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn requests(&self, relation: Relation) -> bool {
        self.related.contains(&relation)
    }
}

// ---------------------------------------------------------------------------
// Delimited tables
// ---------------------------------------------------------------------------

/// A header row plus data rows, all cells trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn cell<'a>(&self, row: &'a [String], column: Option<usize>) -> Option<&'a str> {
        column
            .and_then(|c| row.get(c))
            .map(String::as_str)
            .filter(|c| !c.is_empty())
    }
}

/// `,` for `.csv` files, tab otherwise.
pub fn delimiter_for(path: &Path) -> char {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => ',',
        _ => '\t',
    }
}

pub fn read_table(path: &Path) -> Result<Table, ImportError> {
    let content = std::fs::read_to_string(path).map_err(|e| ImportError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_table(&content, delimiter_for(path)))
}

/// Parse delimited text. Double-quoted cells may contain the delimiter and
/// `""` escapes; blank lines are skipped.
pub fn parse_table(content: &str, delimiter: char) -> Table {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let headers = lines
        .next()
        .map(|l| split_row(l, delimiter))
        .unwrap_or_default();
    let rows = lines.map(|l| split_row(l, delimiter)).collect();
    Table { headers, rows }
}

fn split_row(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' if quoted => quoted = false,
            '"' if cell.trim().is_empty() => {
                cell.clear();
                quoted = true;
            }
            c if c == delimiter && !quoted => {
                cells.push(cell.trim().to_string());
                cell.clear();
            }
            c => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

/// Read an import table, keeping only rows of `source` when given.
pub fn load_import_terms(path: &Path, source: Option<&str>) -> Result<Vec<ImportTerm>, ImportError> {
    let table = read_table(path)?;
    import_terms_from_table(&table, &path.display().to_string(), source)
}

pub fn import_terms_from_table(
    table: &Table,
    path: &str,
    source: Option<&str>,
) -> Result<Vec<ImportTerm>, ImportError> {
    let id_col = table.column("ID").ok_or_else(|| ImportError::MissingColumn {
        path: path.to_string(),
        column: "ID".into(),
    })?;
    let label_col = table.column("Label");
    let parent_id_col = table.column("Parent ID");
    let parent_label_col = table.column("Parent Label");
    let related_col = table.column("Related");
    let source_col = table.column("Source");

    let mut terms = Vec::new();
    for row in &table.rows {
        let Some(id) = table.cell(row, Some(id_col)) else {
            continue;
        };
        let row_source = table.cell(row, source_col);
        if let (Some(wanted), Some(have)) = (source, row_source) {
            if wanted != have {
                continue;
            }
        }
        let related = match table.cell(row, related_col) {
            Some(text) => parse_related(id, text)?,
            None => Vec::new(),
        };
        terms.push(ImportTerm {
            id: id.to_string(),
            label: table.cell(row, label_col).map(str::to_string),
            parent_id: table.cell(row, parent_id_col).map(str::to_string),
            parent_label: table.cell(row, parent_label_col).map(str::to_string),
            related,
            source: row_source.or(source).map(str::to_string),
        });
    }
    Ok(terms)
}

/// Read a source table (`Source`, `IRI`, `Intermediates`, `Predicates`).
pub fn load_source_table(path: &Path) -> Result<SourceTable, ImportError> {
    let table = read_table(path)?;
    source_table_from_table(&table, &path.display().to_string())
}

pub fn source_table_from_table(table: &Table, path: &str) -> Result<SourceTable, ImportError> {
    let source_col = table
        .column("Source")
        .ok_or_else(|| ImportError::MissingColumn {
            path: path.to_string(),
            column: "Source".into(),
        })?;
    let iri_col = table.column("IRI");
    let intermediates_col = table.column("Intermediates");
    let predicates_col = table.column("Predicates");

    let mut sources = Vec::new();
    for row in &table.rows {
        let Some(source) = table.cell(row, Some(source_col)) else {
            continue;
        };
        let intermediates = table
            .cell(row, intermediates_col)
            .map(Intermediates::from_str)
            .transpose()?;
        let predicates = table
            .cell(row, predicates_col)
            .map(|p| p.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        sources.push(SourceConfig {
            source: source.to_string(),
            iri: table.cell(row, iri_col).map(str::to_string),
            intermediates,
            predicates,
        });
    }
    Ok(SourceTable::new(path, sources))
}

/// Read a plain list of terms, one per line (`--terms`, `--predicates`).
pub fn load_term_list(path: &Path) -> Result<Vec<String>, ImportError> {
    let content = std::fs::read_to_string(path).map_err(|e| ImportError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn related_accepts_spaces_and_commas() {
        let related = parse_related("EX:a", "ancestors, children parents ancestors").unwrap();
        assert_eq!(
            related,
            vec![Relation::Ancestors, Relation::Children, Relation::Parents]
        );
    }

    #[test]
    fn unknown_related_keyword() {
        let err = parse_related("EX:a", "siblings").unwrap_err();
        assert!(matches!(err, ImportError::UnknownRelation { keyword, .. } if keyword == "siblings"));
    }

    #[test]
    fn intermediates_is_case_insensitive() {
        assert_eq!("None".parse::<Intermediates>().unwrap(), Intermediates::None);
        assert_eq!(" all ".parse::<Intermediates>().unwrap(), Intermediates::All);
        assert!("some".parse::<Intermediates>().is_err());
    }

    #[test]
    fn quoted_csv_cells() {
        let table = parse_table("ID,Label\nEX:a,\"hand, left\"\nEX:b,\"say \"\"hi\"\"\"\n", ',');
        assert_eq!(table.rows[0], vec!["EX:a", "hand, left"]);
        assert_eq!(table.rows[1], vec!["EX:b", "say \"hi\""]);
    }

    #[test]
    fn import_table_with_source_filter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("imports.tsv");
        std::fs::write(
            &path,
            "ID\tLabel\tParent ID\tRelated\tSource\n\
             UBERON:1\thand\t\tancestors\tuberon\n\
             CHEBI:1\twater\tCHEBI:2\t\tchebi\n\
             \tno id\t\t\tuberon\n",
        )
        .unwrap();

        let all = load_import_terms(&path, None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].parent_id.as_deref(), Some("CHEBI:2"));

        let uberon = load_import_terms(&path, Some("uberon")).unwrap();
        assert_eq!(uberon.len(), 1);
        assert_eq!(uberon[0].related, vec![Relation::Ancestors]);
        assert_eq!(uberon[0].source.as_deref(), Some("uberon"));
    }

    #[test]
    fn command_line_terms_request_ancestors() {
        let terms = command_line_terms(["EX:a", "hand"], false);
        assert_eq!(terms.len(), 2);
        assert!(terms.iter().all(|t| t.related == vec![Relation::Ancestors]));
        assert_eq!(terms[1].id, "hand");

        let bare = command_line_terms(vec!["EX:a".to_string()], true);
        assert!(bare[0].related.is_empty());
    }

    #[test]
    fn import_table_requires_id_column() {
        let table = parse_table("Label\nhand\n", '\t');
        let err = import_terms_from_table(&table, "t.tsv", None).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn { column, .. } if column == "ID"));
    }

    #[test]
    fn source_table_lookup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sources.csv");
        std::fs::write(
            &path,
            "Source,IRI,Intermediates,Predicates\n\
             uberon,http://purl.obolibrary.org/obo/uberon.owl,none,rdfs:label IAO:0000115\n\
             chebi,,,\n",
        )
        .unwrap();
        let table = load_source_table(&path).unwrap();
        let uberon = table.get("uberon").unwrap();
        assert_eq!(uberon.intermediates, Some(Intermediates::None));
        assert_eq!(uberon.predicates, vec!["rdfs:label", "IAO:0000115"]);
        let chebi = table.get("chebi").unwrap();
        assert_eq!(chebi.iri, None);
        assert!(chebi.predicates.is_empty());
        assert!(matches!(
            table.get("go"),
            Err(ImportError::UnknownSource { .. })
        ));
    }
}
