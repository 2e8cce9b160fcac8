//! Rich diagnostic error types for ontoslice.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.
//!
//! Two tiers exist. Errors (`SliceError` and the subsystem enums) abort the
//! whole extraction and produce no output. [`TermDiagnostic`] values are
//! per-term problems that are collected and reported next to whatever output
//! the remaining import rows produced.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for ontoslice.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum SliceError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Closure(#[from] ClosureError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(ontoslice::store::io),
        help(
            "A filesystem operation failed. Check that the database or statements \
             file exists and has correct permissions."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(ontoslice::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             This may indicate corruption; rebuild it with `ontoslice load`."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(ontoslice::store::serde),
        help(
            "Failed to serialize or deserialize stored rows. \
             The database was probably written by an incompatible version; \
             rebuild it with `ontoslice load`."
        )
    )]
    Serialization { message: String },

    #[error("triple store unavailable: {message}")]
    #[diagnostic(
        code(ontoslice::store::unavailable),
        help(
            "The query collaborator could not answer. The extraction was aborted \
             and no partial output was written."
        )
    )]
    Unavailable { message: String },

    #[error("malformed statements row at {path}:{line}: {message}")]
    #[diagnostic(
        code(ontoslice::store::parse),
        help(
            "Statements files are tab-separated with the columns \
             stanza, subject, predicate, object, value, datatype, language."
        )
    )]
    Parse {
        path: String,
        line: usize,
        message: String,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Closure errors
// ---------------------------------------------------------------------------

/// Which traversal ceiling was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalLimit {
    Depth(usize),
    Terms(usize),
}

impl std::fmt::Display for TraversalLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraversalLimit::Depth(n) => write!(f, "depth limit of {n}"),
            TraversalLimit::Terms(n) => write!(f, "term limit of {n}"),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ClosureError {
    #[error("closure of '{seed}' exceeded the {limit}")]
    #[diagnostic(
        code(ontoslice::closure::limit_exceeded),
        help(
            "The hierarchy around this term is deeper or wider than the configured \
             ceiling. Raise `limits.max_depth` / `limits.max_terms`, or remove the \
             limit to traverse exhaustively."
        )
    )]
    LimitExceeded { seed: String, limit: TraversalLimit },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Import errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ImportError {
    #[error("failed to read {path}")]
    #[diagnostic(
        code(ontoslice::import::read),
        help("Check that the import or source table exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} has no '{column}' column")]
    #[diagnostic(
        code(ontoslice::import::missing_column),
        help("Import tables need an `ID` column; source tables need a `Source` column.")
    )]
    MissingColumn { path: String, column: String },

    #[error("unknown 'Related' keyword for '{term}': {keyword}")]
    #[diagnostic(
        code(ontoslice::import::unknown_relation),
        help("Valid keywords are: ancestors, descendants, parents, children.")
    )]
    UnknownRelation { term: String, keyword: String },

    #[error("unknown 'Intermediates' option: {value}")]
    #[diagnostic(
        code(ontoslice::import::unknown_intermediates),
        help("Use `all` to keep intermediate terms or `none` to collapse them.")
    )]
    UnknownIntermediates { value: String },

    #[error("unknown value format: {value}")]
    #[diagnostic(
        code(ontoslice::import::unknown_value_format),
        help("Value formats are: CURIE, IRI, label.")
    )]
    UnknownValueFormat { value: String },

    #[error("source '{source_name}' does not exist in {path}")]
    #[diagnostic(
        code(ontoslice::import::unknown_source),
        help("Add a row for this source to the source table, or fix the --source value.")
    )]
    UnknownSource { source_name: String, path: String },

    #[error("a source name is required when a source table is given")]
    #[diagnostic(
        code(ontoslice::import::missing_source),
        help("Pass --source to choose the row of the source table to apply.")
    )]
    MissingSource,
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    #[diagnostic(
        code(ontoslice::config::read),
        help("Check that the configuration file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(ontoslice::config::parse),
        help("The configuration file must be valid TOML matching `ExtractConfig`.")
    )]
    Parse { path: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(ontoslice::config::invalid), help("{message}"))]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// Render errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    #[error("unknown output format: {format}")]
    #[diagnostic(
        code(ontoslice::render::unknown_format),
        help("Supported formats: {supported}.")
    )]
    UnknownFormat { format: String, supported: String },

    #[error("failed to render output: {message}")]
    #[diagnostic(code(ontoslice::render::format))]
    Format { message: String },
}

// ---------------------------------------------------------------------------
// Term-level diagnostics
// ---------------------------------------------------------------------------

/// Where a revisit was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum CycleSite {
    /// Blank-node structure inside a stanza.
    Stanza,
    /// Ancestor/descendant traversal over the hierarchy predicates.
    Hierarchy,
}

impl std::fmt::Display for CycleSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleSite::Stanza => write!(f, "stanza"),
            CycleSite::Hierarchy => write!(f, "hierarchy"),
        }
    }
}

/// A non-fatal, per-term problem collected during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic, serde::Serialize)]
pub enum TermDiagnostic {
    #[error("'{term}' does not exist in the store")]
    #[diagnostic(
        code(ontoslice::term::not_found),
        severity(Warning),
        help("The term was skipped. Check the CURIE or label; extraction continued for other terms.")
    )]
    TermNotFound { term: String },

    #[error("label '{label}' matches more than one term: {}", .candidates.join(", "))]
    #[diagnostic(
        code(ontoslice::term::ambiguous_label),
        severity(Error),
        help("Use one of the listed CURIEs instead of the label. This import row was skipped.")
    )]
    AmbiguousLabel {
        label: String,
        candidates: Vec<String>,
    },

    #[error("cycle in {site} structure of '{root}' ({revisits} revisit(s) cut off)")]
    #[diagnostic(
        code(ontoslice::term::cycle),
        severity(Warning),
        help("The data is cyclic; each term was kept once and traversal terminated normally.")
    )]
    CyclicStructure {
        root: String,
        site: CycleSite,
        revisits: usize,
    },

    #[error("'{term}' is requested by sources with different predicate filters: {}", .sources.join(", "))]
    #[diagnostic(
        code(ontoslice::term::predicate_conflict),
        severity(Warning),
        help("The union of the requested predicates was used for this term.")
    )]
    PredicateConflict { term: String, sources: Vec<String> },
}

/// Convenience alias for functions returning ontoslice results.
pub type SliceResult<T> = std::result::Result<T, SliceError>;
