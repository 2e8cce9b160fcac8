// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # ontoslice
//!
//! Ontology subset extraction over RDF triple stores: given a set of
//! requested terms, compute the smallest hierarchy-connected slice of the
//! ontology that contains them and emit it as an import module or view.
//!
//! ## Architecture
//!
//! - **Stores** (`store`): read-only [`store::TripleSource`] over memory (dashmap + petgraph) or redb
//! - **Stanzas** (`stanza`): a term's triples plus the blank-node structures it owns
//! - **Closures** (`closure`): cycle-safe ancestor/descendant traversal
//! - **Assembly** (`assemble`): merges per-seed closures into one [`assemble::TermSet`]
//! - **Extraction** (`extract`): resolves import rows and runs the pipeline, in parallel with rayon
//! - **Outputs** (`module`, `expand`, `render`): Turtle import modules, expanded import tables, tables and trees
//!
//! ## Library usage
//!
//! ```no_run
//! use ontoslice::config::ExtractConfig;
//! use ontoslice::extract::Extractor;
//! use ontoslice::import::{ImportTerm, Relation};
//! use ontoslice::store::{MemStore, load_statements};
//!
//! let triples = load_statements(std::path::Path::new("statements.tsv")).unwrap();
//! let store = MemStore::from_triples(triples);
//! let terms = vec![ImportTerm::new("OBI:0100046").with_related([Relation::Ancestors])];
//! let extraction = Extractor::new(&store, ExtractConfig::default())
//!     .extract(&terms, None)
//!     .unwrap();
//! for term in extraction.terms.terms() {
//!     println!("{} {:?}", term.id, term.label);
//! }
//! ```

pub mod assemble;
pub mod closure;
pub mod config;
pub mod error;
pub mod expand;
pub mod extract;
pub mod import;
pub mod module;
pub mod prefix;
pub mod project;
pub mod render;
pub mod stanza;
pub mod store;
pub mod term;
