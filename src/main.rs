//! ontoslice CLI: extract import modules and views from ontology triple stores.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};

use ontoslice::config::ExtractConfig;
use ontoslice::error::RenderError;
use ontoslice::expand::{DEFAULT_REASON_LIMIT, ExpandedRow, expand};
use ontoslice::extract::{Extraction, Extractor};
use ontoslice::import::{
    ImportTerm, Intermediates, SourceTable, command_line_terms, load_import_terms,
    load_source_table, load_term_list,
};
use ontoslice::module::{ModuleOptions, build_module};
use ontoslice::prefix::PrefixMap;
use ontoslice::project::{Projector, ValueFormat};
use ontoslice::render::{
    ExportOptions, TableFormat, export_table, parse_columns, render_tree, to_json, write_delimited,
    write_turtle,
};
use ontoslice::stanza::{Stanza, resolve_stanza};
use ontoslice::store::{DurableStore, MemStore, TripleSource, load_statements};
use ontoslice::term::TermId;

#[derive(Parser)]
#[command(name = "ontoslice", version, about = "Ontology subset extraction")]
struct Cli {
    /// redb database built with `ontoslice load`.
    #[arg(long, global = true, conflicts_with = "statements")]
    database: Option<PathBuf>,

    /// RDFTab statements TSV, loaded into memory.
    #[arg(long, global = true)]
    statements: Option<PathBuf>,

    /// Prefix table (`prefix<TAB>base`).
    #[arg(long, global = true)]
    prefixes: Option<PathBuf>,

    /// Extraction settings (TOML). Flags override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct TermArgs {
    /// CURIE or label of a term (repeatable).
    #[arg(short = 't', long = "term")]
    term: Vec<String>,

    /// File with one CURIE or label per line.
    #[arg(short = 'T', long = "terms")]
    terms: Option<PathBuf>,

    /// Import table (TSV or CSV) with ID, Label, Parent ID, Related, Source.
    #[arg(short = 'i', long = "imports")]
    imports: Option<PathBuf>,

    /// Source table with per-source intermediates, IRI and predicates.
    #[arg(short = 'c', long = "sources")]
    sources: Option<PathBuf>,

    /// Only use import rows from this source.
    #[arg(short = 's', long = "source")]
    source: Option<String>,

    /// Intermediate handling: all or none.
    #[arg(short = 'I', long = "intermediates")]
    intermediates: Option<String>,

    /// Extract -t/-T terms without their ancestors.
    #[arg(short = 'n', long = "no-hierarchy")]
    no_hierarchy: bool,

    /// Hang terms without a parent under their nearest retained ancestor.
    #[arg(long = "placement")]
    placement: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a statements TSV into a redb database.
    Load {
        /// Statements TSV to import.
        file: PathBuf,
    },

    /// Extract an import module.
    Extract {
        #[command(flatten)]
        terms: TermArgs,

        /// CURIE or label of an annotation predicate to include (repeatable).
        #[arg(short = 'p', long = "predicate")]
        predicate: Vec<String>,

        /// File with one predicate per line.
        #[arg(short = 'P', long = "predicates")]
        predicates: Option<PathBuf>,

        /// IRI of the source ontology to annotate terms with.
        #[arg(short = 'm', long = "imported-from")]
        imported_from: Option<String>,

        /// Annotation property used for the source IRI.
        #[arg(short = 'M', long = "imported-from-property")]
        imported_from_property: Option<String>,

        /// Output format: ttl or json.
        #[arg(short = 'f', long = "format", default_value = "ttl")]
        format: String,
    },

    /// Rewrite an import table with one explicit row per extracted term.
    Expand {
        #[command(flatten)]
        terms: TermArgs,

        /// Requesters named in a reason before switching to a count.
        #[arg(short = 'L', long = "limit", default_value_t = DEFAULT_REASON_LIMIT)]
        limit: usize,

        /// Output format: tsv or csv.
        #[arg(short = 'f', long = "format", default_value = "tsv")]
        format: String,
    },

    /// Export term details as a table.
    Export {
        /// CURIE or label of a term (repeatable).
        #[arg(short = 't', long = "term")]
        term: Vec<String>,

        /// File with one CURIE or label per line.
        #[arg(short = 'T', long = "terms")]
        terms: Option<PathBuf>,

        /// Column: CURIE, IRI, label or a predicate, optionally `"<column> [<format>]"`.
        #[arg(short = 'p', long = "predicate")]
        predicate: Vec<String>,

        /// File with one column per line.
        #[arg(short = 'P', long = "predicates")]
        predicates: Option<PathBuf>,

        /// Output format: tsv, csv or json.
        #[arg(short = 'f', long = "format", default_value = "tsv")]
        format: String,

        /// Joins multiple values in one cell.
        #[arg(short = 's', long = "split", default_value = "|")]
        split: String,

        /// Default value format: IRI, CURIE or label.
        #[arg(short = 'V', long = "values")]
        values: Option<String>,

        /// Omit the header row.
        #[arg(short = 'n', long = "no-headers")]
        no_headers: bool,
    },

    /// Print the extracted hierarchy as an indented tree.
    Tree {
        #[command(flatten)]
        terms: TermArgs,

        /// Value format for tree entries.
        #[arg(short = 'V', long = "values", default_value = "label")]
        values: String,
    },

    /// Show store and configuration info.
    Info,
}

/// The store selected by the global flags.
enum OpenStore {
    Memory(MemStore),
    Durable(DurableStore),
}

impl OpenStore {
    fn source(&self) -> &dyn TripleSource {
        match self {
            OpenStore::Memory(store) => store,
            OpenStore::Durable(store) => store,
        }
    }
}

fn open_store(cli: &Cli) -> Result<OpenStore> {
    if let Some(path) = &cli.statements {
        let triples = load_statements(path)?;
        tracing::info!(path = %path.display(), triples = triples.len(), "loaded statements");
        return Ok(OpenStore::Memory(MemStore::from_triples(triples)));
    }
    if let Some(path) = &cli.database {
        return Ok(OpenStore::Durable(DurableStore::open_existing(path)?));
    }
    Err(miette!("no store given: pass --database <redb> or --statements <tsv>"))
}

fn load_prefixes(cli: &Cli) -> Result<PrefixMap> {
    Ok(match &cli.prefixes {
        Some(path) => PrefixMap::load(path)?,
        None => PrefixMap::standard(),
    })
}

fn load_config(cli: &Cli) -> Result<ExtractConfig> {
    Ok(match &cli.config {
        Some(path) => ExtractConfig::load(path)?,
        None => ExtractConfig::default(),
    })
}

/// Collect import rows from `-t`, `-T` and `-i`, plus the source table.
fn gather_terms(
    args: &TermArgs,
    no_hierarchy: bool,
) -> Result<(Vec<ImportTerm>, Option<SourceTable>)> {
    let mut terms = command_line_terms(&args.term, no_hierarchy);
    if let Some(path) = &args.terms {
        terms.extend(command_line_terms(load_term_list(path)?, no_hierarchy));
    }
    if let Some(path) = &args.imports {
        terms.extend(load_import_terms(path, args.source.as_deref())?);
    }
    if terms.is_empty() {
        return Err(miette!("no terms given: use -t, -T or -i"));
    }
    let sources = args.sources.as_deref().map(load_source_table).transpose()?;
    Ok((terms, sources))
}

fn apply_term_args(config: &mut ExtractConfig, args: &TermArgs) -> Result<()> {
    if let Some(value) = &args.intermediates {
        config.intermediates = value.parse::<Intermediates>()?;
    }
    if args.no_hierarchy {
        config.no_hierarchy = true;
    }
    if args.placement {
        config.placement = true;
    }
    Ok(())
}

fn run_extraction(source: &dyn TripleSource, config: ExtractConfig, args: &TermArgs) -> Result<Extraction> {
    let (terms, sources) = gather_terms(args, config.no_hierarchy)?;
    let extraction = Extractor::new(source, config).extract(&terms, sources.as_ref())?;
    Ok(extraction)
}

fn read_list(values: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut out = values.to_vec();
    if let Some(path) = file {
        out.extend(load_term_list(path)?);
    }
    Ok(out)
}

/// Labels of every stanza root and every term they point at.
fn labels_for(source: &dyn TripleSource, stanzas: &[Stanza]) -> Result<HashMap<TermId, String>> {
    let mut labels = HashMap::new();
    for stanza in stanzas {
        let referenced = stanza
            .root_triples()
            .filter_map(|t| t.object.as_term())
            .filter(|o| !o.is_blank());
        for id in std::iter::once(stanza.root()).chain(referenced) {
            if labels.contains_key(id) {
                continue;
            }
            if let Some(label) = source.label_of(id)? {
                labels.insert(id.clone(), label);
            }
        }
    }
    Ok(labels)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Load { file } => {
            let path = cli
                .database
                .as_ref()
                .ok_or_else(|| miette!("`load` needs --database <redb> to write to"))?;
            let triples = load_statements(file)?;
            let store = DurableStore::open(path)?;
            let added = store.import(triples)?;
            println!(
                "Loaded {added} triples into {} ({} total).",
                path.display(),
                store.triple_count()?
            );
        }

        Commands::Extract {
            terms,
            predicate,
            predicates,
            imported_from,
            imported_from_property,
            format,
        } => {
            let store = open_store(&cli)?;
            let prefixes = load_prefixes(&cli)?;
            let mut config = load_config(&cli)?;
            apply_term_args(&mut config, terms)?;
            config
                .predicates
                .extend(read_list(predicate, predicates.as_deref())?);
            if let Some(iri) = imported_from {
                config.imported_from = Some(iri.clone());
            }
            if let Some(property) = imported_from_property {
                config.imported_from_property = property.clone();
            }
            config.validate()?;
            let options = ModuleOptions {
                imported_from_property: TermId::from(config.imported_from_property.as_str()),
            };

            let extraction = run_extraction(store.source(), config, terms)?;
            match format.to_lowercase().as_str() {
                "ttl" => {
                    let triples = build_module(store.source(), &extraction, &options)?;
                    print!("{}", write_turtle(&triples, &prefixes));
                }
                "json" => println!("{}", to_json(&extraction.terms)?),
                _ => {
                    return Err(RenderError::UnknownFormat {
                        format: format.clone(),
                        supported: "ttl, json".into(),
                    }
                    .into());
                }
            }
        }

        Commands::Expand {
            terms,
            limit,
            format,
        } => {
            let delimiter = match format.to_lowercase().as_str() {
                "tsv" => '\t',
                "csv" => ',',
                _ => {
                    return Err(RenderError::UnknownFormat {
                        format: format.clone(),
                        supported: "tsv, csv".into(),
                    }
                    .into());
                }
            };
            let store = open_store(&cli)?;
            let mut config = load_config(&cli)?;
            apply_term_args(&mut config, terms)?;

            let extraction = run_extraction(store.source(), config, terms)?;
            let rows: Vec<Vec<String>> = expand(&extraction.specs, &extraction.terms, *limit)
                .iter()
                .map(ExpandedRow::cells)
                .collect();
            let headers: Vec<String> = ExpandedRow::HEADERS.iter().map(|h| h.to_string()).collect();
            print!("{}", write_delimited(Some(headers.as_slice()), &rows, delimiter));
        }

        Commands::Export {
            term,
            terms,
            predicate,
            predicates,
            format,
            split,
            values,
            no_headers,
        } => {
            let store = open_store(&cli)?;
            let prefixes = load_prefixes(&cli)?;
            let config = load_config(&cli)?;
            let source = store.source();
            let extractor = Extractor::new(source, config);

            let mut stanzas = Vec::new();
            for raw in read_list(term, terms.as_deref())? {
                match extractor.resolve_id(&raw)? {
                    Ok(id) => stanzas.push(resolve_stanza(source, &id)?.stanza),
                    Err(diagnostic) => tracing::warn!("{diagnostic}"),
                }
            }
            if stanzas.is_empty() {
                return Err(miette!("no terms to export: use -t or -T"));
            }

            let columns = read_list(predicate, predicates.as_deref())?;
            let mut options = ExportOptions {
                format: format.parse::<TableFormat>()?,
                split: split.clone(),
                headers: !no_headers,
                value_format: extractor.config().value_format,
                ..Default::default()
            };
            if !columns.is_empty() {
                options.columns = parse_columns(&columns)?;
            }
            if let Some(values) = values {
                options.value_format = values.parse::<ValueFormat>()?;
            }

            let labels = labels_for(source, &stanzas)?;
            let projector = Projector::new(&labels, &prefixes);
            let rows: Vec<&Stanza> = stanzas.iter().collect();
            print!("{}", export_table(&rows, &projector, &options)?);
        }

        Commands::Tree { terms, values } => {
            let store = open_store(&cli)?;
            let prefixes = load_prefixes(&cli)?;
            let mut config = load_config(&cli)?;
            apply_term_args(&mut config, terms)?;
            let format = values.parse::<ValueFormat>()?;

            let extraction = run_extraction(store.source(), config, terms)?;
            let projector = Projector::new(&extraction.terms, &prefixes);
            print!("{}", render_tree(&extraction.terms, &projector, format));
        }

        Commands::Info => {
            let store = open_store(&cli)?;
            let prefixes = load_prefixes(&cli)?;
            let config = load_config(&cli)?;

            println!("ontoslice v{}", env!("CARGO_PKG_VERSION"));
            match &store {
                OpenStore::Memory(store) => {
                    println!("  Store:      in-memory");
                    println!("  Triples:    {}", store.triple_count());
                    println!("  Subjects:   {}", store.subject_count());
                }
                OpenStore::Durable(store) => {
                    println!("  Store:      redb");
                    println!("  Triples:    {}", store.triple_count()?);
                }
            }
            println!("  Prefixes:   {}", prefixes.iter().count());
            println!(
                "  Hierarchy:  {}",
                config.hierarchy_predicates.join(", ")
            );
            println!("  Intermediates: {}", config.intermediates);
            println!("  Parallel:   {}", config.parallel);
            let toml = toml::to_string_pretty(&config).into_diagnostic()?;
            println!("\n{toml}");
        }
    }

    Ok(())
}
