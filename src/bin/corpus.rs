//! Corpus CLI: filter a harvested corpus and export it.
//!
//! Usage:
//!   corpus [--config path] [-v]... filter [--filter-file path] [--input-file path] [--out path]
//!   corpus [--config path] [-v]... export [--input-file path] [--out path] [--format json|console|graph] [--db path]

use clap::{Parser, Subcommand, ValueEnum};
use corpus::export::{self, Format};
use corpus::{Corpus, CorpusFilter, FilterSpec, GraphProjector, OpenStore, Settings, SqliteStore};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "corpus",
    version,
    about = "Filter and export repository metadata corpora"
)]
struct Cli {
    /// Path to a YAML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep the projects that pass a filter file
    Filter {
        /// Filter file (YAML)
        #[arg(long)]
        filter_file: Option<PathBuf>,
        /// Corpus to filter (JSON)
        #[arg(long)]
        input_file: Option<PathBuf>,
        /// Where to write the filtered corpus
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export a corpus as JSON, a console listing, or into the graph database
    Export {
        /// Corpus to export (JSON)
        #[arg(long)]
        input_file: Option<PathBuf>,
        /// Output file for the json format
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Path to SQLite graph database
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
    Console,
    Graph,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_corpus(path: &Path) -> Result<Corpus, String> {
    Corpus::load(path).map_err(|e| format!("Failed to load corpus {}: {}", path.display(), e))
}

fn cmd_filter(filter_file: &Path, input: &Path, out: &Path) -> i32 {
    let spec = match FilterSpec::load(filter_file) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("Error: failed to load filter file {}: {}", filter_file.display(), e);
            return 1;
        }
    };
    let corpus = match load_corpus(input) {
        Ok(corpus) => corpus,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let before = corpus.projects().len();
    let filtered = CorpusFilter::new(spec).apply(corpus);
    match export::write_to_path(&filtered, out, Format::Json) {
        Ok(()) => {
            println!(
                "Kept {} of {} projects, written to {}",
                filtered.projects().len(),
                before,
                out.display()
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_export_flat(corpus: &Corpus, format: ExportFormat, out: &Path) -> i32 {
    let result = match format {
        ExportFormat::Console => export::serialize(corpus, std::io::stdout().lock(), Format::Listing),
        _ => export::write_to_path(corpus, out, Format::Json),
    };
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_export_graph(corpus: &Corpus, db: &Path) -> i32 {
    let store = match SqliteStore::open(db) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: failed to open database {}: {}", db.display(), e);
            return 1;
        }
    };
    let report = GraphProjector::new(&store).project(corpus);
    println!(
        "Projected {} projects ({} skipped): {} nodes, {} relationships, {} entities skipped, {} references unresolved",
        report.projects,
        report.skipped_projects,
        report.nodes,
        report.relationships,
        report.skipped_entities,
        report.unresolved_references
    );
    0
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Filter {
            filter_file,
            input_file,
            out,
        } => {
            let filter_file = filter_file.unwrap_or_else(|| settings.filter_file.clone());
            let input = input_file.unwrap_or_else(|| settings.input_file.clone());
            let out = out.unwrap_or_else(|| settings.output_file.clone());
            cmd_filter(&filter_file, &input, &out)
        }
        Commands::Export {
            input_file,
            out,
            format,
            db,
        } => {
            let input = input_file.unwrap_or_else(|| settings.input_file.clone());
            match load_corpus(&input) {
                Ok(corpus) => match format {
                    ExportFormat::Graph => {
                        let db = db.unwrap_or_else(|| settings.graph_db.clone());
                        cmd_export_graph(&corpus, &db)
                    }
                    flat => {
                        let out = out.unwrap_or_else(|| settings.output_file.clone());
                        cmd_export_flat(&corpus, flat, &out)
                    }
                },
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            }
        }
    };
    std::process::exit(code);
}
