//! `schematree`: build, inspect and query schema tree snapshots.
//!
//! ```bash
//! schematree build wikidata.tsv --out models --format sequential --workers 16
//! schematree inspect models/wikidata.schemaTree.typed.seq
//! schematree query models/wikidata.schemaTree.typed.seq --property P31 --type s/Q5 --limit 10
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use schematree::{BuildConfig, Format, HeapSize, SchemaTree};

#[derive(Parser, Debug)]
#[command(name = "schematree")]
#[command(about = "Frequent-pattern index over property co-occurrence transactions")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a snapshot from a tab-separated transaction file
    Build {
        /// Transaction file, one transaction per line
        input: PathBuf,
        /// Directory receiving `<input stem><suffix>`
        #[arg(long, default_value = ".")]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = FormatArg::Structured)]
        format: FormatArg,
        /// Insertion workers (default: one per core)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Print the size of a snapshot
    Inspect {
        model: PathBuf,
    },
    /// Print raw supports of the items co-occurring with a context
    Query {
        model: PathBuf,
        /// Known property or qualifier
        #[arg(long = "property")]
        properties: Vec<String>,
        /// Known type, prefixed with `s/` or `o/`
        #[arg(long = "type")]
        types: Vec<String>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatArg {
    Structured,
    Sequential,
}

impl From<FormatArg> for Format {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Structured => Format::Structured,
            FormatArg::Sequential => Format::Sequential,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "failed");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> schematree::Result<()> {
    match command {
        Command::Build { input, out, format, workers } => {
            let mut config = BuildConfig::default().with_format(format.into());
            config.workers = workers;
            config.validate()?;
            let tree = schematree::build_from_path(&input, &config)?;
            let corpus = input.file_stem().and_then(|stem| stem.to_str()).unwrap_or("corpus");
            let path = out.join(config.format.file_name(corpus));
            schematree::save(&tree, &path, config.format)?;
            info!(path = %path.display(), "done");
        }
        Command::Inspect { model } => {
            let tree = schematree::load(&model)?;
            let (used, allocated) = tree.heap_size();
            println!("nodes\t{}", tree.len());
            println!("transactions\t{}", tree.transactions());
            println!("items\t{}", tree.dictionary().len());
            println!("heap bytes\t{used}\t{allocated}");
        }
        Command::Query { model, properties, types, limit } => {
            let tree = schematree::load(&model)?;
            print_candidates(&tree, &properties, &types, limit);
        }
    }
    Ok(())
}

fn print_candidates(tree: &SchemaTree, properties: &[String], types: &[String], limit: usize) {
    let context = tree.build_instance(properties, types);
    let total = tree.support_of(&context);
    println!("context\t{}\t{total}", tree.dictionary().names(&context).collect::<Vec<_>>().join(" "));

    let mut candidates = tree.candidate_supports(&context);
    candidates.sort_by(|a, b| b.support.cmp(&a.support).then(a.item.cmp(&b.item)));
    for candidate in candidates.into_iter().take(limit) {
        if let Some(item) = tree.dictionary().item(candidate.item) {
            println!("{}\t{}\t{:?}", item.name(), candidate.support, item.kind());
        }
    }
}
