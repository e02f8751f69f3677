use anyhow::Result;
use clap::Parser;
use log::{info, LevelFilter};
use std::path::PathBuf;

use blastgene::format_io::{read_blast_input, write_hits_to, OutputFormat};
use blastgene::lookup::{GeneRegistryLookup, NoSequences, SequenceLookup};
use blastgene::seq_registry::{GeneRegistry, SequenceTable};
use blastgene::{parse_blast_xml_str, BlastResultProcessor, ProcessorConfig};

/// blastgene - Gene symbol annotation for BLAST XML results
///
/// Reads BLAST XML (-outfmt 5), keeps every hit that has an HSP and resolves
/// a gene symbol for it from the sequence table, the gene registry and the
/// hit description.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// BLAST XML file (optionally .gz); reads stdin if omitted
    #[clap(value_name = "XML")]
    xml_file: Option<PathBuf>,

    /// Input BLAST XML file (alternative to the positional argument)
    #[clap(short = 'i', long = "input", conflicts_with = "xml_file")]
    input: Option<PathBuf>,

    /// Output file (stdout if not specified)
    #[clap(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Sequence table (CSV, or TSV for .tsv/.tab/.txt) with an `id` column
    #[clap(short = 's', long = "sequences")]
    sequences: Option<PathBuf>,

    /// Gene registry with `original_name` and `hgnc_symbol` columns
    #[clap(short = 'g', long = "genes")]
    genes: Option<PathBuf>,

    /// Ignore linked-gene columns of the sequence table
    #[clap(long = "no-gene-links")]
    no_gene_links: bool,

    /// Output format: "tsv" or "json"
    #[clap(short = 'f', long = "format", default_value = "tsv")]
    format: String,

    /// Number of threads for parallel annotation
    #[clap(short = 't', long = "threads", default_value = "1")]
    threads: usize,

    /// Quiet mode (warnings and errors only)
    #[clap(long = "quiet")]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG still overrides the default level
    env_logger::Builder::new()
        .filter_level(if args.quiet { LevelFilter::Warn } else { LevelFilter::Info })
        .parse_default_env()
        .init();

    let format: OutputFormat = args.format.parse()?;
    let input = args.input.or(args.xml_file);

    // If no input specified and no stdin, print help
    if input.is_none() {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            use clap::CommandFactory;
            Args::command().print_help()?;
            std::process::exit(0);
        }
    }

    if args.threads > 1 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()?;
    }

    let sequence_table = args.sequences.as_ref().map(SequenceTable::from_path).transpose()?;
    let registry = args.genes.as_ref().map(GeneRegistry::from_path).transpose()?;

    // Linked genes are consulted only if the table carries them
    let gene_linkage = !args.no_gene_links
        && sequence_table
            .as_ref()
            .map(SequenceTable::has_gene_links)
            .unwrap_or(false);

    let sequences: &dyn SequenceLookup = match &sequence_table {
        Some(table) => table,
        None => &NoSequences,
    };
    let registry = registry.as_ref().map(|r| r as &dyn GeneRegistryLookup);

    let config = ProcessorConfig {
        threads: args.threads.max(1),
        gene_linkage,
    };
    info!(
        "Annotating {} (threads: {}, gene links: {})",
        input
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdin".to_string()),
        config.threads,
        config.gene_linkage
    );

    let xml = read_blast_input(input.as_deref())?;
    let document = parse_blast_xml_str(&xml)?;
    let processor = BlastResultProcessor::new(sequences, registry, config);
    let records = processor.process_document(&document)?;

    write_hits_to(args.output.as_deref(), &records, format)?;

    Ok(())
}
