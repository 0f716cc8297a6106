use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use blastlca::calculate_lca;
use blastlca::config::{LcaConfig, OrderKeyPolicy, DEFAULT_CUTOFF, DEFAULT_MIN_PIDENT};
use blastlca::error::LcaError;
use blastlca::taxdb::TaxonNameTable;
use blastlca::worms::WormsRecordTable;

#[derive(Parser)]
#[command(name = "blastlca")]
#[command(version)]
#[command(about = "Parses a BLAST-tabular output file and produces LCAs from each hit's WoRMS lineage")]
#[command(long_about = r#"
blastlca - lowest common ancestor per query from BLAST hits

BLAST formatting assumed is:
  -outfmt "6 qseqid sseqid staxids sscinames scomnames sskingdoms pident length qlen slen ..."
Only qseqid (1st), staxids (3rd) and pident (7th) are read.

OUTPUT FILES:
  --output        ASV_name, Class, Order, Family, Genus, Species, PercentageID, Species_In_LCA
  --missing-out   name, rank (species|genus), count
"#)]
struct Cli {
    /// Input file of BLAST results (.gz accepted)
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Output file of LCAs, tab delimited
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Taxon id -> scientific name table (taxonkit `name` output or taxDB)
    #[arg(long = "names")]
    names: PathBuf,

    /// Tab-separated WoRMS match records with a header row
    #[arg(long = "worms")]
    worms: PathBuf,

    /// Percentage cutoff between best BLAST hit and followup to be considered in LCA
    #[arg(long = "cutoff", default_value_t = DEFAULT_CUTOFF)]
    cutoff: f64,

    /// Percentage cutoff for BLAST hits; hits below it are ignored
    #[arg(long = "pident", default_value_t = DEFAULT_MIN_PIDENT)]
    pident: f64,

    /// File to write species/genera missing from WoRMS to
    #[arg(long = "missing-out", alias = "missing_out", default_value = "missing.csv")]
    missing_out: PathBuf,

    /// Index order-only WoRMS matches under their (empty) family, as older releases did
    #[arg(long = "legacy-order-key")]
    legacy_order_key: bool,

    /// Worker threads for the per-query LCA (default: all cores)
    #[arg(short = 't', long = "threads")]
    threads: Option<usize>,
}

fn spinner(color: &str, msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = format!("{{spinner:.{}}} {{msg}}", color);
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(msg);
    spinner
}

fn run(cli: Cli) -> Result<(), LcaError> {
    let config = LcaConfig {
        cutoff: cli.cutoff,
        min_pident: cli.pident,
        order_key: if cli.legacy_order_key {
            OrderKeyPolicy::LegacyFamilyKey
        } else {
            OrderKeyPolicy::ByOrder
        },
    };

    if let Some(threads) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
            log::warn!("Could not size the thread pool: {}", e);
        }
    }

    // 1. Load the lookup tables
    let bar = spinner("blue", "Loading taxon names and WoRMS records...");
    let names = TaxonNameTable::from_file(&cli.names)?;
    let worms = WormsRecordTable::from_file(&cli.worms)?;
    bar.finish_with_message(format!(
        "Loaded {} taxon names, {} WoRMS records.",
        names.len(),
        worms.len()
    ));

    // 2. Calculate LCAs
    let bar = spinner("green", "Calculating LCAs...");
    let results = calculate_lca(&cli.file, &config, &names, &worms)?;
    bar.finish_with_message(format!(
        "Calculated LCAs for {} queries ({} hits read, {} below --pident, {} dropped; {} lineage entries).",
        results.query_lcas.len(),
        results.hits_read,
        results.hits_below_floor,
        results.hits_dropped,
        results.lineage_table.len()
    ));

    // 3. Write outputs
    let bar = spinner("yellow", "Writing output files...");
    fs::write(&cli.missing_out, results.get_missing_report())?;
    fs::write(&cli.output, results.get_lca_report())?;
    bar.finish_with_message("Output files created.");

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
