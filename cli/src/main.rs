mod compress;
mod decompress;
mod lookup;
mod verify;

use std::{
    fs, io,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{ensure, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::Level;

use crackalack_core::{find_tables, TableFormat, TableName};

use compress::compress;
use decompress::decompress;
use lookup::lookup;
use verify::verify;

/// Rainbow table lookups using the rainbowcrack and rcracki_mt table formats.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Print more logs (-v for debug logs, -vv for trace logs).
    #[clap(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print warnings and errors.
    #[clap(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[clap(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Lookup(Lookup),
    Verify(Verify),
    Compress(Compress),
    Decompress(Decompress),
}

/// Find the plaintexts producing the given hashes.
/// Exits with 0 if every hash is cracked and 2 if some hashes were not found.
#[derive(Args)]
pub struct Lookup {
    /// The directory searched recursively for rainbow tables.
    #[clap(value_parser)]
    dir: PathBuf,

    /// A hash in hexadecimal, or a file containing one hash per line.
    #[clap(value_parser)]
    hashes: String,

    /// The John the Ripper pot file.
    /// The hashcat pot file is stored next to it, with a .hashcat extension.
    #[clap(long, value_parser)]
    pot: Option<PathBuf>,

    /// The directory where the precomputed endpoints are kept between runs.
    #[clap(long, value_parser, default_value = ".")]
    precalc_dir: PathBuf,
}

/// Check that rainbow tables can be used for lookups.
/// Some randomly chosen chains are regenerated and compared to their stored endpoint.
#[derive(Args)]
pub struct Verify {
    /// The rainbow tables to verify, or directories containing them.
    #[clap(value_parser, required = true)]
    paths: Vec<PathBuf>,

    /// The number of chains regenerated in each table.
    #[clap(short, long, value_parser, default_value_t = 100)]
    chains: usize,
}

/// Compress a set of rainbow tables to the rcracki_mt format.
/// Tables are smaller on the disk but slower to search.
#[derive(Args)]
pub struct Compress {
    /// The output directory of the compressed rainbow table(s).
    #[clap(value_parser)]
    out_dir: PathBuf,

    /// The input directory containing the rainbow table(s) to compress.
    #[clap(value_parser)]
    in_dir: PathBuf,
}

/// Decompress a set of compressed rainbow tables.
/// Decompressed tables are bigger on the disk but faster to search.
#[derive(Args)]
pub struct Decompress {
    /// The output directory of the rainbow table(s).
    #[clap(value_parser)]
    out_dir: PathBuf,

    /// The input directory containing the compressed rainbow table(s) to decompress.
    #[clap(value_parser)]
    in_dir: PathBuf,
}

/// Installs the log subscriber, writing to stderr.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.commands {
        Commands::Lookup(args) => lookup(args),
        Commands::Verify(args) => verify(args).map(|()| ExitCode::SUCCESS),
        Commands::Compress(args) => compress(args).map(|()| ExitCode::SUCCESS),
        Commands::Decompress(args) => decompress(args).map(|()| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

/// Helper function to create a directory where will be stored rainbow tables.
fn create_dir_to_store_tables(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .context("Unable to create the specified directory to store the rainbow tables")
}

/// Helper function to find the rainbow tables of a given format below a directory.
fn get_table_paths_from_dir(
    dir: &Path,
    format: TableFormat,
) -> Result<Vec<(PathBuf, TableName)>> {
    let tables: Vec<_> = find_tables(dir)
        .context("Unable to open the specified directory")?
        .into_iter()
        .filter(|(_, table_name)| table_name.format == format)
        .collect();

    ensure!(
        !tables.is_empty(),
        "No .{} table found in {}",
        format.extension(),
        dir.display()
    );

    Ok(tables)
}
