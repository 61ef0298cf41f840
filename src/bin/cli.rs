//! seqset CLI
//!
//! Non-interactive driver for building, indexing and querying a sequence set.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use seqset::record::{self, NumericPolicy};
use seqset::{index, Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// seqset CLI
#[derive(Parser, Debug)]
#[command(name = "seqset")]
#[command(about = "Blocked sequence set storage engine")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./seqset_data", global = true)]
    data_dir: PathBuf,

    /// Block capacity in bytes
    #[arg(short, long, default_value = "512", global = true)]
    block_size: usize,

    /// Advisory minimum block fill ratio
    #[arg(long, default_value = "0.5", global = true)]
    min_fill: f64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the block file, descriptor and index from a sorted input file
    Build {
        /// Input file, one record per line
        input: PathBuf,

        /// The input has no header line
        #[arg(long)]
        no_header: bool,
    },

    /// Look up records by primary key
    Lookup {
        /// Keys to look up
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Print blocks
    Dump {
        /// Traversal order
        #[arg(short, long, value_enum, default_value_t = DumpOrder::Logical)]
        order: DumpOrder,
    },

    /// Check the active and available chains
    Verify,

    /// Convert a comma-separated file to length-indicated format
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// The input has no header line
        #[arg(long)]
        no_header: bool,

        /// Substitute zero for malformed numeric fields instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Index a length-indicated file by one of its fields
    Index {
        /// Length-indicated data file
        data_file: PathBuf,

        /// Index file to write
        output: PathBuf,

        /// Ordinal of the key field
        #[arg(short, long, default_value = "0")]
        key_field: usize,
    },

    /// Print the line starting at a byte offset
    Fetch { file: PathBuf, offset: u64 },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DumpOrder {
    Physical,
    Logical,
    Available,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,seqset=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> seqset::Result<()> {
    let mut stdout = io::stdout().lock();

    match args.command {
        Commands::Build { input, no_header } => {
            let config = Config::builder()
                .data_dir(&args.data_dir)
                .block_capacity(args.block_size)
                .min_fill_ratio(args.min_fill)
                .skip_header(!no_header)
                .build();

            let mut engine = Engine::open(config)?;
            let report = engine.load_file(&input)?;
            writeln!(
                stdout,
                "{} records in {} blocks ({} bytes), {} oversized, {} underfull",
                report.record_count,
                report.block_count,
                report.bytes_written,
                report.oversized_blocks.len(),
                report.underfull_blocks.len()
            )?;
        }
        Commands::Lookup { keys } => {
            let engine = Engine::open_path(&args.data_dir)?;
            for key in keys {
                match engine.get(&key)? {
                    Some(record) => writeln!(stdout, "{}", record)?,
                    None => writeln!(stdout, "{} was not found in the index.", key)?,
                }
            }
        }
        Commands::Dump { order } => {
            let engine = Engine::open_path(&args.data_dir)?;
            let store = engine.store();
            match order {
                DumpOrder::Physical => store.write_physical_dump(&mut stdout)?,
                DumpOrder::Logical => store.write_logical_dump(&mut stdout)?,
                DumpOrder::Available => store.write_available_dump(&mut stdout)?,
            }
        }
        Commands::Verify => {
            let engine = Engine::open_path(&args.data_dir)?;
            let stats = engine.verify()?;
            writeln!(
                stdout,
                "ok: {} active blocks, {} available blocks",
                stats.active, stats.available
            )?;
        }
        Commands::Convert {
            input,
            output,
            no_header,
            lenient,
        } => {
            let policy = if lenient {
                NumericPolicy::ZeroWithWarning
            } else {
                NumericPolicy::Strict
            };
            let count = record::convert_lines(&input, &output, !no_header, policy)?;
            writeln!(stdout, "{} records written to {}", count, output.display())?;
        }
        Commands::Index {
            data_file,
            output,
            key_field,
        } => {
            let entries = index::build_from_length_indicated(&data_file, key_field)?;
            index::write_entries(&output, &entries)?;
            writeln!(stdout, "{} entries written to {}", entries.len(), output.display())?;
        }
        Commands::Fetch { file, offset } => {
            writeln!(stdout, "{}", index::fetch_by_offset(&file, offset)?)?;
        }
    }

    Ok(())
}
