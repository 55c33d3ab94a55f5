// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vcd_symtrace::config::hex;
use vcd_symtrace::trace::{Addr2Line, ImageTable, SymbolLookup, SymbolResolver};
use vcd_symtrace::{annotate_pc_log, run_trace, Config, DedupStrategy, Error, Events, OutputMode};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// TOML file overriding the built-in signal names, images and remap
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `dedup` from the config file
    #[arg(long, value_enum, global = true)]
    dedup: Option<DedupStrategy>,

    /// More logging on stderr, repeat for more (RUST_LOG takes precedence)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct TraceArgs {
    /// The path to the VCD file to read
    trace: PathBuf,

    #[arg(long, value_enum, default_value_t = Events::Pc)]
    events: Events,

    /// Skip ahead to this byte offset once the header is read (decimal or 0x hex)
    #[arg(long, value_parser = hex::parse)]
    seek_offset: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Print only the recovered events and their symbols
    Extract(TraceArgs),
    /// Echo the whole trace with events and symbols spliced in
    Annotate(TraceArgs),
    /// Label `> pc: <hex>` lines of a co-simulation log (stdin if no file)
    PcLog { log: Option<PathBuf> },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn open(path: &Path) -> Result<BufReader<File>, Error> {
    let file = File::open(path).map_err(|e| {
        Error::Io(io::Error::new(e.kind(), format!("{}: {e}", path.display())))
    })?;
    Ok(BufReader::new(file))
}

fn run(cli: Cli) -> Result<(), Error> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dedup) = cli.dedup {
        config.dedup = dedup;
    }
    let lookup = Addr2Line::from_config(&config.resolver);
    let stdout = BufWriter::new(io::stdout().lock());

    match cli.command {
        Command::Extract(args) => trace(args, config, OutputMode::Extract, lookup, stdout),
        Command::Annotate(args) => trace(args, config, OutputMode::Annotate, lookup, stdout),
        Command::PcLog { log } => {
            let images = ImageTable::from_config(&config.images);
            let mut resolver = SymbolResolver::new(images, lookup.without_functions());
            match log {
                Some(path) => annotate_pc_log(open(&path)?, &config.remap, &mut resolver, stdout)?,
                None => annotate_pc_log(io::stdin().lock(), &config.remap, &mut resolver, stdout)?,
            };
            Ok(())
        }
    }
}

fn trace<L: SymbolLookup, W: Write>(
    args: TraceArgs,
    mut config: Config,
    mode: OutputMode,
    lookup: L,
    out: W,
) -> Result<(), Error> {
    if args.seek_offset.is_some() {
        config.seek.offset = args.seek_offset;
    }
    let reader = open(&args.trace)?;
    let stats = run_trace(reader, &config, args.events, mode, lookup, out)?;
    if stats.malformed > 0 {
        tracing::warn!("{} malformed lines were skipped", stats.malformed);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
