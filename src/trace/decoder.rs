// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.

//! Streams the trace body and closes out cycles.
use std::io::{BufRead, Seek, Write};

use super::emitter::Emitter;
use super::probe::{EventSource, StoreProbe, ViewMux};
use super::resolver::{ImageTable, SymbolLookup, SymbolResolver};
use crate::config::Config;
use crate::error::Error;
use crate::vcd::{parse_record, scan_header, Applied, Cursor, LineReader, Record, SignalTable, WordReader};

// malformed lines past this many are only counted
const MALFORMED_LOG_LIMIT: usize = 16;

/// Which event sources run over the trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Events {
    /// Committed program counter, through the view multiplexer.
    #[default]
    Pc,
    /// Memory writes seen on the store port.
    Writes,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Only event and symbol lines.
    Extract,
    /// Every trace line verbatim, with event and symbol lines placed
    /// before the timestamp that closes their cycle.
    Annotate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub lines: usize,
    pub cycles: usize,
    pub events: usize,
    pub malformed: usize,
    pub non_numeric: usize,
}

pub struct Decoder<L, W: Write> {
    table: SignalTable,
    sources: Vec<Box<dyn EventSource>>,
    resolver: SymbolResolver<L>,
    emitter: Emitter<W>,
    mode: OutputMode,
    stats: RunStats,
}

impl<L: SymbolLookup, W: Write> Decoder<L, W> {
    pub fn new(
        sources: Vec<Box<dyn EventSource>>,
        resolver: SymbolResolver<L>,
        emitter: Emitter<W>,
        mode: OutputMode,
    ) -> Decoder<L, W> {
        let mut table = SignalTable::new();
        for source in &sources {
            let signals = source.signals();
            tracing::debug!("{} source reads {} signals", source.name(), signals.len());
            for spec in signals {
                table.track(spec);
            }
        }
        tracing::debug!("tracking {} signal ids", table.len());

        Decoder {
            table,
            sources,
            resolver,
            emitter,
            mode,
            stats: RunStats::default(),
        }
    }

    fn malformed(&mut self, e: Error) {
        self.stats.malformed += 1;
        if self.stats.malformed <= MALFORMED_LOG_LIMIT {
            tracing::warn!("skipping {e}");
        }
        if self.stats.malformed == MALFORMED_LOG_LIMIT {
            tracing::warn!("further malformed records are counted but not logged");
        }
    }

    /// Samples every source against the table as it stands and emits the
    /// resulting events. The table itself is left alone.
    fn close_cycle(&mut self, time: u64) -> Result<(), Error> {
        self.stats.cycles += 1;
        for source in &self.sources {
            for event in source.sample(time, &self.table) {
                self.stats.events += 1;
                self.emitter.emit(&event, &mut self.resolver)?;
            }
        }
        Ok(())
    }

    /// Decodes one body line. `raw` is the line as read, echoed unchanged
    /// in annotate mode.
    pub fn feed_line(&mut self, line: &str, raw: &[u8], cursor: Cursor) -> Result<(), Error> {
        self.stats.lines += 1;

        match parse_record(line, cursor) {
            Ok(Record::Timestamp(time)) => self.close_cycle(time)?,
            Ok(Record::Change { bits, id }) => match self.table.apply(id, bits) {
                Ok(Applied::NonNumeric) => {
                    self.stats.non_numeric += 1;
                    tracing::trace!("`{id}` is `{bits}` at {cursor:?}, keeping last value");
                }
                Ok(Applied::Updated | Applied::Untracked) => {}
                Err(reason) => self.malformed(Error::MalformedRecord {
                    line: line.to_string(),
                    cursor,
                    reason,
                }),
            },
            Ok(Record::Other) => {}
            Err(e) => self.malformed(e),
        }

        if self.mode == OutputMode::Annotate {
            self.emitter.echo(raw)?;
        }
        Ok(())
    }

    /// Reads to the end of the stream.
    pub fn run<R: BufRead>(&mut self, lines: &mut LineReader<R>) -> Result<RunStats, Error> {
        while let Some((line, raw, cursor)) = lines.next_raw_line()? {
            self.feed_line(line, raw, cursor)?;
        }
        self.emitter.flush()?;

        let stats = self.stats;
        tracing::info!(
            "{} lines, {} cycles, {} events, {} malformed lines, {} non-numeric values",
            stats.lines,
            stats.cycles,
            stats.events,
            stats.malformed,
            stats.non_numeric
        );
        tracing::info!("symbol cache: {:?}", self.resolver.stats());
        Ok(stats)
    }

    pub fn table(&self) -> &SignalTable {
        &self.table
    }

    pub fn resolver(&self) -> &SymbolResolver<L> {
        &self.resolver
    }
}

/// Scans the header, binds the configured sources and decodes the whole
/// trace into `out`.
///
/// Fails before writing anything when a required signal is not declared.
pub fn run_trace<R, L, W>(
    reader: R,
    config: &Config,
    events: Events,
    mode: OutputMode,
    lookup: L,
    out: W,
) -> Result<RunStats, Error>
where
    R: BufRead + Seek,
    L: SymbolLookup,
    W: Write,
{
    let mut words = WordReader::new(reader);
    if mode == OutputMode::Annotate {
        words = words.keep_raw_lines();
    }
    let header = scan_header(&mut words)?;
    let (mut lines, raw_lines) = words.into_lines();

    let mut sources: Vec<Box<dyn EventSource>> = vec![];
    if matches!(events, Events::Pc | Events::All) {
        sources.push(Box::new(ViewMux::bind(&config.pc, config.remap, &header)?));
    }
    if matches!(events, Events::Writes | Events::All) {
        sources.push(Box::new(StoreProbe::bind(&config.writes, config.remap, &header)?));
    }

    let resolver = SymbolResolver::new(ImageTable::from_config(&config.images), lookup);
    let mut emitter = Emitter::new(out, config.dedup);
    for line in &raw_lines {
        emitter.echo(line)?;
    }

    if let Some(offset) = config.seek.offset {
        let anchor = config.seek_anchor();
        if header.lookup(anchor).is_ok() {
            if lines.seek_forward(offset)? {
                tracing::info!("`{}` declared, skipped ahead to byte {offset}", anchor.name);
            } else {
                tracing::debug!("seek offset {offset} is not past the header, reading on");
            }
        } else {
            tracing::warn!(
                "seek anchor `{}` is not declared, reading the whole trace",
                anchor.name
            );
        }
    }

    let mut decoder = Decoder::new(sources, resolver, emitter, mode);
    decoder.run(&mut lines)
}
