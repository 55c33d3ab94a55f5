// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
use std::collections::HashMap;
use std::io::{self, Write};

use serde::Deserialize;

use super::resolver::{SymbolLookup, SymbolResolver};
use super::{AddressEvent, EventKind};

/// When to repeat a symbol line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DedupStrategy {
    /// Print a symbol unless it is the one printed last, whatever address
    /// that was for.
    #[default]
    GlobalLast,
    /// Print a symbol unless the same address already printed it last time
    /// it came up.
    PerAddressLast,
}

/// Writes event and symbol lines. Owns the only mutable de-duplication
/// state of a run.
pub struct Emitter<W: Write> {
    out: W,
    strategy: DedupStrategy,
    last_emitted: Option<String>,
    last_by_address: HashMap<u64, String>,
}

impl<W: Write> Emitter<W> {
    pub fn new(out: W, strategy: DedupStrategy) -> Emitter<W> {
        Emitter {
            out,
            strategy,
            last_emitted: None,
            last_by_address: HashMap::new(),
        }
    }

    /// Decides whether `text` gets printed for `address` and records it.
    fn should_print(&mut self, address: u64, text: &str) -> bool {
        match self.strategy {
            DedupStrategy::GlobalLast => {
                let print = self.last_emitted.as_deref() != Some(text);
                if print {
                    self.last_emitted = Some(text.to_string());
                }
                print
            }
            DedupStrategy::PerAddressLast => {
                let print = self.last_by_address.get(&address).map(String::as_str) != Some(text);
                if print {
                    self.last_by_address.insert(address, text.to_string());
                }
                print
            }
        }
    }

    pub fn emit<L: SymbolLookup>(
        &mut self,
        event: &AddressEvent,
        resolver: &mut SymbolResolver<L>,
    ) -> io::Result<()> {
        match &event.kind {
            EventKind::MemoryWrite(write) => writeln!(
                self.out,
                "mem[0x{:x}] = {:x} (time {} mask {:x})",
                event.address, write.data, event.time, write.mask
            ),
            EventKind::ProgramCounter => {
                writeln!(self.out, "pc @ {}: {:x}", event.time, event.address)?;
                let symbol = resolver.resolve(event.address);
                if self.should_print(event.address, &symbol.text) {
                    writeln!(self.out, "{}", symbol.text)?;
                }
                Ok(())
            }
        }
    }

    /// Copies a line of the input through byte for byte, terminator
    /// included.
    pub fn echo(&mut self, raw: &[u8]) -> io::Result<()> {
        self.out.write_all(raw)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::resolver::{from_fn, Image, ImageTable};
    use crate::trace::WriteData;
    use num::BigUint;
    use std::path::{Path, PathBuf};

    fn images() -> ImageTable {
        ImageTable::new(vec![Image {
            upper_bound: None,
            path: PathBuf::from("fw.elf"),
        }])
    }

    fn pc(address: u64, time: u64) -> AddressEvent {
        AddressEvent {
            address,
            time,
            kind: EventKind::ProgramCounter,
        }
    }

    fn run(strategy: DedupStrategy, events: &[AddressEvent], symbols: &[(u64, &str)]) -> Vec<String> {
        let table: HashMap<u64, String> = symbols.iter().map(|(a, s)| (*a, s.to_string())).collect();
        let mut resolver = SymbolResolver::new(
            images(),
            from_fn(|_: &Path, address| Ok(table[&address].clone())),
        );
        let mut emitter = Emitter::new(Vec::new(), strategy);
        for event in events {
            emitter.emit(event, &mut resolver).unwrap();
        }
        String::from_utf8(emitter.into_inner())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn global_last_collapses_runs() {
        // five events resolving to foo, foo, bar, bar, bar
        let events: Vec<AddressEvent> = [1, 2, 3, 4, 5].iter().map(|a| pc(*a, *a * 10)).collect();
        let symbols = [(1, "foo"), (2, "foo"), (3, "bar"), (4, "bar"), (5, "bar")];
        let out = run(DedupStrategy::GlobalLast, &events, &symbols);
        assert_eq!(
            out,
            vec![
                "pc @ 10: 1",
                "foo",
                "pc @ 20: 2",
                "pc @ 30: 3",
                "bar",
                "pc @ 40: 4",
                "pc @ 50: 5",
            ]
        );
    }

    #[test]
    fn global_last_reprints_after_a_change() {
        let events = [pc(1, 0), pc(2, 1), pc(1, 2)];
        let out = run(DedupStrategy::GlobalLast, &events, &[(1, "foo"), (2, "bar")]);
        assert_eq!(out.iter().filter(|l| !l.starts_with("pc @")).count(), 3);
    }

    #[test]
    fn per_address_last_prints_each_address_once() {
        let events = [pc(1, 0), pc(2, 1), pc(1, 2), pc(2, 3)];
        let out = run(DedupStrategy::PerAddressLast, &events, &[(1, "foo"), (2, "bar")]);
        assert_eq!(
            out,
            vec!["pc @ 0: 1", "foo", "pc @ 1: 2", "bar", "pc @ 2: 1", "pc @ 3: 2"]
        );
    }

    #[test]
    fn per_address_last_still_prints_shared_text_for_new_addresses() {
        let events = [pc(1, 0), pc(2, 1)];
        let out = run(DedupStrategy::PerAddressLast, &events, &[(1, "foo"), (2, "foo")]);
        assert_eq!(out, vec!["pc @ 0: 1", "foo", "pc @ 1: 2", "foo"]);
    }

    #[test]
    fn memory_writes_are_not_resolved() {
        let event = AddressEvent {
            address: 0x1000,
            time: 120,
            kind: EventKind::MemoryWrite(WriteData {
                data: BigUint::from(0xdead_beefu32),
                mask: BigUint::from(0x0fu8),
            }),
        };
        let mut calls = 0;
        let mut resolver = SymbolResolver::new(
            images(),
            from_fn(|_: &Path, _| {
                calls += 1;
                Ok(String::new())
            }),
        );
        let mut emitter = Emitter::new(Vec::new(), DedupStrategy::GlobalLast);
        emitter.emit(&event, &mut resolver).unwrap();
        emitter.emit(&event, &mut resolver).unwrap();
        drop(resolver);

        let out = String::from_utf8(emitter.into_inner()).unwrap();
        assert_eq!(
            out,
            "mem[0x1000] = deadbeef (time 120 mask f)\nmem[0x1000] = deadbeef (time 120 mask f)\n"
        );
        assert_eq!(calls, 0);
    }

    #[test]
    fn echo_is_verbatim() {
        let mut emitter = Emitter::new(Vec::new(), DedupStrategy::GlobalLast);
        emitter.echo(b"  b0101 ! \r\n").unwrap();
        emitter.echo(b"#1\xff").unwrap();
        assert_eq!(emitter.into_inner(), b"  b0101 ! \r\n#1\xff");
    }
}
