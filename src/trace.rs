// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
use num::BigUint;

mod remap;
pub use remap::Remap;

mod probe;
pub use probe::{EventSource, Selection, SelectionTable, StoreProbe, ViewMux};

mod resolver;
pub use resolver::{
    from_fn, Addr2Line, CacheStats, Func, Image, ImageTable, ResolvedSymbol, SymbolLookup,
    SymbolResolver, PLACEHOLDER,
};

mod emitter;
pub use emitter::{DedupStrategy, Emitter};

mod decoder;
pub use decoder::{run_trace, Decoder, Events, OutputMode, RunStats};

mod pclog;
pub use pclog::annotate_pc_log;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteData {
    pub data: BigUint,
    pub mask: BigUint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    ProgramCounter,
    MemoryWrite(WriteData),
}

/// Something worth reporting that happened in one cycle. `address` has
/// already been through the remapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressEvent {
    pub address: u64,
    pub time: u64,
    pub kind: EventKind,
}
