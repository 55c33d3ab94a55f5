// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
use thiserror::Error;

use crate::vcd::Cursor;

/// Everything that can go wrong while turning a trace into annotated output.
///
/// `Config`, `MissingSignal` and `Io` abort a run. `MalformedRecord` and
/// `Resolution` are reported by the pipeline and then skipped over.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("required signal `{name}` is not declared in the trace")]
    MissingSignal { name: String },

    #[error("malformed record `{line}` at {cursor:?}: {reason}")]
    MalformedRecord {
        line: String,
        cursor: Cursor,
        reason: String,
    },

    #[error("could not resolve 0x{address:x} in `{image}`: {reason}")]
    Resolution {
        address: u64,
        image: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors the pipeline reports and then continues past.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::MalformedRecord { .. } | Error::Resolution { .. })
    }
}
