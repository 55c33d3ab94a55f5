// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.

//! Recovers a program-counter and memory-write history from a VCD waveform
//! dump and labels every address with its source location.

pub mod config;
pub use config::Config;

pub mod error;
pub use error::Error;

pub mod trace;
pub use trace::{annotate_pc_log, run_trace, DedupStrategy, Events, OutputMode, RunStats};

pub mod vcd;

pub use num::BigUint;
