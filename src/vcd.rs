// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
mod reader;
pub use reader::{Cursor, Line, LineReader, Word, WordReader};

mod types;
pub use types::*;

mod signal;
pub use signal::{Applied, SignalTable};

mod parse;
pub use parse::{parse_record, scan_header, Record};

mod utilities;
pub use utilities::low_u64;
