// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
use std::io::{BufRead, Write};

use super::remap::Remap;
use super::resolver::{SymbolLookup, SymbolResolver};
use crate::error::Error;
use crate::vcd::LineReader;

const PC_PREFIX: &str = "> pc: ";

/// The address in a `> pc: <hex>` line, if this is one.
fn pc_of(line: &str) -> Option<u64> {
    let rest = line.strip_prefix(PC_PREFIX)?;
    let end = rest
        .find(|chr: char| !matches!(chr, '0'..='9' | 'a'..='f'))
        .unwrap_or(rest.len());
    u64::from_str_radix(&rest[..end], 16).ok()
}

/// Copies a co-simulation log to `out`, putting `<symbol> @ <address>` in
/// front of every program counter line. Log lines go through byte for byte.
/// Returns how many lines were annotated.
pub fn annotate_pc_log<R, L, W>(
    input: R,
    remap: &Remap,
    resolver: &mut SymbolResolver<L>,
    mut out: W,
) -> Result<usize, Error>
where
    R: BufRead,
    L: SymbolLookup,
    W: Write,
{
    let mut annotated = 0;
    let mut lines = LineReader::new(input);
    while let Some((line, raw, _)) = lines.next_raw_line()? {
        if let Some(pc) = pc_of(line) {
            let address = remap.apply(pc);
            let symbol = resolver.resolve(address);
            writeln!(out, "{} @ {address:x}", symbol.text)?;
            annotated += 1;
        }
        out.write_all(raw)?;
    }
    out.flush()?;

    tracing::info!("annotated {annotated} pc lines, symbol cache: {:?}", resolver.stats());
    Ok(annotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::resolver::{from_fn, Image, ImageTable};
    use std::path::{Path, PathBuf};

    fn resolver() -> SymbolResolver<impl SymbolLookup> {
        let images = ImageTable::new(vec![
            Image {
                upper_bound: Some(0x8002_0000),
                path: PathBuf::from("fw.elf"),
            },
            Image {
                upper_bound: None,
                path: PathBuf::from("u-boot"),
            },
        ]);
        SymbolResolver::new(
            images,
            from_fn(|image: &Path, address| Ok(format!("{}:{address:x}", image.display()))),
        )
    }

    #[test]
    fn recognises_pc_lines() {
        assert_eq!(pc_of("> pc: 80000000"), Some(0x8000_0000));
        assert_eq!(pc_of("> pc: 1f insn 00000013"), Some(0x1f));
        assert_eq!(pc_of("> pc: "), None);
        assert_eq!(pc_of(" > pc: 10"), None);
        assert_eq!(pc_of("pc: 10"), None);
    }

    #[test]
    fn annotates_and_echoes() {
        let log = "boot\n> pc: 80000000\n> pc: a0000500 (x)\ndone\n";
        let mut out = Vec::new();
        let mut resolver = resolver();
        let count = annotate_pc_log(log.as_bytes(), &Remap::default(), &mut resolver, &mut out).unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "boot\n\
             fw.elf:80000000 @ 80000000\n\
             > pc: 80000000\n\
             u-boot:8005f500 @ 8005f500\n\
             > pc: a0000500 (x)\n\
             done\n"
        );
    }

    #[test]
    fn odd_bytes_and_line_endings_pass_through() {
        let log = b"\xfe junk\r\n> pc: 80000000\r\n> pc: 10";
        let mut out = Vec::new();
        let count = annotate_pc_log(&log[..], &Remap::IDENTITY, &mut resolver(), &mut out).unwrap();

        assert_eq!(count, 2);
        let mut expected = b"\xfe junk\r\n".to_vec();
        expected.extend_from_slice(b"fw.elf:80000000 @ 80000000\n> pc: 80000000\r\n");
        expected.extend_from_slice(b"fw.elf:10 @ 10\n> pc: 10");
        assert_eq!(out, expected);
    }

    #[test]
    fn repeated_pcs_resolve_once() {
        let log = "> pc: 80000004\n> pc: 80000004\n> pc: 80000004\n";
        let mut resolver = resolver();
        annotate_pc_log(log.as_bytes(), &Remap::IDENTITY, &mut resolver, Vec::new()).unwrap();
        assert_eq!(resolver.stats().invocations, 1);
        assert_eq!(resolver.stats().hits, 2);
    }
}
