// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.

//! classifies the lines of the trace body
use super::combinator_atoms::{digit, take_while};
use crate::error::Error;
use crate::vcd::Cursor;

#[derive(Debug, PartialEq, Eq)]
pub enum Record<'a> {
    /// `#<integer>`: closes the current cycle.
    Timestamp(u64),
    /// `b<bits> <id>` or `<bit><id>`.
    Change { bits: &'a str, id: &'a str },
    /// Anything else: commands, comments, real or string values.
    Other,
}

fn malformed(line: &str, cursor: Cursor, reason: String) -> Error {
    Error::MalformedRecord {
        line: line.to_string(),
        cursor,
        reason,
    }
}

pub fn parse_record(line: &str, cursor: Cursor) -> Result<Record<'_>, Error> {
    let trimmed = line.trim();
    let Some(first) = trimmed.bytes().next() else {
        return Ok(Record::Other);
    };

    match first {
        b'#' => {
            let res = take_while(&trimmed[1..], digit);
            if res.matched.is_empty() || !res.residual.is_empty() {
                let reason = format!("Error near {}:{}. Expected `#<integer>`.", file!(), line!());
                return Err(malformed(line, cursor, reason));
            }
            let time = res.matched.parse::<u64>().map_err(|e| {
                malformed(line, cursor, format!("Error near {}:{}. {e}", file!(), line!()))
            })?;
            Ok(Record::Timestamp(time))
        }

        // handle the case of an n bit signal: `b0101 !`
        b'b' | b'B' => {
            let mut words = trimmed[1..].split_ascii_whitespace();
            match (words.next(), words.next()) {
                (Some(bits), Some(id)) if !trimmed[1..].starts_with(char::is_whitespace) => {
                    Ok(Record::Change { bits, id })
                }
                _ => {
                    let reason = format!("Error near {}:{}. Expected `b<bits> <id>`.", file!(), line!());
                    Err(malformed(line, cursor, reason))
                }
            }
        }

        // handle the case of a one bit signal: `1!`
        b'0' | b'1' | b'x' | b'X' | b'z' | b'Z' | b'u' | b'U' => {
            let id = trimmed[1..].trim_start();
            if id.is_empty() || id.contains(char::is_whitespace) {
                let reason = format!("Error near {}:{}. Expected `<bit><id>`.", file!(), line!());
                return Err(malformed(line, cursor, reason));
            }
            Ok(Record::Change {
                bits: &trimmed[0..1],
                id,
            })
        }

        _ => Ok(Record::Other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcd::{Line, Word};

    const AT: Cursor = Cursor(Line(7), Word(1));

    #[test]
    fn timestamps() {
        assert_eq!(parse_record("#110", AT).unwrap(), Record::Timestamp(110));
        assert_eq!(parse_record("#0  ", AT).unwrap(), Record::Timestamp(0));
        for bad in ["#", "#12a", "#-3", "#99999999999999999999999"] {
            let err = parse_record(bad, AT).unwrap_err();
            assert!(matches!(err, Error::MalformedRecord { cursor: AT, .. }), "{bad}");
        }
    }

    #[test]
    fn vector_changes() {
        assert_eq!(
            parse_record("b1010 #Q", AT).unwrap(),
            Record::Change { bits: "1010", id: "#Q" }
        );
        // bit validity is checked when the value is applied
        assert_eq!(
            parse_record("bxx01 !", AT).unwrap(),
            Record::Change { bits: "xx01", id: "!" }
        );
        assert!(parse_record("b1010", AT).is_err());
        assert!(parse_record("b 1010 !", AT).is_err());
    }

    #[test]
    fn scalar_changes() {
        assert_eq!(parse_record("1(", AT).unwrap(), Record::Change { bits: "1", id: "(" });
        assert_eq!(parse_record("0ab", AT).unwrap(), Record::Change { bits: "0", id: "ab" });
        assert_eq!(parse_record("x!", AT).unwrap(), Record::Change { bits: "x", id: "!" });
        assert!(parse_record("1", AT).is_err());
    }

    #[test]
    fn everything_else_passes_through() {
        for other in ["", "$dumpvars", "$end", "r1.5 !", "sHELLO !", "$comment hi $end"] {
            assert_eq!(parse_record(other, AT).unwrap(), Record::Other, "{other}");
        }
    }
}
