// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.

//! part of the header scanner that walks `$scope`/`$upscope` nesting and
//! records `$var` declarations
use std::io::BufRead;

use super::combinator_atoms::words_until_end;
use crate::error::Error;
use crate::vcd::reader::{next_word, WordReader};
use crate::vcd::types::{SignalId, SignalSpec};

const VAR_TYPES: [&str; 29] = [
    "event",
    "integer",
    "parameter",
    "real",
    "realtime",
    "reg",
    "string",
    "supply0",
    "supply1",
    "time",
    "tri",
    "triand",
    "trior",
    "trireg",
    "tri0",
    "tri1",
    "wand",
    "wire",
    "wor",
    "int",
    "int_s",
    "shortint",
    "int_l",
    "longint",
    "char",
    "byte",
    "logic",
    "bit",
    "shortreal",
];

const SCOPE_KINDS: [&str; 9] = [
    "module",
    "begin",
    "task",
    "function",
    "fork",
    "interface",
    "package",
    "program",
    "struct",
];

/// `$scope module reg_mag_i $end`, with `$scope` already consumed.
pub(super) fn parse_scope<R: BufRead>(
    word_reader: &mut WordReader<R>,
    path: &mut Vec<String>,
) -> Result<(), Error> {
    // $scope module reg_mag_i $end
    //        ^^^^^^ - scope kind
    let (kind, cursor) = next_word!(word_reader)?;
    if !SCOPE_KINDS.contains(&kind.as_str()) {
        tracing::debug!("unusual scope kind `{kind}` at {cursor:?}");
    }

    // Some simulators emit scopes without names. We still push something so
    // the matching `$upscope` pops the right level.
    let name = words_until_end(word_reader)?;
    path.push(name.first().cloned().unwrap_or_default());
    Ok(())
}

/// `$var wire 64 ! io_storeAddr [63:0] $end`, with `$var` already consumed.
pub(super) fn parse_var<R: BufRead>(
    word_reader: &mut WordReader<R>,
    path: &[String],
) -> Result<SignalSpec, Error> {
    // $var wire 64 ! io_storeAddr [63:0] $end
    //      ^^^^ - var_type
    let (var_type, cursor) = next_word!(word_reader)?;
    if !VAR_TYPES.contains(&var_type.as_str()) {
        return Err(Error::MalformedRecord {
            line: var_type,
            cursor,
            reason: format!(
                "Error near {}:{}. Expected one of {VAR_TYPES:?}.",
                file!(),
                line!()
            ),
        });
    }

    // $var wire 64 ! io_storeAddr [63:0] $end
    //           ^^ - num_bits
    let (word, cursor) = next_word!(word_reader)?;
    let num_bits = word.parse::<u32>().map_err(|e| Error::MalformedRecord {
        line: word.clone(),
        cursor,
        reason: format!("Error near {}:{}. Bad bit width: {e}.", file!(), line!()),
    })?;

    // $var wire 64 ! io_storeAddr [63:0] $end
    //              ^ - signal id
    let (id, _) = next_word!(word_reader)?;

    // $var wire 64 ! io_storeAddr [63:0] $end
    //                ^^^^^^^^^^^^ - name, anything after it is ignored
    let rest = words_until_end(word_reader)?;
    let Some(name) = rest.first() else {
        return Err(Error::MalformedRecord {
            line: id,
            cursor,
            reason: format!("Error near {}:{}. Declaration has no name.", file!(), line!()),
        });
    };

    Ok(SignalSpec {
        name: name.clone(),
        path: path.to_vec(),
        num_bits,
        id: SignalId(id),
    })
}
