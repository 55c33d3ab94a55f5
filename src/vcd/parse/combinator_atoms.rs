// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
use std::io::BufRead;

use super::types::ParseResult;
use crate::error::Error;
use crate::vcd::reader::{next_word, WordReader};

pub(super) fn digit(chr: u8) -> bool {
    chr.is_ascii_digit()
}

pub(super) fn take_while(word: &str, cond: fn(u8) -> bool) -> ParseResult<'_> {
    let new_start = word.bytes().take_while(|chr| cond(*chr)).count();

    ParseResult {
        matched: &word[0..new_start],
        residual: &word[new_start..],
    }
}

pub(super) fn tag<'a>(word: &'a str, pattern: &str) -> ParseResult<'a> {
    let new_start = word
        .bytes()
        .zip(pattern.bytes())
        .take_while(|(c_lhs, c_rhs)| c_lhs == c_rhs)
        .count();

    ParseResult {
        matched: &word[0..new_start],
        residual: &word[new_start..],
    }
}

/// Consume the next word, which must be `keyword`.
pub(super) fn ident<R: BufRead>(word_reader: &mut WordReader<R>, keyword: &str) -> Result<(), Error> {
    let (word, cursor) = next_word!(word_reader)?;

    if word == keyword {
        Ok(())
    } else {
        Err(Error::MalformedRecord {
            line: word,
            cursor,
            reason: format!(
                "Error near {}:{}. Expected keyword `{keyword}`.",
                file!(),
                line!()
            ),
        })
    }
}

/// Collect words up to the closing `$end`, which is consumed.
pub(super) fn words_until_end<R: BufRead>(word_reader: &mut WordReader<R>) -> Result<Vec<String>, Error> {
    let mut words = vec![];
    loop {
        let (word, _) = next_word!(word_reader)?;
        if word == "$end" {
            return Ok(words);
        }
        words.push(word);
    }
}
