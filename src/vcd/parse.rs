// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
use std::io::BufRead;

use super::reader::WordReader;
use super::types::Header;
use crate::error::Error;

mod combinator_atoms;
use combinator_atoms::{ident, tag, words_until_end};

mod types;

mod metadata;
use metadata::{parse_date, parse_timescale, parse_version};

mod scopes;
use scopes::{parse_scope, parse_var};

mod events;
pub use events::{parse_record, Record};

/// Scans the declaration section, up to and including
/// `$enddefinitions $end`.
///
/// Malformed declarations are logged and skipped. A stream that ends inside
/// the header is not an error here: the header comes back incomplete and the
/// signal lookups that follow decide whether that matters.
pub fn scan_header<R: BufRead>(word_reader: &mut WordReader<R>) -> Result<Header, Error> {
    let mut header = Header::default();
    let mut path: Vec<String> = vec![];

    while let Some((word, cursor)) = word_reader.next_word()? {
        let res = match word.as_str() {
            "$date" => words_until_end(word_reader).map(|words| match parse_date(&words) {
                Ok(date) => header.metadata.date = Some(date),
                Err(e) => {
                    tracing::debug!("{e}");
                    header.metadata.raw_date = Some(words.join(" "));
                }
            }),
            "$version" => words_until_end(word_reader)
                .map(|words| header.metadata.version = Some(parse_version(&words))),
            "$timescale" => words_until_end(word_reader).map(|words| match parse_timescale(&words) {
                Ok(timescale) => header.metadata.timescale = timescale,
                Err(e) => tracing::warn!("{e} at {cursor:?}"),
            }),
            "$scope" => parse_scope(word_reader, &mut path),
            "$upscope" => {
                path.pop();
                ident(word_reader, "$end")
            }
            "$var" => parse_var(word_reader, &path).map(|spec| {
                tracing::trace!("declared {} as `{}` ({} bits)", spec.full_name(), spec.id, spec.num_bits);
                header.declarations.push(spec);
            }),
            "$enddefinitions" => {
                if let Err(e) = ident(word_reader, "$end") {
                    tracing::warn!("{e}");
                }
                header.complete = true;
                break;
            }
            // $comment and anything else we don't care about
            other if !tag(other, "$").matched.is_empty() && other != "$end" => {
                words_until_end(word_reader).map(|_| ())
            }
            other => {
                tracing::debug!("ignoring stray `{other}` in declarations at {cursor:?}");
                Ok(())
            }
        };

        match res {
            Err(e) if e.is_recoverable() => tracing::warn!("{e}"),
            other => other?,
        }
    }

    if !header.complete {
        tracing::warn!("trace ended before `$enddefinitions`");
    }

    let metadata = &header.metadata;
    tracing::info!(
        "header: {} declarations, date {:?}, version {:?}, timescale {:?}",
        header.declarations.len(),
        metadata.date.map(|d| d.to_rfc2822()).or(metadata.raw_date.clone()),
        metadata.version.as_ref().map(|v| v.0.as_str()),
        metadata.timescale
    );

    Ok(header)
}
