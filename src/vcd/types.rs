// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
use std::borrow::Borrow;
use std::fmt;

use chrono::prelude::*;
use serde::Deserialize;

use crate::error::Error;

/// The short token a trace assigns to a signal in its `$var` declaration,
/// e.g. the `!` in `$var wire 1 ! clk $end`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalId(pub String);

impl Borrow<str> for SignalId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A declared signal. Immutable once the header has been scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSpec {
    pub name: String,
    // enclosing scopes, outermost first, not including `name`
    pub path: Vec<String>,
    pub num_bits: u32,
    pub id: SignalId,
}

impl SignalSpec {
    pub fn full_name(&self) -> String {
        self.path
            .iter()
            .map(String::as_str)
            .chain([self.name.as_str()])
            .collect::<Vec<&str>>()
            .join(".")
    }
}

/// How a configured signal is looked up among the declarations.
///
/// `name` matches either the bare signal name or its dotted scope path.
/// When `width` is set, declarations of any other width are skipped. `id`
/// pins a raw identifier token and bypasses the lookup altogether.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalQuery {
    pub name: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub id: Option<String>,
}

impl SignalQuery {
    pub fn named(name: &str, width: u32) -> SignalQuery {
        SignalQuery {
            name: name.to_string(),
            width: Some(width),
            id: None,
        }
    }

    fn matches(&self, spec: &SignalSpec) -> bool {
        let name_matches = spec.name == self.name || spec.full_name() == self.name;
        let width_matches = self.width.map_or(true, |width| width == spec.num_bits);
        name_matches && width_matches
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timescale {
    Fs,
    Ps,
    Ns,
    Us,
    Ms,
    S,
    Unit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub date: Option<DateTime<Utc>>,
    // kept when the date could not be parsed
    pub raw_date: Option<String>,
    pub version: Option<Version>,
    pub timescale: (Option<u32>, Timescale),
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            date: None,
            raw_date: None,
            version: None,
            timescale: (None, Timescale::Unit),
        }
    }
}

/// Everything learned from the declaration section of a trace.
#[derive(Debug, Clone, Default)]
pub struct Header {
    pub metadata: Metadata,
    pub declarations: Vec<SignalSpec>,
    // false when the stream ended before `$enddefinitions`
    pub complete: bool,
}

impl Header {
    /// Looks up a signal the run cannot do without.
    pub fn lookup(&self, query: &SignalQuery) -> Result<SignalSpec, Error> {
        if let Some(id) = &query.id {
            let declared = self.declarations.iter().find(|spec| spec.id.0 == *id);
            let num_bits = query
                .width
                .or(declared.map(|spec| spec.num_bits))
                .unwrap_or(u32::MAX);
            return Ok(SignalSpec {
                name: query.name.clone(),
                path: vec![],
                num_bits,
                id: SignalId(id.clone()),
            });
        }

        let mut candidates = self.declarations.iter().filter(|spec| query.matches(spec));
        let Some(spec) = candidates.next() else {
            return Err(Error::MissingSignal {
                name: query.name.clone(),
            });
        };

        let others: Vec<String> = candidates.map(SignalSpec::full_name).collect();
        if !others.is_empty() {
            tracing::debug!(
                "`{}` also declared as {others:?}, using {}",
                query.name,
                spec.full_name()
            );
        }

        tracing::debug!("`{}` is `{}` ({} bits)", spec.full_name(), spec.id, spec.num_bits);
        Ok(spec.clone())
    }
}
