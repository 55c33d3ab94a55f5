// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
use chrono::prelude::*;
use itertools::Itertools;

use super::combinator_atoms::{digit, take_while};
use crate::vcd::types::{Timescale, Version};

/// `$date Mon Oct 16 13:33:00 2023 $end`
///
/// Simulators disagree about date formats, so a date that does not parse is
/// not an error. The caller keeps the raw text instead.
pub(super) fn parse_date(words: &[String]) -> Result<DateTime<Utc>, String> {
    let text = words.iter().join(" ");
    let naive = NaiveDateTime::parse_from_str(&text, "%a %b %e %T %Y")
        .map_err(|e| format!("Error near {}:{}. `{text}` is not a date: {e}", file!(), line!()))?;
    Ok(Utc.from_utc_datetime(&naive))
}

pub(super) fn parse_version(words: &[String]) -> Version {
    Version(words.iter().join(" "))
}

/// `$timescale 1ps $end` or `$timescale 1 ps $end`
pub(super) fn parse_timescale(words: &[String]) -> Result<(Option<u32>, Timescale), String> {
    let text = words.iter().join("");

    let res = take_while(&text, digit);
    let scalar = res.assert_match().map_err(|e| {
        format!("Error near {}:{}. {e} for a scalar in timescale `{text}`", file!(), line!())
    })?;
    let scalar = scalar
        .parse::<u32>()
        .map_err(|e| format!("Error near {}:{}. {e}", file!(), line!()))?;

    let unit = match res.residual {
        "fs" => Timescale::Fs,
        "ps" => Timescale::Ps,
        "ns" => Timescale::Ns,
        "us" => Timescale::Us,
        "ms" => Timescale::Ms,
        "s" => Timescale::S,
        "" => Timescale::Unit,
        unit => {
            return Err(format!(
                "Error near {}:{}. {unit} is not a valid unit of time",
                file!(),
                line!()
            ))
        }
    };

    Ok((Some(scalar), unit))
}
