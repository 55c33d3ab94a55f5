// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
use std::collections::HashMap;

use num::{BigUint, Zero};

use super::types::{SignalId, SignalSpec};
use super::utilities::{binary_str_to_biguint, low_u64, BinaryParserErrTypes};

#[derive(Debug)]
struct Entry {
    num_bits: u32,
    value: BigUint,
}

/// What became of a value change handed to [`SignalTable::apply`].
#[derive(Debug, PartialEq, Eq)]
pub enum Applied {
    Updated,
    // the id belongs to a signal nobody asked for
    Untracked,
    // `x`/`z`/`u`: the last known value stands
    NonNumeric,
}

/// Last known value of every tracked signal, keyed by identifier token.
///
/// Traces only record changes, so an entry keeps its value until a later
/// change overwrites it. Entries start out as zero. Several declarations may
/// share one token, in which case they share one entry.
#[derive(Debug, Default)]
pub struct SignalTable {
    values: HashMap<SignalId, Entry>,
}

impl SignalTable {
    pub fn new() -> SignalTable {
        SignalTable::default()
    }

    pub fn track(&mut self, spec: &SignalSpec) {
        self.values
            .entry(spec.id.clone())
            .and_modify(|entry| entry.num_bits = entry.num_bits.max(spec.num_bits))
            .or_insert(Entry {
                num_bits: spec.num_bits,
                value: BigUint::zero(),
            });
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Applies one value change. `bits` is most-significant bit first and
    /// may be shorter than the declared width, but never longer.
    pub fn apply(&mut self, id: &str, bits: &str) -> Result<Applied, String> {
        let Some(entry) = self.values.get_mut(id) else {
            return Ok(Applied::Untracked);
        };

        let observed_num_bits = bits.len();
        if observed_num_bits > entry.num_bits as usize {
            return Err(format!(
                "Error near {}:{}. {observed_num_bits} bits do not fit signal `{id}` \
                 declared with {} bits.",
                file!(),
                line!(),
                entry.num_bits
            ));
        }

        match binary_str_to_biguint(bits) {
            Ok(value) => {
                entry.value = value;
                Ok(Applied::Updated)
            }
            Err(e) if e.is_non_numeric() => Ok(Applied::NonNumeric),
            Err(BinaryParserErrTypes::OtherValue(chr)) => Err(format!(
                "Error near {}:{}. `{chr}` is not a binary digit.",
                file!(),
                line!()
            )),
            Err(e) => Err(format!("Error near {}:{}. {e:?}", file!(), line!())),
        }
    }

    pub fn value(&self, id: &SignalId) -> Option<&BigUint> {
        self.values.get(id).map(|entry| &entry.value)
    }

    /// The value of a tracked signal, or zero if it is not tracked.
    pub fn value_of(&self, spec: &SignalSpec) -> BigUint {
        self.value(&spec.id).cloned().unwrap_or_default()
    }

    pub fn u64_of(&self, spec: &SignalSpec) -> u64 {
        self.value(&spec.id).map(low_u64).unwrap_or(0)
    }
}
