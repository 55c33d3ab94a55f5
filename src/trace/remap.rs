// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
use serde::Deserialize;

use crate::config::hex;

/// Folds a high alias window back onto the region it mirrors.
///
/// An address in `[alias_base, alias_base + alias_size)` becomes
/// `address - alias_base + canonical_base`; every other address is left
/// alone. Total over `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Remap {
    #[serde(deserialize_with = "hex::u64")]
    pub alias_base: u64,
    #[serde(deserialize_with = "hex::u64")]
    pub alias_size: u64,
    #[serde(deserialize_with = "hex::u64")]
    pub canonical_base: u64,
}

impl Remap {
    pub const IDENTITY: Remap = Remap {
        alias_base: 0,
        alias_size: 0,
        canonical_base: 0,
    };

    pub fn in_window(&self, address: u64) -> bool {
        address >= self.alias_base && address - self.alias_base < self.alias_size
    }

    pub fn apply(&self, address: u64) -> u64 {
        if self.in_window(address) {
            (address - self.alias_base).wrapping_add(self.canonical_base)
        } else {
            address
        }
    }
}

impl Default for Remap {
    fn default() -> Self {
        Remap {
            alias_base: 0x9ffc_a000,
            alias_size: 0x4_0000,
            canonical_base: 0x8002_9000,
        }
    }
}
