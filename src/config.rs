// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.

//! Run configuration, read from an optional TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! reference setup: a rocket-chip core booting OpenSBI and U-Boot, with the
//! U-Boot relocation window folded back onto its link address.
//!
//! ```toml
//! dedup = "per-address-last"
//!
//! [remap]
//! alias_base = "0x9ffca000"
//! alias_size = "0x40000"
//! canonical_base = "0x80029000"
//!
//! [[images]]
//! upper_bound = "0x80020000"
//! path = "fw_payload.elf"
//!
//! [[images]]
//! path = "u-boot"
//! ```
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;
use crate::trace::{DedupStrategy, Remap, Selection};
use crate::vcd::SignalQuery;

/// Integers that may also be written as `"0x..."` strings, since TOML has no
/// unsigned 64-bit integers and addresses read better in hex.
pub mod hex {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(u64),
        Text(String),
    }

    pub fn parse(text: &str) -> Result<u64, String> {
        let cleaned = text.trim().replace('_', "");
        let parsed = match cleaned.strip_prefix("0x").or(cleaned.strip_prefix("0X")) {
            Some(digits) => u64::from_str_radix(digits, 16),
            None => cleaned.parse::<u64>(),
        };
        parsed.map_err(|e| format!("`{text}` is not a number: {e}"))
    }

    impl Number {
        fn value<E: serde::de::Error>(self) -> Result<u64, E> {
            match self {
                Number::Int(n) => Ok(n),
                Number::Text(text) => parse(&text).map_err(E::custom),
            }
        }
    }

    pub fn u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Number::deserialize(deserializer)?.value()
    }

    pub fn opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        Option::<Number>::deserialize(deserializer)?
            .map(Number::value)
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PcProbeConfig {
    pub selector: SignalQuery,
    pub views: Vec<SignalQuery>,
    pub selection: Vec<Selection>,
    // views sampled when no `selection` entry matches the selector
    pub default_views: Vec<usize>,
}

impl Default for PcProbeConfig {
    fn default() -> Self {
        PcProbeConfig {
            selector: SignalQuery::named("inflights_reader_accept", 2),
            views: vec![
                SignalQuery::named("inflights_reader_view_0_addr", 64),
                SignalQuery::named("inflights_reader_view_1_addr", 64),
            ],
            selection: vec![
                Selection {
                    selector: 0,
                    views: vec![],
                },
                Selection {
                    selector: 1,
                    views: vec![0],
                },
            ],
            default_views: vec![1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriteProbeConfig {
    pub valid: SignalQuery,
    pub address: SignalQuery,
    pub data: SignalQuery,
    pub mask: SignalQuery,
    #[serde(deserialize_with = "hex::u64")]
    pub modulus: u64,
}

impl Default for WriteProbeConfig {
    fn default() -> Self {
        WriteProbeConfig {
            valid: SignalQuery::named("io_storeValid", 1),
            address: SignalQuery::named("io_storeAddr", 64),
            data: SignalQuery::named("io_storeData", 64),
            mask: SignalQuery::named("io_storeMask", 8),
            modulus: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    // addresses below this go to `path`, `None` catches everything left
    #[serde(default, deserialize_with = "hex::opt_u64")]
    pub upper_bound: Option<u64>,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    pub command: String,
    // pass `-f` so the output names the function as well as the location
    pub functions: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            command: "riscv64-unknown-elf-addr2line".to_string(),
            functions: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeekConfig {
    #[serde(deserialize_with = "hex::opt_u64")]
    pub offset: Option<u64>,
    // defaults to the pc selector
    pub anchor: Option<SignalQuery>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub pc: PcProbeConfig,
    pub writes: WriteProbeConfig,
    pub remap: Remap,
    pub images: Vec<ImageConfig>,
    pub resolver: ResolverConfig,
    pub dedup: DedupStrategy,
    pub seek: SeekConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pc: PcProbeConfig::default(),
            writes: WriteProbeConfig::default(),
            remap: Remap::default(),
            images: vec![
                ImageConfig {
                    upper_bound: Some(0x8002_0000),
                    path: PathBuf::from(
                        "~/opensbi/build/platform/rocket-chip-vcu128/firmware/fw_payload.elf",
                    ),
                },
                ImageConfig {
                    upper_bound: None,
                    path: PathBuf::from("~/u-boot/u-boot"),
                },
            ],
            resolver: ResolverConfig::default(),
            dedup: DedupStrategy::default(),
            seek: SeekConfig::default(),
        }
    }
}

impl Config {
    /// Reads `path` if given, otherwise starts from the defaults. The result
    /// is validated either way.
    pub fn load(path: Option<&Path>) -> Result<Config, Error> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                Config::from_toml(&text)?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Config, Error> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), Error> {
        let Some(last) = self.images.last() else {
            return Err(Error::Config("at least one image is required".to_string()));
        };
        if last.upper_bound.is_some() {
            return Err(Error::Config(format!(
                "the last image ({}) must not have an upper_bound so it catches every \
                 remaining address",
                last.path.display()
            )));
        }

        let bounds: Vec<u64> = self.images.iter().filter_map(|image| image.upper_bound).collect();
        if bounds.len() != self.images.len() - 1 {
            return Err(Error::Config(
                "only the last image may omit its upper_bound".to_string(),
            ));
        }
        if bounds.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(Error::Config(format!(
                "image upper bounds must be strictly increasing, got {bounds:x?}"
            )));
        }

        if self.writes.modulus == 0 {
            return Err(Error::Config("writes.modulus must be at least 1".to_string()));
        }

        let views = self.pc.views.len();
        if views == 0 {
            return Err(Error::Config("pc.views must name at least one signal".to_string()));
        }
        let referenced = self
            .pc
            .selection
            .iter()
            .flat_map(|selection| selection.views.iter())
            .chain(self.pc.default_views.iter());
        for view in referenced {
            if *view >= views {
                return Err(Error::Config(format!(
                    "view index {view} is out of range, pc.views has {views} entries"
                )));
            }
        }

        if self.resolver.command.trim().is_empty() {
            return Err(Error::Config("resolver.command is empty".to_string()));
        }

        Ok(())
    }

    pub fn seek_anchor(&self) -> &SignalQuery {
        self.seek.anchor.as_ref().unwrap_or(&self.pc.selector)
    }
}
