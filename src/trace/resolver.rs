// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.

//! Address to source line resolution.
//!
//! The lookup itself is left to an external tool (`addr2line` from a RISC-V
//! toolchain) behind [`SymbolLookup`]. [`SymbolResolver`] decides which image
//! an address belongs to and makes sure every address is looked up at most
//! once per run.
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{ImageConfig, ResolverConfig};
use crate::error::Error;

/// Text used for an address that could not be resolved.
pub const PLACEHOLDER: &str = "??";

pub trait SymbolLookup {
    /// Describe `address` as found in `image`, e.g. `main\nmain.c:12`.
    fn lookup(&mut self, image: &Path, address: u64) -> Result<String, Error>;
}

/// [`SymbolLookup`] adapter for an [`FnMut`]
#[derive(Copy, Clone, Debug)]
pub struct Func<F> {
    func: F,
}

impl<F: FnMut(&Path, u64) -> Result<String, Error>> SymbolLookup for Func<F> {
    fn lookup(&mut self, image: &Path, address: u64) -> Result<String, Error> {
        (self.func)(image, address)
    }
}

/// Create a [`Func`] [`SymbolLookup`] from an [`FnMut`]
pub fn from_fn<F: FnMut(&Path, u64) -> Result<String, Error>>(func: F) -> Func<F> {
    Func { func }
}

/// Runs `addr2line -e <image> 0x<address>`, once per call.
#[derive(Debug, Clone)]
pub struct Addr2Line {
    command: String,
    functions: bool,
}

impl Addr2Line {
    pub fn new(command: &str, functions: bool) -> Addr2Line {
        Addr2Line {
            command: command.to_string(),
            functions,
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Addr2Line {
        Addr2Line::new(&config.command, config.functions)
    }

    /// Same tool, location only.
    pub fn without_functions(self) -> Addr2Line {
        Addr2Line {
            functions: false,
            ..self
        }
    }
}

/// With `-f` addr2line prints the function on one line and the location on
/// the next. Both are kept.
fn parse_output(stdout: &str, functions: bool) -> Option<String> {
    let mut lines = stdout.lines().map(str::trim).filter(|line| !line.is_empty());
    let first = lines.next()?;
    match (functions, lines.next()) {
        (true, Some(location)) => Some(format!("{first}\n{location}")),
        _ => Some(first.to_string()),
    }
}

impl SymbolLookup for Addr2Line {
    fn lookup(&mut self, image: &Path, address: u64) -> Result<String, Error> {
        let failed = |reason: String| Error::Resolution {
            address,
            image: image.display().to_string(),
            reason,
        };

        let mut command = Command::new(&self.command);
        if self.functions {
            command.arg("-f");
        }
        command.arg("-e").arg(image).arg(format!("0x{address:x}"));
        tracing::debug!("running {command:?}");

        let output = command
            .output()
            .map_err(|e| failed(format!("cannot run `{}`: {e}", self.command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!(
                "`{}` exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        parse_output(&String::from_utf8_lossy(&output.stdout), self.functions)
            .ok_or_else(|| failed(format!("`{}` printed nothing", self.command)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    // `None` catches every address
    pub upper_bound: Option<u64>,
    pub path: PathBuf,
}

/// Ordered address ranges: the first image whose `upper_bound` lies above
/// the address wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTable {
    images: Vec<Image>,
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

impl ImageTable {
    pub fn new(images: Vec<Image>) -> ImageTable {
        ImageTable { images }
    }

    /// Builds the table from configuration, expanding a leading `~/`.
    pub fn from_config(images: &[ImageConfig]) -> ImageTable {
        let images = images
            .iter()
            .map(|image| Image {
                upper_bound: image.upper_bound,
                path: expand_home(&image.path),
            })
            .collect();
        ImageTable::new(images)
    }

    pub fn select(&self, address: u64) -> Option<&Path> {
        self.images
            .iter()
            .find(|image| image.upper_bound.map_or(true, |bound| address < bound))
            .map(|image| image.path.as_path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSymbol {
    pub address: u64,
    // the placeholder when the lookup failed
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invocations: usize,
    pub failures: usize,
}

/// Resolves addresses through a [`SymbolLookup`], remembering every answer
/// for the rest of the run.
///
/// Failed lookups are remembered too, as the placeholder, so a broken
/// toolchain costs one failed invocation per address rather than one per
/// event.
pub struct SymbolResolver<L> {
    images: ImageTable,
    lookup: L,
    cache: HashMap<u64, ResolvedSymbol>,
    stats: CacheStats,
}

impl<L: SymbolLookup> SymbolResolver<L> {
    pub fn new(images: ImageTable, lookup: L) -> SymbolResolver<L> {
        SymbolResolver {
            images,
            lookup,
            cache: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn resolve(&mut self, address: u64) -> &ResolvedSymbol {
        match self.cache.entry(address) {
            Entry::Occupied(entry) => {
                self.stats.hits += 1;
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                self.stats.misses += 1;
                tracing::debug!("cache miss for 0x{address:x}");

                let result = match self.images.select(address) {
                    Some(image) => {
                        self.stats.invocations += 1;
                        self.lookup.lookup(image, address)
                    }
                    None => Err(Error::Resolution {
                        address,
                        image: String::new(),
                        reason: "no image covers this address".to_string(),
                    }),
                };

                let symbol = match result {
                    Ok(text) => ResolvedSymbol { address, text },
                    Err(e) => {
                        self.stats.failures += 1;
                        tracing::warn!("{e}");
                        ResolvedSymbol {
                            address,
                            text: PLACEHOLDER.to_string(),
                        }
                    }
                };
                entry.insert(symbol)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
