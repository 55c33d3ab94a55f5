// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.

//! Turns the signal table at a cycle boundary into address events.
use num::Zero;
use serde::Deserialize;

use super::remap::Remap;
use super::{AddressEvent, EventKind, WriteData};
use crate::config::{hex, PcProbeConfig, WriteProbeConfig};
use crate::error::Error;
use crate::vcd::{Header, SignalSpec, SignalTable};

/// Something that samples the signal table once per cycle.
pub trait EventSource {
    /// Short name for log messages.
    fn name(&self) -> &'static str;

    /// Signals whose values [`EventSource::sample`] reads.
    fn signals(&self) -> Vec<&SignalSpec>;

    /// Events for the cycle closed at `time`. Must depend on nothing but
    /// `time` and the table.
    fn sample(&self, time: u64, table: &SignalTable) -> Vec<AddressEvent>;
}

/// One row of a selection table: when the selector reads `selector`, sample
/// these views (by index).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Selection {
    #[serde(deserialize_with = "hex::u64")]
    pub selector: u64,
    pub views: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTable {
    entries: Vec<Selection>,
    default_views: Vec<usize>,
}

impl SelectionTable {
    pub fn new(entries: Vec<Selection>, default_views: Vec<usize>) -> SelectionTable {
        SelectionTable {
            entries,
            default_views,
        }
    }

    pub fn views_for(&self, selector: u64) -> &[usize] {
        self.entries
            .iter()
            .find(|entry| entry.selector == selector)
            .map_or(&self.default_views, |entry| &entry.views)
    }

    fn max_view(&self) -> Option<usize> {
        self.entries
            .iter()
            .flat_map(|entry| entry.views.iter())
            .chain(self.default_views.iter())
            .copied()
            .max()
    }
}

/// Picks the committed address among several competing views.
#[derive(Debug, Clone)]
pub struct ViewMux {
    selector: SignalSpec,
    views: Vec<SignalSpec>,
    selection: SelectionTable,
    remap: Remap,
}

impl ViewMux {
    pub fn new(
        selector: SignalSpec,
        views: Vec<SignalSpec>,
        selection: SelectionTable,
        remap: Remap,
    ) -> Result<ViewMux, Error> {
        if let Some(max_view) = selection.max_view() {
            if max_view >= views.len() {
                return Err(Error::Config(format!(
                    "selection refers to view {max_view} but only {} views exist",
                    views.len()
                )));
            }
        }
        Ok(ViewMux {
            selector,
            views,
            selection,
            remap,
        })
    }

    /// Resolves the configured signals against the trace declarations.
    pub fn bind(config: &PcProbeConfig, remap: Remap, header: &Header) -> Result<ViewMux, Error> {
        let selector = header.lookup(&config.selector)?;
        let views = config
            .views
            .iter()
            .map(|query| header.lookup(query))
            .collect::<Result<Vec<SignalSpec>, Error>>()?;
        let selection = SelectionTable::new(config.selection.clone(), config.default_views.clone());
        ViewMux::new(selector, views, selection, remap)
    }
}

impl EventSource for ViewMux {
    fn name(&self) -> &'static str {
        "pc"
    }

    fn signals(&self) -> Vec<&SignalSpec> {
        std::iter::once(&self.selector).chain(self.views.iter()).collect()
    }

    fn sample(&self, time: u64, table: &SignalTable) -> Vec<AddressEvent> {
        let selector = table.u64_of(&self.selector);
        self.selection
            .views_for(selector)
            .iter()
            .map(|view| AddressEvent {
                address: self.remap.apply(table.u64_of(&self.views[*view])),
                time,
                kind: EventKind::ProgramCounter,
            })
            .collect()
    }
}

/// Watches a store port. The port is only meaningful every `modulus`-th
/// time unit; in between it holds stale values.
#[derive(Debug, Clone)]
pub struct StoreProbe {
    valid: SignalSpec,
    address: SignalSpec,
    data: SignalSpec,
    mask: SignalSpec,
    modulus: u64,
    remap: Remap,
}

impl StoreProbe {
    pub fn bind(config: &WriteProbeConfig, remap: Remap, header: &Header) -> Result<StoreProbe, Error> {
        if config.modulus == 0 {
            return Err(Error::Config("writes.modulus must be at least 1".to_string()));
        }
        Ok(StoreProbe {
            valid: header.lookup(&config.valid)?,
            address: header.lookup(&config.address)?,
            data: header.lookup(&config.data)?,
            mask: header.lookup(&config.mask)?,
            modulus: config.modulus,
            remap,
        })
    }
}

impl EventSource for StoreProbe {
    fn name(&self) -> &'static str {
        "writes"
    }

    fn signals(&self) -> Vec<&SignalSpec> {
        vec![&self.valid, &self.address, &self.data, &self.mask]
    }

    fn sample(&self, time: u64, table: &SignalTable) -> Vec<AddressEvent> {
        if time % self.modulus != 0 || table.value_of(&self.valid).is_zero() {
            return vec![];
        }

        vec![AddressEvent {
            address: self.remap.apply(table.u64_of(&self.address)),
            time,
            kind: EventKind::MemoryWrite(WriteData {
                data: table.value_of(&self.data),
                mask: table.value_of(&self.mask),
            }),
        }]
    }
}
