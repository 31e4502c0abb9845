/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Cut: a nested container that only sees data passing a selection.
//!
//! `entries` counts every fill attempt with a positive weight; the nested
//! value counts only the ones that passed, so their ratio is the
//! selection efficiency.

use std::fmt;

use serde_json::Map;
use serde_json::Value;

use crate::container::combine_names;
use crate::container::decode_declared;
use crate::container::Aggregator;
use crate::container::Container;
use crate::container::Factory;
use crate::container::Kind;
use crate::error::check_entries;
use crate::error::ContainerError;
use crate::function::Selection;
use crate::json;
use crate::json::exact;
use crate::json::Fields;

const KIND: &str = "Cut";

/// Factory for [`Cutted`] and [`Cutting`].
pub struct Cut;

impl Cut {
    pub fn ed<V: Container>(entries: f64, value: V) -> Result<Cutted<V>, ContainerError> {
        Ok(Cutted {
            entries: check_entries(entries)?,
            value,
            name: None,
        })
    }

    /// Gate `value` (zeroed) behind `selection`.
    pub fn ing<D, V>(selection: Selection<D>, value: V) -> Cutting<D, V>
    where
        D: ?Sized,
        V: Aggregator<D>,
    {
        Cutting {
            stats: Cutted {
                entries: 0.0,
                value: value.zero(),
                name: selection.name().map(String::from),
            },
            selection,
        }
    }
}

/// Closure-free cut.
#[derive(Clone, Debug)]
pub struct Cutted<V> {
    entries: f64,
    value: V,
    name: Option<String>,
}

impl<V> Cutted<V> {
    /// The container that received the passing data.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Label the selection.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

impl<V: Container> Cutted<V> {
    /// The weighted fraction of entries that passed, or `None` before
    /// anything was filled.
    pub fn fraction_passing(&self) -> Option<f64> {
        if self.entries == 0.0 {
            None
        } else {
            Some(self.value.entries() / self.entries)
        }
    }
}

impl<V: PartialEq> PartialEq for Cutted<V> {
    fn eq(&self, other: &Self) -> bool {
        exact(self.entries, other.entries) && self.value == other.value && self.name == other.name
    }
}

impl<V: Container> Container for Cutted<V> {
    fn kind_name(&self) -> &'static str {
        KIND
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn zero(&self) -> Self {
        Cutted {
            entries: 0.0,
            value: self.value.zero(),
            name: self.name.clone(),
        }
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        Ok(Cutted {
            entries: self.entries + other.entries,
            value: self.value.combine(&other.value)?,
            name: combine_names(KIND, &self.name, &other.name)?,
        })
    }

    fn encode_fragment(&self) -> Value {
        let mut map = Map::new();
        map.insert("entries".into(), json::float_to_json(self.entries));
        map.insert("type".into(), Value::String(self.value.kind_name().into()));
        map.insert("data".into(), self.value.encode_fragment());
        json::maybe_add(Value::Object(map), "name", self.name())
    }
}

impl<V: Factory> Kind for Cutted<V> {
    const NAME: &'static str = KIND;

    fn decode_fragment(fragment: &Value) -> Result<Self, ContainerError> {
        let fields = Fields::parse(fragment, KIND, &["entries", "type", "data"], &["name"])?;
        let cutted = Cut::ed(
            fields.float("entries")?,
            decode_declared::<V>(fields.str("type")?, fields.value("data")?)?,
        )?;
        Ok(match fields.optional_str("name")? {
            Some(name) => cutted.named(name),
            None => cutted,
        })
    }
}

/// Accumulating cut.
pub struct Cutting<D: ?Sized, V> {
    selection: Selection<D>,
    stats: Cutted<V>,
}

impl<D: ?Sized, V: Aggregator<D>> Cutting<D, V> {
    /// Rebuild an accumulator around an existing sub-accumulator.
    pub fn from_parts(
        selection: Selection<D>,
        entries: f64,
        value: V,
    ) -> Result<Self, ContainerError> {
        let mut stats = Cut::ed(entries, value)?;
        stats.name = selection.name().map(String::from);
        Ok(Self { selection, stats })
    }

    pub fn value(&self) -> &V {
        &self.stats.value
    }

    pub fn selection(&self) -> &Selection<D> {
        &self.selection
    }

    pub fn fraction_passing(&self) -> Option<f64> {
        self.stats.fraction_passing()
    }
}

impl<D: ?Sized, V: Clone> Clone for Cutting<D, V> {
    fn clone(&self) -> Self {
        Self {
            selection: self.selection.clone(),
            stats: self.stats.clone(),
        }
    }
}

impl<D: ?Sized, V: fmt::Debug> fmt::Debug for Cutting<D, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cutting")
            .field("selection", &self.selection)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<D: ?Sized, V: PartialEq> PartialEq for Cutting<D, V> {
    fn eq(&self, other: &Self) -> bool {
        self.stats == other.stats
    }
}

impl<D: ?Sized, V: Aggregator<D>> PartialEq<Cutted<V::Snapshot>> for Cutting<D, V> {
    fn eq(&self, other: &Cutted<V::Snapshot>) -> bool {
        self.snapshot() == *other
    }
}

impl<D: ?Sized, V: Aggregator<D>> Container for Cutting<D, V> {
    fn kind_name(&self) -> &'static str {
        KIND
    }

    fn entries(&self) -> f64 {
        self.stats.entries
    }

    fn name(&self) -> Option<&str> {
        self.stats.name()
    }

    fn zero(&self) -> Self {
        Self {
            selection: self.selection.clone(),
            stats: self.stats.zero(),
        }
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        Ok(Self {
            selection: self.selection.clone(),
            stats: self.stats.combine(&other.stats)?,
        })
    }

    fn encode_fragment(&self) -> Value {
        self.stats.encode_fragment()
    }
}

impl<D: ?Sized, V: Aggregator<D>> Aggregator<D> for Cutting<D, V> {
    type Snapshot = Cutted<V::Snapshot>;

    fn fill(&mut self, datum: &D, weight: f64) -> Result<(), ContainerError> {
        // Not an attempt at all; `entries` never decreases.
        if weight.is_nan() || weight <= 0.0 {
            return Ok(());
        }
        let w = weight * self.selection.call(datum)?;
        if w > 0.0 {
            self.stats.value.fill(datum, w)?;
        }
        // Every attempt counts, passing or not.
        self.stats.entries += weight;
        Ok(())
    }

    fn snapshot(&self) -> Self::Snapshot {
        Cutted {
            entries: self.stats.entries,
            value: self.stats.value.snapshot(),
            name: self.stats.name.clone(),
        }
    }
}
