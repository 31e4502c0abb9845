/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Label: containers of one kind, filled side by side and looked up by
//! string key.
//!
//! Every datum goes to every labeled container; the labels only make a
//! family of related plots (several histograms of one kind, say) travel
//! together.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Map;
use serde_json::Value;

use crate::container::check_uniform;
use crate::container::decode_declared;
use crate::container::Aggregator;
use crate::container::Container;
use crate::container::Factory;
use crate::container::Kind;
use crate::error::check_entries;
use crate::error::ContainerError;
use crate::json;
use crate::json::exact;
use crate::json::Fields;

const KIND: &str = "Label";

/// Factory for [`Labeled`] and [`Labeling`].
pub struct Label;

impl Label {
    /// Fails if `pairs` is empty or mixes kinds.
    pub fn ed<V, I>(entries: f64, pairs: I) -> Result<Labeled<V>, ContainerError>
    where
        V: Container,
        I: IntoIterator<Item = (String, V)>,
    {
        let pairs: BTreeMap<String, V> = pairs.into_iter().collect();
        check_uniform(KIND, pairs.values())?;
        Ok(Labeled {
            entries: check_entries(entries)?,
            pairs,
        })
    }

    /// Zeroed copies of every value, under its label.
    pub fn ing<V, I>(pairs: I) -> Result<Labeling<V>, ContainerError>
    where
        V: Container,
        I: IntoIterator<Item = (String, V)>,
    {
        let stats = Label::ed(0.0, pairs)?;
        Ok(Labeling {
            stats: stats.zero(),
        })
    }
}

/// Closure-free label.
#[derive(Clone, Debug)]
pub struct Labeled<V> {
    entries: f64,
    pairs: BTreeMap<String, V>,
}

impl<V> Labeled<V> {
    pub fn get(&self, label: &str) -> Option<&V> {
        self.pairs.get(label)
    }

    /// Labels in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.keys().map(String::as_str)
    }

    /// Values in label order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.pairs.values()
    }

    pub fn size(&self) -> usize {
        self.pairs.len()
    }
}

impl<V: PartialEq> PartialEq for Labeled<V> {
    fn eq(&self, other: &Self) -> bool {
        exact(self.entries, other.entries) && self.pairs == other.pairs
    }
}

impl<V: Container> Container for Labeled<V> {
    fn kind_name(&self) -> &'static str {
        KIND
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn zero(&self) -> Self {
        Labeled {
            entries: 0.0,
            pairs: self
                .pairs
                .iter()
                .map(|(label, v)| (label.clone(), v.zero()))
                .collect(),
        }
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        if !self.pairs.keys().eq(other.pairs.keys()) {
            return Err(ContainerError::shape(KIND, "label sets differ"));
        }
        let pairs = self
            .pairs
            .iter()
            .zip(other.pairs.values())
            .map(|((label, x), y)| Ok((label.clone(), x.combine(y)?)))
            .collect::<Result<_, ContainerError>>()?;
        Ok(Labeled {
            entries: self.entries + other.entries,
            pairs,
        })
    }

    fn encode_fragment(&self) -> Value {
        let data: Map<String, Value> = self
            .pairs
            .iter()
            .map(|(label, v)| (label.clone(), v.encode_fragment()))
            .collect();
        let mut map = Map::new();
        map.insert("entries".into(), json::float_to_json(self.entries));
        if let Some(first) = self.pairs.values().next() {
            map.insert("type".into(), Value::String(first.kind_name().into()));
        }
        map.insert("data".into(), Value::Object(data));
        Value::Object(map)
    }
}

impl<V: Factory> Kind for Labeled<V> {
    const NAME: &'static str = KIND;

    fn decode_fragment(fragment: &Value) -> Result<Self, ContainerError> {
        let fields = Fields::parse(fragment, KIND, &["entries", "type", "data"], &[])?;
        let kind = fields.str("type")?;
        let data = fields.value("data")?;
        let Value::Object(data) = data else {
            return Err(ContainerError::malformed("Label.data", data));
        };
        let pairs = data
            .iter()
            .map(|(label, v)| Ok((label.clone(), decode_declared::<V>(kind, v)?)))
            .collect::<Result<Vec<_>, ContainerError>>()?;
        Label::ed(fields.float("entries")?, pairs)
    }
}

/// Accumulating label.
pub struct Labeling<V> {
    stats: Labeled<V>,
}

impl<V> Labeling<V> {
    pub fn get(&self, label: &str) -> Option<&V> {
        self.stats.get(label)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.stats.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.stats.values()
    }

    pub fn size(&self) -> usize {
        self.stats.size()
    }
}

impl<V: Clone> Clone for Labeling<V> {
    fn clone(&self) -> Self {
        Self {
            stats: self.stats.clone(),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Labeling<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Labeling")
            .field("stats", &self.stats)
            .finish()
    }
}

impl<V: PartialEq> PartialEq for Labeling<V> {
    fn eq(&self, other: &Self) -> bool {
        self.stats == other.stats
    }
}

impl<V: Container> Container for Labeling<V> {
    fn kind_name(&self) -> &'static str {
        KIND
    }

    fn entries(&self) -> f64 {
        self.stats.entries
    }

    fn zero(&self) -> Self {
        Self {
            stats: self.stats.zero(),
        }
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        Ok(Self {
            stats: self.stats.combine(&other.stats)?,
        })
    }

    fn encode_fragment(&self) -> Value {
        self.stats.encode_fragment()
    }
}

impl<D: ?Sized, V: Aggregator<D> + Clone> Aggregator<D> for Labeling<V> {
    type Snapshot = Labeled<V::Snapshot>;

    fn fill(&mut self, datum: &D, weight: f64) -> Result<(), ContainerError> {
        if weight.is_nan() || weight <= 0.0 {
            return Ok(());
        }
        // Filled on a copy so that one failing value leaves them all alone.
        let mut pairs = self.stats.pairs.clone();
        for v in pairs.values_mut() {
            v.fill(datum, weight)?;
        }
        self.stats.pairs = pairs;
        self.stats.entries += weight;
        Ok(())
    }

    fn snapshot(&self) -> Self::Snapshot {
        Labeled {
            entries: self.stats.entries,
            pairs: self
                .stats
                .pairs
                .iter()
                .map(|(label, v)| (label.clone(), v.snapshot()))
                .collect(),
        }
    }
}
