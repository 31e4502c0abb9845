/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Index: containers of one kind, filled side by side and looked up by
//! position.

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

const KIND: &str = "Index";

/// Factory for [`Indexed`] and [`Indexing`].
pub struct Index;

impl Index {
    /// Fails if `values` is empty or mixes kinds.
    pub fn ed<V: Container>(entries: f64, values: Vec<V>) -> Result<Indexed<V>, ContainerError> {
        check_uniform(KIND, &values)?;
        Ok(Indexed {
            entries: check_entries(entries)?,
            values,
        })
    }

    pub fn ing<V: Container>(values: Vec<V>) -> Result<Indexing<V>, ContainerError> {
        let stats = Index::ed(0.0, values)?;
        Ok(Indexing {
            stats: stats.zero(),
        })
    }
}

/// Closure-free index.
#[derive(Clone, Debug)]
pub struct Indexed<V> {
    entries: f64,
    values: Vec<V>,
}

impl<V> Indexed<V> {
    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn at(&self, index: usize) -> Option<&V> {
        self.values.get(index)
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }
}

impl<V: PartialEq> PartialEq for Indexed<V> {
    fn eq(&self, other: &Self) -> bool {
        exact(self.entries, other.entries) && self.values == other.values
    }
}

impl<V: Container> Container for Indexed<V> {
    fn kind_name(&self) -> &'static str {
        KIND
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn zero(&self) -> Self {
        Indexed {
            entries: 0.0,
            values: self.values.iter().map(Container::zero).collect(),
        }
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        if self.values.len() != other.values.len() {
            return Err(ContainerError::shape(
                KIND,
                format!("sizes differ ({} vs {})", self.values.len(), other.values.len()),
            ));
        }
        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(x, y)| x.combine(y))
            .collect::<Result<_, _>>()?;
        Ok(Indexed {
            entries: self.entries + other.entries,
            values,
        })
    }

    fn encode_fragment(&self) -> Value {
        let mut map = Map::new();
        map.insert("entries".into(), json::float_to_json(self.entries));
        if let Some(first) = self.values.first() {
            map.insert("type".into(), Value::String(first.kind_name().into()));
        }
        map.insert(
            "data".into(),
            Value::Array(self.values.iter().map(Container::encode_fragment).collect()),
        );
        Value::Object(map)
    }
}

impl<V: Factory> Kind for Indexed<V> {
    const NAME: &'static str = KIND;

    fn decode_fragment(fragment: &Value) -> Result<Self, ContainerError> {
        let fields = Fields::parse(fragment, KIND, &["entries", "type", "data"], &[])?;
        let kind = fields.str("type")?;
        let values = fields
            .array("data")?
            .iter()
            .map(|v| decode_declared::<V>(kind, v))
            .collect::<Result<Vec<_>, _>>()?;
        Index::ed(fields.float("entries")?, values)
    }
}

/// Accumulating index.
pub struct Indexing<V> {
    stats: Indexed<V>,
}

impl<V> Indexing<V> {
    pub fn values(&self) -> &[V] {
        self.stats.values()
    }

    pub fn at(&self, index: usize) -> Option<&V> {
        self.stats.at(index)
    }

    pub fn size(&self) -> usize {
        self.stats.size()
    }
}

impl<V: Clone> Clone for Indexing<V> {
    fn clone(&self) -> Self {
        Self {
            stats: self.stats.clone(),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Indexing<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indexing")
            .field("stats", &self.stats)
            .finish()
    }
}

impl<V: PartialEq> PartialEq for Indexing<V> {
    fn eq(&self, other: &Self) -> bool {
        self.stats == other.stats
    }
}

impl<V: Container> Container for Indexing<V> {
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

impl<D: ?Sized, V: Aggregator<D> + Clone> Aggregator<D> for Indexing<V> {
    type Snapshot = Indexed<V::Snapshot>;

    fn fill(&mut self, datum: &D, weight: f64) -> Result<(), ContainerError> {
        if weight.is_nan() || weight <= 0.0 {
            return Ok(());
        }
        let mut values = self.stats.values.clone();
        for v in &mut values {
            v.fill(datum, weight)?;
        }
        self.stats.values = values;
        self.stats.entries += weight;
        Ok(())
    }

    fn snapshot(&self) -> Self::Snapshot {
        Indexed {
            entries: self.stats.entries,
            values: self.stats.values.iter().map(|v| v.snapshot()).collect(),
        }
    }
}
