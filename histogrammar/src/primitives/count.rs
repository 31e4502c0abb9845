/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Count: the sum of weights.

use serde_json::Value;

use crate::container::Aggregator;
use crate::container::Container;
use crate::container::Kind;
use crate::error::check_entries;
use crate::error::ContainerError;
use crate::json;
use crate::json::exact;

/// Factory for [`Counted`] and [`Counting`].
pub struct Count;

impl Count {
    /// A snapshot with `entries` already counted.
    pub fn ed(entries: f64) -> Result<Counted, ContainerError> {
        Ok(Counted {
            entries: check_entries(entries)?,
        })
    }

    /// An empty accumulator.
    pub fn ing() -> Counting {
        Counting::default()
    }
}

/// Closure-free count.
#[derive(Clone, Copy, Debug, Default)]
pub struct Counted {
    entries: f64,
}

impl PartialEq for Counted {
    fn eq(&self, other: &Self) -> bool {
        exact(self.entries, other.entries)
    }
}

impl Container for Counted {
    fn kind_name(&self) -> &'static str {
        Self::NAME
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn zero(&self) -> Self {
        Counted::default()
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        Ok(Counted {
            entries: self.entries + other.entries,
        })
    }

    fn encode_fragment(&self) -> Value {
        json::float_to_json(self.entries)
    }
}

impl Kind for Counted {
    const NAME: &'static str = "Count";

    fn decode_fragment(fragment: &Value) -> Result<Self, ContainerError> {
        let entries = json::float_from_json(fragment)
            .ok_or_else(|| ContainerError::malformed(Self::NAME, fragment))?;
        Count::ed(entries)
    }
}

/// Accumulating count. It accepts any datum and ignores it: the weight
/// alone is added. A weight that is not positive adds nothing, so the
/// count never goes negative.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Counting {
    stats: Counted,
}

impl Counting {
    /// Revive an accumulator from a decoded snapshot.
    pub fn from_snapshot(snapshot: Counted) -> Self {
        Self { stats: snapshot }
    }
}

impl Container for Counting {
    fn kind_name(&self) -> &'static str {
        Counted::NAME
    }

    fn entries(&self) -> f64 {
        self.stats.entries
    }

    fn zero(&self) -> Self {
        Counting::default()
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        Ok(Counting {
            stats: self.stats.combine(&other.stats)?,
        })
    }

    fn encode_fragment(&self) -> Value {
        self.stats.encode_fragment()
    }
}

impl<D: ?Sized> Aggregator<D> for Counting {
    type Snapshot = Counted;

    fn fill(&mut self, _datum: &D, weight: f64) -> Result<(), ContainerError> {
        if weight > 0.0 {
            self.stats.entries += weight;
        }
        Ok(())
    }

    fn snapshot(&self) -> Counted {
        self.stats
    }
}

impl PartialEq<Counted> for Counting {
    fn eq(&self, other: &Counted) -> bool {
        self.stats == *other
    }
}
