/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Average: the weighted mean of a quantity.

use serde_json::json;
use serde_json::Value;

use crate::container::combine_names;
use crate::container::Container;
use crate::container::Kind;
use crate::error::check_entries;
use crate::error::ContainerError;
use crate::function::Quantity;
use crate::json;
use crate::json::exact;
use crate::json::Fields;

/// Factory for [`Averaged`] and [`Averaging`].
pub struct Average;

impl Average {
    pub fn ed(entries: f64, mean: f64) -> Result<Averaged, ContainerError> {
        Ok(Averaged {
            entries: check_entries(entries)?,
            mean,
            name: None,
        })
    }

    pub fn ing<D: ?Sized + 'static>(quantity: Quantity<D>) -> Averaging<D> {
        Averaging::new(quantity)
    }
}

/// Closure-free mean.
///
/// The mean of an empty container is undefined: it is kept and written
/// as given, but ignored by equality and by `combine`.
#[derive(Clone, Debug, Default)]
pub struct Averaged {
    entries: f64,
    mean: f64,
    name: Option<String>,
}

impl Averaged {
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Label the averaged quantity.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    fn accumulate(&mut self, q: f64, w: f64) {
        self.entries += w;
        self.mean += (q - self.mean) * w / self.entries;
    }
}

/// Entry-weighted mean of two non-empty means.
pub(crate) fn pooled_mean(entries1: f64, mean1: f64, entries2: f64, mean2: f64) -> f64 {
    (entries1 * mean1 + entries2 * mean2) / (entries1 + entries2)
}

impl PartialEq for Averaged {
    fn eq(&self, other: &Self) -> bool {
        exact(self.entries, other.entries)
            && (self.entries == 0.0 || exact(self.mean, other.mean))
            && self.name == other.name
    }
}

impl Container for Averaged {
    fn kind_name(&self) -> &'static str {
        Self::NAME
    }

    fn entries(&self) -> f64 {
        self.entries
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn zero(&self) -> Self {
        Averaged {
            name: self.name.clone(),
            ..Averaged::default()
        }
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        let name = combine_names(Self::NAME, &self.name, &other.name)?;
        if other.entries == 0.0 {
            return Ok(Averaged { name, ..self.clone() });
        }
        if self.entries == 0.0 {
            return Ok(Averaged { name, ..other.clone() });
        }
        Ok(Averaged {
            entries: self.entries + other.entries,
            mean: pooled_mean(self.entries, self.mean, other.entries, other.mean),
            name,
        })
    }

    fn encode_fragment(&self) -> Value {
        let fragment = json!({
            "entries": json::float_to_json(self.entries),
            "mean": json::float_to_json(self.mean),
        });
        json::maybe_add(fragment, "name", self.name())
    }
}

impl Kind for Averaged {
    const NAME: &'static str = "Average";

    fn decode_fragment(fragment: &Value) -> Result<Self, ContainerError> {
        let fields = Fields::parse(fragment, Self::NAME, &["entries", "mean"], &["name"])?;
        let averaged = Average::ed(fields.float("entries")?, fields.float("mean")?)?;
        Ok(match fields.optional_str("name")? {
            Some(name) => averaged.named(name),
            None => averaged,
        })
    }
}

quantity_accumulator! {
    /// Accumulating mean.
    Averaging => Averaged
}

impl<D: ?Sized> Averaging<D> {
    pub fn mean(&self) -> f64 {
        self.stats.mean
    }
}
