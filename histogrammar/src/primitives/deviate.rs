/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Deviate: weighted mean and population variance of a quantity.

use serde_json::json;
use serde_json::Value;

use super::average::pooled_mean;
use crate::container::combine_names;
use crate::container::Container;
use crate::container::Kind;
use crate::error::check_entries;
use crate::error::ContainerError;
use crate::function::Quantity;
use crate::json;
use crate::json::exact;
use crate::json::Fields;

/// Factory for [`Deviated`] and [`Deviating`].
pub struct Deviate;

impl Deviate {
    pub fn ed(entries: f64, mean: f64, variance: f64) -> Result<Deviated, ContainerError> {
        Ok(Deviated {
            entries: check_entries(entries)?,
            mean,
            variance,
            name: None,
        })
    }

    pub fn ing<D: ?Sized + 'static>(quantity: Quantity<D>) -> Deviating<D> {
        Deviating::new(quantity)
    }
}

/// Closure-free mean and variance. As with [`crate::primitives::Averaged`],
/// the moments of an empty container are not compared.
#[derive(Clone, Debug, Default)]
pub struct Deviated {
    entries: f64,
    mean: f64,
    variance: f64,
    name: Option<String>,
}

impl Deviated {
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Label the quantity.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    // Welford's update, carried in terms of variance * entries.
    fn accumulate(&mut self, q: f64, w: f64) {
        let m2 = self.variance * self.entries;
        self.entries += w;
        let delta = q - self.mean;
        self.mean += delta * w / self.entries;
        self.variance = (m2 + w * delta * (q - self.mean)) / self.entries;
    }
}

impl PartialEq for Deviated {
    fn eq(&self, other: &Self) -> bool {
        exact(self.entries, other.entries)
            && (self.entries == 0.0
                || (exact(self.mean, other.mean) && exact(self.variance, other.variance)))
            && self.name == other.name
    }
}

impl Container for Deviated {
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
        Deviated {
            name: self.name.clone(),
            ..Deviated::default()
        }
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        let name = combine_names(Self::NAME, &self.name, &other.name)?;
        if other.entries == 0.0 {
            return Ok(Deviated { name, ..self.clone() });
        }
        if self.entries == 0.0 {
            return Ok(Deviated { name, ..other.clone() });
        }
        let entries = self.entries + other.entries;
        let mean = pooled_mean(self.entries, self.mean, other.entries, other.mean);
        let delta = other.mean - self.mean;
        // Grouped so that swapping the operands gives the same bits.
        let m2 = self.variance * self.entries
            + other.variance * other.entries
            + delta * delta * (self.entries * other.entries) / entries;
        Ok(Deviated {
            entries,
            mean,
            variance: m2 / entries,
            name,
        })
    }

    fn encode_fragment(&self) -> Value {
        let fragment = json!({
            "entries": json::float_to_json(self.entries),
            "mean": json::float_to_json(self.mean),
            "variance": json::float_to_json(self.variance),
        });
        json::maybe_add(fragment, "name", self.name())
    }
}

impl Kind for Deviated {
    const NAME: &'static str = "Deviate";

    fn decode_fragment(fragment: &Value) -> Result<Self, ContainerError> {
        let fields = Fields::parse(
            fragment,
            Self::NAME,
            &["entries", "mean", "variance"],
            &["name"],
        )?;
        let deviated = Deviate::ed(
            fields.float("entries")?,
            fields.float("mean")?,
            fields.float("variance")?,
        )?;
        Ok(match fields.optional_str("name")? {
            Some(name) => deviated.named(name),
            None => deviated,
        })
    }
}

quantity_accumulator! {
    /// Accumulating mean and variance.
    Deviating => Deviated
}

impl<D: ?Sized> Deviating<D> {
    pub fn mean(&self) -> f64 {
        self.stats.mean
    }

    pub fn variance(&self) -> f64 {
        self.stats.variance
    }
}
