/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Minimize and Maximize: the extreme values of a quantity.
//!
//! An empty container holds NaN as its extreme; NaN is ignored when
//! combining, so the empty container is the identity.

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
use crate::json::maxplus;
use crate::json::minplus;
use crate::json::Fields;

/// Factory for [`Minimized`] and [`Minimizing`].
pub struct Minimize;

impl Minimize {
    pub fn ed(entries: f64, min: f64) -> Result<Minimized, ContainerError> {
        Ok(Minimized {
            entries: check_entries(entries)?,
            min,
            name: None,
        })
    }

    pub fn ing<D: ?Sized + 'static>(quantity: Quantity<D>) -> Minimizing<D> {
        Minimizing::new(quantity)
    }
}

/// Factory for [`Maximized`] and [`Maximizing`].
pub struct Maximize;

impl Maximize {
    pub fn ed(entries: f64, max: f64) -> Result<Maximized, ContainerError> {
        Ok(Maximized {
            entries: check_entries(entries)?,
            max,
            name: None,
        })
    }

    pub fn ing<D: ?Sized + 'static>(quantity: Quantity<D>) -> Maximizing<D> {
        Maximizing::new(quantity)
    }
}

/// Closure-free minimum.
#[derive(Clone, Debug)]
pub struct Minimized {
    entries: f64,
    min: f64,
    name: Option<String>,
}

impl Default for Minimized {
    fn default() -> Self {
        Self {
            entries: 0.0,
            min: f64::NAN,
            name: None,
        }
    }
}

impl Minimized {
    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    fn accumulate(&mut self, q: f64, w: f64) {
        self.entries += w;
        self.min = minplus(self.min, q);
    }
}

impl PartialEq for Minimized {
    fn eq(&self, other: &Self) -> bool {
        exact(self.entries, other.entries)
            && exact(self.min, other.min)
            && self.name == other.name
    }
}

impl Container for Minimized {
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
        Minimized {
            name: self.name.clone(),
            ..Minimized::default()
        }
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        Ok(Minimized {
            entries: self.entries + other.entries,
            min: minplus(self.min, other.min),
            name: combine_names(Self::NAME, &self.name, &other.name)?,
        })
    }

    fn encode_fragment(&self) -> Value {
        let fragment = json!({
            "entries": json::float_to_json(self.entries),
            "min": json::float_to_json(self.min),
        });
        json::maybe_add(fragment, "name", self.name())
    }
}

impl Kind for Minimized {
    const NAME: &'static str = "Minimize";

    fn decode_fragment(fragment: &Value) -> Result<Self, ContainerError> {
        let fields = Fields::parse(fragment, Self::NAME, &["entries", "min"], &["name"])?;
        let extreme = Minimize::ed(fields.float("entries")?, fields.float("min")?)?;
        Ok(match fields.optional_str("name")? {
            Some(name) => extreme.named(name),
            None => extreme,
        })
    }
}

/// Closure-free maximum.
#[derive(Clone, Debug)]
pub struct Maximized {
    entries: f64,
    max: f64,
    name: Option<String>,
}

impl Default for Maximized {
    fn default() -> Self {
        Self {
            entries: 0.0,
            max: f64::NAN,
            name: None,
        }
    }
}

impl Maximized {
    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    fn accumulate(&mut self, q: f64, w: f64) {
        self.entries += w;
        self.max = maxplus(self.max, q);
    }
}

impl PartialEq for Maximized {
    fn eq(&self, other: &Self) -> bool {
        exact(self.entries, other.entries)
            && exact(self.max, other.max)
            && self.name == other.name
    }
}

impl Container for Maximized {
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
        Maximized {
            name: self.name.clone(),
            ..Maximized::default()
        }
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        Ok(Maximized {
            entries: self.entries + other.entries,
            max: maxplus(self.max, other.max),
            name: combine_names(Self::NAME, &self.name, &other.name)?,
        })
    }

    fn encode_fragment(&self) -> Value {
        let fragment = json!({
            "entries": json::float_to_json(self.entries),
            "max": json::float_to_json(self.max),
        });
        json::maybe_add(fragment, "name", self.name())
    }
}

impl Kind for Maximized {
    const NAME: &'static str = "Maximize";

    fn decode_fragment(fragment: &Value) -> Result<Self, ContainerError> {
        let fields = Fields::parse(fragment, Self::NAME, &["entries", "max"], &["name"])?;
        let extreme = Maximize::ed(fields.float("entries")?, fields.float("max")?)?;
        Ok(match fields.optional_str("name")? {
            Some(name) => extreme.named(name),
            None => extreme,
        })
    }
}

quantity_accumulator! {
    /// Accumulating minimum.
    Minimizing => Minimized
}

quantity_accumulator! {
    /// Accumulating maximum.
    Maximizing => Maximized
}

impl<D: ?Sized> Minimizing<D> {
    pub fn min(&self) -> f64 {
        self.stats.min
    }
}

impl<D: ?Sized> Maximizing<D> {
    pub fn max(&self) -> f64 {
        self.stats.max
    }
}
