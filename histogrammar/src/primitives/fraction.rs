/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Fraction: two containers of one shape, one of them behind a selection.
//!
//! The denominator sees every datum; the numerator sees the same datum
//! weighted by the selection. Dividing one by the other, bin by bin for
//! a histogram, gives an efficiency.
//!
//! ```rust
//! use histogrammar::Aggregator;
//! use histogrammar::Container;
//! use histogrammar::Quantity;
//! use histogrammar::Selection;
//! use histogrammar::primitives::Bin;
//! use histogrammar::primitives::Count;
//! use histogrammar::primitives::Fraction;
//!
//! let x = Quantity::new(|x: &f64| *x);
//! let mut efficiency = Fraction::ing(
//!     Selection::predicate(|x: &f64| *x > 2.0),
//!     Bin::ing(2, 0.0, 4.0, x, Count::ing()).unwrap(),
//! );
//! efficiency.fill_all(&[1.0, 2.5, 3.0, 3.5]).unwrap();
//! assert_eq!(efficiency.numerator().at(1).unwrap().entries(), 3.0);
//! assert_eq!(efficiency.denominator().at(0).unwrap().entries(), 1.0);
//! ```

use std::fmt;

use serde_json::Map;
use serde_json::Value;

use crate::container::combine_names;
use crate::container::decode_declared;
use crate::container::shared_name;
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

const KIND: &str = "Fraction";

/// Factory for [`Fractioned`] and [`Fractioning`].
pub struct Fraction;

impl Fraction {
    pub fn ed<V: Container>(
        entries: f64,
        numerator: V,
        denominator: V,
    ) -> Result<Fractioned<V>, ContainerError> {
        if numerator.kind_name() != denominator.kind_name() {
            return Err(ContainerError::shape(
                KIND,
                format!(
                    "numerator is `{}` but denominator is `{}`",
                    numerator.kind_name(),
                    denominator.kind_name()
                ),
            ));
        }
        Ok(Fractioned {
            entries: check_entries(entries)?,
            numerator,
            denominator,
            name: None,
        })
    }

    /// Two zeroed copies of `value`; the numerator is weighted by
    /// `selection`.
    pub fn ing<D, V>(selection: Selection<D>, value: V) -> Fractioning<D, V>
    where
        D: ?Sized,
        V: Aggregator<D>,
    {
        Fractioning {
            stats: Fractioned {
                entries: 0.0,
                numerator: value.zero(),
                denominator: value.zero(),
                name: selection.name().map(String::from),
            },
            selection,
        }
    }
}

/// Closure-free fraction.
#[derive(Clone, Debug)]
pub struct Fractioned<V> {
    entries: f64,
    numerator: V,
    denominator: V,
    name: Option<String>,
}

impl<V> Fractioned<V> {
    /// The container that received the selected data.
    pub fn numerator(&self) -> &V {
        &self.numerator
    }

    /// The container that received every datum.
    pub fn denominator(&self) -> &V {
        &self.denominator
    }

    /// Label the selection.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

impl<V: PartialEq> PartialEq for Fractioned<V> {
    fn eq(&self, other: &Self) -> bool {
        exact(self.entries, other.entries)
            && self.numerator == other.numerator
            && self.denominator == other.denominator
            && self.name == other.name
    }
}

impl<V: Container> Container for Fractioned<V> {
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
        Fractioned {
            entries: 0.0,
            numerator: self.numerator.zero(),
            denominator: self.denominator.zero(),
            name: self.name.clone(),
        }
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        Ok(Fractioned {
            entries: self.entries + other.entries,
            numerator: self.numerator.combine(&other.numerator)?,
            denominator: self.denominator.combine(&other.denominator)?,
            name: combine_names(KIND, &self.name, &other.name)?,
        })
    }

    fn encode_fragment(&self) -> Value {
        let sub_name = shared_name([&self.numerator, &self.denominator]);
        let sub = |x: &V| match sub_name {
            Some(_) => json::without_name(x.encode_fragment()),
            None => x.encode_fragment(),
        };
        let mut map = Map::new();
        map.insert("entries".into(), json::float_to_json(self.entries));
        map.insert(
            "type".into(),
            Value::String(self.numerator.kind_name().into()),
        );
        map.insert("numerator".into(), sub(&self.numerator));
        map.insert("denominator".into(), sub(&self.denominator));
        let fragment = json::maybe_add(Value::Object(map), "sub:name", sub_name);
        json::maybe_add(fragment, "name", self.name())
    }
}

impl<V: Factory> Kind for Fractioned<V> {
    const NAME: &'static str = KIND;

    fn decode_fragment(fragment: &Value) -> Result<Self, ContainerError> {
        let fields = Fields::parse(
            fragment,
            KIND,
            &["entries", "type", "numerator", "denominator"],
            &["name", "sub:name"],
        )?;
        let kind = fields.str("type")?;
        let sub_name = fields.optional_str("sub:name")?;
        let sub = |key: &str| -> Result<V, ContainerError> {
            decode_declared::<V>(kind, &json::with_parent_name(fields.value(key)?, sub_name))
        };
        let fractioned = Fraction::ed(fields.float("entries")?, sub("numerator")?, sub("denominator")?)?;
        Ok(match fields.optional_str("name")? {
            Some(name) => fractioned.named(name),
            None => fractioned,
        })
    }
}

/// Accumulating fraction.
pub struct Fractioning<D: ?Sized, V> {
    selection: Selection<D>,
    stats: Fractioned<V>,
}

impl<D: ?Sized, V: Aggregator<D>> Fractioning<D, V> {
    /// Rebuild an accumulator around existing sub-accumulators.
    pub fn from_parts(
        selection: Selection<D>,
        entries: f64,
        numerator: V,
        denominator: V,
    ) -> Result<Self, ContainerError> {
        let mut stats = Fraction::ed(entries, numerator, denominator)?;
        stats.name = selection.name().map(String::from);
        Ok(Self { selection, stats })
    }

    pub fn numerator(&self) -> &V {
        &self.stats.numerator
    }

    pub fn denominator(&self) -> &V {
        &self.stats.denominator
    }

    pub fn selection(&self) -> &Selection<D> {
        &self.selection
    }
}

impl<D: ?Sized, V: Clone> Clone for Fractioning<D, V> {
    fn clone(&self) -> Self {
        Self {
            selection: self.selection.clone(),
            stats: self.stats.clone(),
        }
    }
}

impl<D: ?Sized, V: fmt::Debug> fmt::Debug for Fractioning<D, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fractioning")
            .field("selection", &self.selection)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<D: ?Sized, V: PartialEq> PartialEq for Fractioning<D, V> {
    fn eq(&self, other: &Self) -> bool {
        self.stats == other.stats
    }
}

impl<D: ?Sized, V: Aggregator<D> + Clone> PartialEq<Fractioned<V::Snapshot>> for Fractioning<D, V> {
    fn eq(&self, other: &Fractioned<V::Snapshot>) -> bool {
        self.snapshot() == *other
    }
}

impl<D: ?Sized, V: Aggregator<D>> Container for Fractioning<D, V> {
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

impl<D: ?Sized, V: Aggregator<D> + Clone> Aggregator<D> for Fractioning<D, V> {
    type Snapshot = Fractioned<V::Snapshot>;

    fn fill(&mut self, datum: &D, weight: f64) -> Result<(), ContainerError> {
        if weight.is_nan() || weight <= 0.0 {
            return Ok(());
        }
        let w = weight * self.selection.call(datum)?;
        if w > 0.0 {
            // The denominator is filled on a copy, committed only once
            // the numerator has been filled too.
            let mut denominator = self.stats.denominator.clone();
            denominator.fill(datum, weight)?;
            self.stats.numerator.fill(datum, w)?;
            self.stats.denominator = denominator;
        } else {
            self.stats.denominator.fill(datum, weight)?;
        }
        self.stats.entries += weight;
        Ok(())
    }

    fn snapshot(&self) -> Self::Snapshot {
        Fractioned {
            entries: self.stats.entries,
            numerator: self.stats.numerator.snapshot(),
            denominator: self.stats.denominator.snapshot(),
            name: self.stats.name.clone(),
        }
    }
}
