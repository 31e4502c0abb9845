/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Bin: a fixed-width histogram whose bins are arbitrary containers.
//!
//! `num` equal-width bins cover the half-open interval `[low, high)`.
//! Every datum lands in exactly one of `num + 3` sub-containers:
//!
//! ```text
//!   NaN            -> nanflow
//!   x < low        -> underflow
//!   x >= high      -> overflow
//!   otherwise      -> values[floor(num * (x - low) / (high - low))]
//! ```
//!
//! Bounds are validated so that `num * (high - low)` is finite, which
//! keeps every step of that index computation finite too.
//!
//! The sub-containers can be any kind, including another `Bin`, so a
//! histogram of sums or a histogram of histograms is just a choice of
//! type parameters:
//!
//! ```rust
//! use histogrammar::Aggregator;
//! use histogrammar::Quantity;
//! use histogrammar::primitives::Bin;
//! use histogrammar::primitives::Sum;
//!
//! let x = Quantity::new(|p: &(f64, f64)| p.0);
//! let y = Quantity::new(|p: &(f64, f64)| p.1);
//! let mut profile = Bin::ing(10, 0.0, 1.0, x, Sum::ing(y)).unwrap();
//! profile.fill(&(0.25, 3.0), 1.0).unwrap();
//! assert_eq!(profile.values()[2].sum(), 3.0);
//! ```

use std::fmt;
use std::ops::Range;

use serde_json::Map;
use serde_json::Value;

use crate::container::check_uniform;
use crate::container::combine_names;
use crate::container::decode_declared;
use crate::container::shared_name;
use crate::container::Aggregator;
use crate::container::Container;
use crate::container::Factory;
use crate::container::Kind;
use crate::error::check_entries;
use crate::error::ContainerError;
use crate::function::Quantity;
use crate::function::Selection;
use crate::json;
use crate::json::exact;
use crate::json::Fields;
use crate::primitives::Counted;
use crate::primitives::Counting;

const KIND: &str = "Bin";

/// Where a value falls in a [`BinRange`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Class {
    /// A regular bin, `0..num`.
    Bin(usize),
    /// Below `low`.
    Underflow,
    /// At or above `high`.
    Overflow,
    /// Not a number.
    Nanflow,
}

/// Equal-width binning of `[low, high)` into `num` bins.
pub trait BinRange {
    fn num(&self) -> usize;
    fn low(&self) -> f64;
    fn high(&self) -> f64;

    fn nan(&self, x: f64) -> bool {
        x.is_nan()
    }

    fn under(&self, x: f64) -> bool {
        !x.is_nan() && x < self.low()
    }

    fn over(&self, x: f64) -> bool {
        !x.is_nan() && x >= self.high()
    }

    /// Classify `x`: NaN first, then underflow, then overflow.
    fn classify(&self, x: f64) -> Class {
        if self.nan(x) {
            Class::Nanflow
        } else if self.under(x) {
            Class::Underflow
        } else if self.over(x) {
            Class::Overflow
        } else {
            let index = (self.num() as f64 * (x - self.low()) / (self.high() - self.low())).floor();
            // Rounding can push values just below `high` onto `num`.
            Class::Bin((index as usize).min(self.num() - 1))
        }
    }

    /// The regular bin of `x`, if it has one.
    fn bin(&self, x: f64) -> Option<usize> {
        match self.classify(x) {
            Class::Bin(index) => Some(index),
            _ => None,
        }
    }

    fn indexes(&self) -> Range<usize> {
        0..self.num()
    }

    /// The `[lo, hi)` edges of bin `index`.
    fn range(&self, index: usize) -> (f64, f64) {
        let width = self.high() - self.low();
        let num = self.num() as f64;
        (
            width * index as f64 / num + self.low(),
            width * (index + 1) as f64 / num + self.low(),
        )
    }
}

/// Factory for [`Binned`] and [`Binning`].
pub struct Bin;

impl Bin {
    /// A snapshot from precomputed sub-containers.
    pub fn ed<V, U, O, N>(
        low: f64,
        high: f64,
        entries: f64,
        values: Vec<V>,
        underflow: U,
        overflow: O,
        nanflow: N,
    ) -> Result<Binned<V, U, O, N>, ContainerError>
    where
        V: Container,
        U: Container,
        O: Container,
        N: Container,
    {
        check_range(low, high, values.len())?;
        check_uniform(KIND, &values)?;
        Ok(Binned {
            low,
            high,
            entries: check_entries(entries)?,
            values,
            underflow,
            overflow,
            nanflow,
            name: None,
        })
    }

    /// An empty accumulator with `num` copies of `value` (zeroed) and
    /// counting flow containers.
    pub fn ing<D, V>(
        num: usize,
        low: f64,
        high: f64,
        quantity: Quantity<D>,
        value: V,
    ) -> Result<Binning<D, V>, ContainerError>
    where
        D: ?Sized + 'static,
        V: Aggregator<D>,
    {
        Self::ing_with_flows(
            num,
            low,
            high,
            quantity,
            value,
            Counting::default(),
            Counting::default(),
            Counting::default(),
        )
    }

    /// Like [`Bin::ing`], with explicit flow containers (zeroed).
    #[allow(clippy::too_many_arguments)]
    pub fn ing_with_flows<D, V, U, O, N>(
        num: usize,
        low: f64,
        high: f64,
        quantity: Quantity<D>,
        value: V,
        underflow: U,
        overflow: O,
        nanflow: N,
    ) -> Result<Binning<D, V, U, O, N>, ContainerError>
    where
        D: ?Sized + 'static,
        V: Aggregator<D>,
        U: Aggregator<D>,
        O: Aggregator<D>,
        N: Aggregator<D>,
    {
        check_range(low, high, num)?;
        if num < 1 {
            return Err(ContainerError::EmptyValues);
        }
        Ok(Binning {
            stats: Binned {
                low,
                high,
                entries: 0.0,
                values: (0..num).map(|_| value.zero()).collect(),
                underflow: underflow.zero(),
                overflow: overflow.zero(),
                nanflow: nanflow.zero(),
                name: quantity.name().map(String::from),
            },
            quantity,
            selection: Selection::unweighted(),
        })
    }
}

fn check_range(low: f64, high: f64, num: usize) -> Result<(), ContainerError> {
    let finite = low.is_finite() && high.is_finite() && (num as f64 * (high - low)).is_finite();
    if !(finite && low < high) {
        return Err(ContainerError::InvalidRange { low, high });
    }
    Ok(())
}

/// A histogram's statistics. Closure-free when its sub-containers are.
#[derive(Clone, Debug)]
pub struct Binned<V, U = Counted, O = Counted, N = Counted> {
    low: f64,
    high: f64,
    entries: f64,
    values: Vec<V>,
    underflow: U,
    overflow: O,
    nanflow: N,
    name: Option<String>,
}

impl<V, U, O, N> Binned<V, U, O, N> {
    pub fn values(&self) -> &[V] {
        &self.values
    }

    /// Label the binned quantity.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// The sub-container of bin `index`.
    pub fn at(&self, index: usize) -> Option<&V> {
        self.values.get(index)
    }

    pub fn underflow(&self) -> &U {
        &self.underflow
    }

    pub fn overflow(&self) -> &O {
        &self.overflow
    }

    pub fn nanflow(&self) -> &N {
        &self.nanflow
    }
}

impl<V, U, O, N> BinRange for Binned<V, U, O, N> {
    fn num(&self) -> usize {
        self.values.len()
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn high(&self) -> f64 {
        self.high
    }
}

impl<V, U, O, N> PartialEq for Binned<V, U, O, N>
where
    V: PartialEq,
    U: PartialEq,
    O: PartialEq,
    N: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        exact(self.low, other.low)
            && exact(self.high, other.high)
            && exact(self.entries, other.entries)
            && self.values == other.values
            && self.underflow == other.underflow
            && self.overflow == other.overflow
            && self.nanflow == other.nanflow
            && self.name == other.name
    }
}

impl<V, U, O, N> Container for Binned<V, U, O, N>
where
    V: Container,
    U: Container,
    O: Container,
    N: Container,
{
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
        Binned {
            low: self.low,
            high: self.high,
            entries: 0.0,
            values: self.values.iter().map(Container::zero).collect(),
            underflow: self.underflow.zero(),
            overflow: self.overflow.zero(),
            nanflow: self.nanflow.zero(),
            name: self.name.clone(),
        }
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        let mismatch = if self.low != other.low {
            Some(format!("low differs ({} vs {})", self.low, other.low))
        } else if self.high != other.high {
            Some(format!("high differs ({} vs {})", self.high, other.high))
        } else if self.num() != other.num() {
            Some(format!(
                "number of values differs ({} vs {})",
                self.num(),
                other.num()
            ))
        } else {
            None
        };
        if let Some(reason) = mismatch {
            tracing::debug!(%reason, "refusing to combine bins");
            return Err(ContainerError::shape(KIND, reason));
        }
        let name = combine_names(KIND, &self.name, &other.name)?;

        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(x, y)| x.combine(y))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Binned {
            low: self.low,
            high: self.high,
            entries: self.entries + other.entries,
            values,
            underflow: self.underflow.combine(&other.underflow)?,
            overflow: self.overflow.combine(&other.overflow)?,
            nanflow: self.nanflow.combine(&other.nanflow)?,
            name,
        })
    }

    fn encode_fragment(&self) -> Value {
        let mut map = Map::new();
        map.insert("low".into(), json::float_to_json(self.low));
        map.insert("high".into(), json::float_to_json(self.high));
        map.insert("entries".into(), json::float_to_json(self.entries));
        map.insert(
            "values:type".into(),
            Value::String(self.values[0].kind_name().into()),
        );
        // A name shared by every bin is written once, as `values:name`.
        let values_name = shared_name(&self.values);
        let values = self.values.iter().map(|v| match values_name {
            Some(_) => json::without_name(v.encode_fragment()),
            None => v.encode_fragment(),
        });
        map.insert("values".into(), Value::Array(values.collect()));
        for (key, kind, fragment) in [
            (
                "underflow",
                self.underflow.kind_name(),
                self.underflow.encode_fragment(),
            ),
            (
                "overflow",
                self.overflow.kind_name(),
                self.overflow.encode_fragment(),
            ),
            (
                "nanflow",
                self.nanflow.kind_name(),
                self.nanflow.encode_fragment(),
            ),
        ] {
            map.insert(format!("{key}:type"), Value::String(kind.into()));
            map.insert(key.into(), fragment);
        }
        let fragment = json::maybe_add(Value::Object(map), "values:name", values_name);
        json::maybe_add(fragment, "name", self.name())
    }
}

impl<V, U, O, N> Kind for Binned<V, U, O, N>
where
    V: Factory,
    U: Factory,
    O: Factory,
    N: Factory,
{
    const NAME: &'static str = KIND;

    fn decode_fragment(fragment: &Value) -> Result<Self, ContainerError> {
        let fields = Fields::parse(
            fragment,
            KIND,
            &[
                "low",
                "high",
                "entries",
                "values:type",
                "values",
                "underflow:type",
                "underflow",
                "overflow:type",
                "overflow",
                "nanflow:type",
                "nanflow",
            ],
            &["name", "values:name"],
        )?;

        let values_type = fields.str("values:type")?;
        let values_name = fields.optional_str("values:name")?;
        let values = fields
            .array("values")?
            .iter()
            .map(|x| decode_declared::<V>(values_type, &json::with_parent_name(x, values_name)))
            .collect::<Result<Vec<_>, _>>()?;

        let binned = Bin::ed(
            fields.float("low")?,
            fields.float("high")?,
            fields.float("entries")?,
            values,
            decode_declared::<U>(fields.str("underflow:type")?, fields.value("underflow")?)?,
            decode_declared::<O>(fields.str("overflow:type")?, fields.value("overflow")?)?,
            decode_declared::<N>(fields.str("nanflow:type")?, fields.value("nanflow")?)?,
        )?;
        Ok(match fields.optional_str("name")? {
            Some(name) => binned.named(name),
            None => binned,
        })
    }
}

/// Accumulating histogram.
pub struct Binning<D: ?Sized, V, U = Counting, O = Counting, N = Counting> {
    quantity: Quantity<D>,
    selection: Selection<D>,
    stats: Binned<V, U, O, N>,
}

impl<D, V, U, O, N> Binning<D, V, U, O, N>
where
    D: ?Sized,
    V: Aggregator<D>,
    U: Aggregator<D>,
    O: Aggregator<D>,
    N: Aggregator<D>,
{
    /// Weight every datum by `selection`.
    pub fn with_selection(mut self, selection: Selection<D>) -> Self {
        self.selection = selection;
        self
    }

    /// Rebuild an accumulator around existing sub-accumulators, e.g.
    /// ones revived from a decoded snapshot.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        low: f64,
        high: f64,
        quantity: Quantity<D>,
        selection: Selection<D>,
        entries: f64,
        values: Vec<V>,
        underflow: U,
        overflow: O,
        nanflow: N,
    ) -> Result<Self, ContainerError> {
        let mut stats = Bin::ed(low, high, entries, values, underflow, overflow, nanflow)?;
        stats.name = quantity.name().map(String::from);
        Ok(Self {
            quantity,
            selection,
            stats,
        })
    }

    pub fn values(&self) -> &[V] {
        &self.stats.values
    }

    pub fn at(&self, index: usize) -> Option<&V> {
        self.stats.values.get(index)
    }

    pub fn underflow(&self) -> &U {
        &self.stats.underflow
    }

    pub fn overflow(&self) -> &O {
        &self.stats.overflow
    }

    pub fn nanflow(&self) -> &N {
        &self.stats.nanflow
    }

    pub fn quantity(&self) -> &Quantity<D> {
        &self.quantity
    }

    pub fn selection(&self) -> &Selection<D> {
        &self.selection
    }

    fn with_stats(&self, stats: Binned<V, U, O, N>) -> Self {
        Self {
            quantity: self.quantity.clone(),
            selection: self.selection.clone(),
            stats,
        }
    }
}

impl<D: ?Sized, V, U, O, N> BinRange for Binning<D, V, U, O, N> {
    fn num(&self) -> usize {
        self.stats.num()
    }

    fn low(&self) -> f64 {
        self.stats.low
    }

    fn high(&self) -> f64 {
        self.stats.high
    }
}

impl<D, V, U, O, N> Clone for Binning<D, V, U, O, N>
where
    D: ?Sized,
    V: Clone,
    U: Clone,
    O: Clone,
    N: Clone,
{
    fn clone(&self) -> Self {
        Self {
            quantity: self.quantity.clone(),
            selection: self.selection.clone(),
            stats: self.stats.clone(),
        }
    }
}

impl<D, V, U, O, N> fmt::Debug for Binning<D, V, U, O, N>
where
    D: ?Sized,
    V: fmt::Debug,
    U: fmt::Debug,
    O: fmt::Debug,
    N: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binning")
            .field("quantity", &self.quantity)
            .field("selection", &self.selection)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<D, V, U, O, N> PartialEq for Binning<D, V, U, O, N>
where
    D: ?Sized,
    V: PartialEq,
    U: PartialEq,
    O: PartialEq,
    N: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.stats == other.stats
    }
}

impl<D, V, U, O, N> PartialEq<Binned<V::Snapshot, U::Snapshot, O::Snapshot, N::Snapshot>>
    for Binning<D, V, U, O, N>
where
    D: ?Sized,
    V: Aggregator<D>,
    U: Aggregator<D>,
    O: Aggregator<D>,
    N: Aggregator<D>,
{
    fn eq(&self, other: &Binned<V::Snapshot, U::Snapshot, O::Snapshot, N::Snapshot>) -> bool {
        self.snapshot() == *other
    }
}

impl<D, V, U, O, N> Container for Binning<D, V, U, O, N>
where
    D: ?Sized,
    V: Aggregator<D>,
    U: Aggregator<D>,
    O: Aggregator<D>,
    N: Aggregator<D>,
{
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
        self.with_stats(self.stats.zero())
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        Ok(self.with_stats(self.stats.combine(&other.stats)?))
    }

    fn encode_fragment(&self) -> Value {
        self.stats.encode_fragment()
    }
}

impl<D, V, U, O, N> Aggregator<D> for Binning<D, V, U, O, N>
where
    D: ?Sized,
    V: Aggregator<D>,
    U: Aggregator<D>,
    O: Aggregator<D>,
    N: Aggregator<D>,
{
    type Snapshot = Binned<V::Snapshot, U::Snapshot, O::Snapshot, N::Snapshot>;

    fn fill(&mut self, datum: &D, weight: f64) -> Result<(), ContainerError> {
        if weight.is_nan() || weight <= 0.0 {
            return Ok(());
        }
        let w = weight * self.selection.call(datum)?;
        if w > 0.0 {
            let q = self.quantity.call(datum)?;
            let stats = &mut self.stats;
            match stats.classify(q) {
                Class::Bin(index) => stats.values[index].fill(datum, w)?,
                Class::Underflow => stats.underflow.fill(datum, w)?,
                Class::Overflow => stats.overflow.fill(datum, w)?,
                Class::Nanflow => stats.nanflow.fill(datum, w)?,
            }
            // The delegated fill succeeded; nothing below can fail.
            stats.entries += w;
        }
        Ok(())
    }

    fn snapshot(&self) -> Self::Snapshot {
        Binned {
            low: self.stats.low,
            high: self.stats.high,
            entries: self.stats.entries,
            values: self.stats.values.iter().map(Aggregator::snapshot).collect(),
            underflow: self.stats.underflow.snapshot(),
            overflow: self.stats.overflow.snapshot(),
            nanflow: self.stats.nanflow.snapshot(),
            name: self.stats.name.clone(),
        }
    }
}
