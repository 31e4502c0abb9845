/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Sum: the weighted sum of a quantity.

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

/// Factory for [`Summed`] and [`Summing`].
pub struct Sum;

impl Sum {
    /// A snapshot with precomputed statistics.
    pub fn ed(entries: f64, sum: f64) -> Result<Summed, ContainerError> {
        Ok(Summed {
            entries: check_entries(entries)?,
            sum,
            name: None,
        })
    }

    /// An empty, unweighted accumulator of `quantity`.
    pub fn ing<D: ?Sized + 'static>(quantity: Quantity<D>) -> Summing<D> {
        Summing::new(quantity)
    }
}

/// Closure-free sum.
#[derive(Clone, Debug, Default)]
pub struct Summed {
    entries: f64,
    sum: f64,
    name: Option<String>,
}

impl Summed {
    /// The weighted sum of the quantity.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Label the summed quantity.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    fn accumulate(&mut self, q: f64, w: f64) {
        self.entries += w;
        self.sum += q * w;
    }
}

impl PartialEq for Summed {
    fn eq(&self, other: &Self) -> bool {
        exact(self.entries, other.entries) && exact(self.sum, other.sum) && self.name == other.name
    }
}

impl Container for Summed {
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
        Summed {
            name: self.name.clone(),
            ..Summed::default()
        }
    }

    fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
        Ok(Summed {
            entries: self.entries + other.entries,
            sum: self.sum + other.sum,
            name: combine_names(Self::NAME, &self.name, &other.name)?,
        })
    }

    fn encode_fragment(&self) -> Value {
        let fragment = json!({
            "entries": json::float_to_json(self.entries),
            "sum": json::float_to_json(self.sum),
        });
        json::maybe_add(fragment, "name", self.name())
    }
}

impl Kind for Summed {
    const NAME: &'static str = "Sum";

    fn decode_fragment(fragment: &Value) -> Result<Self, ContainerError> {
        let fields = Fields::parse(fragment, Self::NAME, &["entries", "sum"], &["name"])?;
        let summed = Sum::ed(fields.float("entries")?, fields.float("sum")?)?;
        Ok(match fields.optional_str("name")? {
            Some(name) => summed.named(name),
            None => summed,
        })
    }
}

quantity_accumulator! {
    /// Accumulating sum.
    Summing => Summed
}

impl<D: ?Sized> Summing<D> {
    /// The weighted sum of the quantity.
    pub fn sum(&self) -> f64 {
        self.stats.sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::global;
    use crate::container::Aggregator;
    use crate::container::Factory;
    use crate::function::Selection;

    fn length() -> Quantity<str> {
        Quantity::new(|s: &str| s.len() as f64)
    }

    #[test]
    fn summing_string_lengths() {
        let mut a = Sum::ing(length());
        let mut b = Sum::ing(length());
        a.fill("hello", 1.0).unwrap();
        b.fill("hey", 1.0).unwrap();
        b.fill("there", 1.0).unwrap();

        assert_eq!(a, Sum::ed(1.0, 5.0).unwrap());
        assert_eq!(b, Sum::ed(2.0, 8.0).unwrap());

        let ab = a.combine(&b).unwrap();
        assert_eq!(ab.entries(), 3.0);
        assert_eq!(ab.sum(), 13.0);
    }

    #[test]
    fn non_positive_weight_is_a_no_op() {
        let mut a = Sum::ing(length());
        a.fill("hello", 0.0).unwrap();
        a.fill("hello", -1.0).unwrap();
        assert_eq!(a, Summed::default());
    }

    #[test]
    fn negative_selection_does_not_revive_a_negative_weight() {
        let mut a = Sum::ing(length()).with_selection(Selection::new(|_: &str| -1.0));
        a.fill("hello", -1.0).unwrap();
        a.fill("hello", f64::NAN).unwrap();
        assert_eq!(a, Summed::default());
    }

    #[test]
    fn selection_scales_the_weight() {
        let mut a = Sum::ing(length()).with_selection(Selection::new(|s: &str| {
            if s.starts_with('h') {
                2.0
            } else {
                0.0
            }
        }));
        a.fill("hello", 1.0).unwrap();
        a.fill("there", 1.0).unwrap();
        assert_eq!(a.snapshot(), Sum::ed(2.0, 10.0).unwrap());
    }

    #[test]
    fn failing_quantity_leaves_state_untouched() {
        let quantity = Quantity::<str>::fallible(|s| Ok(s.parse::<f64>()?));
        let mut a = Sum::ing(quantity);
        a.fill("1.5", 1.0).unwrap();
        let before = a.snapshot();
        assert!(matches!(
            a.fill("nope", 1.0),
            Err(ContainerError::UserFunction(_))
        ));
        assert_eq!(a, before);
    }

    #[test]
    fn round_trips_through_json() {
        let _config = global::lock();
        let json = serde_json::json!({"type": "Sum", "data": {"entries": 1, "sum": 1}});
        let x = Summed::decode(&json).unwrap();
        assert_eq!(x, Sum::ed(1.0, 1.0).unwrap());
        assert_eq!(x.encode(), json);

        let y = Sum::ed(2.0, f64::NAN).unwrap();
        assert_eq!(Summed::decode(&y.encode()).unwrap(), y);
    }

    #[test]
    fn malformed_fragments_are_rejected() {
        let _config = global::lock();
        for bad in [
            serde_json::json!({"entries": 1}),
            serde_json::json!({"entries": "x", "sum": 1}),
            serde_json::json!([1, 2]),
            serde_json::json!({"entries": 1, "sum": 2, "mean": 3}),
        ] {
            assert!(matches!(
                Summed::decode_fragment(&bad),
                Err(ContainerError::MalformedFragment { .. })
            ));
        }
    }

    #[test]
    fn names_come_from_the_quantity() {
        let _config = global::lock();
        let mut a = Sum::ing(length().named("length"));
        a.fill("hello", 1.0).unwrap();
        assert_eq!(a.name(), Some("length"));
        assert_eq!(a.snapshot(), Sum::ed(1.0, 5.0).unwrap().named("length"));
        assert_eq!(
            a.encode_fragment(),
            serde_json::json!({"entries": 1, "sum": 5, "name": "length"})
        );
        assert_eq!(a.zero().name(), Some("length"));
    }

    #[test]
    fn names_survive_the_round_trip() {
        let _config = global::lock();
        let json = serde_json::json!({"type": "Sum", "data": {"entries": 1, "name": "x", "sum": 1}});
        let x = Summed::decode(&json).unwrap();
        assert_eq!(x.name(), Some("x"));
        assert_eq!(x.encode(), json);
        assert_ne!(x, Sum::ed(1.0, 1.0).unwrap());
    }

    #[test]
    fn differently_named_sums_do_not_combine() {
        let x = Sum::ed(1.0, 1.0).unwrap().named("x");
        let y = Sum::ed(1.0, 1.0).unwrap().named("y");
        assert!(matches!(
            x.combine(&y),
            Err(ContainerError::ShapeMismatch { kind: "Sum", .. })
        ));
        let anonymous = Sum::ed(2.0, 3.0).unwrap();
        assert_eq!(x.combine(&anonymous).unwrap(), Sum::ed(3.0, 4.0).unwrap().named("x"));
    }

    #[test]
    fn revived_accumulator_continues() {
        let snapshot =
            Summed::decode_fragment(&serde_json::json!({"entries": 1, "sum": 5})).unwrap();
        let mut a = Summing::from_snapshot(snapshot, length(), Selection::unweighted());
        a.fill("hey", 1.0).unwrap();
        assert_eq!(a, Sum::ed(2.0, 8.0).unwrap());
    }
}
