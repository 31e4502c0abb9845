/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The primitive containers.
//!
//! Every kind comes in two facets that share one algebra:
//!
//! - the snapshot ("-ed": [`Counted`], [`Summed`], [`Binned`], ...),
//!   closure-free and serializable;
//! - the accumulator ("-ing": [`Counting`], [`Summing`], [`Binning`],
//!   ...), which wraps a snapshot together with the functions needed to
//!   [`crate::Aggregator::fill`] it.
//!
//! A zero-sized factory per kind ([`Count`], [`Sum`], [`Bin`], ...)
//! builds both: `ed(..)` for snapshots, `ing(..)` for empty accumulators.

/// Generates the accumulating facet of a leaf kind whose statistics are
/// a function of one quantity.
///
/// The snapshot type must be `Clone + Default`, implement
/// [`crate::Kind`], hold the quantity's name in a `name: Option<String>`
/// field, and provide `fn accumulate(&mut self, q: f64, w: f64)`, which
/// is only called with `w > 0` and after every user function has
/// returned.
macro_rules! quantity_accumulator {
    ($(#[$meta:meta])* $name:ident => $snapshot:ident) => {
        $(#[$meta])*
        pub struct $name<D: ?Sized> {
            quantity: $crate::function::Quantity<D>,
            selection: $crate::function::Selection<D>,
            stats: $snapshot,
        }

        impl<D: ?Sized + 'static> $name<D> {
            pub(crate) fn new(quantity: $crate::function::Quantity<D>) -> Self {
                Self {
                    stats: $snapshot {
                        name: quantity.name().map(String::from),
                        ..$snapshot::default()
                    },
                    quantity,
                    selection: $crate::function::Selection::unweighted(),
                }
            }
        }

        impl<D: ?Sized> $name<D> {
            /// Weight every datum by `selection`.
            pub fn with_selection(mut self, selection: $crate::function::Selection<D>) -> Self {
                self.selection = selection;
                self
            }

            /// Revive an accumulator from a decoded snapshot by
            /// re-supplying its functions. An unnamed snapshot takes the
            /// quantity's name.
            pub fn from_snapshot(
                mut snapshot: $snapshot,
                quantity: $crate::function::Quantity<D>,
                selection: $crate::function::Selection<D>,
            ) -> Self {
                if snapshot.name.is_none() {
                    snapshot.name = quantity.name().map(String::from);
                }
                Self {
                    quantity,
                    selection,
                    stats: snapshot,
                }
            }

            pub fn quantity(&self) -> &$crate::function::Quantity<D> {
                &self.quantity
            }

            pub fn selection(&self) -> &$crate::function::Selection<D> {
                &self.selection
            }

            fn with_stats(&self, stats: $snapshot) -> Self {
                Self {
                    quantity: self.quantity.clone(),
                    selection: self.selection.clone(),
                    stats,
                }
            }
        }

        impl<D: ?Sized> Clone for $name<D> {
            fn clone(&self) -> Self {
                self.with_stats(self.stats.clone())
            }
        }

        impl<D: ?Sized> ::std::fmt::Debug for $name<D> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("quantity", &self.quantity)
                    .field("selection", &self.selection)
                    .field("stats", &self.stats)
                    .finish()
            }
        }

        // Accumulators compare by statistics only.
        impl<D: ?Sized> PartialEq for $name<D> {
            fn eq(&self, other: &Self) -> bool {
                self.stats == other.stats
            }
        }

        impl<D: ?Sized> PartialEq<$snapshot> for $name<D> {
            fn eq(&self, other: &$snapshot) -> bool {
                self.stats == *other
            }
        }

        impl<D: ?Sized> $crate::container::Container for $name<D> {
            fn kind_name(&self) -> &'static str {
                <$snapshot as $crate::container::Kind>::NAME
            }

            fn entries(&self) -> f64 {
                $crate::container::Container::entries(&self.stats)
            }

            fn name(&self) -> Option<&str> {
                $crate::container::Container::name(&self.stats)
            }

            fn zero(&self) -> Self {
                self.with_stats($crate::container::Container::zero(&self.stats))
            }

            fn combine(&self, other: &Self) -> Result<Self, $crate::error::ContainerError> {
                Ok(self.with_stats($crate::container::Container::combine(
                    &self.stats,
                    &other.stats,
                )?))
            }

            fn encode_fragment(&self) -> ::serde_json::Value {
                $crate::container::Container::encode_fragment(&self.stats)
            }
        }

        impl<D: ?Sized> $crate::container::Aggregator<D> for $name<D> {
            type Snapshot = $snapshot;

            fn fill(&mut self, datum: &D, weight: f64) -> Result<(), $crate::error::ContainerError> {
                if weight.is_nan() || weight <= 0.0 {
                    return Ok(());
                }
                let w = weight * self.selection.call(datum)?;
                if w > 0.0 {
                    let q = self.quantity.call(datum)?;
                    self.stats.accumulate(q, w);
                }
                Ok(())
            }

            fn snapshot(&self) -> $snapshot {
                self.stats.clone()
            }
        }
    };
}

mod average;
mod bin;
mod count;
mod cut;
mod deviate;
mod fraction;
mod index;
mod label;
mod minmax;
mod sum;

pub use average::Average;
pub use average::Averaged;
pub use average::Averaging;
pub use bin::Bin;
pub use bin::BinRange;
pub use bin::Binned;
pub use bin::Binning;
pub use bin::Class;
pub use count::Count;
pub use count::Counted;
pub use count::Counting;
pub use cut::Cut;
pub use cut::Cutted;
pub use cut::Cutting;
pub use deviate::Deviate;
pub use deviate::Deviated;
pub use deviate::Deviating;
pub use fraction::Fraction;
pub use fraction::Fractioned;
pub use fraction::Fractioning;
pub use index::Index;
pub use index::Indexed;
pub use index::Indexing;
pub use label::Label;
pub use label::Labeled;
pub use label::Labeling;
pub use minmax::Maximize;
pub use minmax::Maximized;
pub use minmax::Maximizing;
pub use minmax::Minimize;
pub use minmax::Minimized;
pub use minmax::Minimizing;
pub use sum::Sum;
pub use sum::Summed;
pub use sum::Summing;

