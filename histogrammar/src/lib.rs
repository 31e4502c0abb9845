/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Composable, mergeable statistical aggregators.
//!
//! A **container** summarizes a stream of data: a count, a sum, a
//! histogram, a cut. Containers nest (a histogram of sums, a cut around a
//! histogram, an efficiency as a fraction of two histograms, a labeled
//! family of plots), combine associatively across partitions of a
//! dataset, and serialize to a self-describing JSON envelope
//! `{"type", "data"}`.
//!
//! # Quick Start
//!
//! ```rust
//! use histogrammar::Aggregator;
//! use histogrammar::Container;
//! use histogrammar::Factory;
//! use histogrammar::Quantity;
//! use histogrammar::primitives::Bin;
//! use histogrammar::primitives::Binned;
//! use histogrammar::primitives::Count;
//! use histogrammar::primitives::Counted;
//!
//! let length = Quantity::new(|s: &str| s.len() as f64);
//!
//! // One accumulator per partition...
//! let mut left = Bin::ing(5, 0.5, 5.5, length, Count::ing()).unwrap();
//! let mut right = left.zero();
//! left.fill("hello", 1.0).unwrap();
//! right.fill("hey", 1.0).unwrap();
//! right.fill("there", 1.0).unwrap();
//!
//! // ...merged into the result over the whole dataset.
//! let all = left.combine(&right).unwrap().snapshot();
//! assert_eq!(all.entries(), 3.0);
//!
//! // Snapshots round-trip through JSON.
//! assert_eq!(Binned::<Counted>::decode(&all.encode()).unwrap(), all);
//! ```
//!
//! # Core Concepts
//!
//! - [`Container`]: identity (`zero`), `combine`, structural equality and
//!   encoding. Every container type satisfies it.
//! - [`Aggregator`]: the accumulating facet, which owns the user functions
//!   and mutates in place through `fill`.
//! - [`Factory`]: decoding. Typed decoding knows the expected shape at
//!   compile time; [`registry::decode`] produces an [`AnyContainer`] for
//!   documents of unknown shape.
//!
//! Behavior that is not part of the algebra itself (how strictly fragments
//! are checked, how integral floats are written) is read from the layered
//! [`config`].

pub mod config;
mod container;
mod error;
mod function;
pub mod json;
pub mod primitives;
pub mod registry;

/// Property-based generators for randomized test input.
#[cfg(test)]
pub mod strategy;

pub use container::combine_all;
pub use container::Aggregator;
pub use container::Container;
pub use container::Factory;
pub use container::Kind;
pub use error::ContainerError;
pub use function::Quantity;
pub use function::Selection;
pub use function::UserFn;
pub use registry::AnyContainer;

/// The version of this library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
