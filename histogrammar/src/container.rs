/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The contracts every container satisfies.
//!
//! - [`Container`]: the combination algebra (identity, combine,
//!   structural equality) plus serialization to a JSON fragment.
//! - [`Aggregator`]: the mutable facet that accepts data through
//!   [`Aggregator::fill`].
//! - [`Kind`] / [`Factory`]: decoding a fragment or an envelope back to a
//!   value of a known type.

use serde_json::Value;

use crate::error::ContainerError;
use crate::json;

// Container

/// A **container**: a commutative monoid of statistics, partial over
/// shape.
///
/// `combine` is only defined between containers of matching shape
/// (same binning parameters, same nested kinds); otherwise it fails with
/// [`ContainerError::ShapeMismatch`].
///
/// Laws (not enforced by type system), for `a`, `b`, `c` of one shape:
///
/// - **Identity**: `a.combine(&a.zero()) == a == a.zero().combine(&a)`
/// - **Commutative**: `a.combine(&b) == b.combine(&a)`
/// - **Associative**:
///   `a.combine(&b)?.combine(&c) == a.combine(&b.combine(&c)?)`
///
/// # Example
///
/// ```rust
/// use histogrammar::Container;
/// use histogrammar::primitives::Count;
///
/// let one = Count::ed(1.0).unwrap();
/// let two = Count::ed(2.0).unwrap();
/// assert_eq!(one.combine(&two).unwrap(), Count::ed(3.0).unwrap());
/// assert_eq!(one.combine(&one.zero()).unwrap(), one);
/// ```
pub trait Container: Sized + PartialEq {
    /// Stable identifier used to tag this container in JSON.
    fn kind_name(&self) -> &'static str;

    /// Accumulated weight.
    fn entries(&self) -> f64;

    /// The name of the function this container summarizes, when it has
    /// one and it was named. Written as the fragment's `name`.
    fn name(&self) -> Option<&str> {
        None
    }

    /// The identity element: same shape, every statistic reset.
    fn zero(&self) -> Self;

    /// Combine two containers of matching shape.
    fn combine(&self, other: &Self) -> Result<Self, ContainerError>;

    /// In-place combine.
    fn combine_assign(&mut self, other: &Self) -> Result<(), ContainerError> {
        *self = self.combine(other)?;
        Ok(())
    }

    /// Deep structural equality, including nested containers.
    fn equals(&self, other: &Self) -> bool {
        self == other
    }

    /// An equal, independent value.
    fn copy(&self) -> Result<Self, ContainerError> {
        self.combine(&self.zero())
    }

    /// The kind-specific payload, without the envelope.
    fn encode_fragment(&self) -> Value;

    /// `{"type": kind_name, "data": fragment}`.
    fn encode(&self) -> Value {
        json::envelope(self.kind_name(), self.encode_fragment())
    }
}

/// Combine every container of an iterator. Returns `None` for an empty
/// iterator, since an identity cannot be produced without a shape.
pub fn combine_all<C, I>(containers: I) -> Result<Option<C>, ContainerError>
where
    C: Container,
    I: IntoIterator<Item = C>,
{
    let mut iter = containers.into_iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    iter.try_fold(first, |acc, x| acc.combine(&x)).map(Some)
}

/// The name of a combination. Unnamed containers combine with anything;
/// two names must agree.
pub(crate) fn combine_names(
    kind: &'static str,
    left: &Option<String>,
    right: &Option<String>,
) -> Result<Option<String>, ContainerError> {
    match (left, right) {
        (Some(l), Some(r)) if l != r => {
            tracing::debug!(kind, left = %l, right = %r, "refusing to combine different names");
            Err(ContainerError::shape(
                kind,
                format!("names differ (`{l}` vs `{r}`)"),
            ))
        }
        (Some(name), _) | (None, Some(name)) => Ok(Some(name.clone())),
        (None, None) => Ok(None),
    }
}

/// Fails unless there is at least one child and every child is of the
/// same kind.
pub(crate) fn check_uniform<'a, C, I>(kind: &'static str, children: I) -> Result<(), ContainerError>
where
    C: Container + 'a,
    I: IntoIterator<Item = &'a C>,
{
    let mut children = children.into_iter();
    let first = children.next().ok_or(ContainerError::EmptyValues)?;
    match children.find(|child| child.kind_name() != first.kind_name()) {
        Some(odd) => Err(ContainerError::shape(
            kind,
            format!(
                "values mix `{}` and `{}`",
                first.kind_name(),
                odd.kind_name()
            ),
        )),
        None => Ok(()),
    }
}

/// The name every child has, if they all have the same one.
pub(crate) fn shared_name<'a, C, I>(children: I) -> Option<&'a str>
where
    C: Container + 'a,
    I: IntoIterator<Item = &'a C>,
{
    let mut names = children.into_iter().map(|child| child.name());
    let first = names.next()??;
    names.all(|name| name == Some(first)).then_some(first)
}

// Aggregator

/// The accumulating facet of a container: it carries the functions
/// needed to process data, and mutates in place.
///
/// `fill` is atomic: if a user-supplied function fails, the error is
/// returned and the accumulator is left exactly as it was. Every
/// implementation evaluates its functions before touching its own state.
///
/// `fill` takes `&mut self`, so an accumulator has one writer at a time.
/// Parallel ingestion fills one accumulator per partition and merges the
/// results with [`Container::combine`].
pub trait Aggregator<D: ?Sized>: Container {
    /// The closure-free facet with the same statistics.
    type Snapshot: Factory;

    /// Add `datum` with `weight`.
    fn fill(&mut self, datum: &D, weight: f64) -> Result<(), ContainerError>;

    /// Freeze the statistics into a snapshot.
    fn snapshot(&self) -> Self::Snapshot;

    /// Fill every datum with weight 1.0, stopping at the first failure.
    fn fill_all<'a, I>(&mut self, data: I) -> Result<(), ContainerError>
    where
        D: 'a,
        I: IntoIterator<Item = &'a D>,
    {
        for datum in data {
            self.fill(datum, 1.0)?;
        }
        Ok(())
    }
}

// Kind / Factory

/// A container type that has exactly one kind name.
pub trait Kind: Container {
    /// The kind name; equal to `kind_name()` of every value.
    const NAME: &'static str;

    /// Parse a kind-specific fragment.
    fn decode_fragment(fragment: &Value) -> Result<Self, ContainerError>;
}

/// Decoding from JSON.
///
/// Every [`Kind`] is a `Factory` that accepts only its own name;
/// [`crate::registry::AnyContainer`] accepts every registered name.
pub trait Factory: Container {
    /// Decode a fragment whose declared kind is `kind`.
    fn decode_tagged(kind: &str, fragment: &Value) -> Result<Self, ContainerError>;

    /// Decode a `{"type", "data"}` envelope.
    fn decode(json: &Value) -> Result<Self, ContainerError> {
        let (kind, data) = json::open_envelope(json)?;
        Self::decode_tagged(kind, data)
    }
}

impl<T: Kind> Factory for T {
    fn decode_tagged(kind: &str, fragment: &Value) -> Result<Self, ContainerError> {
        if kind != T::NAME {
            return Err(ContainerError::type_mismatch(T::NAME, kind));
        }
        T::decode_fragment(fragment)
    }
}

/// Decode a fragment declared as `kind`, then check that what was
/// decoded really is a `kind`.
pub(crate) fn decode_declared<C: Factory>(
    kind: &str,
    fragment: &Value,
) -> Result<C, ContainerError> {
    let value = C::decode_tagged(kind, fragment)?;
    if value.kind_name() != kind {
        return Err(ContainerError::type_mismatch(kind, value.kind_name()));
    }
    Ok(value)
}
