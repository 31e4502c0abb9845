/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! User-supplied functions from a datum to a number.

use std::fmt;
use std::sync::Arc;

use crate::error::ContainerError;

type Callable<D> = dyn Fn(&D) -> anyhow::Result<f64> + Send + Sync;

/// A shareable function `&D -> f64` that may fail.
///
/// Accumulators clone these freely: [`crate::Container::zero`] and
/// [`crate::Container::combine`] hand the same functions to the
/// accumulator they return.
pub struct UserFn<D: ?Sized> {
    f: Arc<Callable<D>>,
    name: Option<Arc<str>>,
}

/// Extracts the observable from a datum.
pub type Quantity<D> = UserFn<D>;

/// Produces a weight multiplier from a datum.
pub type Selection<D> = UserFn<D>;

impl<D: ?Sized + 'static> UserFn<D> {
    /// Wrap an infallible function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&D) -> f64 + Send + Sync + 'static,
    {
        Self {
            f: Arc::new(move |datum: &D| Ok(f(datum))),
            name: None,
        }
    }

    /// Wrap a function that can fail.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(&D) -> anyhow::Result<f64> + Send + Sync + 'static,
    {
        Self {
            f: Arc::new(f),
            name: None,
        }
    }

    /// A predicate as a 0/1 weight.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&D) -> bool + Send + Sync + 'static,
    {
        Self::new(move |datum| if f(datum) { 1.0 } else { 0.0 })
    }

    /// The constant 1.0: every datum counts with its full weight.
    pub fn unweighted() -> Self {
        Self::new(|_| 1.0).named("unweighted")
    }
}

impl<D: ?Sized> UserFn<D> {
    /// Attach a name, used only for diagnostics.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(Arc::from(name));
        self
    }

    /// The name, if one was attached.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Evaluate on `datum`, mapping failures to
    /// [`ContainerError::UserFunction`].
    pub fn call(&self, datum: &D) -> Result<f64, ContainerError> {
        (self.f)(datum).map_err(ContainerError::UserFunction)
    }
}

impl<D: ?Sized> Clone for UserFn<D> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
            name: self.name.clone(),
        }
    }
}

impl<D: ?Sized + 'static> Default for UserFn<D> {
    fn default() -> Self {
        Self::unweighted()
    }
}

impl<D: ?Sized> fmt::Debug for UserFn<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "UserFn({name})"),
            None => write!(f, "UserFn(<anonymous>)"),
        }
    }
}
