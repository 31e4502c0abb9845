/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Decoding without knowing the container type at compile time.
//!
//! Every kind links a [`KindInfo`] into the binary; [`decode`] reads the
//! envelope's `type`, looks it up, and produces an [`AnyContainer`].
//! Nested fragments (inside `Bin`, `Cut`, `Fraction`, `Label` and
//! `Index`) decode as `AnyContainer`s too, so any tree of registered kinds
//! decodes:
//!
//! ```rust
//! use histogrammar::AnyContainer;
//! use histogrammar::registry;
//! use serde_json::json;
//!
//! let json = json!({
//!     "type": "Cut",
//!     "data": {"entries": 4, "type": "Sum", "data": {"entries": 3, "sum": 6}}
//! });
//! let AnyContainer::Cut(cut) = registry::decode(&json).unwrap() else {
//!     panic!("expected a Cut");
//! };
//! assert!(matches!(cut.value(), AnyContainer::Sum(_)));
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use serde_json::Value;

use crate::container::Container;
use crate::container::Factory;
use crate::container::Kind;
use crate::error::ContainerError;
use crate::json;
use crate::primitives::Averaged;
use crate::primitives::Binned;
use crate::primitives::Counted;
use crate::primitives::Cutted;
use crate::primitives::Deviated;
use crate::primitives::Fractioned;
use crate::primitives::Indexed;
use crate::primitives::Labeled;
use crate::primitives::Maximized;
use crate::primitives::Minimized;
use crate::primitives::Summed;

/// A histogram whose every sub-container is dynamically typed.
pub type AnyBinned = Binned<AnyContainer, AnyContainer, AnyContainer, AnyContainer>;

/// A cut around a dynamically typed container.
pub type AnyCutted = Cutted<AnyContainer>;

pub type AnyFractioned = Fractioned<AnyContainer>;

pub type AnyLabeled = Labeled<AnyContainer>;

pub type AnyIndexed = Indexed<AnyContainer>;

/// A snapshot of any registered kind.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyContainer {
    Count(Counted),
    Sum(Summed),
    Average(Averaged),
    Deviate(Deviated),
    Minimize(Minimized),
    Maximize(Maximized),
    Bin(Box<AnyBinned>),
    Cut(Box<AnyCutted>),
    Fraction(Box<AnyFractioned>),
    Label(AnyLabeled),
    Index(AnyIndexed),
}

macro_rules! any_container_arms {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for AnyContainer {
                fn from(value: $ty) -> Self {
                    AnyContainer::$variant(value.into())
                }
            }

            inventory::submit! {
                KindInfo {
                    name: <$ty as Kind>::NAME,
                    decode: decode_as::<$ty>,
                }
            }
        )*

        impl Container for AnyContainer {
            fn kind_name(&self) -> &'static str {
                match self {
                    $(AnyContainer::$variant(x) => x.kind_name(),)*
                }
            }

            fn entries(&self) -> f64 {
                match self {
                    $(AnyContainer::$variant(x) => x.entries(),)*
                }
            }

            fn name(&self) -> Option<&str> {
                match self {
                    $(AnyContainer::$variant(x) => x.name(),)*
                }
            }

            fn zero(&self) -> Self {
                match self {
                    $(AnyContainer::$variant(x) => AnyContainer::$variant(x.zero().into()),)*
                }
            }

            fn combine(&self, other: &Self) -> Result<Self, ContainerError> {
                match (self, other) {
                    $(
                        (AnyContainer::$variant(x), AnyContainer::$variant(y)) => {
                            Ok(AnyContainer::$variant(x.combine(y)?.into()))
                        }
                    )*
                    _ => {
                        tracing::debug!(
                            left = self.kind_name(),
                            right = other.kind_name(),
                            "refusing to combine different kinds",
                        );
                        Err(ContainerError::shape(
                            self.kind_name(),
                            format!("cannot combine with `{}`", other.kind_name()),
                        ))
                    }
                }
            }

            fn encode_fragment(&self) -> Value {
                match self {
                    $(AnyContainer::$variant(x) => x.encode_fragment(),)*
                }
            }
        }
    };
}

any_container_arms! {
    Count(Counted),
    Sum(Summed),
    Average(Averaged),
    Deviate(Deviated),
    Minimize(Minimized),
    Maximize(Maximized),
    Bin(AnyBinned),
    Cut(AnyCutted),
    Fraction(AnyFractioned),
    Label(AnyLabeled),
    Index(AnyIndexed),
}

impl Factory for AnyContainer {
    fn decode_tagged(kind: &str, fragment: &Value) -> Result<Self, ContainerError> {
        let info = KindInfo::get(kind).ok_or_else(|| ContainerError::UnknownKind {
            name: kind.to_string(),
        })?;
        tracing::trace!(kind, "decoding registered kind");
        (info.decode)(fragment)
    }
}

/// A registered kind: its name and how to decode its fragment.
#[derive(Debug)]
pub struct KindInfo {
    /// The kind name, as written in the `type` field of an envelope.
    pub name: &'static str,
    /// Decode a fragment of this kind.
    pub decode: fn(&Value) -> Result<AnyContainer, ContainerError>,
}

impl KindInfo {
    /// The registration for `name`, if any.
    pub fn get(name: &str) -> Option<&'static KindInfo> {
        KINDS.get(name).copied()
    }
}

inventory::collect!(KindInfo);

static KINDS: LazyLock<HashMap<&'static str, &'static KindInfo>> = LazyLock::new(|| {
    inventory::iter::<KindInfo>()
        .map(|info| (info.name, info))
        .collect()
});

fn decode_as<T>(fragment: &Value) -> Result<AnyContainer, ContainerError>
where
    T: Kind + Into<AnyContainer>,
{
    T::decode_fragment(fragment).map(Into::into)
}

/// Decode an envelope of any registered kind.
pub fn decode(json: &Value) -> Result<AnyContainer, ContainerError> {
    let (kind, data) = json::open_envelope(json)?;
    AnyContainer::decode_tagged(kind, data)
}

/// The names of every registered kind, sorted.
pub fn kinds() -> Vec<&'static str> {
    let mut names: Vec<_> = KINDS.keys().copied().collect();
    names.sort_unstable();
    names
}
