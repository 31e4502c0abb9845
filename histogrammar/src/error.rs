/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Errors raised while constructing, combining, filling and decoding
//! containers.

/// Everything that can go wrong in the container algebra.
///
/// Errors are always reported at the call site; the engine never retries
/// and never corrects a bad value silently.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("invalid range [{low}, {high}): need finite low < high with a finite width")]
    InvalidRange { low: f64, high: f64 },

    #[error("values must have at least one element")]
    EmptyValues,

    #[error("entries ({entries}) cannot be negative")]
    NegativeEntries { entries: f64 },

    #[error("cannot combine {kind}: {reason}")]
    ShapeMismatch { kind: &'static str, reason: String },

    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch { expected: String, found: String },

    #[error("wrong JSON format for {context}: {json}")]
    MalformedFragment { context: String, json: String },

    #[error("unrecognized container `{name}` (is it registered?)")]
    UnknownKind { name: String },

    #[error("user function failed: {0}")]
    UserFunction(#[source] anyhow::Error),
}

impl ContainerError {
    pub(crate) fn malformed(context: impl Into<String>, json: &serde_json::Value) -> Self {
        ContainerError::MalformedFragment {
            context: context.into(),
            json: json.to_string(),
        }
    }

    pub(crate) fn shape(kind: &'static str, reason: impl Into<String>) -> Self {
        ContainerError::ShapeMismatch {
            kind,
            reason: reason.into(),
        }
    }

    pub(crate) fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        ContainerError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Fails with [`ContainerError::NegativeEntries`] unless `entries >= 0`.
pub(crate) fn check_entries(entries: f64) -> Result<f64, ContainerError> {
    if entries < 0.0 {
        Err(ContainerError::NegativeEntries { entries })
    } else {
        Ok(entries)
    }
}
