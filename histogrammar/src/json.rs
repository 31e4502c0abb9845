/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! JSON helpers shared by every container's codec.
//!
//! Floats are not always representable as JSON numbers: NaN and the
//! infinities are written as the strings `"nan"`, `"inf"` and `"-inf"`.
//! Integral values are written as integers (see
//! [`crate::config::Config::integral_as_integer`]) so that documents
//! produced by other implementations re-encode to the same value.

use std::borrow::Cow;

use serde_json::Map;
use serde_json::Value;

use crate::config;
use crate::error::ContainerError;

/// Largest magnitude below which every integer is exactly an `f64`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Encode a float.
pub fn float_to_json(x: f64) -> Value {
    if x.is_nan() {
        Value::String("nan".to_string())
    } else if x == f64::INFINITY {
        Value::String("inf".to_string())
    } else if x == f64::NEG_INFINITY {
        Value::String("-inf".to_string())
    } else if config::global::get().integral_as_integer
        && x.fract() == 0.0
        && x.abs() < MAX_EXACT_INTEGER
        && !(x == 0.0 && x.is_sign_negative())
    {
        Value::from(x as i64)
    } else {
        Value::from(x)
    }
}

/// Decode a float written by [`float_to_json`] (or any JSON number).
pub fn float_from_json(json: &Value) -> Option<f64> {
    match json {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.as_str() {
            "nan" => Some(f64::NAN),
            "inf" => Some(f64::INFINITY),
            "-inf" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

/// Float equality under which NaN equals NaN.
pub fn exact(x: f64, y: f64) -> bool {
    (x.is_nan() && y.is_nan()) || x == y
}

/// The smaller of two floats, ignoring NaN unless both are NaN.
pub fn minplus(x: f64, y: f64) -> f64 {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => f64::NAN,
        (true, false) => y,
        (false, true) => x,
        (false, false) => x.min(y),
    }
}

/// The larger of two floats, ignoring NaN unless both are NaN.
pub fn maxplus(x: f64, y: f64) -> f64 {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => f64::NAN,
        (true, false) => y,
        (false, true) => x,
        (false, false) => x.max(y),
    }
}

/// Wrap a fragment in the `{"type", "data"}` envelope.
pub fn envelope(kind: &str, data: Value) -> Value {
    let mut map = Map::new();
    map.insert("type".to_string(), Value::String(kind.to_string()));
    map.insert("data".to_string(), data);
    Value::Object(map)
}

/// Split an envelope into its declared kind and its fragment.
pub fn open_envelope(json: &Value) -> Result<(&str, &Value), ContainerError> {
    let fields = Fields::parse(json, "Factory", &["type", "data"], &[])?;
    Ok((fields.str("type")?, fields.value("data")?))
}

/// Add `key: value` to an object fragment when there is a value.
pub(crate) fn maybe_add(mut fragment: Value, key: &str, value: Option<&str>) -> Value {
    if let (Value::Object(map), Some(value)) = (&mut fragment, value) {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    fragment
}

/// Drop a child fragment's `name`; its parent records it once for all
/// of its children.
pub(crate) fn without_name(mut fragment: Value) -> Value {
    if let Value::Object(map) = &mut fragment {
        map.remove("name");
    }
    fragment
}

/// A child fragment carrying the name its parent recorded, unless it
/// names itself.
pub(crate) fn with_parent_name<'a>(fragment: &'a Value, name: Option<&str>) -> Cow<'a, Value> {
    match (fragment, name) {
        (Value::Object(map), Some(name)) if !map.contains_key("name") => {
            let mut map = map.clone();
            map.insert("name".to_string(), Value::String(name.to_string()));
            Cow::Owned(Value::Object(map))
        }
        _ => Cow::Borrowed(fragment),
    }
}

/// A JSON object whose key set has been checked against what a decoder
/// expects.
///
/// Required keys must be present. Optional keys may be present. Any
/// other key is a [`ContainerError::MalformedFragment`] unless
/// [`crate::config::Config::strict_keys`] is off, in which case it is
/// ignored.
pub(crate) struct Fields<'a> {
    json: &'a Value,
    map: &'a Map<String, Value>,
    context: &'static str,
}

impl<'a> Fields<'a> {
    pub(crate) fn parse(
        json: &'a Value,
        context: &'static str,
        required: &[&str],
        optional: &[&str],
    ) -> Result<Self, ContainerError> {
        let Value::Object(map) = json else {
            return Err(ContainerError::malformed(context, json));
        };
        if required.iter().any(|key| !map.contains_key(*key)) {
            return Err(ContainerError::malformed(context, json));
        }
        let unknown: Vec<&str> = map
            .keys()
            .map(String::as_str)
            .filter(|key| !required.contains(key) && !optional.contains(key))
            .collect();
        if !unknown.is_empty() {
            if config::global::get().strict_keys {
                return Err(ContainerError::malformed(context, json));
            }
            tracing::warn!(context, ?unknown, "ignoring unknown keys");
        }
        Ok(Self { json, map, context })
    }

    pub(crate) fn value(&self, key: &str) -> Result<&'a Value, ContainerError> {
        self.map
            .get(key)
            .ok_or_else(|| ContainerError::malformed(self.context, self.json))
    }

    pub(crate) fn float(&self, key: &str) -> Result<f64, ContainerError> {
        let value = self.value(key)?;
        float_from_json(value)
            .ok_or_else(|| ContainerError::malformed(format!("{}.{}", self.context, key), value))
    }

    pub(crate) fn str(&self, key: &str) -> Result<&'a str, ContainerError> {
        let value = self.value(key)?;
        value
            .as_str()
            .ok_or_else(|| ContainerError::malformed(format!("{}.{}", self.context, key), value))
    }

    /// An optional string: absent and `null` are both `None`.
    pub(crate) fn optional_str(&self, key: &str) -> Result<Option<&'a str>, ContainerError> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(value) => Err(ContainerError::malformed(
                format!("{}.{}", self.context, key),
                value,
            )),
        }
    }

    pub(crate) fn array(&self, key: &str) -> Result<&'a Vec<Value>, ContainerError> {
        let value = self.value(key)?;
        value
            .as_array()
            .ok_or_else(|| ContainerError::malformed(format!("{}.{}", self.context, key), value))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::global;
    use crate::config::ConfigLayer;

    #[test]
    fn non_finite_floats_are_strings() {
        assert_eq!(float_to_json(f64::NAN), json!("nan"));
        assert_eq!(float_to_json(f64::INFINITY), json!("inf"));
        assert_eq!(float_to_json(f64::NEG_INFINITY), json!("-inf"));

        assert!(float_from_json(&json!("nan")).unwrap().is_nan());
        assert_eq!(float_from_json(&json!("-inf")), Some(f64::NEG_INFINITY));
        assert_eq!(float_from_json(&json!("one")), None);
        assert_eq!(float_from_json(&json!(null)), None);
    }

    #[test]
    fn integral_floats_follow_config() {
        let config = global::lock();
        assert_eq!(float_to_json(3.0), json!(3));
        assert_eq!(float_to_json(2.5), json!(2.5));
        assert_eq!(float_to_json(-0.0), json!(-0.0));

        let _guard = config.override_config(ConfigLayer {
            integral_as_integer: Some(false),
            ..Default::default()
        });
        assert_eq!(float_to_json(3.0), json!(3.0));
    }

    #[test]
    fn exact_treats_nan_as_equal() {
        assert!(exact(f64::NAN, f64::NAN));
        assert!(exact(1.0, 1.0));
        assert!(!exact(1.0, f64::NAN));
    }

    #[test]
    fn minplus_and_maxplus_skip_nan() {
        assert_eq!(minplus(f64::NAN, 3.0), 3.0);
        assert_eq!(maxplus(2.0, f64::NAN), 2.0);
        assert_eq!(minplus(2.0, 3.0), 2.0);
        assert_eq!(maxplus(2.0, 3.0), 3.0);
        assert!(minplus(f64::NAN, f64::NAN).is_nan());
    }

    #[test]
    fn fields_reject_missing_and_unknown_keys() {
        let _config = global::lock();
        let json = json!({"entries": 1, "sum": 2});
        assert!(Fields::parse(&json, "Sum", &["entries", "sum"], &[]).is_ok());
        assert!(matches!(
            Fields::parse(&json, "Sum", &["entries", "sum", "mean"], &[]),
            Err(ContainerError::MalformedFragment { .. })
        ));
        assert!(matches!(
            Fields::parse(&json, "Count", &["entries"], &[]),
            Err(ContainerError::MalformedFragment { .. })
        ));
        assert!(Fields::parse(&json!(3), "Sum", &[], &[]).is_err());
    }

    #[tracing_test::traced_test]
    #[test]
    fn lenient_fields_warn_on_unknown_keys() {
        let config = global::lock();
        let _guard = config.override_config(ConfigLayer {
            strict_keys: Some(false),
            ..Default::default()
        });
        let json = json!({"entries": 1, "extra": true});
        let fields = Fields::parse(&json, "Count", &["entries"], &[]).unwrap();
        assert_eq!(fields.float("entries").unwrap(), 1.0);
        assert!(logs_contain("ignoring unknown keys"));
    }

    #[test]
    fn names_are_optional_strings() {
        let _config = global::lock();
        let json = json!({"entries": 1, "name": "x", "values:name": null});
        let fields = Fields::parse(&json, "Sum", &["entries"], &["name", "values:name"]).unwrap();
        assert_eq!(fields.optional_str("name").unwrap(), Some("x"));
        assert_eq!(fields.optional_str("values:name").unwrap(), None);
        assert_eq!(fields.optional_str("other").unwrap(), None);

        let json = json!({"entries": 1, "name": 3});
        let fields = Fields::parse(&json, "Sum", &["entries"], &["name"]).unwrap();
        assert!(matches!(
            fields.optional_str("name"),
            Err(ContainerError::MalformedFragment { .. })
        ));
    }

    #[test]
    fn parent_names_fill_in_for_children() {
        let child = json!({"entries": 1, "sum": 2});
        assert_eq!(
            *with_parent_name(&child, Some("y")),
            json!({"entries": 1, "sum": 2, "name": "y"})
        );
        let named = json!({"entries": 1, "sum": 2, "name": "own"});
        assert_eq!(*with_parent_name(&named, Some("y")), named);
        assert_eq!(*with_parent_name(&json!(3), Some("y")), json!(3));

        assert_eq!(without_name(named), child);
        assert_eq!(maybe_add(child.clone(), "name", None), child);
        assert_eq!(maybe_add(json!(3), "name", Some("x")), json!(3));
    }

    #[test]
    fn envelope_round_trips() {
        let json = envelope("Count", json!(2));
        assert_eq!(json, json!({"type": "Count", "data": 2}));
        let (kind, data) = open_envelope(&json).unwrap();
        assert_eq!(kind, "Count");
        assert_eq!(data, &json!(2));
        assert!(open_envelope(&json!({"type": 3, "data": 2})).is_err());
    }
}
