/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! End-to-end behavior through the public API: building accumulators,
//! filling them, merging partitions, and the JSON round trip.

use std::io::Write;

use histogrammar::config::global;
use histogrammar::config::ConfigLayer;
use histogrammar::config::Source;
use histogrammar::primitives::Average;
use histogrammar::primitives::Bin;
use histogrammar::primitives::BinRange;
use histogrammar::primitives::Binned;
use histogrammar::primitives::Count;
use histogrammar::primitives::Counted;
use histogrammar::primitives::Cut;
use histogrammar::primitives::Deviate;
use histogrammar::primitives::Fraction;
use histogrammar::primitives::Index;
use histogrammar::primitives::Label;
use histogrammar::primitives::Maximize;
use histogrammar::primitives::Minimize;
use histogrammar::primitives::Sum;
use histogrammar::primitives::Summed;
use histogrammar::registry;
use histogrammar::Aggregator;
use histogrammar::AnyContainer;
use histogrammar::Container;
use histogrammar::ContainerError;
use histogrammar::Factory;
use histogrammar::Quantity;
use histogrammar::Selection;
use proptest::prelude::*;
use serde_json::json;

fn length() -> Quantity<str> {
    Quantity::new(|s: &str| s.len() as f64).named("length")
}

#[test]
fn counts_add() {
    let three = Count::ed(1.0)
        .unwrap()
        .combine(&Count::ed(2.0).unwrap())
        .unwrap();
    assert_eq!(three, Count::ed(3.0).unwrap());
}

#[test]
fn sums_of_string_lengths() {
    let mut a = Sum::ing(length());
    let mut b = Sum::ing(length());
    a.fill("hello", 1.0).unwrap();
    b.fill_all(["hey", "there"]).unwrap();
    let ab = a.combine(&b).unwrap();
    assert_eq!(ab.entries(), 3.0);
    assert_eq!(ab.sum(), 13.0);
}

#[test]
fn histogram_of_string_lengths() {
    let mut a = Bin::ing(5, 0.5, 5.5, length(), Count::ing()).unwrap();
    a.fill_all(["hello", "hey", "there"]).unwrap();
    let counts: Vec<f64> = a.values().iter().map(Container::entries).collect();
    assert_eq!(counts, vec![0.0, 0.0, 1.0, 0.0, 2.0]);
    for flow in [a.underflow(), a.overflow(), a.nanflow()] {
        assert_eq!(flow.entries(), 0.0);
    }
}

#[test]
#[allow(clippy::approx_constant)]
fn cut_counts_every_attempt() {
    let mut a = Cut::ing(Selection::predicate(|x: &f64| *x > 3.14), Count::ing());
    a.fill_all(&[3.0, 4.0]).unwrap();
    assert_eq!(a.entries(), 2.0);
    assert_eq!(a.value().entries(), 1.0);
    assert_eq!(a.fraction_passing(), Some(0.5));
}

#[test]
fn histograms_of_different_shape_do_not_combine() {
    let a = Bin::ing(5, 0.5, 5.5, length(), Count::ing()).unwrap();
    let b = Bin::ing(6, 0.5, 5.5, length(), Count::ing()).unwrap();
    assert!(matches!(
        a.combine(&b),
        Err(ContainerError::ShapeMismatch { .. })
    ));
}

#[test]
fn sum_json_is_stable() {
    let _config = global::lock();
    let json = json!({"type": "Sum", "data": {"entries": 1, "sum": 1}});
    assert_eq!(Summed::decode(&json).unwrap().encode(), json);
    assert_eq!(registry::decode(&json).unwrap().encode(), json);
}

#[test]
fn boundaries_route_to_the_right_container() {
    let mut a = Bin::ing(5, 0.5, 5.5, Quantity::new(|x: &f64| *x), Count::ing()).unwrap();
    a.fill_all(&[0.5, 5.5, f64::NAN, 0.0]).unwrap();
    assert_eq!(a.at(0).unwrap().entries(), 1.0);
    assert_eq!(a.overflow().entries(), 1.0);
    assert_eq!(a.nanflow().entries(), 1.0);
    assert_eq!(a.underflow().entries(), 1.0);
    assert_eq!(a.range(0), (0.5, 1.5));
}

#[test]
fn nested_profile_round_trips_through_the_registry() {
    let _config = global::lock();
    let x = Quantity::new(|p: &(f64, f64)| p.0);
    let y = Quantity::new(|p: &(f64, f64)| p.1);
    let mut profile = Cut::ing(
        Selection::new(|p: &(f64, f64)| if p.1 >= 0.0 { 1.0 } else { 0.0 }),
        Bin::ing_with_flows(
            4,
            0.0,
            4.0,
            x,
            Sum::ing(y.clone()),
            Average::ing(y.clone()),
            Deviate::ing(y.clone()),
            Minimize::ing(y),
        )
        .unwrap(),
    );
    profile
        .fill_all(&[(0.5, 1.0), (1.5, 2.0), (-1.0, 3.0), (9.0, 4.0), (f64::NAN, 5.0), (2.0, -1.0)])
        .unwrap();

    let snapshot = profile.snapshot();
    assert_eq!(snapshot.entries(), 6.0);
    assert_eq!(snapshot.value().entries(), 5.0);
    assert_eq!(snapshot.value().underflow().mean(), 3.0);
    assert_eq!(snapshot.value().nanflow().min(), 5.0);

    let json = snapshot.encode();
    let AnyContainer::Cut(cut) = registry::decode(&json).unwrap() else {
        panic!("expected a Cut");
    };
    let AnyContainer::Bin(bin) = cut.value() else {
        panic!("expected a Bin");
    };
    assert_eq!(bin.num(), 4);
    assert_eq!(bin.underflow().kind_name(), "Average");
    assert_eq!(bin.overflow().kind_name(), "Deviate");
    assert_eq!(bin.nanflow().kind_name(), "Minimize");
    assert_eq!(AnyContainer::Cut(cut).encode(), json);
}

#[test]
fn extremes_combine_across_partitions() {
    let q = Quantity::new(|x: &f64| *x);
    let mut a = Maximize::ing(q.clone());
    let mut b = Maximize::ing(q);
    a.fill_all(&[1.0, 7.0]).unwrap();
    b.fill_all(&[3.0]).unwrap();
    assert_eq!(a.combine(&b).unwrap().max(), 7.0);
    assert!(b.zero().max().is_nan());
}

#[test]
fn lenient_decoding_accepts_unknown_keys() {
    let config = global::lock();
    let json = json!({"type": "Sum", "data": {"entries": 1, "sum": 1, "extra": 0}});
    assert!(Summed::decode(&json).is_err());

    let _guard = config.override_config(ConfigLayer {
        strict_keys: Some(false),
        ..Default::default()
    });
    assert_eq!(Summed::decode(&json).unwrap(), Sum::ed(1.0, 1.0).unwrap());
}

#[test]
fn file_layer_controls_integer_encoding() {
    let _config = global::lock();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "integral_as_integer: false").unwrap();
    global::init_from_yaml(file.path()).unwrap();

    let encoded = Count::ed(2.0).unwrap().encode();
    global::clear(Source::File);
    assert_eq!(encoded, json!({"type": "Count", "data": 2.0}));
    assert_eq!(
        Count::ed(2.0).unwrap().encode(),
        json!({"type": "Count", "data": 2})
    );
}

#[test]
fn names_follow_the_quantity_through_json() {
    let _config = global::lock();
    let mut a = Bin::ing(5, 0.5, 5.5, length(), Average::ing(length())).unwrap();
    a.fill_all(["hello", "hey"]).unwrap();
    let json = a.snapshot().encode();
    assert_eq!(json["data"]["name"], json!("length"));
    assert_eq!(json["data"]["values:name"], json!("length"));

    let decoded = registry::decode(&json).unwrap();
    assert_eq!(decoded.name(), Some("length"));
    assert_eq!(decoded.encode(), json);

    let size = Quantity::new(|s: &str| s.len() as f64).named("size");
    let other = Bin::ing(5, 0.5, 5.5, size, Average::ing(length())).unwrap();
    assert!(matches!(
        a.combine(&other),
        Err(ContainerError::ShapeMismatch { .. })
    ));
}

#[test]
fn non_positive_weights_change_nothing() {
    let _config = global::lock();
    let mut a = Cut::ing(
        Selection::new(|s: &str| if s.len() > 3 { 1.0 } else { -1.0 }),
        Bin::ing(5, 0.5, 5.5, length(), Count::ing()).unwrap(),
    );
    let empty = a.snapshot();
    for weight in [0.0, -1.0, f64::NAN, f64::NEG_INFINITY] {
        a.fill("hello", weight).unwrap();
        a.fill("hey", weight).unwrap();
    }
    assert_eq!(a, empty);
    assert_eq!(registry::decode(&a.snapshot().encode()).unwrap().entries(), 0.0);
}

#[test]
fn efficiencies_and_families_of_plots() {
    let _config = global::lock();
    let long = Selection::predicate(|s: &str| s.len() > 3);
    let mut efficiency = Fraction::ing(
        long,
        Bin::ing(5, 0.5, 5.5, length(), Count::ing()).unwrap(),
    );
    let twice = Sum::ing(length()).with_selection(Selection::new(|_: &str| 2.0));
    let mut family = Label::ing([
        ("sum".to_string(), Index::ing(vec![Sum::ing(length())]).unwrap()),
        ("twice".to_string(), Index::ing(vec![twice]).unwrap()),
    ])
    .unwrap();
    for word in ["hello", "hey", "there", "a"] {
        efficiency.fill(word, 1.0).unwrap();
        family.fill(word, 1.0).unwrap();
    }
    assert_eq!(efficiency.numerator().entries(), 2.0);
    assert_eq!(efficiency.denominator().entries(), 4.0);
    assert_eq!(family.get("sum").unwrap().at(0).unwrap().sum(), 14.0);
    assert_eq!(family.get("twice").unwrap().at(0).unwrap().sum(), 28.0);

    for json in [efficiency.snapshot().encode(), family.snapshot().encode()] {
        assert_eq!(registry::decode(&json).unwrap().encode(), json);
    }
}

#[test]
fn the_version_is_a_constant() {
    assert_eq!(histogrammar::VERSION, env!("CARGO_PKG_VERSION"));
}

fn gen_lengths() -> impl Strategy<Value = (Vec<String>, usize)> {
    prop::collection::vec("[a-z]{0,8}", 0..24).prop_flat_map(|words| {
        let len = words.len();
        (Just(words), 0..=len)
    })
}

proptest! {
    #[test]
    fn split_histograms_merge_to_the_whole((words, at) in gen_lengths()) {
        let empty = Bin::ing(4, 0.0, 8.0, length(), Sum::ing(length())).unwrap();
        let mut whole = empty.clone();
        let mut left = empty.clone();
        let mut right = empty;
        whole.fill_all(words.iter().map(String::as_str)).unwrap();
        left.fill_all(words[..at].iter().map(String::as_str)).unwrap();
        right.fill_all(words[at..].iter().map(String::as_str)).unwrap();

        let merged = left.combine(&right).unwrap();
        prop_assert_eq!(merged.snapshot(), whole.snapshot());
        prop_assert_eq!(merged.entries(), words.len() as f64);
    }

    #[test]
    fn decoded_histograms_re_encode_identically(counts in prop::collection::vec(0u32..50, 1..8)) {
        let _config = global::lock();
        let values: Vec<Counted> = counts
            .iter()
            .map(|c| Count::ed(f64::from(*c)).unwrap())
            .collect();
        let entries = counts.iter().map(|c| f64::from(*c)).sum();
        let zero = Count::ed(0.0).unwrap();
        let h = Bin::ed(-1.0, 1.0, entries, values, zero, zero, zero).unwrap();
        let json = h.encode();
        prop_assert_eq!(Binned::<Counted>::decode(&json).unwrap().encode(), json.clone());
        prop_assert_eq!(registry::decode(&json).unwrap().encode(), json);
    }
}
