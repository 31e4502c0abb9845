/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Property-based generators for containers and datasets.
//!
//! Data are small integers (plus the occasional NaN), so every sum the
//! containers compute is exact and most of the algebra laws can be
//! checked with structural equality. Means and variances are divided by
//! entries, so their associativity is checked to a relative tolerance.
//!
//! This module is only included in test builds (`#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::config::global;
    use crate::function::Quantity;
    use crate::function::Selection;
    use crate::json::exact;
    use crate::registry;
    use crate::Aggregator;
    use crate::Factory;

    /// Equal to a few ulps, relative to the larger magnitude.
    fn close(x: f64, y: f64) -> bool {
        exact(x, y) || (x - y).abs() <= 1e-12 * x.abs().max(y.abs()).max(1.0)
    }

    /// `zero` is a two-sided identity and `combine` commutes.
    fn check_identity_and_symmetry<C>(a: &C, b: &C) -> Result<(), TestCaseError>
    where
        C: Container + std::fmt::Debug,
    {
        prop_assert_eq!(&a.combine(&a.zero()).unwrap(), a);
        prop_assert_eq!(&a.zero().combine(a).unwrap(), a);
        prop_assert_eq!(a.combine(b).unwrap(), b.combine(a).unwrap());
        Ok(())
    }

    /// `combine` is associative, exactly.
    fn check_associativity<C>(a: &C, b: &C, c: &C) -> Result<(), TestCaseError>
    where
        C: Container + std::fmt::Debug,
    {
        prop_assert_eq!(
            a.combine(b).unwrap().combine(c).unwrap(),
            a.combine(&b.combine(c).unwrap()).unwrap()
        );
        Ok(())
    }

    proptest! {
        #[test]
        fn partitioned_fills_combine_to_one_pass((data, i, j) in gen_partition(32)) {
            let x = Quantity::new(|x: &f64| *x);
            let empty = Cut::ing(
                Selection::predicate(|x: &f64| *x > 0.0),
                Bin::ing(5, 0.0, 10.0, x.clone(), Sum::ing(x)).unwrap(),
            );

            let mut whole = empty.clone();
            whole.fill_all(&data).unwrap();

            let mut parts = [empty.clone(), empty.clone(), empty];
            parts[0].fill_all(&data[..i]).unwrap();
            parts[1].fill_all(&data[i..j]).unwrap();
            parts[2].fill_all(&data[j..]).unwrap();

            let left = parts[0].combine(&parts[1]).unwrap().combine(&parts[2]).unwrap();
            let right = parts[0].combine(&parts[1].combine(&parts[2]).unwrap()).unwrap();
            prop_assert_eq!(&left, &whole);
            prop_assert_eq!(&right, &whole);
            prop_assert_eq!(whole.entries(), data.len() as f64);
        }

        #[test]
        fn count_laws(a in gen_counted(), b in gen_counted(), c in gen_counted()) {
            check_identity_and_symmetry(&a, &b)?;
            check_associativity(&a, &b, &c)?;
        }

        #[test]
        fn sum_laws(a in gen_summed(), b in gen_summed(), c in gen_summed()) {
            check_identity_and_symmetry(&a, &b)?;
            check_associativity(&a, &b, &c)?;
        }

        #[test]
        fn average_laws(a in gen_averaged(), b in gen_averaged(), c in gen_averaged()) {
            check_identity_and_symmetry(&a, &b)?;
            let left = a.combine(&b).unwrap().combine(&c).unwrap();
            let right = a.combine(&b.combine(&c).unwrap()).unwrap();
            prop_assert_eq!(left.entries(), right.entries());
            prop_assert!(left.entries() == 0.0 || close(left.mean(), right.mean()));
        }

        #[test]
        fn deviate_laws(a in gen_deviated(), b in gen_deviated(), c in gen_deviated()) {
            check_identity_and_symmetry(&a, &b)?;
            let left = a.combine(&b).unwrap().combine(&c).unwrap();
            let right = a.combine(&b.combine(&c).unwrap()).unwrap();
            prop_assert_eq!(left.entries(), right.entries());
            if left.entries() > 0.0 {
                prop_assert!(close(left.mean(), right.mean()));
                prop_assert!(
                    (left.variance() - right.variance()).abs()
                        <= 1e-9 * left.variance().abs().max(1.0)
                );
            }
        }

        #[test]
        fn extremum_laws(
            a in gen_minimized(), b in gen_minimized(), c in gen_minimized(),
            x in gen_maximized(), y in gen_maximized(), z in gen_maximized()
        ) {
            check_identity_and_symmetry(&a, &b)?;
            check_associativity(&a, &b, &c)?;
            check_identity_and_symmetry(&x, &y)?;
            check_associativity(&x, &y, &z)?;
        }

        #[test]
        fn bin_laws(a in gen_binned(4), b in gen_binned(4), c in gen_binned(4)) {
            check_identity_and_symmetry(&a, &b)?;
            check_associativity(&a, &b, &c)?;
        }

        #[test]
        fn cut_laws(a in gen_cutted(3), b in gen_cutted(3), c in gen_cutted(3)) {
            check_identity_and_symmetry(&a, &b)?;
            check_associativity(&a, &b, &c)?;
        }

        #[test]
        fn fraction_laws(a in gen_fractioned(), b in gen_fractioned(), c in gen_fractioned()) {
            check_identity_and_symmetry(&a, &b)?;
            check_associativity(&a, &b, &c)?;
        }

        #[test]
        fn label_and_index_identity(
            a in gen_labeled(), b in gen_labeled(),
            x in gen_indexed(3), y in gen_indexed(3)
        ) {
            check_identity_and_symmetry(&a, &b)?;
            check_identity_and_symmetry(&x, &y)?;
        }

        #[test]
        fn bins_of_different_shape_do_not_combine(a in gen_binned(4), b in gen_binned(5)) {
            prop_assert!(a.combine(&b).is_err());
        }

        #[test]
        fn snapshots_round_trip(a in gen_binned(4), c in gen_cutted(2)) {
            let _config = global::lock();
            prop_assert_eq!(Binned::<Counted>::decode(&a.encode()).unwrap(), a.clone());
            prop_assert_eq!(Cutted::<Binned<Summed>>::decode(&c.encode()).unwrap(), c.clone());

            let dynamic = registry::decode(&c.encode()).unwrap();
            prop_assert_eq!(dynamic.encode(), c.encode());
        }

        #[test]
        fn groupings_round_trip(
            f in gen_fractioned(), l in gen_labeled(), i in gen_indexed(2)
        ) {
            let _config = global::lock();
            prop_assert_eq!(Fractioned::<Summed>::decode(&f.encode()).unwrap(), f.clone());
            prop_assert_eq!(Labeled::<Averaged>::decode(&l.encode()).unwrap(), l.clone());
            prop_assert_eq!(Indexed::<Deviated>::decode(&i.encode()).unwrap(), i.clone());
            for json in [f.encode(), l.encode(), i.encode()] {
                prop_assert_eq!(registry::decode(&json).unwrap().encode(), json);
            }
        }
    }
}
