//! Order independence and determinism of frame evaluation.

use std::sync::Mutex;

use approx::assert_relative_eq;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rx_frame::{ColumnSet, Frame, JaggedCol};

fn random_events(n: usize, seed: u64) -> ColumnSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let x: Vec<f64> = (0..n).map(|_| rng.random_range(-50.0..50.0)).collect();
    let w: Vec<f64> = (0..n).map(|_| rng.random_range(0.0..3.0)).collect();
    let k: Vec<i64> = (0..n).map(|_| rng.random_range(0..5)).collect();
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|_| {
            let len = rng.random_range(0..4);
            (0..len).map(|_| rng.random_range(0.0..1.0)).collect()
        })
        .collect();
    ColumnSet::new()
        .with_column("x", x)
        .unwrap()
        .with_column("w", w)
        .unwrap()
        .with_column("k", k)
        .unwrap()
        .with_column("trk", JaggedCol::from_rows(&rows))
        .unwrap()
}

proptest! {
    #[test]
    fn filter_order_does_not_matter(seed in 0u64..1000, perm in 0usize..6) {
        let base = Frame::new(random_events(3000, seed)).with_chunk_size(257);
        let cuts: [(&str, fn(&Frame) -> Frame); 3] = [
            ("x", |f| f.filter_expr("x > -10").unwrap()),
            ("k", |f| f.filter_expr("k != 2").unwrap()),
            ("trk", |f| f.filter("trk", &["trk"], |r| r.jagged(0).iter().any(|&v| v > 0.5)).unwrap()),
        ];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        let chain = |order: &[usize; 3]| order.iter().fold(base.clone(), |f, &i| (cuts[i].1)(&f));
        let reference = chain(&orders[0]);
        let other = chain(&orders[perm]);

        prop_assert_eq!(reference.count(), other.count());
        prop_assert_eq!(reference.take_f64("x").unwrap(), other.take_f64("x").unwrap());
        prop_assert_eq!(reference.sum("w").unwrap().to_bits(), other.sum("w").unwrap().to_bits());
    }

    #[test]
    fn sums_are_reproducible(seed in 0u64..1000, chunk in 1usize..600) {
        let events = random_events(2000, seed);
        let a = Frame::new(events.clone()).with_chunk_size(chunk).filter_expr("x > 0").unwrap();
        let b = Frame::new(events).with_chunk_size(chunk).filter_expr("x > 0").unwrap();
        prop_assert_eq!(a.sum("w").unwrap().to_bits(), b.sum("w").unwrap().to_bits());
        prop_assert_eq!(a.sum("w").unwrap().to_bits(), a.sum("w").unwrap().to_bits());
    }
}

#[test]
fn for_each_sees_every_surviving_entry() {
    let events = random_events(20_000, 7);
    let frame = Frame::new(events).filter_expr("k >= 1").unwrap();
    let expected = frame.take_f64("w").unwrap();

    let seen = Mutex::new(Vec::new());
    frame
        .for_each(&["w", "k"], |r| {
            assert!(r.i64(1) >= 1);
            seen.lock().unwrap().push(r.f64(0));
        })
        .unwrap();

    let mut seen = seen.into_inner().unwrap();
    let mut expected_sorted = expected.clone();
    seen.sort_by(f64::total_cmp);
    expected_sorted.sort_by(f64::total_cmp);
    assert_eq!(seen, expected_sorted);
    assert_relative_eq!(seen.iter().sum::<f64>(), frame.sum("w").unwrap(), max_relative = 1e-12);
}

#[test]
fn derived_views_share_the_source() {
    let base = Frame::new(random_events(1000, 3));
    let views: Vec<Frame> = (0..4)
        .map(|i| base.filter_expr(&format!("k == {i}")).unwrap())
        .collect();
    let total: u64 = views.iter().map(Frame::count).sum();
    let k4 = base.filter_expr("k == 4").unwrap().count();
    assert_eq!(total + k4, 1000);
    assert_eq!(base.count(), 1000);
}
