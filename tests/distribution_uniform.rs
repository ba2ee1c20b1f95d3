// SPDX-License-Identifier: BSD-3-Clause

use figurer::base::distribution::uniform;
use rand::{rngs::SmallRng, SeedableRng};

#[test]
fn density_matches_box_membership() {
    let dist = uniform(vec![7.0, 9.0, -4.0, -1.0]).unwrap();
    assert_eq!(dist.density(&[8.0, -3.0]), 1.0);
    assert_eq!(dist.density(&[8.0, 1.0]), 0.0);
    assert_eq!(dist.density(&[6.0, -3.0]), 0.0);
}

#[test]
fn seeded_samples_stay_in_box_and_cover_both_halves() {
    let dist = uniform(vec![7.0, 9.0, -4.0, -1.0]).unwrap();
    let mut rng = SmallRng::seed_from_u64(123);

    let mut saw_low_half = false;
    let mut saw_high_half = false;
    for _ in 0..20 {
        let sample = dist.sample(&mut rng).unwrap();
        assert_eq!(dist.density(&sample), 1.0);
        if sample[0] < 8.0 {
            saw_low_half = true;
        } else {
            saw_high_half = true;
        }
    }
    assert!(saw_low_half);
    assert!(saw_high_half);
}
