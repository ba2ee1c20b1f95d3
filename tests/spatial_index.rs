// SPDX-License-Identifier: BSD-3-Clause

use figurer::SpatialIndex;

#[test]
fn closest_point_wins_by_squared_euclidean_distance() {
    let mut index = SpatialIndex::new();
    index.add(101, vec![10.0, 20.0, 30.0]).unwrap();
    index.add(102, vec![20.0, 30.0, 40.0]).unwrap();
    index.add(103, vec![30.0, 40.0, 50.0]).unwrap();
    index.add(104, vec![40.0, 20.0, 30.0]).unwrap();
    index.add(105, vec![20.0, 40.0, 30.0]).unwrap();

    let (id, point) = index.closest(&[41.0, 19.0, 29.0]).unwrap();
    assert_eq!(id, 104);
    assert_eq!(point, vec![40.0, 20.0, 30.0]);
}
