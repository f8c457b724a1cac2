//! Unit tests for route ordering.

use super::*;
use crate::cache::DistanceCache;
use crate::domain::{Coordinates, Stop, StopStatus};
use crate::geodesic::DistanceMetric;

fn p(lat: f64, lng: f64) -> Coordinates {
    Coordinates::new(lat, lng).unwrap()
}

fn ids(route: &OrderedRoute) -> Vec<&str> {
    route.stops.iter().map(|s| s.stop.id.as_str()).collect()
}

fn indices(route: &OrderedRoute) -> Vec<u32> {
    route.stops.iter().map(|s| s.stop.order_index).collect()
}

fn order(stops: Vec<Stop>, origin: Coordinates, cluster: bool) -> OrderedRoute {
    let cache = DistanceCache::default();
    let config = OrderConfig::default();
    RouteOrderer::new(&cache, &config).order(stops, origin, cluster)
}

#[test]
fn empty_input_is_empty_output() {
    let route = order(Vec::new(), p(0.0, 0.0), true);
    assert!(route.is_empty());
    assert_eq!(route.len(), 0);
}

#[test]
fn single_stop() {
    let route = order(vec![Stop::new("a", "A").at(1.0, 1.0)], p(0.0, 0.0), false);
    assert_eq!(ids(&route), vec!["a"]);
    assert_eq!(indices(&route), vec![1]);
}

#[test]
fn origin_stop_then_near_then_unlocated() {
    let origin = p(16.8833, 99.1250);
    let stops = vec![
        Stop::new("C", "No coords"),
        Stop::new("B", "About 2 km").at(16.90, 99.14),
        Stop::new("A", "At origin").at(16.8833, 99.1250),
    ];

    let route = order(stops, origin, false);

    assert_eq!(ids(&route), vec!["A", "B", "C"]);
    assert_eq!(indices(&route), vec![1, 2, 3]);
    assert_eq!(route.stops[0].distance_km, Some(0.0));
    let b = route.stops[1].distance_km.unwrap();
    assert!(b > 2.0 && b < 3.0, "got {b}");
    assert_eq!(route.stops[2].distance_km, None);
    assert_eq!(route.origin, origin);
}

#[test]
fn near_pair_clusters_ahead_of_far_stop() {
    let origin = p(0.0, 0.0);
    // Near pair about 0.3 km apart, roughly 1 km out; far stop about 5 km out.
    let near_a = Stop::new("near-a", "Near A").at(0.0, 0.009);
    let near_b = Stop::new("near-b", "Near B").at(0.0, 0.0117);
    let far = Stop::new("far", "Far").at(0.045, 0.0);

    for stops in [
        vec![far.clone(), near_a.clone(), near_b.clone()],
        vec![near_b.clone(), far.clone(), near_a.clone()],
    ] {
        let route = order(stops, origin, true);
        assert_eq!(ids(&route), vec!["near-a", "near-b", "far"]);
        assert_eq!(route.stops[0].cluster, Some(0));
        assert_eq!(route.stops[1].cluster, Some(0));
        assert_eq!(route.stops[2].cluster, Some(1));
        assert!(route.clustered);
    }
}

#[test]
fn clustering_pulls_neighbour_ahead_of_interleaved_stop() {
    let origin = p(0.0, 0.0);
    let stops = vec![
        Stop::new("n1", "N1").at(0.0, 0.009),     // ~1.00 km
        Stop::new("n2", "N2").at(0.0, 0.0117),    // ~1.30 km, 0.3 km from n1
        Stop::new("f", "F").at(0.00995, 0.0),     // ~1.10 km, far from both
    ];

    let plain = order(stops.clone(), origin, false);
    assert_eq!(ids(&plain), vec!["n1", "f", "n2"]);
    assert!(plain.stops.iter().all(|s| s.cluster.is_none()));

    let clustered = order(stops, origin, true);
    assert_eq!(ids(&clustered), vec!["n1", "n2", "f"]);
    assert_eq!(indices(&clustered), vec![1, 2, 3]);
}

#[test]
fn equal_distances_keep_input_order() {
    let origin = p(0.0, 0.0);
    let stops = vec![
        Stop::new("x", "X").at(0.0, 0.01),
        Stop::new("y", "Y").at(0.0, 0.01),
        Stop::new("w", "W").at(0.0, 0.005),
        Stop::new("z", "Z").at(0.0, 0.01),
    ];

    let route = order(stops, origin, false);
    assert_eq!(ids(&route), vec!["w", "x", "y", "z"]);
}

#[test]
fn unlocated_sorted_by_reason_then_name() {
    let reported = |id: &str, name: &str, reason: &str| {
        let mut s = Stop::new(id, name);
        s.status = StopStatus::Reported {
            reason: reason.to_string(),
        };
        s
    };

    let stops = vec![
        reported("1", "Zed", "wrong address"),
        reported("2", "Amy", "wrong address"),
        reported("3", "Bob", "nobody home"),
        Stop::new("4", "Located").at(0.0, 0.0),
    ];

    let route = order(stops, p(0.0, 0.0), true);
    assert_eq!(ids(&route), vec!["4", "3", "2", "1"]);
}

#[test]
fn invalid_coordinates_treated_as_unlocated() {
    let stops = vec![
        Stop::new("bad", "Bad").at(123.0, 0.0),
        Stop::new("good", "Good").at(0.5, 0.5),
    ];

    let route = order(stops, p(0.0, 0.0), false);
    assert_eq!(ids(&route), vec!["good", "bad"]);
    assert_eq!(route.stops[1].distance_km, None);
}

#[test]
fn reuses_cache_across_runs() {
    let cache = DistanceCache::default();
    let config = OrderConfig::default();
    let orderer = RouteOrderer::new(&cache, &config);
    let stops = vec![
        Stop::new("a", "A").at(0.0, 0.01),
        Stop::new("b", "B").at(0.0, 0.02),
    ];

    orderer.order(stops.clone(), p(0.0, 0.0), false);
    let misses = cache.misses();
    orderer.order(stops, p(0.0, 0.0), false);

    assert_eq!(cache.misses(), misses);
    assert_eq!(cache.hits(), 2);
}

#[test]
fn incoming_order_index_is_overwritten() {
    let mut a = Stop::new("a", "A").at(0.0, 0.02);
    a.order_index = 7;
    let mut b = Stop::new("b", "B").at(0.0, 0.01);
    b.order_index = 7;

    let route = order(vec![a, b], p(0.0, 0.0), false);
    assert_eq!(ids(&route), vec!["b", "a"]);
    assert_eq!(indices(&route), vec![1, 2]);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    /// Stops scattered over a few kilometres so that clusters form.
    fn stops() -> impl Strategy<Value = Vec<Stop>> {
        prop::collection::vec(
            prop::option::weighted(0.8, (16.85f64..16.92, 99.10f64..99.16)),
            0..40,
        )
        .prop_map(|coords| {
            coords
                .into_iter()
                .enumerate()
                .map(|(i, c)| {
                    let stop = Stop::new(format!("s{i:03}"), format!("House {}", i % 7));
                    match c {
                        Some((lat, lng)) => stop.at(lat, lng),
                        None => stop,
                    }
                })
                .collect()
        })
    }

    fn origin() -> impl Strategy<Value = Coordinates> {
        (16.85f64..16.92, 99.10f64..99.16).prop_map(|(lat, lng)| Coordinates { lat, lng })
    }

    fn input_position(stop: &Stop) -> usize {
        stop.id.as_str()[1..].parse().unwrap()
    }

    proptest! {
        #[test]
        fn output_is_permutation_with_dense_indices(
            input in stops(),
            origin in origin(),
            cluster in any::<bool>(),
        ) {
            let route = order(input.clone(), origin, cluster);

            prop_assert_eq!(route.len(), input.len());
            let in_ids: HashSet<_> = input.iter().map(|s| s.id.clone()).collect();
            let out_ids: HashSet<_> = route.stops.iter().map(|s| s.stop.id.clone()).collect();
            prop_assert_eq!(in_ids, out_ids);

            let expected: Vec<u32> = (1..=input.len() as u32).collect();
            prop_assert_eq!(indices(&route), expected);
        }

        #[test]
        fn unlocated_always_last(
            input in stops(),
            origin in origin(),
            cluster in any::<bool>(),
        ) {
            let route = order(input, origin, cluster);
            let first_unlocated = route
                .stops
                .iter()
                .position(|s| s.distance_km.is_none())
                .unwrap_or(route.len());

            prop_assert!(route.stops[first_unlocated..].iter().all(|s| s.distance_km.is_none()));
            prop_assert!(route.stops[..first_unlocated].iter().all(|s| s.stop.coordinates.is_some()));
        }

        #[test]
        fn unclustered_is_sorted_and_stable(input in stops(), origin in origin()) {
            let route = order(input, origin, false);
            let located: Vec<_> = route.stops.iter().filter(|s| s.distance_km.is_some()).collect();

            for pair in located.windows(2) {
                let (a, b) = (pair[0].distance_km.unwrap(), pair[1].distance_km.unwrap());
                prop_assert!(a <= b);
                if a == b {
                    prop_assert!(input_position(&pair[0].stop) < input_position(&pair[1].stop));
                }
            }
        }

        #[test]
        fn cluster_members_within_radius_of_seed(input in stops(), origin in origin()) {
            let route = order(input, origin, true);
            let radius = OrderConfig::default().cluster_radius_km;
            let mut seeds: Vec<(usize, Coordinates)> = Vec::new();

            for s in route.stops.iter().filter(|s| s.distance_km.is_some()) {
                let cluster = s.cluster.unwrap();
                let point = s.stop.coordinates.unwrap();
                match seeds.iter().find(|(c, _)| *c == cluster) {
                    Some((_, seed)) => {
                        let d = DistanceMetric::Vincenty.distance_km(seed, &point);
                        prop_assert!(d <= radius + 1e-9, "member {} km from seed", d);
                    }
                    None => seeds.push((cluster, point)),
                }
            }

            // Clusters appear contiguously and in ascending number.
            let numbers: Vec<usize> = seeds.iter().map(|(c, _)| *c).collect();
            let expected: Vec<usize> = (0..numbers.len()).collect();
            prop_assert_eq!(numbers, expected);
        }

        #[test]
        fn idempotent(input in stops(), origin in origin(), cluster in any::<bool>()) {
            let first = order(input.clone(), origin, cluster);
            let second = order(input, origin, cluster);
            prop_assert_eq!(first, second);
        }
    }
}
