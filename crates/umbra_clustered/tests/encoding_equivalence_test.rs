//! Integration test: wide and narrow encodings decode identically.

use glam::{Vec2, Vec4};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use umbra_clustered::{
    ClusterConfig, ClusterIndexStorage, ClusterLayout, ClusterLightIndexResolver,
    NarrowClusterStorage, WideClusterStorage,
};

/// Random cluster contents sized to fit the narrow limits.
fn random_clusters(seed: u64, clusters: usize) -> Vec<(Vec<u32>, Vec<u32>)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..clusters)
        .map(|_| {
            let points = (0..rng.gen_range(0..4)).map(|_| rng.gen_range(0..256)).collect();
            let spots = (0..rng.gen_range(0..3)).map(|_| rng.gen_range(0..256)).collect();
            (points, spots)
        })
        .collect()
}

fn build<S: ClusterIndexStorage + Default>(
    clusters: &[(Vec<u32>, Vec<u32>)],
) -> ClusterLightIndexResolver<S> {
    let mut resolver = ClusterLightIndexResolver::new(S::default());
    for (points, spots) in clusters {
        resolver.push_cluster(points, spots).unwrap();
    }
    resolver
}

#[test]
fn test_wide_and_narrow_decode_identically() {
    let clusters = random_clusters(0xC1_u64, 3000);
    let wide = build::<WideClusterStorage>(&clusters);
    let narrow = build::<NarrowClusterStorage>(&clusters);

    assert_eq!(wide.n_indices(), narrow.n_indices());
    for (cluster, (points, spots)) in clusters.iter().enumerate() {
        let cluster = cluster as u32;
        let range = wide.decode(cluster);

        assert_eq!(range, narrow.decode(cluster));
        assert!(range.first_point_light_index <= range.first_spot_light_index);
        assert!(range.first_spot_light_index <= range.last_clusterable_index);

        assert_eq!(&wide.point_lights(cluster).collect::<Vec<_>>(), points);
        assert_eq!(&narrow.point_lights(cluster).collect::<Vec<_>>(), points);
        assert_eq!(&narrow.spot_lights(cluster).collect::<Vec<_>>(), spots);
    }
    for flat in 0..wide.n_indices() as u32 {
        assert_eq!(wide.lookup(flat), narrow.lookup(flat));
    }
}

#[test]
fn test_ranges_are_contiguous() {
    let clusters = random_clusters(7, 500);
    let narrow = build::<NarrowClusterStorage>(&clusters);

    let mut expected_start = 0;
    for cluster in 0..clusters.len() as u32 {
        let range = narrow.decode(cluster);
        assert_eq!(range.first_point_light_index, expected_start);
        expected_start = range.last_clusterable_index;
    }
    assert_eq!(expected_start as usize, narrow.n_indices());
}

#[test]
fn test_z_slice_is_monotonic_in_depth() {
    let layout = ClusterLayout::new(&ClusterConfig::default(), Vec4::new(0.0, 0.0, 1920.0, 1080.0))
        .unwrap();

    let mut previous = 0;
    let mut depth = 0.01f32;
    while depth < 5000.0 {
        let slice = layout.view_z_to_z_slice(-depth, false);
        assert!(slice >= previous, "slice went from {previous} to {slice} at depth {depth}");
        assert!(slice < layout.dimensions().z);
        previous = slice;
        depth *= 1.01;
    }
    assert_eq!(previous, layout.dimensions().z - 1);
}

#[test]
fn test_locate_stays_in_range() {
    let layout = ClusterLayout::new(&ClusterConfig::default(), Vec4::new(0.0, 0.0, 1920.0, 1080.0))
        .unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for _ in 0..10_000 {
        let frag = Vec2::new(rng.gen_range(-10.0..2000.0), rng.gen_range(-10.0..1100.0));
        let view_z = -rng.gen_range(0.0..10_000.0f32);
        let orthographic = rng.gen_bool(0.5);
        assert!(layout.locate(frag, view_z, orthographic) < layout.cluster_count());
    }
}
