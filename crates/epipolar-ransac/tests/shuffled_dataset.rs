use epipolar_ransac::ShuffledDataset;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn sample_and_remaining_cover_dataset_for_every_size() {
    let mut rng = StdRng::seed_from_u64(5);

    for len in [0, 1, 7, 8, 9, 64] {
        let mut dataset = ShuffledDataset::new((0..len).collect::<Vec<usize>>(), 8);

        for _ in 0..10 {
            dataset.shuffle(&mut rng);

            let sample = dataset.sample();
            let remaining = dataset.remaining();
            assert_eq!(sample.len(), len.min(8));
            assert_eq!(sample.len() + remaining.len(), len);

            let mut seen = vec![false; len];
            for &i in sample.iter().chain(remaining) {
                assert!(!seen[i], "index {i} appears twice");
                seen[i] = true;
            }
            assert!(seen.iter().all(|&s| s));
        }
    }
}

#[test]
fn shuffling_changes_the_sample() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut dataset = ShuffledDataset::new((0..100).collect::<Vec<u32>>(), 8);
    let initial = dataset.sample().to_vec();

    let changed = (0..5).any(|_| {
        dataset.shuffle(&mut rng);
        dataset.sample() != initial.as_slice()
    });
    assert!(changed);
}
