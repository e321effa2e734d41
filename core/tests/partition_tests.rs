use cv_core::{partition, Dataset};
use proptest::prelude::*;

proptest! {
    #[test]
    fn partitions_cover_dataset_exactly_once(
        (n_elements, n_workers) in (1usize..5000).prop_flat_map(|n| (Just(n), 1usize..=n.min(64)))
    ) {
        let table = partition(n_elements, n_workers).unwrap();
        prop_assert_eq!(table.workers(), n_workers);

        let mut expected_start = 0;
        for (rank, part) in table.iter().enumerate() {
            prop_assert_eq!(part.rank, rank);
            prop_assert_eq!(part.start, expected_start);
            prop_assert!(part.len > 0);
            expected_start = part.end();
        }
        prop_assert_eq!(expected_start, n_elements);

        let base = n_elements / n_workers;
        for part in table.iter().take(n_workers - 1) {
            prop_assert_eq!(part.len, base);
        }
        prop_assert_eq!(table.get(n_workers - 1).unwrap().len, base + n_elements % n_workers);
    }

    #[test]
    fn gather_inverts_scatter(
        data in prop::collection::vec(any::<u8>(), 1..2000),
        workers in 1usize..16,
    ) {
        prop_assume!(workers <= data.len());
        let table = partition(data.len(), workers).unwrap();
        let segments = Dataset::new(data.clone()).scatter(&table).unwrap();
        for (part, segment) in table.iter().zip(&segments) {
            prop_assert_eq!(segment.as_slice(), &data[part.range()]);
        }
        let gathered = Dataset::gather(segments, &table).unwrap();
        prop_assert_eq!(gathered.into_inner(), data);
    }
}

#[test]
fn test_worker_count_above_length_is_configuration_error() {
    let err = partition(4, 5).unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("5 workers"));
}
