//! Partitioned reduction built on the bulk contract: agents fold disjoint
//! slices into partial sums, a sequential pass folds the partials.

use agentry::{Executor, ForkJoinExecutor, SequentialExecutor};

const PARTITION: usize = 128;

fn parallel_sum<E: Executor>(exec: &E, data: Vec<u64>) -> u64 {
    let len = data.len();
    let partitions = len.div_ceil(PARTITION);
    let partials: Vec<u64> = exec.bulk_execute_collect(
        |i, data: &Vec<u64>| {
            let first = i * PARTITION;
            let last = (first + PARTITION).min(data.len());
            data[first..last].iter().sum()
        },
        partitions,
        data,
    );
    partials.into_iter().sum()
}

#[test]
fn partitioned_sum_matches_a_plain_fold() {
    let data: Vec<u64> = (0..10_000).map(|i| i * 3 + 1).collect();
    let expected: u64 = data.iter().sum();
    assert_eq!(parallel_sum(&ForkJoinExecutor::new(), data.clone()), expected);
    assert_eq!(parallel_sum(&SequentialExecutor::new(), data), expected);
}

#[test]
fn ragged_final_partition_is_summed_too() {
    // 10_050 is not a multiple of the partition size.
    let data: Vec<u64> = (0..10_050).collect();
    let expected: u64 = data.iter().sum();
    assert_eq!(parallel_sum(&ForkJoinExecutor::new(), data), expected);
}

#[test]
fn empty_input_sums_to_zero() {
    assert_eq!(parallel_sum(&ForkJoinExecutor::new(), Vec::new()), 0);
}
