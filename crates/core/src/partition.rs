//! Splitting the todo list into balanced, order-stable chunks

use crate::types::{WorkItem, WorkSet};

/// Batches of this size or smaller are always checked by a single worker
pub const SERIAL_THRESHOLD: usize = 10;

/// Whether `items` modules are worth spreading over `workers` workers.
///
/// Starting a worker has a fixed cost, which small batches do not earn back.
pub fn should_partition(items: usize, workers: usize) -> bool {
    workers >= 2 && items > SERIAL_THRESHOLD
}

/// Splits `todo` into at most `workers` chunks after removing `pre_checks`.
///
/// The remainder is sorted by path first, which keeps modules from the same
/// folder together. Every chunk gets `n / workers` items and the first
/// `n % workers` chunks get one extra, so chunk sizes differ by at most one.
/// No chunk is ever empty; an empty todo list yields no chunks.
pub fn partition(todo: &[WorkItem], pre_checks: &[WorkItem], workers: usize) -> Vec<WorkSet> {
    let mut remainder: Vec<WorkItem> = todo
        .iter()
        .filter(|item| !pre_checks.contains(item))
        .cloned()
        .collect();
    remainder.sort();
    remainder.dedup();

    if remainder.is_empty() {
        return Vec::new();
    }

    let workers = workers.clamp(1, remainder.len());
    let base = remainder.len() / workers;
    let extra = remainder.len() % workers;

    let mut chunks = Vec::with_capacity(workers);
    let mut items = remainder.into_iter();
    for index in 0..workers {
        let size = base + usize::from(index < extra);
        chunks.push(items.by_ref().take(size).collect());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn items(names: &[&str]) -> Vec<WorkItem> {
        names.iter().map(|n| WorkItem::new(*n)).collect()
    }

    fn names(set: &WorkSet) -> Vec<String> {
        set.items().iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_example_with_pre_check() {
        let todo = items(&["D.rsc", "B.rsc", "A.rsc", "C.rsc"]);
        let chunks = partition(&todo, &items(&["A.rsc"]), 2);

        assert_eq!(chunks.len(), 2);
        assert_eq!(names(&chunks[0]), vec!["B.rsc", "C.rsc"]);
        assert_eq!(names(&chunks[1]), vec!["D.rsc"]);
    }

    #[test]
    fn test_remainder_goes_to_first_chunks() {
        let todo: Vec<WorkItem> = (0..11).map(|i| WorkItem::new(format!("m{i:02}.rsc"))).collect();
        let chunks = partition(&todo, &[], 4);

        let sizes: Vec<usize> = chunks.iter().map(WorkSet::len).collect();
        assert_eq!(sizes, vec![3, 3, 3, 2]);
        assert_eq!(names(&chunks[0]), vec!["m00.rsc", "m01.rsc", "m02.rsc"]);
        assert_eq!(names(&chunks[3]), vec!["m09.rsc", "m10.rsc"]);
    }

    #[test]
    fn test_more_workers_than_items() {
        let chunks = partition(&items(&["b", "a", "c"]), &[], 8);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn test_empty_todo_list_yields_no_chunks() {
        assert!(partition(&[], &[], 4).is_empty());
        assert!(partition(&items(&["A"]), &items(&["A"]), 4).is_empty());
    }

    #[test]
    fn test_zero_workers_means_one_chunk() {
        let chunks = partition(&items(&["b", "a"]), &[], 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(names(&chunks[0]), vec!["a", "b"]);
    }

    #[test]
    fn test_union_is_todo_minus_pre_checks() {
        let todo: Vec<WorkItem> = (0..137)
            .map(|i| WorkItem::new(format!("/src/pkg{}/M{}.rsc", i % 7, i)))
            .collect();
        let pre_checks = vec![todo[3].clone(), todo[50].clone(), WorkItem::new("/src/Other.rsc")];

        for workers in 1..=12 {
            let chunks = partition(&todo, &pre_checks, workers);

            let mut seen = HashSet::new();
            for chunk in &chunks {
                assert!(!chunk.is_empty());
                for item in chunk {
                    assert!(seen.insert(item.clone()), "{item} appears twice");
                    assert!(!pre_checks.contains(item));
                }
            }
            assert_eq!(seen.len(), todo.len() - 2);

            let sizes: Vec<usize> = chunks.iter().map(WorkSet::len).collect();
            let max = sizes.iter().max().copied().unwrap_or(0);
            let min = sizes.iter().min().copied().unwrap_or(0);
            assert!(max - min <= 1);
        }
    }

    #[test]
    fn test_should_partition() {
        assert!(!should_partition(150, 1));
        assert!(!should_partition(10, 4));
        assert!(should_partition(11, 2));
    }
}
