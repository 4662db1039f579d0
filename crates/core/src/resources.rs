//! Host resource probing and worker-count estimation
//!
//! The checker is memory hungry: every worker gets a fixed budget and we never
//! plan more workers than the machine can hold in physical memory, nor more
//! than it has logical processors.

use std::sync::OnceLock;
use sysinfo::System;
use tracing::{debug, info};

/// Memory every checker process is assumed to need (decimal gigabytes)
pub const WORKER_MEMORY_BUDGET: u64 = 2 * 1000 * 1000 * 1000;

/// Upper bound for the heap of a single spawned process, in KiB
pub const MAX_HEAP_KIB: u64 = 2 * 1024 * 1024 * 1024 / 1024;

/// Snapshot of the host metrics the estimator looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostResources {
    pub logical_cores: usize,
    pub total_memory_bytes: u64,
}

impl HostResources {
    pub fn new(logical_cores: usize, total_memory_bytes: u64) -> Self {
        Self {
            logical_cores,
            total_memory_bytes,
        }
    }

    /// Reads the logical processor count and total physical memory.
    ///
    /// Memory in use can be swapped out, so the total is what matters,
    /// not what happens to be free right now.
    pub fn detect() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_all();

        let logical_cores = match system.cpus().len() {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        };

        Self {
            logical_cores,
            total_memory_bytes: system.total_memory(),
        }
    }

    /// Number of workers whose memory budget fits in physical memory
    pub fn memory_ceiling(&self) -> u64 {
        self.total_memory_bytes / WORKER_MEMORY_BUDGET
    }
}

/// Number of workers that can run side by side without thrashing.
///
/// Never returns 0, and never more than `requested_max` (when that is at least 1).
pub fn estimate_worker_count(host: &HostResources, requested_max: usize) -> usize {
    if host.logical_cores < 2 {
        return 1;
    }

    let ceiling = usize::try_from(host.memory_ceiling()).unwrap_or(usize::MAX);
    let estimate = host.logical_cores.min(ceiling).min(requested_max);

    if estimate < 2 { 1 } else { estimate }
}

/// Heap ceiling for one of `concurrency` processes running side by side.
///
/// 90% of total memory is shared among the processes (10% is left for the
/// OS), and no single process gets more than [`MAX_HEAP_KIB`].
pub fn heap_ceiling_kib(host: &HostResources, concurrency: usize) -> u64 {
    let concurrency = concurrency.max(1) as u64;
    let share = 9 * (host.total_memory_bytes / (1000 * concurrency * 10));
    share.min(MAX_HEAP_KIB)
}

/// Probes the host once and estimates worker counts against it.
///
/// Probing the host is slow on some platforms, and the answer does not change
/// during a build. The estimate itself is recomputed for every requested maximum.
#[derive(Debug, Default)]
pub struct ResourceEstimator {
    host: OnceLock<HostResources>,
}

impl ResourceEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimator with fixed host metrics instead of probing
    pub fn with_host(host: HostResources) -> Self {
        let estimator = Self::default();
        let _ = estimator.host.set(host);
        estimator
    }

    pub fn host(&self) -> HostResources {
        *self.host.get_or_init(|| {
            let host = HostResources::detect();
            info!("Logical processor count: {}", host.logical_cores);
            info!("Available memory: {} kilobytes", host.total_memory_bytes / 1000);
            info!(
                "Number of 2G processors for this amount of memory: {}",
                host.memory_ceiling()
            );
            host
        })
    }

    pub fn estimate(&self, requested_max: usize) -> usize {
        let estimate = estimate_worker_count(&self.host(), requested_max);
        debug!(
            "Max number of processors requested: {}, final estimate: {}",
            requested_max, estimate
        );
        estimate
    }

    pub fn heap_ceiling_kib(&self, concurrency: usize) -> u64 {
        heap_ceiling_kib(&self.host(), concurrency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GB: u64 = 1000 * 1000 * 1000;

    #[test]
    fn test_single_core_is_serial() {
        let host = HostResources::new(1, 64 * GB);
        assert_eq!(estimate_worker_count(&host, 8), 1);
    }

    #[test]
    fn test_memory_bounds_the_estimate() {
        let host = HostResources::new(16, 6 * GB);
        assert_eq!(estimate_worker_count(&host, 8), 3);
    }

    #[test]
    fn test_cores_bound_the_estimate() {
        let host = HostResources::new(4, 64 * GB);
        assert_eq!(estimate_worker_count(&host, 8), 4);
    }

    #[test]
    fn test_requested_max_bounds_the_estimate() {
        let host = HostResources::new(32, 128 * GB);
        assert_eq!(estimate_worker_count(&host, 6), 6);
    }

    #[test]
    fn test_not_enough_memory_for_two_workers() {
        let host = HostResources::new(8, 3 * GB);
        assert_eq!(estimate_worker_count(&host, 8), 1);

        let tiny = HostResources::new(8, GB / 2);
        assert_eq!(estimate_worker_count(&tiny, 8), 1);
    }

    #[test]
    fn test_estimate_is_always_within_bounds() {
        for cores in 0..20 {
            for memory in [0, GB, 2 * GB, 5 * GB, 17 * GB, 200 * GB] {
                for requested in 1..10 {
                    let host = HostResources::new(cores, memory);
                    let estimate = estimate_worker_count(&host, requested);
                    assert!(estimate >= 1);
                    assert!(estimate <= requested);
                }
            }
        }
    }

    #[test]
    fn test_zero_requested_still_yields_one() {
        let host = HostResources::new(8, 64 * GB);
        assert_eq!(estimate_worker_count(&host, 0), 1);
    }

    #[test]
    fn test_heap_ceiling_is_capped() {
        let host = HostResources::new(8, 64 * GB);
        assert_eq!(heap_ceiling_kib(&host, 1), MAX_HEAP_KIB);
    }

    #[test]
    fn test_heap_ceiling_shares_memory() {
        let host = HostResources::new(8, 4 * GB);
        // 4 GB over 4 processes, 90% of it: 900_000 kB each
        assert_eq!(heap_ceiling_kib(&host, 4), 900_000);
        assert_eq!(heap_ceiling_kib(&host, 0), heap_ceiling_kib(&host, 1));
    }

    #[test]
    fn test_estimator_honours_every_requested_max() {
        let estimator = ResourceEstimator::with_host(HostResources::new(8, 64 * GB));
        assert_eq!(estimator.estimate(8), 8);
        assert_eq!(estimator.estimate(2), 2);
        assert_eq!(estimator.estimate(4), 4);
        assert_eq!(estimator.host().logical_cores, 8);
    }
}
