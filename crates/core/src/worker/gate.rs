use parking_lot::{Condvar, Mutex};

/// Counting gate that holds parallel chunks back until the pre-check is done.
///
/// Starts closed with zero permits. The pre-check worker releases one permit
/// per waiting chunk (plus one spare) when its output is complete, and each
/// chunk takes a permit before it starts checking.
#[derive(Debug, Default)]
pub struct PrePhaseGate {
    permits: Mutex<usize>,
    available: Condvar,
}

impl PrePhaseGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release(&self, permits: usize) {
        let mut available = self.permits.lock();
        *available += permits;
        self.available.notify_all();
    }

    /// Blocks until a permit is available and takes it
    pub fn acquire(&self) {
        let mut available = self.permits.lock();
        while *available == 0 {
            self.available.wait(&mut available);
        }
        *available -= 1;
    }

    pub fn available(&self) -> usize {
        *self.permits.lock()
    }
}

/// Releases permits on a gate when dropped, even if the holder panics
#[must_use = "the gate is released when this guard is dropped"]
pub struct GateRelease<'a> {
    gate: &'a PrePhaseGate,
    permits: usize,
}

impl<'a> GateRelease<'a> {
    pub fn new(gate: &'a PrePhaseGate, permits: usize) -> Self {
        Self { gate, permits }
    }
}

impl Drop for GateRelease<'_> {
    fn drop(&mut self) {
        self.gate.release(self.permits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_waiters_start_only_after_release() {
        let gate = PrePhaseGate::new();
        let released = AtomicBool::new(false);
        let started = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..3 {
                s.spawn(|| {
                    gate.acquire();
                    assert!(released.load(Ordering::SeqCst));
                    started.fetch_add(1, Ordering::SeqCst);
                });
            }

            std::thread::sleep(Duration::from_millis(50));
            assert_eq!(started.load(Ordering::SeqCst), 0);

            released.store(true, Ordering::SeqCst);
            gate.release(4);
        });

        assert_eq!(started.load(Ordering::SeqCst), 3);
        assert_eq!(gate.available(), 1);
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let gate = PrePhaseGate::new();

        let result = std::thread::scope(|s| {
            s.spawn(|| {
                let _release = GateRelease::new(&gate, 2);
                panic!("pre-check blew up");
            })
            .join()
        });

        assert!(result.is_err());
        gate.acquire();
        gate.acquire();
        assert_eq!(gate.available(), 0);
    }
}
