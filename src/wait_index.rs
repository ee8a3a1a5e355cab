//! Per-resource, per-queue wait-index tracking (spec §4.D). Entirely
//! lock-free: every update is an atomic-max CAS retry loop, every read a
//! relaxed atomic load, matching spec §5's "Lock-free operations" list.

use crate::limits::MAX_QUEUES;
use crate::queue::Queue;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

/// Two parallel `read`/`write` wait-index arrays, one entry per queue
/// (spec §4.D). Lives inside a persistent resource's property slot;
/// transient resources have no wait indices (they're never mutated while
/// GPU work is outstanding across a `clear()`).
pub struct WaitIndexTracker {
    read: [AtomicU64; MAX_QUEUES],
    write: [AtomicU64; MAX_QUEUES],
}

impl Default for WaitIndexTracker {
    fn default() -> Self {
        WaitIndexTracker {
            read: Default::default(),
            write: Default::default(),
        }
    }
}

fn atomic_max(cell: &AtomicU64, value: u64) {
    let mut current = cell.load(Ordering::Relaxed);
    while current < value {
        match cell.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(observed) => current = observed,
        }
    }
}

impl WaitIndexTracker {
    /// Atomic-max of `value` against the wait indices implied by `access`
    /// (spec §4.D `set_wait`). CAS-retry on weak compare-exchange, relaxed
    /// ordering, until either `value` is installed or a racing caller has
    /// already installed something `>= value`.
    pub fn set_wait(&self, queue: u8, access: Access, value: u64) {
        let q = queue as usize;
        match access {
            Access::Write => atomic_max(&self.write[q], value),
            Access::Read => atomic_max(&self.read[q], value),
            Access::ReadWrite => {
                atomic_max(&self.write[q], value);
                atomic_max(&self.read[q], value);
            }
        }
    }

    /// Relaxed atomic load of the wait index implied by `access`. For
    /// `ReadWrite` this is the max of the read and write indices. CPU
    /// access under a combined access mode must be safe against either
    /// kind of prior GPU use.
    pub fn get_wait(&self, queue: u8, access: Access) -> u64 {
        let q = queue as usize;
        match access {
            Access::Write => self.write[q].load(Ordering::Relaxed),
            Access::Read => self.read[q].load(Ordering::Relaxed),
            Access::ReadWrite => self.read[q].load(Ordering::Relaxed).max(self.write[q].load(Ordering::Relaxed)),
        }
    }

    /// Spec §4.D: "for every queue `q`, `queue.last_completed_command >=
    /// get_wait(q, access)`."
    pub fn is_available_for_cpu(&self, queues: &[&dyn Queue], access: Access) -> bool {
        queues
            .iter()
            .all(|queue| queue.last_completed_command() >= self.get_wait(queue.index(), access))
    }

    /// Awaits every queue's completion of its outstanding wait index for
    /// `access`. A no-op if the resource was never marked `initialised`
    /// (spec §4.D).
    pub async fn wait_for_cpu_access(&self, queues: &[&dyn Queue], access: Access, initialised: bool) {
        if !initialised {
            return;
        }
        for queue in queues {
            let target = self.get_wait(queue.index(), access);
            queue.wait_for_command_completion(target).await;
        }
    }

    /// True if any wait index exceeds its queue's last-completed command;
    /// used by [`crate::wait_index::WaitIndexTracker::is_known_in_use`]'s
    /// caller alongside the `active_render_graphs` bitmask.
    pub fn has_outstanding_work(&self, queues: &[&dyn Queue]) -> bool {
        queues.iter().any(|queue| {
            let last = queue.last_completed_command();
            let q = queue.index() as usize;
            self.read[q].load(Ordering::Relaxed) > last || self.write[q].load(Ordering::Relaxed) > last
        })
    }

    /// Directly zeroes every wait index. Only safe once a slot is
    /// unreachable from any live handle (its generation was already
    /// bumped); used when a persistent slot is recycled, so a stale wait
    /// index can't leak into the next occupant. This bypasses the
    /// max-only discipline of `set_wait` deliberately; it is not part of
    /// the public "wait index only grows" contract a live resource relies on.
    pub fn reset(&self) {
        for cell in self.read.iter().chain(self.write.iter()) {
            cell.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::test_support::TestQueue;

    #[test]
    fn monotonic_under_concurrent_set_wait() {
        let tracker = WaitIndexTracker::default();
        std::thread::scope(|scope| {
            scope.spawn(|| tracker.set_wait(1, Access::Write, 5));
            scope.spawn(|| tracker.set_wait(1, Access::Write, 3));
        });
        // Scenario S3: regardless of interleaving, the max value wins.
        assert_eq!(tracker.get_wait(1, Access::Write), 5);
    }

    #[test]
    fn set_wait_never_decreases() {
        let tracker = WaitIndexTracker::default();
        tracker.set_wait(0, Access::Read, 10);
        tracker.set_wait(0, Access::Read, 2);
        assert_eq!(tracker.get_wait(0, Access::Read), 10);
    }

    #[test]
    fn read_write_access_updates_both() {
        let tracker = WaitIndexTracker::default();
        tracker.set_wait(2, Access::ReadWrite, 9);
        assert_eq!(tracker.get_wait(2, Access::Read), 9);
        assert_eq!(tracker.get_wait(2, Access::Write), 9);
    }

    #[test]
    fn is_available_for_cpu_checks_every_queue() {
        let tracker = WaitIndexTracker::default();
        tracker.set_wait(0, Access::Write, 5);
        tracker.set_wait(1, Access::Write, 9);
        let q0 = TestQueue::new(0);
        let q1 = TestQueue::new(1);
        q0.complete(5);
        q1.complete(8);
        let queues: [&dyn Queue; 2] = [&q0, &q1];
        assert!(!tracker.is_available_for_cpu(&queues, Access::Write));
        q1.complete(9);
        assert!(tracker.is_available_for_cpu(&queues, Access::Write));
    }

    #[test]
    fn wait_for_cpu_access_is_noop_when_never_initialised() {
        let tracker = WaitIndexTracker::default();
        tracker.set_wait(0, Access::Write, 100);
        let q0 = TestQueue::new(0);
        let queues: [&dyn Queue; 1] = [&q0];
        crate::queue::test_support::block_on(tracker.wait_for_cpu_access(&queues, Access::Write, false));
        // didn't hang despite the queue never completing command 100.
    }

    #[test]
    fn wait_for_cpu_access_awaits_completion() {
        let tracker = WaitIndexTracker::default();
        tracker.set_wait(0, Access::Write, 3);
        let q0 = TestQueue::new(0);
        q0.complete(3);
        let queues: [&dyn Queue; 1] = [&q0];
        crate::queue::test_support::block_on(tracker.wait_for_cpu_access(&queues, Access::Write, true));
    }
}
