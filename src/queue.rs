//! The GPU command-queue abstraction the registry core depends on (spec §6:
//! "Queue registry exposes `allQueues`, each queue exposes `index: 0..7`,
//! `last_completed_command: u64`, `wait_for_command_completion(u64)`").
//!
//! The real queue lives in the backend driver, an external collaborator
//! (spec §1); this crate only needs the shape above to decide CPU-access
//! availability and to drive `wait_for_cpu_access`.

use std::future::Future;
use std::pin::Pin;

/// A single GPU command queue, as seen by the registry core.
pub trait Queue: Send + Sync {
    /// `0..MAX_QUEUES`; used to index `read_wait_indices`/`write_wait_indices`.
    fn index(&self) -> u8;
    /// Monotonic index of the most recently completed command on this queue.
    fn last_completed_command(&self) -> u64;
    /// Resolves once `last_completed_command() >= command`. The core never
    /// builds its own executor (spec §5: "no cooperative scheduler in the
    /// core itself"); it only awaits this.
    fn wait_for_command_completion<'a>(&'a self, command: u64) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}
