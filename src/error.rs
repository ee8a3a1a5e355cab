//! The narrow set of caller-visible fallible operations that aren't
//! programmer bugs (spec §7 row 3, "capacity exhaustion ... Fatal"). Still
//! fatal: these are formatted into a `panic!` payload rather than returned
//! as a `Result`, so the message stays structured and testable via
//! `#[should_panic(expected = ..)]` without pretending the caller has a
//! retry path.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// All `MAX_TRANSIENT_ARENAS` render-graph arena slots are live (spec
    /// §4.C `TransientRegistryManager`).
    TransientArenaExhausted { max_arenas: usize },
    /// A `TransientFixedSizeRegistry` allocation would exceed its
    /// per-render-graph capacity (spec §4.C, §7).
    FixedSizeRegistryExhausted { capacity: u32 },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::TransientArenaExhausted { max_arenas } => {
                write!(f, "transient registry manager exhausted: all {max_arenas} arena slots are live")
            }
            RegistryError::FixedSizeRegistryExhausted { capacity } => {
                write!(f, "transient fixed-size registry exhausted: capacity {capacity} exceeded")
            }
        }
    }
}

impl std::error::Error for RegistryError {}
