//! Collection refusal taxonomy.

use thiserror::Error;

/// Reasons a collection request is refused before any state changes.
///
/// All of these are synchronous refusals, not failures: the collector
/// logs them and stays in whatever state it was in. Internal consistency
/// violations are not represented here — those panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GcError {
    /// Collection is administratively disabled.
    #[error("garbage collection is disabled")]
    Disabled,

    /// Another cycle (full or young-generation) is already in flight.
    #[error("a garbage collection cycle is already running")]
    AlreadyRunning,

    /// The collector subsystem has not been started, or was stopped.
    #[error("the garbage collector is stopped")]
    Stopped,

    /// Young-generation tracking was not enabled in the configuration.
    #[error("young generation collection is not enabled")]
    YoungGenDisabled,

    /// This node is a passive replica and must not collect independently.
    #[error("garbage collection is not permitted on a passive server")]
    PassiveServer,
}
