//! # Warren distributed garbage collector
//!
//! Concurrent mark-and-sweep collection for the Warren object server:
//! many remote processes share one logical object graph, and this crate
//! computes and deletes the objects no longer reachable from any live
//! root while those processes keep committing transactions.
//!
//! ## Design
//!
//! - **Phased cycle**: mark → rescue 1 → pause → rescue 2 → delete; only
//!   the rescue-2 window stops new commits, everything else runs against
//!   live mutator traffic
//! - **Prune-in-place marking**: the candidate universe snapshot is pruned
//!   as traversal reaches ids; whatever survives every pass is provably
//!   unreachable at the pause boundary
//! - **Id-based traversal**: objects are borrowed from the object manager
//!   per visit (lookup/release) and never held across the cycle, so the
//!   backing store can page freely
//! - **Two modes**: full collection over the whole universe, and a
//!   young-generation variant scoped by a selective filter that never
//!   needs the pause protocol
//! - **Observable lifecycle**: an explicit state machine plus per-phase
//!   listener events carrying the cycle's [`GarbageCollectionInfo`]

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod collector;
pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod info;
pub mod listener;
pub mod logging;

mod cycle;
mod hook;
mod young;

pub use collector::{CollectorState, MarkAndSweepCollector};
pub use config::GcConfig;
pub use controller::GcController;
pub use error::GcError;
pub use filter::{EverythingFilter, Filter, SelectiveFilter};
pub use info::GarbageCollectionInfo;
pub use listener::GarbageCollectorEventListener;
pub use logging::{GcCycleStats, GcLogListener, GcStatsRecorder};
