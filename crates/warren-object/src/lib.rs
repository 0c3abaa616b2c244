//! Object identity and graph primitives for the Warren object server.
//!
//! ## Design
//!
//! - **ObjectId**: opaque, totally ordered identity. References between
//!   managed objects are plain ids resolved through the object manager,
//!   never in-memory pointers, so cyclic graphs cost nothing structurally.
//! - **ObjectIdSet**: compact bitset-backed id set that scales to the full
//!   object population without per-element heap overhead.
//! - **ManagedObject**: one node of the shared graph, owned by the object
//!   manager and borrowed by the collector through lookup/release.
//! - **Collaborator traits**: the object manager and client state manager
//!   boundaries the distributed collector runs against.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod id;
pub mod id_set;
pub mod manager;
pub mod object;

pub use id::ObjectId;
pub use id_set::ObjectIdSet;
pub use manager::{ClientStateManager, MutationCheckpoint, ObjectManager};
pub use object::ManagedObject;
