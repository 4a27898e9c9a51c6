//! # Bedplate Worker
//!
//! Runs the pairwise collision engine on its own thread so the host's
//! interactive thread never waits on a quadratic pair sweep.
//!
//! The host and the worker share no memory. Requests carry copies of the
//! projected footprints; responses are [`CollisionReport`] snapshots tagged
//! with the generation of the request that produced them.
//!
//! ## Usage
//!
//! ```rust
//! use bedplate_d2::{Mesh, Plate, SceneObject};
//! use bedplate_worker::{CollisionConfig, CollisionWorker};
//! use std::time::Duration;
//!
//! let objects = vec![
//!     SceneObject::new("a", Mesh::cuboid(20.0, 20.0, 5.0)),
//!     SceneObject::new("b", Mesh::cuboid(20.0, 20.0, 5.0)).with_plate_position(10.0, 0.0),
//! ];
//!
//! let mut worker = CollisionWorker::spawn(CollisionConfig::default()).unwrap();
//! worker.start_objects(1, &objects, Plate::rectangle(200.0, 200.0), 0).unwrap();
//!
//! let report = worker.recv_final(Duration::from_secs(5)).unwrap().unwrap();
//! assert!(report.is_complete());
//! assert!(report.matrix.has_collisions());
//! worker.shutdown().unwrap();
//! ```
//!
//! ## Ordering
//!
//! - A start request supersedes any run in flight; the worker abandons it at
//!   the next pair boundary.
//! - Reports arrive in the order they were produced. Reports for a generation
//!   older than the latest start request are dropped by the receiving handle.
//! - Every start or resume yields at least one report unless superseded.

pub mod messages;
pub mod worker;

// Re-exports
pub use bedplate_core::{CollisionConfig, Error, Result};
pub use bedplate_d2::{CollisionReport, CollisionState, RunStatus};
pub use messages::{
    decode_command, decode_report, encode_command, encode_report, StartRequest, WorkerCommand,
};
pub use worker::CollisionWorker;
