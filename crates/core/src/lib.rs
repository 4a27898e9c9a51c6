//! # Bedplate Core
//!
//! Shared types for build-plate collision detection and arrangement.
//!
//! This crate holds what the planar engines in `bedplate-d2` and the worker
//! boundary in `bedplate-worker` have in common:
//!
//! - **Seam trait**: [`PlateObject`] - how the engines see a host-owned object
//! - **Transforms**: [`Transform3D`], [`AABB2D`]
//! - **Predicates**: exact orientation tests in [`robust`]
//! - **Configuration**: [`ArrangeConfig`], [`CollisionConfig`]
//! - **Budgets**: [`Budget`] - wall-clock or unit-counted time slices
//!
//! ## Configuration
//!
//! ```rust
//! use bedplate_core::ArrangeConfig;
//!
//! let config = ArrangeConfig::new()
//!     .with_margin(5.0)
//!     .with_time_limit(5000)
//!     .with_slice(500);
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod budget;
pub mod config;
pub mod error;
pub mod geometry;
pub mod robust;
pub mod transform;

// Re-exports
pub use budget::Budget;
pub use config::{ArrangeConfig, CollisionConfig};
pub use error::{Error, Result};
pub use geometry::{ObjectId, PlateObject, Triangle3};
pub use transform::{Transform3D, AABB2D};
