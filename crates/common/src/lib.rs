//! Shared identifiers and spatial types used across the physics world crates.

mod types;

pub use types::{AnchorId, BodyId, CollisionId, ConstraintId, SystemId, TagId, Transform};
