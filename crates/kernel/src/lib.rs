//! Skinned-mesh physics world: drives a rigid-body solver at a fixed tick rate
//! from a variable-rate host frame loop.
//!
//! # Invariants
//! - The accumulator is always below one tick after an update.
//! - Shape activation is recomputed from scratch before every solver step.
//! - Recentering is undone before any caller can observe solver state.
//! - Lifecycle operations and frame steps are serialized by one lock.

pub mod activation;
pub mod binding;
pub mod clock;
pub mod config;
pub mod events;
pub mod fpu;
pub mod recenter;
pub mod scheduler;
pub mod system;
pub mod world;

#[cfg(test)]
mod test_support;

pub use activation::ActivationSummary;
pub use binding::{NullBinding, PoseBinding, ReadMode, SkeletonBinding};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ConfigError, WorldConfig};
pub use events::{FrameEvent, ShutdownEvent};
pub use scheduler::{FixedStepScheduler, UpdateReport};
pub use system::{Bone, Constraint, ConstraintGroup, Shape, System, SystemKind};
pub use world::{PhysicsWorld, WorldHandle};
