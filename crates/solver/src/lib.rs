//! Solver boundary: the operations the physics world needs from a rigid-body engine.
//!
//! # Invariants
//! - Rigid bodies and plain collision objects live in separate sets; only rigid
//!   bodies are visible through `rigid_bodies`/`rigid_bodies_mut`.
//! - `step_simulation` reports the ticks owed for the interval it was given,
//!   even when it simulated fewer because of the sub-step cap.

mod body;
mod reference;

pub use body::{CollisionObject, ConstraintDesc, RigidBody, SolverParams, StepOutcome};
pub use reference::ReferenceSolver;

use glam::Vec3;
use smp_common::{BodyId, CollisionId, ConstraintId};

/// A rigid-body engine the physics world can register objects with and step.
pub trait Solver: Send {
    fn add_rigid_body(&mut self, body: RigidBody);
    fn remove_rigid_body(&mut self, id: BodyId) -> bool;

    fn add_collision_object(&mut self, object: CollisionObject);
    fn remove_collision_object(&mut self, id: CollisionId) -> bool;
    /// Include or exclude a registered collision object. False for unknown ids.
    fn set_collision_enabled(&mut self, id: CollisionId, enabled: bool) -> bool;
    fn collision_enabled(&self, id: CollisionId) -> Option<bool>;

    fn add_constraint(&mut self, id: ConstraintId, desc: ConstraintDesc);
    fn remove_constraint(&mut self, id: ConstraintId) -> bool;

    fn gravity(&self) -> Vec3;
    fn set_gravity(&mut self, gravity: Vec3);

    fn params(&self) -> &SolverParams;
    fn params_mut(&mut self) -> &mut SolverParams;

    /// Advance by `interval` seconds in ticks of `fixed_time_step`, simulating at
    /// most `max_sub_steps` of them.
    fn step_simulation(
        &mut self,
        interval: f32,
        max_sub_steps: u32,
        fixed_time_step: f32,
    ) -> StepOutcome;

    fn body(&self, id: BodyId) -> Option<&RigidBody>;
    fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody>;

    fn rigid_bodies(&self) -> Box<dyn Iterator<Item = &RigidBody> + '_>;
    fn rigid_bodies_mut(&mut self) -> Box<dyn Iterator<Item = &mut RigidBody> + '_>;

    fn collision_object_count(&self) -> usize;
    fn constraint_count(&self) -> usize;
}

/// Whole ticks of `fixed_time_step` contained in `interval`.
pub fn owed_ticks(interval: f32, fixed_time_step: f32) -> u32 {
    if !(fixed_time_step > 0.0) || !(interval > 0.0) {
        return 0;
    }
    let ticks = (interval / fixed_time_step).floor();
    if ticks >= u32::MAX as f32 {
        u32::MAX
    } else {
        ticks as u32
    }
}
