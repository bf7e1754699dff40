//! Test doubles shared by the kernel's unit tests.

use std::sync::{Arc, Mutex};

use glam::Vec3;
use smp_common::{BodyId, CollisionId, ConstraintId};
use smp_solver::{
    CollisionObject, ConstraintDesc, ReferenceSolver, RigidBody, Solver, SolverParams, StepOutcome,
};

use crate::binding::{ReadMode, SkeletonBinding};
use crate::system::Bone;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepCall {
    pub interval: f32,
    pub max_sub_steps: u32,
    pub fixed_time_step: f32,
    pub outcome: StepOutcome,
    /// Mean rigid-body origin seen by the solver when stepping.
    pub center: Vec3,
}

/// Reference solver that records every step and removal.
#[derive(Debug, Default)]
pub struct RecordingSolver {
    inner: ReferenceSolver,
    pub steps: Vec<StepCall>,
    pub removed_bodies: Vec<BodyId>,
    pub removed_objects: Vec<CollisionId>,
    pub removed_constraints: Vec<ConstraintId>,
}

impl RecordingSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn simulated(&self) -> u32 {
        self.steps.iter().map(|s| s.outcome.simulated).sum()
    }

    pub fn removals(&self) -> usize {
        self.removed_bodies.len() + self.removed_objects.len() + self.removed_constraints.len()
    }
}

impl Solver for RecordingSolver {
    fn add_rigid_body(&mut self, body: RigidBody) {
        self.inner.add_rigid_body(body);
    }

    fn remove_rigid_body(&mut self, id: BodyId) -> bool {
        self.removed_bodies.push(id);
        self.inner.remove_rigid_body(id)
    }

    fn add_collision_object(&mut self, object: CollisionObject) {
        self.inner.add_collision_object(object);
    }

    fn remove_collision_object(&mut self, id: CollisionId) -> bool {
        self.removed_objects.push(id);
        self.inner.remove_collision_object(id)
    }

    fn set_collision_enabled(&mut self, id: CollisionId, enabled: bool) -> bool {
        self.inner.set_collision_enabled(id, enabled)
    }

    fn collision_enabled(&self, id: CollisionId) -> Option<bool> {
        self.inner.collision_enabled(id)
    }

    fn add_constraint(&mut self, id: ConstraintId, desc: ConstraintDesc) {
        self.inner.add_constraint(id, desc);
    }

    fn remove_constraint(&mut self, id: ConstraintId) -> bool {
        self.removed_constraints.push(id);
        self.inner.remove_constraint(id)
    }

    fn gravity(&self) -> Vec3 {
        self.inner.gravity()
    }

    fn set_gravity(&mut self, gravity: Vec3) {
        self.inner.set_gravity(gravity);
    }

    fn params(&self) -> &SolverParams {
        self.inner.params()
    }

    fn params_mut(&mut self) -> &mut SolverParams {
        self.inner.params_mut()
    }

    fn step_simulation(
        &mut self,
        interval: f32,
        max_sub_steps: u32,
        fixed_time_step: f32,
    ) -> StepOutcome {
        let (sum, n) = self
            .inner
            .rigid_bodies()
            .fold((Vec3::ZERO, 0u32), |(s, n), b| (s + b.origin(), n + 1));
        let center = if n == 0 { Vec3::ZERO } else { sum / n as f32 };
        let outcome = self
            .inner
            .step_simulation(interval, max_sub_steps, fixed_time_step);
        self.steps.push(StepCall {
            interval,
            max_sub_steps,
            fixed_time_step,
            outcome,
            center,
        });
        outcome
    }

    fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.inner.body(id)
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.inner.body_mut(id)
    }

    fn rigid_bodies(&self) -> Box<dyn Iterator<Item = &RigidBody> + '_> {
        self.inner.rigid_bodies()
    }

    fn rigid_bodies_mut(&mut self) -> Box<dyn Iterator<Item = &mut RigidBody> + '_> {
        self.inner.rigid_bodies_mut()
    }

    fn collision_object_count(&self) -> usize {
        self.inner.collision_object_count()
    }

    fn constraint_count(&self) -> usize {
        self.inner.constraint_count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindingCall {
    Clamp(f32),
    Read(ReadMode),
    Write(f32),
}

/// Binding that logs the calls it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingBinding {
    pub calls: Arc<Mutex<Vec<BindingCall>>>,
}

impl RecordingBinding {
    pub fn calls(&self) -> Vec<BindingCall> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: BindingCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl SkeletonBinding for RecordingBinding {
    fn read_transform(&mut self, mode: ReadMode, _bones: &[Bone], _solver: &mut dyn Solver) {
        self.push(BindingCall::Read(mode));
    }

    fn write_transform(&mut self, alpha: f32, _bones: &[Bone], _solver: &dyn Solver) {
        self.push(BindingCall::Write(alpha));
    }

    fn clamp_rotations(&mut self, elapsed: f32, _bones: &[Bone], _solver: &mut dyn Solver) {
        self.push(BindingCall::Clamp(elapsed));
    }
}
