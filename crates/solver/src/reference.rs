//! Position-based reference solver.
//!
//! Integrates dynamic bodies under gravity and wind drag, then projects
//! distance constraints for a fixed number of iterations per tick. It is not a
//! collision solver: collision objects are tracked for registration only, and
//! bodies are never put to sleep whatever `SolverParams::deactivation` says.

use std::collections::BTreeMap;

use glam::Vec3;
use smp_common::{BodyId, CollisionId, ConstraintId};

use crate::{CollisionObject, ConstraintDesc, RigidBody, Solver, SolverParams, StepOutcome, owed_ticks};

#[derive(Debug, Default)]
pub struct ReferenceSolver {
    bodies: BTreeMap<BodyId, RigidBody>,
    objects: BTreeMap<CollisionId, CollisionObject>,
    constraints: BTreeMap<ConstraintId, ConstraintDesc>,
    gravity: Vec3,
    params: SolverParams,
    ticks_simulated: u64,
}

impl ReferenceSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total ticks simulated since creation.
    pub fn ticks_simulated(&self) -> u64 {
        self.ticks_simulated
    }

    fn single_step(&mut self, dt: f32) {
        let accel = self.gravity;
        let wind = self.params.wind;
        let drag = self.params.air_drag;
        let keep = (1.0 - self.params.damping).clamp(0.0, 1.0);

        for body in self.bodies.values_mut() {
            body.previous = body.transform;
            if body.is_kinematic() {
                continue;
            }
            let v = body.linear_velocity + (accel + (wind - body.linear_velocity) * drag) * dt;
            body.linear_velocity = v * keep;
            body.transform.position += body.linear_velocity * dt;
        }

        for _ in 0..self.params.iterations {
            self.project_constraints();
        }

        let inv_dt = 1.0 / dt;
        for body in self.bodies.values_mut() {
            if !body.is_kinematic() {
                body.linear_velocity =
                    (body.transform.position - body.previous.position) * inv_dt;
            }
        }
        self.ticks_simulated += 1;
    }

    fn project_constraints(&mut self) {
        for c in self.constraints.values() {
            let (Some(a), Some(b)) = (self.bodies.get(&c.body_a), self.bodies.get(&c.body_b))
            else {
                continue;
            };
            let (wa, wb) = (a.inverse_mass, b.inverse_mass);
            let w_sum = wa + wb;
            if w_sum == 0.0 {
                continue;
            }
            let delta = b.origin() - a.origin();
            let dist = delta.length();
            if dist <= f32::EPSILON {
                continue;
            }
            let error = dist - c.rest_length;
            let correction = delta / dist * (error / w_sum) * c.stiffness.clamp(0.0, 1.0);

            if let Some(a) = self.bodies.get_mut(&c.body_a) {
                *a.origin_mut() += correction * wa;
            }
            if let Some(b) = self.bodies.get_mut(&c.body_b) {
                *b.origin_mut() -= correction * wb;
            }
        }
    }
}

impl Solver for ReferenceSolver {
    fn add_rigid_body(&mut self, body: RigidBody) {
        self.bodies.insert(body.id, body);
    }

    fn remove_rigid_body(&mut self, id: BodyId) -> bool {
        self.bodies.remove(&id).is_some()
    }

    fn add_collision_object(&mut self, object: CollisionObject) {
        self.objects.insert(object.id, object);
    }

    fn remove_collision_object(&mut self, id: CollisionId) -> bool {
        self.objects.remove(&id).is_some()
    }

    fn set_collision_enabled(&mut self, id: CollisionId, enabled: bool) -> bool {
        match self.objects.get_mut(&id) {
            Some(object) => {
                object.enabled = enabled;
                true
            }
            None => false,
        }
    }

    fn collision_enabled(&self, id: CollisionId) -> Option<bool> {
        self.objects.get(&id).map(|o| o.enabled)
    }

    fn add_constraint(&mut self, id: ConstraintId, desc: ConstraintDesc) {
        self.constraints.insert(id, desc);
    }

    fn remove_constraint(&mut self, id: ConstraintId) -> bool {
        self.constraints.remove(&id).is_some()
    }

    fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    fn params(&self) -> &SolverParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut SolverParams {
        &mut self.params
    }

    fn step_simulation(
        &mut self,
        interval: f32,
        max_sub_steps: u32,
        fixed_time_step: f32,
    ) -> StepOutcome {
        let ticks = owed_ticks(interval, fixed_time_step);
        let simulated = ticks.min(max_sub_steps);
        for _ in 0..simulated {
            self.single_step(fixed_time_step);
        }
        if simulated < ticks {
            tracing::debug!(ticks, simulated, "sub-step cap reached");
        }
        StepOutcome { ticks, simulated }
    }

    fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(&id)
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(&id)
    }

    fn rigid_bodies(&self) -> Box<dyn Iterator<Item = &RigidBody> + '_> {
        Box::new(self.bodies.values())
    }

    fn rigid_bodies_mut(&mut self) -> Box<dyn Iterator<Item = &mut RigidBody> + '_> {
        Box::new(self.bodies.values_mut())
    }

    fn collision_object_count(&self) -> usize {
        self.objects.len()
    }

    fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smp_common::Transform;

    const DT: f32 = 1.0 / 60.0;

    fn pendulum() -> (ReferenceSolver, BodyId, BodyId) {
        let mut s = ReferenceSolver::new();
        s.set_gravity(Vec3::new(0.0, 0.0, -9.8));
        let anchor = BodyId::new();
        let bob = BodyId::new();
        s.add_rigid_body(RigidBody::kinematic(anchor, Transform::default()));
        s.add_rigid_body(RigidBody::dynamic(
            bob,
            1.0,
            Transform::from_position(Vec3::new(1.0, 0.0, 0.0)),
        ));
        s.add_constraint(
            ConstraintId::new(),
            ConstraintDesc {
                body_a: anchor,
                body_b: bob,
                rest_length: 1.0,
                stiffness: 1.0,
            },
        );
        (s, anchor, bob)
    }

    #[test]
    fn gravity_pulls_dynamic_bodies_down() {
        let (mut s, anchor, bob) = pendulum();
        s.step_simulation(DT * 10.0, 10, DT);
        assert!(s.body(bob).unwrap().origin().z < 0.0);
        assert_eq!(s.body(anchor).unwrap().origin(), Vec3::ZERO);
    }

    #[test]
    fn distance_constraint_holds_length() {
        let (mut s, _anchor, bob) = pendulum();
        for _ in 0..120 {
            s.step_simulation(DT, 1, DT);
        }
        let len = s.body(bob).unwrap().origin().length();
        assert!((len - 1.0).abs() < 0.05, "length drifted to {len}");
    }

    #[test]
    fn step_caps_sub_steps_but_reports_owed_ticks() {
        let (mut s, _, _) = pendulum();
        let outcome = s.step_simulation(DT * 15.5, 10, DT);
        assert_eq!(outcome.ticks, 15);
        assert_eq!(outcome.simulated, 10);
        assert_eq!(s.ticks_simulated(), 10);
    }

    #[test]
    fn interval_below_one_tick_simulates_nothing() {
        let (mut s, _, bob) = pendulum();
        let before = s.body(bob).unwrap().origin();
        let outcome = s.step_simulation(DT * 0.5, 10, DT);
        assert_eq!(outcome, StepOutcome::default());
        assert_eq!(s.body(bob).unwrap().origin(), before);
    }

    #[test]
    fn collision_objects_are_not_rigid_bodies() {
        let (mut s, _, _) = pendulum();
        s.add_collision_object(CollisionObject {
            id: CollisionId::new(),
            transform: Transform::default(),
            enabled: true,
        });
        assert_eq!(s.collision_object_count(), 1);
        assert_eq!(s.rigid_bodies().count(), 2);
    }

    #[test]
    fn collision_objects_can_be_toggled() {
        let mut s = ReferenceSolver::new();
        let id = CollisionId::new();
        s.add_collision_object(CollisionObject {
            id,
            transform: Transform::default(),
            enabled: true,
        });

        assert!(s.set_collision_enabled(id, false));
        assert_eq!(s.collision_enabled(id), Some(false));
        assert!(!s.set_collision_enabled(CollisionId::new(), false));
        assert_eq!(s.collision_enabled(CollisionId::new()), None);
    }

    #[test]
    fn removal_reports_presence() {
        let (mut s, anchor, _) = pendulum();
        assert!(s.remove_rigid_body(anchor));
        assert!(!s.remove_rigid_body(anchor));
    }
}
