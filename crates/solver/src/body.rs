use glam::Vec3;
use serde::{Deserialize, Serialize};
use smp_common::{BodyId, CollisionId, Transform};

/// A rigid body as seen by the physics world.
///
/// `previous` holds the transform at the start of the last simulated tick so
/// hosts can blend between the two.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    pub id: BodyId,
    pub transform: Transform,
    pub previous: Transform,
    pub linear_velocity: Vec3,
    /// Zero marks a kinematic body, driven only by the skeleton.
    pub inverse_mass: f32,
}

impl RigidBody {
    pub fn dynamic(id: BodyId, mass: f32, transform: Transform) -> Self {
        let inverse_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
        Self {
            id,
            transform,
            previous: transform,
            linear_velocity: Vec3::ZERO,
            inverse_mass,
        }
    }

    pub fn kinematic(id: BodyId, transform: Transform) -> Self {
        Self::dynamic(id, 0.0, transform)
    }

    pub fn is_kinematic(&self) -> bool {
        self.inverse_mass == 0.0
    }

    pub fn origin(&self) -> Vec3 {
        self.transform.position
    }

    pub fn origin_mut(&mut self) -> &mut Vec3 {
        &mut self.transform.position
    }

    /// Place the body at `transform` and drop any motion.
    pub fn snap_to(&mut self, transform: Transform) {
        self.transform = transform;
        self.previous = transform;
        self.linear_velocity = Vec3::ZERO;
    }

    /// Transform `alpha` of the way from the previous tick to the current one.
    pub fn interpolated(&self, alpha: f32) -> Transform {
        self.previous.lerp(&self.transform, alpha)
    }
}

/// A collision proxy that is not a rigid body.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionObject {
    pub id: CollisionId,
    pub transform: Transform,
    /// Disabled objects stay registered but take no part in collision.
    pub enabled: bool,
}

/// Distance constraint between two rigid bodies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDesc {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub rest_length: f32,
    /// 1.0 is fully rigid; lower values let the link stretch.
    pub stiffness: f32,
}

/// Tunables applied to the solver on world construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverParams {
    pub friction: f32,
    pub wind: Vec3,
    pub air_drag: f32,
    pub damping: f32,
    pub iterations: u32,
    /// Whether resting bodies may be put to sleep.
    pub deactivation: bool,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            friction: 0.0,
            wind: Vec3::ZERO,
            air_drag: 0.05,
            damping: 0.01,
            iterations: 4,
            deactivation: true,
        }
    }
}

/// Result of a single `step_simulation` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Ticks owed for the interval, including any dropped by the cap.
    pub ticks: u32,
    /// Ticks actually simulated.
    pub simulated: u32,
}

impl StepOutcome {
    /// Owed ticks the cap kept from being simulated.
    pub fn dropped(&self) -> u32 {
        self.ticks.saturating_sub(self.simulated)
    }
}
