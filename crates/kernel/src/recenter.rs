//! Floating-origin recentering around the solver step.
//!
//! `forward` moves every rigid body by minus their mean origin and remembers
//! where each body started and where it landed. `restore` puts each body back
//! at its start plus whatever it moved in between, so a body the solver did
//! not touch ends up bit-identical. Plain collision objects are untouched.

use std::collections::BTreeMap;

use glam::Vec3;
use smp_common::BodyId;
use smp_solver::Solver;

#[derive(Debug, Clone, Copy)]
struct Anchor {
    position: Vec3,
    shifted: Vec3,
    previous: Vec3,
    previous_shifted: Vec3,
}

/// Record of one [`forward`] call, consumed by [`restore`].
#[derive(Debug, Clone, Default)]
pub struct Recentering {
    offset: Vec3,
    anchors: BTreeMap<BodyId, Anchor>,
}

impl Recentering {
    /// Mean origin that was subtracted.
    pub fn offset(&self) -> Vec3 {
        self.offset
    }
}

/// Shift all rigid bodies so their mean origin sits at zero.
pub fn forward(solver: &mut dyn Solver) -> Recentering {
    let (sum, count) = solver
        .rigid_bodies()
        .fold((Vec3::ZERO, 0u32), |(sum, n), body| (sum + body.origin(), n + 1));
    if count == 0 {
        return Recentering::default();
    }
    let center = sum / count as f32;

    let mut anchors = BTreeMap::new();
    for body in solver.rigid_bodies_mut() {
        let position = body.transform.position;
        let previous = body.previous.position;
        body.transform.position -= center;
        body.previous.position -= center;
        anchors.insert(
            body.id,
            Anchor {
                position,
                shifted: body.transform.position,
                previous,
                previous_shifted: body.previous.position,
            },
        );
    }
    Recentering {
        offset: center,
        anchors,
    }
}

/// Undo a previous [`forward`], keeping any motion made in between.
pub fn restore(solver: &mut dyn Solver, recentering: Recentering) {
    if recentering.anchors.is_empty() {
        return;
    }
    for body in solver.rigid_bodies_mut() {
        match recentering.anchors.get(&body.id) {
            Some(anchor) => {
                body.transform.position =
                    anchor.position + (body.transform.position - anchor.shifted);
                body.previous.position =
                    anchor.previous + (body.previous.position - anchor.previous_shifted);
            }
            None => {
                body.transform.position += recentering.offset;
                body.previous.position += recentering.offset;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smp_common::{BodyId, CollisionId, Transform};
    use smp_solver::{CollisionObject, ReferenceSolver, RigidBody};

    fn solver_with(points: &[Vec3]) -> ReferenceSolver {
        let mut s = ReferenceSolver::new();
        for p in points {
            s.add_rigid_body(RigidBody::dynamic(BodyId::new(), 1.0, Transform::from_position(*p)));
        }
        s
    }

    fn origins(s: &ReferenceSolver) -> Vec<Vec3> {
        s.rigid_bodies().map(|b| b.origin()).collect()
    }

    #[test]
    fn forward_centers_on_mean() {
        let mut s = solver_with(&[Vec3::new(2.0, 0.0, 0.0), Vec3::new(6.0, 4.0, 0.0)]);
        let recentering = forward(&mut s);
        assert_eq!(recentering.offset(), Vec3::new(4.0, 2.0, 0.0));
        let sum: Vec3 = origins(&s).into_iter().sum();
        assert_eq!(sum, Vec3::ZERO);
    }

    #[test]
    fn forward_then_restore_is_exact() {
        let points = [
            Vec3::new(0.1, -0.3, 7.7),
            Vec3::new(1.0e7, 2.7, -44.1),
            Vec3::new(10_000.3, 1.0e-6, -1.0e6),
            Vec3::new(-3.3e5, 123.456, 0.0),
        ];
        let mut s = solver_with(&points);
        let before = origins(&s);

        let recentering = forward(&mut s);
        restore(&mut s, recentering);

        assert_eq!(origins(&s), before);
    }

    #[test]
    fn restore_keeps_motion_made_while_centered() {
        let mut s = solver_with(&[Vec3::new(10.0, 0.0, 0.0), Vec3::new(20.0, 0.0, 0.0)]);
        let recentering = forward(&mut s);
        for body in s.rigid_bodies_mut() {
            body.transform.position.z += 2.0;
        }
        restore(&mut s, recentering);

        let mut got = origins(&s);
        got.sort_by(|a, b| a.x.total_cmp(&b.x));
        assert_eq!(got, vec![Vec3::new(10.0, 0.0, 2.0), Vec3::new(20.0, 0.0, 2.0)]);
    }

    #[test]
    fn no_rigid_bodies_means_zero_offset() {
        let mut s = ReferenceSolver::new();
        s.add_collision_object(CollisionObject {
            id: CollisionId::new(),
            transform: Transform::from_position(Vec3::splat(50.0)),
            enabled: true,
        });
        assert_eq!(forward(&mut s).offset(), Vec3::ZERO);
    }

    #[test]
    fn previous_pose_moves_with_the_body() {
        let mut s = solver_with(&[Vec3::new(3.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0)]);
        let recentering = forward(&mut s);
        for b in s.rigid_bodies() {
            assert_eq!(b.previous.position, b.transform.position);
        }
        restore(&mut s, recentering);
        let mut xs: Vec<f32> = s.rigid_bodies().map(|b| b.previous.position.x).collect();
        xs.sort_by(f32::total_cmp);
        assert_eq!(xs, vec![3.0, 5.0]);
    }
}
