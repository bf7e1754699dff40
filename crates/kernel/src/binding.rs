//! Boundary to the host skeleton: pulling bone poses into the solver and
//! pushing simulated poses back out.

use std::sync::{Arc, Mutex, PoisonError};

use smp_common::Transform;
use smp_solver::Solver;

use crate::system::Bone;

/// How `read_transform` should treat the pose it pulls from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadMode {
    /// Normal read covering `interval` seconds of accumulated time.
    Interval(f32),
    /// Ignore elapsed time and snap every body to the host pose.
    Reset,
}

/// Per-system collaborator that owns the mapping between host bones and solver bodies.
pub trait SkeletonBinding: Send {
    fn read_transform(&mut self, mode: ReadMode, bones: &[Bone], solver: &mut dyn Solver);

    fn write_transform(&mut self, alpha: f32, bones: &[Bone], solver: &dyn Solver);

    /// Bound per-frame bone rotation deltas before any stepping.
    fn clamp_rotations(&mut self, _elapsed: f32, _bones: &[Bone], _solver: &mut dyn Solver) {}
}

/// Binding for systems with no host skeleton to sync against.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBinding;

impl SkeletonBinding for NullBinding {
    fn read_transform(&mut self, _mode: ReadMode, _bones: &[Bone], _solver: &mut dyn Solver) {}

    fn write_transform(&mut self, _alpha: f32, _bones: &[Bone], _solver: &dyn Solver) {}
}

#[derive(Debug, Default)]
struct PoseBuffers {
    input: Vec<Transform>,
    output: Vec<Transform>,
}

/// Binding over a shared pose buffer.
///
/// The host writes bone poses with [`PoseBinding::set_pose`] and reads the
/// simulated, interpolated result with [`PoseBinding::output`]. Clones share
/// the same buffers, so the host keeps one clone while the system owns another.
#[derive(Debug, Clone, Default)]
pub struct PoseBinding {
    buffers: Arc<Mutex<PoseBuffers>>,
}

impl PoseBinding {
    /// Buffers seeded with each bone's rest pose.
    pub fn for_bones(bones: &[Bone]) -> Self {
        let rest: Vec<Transform> = bones.iter().map(|b| b.rest).collect();
        Self {
            buffers: Arc::new(Mutex::new(PoseBuffers {
                input: rest.clone(),
                output: rest,
            })),
        }
    }

    fn buffers(&self) -> std::sync::MutexGuard<'_, PoseBuffers> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the host pose of bone `index`. Returns false when out of range.
    pub fn set_pose(&self, index: usize, pose: Transform) -> bool {
        match self.buffers().input.get_mut(index) {
            Some(slot) => {
                *slot = pose;
                true
            }
            None => false,
        }
    }

    pub fn output(&self, index: usize) -> Option<Transform> {
        self.buffers().output.get(index).copied()
    }

    pub fn outputs(&self) -> Vec<Transform> {
        self.buffers().output.clone()
    }
}

impl SkeletonBinding for PoseBinding {
    fn read_transform(&mut self, mode: ReadMode, bones: &[Bone], solver: &mut dyn Solver) {
        let buffers = self.buffers();
        for (bone, pose) in bones.iter().zip(&buffers.input) {
            let Some(body) = solver.body_mut(bone.body) else {
                continue;
            };
            match mode {
                ReadMode::Reset => body.snap_to(*pose),
                ReadMode::Interval(interval) => {
                    if !body.is_kinematic() {
                        continue;
                    }
                    if interval > 0.0 {
                        body.linear_velocity =
                            (pose.position - body.transform.position) / interval;
                    }
                    body.transform = *pose;
                }
            }
        }
    }

    fn write_transform(&mut self, alpha: f32, bones: &[Bone], solver: &dyn Solver) {
        let mut buffers = self.buffers();
        for (bone, out) in bones.iter().zip(buffers.output.iter_mut()) {
            if let Some(body) = solver.body(bone.body) {
                *out = body.interpolated(alpha);
            }
        }
    }
}
