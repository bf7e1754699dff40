//! The physics world: owner of all simulated systems and the solver.
//!
//! # Invariants
//! - One non-reentrant lock guards systems, solver and scheduler state; every
//!   lifecycle operation and every frame step holds it for its whole duration.
//! - A system is registered with the solver exactly while it is in `systems`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use smp_common::{AnchorId, SystemId};
use smp_solver::Solver;

use crate::binding::ReadMode;
use crate::clock::{Clock, MonotonicClock};
use crate::config::{ConfigError, WorldConfig};
use crate::scheduler::{FixedStepScheduler, UpdateReport};
use crate::system::System;

/// Shared handle to a world; hosts pass clones to every thread that needs one.
pub type WorldHandle<S> = Arc<PhysicsWorld<S>>;

pub(crate) struct WorldState<S> {
    pub(crate) scheduler: FixedStepScheduler,
    pub(crate) solver: S,
    pub(crate) systems: Vec<System>,
    pub(crate) next_system_id: u64,
    pub(crate) suspended: u32,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) last_frame: Duration,
    pub(crate) reset_timer_pending: bool,
    pub(crate) last_report: Option<UpdateReport>,
}

impl<S: Solver> WorldState<S> {
    /// Run one update if the world is live and `interval` is worth simulating.
    pub(crate) fn advance(&mut self, interval: f32) -> Option<UpdateReport> {
        if self.suspended > 0 || self.systems.is_empty() || !(interval > f32::EPSILON) {
            return None;
        }
        let report = self
            .scheduler
            .update(interval, &mut self.systems, &mut self.solver);
        self.last_report = Some(report);
        Some(report)
    }
}

/// Skinned-mesh physics world.
pub struct PhysicsWorld<S> {
    config: WorldConfig,
    state: Mutex<WorldState<S>>,
}

impl<S: Solver> PhysicsWorld<S> {
    /// Create a world measuring frame time with [`MonotonicClock`].
    pub fn new(config: WorldConfig, solver: S) -> Result<Self, ConfigError> {
        Self::with_clock(config, solver, MonotonicClock::new())
    }

    /// Create a world with an explicit clock. Configures gravity, wind and
    /// friction on `solver` and turns body deactivation off.
    pub fn with_clock(
        config: WorldConfig,
        mut solver: S,
        clock: impl Clock + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        solver.set_gravity(config.scaled_gravity());
        let params = solver.params_mut();
        params.friction = config.friction;
        params.wind = config.scaled_wind();
        params.deactivation = false;

        let last_frame = clock.now();
        tracing::debug!(
            fixed_time_step = config.fixed_time_step,
            max_sub_steps = config.max_sub_steps,
            "physics world created"
        );
        Ok(Self {
            state: Mutex::new(WorldState {
                scheduler: FixedStepScheduler::from_config(&config),
                solver,
                systems: Vec::new(),
                next_system_id: 1,
                suspended: 0,
                clock: Box::new(clock),
                last_frame,
                reset_timer_pending: true,
                last_report: None,
            }),
            config,
        })
    }

    /// Wrap the world for sharing across threads.
    pub fn into_handle(self) -> WorldHandle<S> {
        Arc::new(self)
    }

    /// Configuration the world was built with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, WorldState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a system. Returns `None` and leaves the world untouched when
    /// the system is not bound to a skeleton.
    pub fn add_system(&self, mut system: System) -> Option<SystemId> {
        if !system.is_skeletal() {
            tracing::debug!(kind = ?system.kind, "rejecting system without skeleton");
            return None;
        }
        let mut state = self.lock();
        let state = &mut *state;
        let id = SystemId(state.next_system_id);
        state.next_system_id += 1;

        system.id = Some(id);
        system.initialized = false;
        system.register(&mut state.solver);
        tracing::debug!(
            %id,
            shapes = system.meshes.len(),
            bones = system.bones.len(),
            "system added"
        );
        state.systems.push(system);
        Some(id)
    }

    /// Remove one system and its solver objects. Returns false if unknown.
    pub fn remove_system(&self, id: SystemId) -> bool {
        let mut state = self.lock();
        let state = &mut *state;
        let Some(index) = state.systems.iter().position(|s| s.id == Some(id)) else {
            return false;
        };
        let system = state.systems.remove(index);
        system.unregister(&mut state.solver);
        tracing::debug!(%id, "system removed");
        true
    }

    /// Remove every system bound to `anchor`. Returns how many were removed.
    pub fn remove_systems_by_anchor(&self, anchor: AnchorId) -> usize {
        let mut state = self.lock();
        let state = &mut *state;
        let mut removed = 0;
        let mut i = 0;
        while i < state.systems.len() {
            if state.systems[i].skeleton() == Some(anchor) {
                let system = state.systems.remove(i);
                system.unregister(&mut state.solver);
                removed += 1;
            } else {
                i += 1;
            }
        }
        tracing::debug!(?anchor, removed, "systems removed by anchor");
        removed
    }

    /// Snap every system to its host pose. The next frame event only
    /// resynchronizes the clock.
    pub fn reset_systems(&self) {
        let mut state = self.lock();
        let state = &mut *state;
        for system in state.systems.iter_mut() {
            system.read_transform(ReadMode::Reset, &mut state.solver);
        }
        state.reset_timer_pending = true;
        tracing::debug!(systems = state.systems.len(), "systems reset");
    }

    /// Unregister every system's solver objects and drop all systems.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        let state = &mut *state;
        if state.systems.is_empty() {
            return;
        }
        for system in &state.systems {
            system.unregister(&mut state.solver);
        }
        tracing::debug!(systems = state.systems.len(), "physics world shut down");
        state.systems.clear();
    }

    /// Drive the scheduler directly with a host-measured interval, applying
    /// the same gating as frame events.
    pub fn advance(&self, interval: f32) -> Option<UpdateReport> {
        self.lock().advance(interval)
    }

    /// Pause stepping. Nested calls need the same number of `resume` calls.
    pub fn suspend(&self) {
        self.lock().suspended += 1;
    }

    /// Undo one `suspend`. Extra calls are ignored.
    pub fn resume(&self) {
        let mut state = self.lock();
        state.suspended = state.suspended.saturating_sub(1);
    }

    /// True while any `suspend` is outstanding.
    pub fn is_suspended(&self) -> bool {
        self.lock().suspended > 0
    }

    /// Arm a clock resync: the next frame event records a baseline only.
    pub fn reset_timer(&self) {
        self.lock().reset_timer_pending = true;
    }

    /// Number of registered systems.
    pub fn system_count(&self) -> usize {
        self.lock().systems.len()
    }

    /// Ids of registered systems, in registration order.
    pub fn system_ids(&self) -> Vec<SystemId> {
        self.lock().systems.iter().filter_map(System::id).collect()
    }

    /// Host time carried over that has not been simulated yet.
    pub fn accumulated_interval(&self) -> f32 {
        self.lock().scheduler.accumulated()
    }

    /// Report of the most recent update that ran.
    pub fn last_report(&self) -> Option<UpdateReport> {
        self.lock().last_report
    }

    /// Inspect the systems under the world lock.
    pub fn with_systems<R>(&self, f: impl FnOnce(&[System]) -> R) -> R {
        f(&self.lock().systems)
    }

    /// Inspect the solver under the world lock.
    pub fn with_solver<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.lock().solver)
    }
}
