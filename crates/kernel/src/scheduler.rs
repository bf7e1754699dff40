//! Fixed-timestep driver with render interpolation.
//!
//! # Invariants
//! - After every `update`, `0 <= accumulated < fixed_time_step`.
//! - Ticks owed beyond `max_sub_steps` are dropped, never carried over.

use smp_solver::Solver;

use crate::activation::{self, ActivationSummary};
use crate::binding::ReadMode;
use crate::config::WorldConfig;
use crate::fpu::FlushToZeroGuard;
use crate::recenter;
use crate::system::System;

/// What one `update` did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateReport {
    /// Ticks owed for the update, including dropped ones.
    pub ticks: u32,
    /// Ticks the solver actually simulated.
    pub simulated: u32,
    /// Fraction of a tick left in the accumulator.
    pub alpha: f32,
    /// Activation pass result; default when no tick was due.
    pub activation: ActivationSummary,
}

impl UpdateReport {
    /// Owed ticks discarded by the sub-step cap.
    pub fn dropped(&self) -> u32 {
        self.ticks.saturating_sub(self.simulated)
    }
}

/// Accumulates host time and steps the solver in whole ticks.
#[derive(Debug, Clone)]
pub struct FixedStepScheduler {
    fixed_time_step: f32,
    max_sub_steps: u32,
    accumulated: f32,
}

impl FixedStepScheduler {
    /// Scheduler with an empty accumulator.
    pub fn new(fixed_time_step: f32, max_sub_steps: u32) -> Self {
        Self {
            fixed_time_step,
            max_sub_steps,
            accumulated: 0.0,
        }
    }

    /// Scheduler using the tick length and sub-step cap from `config`.
    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.fixed_time_step, config.max_sub_steps)
    }

    /// Length of one tick in seconds.
    pub fn fixed_time_step(&self) -> f32 {
        self.fixed_time_step
    }

    /// Most ticks simulated by one solver call.
    pub fn max_sub_steps(&self) -> u32 {
        self.max_sub_steps
    }

    /// Time carried over that has not been simulated yet.
    pub fn accumulated(&self) -> f32 {
        self.accumulated
    }

    /// Interpolation factor in `[0, 1)` for the current accumulator.
    pub fn alpha(&self) -> f32 {
        self.accumulated / self.fixed_time_step
    }

    /// Advance by `elapsed` seconds of host time.
    ///
    /// At most one solver call is made; whatever it owes beyond the cap is
    /// discarded along with any rounding surplus.
    pub fn update(
        &mut self,
        elapsed: f32,
        systems: &mut [System],
        solver: &mut dyn Solver,
    ) -> UpdateReport {
        let _span = tracing::info_span!("physics_update", elapsed).entered();
        let _ftz = FlushToZeroGuard::enable();

        let elapsed = elapsed.max(0.0);
        self.accumulated += elapsed;

        for system in systems.iter_mut() {
            system.clamp_rotations(elapsed, solver);
        }

        let mut report = UpdateReport::default();
        if self.accumulated >= self.fixed_time_step {
            for system in systems.iter_mut() {
                system.read_transform(ReadMode::Interval(self.accumulated), solver);
            }
            report.activation = activation::resolve(systems);
            for system in systems.iter() {
                system.apply_activation(solver);
            }

            let recentering = recenter::forward(solver);
            let outcome =
                solver.step_simulation(self.accumulated, self.max_sub_steps, self.fixed_time_step);
            self.accumulated -= outcome.ticks as f32 * self.fixed_time_step;
            recenter::restore(solver, recentering);

            report.ticks = outcome.ticks;
            report.simulated = outcome.simulated;
            tracing::trace!(
                ticks = outcome.ticks,
                simulated = outcome.simulated,
                accumulated = self.accumulated,
                "solver step"
            );
            if outcome.ticks == 0 {
                tracing::warn!(
                    accumulated = self.accumulated,
                    "solver consumed no ticks for a due interval"
                );
            }
        }
        self.normalize();

        if report.dropped() > 0 {
            tracing::warn!(
                dropped = report.dropped(),
                max_sub_steps = self.max_sub_steps,
                "sub-step cap reached, discarding owed time"
            );
        }

        report.alpha = self.alpha();
        for system in systems.iter_mut() {
            system.write_transform(report.alpha, solver);
        }
        report
    }

    fn normalize(&mut self) {
        if self.accumulated >= self.fixed_time_step {
            self.accumulated %= self.fixed_time_step;
        }
        if !(self.accumulated >= 0.0 && self.accumulated < self.fixed_time_step) {
            self.accumulated = 0.0;
        }
    }
}
