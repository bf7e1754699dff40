//! Host notifications: frame boundaries and shutdown.

use smp_solver::Solver;

use crate::scheduler::UpdateReport;
use crate::world::PhysicsWorld;

/// Sent by the host around each rendered frame. Only frame ends step physics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEvent {
    pub frame_end: bool,
}

impl FrameEvent {
    pub fn begin() -> Self {
        Self { frame_end: false }
    }

    pub fn end() -> Self {
        Self { frame_end: true }
    }
}

/// Sent once by the host before teardown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownEvent;

impl<S: Solver> PhysicsWorld<S> {
    /// Measure the time since the last frame end and step the world.
    ///
    /// The first frame end after creation or a reset only records a baseline.
    pub fn on_frame_event(&self, event: &FrameEvent) -> Option<UpdateReport> {
        if !event.frame_end {
            return None;
        }
        let mut state = self.lock();
        let now = state.clock.now();

        if state.reset_timer_pending {
            state.last_frame = now;
            state.reset_timer_pending = false;
            tracing::trace!("frame clock resynchronized");
            return None;
        }

        let micros = now.saturating_sub(state.last_frame).as_micros();
        state.last_frame = now;
        let interval = (micros as f64 * 1e-6) as f32;
        state.advance(interval)
    }

    pub fn on_shutdown(&self, _event: &ShutdownEvent) {
        self.shutdown();
    }
}
