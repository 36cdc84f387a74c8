//! The render loop: one tick per display refresh until stopped.
//!
//! Tick order: clock, mixers (delta), shader time (absolute), controls
//! damping, render. Scheduling the next tick is the caller's job; it should
//! only re-arm while [`RunControl::is_running`] holds.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::clock::{FrameClock, FrameTime, TimeSource};
use crate::scene::SceneState;

#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame was lost but the next one may succeed.
    #[error("recoverable render error: {0}")]
    Recoverable(String),
    /// Rendering cannot continue.
    #[error("fatal render error: {0}")]
    Fatal(String),
}

/// Draws the scene for one tick.
pub trait SceneRenderer {
    fn render(&mut self, scene: &SceneState, time: &FrameTime) -> Result<(), FrameError>;
}

/// Shared run/stop switch. Clones observe the same flag.
#[derive(Clone, Debug)]
pub struct RunControl {
    running: Arc<AtomicBool>,
}

impl RunControl {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered(FrameTime),
    /// Rendering failed recoverably; scene updates still happened.
    Dropped(FrameTime),
    /// The loop was already stopped; nothing ran.
    Stopped,
}

pub struct FrameLoop<S: TimeSource> {
    clock: FrameClock<S>,
    control: RunControl,
    frame_limit: Option<u64>,
    dropped: u64,
}

impl<S: TimeSource> FrameLoop<S> {
    pub fn new(clock: FrameClock<S>, control: RunControl) -> Self {
        Self {
            clock,
            control,
            frame_limit: None,
            dropped: 0,
        }
    }

    /// Stop automatically after `frames` ticks.
    pub fn with_frame_limit(mut self, frames: Option<u64>) -> Self {
        self.frame_limit = frames;
        self
    }

    pub fn control(&self) -> &RunControl {
        &self.control
    }

    pub fn clock(&self) -> &FrameClock<S> {
        &self.clock
    }

    /// Frames lost to recoverable errors so far.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    /// Run one tick. A recoverable render error is logged and swallowed; a
    /// fatal one stops the loop and is returned.
    pub fn tick<R: SceneRenderer>(
        &mut self,
        scene: &mut SceneState,
        renderer: &mut R,
    ) -> Result<TickOutcome, FrameError> {
        if !self.control.is_running() {
            return Ok(TickOutcome::Stopped);
        }

        let time = self.clock.tick();
        scene.advance_mixers(time.delta_secs());
        scene.set_shader_time(time.elapsed_secs());
        scene.update_controls();

        let outcome = match renderer.render(scene, &time) {
            Ok(()) => TickOutcome::Rendered(time),
            Err(FrameError::Recoverable(msg)) => {
                self.dropped += 1;
                log::warn!("Frame {} dropped: {msg}", time.frame);
                TickOutcome::Dropped(time)
            }
            Err(fatal) => {
                log::error!("Stopping render loop at frame {}: {fatal}", time.frame);
                self.control.stop();
                return Err(fatal);
            }
        };

        if self.frame_limit.is_some_and(|limit| time.frame >= limit) {
            log::info!("Frame limit reached ({} frames)", time.frame);
            self.control.stop();
        }
        Ok(outcome)
    }

    /// Tick until the control is stopped. Returns the number of ticks run.
    pub fn run<R: SceneRenderer>(
        &mut self,
        scene: &mut SceneState,
        renderer: &mut R,
    ) -> Result<u64, FrameError> {
        let mut ticks = 0;
        while self.control.is_running() {
            if let TickOutcome::Stopped = self.tick(scene, renderer)? {
                break;
            }
            ticks += 1;
        }
        Ok(ticks)
    }
}
