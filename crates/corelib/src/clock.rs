//! Frame timing: elapsed time since loop start and delta since the
//! previous tick.

use std::time::{Duration, Instant};

/// Source of "time since start". Must never go backwards, but the clock
/// tolerates a source that does by saturating the delta at zero.
pub trait TimeSource {
    fn now(&self) -> Duration;
}

/// Wall-clock source backed by [`Instant`].
#[derive(Clone, Copy, Debug)]
pub struct MonotonicTime {
    start: Instant,
}

impl MonotonicTime {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::start()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Snapshot produced by one [`FrameClock::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTime {
    pub elapsed: Duration,
    pub delta: Duration,
    /// 1-based index of the tick that produced this snapshot.
    pub frame: u64,
}

impl FrameTime {
    #[inline]
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    #[inline]
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Estimated FPS from this frame's delta.
    pub fn fps(&self) -> f32 {
        let d = self.delta_secs();
        if d > 0.0 { 1.0 / d } else { 0.0 }
    }
}

pub struct FrameClock<S: TimeSource = MonotonicTime> {
    source: S,
    previous: Duration,
    frames: u64,
}

impl<S: TimeSource> FrameClock<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            previous: Duration::ZERO,
            frames: 0,
        }
    }

    /// Read the source once, compute the delta and store the new previous.
    pub fn tick(&mut self) -> FrameTime {
        let elapsed = self.source.now().max(self.previous);
        let delta = elapsed.saturating_sub(self.previous);
        self.previous = elapsed;
        self.frames += 1;
        FrameTime {
            elapsed,
            delta,
            frame: self.frames,
        }
    }

    /// Elapsed time recorded by the last tick.
    #[inline]
    pub fn previous(&self) -> Duration {
        self.previous
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl Default for FrameClock<MonotonicTime> {
    fn default() -> Self {
        Self::new(MonotonicTime::start())
    }
}
