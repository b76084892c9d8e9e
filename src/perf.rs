//! Frame-rate sampling and the degradation flag.
//!
//! Frames are counted against wall-clock time; once a second the average
//! rate is computed and fed through a hysteresis gate. Below [`ENTER_FPS`]
//! the engine degrades, above [`EXIT_FPS`] it recovers, and anything in
//! between leaves the flag alone.

/// Degrade when a one-second average falls below this.
pub const ENTER_FPS: f32 = 42.0;
/// Recover when a one-second average rises above this.
pub const EXIT_FPS: f32 = 55.0;
/// Averaging window in seconds.
pub const SAMPLE_WINDOW: f32 = 1.0;

/// Direction of a degradation flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Degraded,
    Recovered,
}

#[derive(Debug, Clone)]
pub struct PerfMonitor {
    elapsed: f32,
    frames: u32,
    fps: Option<f32>,
    degraded: bool,
    reduced_motion: bool,
}

impl PerfMonitor {
    /// Under motion reduction the low-cost path is permanent and the monitor
    /// never enters degraded mode.
    pub fn new(reduced_motion: bool) -> Self {
        Self {
            elapsed: 0.0,
            frames: 0,
            fps: None,
            degraded: false,
            reduced_motion,
        }
    }

    pub fn degraded(&self) -> bool {
        self.degraded
    }

    /// Last computed one-second average, if a window has completed.
    pub fn fps(&self) -> Option<f32> {
        self.fps
    }

    /// Count one frame of `wall_dt` seconds.
    pub fn record_frame(&mut self, wall_dt: f32) -> Option<Transition> {
        if wall_dt.is_finite() && wall_dt > 0.0 {
            self.elapsed += wall_dt;
        }
        self.frames += 1;
        if self.elapsed < SAMPLE_WINDOW {
            return None;
        }
        let fps = self.frames as f32 / self.elapsed;
        self.elapsed = 0.0;
        self.frames = 0;
        self.observe_fps(fps)
    }

    /// Apply one fps sample to the hysteresis gate.
    pub fn observe_fps(&mut self, fps: f32) -> Option<Transition> {
        self.fps = Some(fps);
        if !self.degraded && !self.reduced_motion && fps < ENTER_FPS {
            self.degraded = true;
            log::warn!("frame rate {:.1} fps below {}, degrading effects", fps, ENTER_FPS);
            Some(Transition::Degraded)
        } else if self.degraded && fps > EXIT_FPS {
            self.degraded = false;
            log::warn!("frame rate recovered to {:.1} fps, restoring effects", fps);
            Some(Transition::Recovered)
        } else {
            None
        }
    }
}
