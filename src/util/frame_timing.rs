use web_time::{Duration, Instant};

/// Frame timing with FPS calculation, optional frame limiting and
/// periodic throughput reports.
pub struct FrameTiming {
    /// Target FPS (0 = unlimited)
    target_fps: u32,
    /// Minimum frame duration based on target FPS
    min_frame_duration: Duration,
    /// Last frame timestamp
    last_frame: Instant,
    /// Smoothed FPS using exponential moving average
    smoothed_fps: f32,
    /// Smoothing factor (lower = smoother, 0.0-1.0)
    smoothing: f32,
    /// Frames completed since the timer started
    frames: u64,
    /// How often [`take_report`](Self::take_report) yields a value
    report_interval: Duration,
    /// When the last report was taken
    last_report: Instant,
}

impl FrameTiming {
    /// Create a new frame timer with the given FPS target (0 = unlimited).
    pub fn new(target_fps: u32) -> Self {
        let min_frame_duration = if target_fps > 0 {
            Duration::from_secs_f64(1.0 / f64::from(target_fps))
        } else {
            Duration::ZERO
        };

        let now = Instant::now();
        Self {
            target_fps,
            min_frame_duration,
            last_frame: now,
            smoothed_fps: 60.0, // Start with reasonable default
            smoothing: 0.05,    // 5% new value, 95% old value
            frames: 0,
            report_interval: Duration::from_secs(5),
            last_report: now,
        }
    }

    /// Report throughput every `interval` instead of every five seconds.
    #[must_use]
    pub const fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Call at the start of each frame. Returns true if enough time has passed
    /// to render.
    pub fn should_render(&self) -> bool {
        if self.target_fps == 0 {
            return true;
        }
        self.last_frame.elapsed() >= self.min_frame_duration
    }

    /// Call after rendering to update timing.
    pub fn end_frame(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.frames += 1;

        let frame_time = elapsed.as_secs_f32();
        if frame_time > 0.0 {
            let instant_fps = 1.0 / frame_time;
            self.smoothed_fps = self.smoothed_fps * (1.0 - self.smoothing)
                + instant_fps * self.smoothing;
        }
    }

    /// Get the current FPS (smoothed)
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }

    /// Frames completed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Smoothed FPS once per report interval, `None` in between.
    pub fn take_report(&mut self) -> Option<f32> {
        if self.last_report.elapsed() < self.report_interval {
            return None;
        }
        self.last_report = Instant::now();
        Some(self.smoothed_fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_always_renders() {
        let timing = FrameTiming::new(0);
        assert!(timing.should_render());
    }

    #[test]
    fn limited_waits_for_frame_budget() {
        let mut timing = FrameTiming::new(1);
        timing.end_frame();
        assert!(!timing.should_render());
        assert_eq!(timing.frames(), 1);
    }

    #[test]
    fn reports_once_per_interval() {
        let mut timing =
            FrameTiming::new(0).with_report_interval(Duration::ZERO);
        assert!(timing.take_report().is_some());

        let mut timing =
            FrameTiming::new(0).with_report_interval(Duration::from_secs(3600));
        timing.end_frame();
        assert!(timing.take_report().is_none());
    }
}
