use std::time::{Duration, Instant};

// Frame rate counter, reports once per period.
pub struct FrameStats {
    period: Duration,
    start_opt: Option<Instant>,
    frames: u32,
}

impl FrameStats {
    pub fn new(period: Duration) -> Self {
        assert!(!period.is_zero());

        Self {
            period,
            start_opt: None,
            frames: 0,
        }
    }

    // Count a frame, returns the fps once the period is over.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        let start = *self.start_opt.get_or_insert(now);
        self.frames += 1;

        let elapsed = now.saturating_duration_since(start);

        if elapsed >= self.period {
            let fps = self.frames as f32 / elapsed.as_secs_f32();

            self.start_opt = Some(now);
            self.frames = 0;

            Some(fps)
        } else {
            None
        }
    }
}
