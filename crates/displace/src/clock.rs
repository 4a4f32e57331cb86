/// Accumulates animation time from per-frame deltas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationClock {
    time: f32,
    speed: f32,
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl AnimationClock {
    /// A clock at time zero that advances `speed` units per second.
    pub fn new(speed: f32) -> Self {
        Self { time: 0.0, speed }
    }

    /// Advance by `dt` seconds and return the new time.
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.time += dt * self.speed;
        self.time
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }
}
