use std::collections::VecDeque;
use std::time::Instant;

/// Compteur de cadence par fenêtre glissante. Zéro allocation après init.
pub struct FpsCounter {
    /// Instants des dernières N mesures.
    timestamps: VecDeque<Instant>,
    window: usize,
    fps: f64,
}

impl FpsCounter {
    /// Create a counter averaging over `window` ticks.
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            timestamps: VecDeque::with_capacity(window + 1),
            window,
            fps: 0.0,
        }
    }

    /// Record one rendered frame.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Record one rendered frame at `now`.
    pub fn tick_at(&mut self, now: Instant) {
        self.timestamps.push_back(now);
        if self.timestamps.len() > self.window {
            self.timestamps.pop_front();
        }
        if let Some(&first) = self.timestamps.front()
            && self.timestamps.len() >= 2
        {
            let secs = now.duration_since(first).as_secs_f64();
            if secs > 0.0 {
                self.fps = (self.timestamps.len() - 1) as f64 / secs;
            }
        }
    }

    /// Forget the history (source changed or paused).
    pub fn clear(&mut self) {
        self.timestamps.clear();
        self.fps = 0.0;
    }

    /// Cadence moyenne sur la fenêtre.
    #[must_use]
    pub fn fps(&self) -> f64 {
        self.fps
    }
}
