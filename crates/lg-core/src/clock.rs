use std::time::{Duration, Instant};

use crate::traits::FrameScheduler;

/// Identifiant d'une demande de frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequestId(pub u64);

/// Minuteur de frames à période fixe.
///
/// Chaque demande devient due une période après sa création. L'hôte interroge
/// `take_due()` dans sa boucle et rappelle la session avec l'id obtenu.
///
/// # Example
/// ```
/// use lg_core::clock::FrameClock;
/// use lg_core::traits::FrameScheduler;
/// use std::time::{Duration, Instant};
///
/// let mut clock = FrameClock::new(30);
/// let id = clock.request_frame();
/// assert_eq!(clock.active_requests(), 1);
/// let later = Instant::now() + Duration::from_secs(1);
/// assert_eq!(clock.take_due(later), Some(id));
/// assert_eq!(clock.active_requests(), 0);
/// ```
#[derive(Debug)]
pub struct FrameClock {
    period: Duration,
    next_id: u64,
    pending: Vec<(FrameRequestId, Instant)>,
}

impl FrameClock {
    /// Clock ticking at `fps` (clamped to 1..=240).
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self {
            period: Self::period_for(fps),
            next_id: 0,
            pending: Vec::with_capacity(2),
        }
    }

    fn period_for(fps: u32) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(fps.clamp(1, 240)))
    }

    /// Change the period; already-pending requests keep their deadline.
    pub fn set_fps(&mut self, fps: u32) {
        self.period = Self::period_for(fps);
    }

    /// Current period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|&(_, at)| at).min()
    }

    /// Remove and return the earliest request due at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<FrameRequestId> {
        let (pos, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (_, at))| *at <= now)
            .min_by_key(|(_, (_, at))| *at)?;
        Some(self.pending.swap_remove(pos).0)
    }

    /// Number of requests not yet fired nor cancelled.
    #[must_use]
    pub fn active_requests(&self) -> usize {
        self.pending.len()
    }
}

impl FrameScheduler for FrameClock {
    fn request_frame(&mut self) -> FrameRequestId {
        self.next_id += 1;
        let id = FrameRequestId(self.next_id);
        self.pending.push((id, Instant::now() + self.period));
        id
    }

    fn cancel_frame(&mut self, id: FrameRequestId) {
        self.pending.retain(|&(p, _)| p != id);
    }
}
