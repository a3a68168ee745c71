use std::time::{Duration, Instant};

/// Mutable alarm-triggering state shared between the monitor loop and the
/// foreground control path.
///
/// The loop is the sole writer of `last_alarm`; threshold and cooldown are
/// written only through the setters, from the control side. Changes take
/// effect on the next evaluation.
#[derive(Debug, Clone)]
pub struct AlarmState {
    threshold_db: f32,
    cooldown: Duration,
    last_alarm: Option<Instant>,
}

impl AlarmState {
    pub fn new(threshold_db: f32, cooldown: Duration) -> Self {
        Self {
            threshold_db: sanitize(threshold_db),
            cooldown,
            last_alarm: None,
        }
    }

    /// Trigger iff the reading is strictly above the threshold AND strictly
    /// more than the cooldown has passed since the last trigger. Readings
    /// exactly at either boundary never trigger. A state that has never
    /// triggered passes the cooldown test unconditionally.
    pub fn should_trigger(&self, db: f32, now: Instant) -> bool {
        if db <= self.threshold_db {
            return false;
        }
        match self.last_alarm {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.cooldown,
        }
    }

    /// Record an actual trigger. This is the only place the cooldown timer
    /// resets; below-threshold evaluations never touch it.
    pub fn record_trigger(&mut self, now: Instant) {
        self.last_alarm = Some(now);
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn last_alarm(&self) -> Option<Instant> {
        self.last_alarm
    }

    /// Non-finite values are ignored, negatives clamp to 0.
    pub fn set_threshold_db(&mut self, db: f32) {
        if db.is_finite() {
            self.threshold_db = sanitize(db);
        }
    }

    pub fn set_cooldown(&mut self, cooldown: Duration) {
        self.cooldown = cooldown;
    }
}

fn sanitize(db: f32) -> f32 {
    db.max(0.0)
}
