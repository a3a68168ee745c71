use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Cross-thread monitor counters, readable from any thread.
#[derive(Debug, Default)]
pub struct MonitorStats {
    pub cycles: AtomicU64,
    pub read_errors: AtomicU64,
    pub alarms_fired: AtomicU64,
    current_db_milli: AtomicI64, // dB * 1000
}

impl MonitorStats {
    pub fn record_level(&self, db: f32) {
        self.current_db_milli
            .store((db as f64 * 1000.0) as i64, Ordering::Relaxed);
    }

    pub fn current_db(&self) -> f32 {
        self.current_db_milli.load(Ordering::Relaxed) as f32 / 1000.0
    }
}
