pub mod monitor;
pub mod stats;

pub use monitor::MonitorHandle;
pub use stats::MonitorStats;
