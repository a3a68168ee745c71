pub mod capture;
pub mod device;
pub mod ring_buffer;
pub mod source;

// Public API
pub use capture::{CaptureStats, CaptureStream};
pub use device::{DeviceInfo, DeviceManager};
pub use ring_buffer::SampleRing;
pub use source::SampleSource;
