use soundsentry_foundation::AudioError;

/// The acquisition seam between the capture layer and the monitor loop.
///
/// One call yields one fixed-length buffer. Implementations may block up to
/// their own read timeout. Tests script this trait to drive the loop
/// deterministically.
pub trait SampleSource {
    fn read_chunk(&mut self) -> Result<Vec<i16>, AudioError>;

    fn chunk_size(&self) -> usize;
}
