/// Line-oriented status/error output from the monitor loop.
///
/// The core reports through this trait and never depends on where the lines
/// end up (console, log file, a test collector).
pub trait DiagnosticSink: Send + Sync {
    fn line(&self, text: &str);
}
