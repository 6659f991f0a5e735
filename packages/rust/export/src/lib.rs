//! Export orchestration: walks spaces, pages, and attachments through the
//! API client and writes them to the local mirror layout.

mod orchestrator;
mod sample;
mod sink;

pub use orchestrator::{Exporter, RunSummary};
pub use sample::Sampler;
pub use sink::ExportSink;

/// Serialized progress channel for user-facing output.
///
/// Worker tasks run concurrently; anything they want to show the user goes
/// through one of these methods so lines never interleave mid-write.
pub trait ProgressReporter: Send + Sync {
    /// A new phase of the run has started.
    fn phase(&self, name: &str);
    /// Transient status, safe to overwrite in place.
    fn status(&self, line: &str);
    /// A line that should persist in the output (skips, warnings).
    fn notice(&self, line: &str);
    /// The run finished.
    fn done(&self, summary: &RunSummary);
}

/// Reporter that discards everything. Used in tests.
#[derive(Debug, Default)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn status(&self, _line: &str) {}
    fn notice(&self, _line: &str) {}
    fn done(&self, _summary: &RunSummary) {}
}
