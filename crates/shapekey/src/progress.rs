//! Batch progress reporting.
//!
//! Progress is a side channel: batch drivers push [`ProgressUpdate`]s into a
//! caller-supplied sink and never read anything back.

use payu_ipc::ProgressUpdate;

/// Sink that discards every update.
#[cfg(test)]
pub(crate) fn ignore(_: ProgressUpdate) {}

/// Scoped progress for one batch.
///
/// Emits `Begin` on creation and `End` when dropped, so the sink always sees
/// a closed sequence even when the batch bails out early.
pub struct Progress<'a> {
    sink: &'a mut dyn FnMut(ProgressUpdate),
    done: usize,
}

impl<'a> Progress<'a> {
    pub fn begin(sink: &'a mut dyn FnMut(ProgressUpdate), total: usize) -> Self {
        sink(ProgressUpdate::Begin { total });
        Self { sink, done: 0 }
    }

    /// Record one finished item.
    pub fn step(&mut self) {
        self.done += 1;
        (self.sink)(ProgressUpdate::Step { done: self.done });
    }

    pub fn done(&self) -> usize {
        self.done
    }
}

impl Drop for Progress<'_> {
    fn drop(&mut self) {
        (self.sink)(ProgressUpdate::End);
    }
}
