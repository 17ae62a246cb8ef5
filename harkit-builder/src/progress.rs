use crate::ProgressSink;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Thread-safe counter implementation of [`ProgressSink`].
#[derive(Debug, Default)]
pub struct CountingProgress {
    total: AtomicUsize,
    done: AtomicUsize,
}

impl CountingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }
}

impl ProgressSink for CountingProgress {
    fn set_total_work(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
        self.done.store(0, Ordering::SeqCst);
    }

    fn worked(&self, units: usize) {
        let done = self.done.fetch_add(units, Ordering::SeqCst) + units;
        debug!("Progress {}/{}", done, self.total());
    }
}

#[test]
fn test_counting_progress() {
    let progress = CountingProgress::new();
    progress.set_total_work(3);
    progress.worked(1);
    progress.worked(1);
    assert_eq!(3, progress.total());
    assert_eq!(2, progress.done());

    progress.set_total_work(5);
    assert_eq!(0, progress.done());
}
