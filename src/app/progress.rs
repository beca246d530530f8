//! Progress reporting for the fetch and download phases
//!
//! The orchestrator owns the receiving end of the channel; pipeline stages
//! only hold a cloneable [`ProgressReporter`]. Sending never blocks and a
//! dropped receiver is not an error.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

/// Pipeline phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Resolving tag indexes to post ids
    Resolve,
    /// Fetching post metadata
    Fetch,
    /// Downloading media and writing tag files
    Download,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Resolve => "Resolve Tags",
            Phase::Fetch => "Initialize Dataset",
            Phase::Download => "Download Posts",
        };
        f.write_str(name)
    }
}

/// Events emitted while a pipeline runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A phase started with `total` units of work
    PhaseStarted { phase: Phase, total: usize },
    /// One post metadata fetch completed
    PostFetched { completed: usize },
    /// Bytes written for one media file; `total` is unknown when the
    /// server sent no usable content length
    MediaProgress {
        file: String,
        written: u64,
        total: Option<u64>,
    },
    /// One post's media and tag file are on disk
    PostDownloaded {
        dataid: String,
        files: usize,
        completed: usize,
    },
    /// A phase finished
    PhaseFinished { phase: Phase },
}

/// Cloneable handle used by pipeline stages to report progress
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
    completed: Arc<AtomicUsize>,
}

impl ProgressReporter {
    /// Reporter sending to `tx`
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self {
            tx: Some(tx),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Reporter with its receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Reporter that only counts
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Units completed in the current phase
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn phase_started(&self, phase: Phase, total: usize) {
        self.completed.store(0, Ordering::SeqCst);
        self.send(ProgressEvent::PhaseStarted { phase, total });
    }

    pub fn phase_finished(&self, phase: Phase) {
        self.send(ProgressEvent::PhaseFinished { phase });
    }

    pub fn post_fetched(&self) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.send(ProgressEvent::PostFetched { completed });
    }

    pub fn media_progress(&self, file: &str, written: u64, total: Option<u64>) {
        self.send(ProgressEvent::MediaProgress {
            file: file.to_string(),
            written,
            total,
        });
    }

    pub fn post_downloaded(&self, dataid: &str, files: usize) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.send(ProgressEvent::PostDownloaded {
            dataid: dataid.to_string(),
            files,
            completed,
        });
    }

    fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                trace!("Progress receiver dropped, discarding event");
            }
        }
    }
}
