//! Per-run state shared by every stage: the invocation root, a
//! cancellation token, the warning sink and the worker count.

use crate::error::{CollectError, Warning};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

/// Cooperative cancellation: an explicit flag plus an optional deadline.
///
/// Clones share the flag, so cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that reports cancelled once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Thread-safe warning sink.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Mutex<Vec<Warning>>,
}

impl Diagnostics {
    /// Logs the warning and keeps it for the outcome.
    pub fn push(&self, warning: impl Into<Warning>) {
        let warning = warning.into();
        warn!("{}", warning);
        self.lock().push(warning);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Warning> {
        self.lock().clone()
    }

    /// Drains every warning collected so far.
    pub fn take(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.lock())
    }

    // A panicking worker must not take the warnings down with it.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Warning>> {
        self.warnings.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Everything a stage needs besides its own input.
#[derive(Debug)]
pub struct AnalysisContext {
    root: PathBuf,
    cancel: CancellationToken,
    diagnostics: Diagnostics,
    jobs: Option<usize>,
}

impl AnalysisContext {
    /// Creates a context for `root`, which must exist. The root is
    /// canonicalized so every path derived from it is absolute.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, CollectError> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|source| CollectError::Root {
            path: root.to_path_buf(),
            source,
        })?;
        Ok(Self {
            root,
            cancel: CancellationToken::new(),
            diagnostics: Diagnostics::default(),
            jobs: None,
        })
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Caps the worker pool. `None` or `0` uses every available core.
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs.filter(|&n| n > 0);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn jobs(&self) -> Option<usize> {
        self.jobs
    }

    /// Fails with `Cancelled` if the run should stop.
    pub fn check_cancelled(&self) -> Result<(), CollectError> {
        if self.cancel.is_cancelled() {
            Err(CollectError::Cancelled)
        } else {
            Ok(())
        }
    }
}
