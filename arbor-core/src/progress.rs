//! Percentage progress reporting (0..=100) for scans and post-scan tasks.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

type ProgressCallback = dyn Fn(f64) + Send + Sync;

/// Cheaply clonable progress sink.
///
/// Children receive a [`Progress::scaled`] view so they can always report
/// their own 0..=100 range without knowing where they sit in the parent's
/// band.
#[derive(Clone)]
pub struct Progress {
    callback: Arc<ProgressCallback>,
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

impl Progress {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn report(&self, percent: f64) {
        (self.callback)(percent.clamp(0.0, 100.0));
    }

    /// View that maps `0..=100` onto `start..=end` of this sink.
    pub fn scaled(&self, start: f64, end: f64) -> Self {
        let parent = self.clone();
        Self::new(move |percent| {
            parent.report(start + (end - start) * (percent / 100.0));
        })
    }

    /// View that drops reports lower than the highest value seen so far.
    pub fn monotonic(&self) -> Self {
        let parent = self.clone();
        let highest = Arc::new(AtomicU64::new(0f64.to_bits()));
        Self::new(move |percent| {
            let mut current = highest.load(Ordering::Acquire);
            loop {
                if percent < f64::from_bits(current) {
                    return;
                }
                match highest.compare_exchange_weak(
                    current,
                    percent.to_bits(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => break,
                    Err(actual) => current = actual,
                }
            }
            parent.report(percent);
        })
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::noop()
    }
}
