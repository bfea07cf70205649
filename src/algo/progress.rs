//! Progress reporting for the simplification pipeline.
//!
//! # Example
//!
//! ```
//! use sander::algo::Progress;
//! use sander::algo::simplify::{simplify_with_progress, SimplifyOptions};
//!
//! let progress = Progress::new(|current, total, message| {
//!     println!("[{}/{}] {}", current, total, message);
//! });
//!
//! let result = simplify_with_progress(&[], &SimplifyOptions::default(), &progress).unwrap();
//! assert!(result.charts.is_empty());
//! ```

/// Callback receiving `(current, total, message)` updates.
///
/// Top-level steps are reported as `current` out of `total` steps. Work
/// inside a step is reported through [`Progress::report_sub`], scaled so that
/// `total` is the step count times 1000.
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Wrap a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// A reporter that ignores every update.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }

    /// Report step `current` of `total`.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Report `done` of `count` units of work inside step `step` of `steps`.
    ///
    /// Nothing is reported when `count` or `steps` is zero.
    #[inline]
    pub fn report_sub(&self, done: usize, count: usize, step: usize, steps: usize, message: &str) {
        if count == 0 || steps == 0 {
            return;
        }
        let within = done.min(count) * 1000 / count;
        (self.callback)(step * 1000 + within, steps * 1000, message);
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}
