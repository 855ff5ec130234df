// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::BenchError;
use crate::control::CancelToken;
use crate::observability::ProgressSink;

/// Unified execution context passed through runner calls.
#[derive(Clone, Copy, Default)]
pub struct ExecutionContext<'a> {
    pub cancel: Option<&'a CancelToken>,
    pub progress: Option<&'a dyn ProgressSink>,
    /// Allows runners to evaluate independent grid cells concurrently.
    /// Only honored when the `rayon` feature is enabled.
    pub parallel: bool,
}

impl<'a> ExecutionContext<'a> {
    /// Creates a sequential context with no optional hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the optional cancellation token.
    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Sets an optional progress sink.
    pub fn with_progress_sink(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Returns true when cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    /// Returns a cancelled error when cancellation has been requested.
    pub fn check_cancelled(&self) -> Result<(), BenchError> {
        if self.is_cancelled() {
            return Err(BenchError::cancelled());
        }
        Ok(())
    }

    /// Returns true when parallel evaluation is both requested and compiled in.
    pub fn allows_parallel(&self) -> bool {
        cfg!(feature = "rayon") && self.parallel
    }

    /// Emits clamped progress to the sink, if configured.
    pub fn report_progress(&self, fraction: f32) {
        if !fraction.is_finite() {
            return;
        }

        if let Some(sink) = self.progress {
            sink.on_progress(fraction.clamp(0.0, 1.0));
        }
    }

    /// Reports `done / total` cells, ignoring an empty total.
    pub fn report_cells(&self, done: usize, total: usize) {
        if total == 0 {
            return;
        }
        self.report_progress(done as f32 / total as f32);
    }
}

impl std::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("cancel", &self.cancel)
            .field("progress", &self.progress.is_some())
            .field("parallel", &self.parallel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::ExecutionContext;
    use crate::control::CancelToken;
    use crate::observability::ProgressSink;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockProgressSink {
        values: Mutex<Vec<f32>>,
    }

    impl ProgressSink for MockProgressSink {
        fn on_progress(&self, fraction: f32) {
            self.values
                .lock()
                .expect("progress mutex should lock")
                .push(fraction);
        }
    }

    #[test]
    fn execution_context_new_sets_expected_defaults() {
        let ctx = ExecutionContext::new();
        assert!(ctx.cancel.is_none());
        assert!(ctx.progress.is_none());
        assert!(!ctx.parallel);
        assert!(!ctx.allows_parallel());
    }

    #[test]
    fn builder_methods_set_requested_fields() {
        let cancel = CancelToken::new();
        let progress = MockProgressSink::default();

        let ctx = ExecutionContext::new()
            .with_cancel(&cancel)
            .with_progress_sink(&progress)
            .with_parallel(true);

        assert!(ctx.cancel.is_some_and(|token| std::ptr::eq(token, &cancel)));
        assert!(ctx.progress.is_some());
        assert!(ctx.parallel);
        assert_eq!(ctx.allows_parallel(), cfg!(feature = "rayon"));
    }

    #[test]
    fn check_cancelled_returns_cancelled_error_when_requested() {
        let cancel = CancelToken::new();
        let ctx = ExecutionContext::new().with_cancel(&cancel);

        assert!(ctx.check_cancelled().is_ok());
        cancel.cancel();

        let err = ctx
            .check_cancelled()
            .expect_err("cancelled token should return an error");
        assert_eq!(err.to_string(), "cancelled");
    }

    #[test]
    fn report_progress_clamps_and_skips_non_finite_values() {
        let progress = MockProgressSink::default();
        let ctx = ExecutionContext::new().with_progress_sink(&progress);

        ctx.report_progress(-0.5);
        ctx.report_progress(0.25);
        ctx.report_progress(f32::NAN);
        ctx.report_cells(3, 2);
        ctx.report_cells(1, 0);

        let values = progress
            .values
            .lock()
            .expect("progress mutex should lock")
            .clone();
        assert_eq!(values, vec![0.0, 0.25, 1.0]);
    }
}
