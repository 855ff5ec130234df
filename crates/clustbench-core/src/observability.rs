// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Receives the completed fraction of a sweep, in `[0, 1]`.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, fraction: f32);
}
