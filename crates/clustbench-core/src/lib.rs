// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Deterministic orchestration for clustering benchmarks.
//!
//! The crate owns three things: [`RandomState`] plus its [`SeedScope`] guard,
//! the five-slot k-range derived from a ground-truth cluster count, and the
//! runners that decide which clustering attempt is kept for every slot. The
//! clustering algorithms themselves plug in through [`Clusterer`].

pub mod capability;
pub mod control;
pub mod dataset;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod execution_context;
pub mod observability;
pub mod repro;
pub mod results;
pub mod runners;
pub mod slots;

pub use capability::Clusterer;
pub use control::CancelToken;
pub use dataset::{DatasetView, TrueLabels};
pub use diagnostics::{DIAGNOSTICS_SCHEMA_VERSION, FallbackKind, RunDiagnostics, SlotDiagnostics};
pub use driver::{BenchmarkDriver, BenchmarkOutcome};
pub use error::BenchError;
pub use execution_context::ExecutionContext;
pub use observability::ProgressSink;
pub use repro::{DEFAULT_SEED, RandomState, SeedScope};
pub use results::{AcceptedResult, Provenance, ResultMatrix};
pub use runners::{
    AcceptancePolicy, FirstWinsGridRunner, FixedConfigRunner, LastWinsGridRunner, ParameterGrid,
    SlotRun, SlotRunner,
};
pub use slots::{KSlot, MIN_TARGET_CLUSTERS, SLOT_COUNT, SLOT_OFFSETS, SlotTable, generate_slots};
