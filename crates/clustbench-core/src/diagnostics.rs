// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::runners::AcceptancePolicy;
use std::borrow::Cow;

/// Diagnostics schema version for benchmark run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// Fallback substituted for a slot whose attempts did not produce a kept result.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallbackKind {
    Collapse,
    SingleCluster,
}

/// Per-slot attempt ledger.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotDiagnostics {
    pub slot: usize,
    pub target: usize,
    /// Clustering calls made for this slot.
    pub attempts: usize,
    /// Calls that returned an error or a labeling of the wrong length.
    pub failures: usize,
    /// Successful calls that did not meet the acceptance rule.
    pub rejections: usize,
    pub accepted_config: Option<String>,
    pub fallback: Option<FallbackKind>,
}

impl SlotDiagnostics {
    pub fn new(slot: usize, target: usize) -> Self {
        Self {
            slot,
            target,
            attempts: 0,
            failures: 0,
            rejections: 0,
            accepted_config: None,
            fallback: None,
        }
    }
}

/// Structured record of one benchmark run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct RunDiagnostics {
    pub schema_version: u32,
    pub engine_version: Option<String>,
    pub algorithm: Cow<'static, str>,
    pub policy: AcceptancePolicy,
    pub seed: Option<u64>,
    pub n: usize,
    pub d: usize,
    pub ground_truth_k: usize,
    pub slots: Vec<SlotDiagnostics>,
    pub runtime_ms: Option<u64>,
    pub used_parallel: bool,
    pub warnings: Vec<String>,
}

impl Default for RunDiagnostics {
    fn default() -> Self {
        Self {
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            algorithm: Cow::Borrowed(""),
            policy: AcceptancePolicy::Fixed,
            seed: None,
            n: 0,
            d: 0,
            ground_truth_k: 0,
            slots: vec![],
            runtime_ms: None,
            used_parallel: false,
            warnings: vec![],
        }
    }
}

impl RunDiagnostics {
    /// Slot ids resolved by a fallback rather than an attempt.
    pub fn unsatisfied_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .filter(|slot| slot.fallback.is_some())
            .map(|slot| slot.slot)
            .collect()
    }

    pub fn total_attempts(&self) -> usize {
        self.slots.iter().map(|slot| slot.attempts).sum()
    }
}
