// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Scoped deterministic randomness.
//!
//! A [`RandomState`] bundles the two generator families clustering code draws
//! from: an array-sampling generator ([`ChaCha8Rng`]) used for index and
//! initialization sampling, and a general-purpose generator ([`StdRng`]).
//! The state is an explicit owned value threaded into every clustering call.
//!
//! [`SeedScope`] pins both generators to a seed for the lifetime of a guard
//! and restores the exact prior state of each generator when the guard drops,
//! including on early return and unwinding. Because the guard holds the only
//! mutable borrow of the state, nested scopes unwind in stack order and no
//! other code can touch the state while a scope is open.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_chacha::ChaCha8Rng;
use std::ops::{Deref, DerefMut};

/// Seed used by the benchmark when none is configured.
pub const DEFAULT_SEED: u64 = 123;

/// Seed of the state a run starts from before any scope is entered.
const INITIAL_STATE_SEED: u64 = 0;

/// Owned generator state for both generator families.
#[derive(Clone, Debug)]
pub struct RandomState {
    array: ChaCha8Rng,
    general: StdRng,
}

impl Default for RandomState {
    fn default() -> Self {
        Self::from_seed(INITIAL_STATE_SEED)
    }
}

impl RandomState {
    /// Creates a state with both generators seeded from `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            array: ChaCha8Rng::seed_from_u64(seed),
            general: StdRng::seed_from_u64(seed),
        }
    }

    /// Reseeds both generators in place.
    pub fn reseed(&mut self, seed: u64) {
        *self = Self::from_seed(seed);
    }

    /// Generator for array sampling (initial centers, index draws).
    pub fn array(&mut self) -> &mut ChaCha8Rng {
        &mut self.array
    }

    /// General-purpose generator.
    pub fn general(&mut self) -> &mut StdRng {
        &mut self.general
    }

    /// Opens a scope. With `Some(seed)` the state is snapshotted and reseeded;
    /// with `None` the scope is transparent.
    pub fn scope(&mut self, seed: Option<u64>) -> SeedScope<'_> {
        let saved = seed.map(|seed| {
            let saved = self.clone();
            self.reseed(seed);
            saved
        });
        SeedScope { state: self, saved }
    }

    /// Runs `block` inside [`RandomState::scope`].
    pub fn with_seed<R>(
        &mut self,
        seed: Option<u64>,
        block: impl FnOnce(&mut RandomState) -> R,
    ) -> R {
        let mut scope = self.scope(seed);
        block(&mut scope)
    }
}

/// Guard returned by [`RandomState::scope`].
#[derive(Debug)]
pub struct SeedScope<'a> {
    state: &'a mut RandomState,
    saved: Option<RandomState>,
}

impl SeedScope<'_> {
    /// True when the scope reseeded the state and will restore it on drop.
    pub fn is_pinned(&self) -> bool {
        self.saved.is_some()
    }
}

impl Deref for SeedScope<'_> {
    type Target = RandomState;

    fn deref(&self) -> &RandomState {
        &*self.state
    }
}

impl DerefMut for SeedScope<'_> {
    fn deref_mut(&mut self) -> &mut RandomState {
        &mut *self.state
    }
}

impl Drop for SeedScope<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            *self.state = saved;
        }
    }
}
