// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! The five-slot k-range swept around a ground-truth cluster count.

use crate::BenchError;

/// Number of sweep positions per run.
pub const SLOT_COUNT: usize = 5;

/// Offsets from the ground-truth `k`, in slot-id order.
pub const SLOT_OFFSETS: [i64; SLOT_COUNT] = [-2, -1, 0, 1, 2];

/// Smallest target count a slot may carry. Lower raw values clamp to this.
pub const MIN_TARGET_CLUSTERS: usize = 2;

/// Sweep position identifier in `0..SLOT_COUNT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KSlot(u8);

impl KSlot {
    pub const ALL: [KSlot; SLOT_COUNT] = [KSlot(0), KSlot(1), KSlot(2), KSlot(3), KSlot(4)];

    pub fn new(id: usize) -> Option<Self> {
        if id < SLOT_COUNT {
            Some(Self(id as u8))
        } else {
            None
        }
    }

    pub fn id(self) -> usize {
        usize::from(self.0)
    }

    pub fn offset(self) -> i64 {
        SLOT_OFFSETS[self.id()]
    }
}

impl std::fmt::Display for KSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot {} (k{:+})", self.0, self.offset())
    }
}

/// Target cluster count per slot, derived once from the ground-truth `k`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotTable {
    ground_truth_k: usize,
    targets: [usize; SLOT_COUNT],
}

impl SlotTable {
    pub fn ground_truth_k(&self) -> usize {
        self.ground_truth_k
    }

    pub fn target(&self, slot: KSlot) -> usize {
        self.targets[slot.id()]
    }

    pub fn targets(&self) -> [usize; SLOT_COUNT] {
        self.targets
    }

    /// `(slot, target)` pairs in slot-id order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (KSlot, usize)> + '_ {
        KSlot::ALL
            .into_iter()
            .map(move |slot| (slot, self.targets[slot.id()]))
    }

    pub fn max_target(&self) -> usize {
        self.targets[SLOT_COUNT - 1]
    }
}

/// Maps a ground-truth cluster count to the five sweep targets
/// `max(2, k + offset)` for offsets `-2..=2`.
///
/// ```
/// use clustbench_core::generate_slots;
///
/// let slots = generate_slots(1).expect("k=1 is valid");
/// assert_eq!(slots.targets(), [2, 2, 2, 2, 3]);
/// ```
pub fn generate_slots(k: usize) -> Result<SlotTable, BenchError> {
    if k == 0 {
        return Err(BenchError::invalid_input(
            "ground-truth cluster count must be >= 1; got 0",
        ));
    }
    let base = i64::try_from(k).map_err(|_| {
        BenchError::invalid_input(format!("ground-truth cluster count {k} is too large"))
    })?;

    let mut targets = [MIN_TARGET_CLUSTERS; SLOT_COUNT];
    for (target, offset) in targets.iter_mut().zip(SLOT_OFFSETS) {
        let raw = base.checked_add(offset).ok_or_else(|| {
            BenchError::invalid_input(format!("ground-truth cluster count {k} is too large"))
        })?;
        let raw = usize::try_from(raw).unwrap_or(0);
        *target = raw.max(MIN_TARGET_CLUSTERS);
    }

    Ok(SlotTable {
        ground_truth_k: k,
        targets,
    })
}
