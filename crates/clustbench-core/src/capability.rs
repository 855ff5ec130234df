// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::BenchError;
use crate::dataset::DatasetView;
use crate::repro::RandomState;
use std::fmt::Debug;

/// A clustering algorithm as seen by the runners.
///
/// `fit_predict` returns zero-based labels, one per row of `data`. It must be
/// deterministic given `rng` and may fail for infeasible configurations; the
/// runners count such failures as non-qualifying attempts.
pub trait Clusterer: Send + Sync {
    /// One point of the algorithm's configuration enumeration.
    type Params: Clone + Debug + Send + Sync;

    fn name(&self) -> &'static str;

    fn fit_predict(
        &self,
        data: &DatasetView<'_>,
        n_clusters: usize,
        params: &Self::Params,
        rng: &mut RandomState,
    ) -> Result<Vec<usize>, BenchError>;
}

impl<C: Clusterer + ?Sized> Clusterer for &C {
    type Params = C::Params;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn fit_predict(
        &self,
        data: &DatasetView<'_>,
        n_clusters: usize,
        params: &Self::Params,
        rng: &mut RandomState,
    ) -> Result<Vec<usize>, BenchError> {
        (**self).fit_predict(data, n_clusters, params, rng)
    }
}
