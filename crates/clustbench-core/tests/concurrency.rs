// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use clustbench_core::{
    BenchError, BenchmarkDriver, CancelToken, Clusterer, DatasetView, ExecutionContext,
    LastWinsGridRunner, ParameterGrid, RandomState, TrueLabels,
};
use rand::Rng;
use std::thread;
use std::time::{Duration, Instant};

/// Random labels that take a little time per call.
struct SlowRandomClusterer {
    delay: Duration,
}

impl Clusterer for SlowRandomClusterer {
    type Params = (u32, u32);

    fn name(&self) -> &'static str {
        "slow-random"
    }

    fn fit_predict(
        &self,
        data: &DatasetView<'_>,
        n_clusters: usize,
        _params: &Self::Params,
        rng: &mut RandomState,
    ) -> Result<Vec<usize>, BenchError> {
        thread::sleep(self.delay);
        Ok((0..data.n())
            .map(|_| rng.general().gen_range(0..n_clusters))
            .collect())
    }
}

fn inputs(n: usize) -> (Vec<f64>, TrueLabels) {
    let values = (0..n).map(|i| i as f64).collect();
    let truth = TrueLabels::new((0..n).map(|i| 1 + i % 3).collect()).expect("valid labels");
    (values, truth)
}

#[test]
fn threaded_runs_keep_random_state_isolated() {
    const THREADS: usize = 4;

    let mut workers = Vec::with_capacity(THREADS);
    for _ in 0..THREADS {
        workers.push(thread::spawn(|| {
            let (values, truth) = inputs(16);
            let data = DatasetView::new(&values, 16, 1).expect("valid dataset");
            let grid = ParameterGrid::<u32, u32>::new(vec![1, 2], vec![1, 2, 3]).expect("valid grid");
            let runner = LastWinsGridRunner::new(
                SlowRandomClusterer {
                    delay: Duration::ZERO,
                },
                grid,
            );
            BenchmarkDriver::new(&runner)
                .run(&data, &truth, &ExecutionContext::new())
                .expect("threaded run should succeed")
                .matrix
        }));
    }

    let matrices: Vec<_> = workers
        .into_iter()
        .map(|worker| worker.join().expect("thread should join cleanly"))
        .collect();
    assert!(matrices.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn cancellation_from_another_thread_stops_the_sweep() {
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();
    let worker = thread::spawn(move || {
        let (values, truth) = inputs(8);
        let data = DatasetView::new(&values, 8, 1).expect("valid dataset");
        let grid =
            ParameterGrid::<u32, u32>::new((0..50).collect(), (0..50).collect()).expect("valid grid");
        let runner = LastWinsGridRunner::new(
            SlowRandomClusterer {
                delay: Duration::from_millis(1),
            },
            grid,
        );
        let ctx = ExecutionContext::new().with_cancel(&worker_cancel);
        let started = Instant::now();
        let result = BenchmarkDriver::new(&runner).run(&data, &truth, &ctx);
        (result, started.elapsed())
    });

    thread::sleep(Duration::from_millis(20));
    cancel.cancel();

    let (result, elapsed) = worker.join().expect("thread should join cleanly");
    let err = result.expect_err("cancelled sweep must fail");
    assert_eq!(err, BenchError::Cancelled);
    // The full grid would take at least 12.5 seconds.
    assert!(elapsed < Duration::from_secs(10));
}
