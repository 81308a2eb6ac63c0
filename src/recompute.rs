//! Background recomputation for live parameter changes.
//!
//! A host (slider UI, file watcher, ...) submits parameter updates as fast as
//! it likes. A single worker thread owns a [`NormalMapper`] and processes
//! them one pass at a time: a pass in flight always runs to completion, and
//! every update that arrived meanwhile is coalesced into one follow-up pass
//! using only the most recent parameters. Results come back over a channel
//! tagged with the generation of the update they reflect.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::{NormalMapError, Result};
use crate::field::{ensure_non_empty, IntensityField, NormalMapImage};
use crate::params::Parameters;
use crate::pipeline::NormalMapper;

/// Result of one completed pass.
#[derive(Debug)]
pub struct RecomputeOutcome {
    /// Generation returned by the [`RecomputeWorker::submit`] call this pass reflects.
    pub generation: u64,
    pub parameters: Parameters,
    pub result: Result<NormalMapImage>,
}

enum Request {
    Update(u64, Parameters),
    Source(IntensityField),
    Shutdown,
}

/// Handle to the recompute thread.
pub struct RecomputeWorker {
    requests: Sender<Request>,
    outcomes: Receiver<RecomputeOutcome>,
    next_generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl RecomputeWorker {
    /// Start a worker over `source`. No pass runs until the first [`submit`](Self::submit).
    pub fn spawn(source: IntensityField) -> Result<Self> {
        let mapper = NormalMapper::new(source)?;
        let (request_tx, request_rx) = mpsc::channel();
        let (outcome_tx, outcome_rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("normalmap-recompute".to_string())
            .spawn(move || run(mapper, request_rx, outcome_tx))?;

        Ok(Self {
            requests: request_tx,
            outcomes: outcome_rx,
            next_generation: 1,
            handle: Some(handle),
        })
    }

    /// Queue a parameter update and return its generation number.
    pub fn submit(&mut self, parameters: Parameters) -> Result<u64> {
        let generation = self.next_generation;
        self.requests
            .send(Request::Update(generation, parameters))
            .map_err(|_| NormalMapError::WorkerStopped)?;
        self.next_generation += 1;
        Ok(generation)
    }

    /// Swap the source image. The latest accepted parameters are reapplied to it.
    pub fn replace_source(&self, source: IntensityField) -> Result<()> {
        ensure_non_empty(source.view())?;
        self.requests
            .send(Request::Source(source))
            .map_err(|_| NormalMapError::WorkerStopped)
    }

    /// Newest outcome already available, discarding older ones.
    pub fn try_latest(&self) -> Option<RecomputeOutcome> {
        self.outcomes.try_iter().last()
    }

    /// Block until the next outcome, or `None` once the worker has stopped.
    pub fn recv(&self) -> Option<RecomputeOutcome> {
        self.outcomes.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<RecomputeOutcome> {
        match self.outcomes.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Block until a pass reflecting `generation` (or a newer one) finishes.
    pub fn wait_for(&self, generation: u64) -> Option<RecomputeOutcome> {
        while let Ok(outcome) = self.outcomes.recv() {
            if outcome.generation >= generation {
                return Some(outcome);
            }
        }
        None
    }

    /// Stop after the pass in flight (if any) and join the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.requests.send(Request::Shutdown);
            if handle.join().is_err() {
                log::error!("recompute worker panicked");
            }
        }
    }
}

impl Drop for RecomputeWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(mut mapper: NormalMapper, requests: Receiver<Request>, outcomes: Sender<RecomputeOutcome>) {
    let mut current: Option<(u64, Parameters)> = None;

    while let Ok(first) = requests.recv() {
        let mut latest: Option<(u64, Parameters)> = None;
        let mut source_changed = false;
        let mut coalesced = 0usize;

        for request in std::iter::once(first).chain(requests.try_iter()) {
            match request {
                Request::Update(generation, parameters) => {
                    if latest.is_some() {
                        coalesced += 1;
                    }
                    latest = Some((generation, parameters));
                }
                Request::Source(source) => match mapper.set_source(source) {
                    Ok(()) => source_changed = true,
                    Err(err) => log::warn!("ignoring source replacement: {}", err),
                },
                Request::Shutdown => {
                    log::debug!("recompute worker shutting down");
                    return;
                }
            }
        }

        if coalesced > 0 {
            log::trace!("coalesced {} parameter updates", coalesced);
        }

        let next = match latest {
            Some(update) => Some(update),
            None if source_changed => current,
            None => None,
        };
        let Some((generation, parameters)) = next else {
            continue;
        };

        let result = mapper.update(&parameters).cloned();
        match &result {
            Ok(_) => current = Some((generation, parameters)),
            Err(err) => log::warn!("recompute generation {} failed: {}", generation, err),
        }

        let outcome = RecomputeOutcome {
            generation,
            parameters,
            result,
        };
        if outcomes.send(outcome).is_err() {
            // Host dropped the receiver.
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::compute_normal_map;
    use ndarray::Array2;

    fn ramp() -> IntensityField {
        Array2::from_shape_fn((12, 16), |(y, x)| (x * 9 + y * 4) as f32)
    }

    #[test]
    fn test_single_update() {
        let source = ramp();
        let mut worker = RecomputeWorker::spawn(source.clone()).unwrap();
        let params = Parameters::new(25.0, 3, 0.0);
        let generation = worker.submit(params).unwrap();

        let outcome = worker.wait_for(generation).unwrap();
        assert_eq!(outcome.generation, generation);
        assert_eq!(outcome.parameters, params);
        let expected = compute_normal_map(source.view(), &params).unwrap();
        assert_eq!(outcome.result.unwrap(), expected);
        worker.shutdown();
    }

    #[test]
    fn test_burst_ends_with_latest_parameters() {
        let source = ramp();
        let mut worker = RecomputeWorker::spawn(source.clone()).unwrap();
        let last = (1..=20)
            .map(|i| worker.submit(Parameters::new(i as f32 * 5.0, 5, 0.0)).unwrap())
            .last()
            .unwrap();

        let outcome = worker.wait_for(last).unwrap();
        assert_eq!(outcome.generation, last);
        assert_eq!(outcome.parameters.strength, 100.0);
        let expected = compute_normal_map(source.view(), &Parameters::new(100.0, 5, 0.0)).unwrap();
        assert_eq!(outcome.result.unwrap(), expected);
    }

    #[test]
    fn test_invalid_update_reported_and_worker_survives() {
        let mut worker = RecomputeWorker::spawn(ramp()).unwrap();
        let bad = worker.submit(Parameters::new(10.0, 0, 0.0)).unwrap();
        let outcome = worker.wait_for(bad).unwrap();
        assert!(matches!(outcome.result, Err(NormalMapError::InvalidParameter(_))));

        let good = worker.submit(Parameters::default()).unwrap();
        let outcome = worker.wait_for(good).unwrap();
        assert!(outcome.result.is_ok());
    }

    #[test]
    fn test_replace_source_reapplies_parameters() {
        let mut worker = RecomputeWorker::spawn(ramp()).unwrap();
        let generation = worker.submit(Parameters::default()).unwrap();
        worker.wait_for(generation).unwrap();

        let flat = Array2::<f32>::from_elem((5, 6), 200.0);
        worker.replace_source(flat).unwrap();
        let outcome = worker.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(outcome.generation, generation);
        let map = outcome.result.unwrap();
        assert_eq!(map.dim(), (5, 6, 3));
        assert!(map.iter().step_by(3).all(|&r| r == 128));
    }

    #[test]
    fn test_replace_source_skips_rejected_parameters() {
        let mut worker = RecomputeWorker::spawn(ramp()).unwrap();
        let good_params = Parameters::new(12.0, 5, 0.0);
        let good = worker.submit(good_params).unwrap();
        assert!(worker.wait_for(good).unwrap().result.is_ok());

        let bad = worker.submit(Parameters::new(10.0, 0, 0.0)).unwrap();
        assert!(worker.wait_for(bad).unwrap().result.is_err());

        let flat = Array2::<f32>::from_elem((5, 6), 40.0);
        worker.replace_source(flat.clone()).unwrap();
        let outcome = worker.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(outcome.generation, good);
        assert_eq!(outcome.parameters, good_params);
        assert_eq!(
            outcome.result.unwrap(),
            compute_normal_map(flat.view(), &good_params).unwrap()
        );
    }

    #[test]
    fn test_replace_source_rejects_empty() {
        let worker = RecomputeWorker::spawn(ramp()).unwrap();
        assert!(worker.replace_source(Array2::zeros((0, 0))).is_err());
    }

    #[test]
    fn test_no_pass_without_parameters() {
        let worker = RecomputeWorker::spawn(ramp()).unwrap();
        worker.replace_source(ramp()).unwrap();
        assert!(worker.recv_timeout(Duration::from_millis(100)).is_none());
        assert!(worker.try_latest().is_none());
    }
}
