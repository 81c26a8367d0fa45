//! Dedicated inference thread, decoupled from the I/O loop (spec §4.9,
//! §5). Grounded on the teacher's `CameraThread`: a single
//! `Arc<Mutex<Option<T>>>` slot that the worker thread drains with
//! `.take()`, so a `submit()` while a job is in flight silently
//! overwrites (coalesces) the pending one rather than queuing.

use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};

use crate::error::PredictError;
use crate::host::predictor::PredictionResult;

pub enum InferenceOutcome {
    Completed(PredictionResult),
    Failed(PredictError),
}

type PredictFn = dyn Fn(&[f32], String) -> Result<PredictionResult, PredictError> + Send + Sync;

pub struct InferenceWorker {
    slot: Arc<Mutex<Option<(Vec<f32>, String)>>>,
    result_tx: Sender<InferenceOutcome>,
}

impl InferenceWorker {
    /// Spawns the worker thread running `predict` on every coalesced
    /// submission; results arrive on the returned receiver.
    pub fn spawn(predict: Arc<PredictFn>) -> (Self, Receiver<InferenceOutcome>) {
        let slot: Arc<Mutex<Option<(Vec<f32>, String)>>> = Arc::new(Mutex::new(None));
        let (result_tx, result_rx) = flume::unbounded();

        let worker_slot = Arc::clone(&slot);
        let worker_tx = result_tx.clone();
        std::thread::spawn(move || loop {
            let job = worker_slot.lock().unwrap().take();
            match job {
                Some((spectrum, timestamp)) => {
                    let outcome = match predict(&spectrum, timestamp) {
                        Ok(result) => InferenceOutcome::Completed(result),
                        Err(e) => InferenceOutcome::Failed(e),
                    };
                    if worker_tx.send(outcome).is_err() {
                        return;
                    }
                }
                None => std::thread::sleep(std::time::Duration::from_millis(10)),
            }
        });

        (Self { slot, result_tx }, result_rx)
    }

    /// Replaces any pending job with this one (spec §4.9 "overwrite the
    /// pending spectrum").
    pub fn submit(&self, spectrum: Vec<f32>, timestamp: String) {
        *self.slot.lock().unwrap() = Some((spectrum, timestamp));
    }

    #[cfg(test)]
    fn result_sender(&self) -> Sender<InferenceOutcome> {
        self.result_tx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn coalesces_rapid_submits_into_one_completion() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&call_count);
        let predict: Arc<PredictFn> = Arc::new(move |spectrum, timestamp| {
            counted.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(50));
            Ok(PredictionResult {
                timestamp,
                values: [("A".to_string(), spectrum[0])].into_iter().collect(),
            })
        });
        let (worker, rx) = InferenceWorker::spawn(predict);
        let _ = worker.result_sender();

        worker.submit(vec![1.0], "t1".into());
        std::thread::sleep(std::time::Duration::from_millis(5));
        worker.submit(vec![2.0], "t2".into());
        worker.submit(vec![3.0], "t3".into());

        let outcome = rx.recv_timeout(std::time::Duration::from_secs(1)).unwrap();
        match outcome {
            InferenceOutcome::Completed(result) => assert_eq!(result.timestamp, "t1"),
            InferenceOutcome::Failed(_) => panic!("unexpected failure"),
        }
    }
}
