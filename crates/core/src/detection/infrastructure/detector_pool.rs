use std::panic::{self, AssertUnwindSafe};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::detection::domain::face_detector::{DetectorError, FaceDetector};
use crate::shared::face::RawDetection;
use crate::shared::frame::Frame;

/// Pending requests allowed per worker before `detect` blocks the caller.
const QUEUE_DEPTH_PER_WORKER: usize = 4;

type DetectResult = Result<Vec<RawDetection>, DetectorError>;

struct Job {
    frame: Frame,
    reply: Sender<DetectResult>,
}

/// Shares a fixed set of detector instances between any number of callers.
///
/// Each detector lives on its own worker thread and handles one frame at a
/// time; requests queue on a bounded channel and the caller blocks until its
/// own result comes back. With a single worker every inference in the
/// process is serialized.
///
/// A detector panic is contained to the request that triggered it, which
/// gets `DetectorError::Unavailable`; the worker keeps serving.
pub struct DetectorPool {
    job_tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl DetectorPool {
    pub fn new(detectors: Vec<Box<dyn FaceDetector>>) -> Self {
        let capacity = detectors.len().max(1) * QUEUE_DEPTH_PER_WORKER;
        let (job_tx, job_rx) = crossbeam_channel::bounded::<Job>(capacity);

        let workers = detectors
            .into_iter()
            .enumerate()
            .map(|(index, detector)| spawn_worker(index, detector, job_rx.clone()))
            .collect::<Vec<_>>();
        log::debug!("Detector pool started with {} worker(s)", workers.len());

        Self {
            job_tx: Some(job_tx),
            workers,
        }
    }

    /// Pool with exactly one worker.
    pub fn serialized(detector: Box<dyn FaceDetector>) -> Self {
        Self::new(vec![detector])
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Run detection on `frame`, blocking until a worker has answered.
    pub fn detect(&self, frame: Frame) -> DetectResult {
        let job_tx = self.job_tx.as_ref().ok_or(DetectorError::Unavailable)?;
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        job_tx
            .send(Job {
                frame,
                reply: reply_tx,
            })
            .map_err(|_| DetectorError::Unavailable)?;
        reply_rx.recv().map_err(|_| DetectorError::Unavailable)?
    }
}

impl Drop for DetectorPool {
    fn drop(&mut self) {
        drop(self.job_tx.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::warn!("Detector worker exited abnormally");
            }
        }
    }
}

fn spawn_worker(
    index: usize,
    mut detector: Box<dyn FaceDetector>,
    job_rx: Receiver<Job>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for job in job_rx {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| detector.detect(&job.frame)));
            match outcome {
                Ok(result) => {
                    let _ = job.reply.send(result);
                }
                Err(_) => {
                    log::error!("Detector worker {index} panicked");
                    let _ = job.reply.send(Err(DetectorError::Unavailable));
                }
            }
        }
    })
}
