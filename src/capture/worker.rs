//! Background capture writer.
//!
//! Moves encoding and disk I/O off the render thread. The render thread
//! hands over an owned [`CapturedFrame`] and continues; outcomes come back
//! over a channel and are collected on the render thread.

use std::sync::mpsc;

use super::writer::{CapturedFrame, FrameWriter};
use super::{CaptureError, CaptureOutcome};

enum WorkerRequest {
    Write(CapturedFrame),
    Shutdown,
}

/// Thread running a [`FrameWriter`].
pub struct CaptureWorker {
    request_tx: mpsc::Sender<WorkerRequest>,
    outcome_rx: mpsc::Receiver<CaptureOutcome>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CaptureWorker {
    /// Spawn the writer thread.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::Error`] if the thread fails to spawn.
    pub fn spawn(writer: Box<dyn FrameWriter>) -> Result<Self, std::io::Error> {
        let (request_tx, request_rx) = mpsc::channel();
        let (outcome_tx, outcome_rx) = mpsc::channel();
        let thread = std::thread::Builder::new()
            .name("capture-writer".into())
            .spawn(move || Self::thread_loop(writer, &request_rx, &outcome_tx))?;
        Ok(Self {
            request_tx,
            outcome_rx,
            thread: Some(thread),
        })
    }

    /// Queue `frame` for writing.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::WorkerGone`] if the thread has exited.
    pub fn submit(&self, frame: CapturedFrame) -> Result<(), CaptureError> {
        self.request_tx
            .send(WorkerRequest::Write(frame))
            .map_err(|_| CaptureError::WorkerGone)
    }

    /// Outcomes finished since the last call, oldest first.
    pub fn try_recv_outcomes(&self) -> Vec<CaptureOutcome> {
        self.outcome_rx.try_iter().collect()
    }

    /// Finish queued writes, then stop the thread.
    pub fn shutdown(&mut self) {
        let _ = self.request_tx.send(WorkerRequest::Shutdown);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("capture writer thread panicked");
            }
        }
    }

    fn thread_loop(
        mut writer: Box<dyn FrameWriter>,
        request_rx: &mpsc::Receiver<WorkerRequest>,
        outcome_tx: &mpsc::Sender<CaptureOutcome>,
    ) {
        while let Ok(WorkerRequest::Write(frame)) = request_rx.recv() {
            let result = writer.write(&frame);
            if let Err(e) = &result {
                log::error!(
                    "capture of frame {} failed: {e}",
                    frame.frame_index()
                );
            }
            let _ = outcome_tx.send(CaptureOutcome {
                frame_index: frame.frame_index(),
                result,
            });
        }
        log::debug!("capture writer exiting");
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use super::*;

    struct Recording {
        seen: Arc<Mutex<Vec<u64>>>,
    }

    impl FrameWriter for Recording {
        fn write(
            &mut self,
            frame: &CapturedFrame,
        ) -> Result<PathBuf, CaptureError> {
            self.seen.lock().unwrap().push(frame.frame_index());
            if frame.frame_index() % 2 == 0 {
                Ok(PathBuf::from(format!("{}.png", frame.frame_index())))
            } else {
                Err(CaptureError::Render("odd frame".into()))
            }
        }
    }

    #[test]
    fn writes_in_order_and_reports_outcomes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut worker = CaptureWorker::spawn(Box::new(Recording {
            seen: Arc::clone(&seen),
        }))
        .unwrap();
        for i in 0..4 {
            worker
                .submit(CapturedFrame::new(1, 1, vec![0; 4], i).unwrap())
                .unwrap();
        }
        worker.shutdown();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);

        let outcomes = worker.try_recv_outcomes();
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert_eq!(outcomes[3].frame_index, 3);
    }

    #[test]
    fn submit_after_shutdown_fails() {
        let mut worker = CaptureWorker::spawn(Box::new(Recording {
            seen: Arc::new(Mutex::new(Vec::new())),
        }))
        .unwrap();
        worker.shutdown();
        let frame = CapturedFrame::new(1, 1, vec![0; 4], 0).unwrap();
        assert!(matches!(
            worker.submit(frame),
            Err(CaptureError::WorkerGone)
        ));
    }
}
