//! One-shot frame capture: request flag, writers and delivery.
//!
//! UI code asks for a capture through a [`CaptureTrigger`]. The renderer
//! consumes the request at the start of a frame, reads the offscreen
//! target back into a [`CapturedFrame`] and hands it to a [`CaptureSink`],
//! which writes it either inline on the render thread or through a
//! background [`CaptureWorker`].

mod counter;
mod request;
mod worker;
mod writer;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub use counter::CaptureCounter;
pub use request::{CaptureRequest, CaptureTrigger};
pub use worker::CaptureWorker;
pub use writer::{CaptureFormat, CapturedFrame, FrameWriter, ImageFrameWriter};

use crate::options::CaptureOptions;

/// Errors from reading back, encoding or storing a capture.
#[derive(Debug)]
pub enum CaptureError {
    /// Filesystem failure.
    Io(std::io::Error),
    /// Image encoder failure.
    Encode(image::ImageError),
    /// Pixel buffer does not match the frame dimensions.
    InvalidFrame {
        /// Bytes a `width * height` RGBA8 frame needs.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// Capture counter could not be read or written.
    Counter(String),
    /// GPU readback of the offscreen target failed.
    Render(String),
    /// The background writer thread has exited.
    WorkerGone,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Encode(e) => write!(f, "encode error: {e}"),
            Self::InvalidFrame { expected, actual } => write!(
                f,
                "frame has {actual} bytes of pixel data, expected {expected}"
            ),
            Self::Counter(msg) => write!(f, "capture counter: {msg}"),
            Self::Render(msg) => write!(f, "readback failed: {msg}"),
            Self::WorkerGone => write!(f, "capture writer thread has exited"),
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(e: image::ImageError) -> Self {
        Self::Encode(e)
    }
}

/// Result of one capture attempt, as reported to a [`CaptureListener`].
#[derive(Debug)]
pub struct CaptureOutcome {
    /// Renderer frame the capture was taken on.
    pub frame_index: u64,
    /// Written path, or why the capture was dropped.
    pub result: Result<PathBuf, CaptureError>,
}

impl CaptureOutcome {
    fn into_status(self) -> CaptureStatus {
        match self.result {
            Ok(path) => CaptureStatus::Saved(path),
            Err(e) => CaptureStatus::Failed(e),
        }
    }
}

/// Completion callback, always invoked on the render thread.
pub type CaptureListener = Arc<dyn Fn(&CaptureOutcome) + Send + Sync>;

/// What happened to the capture taken on a frame.
#[derive(Debug)]
pub enum CaptureStatus {
    /// Written inline to this path.
    Saved(PathBuf),
    /// Handed to the background writer.
    Queued,
    /// Dropped; the request is not retried.
    Failed(CaptureError),
}

enum SinkMode {
    Inline(Box<dyn FrameWriter>),
    Background(CaptureWorker),
}

/// Destination for captured frames.
pub struct CaptureSink {
    mode: SinkMode,
    listener: Option<CaptureListener>,
}

impl CaptureSink {
    /// Write captures on the calling (render) thread.
    #[must_use]
    pub fn inline(writer: impl FrameWriter + 'static) -> Self {
        Self {
            mode: SinkMode::Inline(Box::new(writer)),
            listener: None,
        }
    }

    /// Write captures on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::Error`] if the writer thread fails to spawn.
    pub fn background(
        writer: impl FrameWriter + 'static,
    ) -> Result<Self, std::io::Error> {
        Ok(Self {
            mode: SinkMode::Background(CaptureWorker::spawn(Box::new(writer))?),
            listener: None,
        })
    }

    /// Image-file sink configured from the `[capture]` options section.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::Error`] if `background_writer` is set and the
    /// writer thread fails to spawn.
    pub fn from_options(
        options: &CaptureOptions,
    ) -> Result<Self, std::io::Error> {
        let writer = ImageFrameWriter::from_options(options);
        if options.background_writer {
            Self::background(writer)
        } else {
            Ok(Self::inline(writer))
        }
    }

    /// Call `listener` for every finished capture.
    #[must_use]
    pub fn with_listener(mut self, listener: CaptureListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Replace or clear the completion listener.
    pub fn set_listener(&mut self, listener: Option<CaptureListener>) {
        self.listener = listener;
    }

    /// Whether writes happen off the render thread.
    #[must_use]
    pub const fn is_background(&self) -> bool {
        matches!(self.mode, SinkMode::Background(_))
    }

    /// Write `frame` inline or queue it for the worker.
    pub fn deliver(&mut self, frame: CapturedFrame) -> CaptureStatus {
        let frame_index = frame.frame_index();
        match &mut self.mode {
            SinkMode::Inline(writer) => {
                let outcome = CaptureOutcome {
                    frame_index,
                    result: writer.write(&frame),
                };
                if let Err(e) = &outcome.result {
                    log::error!("capture of frame {frame_index} failed: {e}");
                }
                self.notify(&outcome);
                outcome.into_status()
            }
            SinkMode::Background(worker) => match worker.submit(frame) {
                Ok(()) => CaptureStatus::Queued,
                Err(e) => {
                    log::error!("capture of frame {frame_index} dropped: {e}");
                    self.fail(frame_index, e)
                }
            },
        }
    }

    /// Report a capture that never reached a writer.
    pub fn fail(&self, frame_index: u64, error: CaptureError) -> CaptureStatus {
        let outcome = CaptureOutcome {
            frame_index,
            result: Err(error),
        };
        self.notify(&outcome);
        outcome.into_status()
    }

    /// Forward finished background writes to the listener.
    ///
    /// Returns how many outcomes were collected.
    pub fn poll_completed(&self) -> usize {
        let SinkMode::Background(worker) = &self.mode else {
            return 0;
        };
        let outcomes = worker.try_recv_outcomes();
        for outcome in &outcomes {
            self.notify(outcome);
        }
        outcomes.len()
    }

    /// Drain the background writer and report its last outcomes.
    pub fn shutdown(&mut self) {
        if let SinkMode::Background(worker) = &mut self.mode {
            worker.shutdown();
        }
        let _ = self.poll_completed();
    }

    fn notify(&self, outcome: &CaptureOutcome) {
        if let Some(listener) = &self.listener {
            listener(outcome);
        }
    }
}

impl fmt::Debug for CaptureSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSink")
            .field("background", &self.is_background())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    struct Fixed(Result<(), ()>);

    impl FrameWriter for Fixed {
        fn write(
            &mut self,
            frame: &CapturedFrame,
        ) -> Result<PathBuf, CaptureError> {
            match self.0 {
                Ok(()) => Ok(PathBuf::from(format!("{}.png", frame.frame_index()))),
                Err(()) => Err(CaptureError::Counter("disk full".into())),
            }
        }
    }

    fn frame(index: u64) -> CapturedFrame {
        CapturedFrame::new(1, 1, vec![1, 2, 3, 4], index).unwrap()
    }

    fn counting_listener() -> (CaptureListener, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let listener: CaptureListener = Arc::new(move |_| {
            let _ = seen.fetch_add(1, Ordering::SeqCst);
        });
        (listener, count)
    }

    #[test]
    fn inline_success_reports_path() {
        let (listener, count) = counting_listener();
        let mut sink = CaptureSink::inline(Fixed(Ok(()))).with_listener(listener);
        let status = sink.deliver(frame(7));
        assert!(matches!(status, CaptureStatus::Saved(ref p) if p == &PathBuf::from("7.png")));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn inline_failure_is_reported_not_raised() {
        let (listener, count) = counting_listener();
        let mut sink = CaptureSink::inline(Fixed(Err(()))).with_listener(listener);
        assert!(matches!(
            sink.deliver(frame(1)),
            CaptureStatus::Failed(CaptureError::Counter(_))
        ));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn background_outcomes_reach_listener_on_poll() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let listener: CaptureListener = Arc::new(move |outcome| {
            sink_seen.lock().unwrap().push(outcome.frame_index);
        });
        let mut sink = CaptureSink::background(Fixed(Ok(())))
            .unwrap()
            .with_listener(listener);
        assert!(sink.is_background());
        assert!(matches!(sink.deliver(frame(3)), CaptureStatus::Queued));
        sink.shutdown();
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }
}
