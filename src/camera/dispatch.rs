//! Cross-thread dispatch onto the camera-owning thread.
//!
//! Attaching a texture to a camera stream is not safe on the render
//! thread. The renderer hands the work to a [`Dispatcher`] and keeps an
//! [`AttachHandle`], a one-shot completion signal it can poll every frame
//! or wait on during surface initialization.

use std::fmt;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::CameraError;

/// Unit of work executed on the camera-owning thread.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Failure to hand a task to the camera thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The receiving thread has shut down.
    Closed,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "camera dispatch queue is closed"),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Runs tasks on the thread that owns the camera session.
pub trait Dispatcher: Send + Sync {
    /// Queue `task`. Returns without waiting for it to run.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Closed`] if the target thread is gone.
    fn dispatch(&self, task: Task) -> Result<(), DispatchError>;
}

/// Runs every task immediately on the calling thread.
///
/// For hosts whose camera session is safe to touch from the render thread,
/// and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: Task) -> Result<(), DispatchError> {
        task();
        Ok(())
    }
}

/// Dedicated thread draining a FIFO task queue.
///
/// Dropping the handle closes the queue, lets already-queued tasks finish,
/// and joins the thread.
pub struct CameraThread {
    sender: Option<mpsc::Sender<Task>>,
    thread: Option<JoinHandle<()>>,
}

impl CameraThread {
    /// Spawn the camera thread.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::Error`] if the thread fails to spawn.
    pub fn spawn() -> Result<Self, std::io::Error> {
        let (sender, receiver) = mpsc::channel::<Task>();
        let thread = std::thread::Builder::new()
            .name("camera-session".into())
            .spawn(move || {
                while let Ok(task) = receiver.recv() {
                    task();
                }
                log::debug!("camera thread exiting");
            })?;
        Ok(Self {
            sender: Some(sender),
            thread: Some(thread),
        })
    }

    /// Close the queue and wait for the thread to finish.
    pub fn shutdown(&mut self) {
        drop(self.sender.take());
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("camera thread panicked");
            }
        }
    }
}

impl Dispatcher for CameraThread {
    fn dispatch(&self, task: Task) -> Result<(), DispatchError> {
        self.sender
            .as_ref()
            .ok_or(DispatchError::Closed)?
            .send(task)
            .map_err(|_| DispatchError::Closed)
    }
}

impl Drop for CameraThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Progress of a texture attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachState {
    /// The task has not reported back yet.
    Pending,
    /// The camera accepted the texture.
    Attached,
    /// The camera rejected the texture.
    Failed(CameraError),
    /// The task was dropped without reporting (camera thread shut down).
    Abandoned,
}

impl AttachState {
    /// Whether the attachment reached a final state.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One-shot completion signal for a dispatched attachment.
#[derive(Debug)]
pub struct AttachHandle {
    receiver: mpsc::Receiver<Result<(), CameraError>>,
    state: AttachState,
}

impl AttachHandle {
    /// Create a handle and the sender the dispatched task reports through.
    #[must_use]
    pub fn channel() -> (mpsc::SyncSender<Result<(), CameraError>>, Self) {
        let (sender, receiver) = mpsc::sync_channel(1);
        (
            sender,
            Self {
                receiver,
                state: AttachState::Pending,
            },
        )
    }

    /// Last observed state, without checking for news.
    #[must_use]
    pub const fn state(&self) -> &AttachState {
        &self.state
    }

    /// Check for completion without blocking.
    pub fn poll(&mut self) -> &AttachState {
        if !self.state.is_settled() {
            self.state = match self.receiver.try_recv() {
                Ok(result) => settle(result),
                Err(mpsc::TryRecvError::Empty) => AttachState::Pending,
                Err(mpsc::TryRecvError::Disconnected) => AttachState::Abandoned,
            };
        }
        &self.state
    }

    /// Block up to `timeout` for completion.
    pub fn wait(&mut self, timeout: Duration) -> &AttachState {
        if !self.state.is_settled() {
            self.state = match self.receiver.recv_timeout(timeout) {
                Ok(result) => settle(result),
                Err(mpsc::RecvTimeoutError::Timeout) => AttachState::Pending,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    AttachState::Abandoned
                }
            };
        }
        &self.state
    }
}

fn settle(result: Result<(), CameraError>) -> AttachState {
    match result {
        Ok(()) => AttachState::Attached,
        Err(e) => AttachState::Failed(e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn camera_thread_runs_tasks_off_the_caller_thread() {
        let dispatcher = CameraThread::spawn().unwrap();
        let caller = std::thread::current().id();
        let (tx, rx) = mpsc::channel();
        dispatcher
            .dispatch(Box::new(move || {
                let _ = tx.send(std::thread::current().id());
            }))
            .unwrap();
        let worker = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_ne!(worker, caller);
    }

    #[test]
    fn shutdown_drains_queued_tasks_then_rejects_new_ones() {
        let mut dispatcher = CameraThread::spawn().unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let ran = Arc::clone(&ran);
            dispatcher
                .dispatch(Box::new(move || {
                    let _ = ran.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        }
        dispatcher.shutdown();
        assert_eq!(ran.load(Ordering::SeqCst), 3);
        assert_eq!(
            dispatcher.dispatch(Box::new(|| {})),
            Err(DispatchError::Closed)
        );
    }

    #[test]
    fn attach_handle_reports_each_outcome() {
        let (tx, mut handle) = AttachHandle::channel();
        assert_eq!(handle.poll(), &AttachState::Pending);
        tx.send(Ok(())).unwrap();
        assert_eq!(handle.poll(), &AttachState::Attached);

        let (tx, mut handle) = AttachHandle::channel();
        tx.send(Err(CameraError::Disconnected)).unwrap();
        assert_eq!(
            handle.wait(Duration::from_millis(10)),
            &AttachState::Failed(CameraError::Disconnected)
        );

        let (tx, mut handle) = AttachHandle::channel();
        drop(tx);
        assert_eq!(handle.poll(), &AttachState::Abandoned);
    }

    #[test]
    fn wait_times_out_as_pending() {
        let (_tx, mut handle) = AttachHandle::channel();
        assert_eq!(
            handle.wait(Duration::from_millis(5)),
            &AttachState::Pending
        );
    }
}
