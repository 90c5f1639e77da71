//! Single-slot capture request shared between UI and render threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Pending-capture flag.
///
/// Any thread may set it; only the render thread clears it, once per
/// frame, before choosing the draw target. Repeated requests before the
/// render thread observes the flag collapse into one.
#[derive(Debug, Default)]
pub struct CaptureRequest {
    pending: AtomicBool,
}

impl CaptureRequest {
    /// A request slot with nothing pending.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Mark a capture as pending.
    ///
    /// Returns `true` if this call created the request, `false` if one was
    /// already pending.
    pub fn request(&self) -> bool {
        !self.pending.swap(true, Ordering::AcqRel)
    }

    /// Consume the pending request, leaving the slot clear.
    ///
    /// Returns whether a request was pending.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Whether a request is waiting for the next frame.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// Cloneable handle UI code uses to request a capture.
#[derive(Debug, Clone)]
pub struct CaptureTrigger {
    request: Arc<CaptureRequest>,
}

impl CaptureTrigger {
    pub(crate) const fn new(request: Arc<CaptureRequest>) -> Self {
        Self { request }
    }

    /// Ask for the next rendered frame to be written to disk.
    ///
    /// Returns `true` if this call created a new pending request.
    pub fn save_frame(&self) -> bool {
        self.request.request()
    }

    /// Whether a capture is still waiting to be rendered.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.request.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_requests_collapse() {
        let slot = CaptureRequest::new();
        assert!(slot.request());
        assert!(!slot.request());
        assert!(!slot.request());
        assert!(slot.take());
        assert!(!slot.take());
    }

    #[test]
    fn request_after_take_is_new() {
        let slot = CaptureRequest::new();
        assert!(slot.request());
        assert!(slot.take());
        assert!(!slot.is_pending());
        assert!(slot.request());
        assert!(slot.is_pending());
    }

    #[test]
    fn trigger_is_shared_across_threads() {
        let slot = Arc::new(CaptureRequest::new());
        let trigger = CaptureTrigger::new(Arc::clone(&slot));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let trigger = trigger.clone();
                std::thread::spawn(move || trigger.save_frame())
            })
            .collect();
        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&created| created)
            .count();
        assert_eq!(created, 1);
        assert!(slot.take());
    }
}
