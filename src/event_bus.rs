//! Drop event source.
//!
//! Architecture:
//! - Handlers subscribe a callback taking (mime, text) and returning whether
//!   they consumed the drop
//! - dispatch() calls callbacks in subscription order and stops at the first
//!   one that consumes the drop
//! - Every dispatch is queued as a [`DropEvent`] for later poll()
//!
//! [`DropSource`] is the seam a host integration implements; [`DropBus`] is
//! the in-process implementation.

use std::sync::{Arc, Mutex, RwLock};

use log::{trace, warn};

/// Maximum events in queue before oldest are evicted
const MAX_QUEUE_SIZE: usize = 1000;

/// Drop callback: `(mime, text) -> consumed`.
pub type DropCallback = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Anything that can deliver drops to registered callbacks.
pub trait DropSource {
    fn add_drop_callback(&self, callback: DropCallback);
}

/// Record of one dispatched drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropEvent {
    pub mime: String,
    pub text: String,
    pub consumed: bool,
}

/// Drop dispatcher with a history queue.
#[derive(Clone)]
pub struct DropBus {
    callbacks: Arc<RwLock<Vec<DropCallback>>>,
    queue: Arc<Mutex<Vec<DropEvent>>>,
}

impl Default for DropBus {
    fn default() -> Self {
        Self::new()
    }
}

impl DropBus {
    pub fn new() -> Self {
        Self {
            callbacks: Arc::new(RwLock::new(Vec::new())),
            queue: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Deliver a drop. Returns true if any callback consumed it.
    pub fn dispatch(&self, mime: &str, text: &str) -> bool {
        // Clone the list so callbacks may subscribe more callbacks
        let callbacks: Vec<DropCallback> = self
            .callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let consumed = callbacks.iter().any(|cb| cb(mime, text));
        trace!("Drop ({}) consumed: {}", mime, consumed);

        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= MAX_QUEUE_SIZE {
            let evict_count = queue.len() / 2;
            warn!("DropBus queue full ({} events), evicting oldest {}", queue.len(), evict_count);
            queue.drain(0..evict_count);
        }
        queue.push(DropEvent {
            mime: mime.to_string(),
            text: text.to_string(),
            consumed,
        });

        consumed
    }

    /// Poll all drops dispatched since last poll.
    pub fn poll(&self) -> Vec<DropEvent> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl DropSource for DropBus {
    fn add_drop_callback(&self, callback: DropCallback) {
        self.callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(callback);
    }
}
