//! Completion contexts - where operation callbacks run
//!
//! Workers never invoke callbacks themselves. They hand each callback to the
//! caller's `CompletionContext`, which decides which thread runs it.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::warn;
use std::sync::Arc;
use std::time::Duration;

pub type Callback = Box<dyn FnOnce() + Send + 'static>;

pub trait CompletionContext: Send + Sync {
    fn dispatch(&self, callback: Callback);
}

/// Channel-backed context whose callbacks run on whichever thread drains the queue
pub struct CompletionQueue {
    sender: Sender<Callback>,
    receiver: Receiver<Callback>,
}

struct QueueContext {
    sender: Sender<Callback>,
}

impl CompletionContext for QueueContext {
    fn dispatch(&self, callback: Callback) {
        if self.sender.send(callback).is_err() {
            warn!("completion_queue: closed, dropping callback");
        }
    }
}

impl CompletionQueue {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// Context to hand to clients; callbacks queue here until drained
    pub fn context(&self) -> Arc<dyn CompletionContext> {
        Arc::new(QueueContext {
            sender: self.sender.clone(),
        })
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Run every queued callback on the current thread; returns how many ran
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(callback) = self.receiver.try_recv() {
            callback();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one callback and run it on the current thread
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(callback) => {
                callback();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

impl Default for CompletionQueue {
    fn default() -> Self {
        Self::new()
    }
}
