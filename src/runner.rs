//! Runs one hardware operation off the caller's thread.
//!
//! ```text
//! caller                      worker
//!   │                            │
//! spawn ───────────────────────►[op]
//!   │◄──── Progress(percent) ────│
//!   │◄──── Progress(percent) ────│
//!   │◄──── Finished(result) ─────│ (exactly once)
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use crate::api::OperationError;
use crate::operation::OperationEvent;

#[derive(Debug)]
pub enum Signal<T> {
    Progress(u8),
    Finished(Result<T, OperationError>),
}

pub struct OperationHandle<T> {
    rx: Receiver<Signal<T>>,
    thread: Option<JoinHandle<()>>,
}

impl<T> OperationHandle<T> {
    /// Next signal, or `None` once the worker is gone and the channel drained.
    pub fn recv(&self) -> Option<Signal<T>> {
        self.rx.recv().ok()
    }

    /// Block until the terminal signal, forwarding every progress update.
    pub fn wait(mut self, mut on_progress: impl FnMut(u8)) -> Result<T, OperationError> {
        let result = loop {
            match self.rx.recv() {
                Ok(Signal::Progress(p)) => on_progress(p),
                Ok(Signal::Finished(result)) => break result,
                Err(_) => break Err(OperationError::WorkerPanicked),
            }
        };
        self.join();
        result
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::error!("operation worker panicked after reporting");
            }
        }
    }
}

impl<T> Drop for OperationHandle<T> {
    fn drop(&mut self) {
        // The worker owns the device link; wait for it so the port is free.
        self.join();
    }
}

/// Start `op` on a named worker thread.
///
/// `op` gets an event sink; progress percentages are forwarded (repeats
/// dropped), other events stay on the worker. The handle always yields
/// exactly one `Signal::Finished`, including when `op` panics.
pub fn spawn<T, Op>(name: &str, op: Op) -> Result<OperationHandle<T>, OperationError>
where
    T: Send + 'static,
    Op: FnOnce(&mut dyn FnMut(OperationEvent)) -> Result<T, OperationError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let label = name.to_string();

    let thread = thread::Builder::new()
        .name(format!("gbshooper-{name}"))
        .spawn(move || {
            let mut last: Option<u8> = None;
            let mut on_event = |ev: OperationEvent| {
                if let OperationEvent::Progress { percent } = ev {
                    if last != Some(percent) {
                        last = Some(percent);
                        let _ = tx.send(Signal::Progress(percent));
                    }
                } else {
                    tracing::debug!(event = ?ev, "operation event");
                }
            };

            let result = panic::catch_unwind(AssertUnwindSafe(|| op(&mut on_event)))
                .unwrap_or_else(|_| {
                    tracing::error!(operation = %label, "operation panicked");
                    Err(OperationError::WorkerPanicked)
                });

            if tx.send(Signal::Finished(result)).is_err() {
                tracing::debug!(operation = %label, "result dropped, receiver gone");
            }
        })
        .map_err(OperationError::Worker)?;

    Ok(OperationHandle {
        rx,
        thread: Some(thread),
    })
}
