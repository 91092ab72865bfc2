//! Asynchronous change notification.
//!
//! Each buffer owns a `Notifier`. Registering an observer spawns a
//! dispatcher thread fed by a one-slot channel: while a notification is
//! pending, further changes coalesce into it, so a slow observer never
//! backs up the data path. Notifications are sent after the buffer lock is
//! released, so observers may call back into the buffer.
//!
//! An observer that needs the buffer should hold a `Weak` reference;
//! holding an `Arc` keeps the buffer and its dispatcher alive until the
//! observer is unregistered.

use crossbeam_channel::{Sender, TrySendError};
use parking_lot::Mutex;
use spikestream_core::Result;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// What kind of mutation triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Samples were written.
    Write,
    /// Samples were consumed or flushed.
    Consume,
    /// A mark was added or removed.
    Mark,
    /// The buffer was cleared.
    Clear,
    /// The buffer was reallocated with a new capacity.
    Resize,
}

/// Receives change notifications on the dispatcher thread.
pub trait ChangeObserver: Send + Sync {
    fn on_change(&self, kind: ChangeKind);
}

impl<F> ChangeObserver for F
where
    F: Fn(ChangeKind) + Send + Sync,
{
    fn on_change(&self, kind: ChangeKind) {
        self(kind)
    }
}

struct Dispatcher {
    sender: Sender<ChangeKind>,
    handle: JoinHandle<()>,
}

impl Dispatcher {
    fn spawn(observer: Arc<dyn ChangeObserver>) -> Result<Self> {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let handle = thread::Builder::new()
            .name("spikestream-notify".into())
            .spawn(move || {
                for kind in receiver.iter() {
                    observer.on_change(kind);
                }
            })?;
        Ok(Self { sender, handle })
    }

    fn shutdown(self) {
        drop(self.sender);
        // Tearing down from inside a callback must not join ourselves
        if self.handle.thread().id() == thread::current().id() {
            return;
        }
        if self.handle.join().is_err() {
            warn!("Change observer panicked");
        }
    }
}

/// Per-buffer notification dispatcher.
#[derive(Default)]
pub struct Notifier {
    dispatcher: Mutex<Option<Dispatcher>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer, or tear the dispatcher down with `None`.
    ///
    /// Replacing an observer stops the previous dispatcher first; a pending
    /// notification for the old observer is still delivered.
    pub fn set_observer(&self, observer: Option<Arc<dyn ChangeObserver>>) -> Result<()> {
        let previous = self.dispatcher.lock().take();
        if let Some(previous) = previous {
            previous.shutdown();
            debug!("Change dispatcher stopped");
        }

        if let Some(observer) = observer {
            let dispatcher = Dispatcher::spawn(observer)?;
            *self.dispatcher.lock() = Some(dispatcher);
            debug!("Change dispatcher started");
        }
        Ok(())
    }

    /// Whether an observer is registered.
    pub fn is_active(&self) -> bool {
        self.dispatcher.lock().is_some()
    }

    /// Schedule a notification. Never blocks.
    pub fn notify(&self, kind: ChangeKind) {
        let dispatcher = self.dispatcher.lock();
        let Some(dispatcher) = dispatcher.as_ref() else {
            return;
        };
        match dispatcher.sender.try_send(kind) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => debug!("Change dispatcher has exited"),
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.get_mut().take() {
            dispatcher.shutdown();
        }
    }
}
