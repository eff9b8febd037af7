//! Delivery of observer notifications to a designated consumer context.
//!
//! The transfer worker never invokes observer methods directly; every
//! notification is wrapped as a unit of work and handed to a [`Dispatcher`].
//! Implementations must run units posted from the same task in submission
//! order, which is what makes progress notifications arrive in write order.

use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A deferred unit of work accepted by a [`Dispatcher`].
pub type DispatchWork = Box<dyn FnOnce() + Send>;

/// Executes posted units of work on a designated consumer context.
///
/// Injected into the transfer at construction so the core stays decoupled
/// from any concrete threading primitive; tests use [`InlineDispatcher`],
/// applications typically use [`ChannelDispatcher`] or their own adapter to
/// a UI event loop.
pub trait Dispatcher: Send + Sync {
    /// Accepts a unit of work for eventual execution.
    ///
    /// Units posted from the same task must be executed in submission order.
    fn post(&self, work: DispatchWork);
}

/// Runs posted work immediately on the calling thread.
///
/// For synchronous consumers and tests; submission order holds trivially.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn post(&self, work: DispatchWork) {
        work();
    }
}

/// Queues posted work onto a dedicated consumer task.
///
/// An unbounded channel feeds a task spawned at construction; the task
/// drains units in submission order. Dropping the last clone closes the
/// channel and the consumer finishes the remaining queue before exiting.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::UnboundedSender<DispatchWork>,
}

impl ChannelDispatcher {
    /// Spawns the consumer task and returns the dispatcher feeding it.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<DispatchWork>();
        tokio::spawn(async move {
            while let Some(work) = receiver.recv().await {
                work();
            }
            debug!("dispatch channel closed, consumer exiting");
        });
        Self { sender }
    }
}

impl Dispatcher for ChannelDispatcher {
    fn post(&self, work: DispatchWork) {
        if self.sender.send(work).is_err() {
            warn!("dispatch consumer is gone, dropping posted work");
        }
    }
}
