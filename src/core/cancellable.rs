//! Cancellation handles.

use super::SubscriptionRef;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Holds the subscription a subscriber received, so it can be cancelled
/// from outside the subscriber. The subscription may arrive after the
/// handle was already cancelled, in which case it is cancelled on arrival.
pub(crate) struct SubscriptionSlot {
    cancelled: AtomicBool,
    subscription: Mutex<Option<SubscriptionRef>>,
}

impl SubscriptionSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            cancelled: AtomicBool::new(false),
            subscription: Mutex::new(None),
        })
    }

    /// Store the subscription. Returns false if it was cancelled instead.
    pub fn fill(&self, subscription: SubscriptionRef) -> bool {
        let mut slot = self.subscription.lock();
        if self.cancelled.load(Ordering::Acquire) {
            drop(slot);
            subscription.cancel();
            return false;
        }
        *slot = Some(subscription);
        true
    }

    pub fn get(&self) -> Option<SubscriptionRef> {
        self.subscription.lock().clone()
    }

    /// Forget the subscription after its stream terminated.
    pub fn clear(&self) {
        self.subscription.lock().take();
    }

    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Idempotent handle that tears down a subscription chain.
///
/// Dropping a `Cancellable` does not cancel; the stream keeps running until
/// it terminates. Put it in a [`CancelBag`] to tie the stream to an owner.
#[must_use = "dropping a Cancellable leaves the stream running"]
pub struct Cancellable {
    slot: Arc<SubscriptionSlot>,
}

impl Cancellable {
    pub(crate) fn new(slot: Arc<SubscriptionSlot>) -> Self {
        Self { slot }
    }

    /// Cancel the stream. Later calls do nothing.
    pub fn cancel(&self) {
        if !self.slot.is_cancelled() {
            debug!("cancelling subscription");
        }
        self.slot.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.slot.is_cancelled()
    }

    /// Move into `bag`, which cancels on drop.
    pub fn store_in(self, bag: &mut CancelBag) {
        bag.insert(self);
    }
}

impl fmt::Debug for Cancellable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancellable")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Owns cancellables and cancels all of them when dropped.
#[derive(Debug, Default)]
pub struct CancelBag {
    entries: Vec<Cancellable>,
}

impl CancelBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cancellable: Cancellable) {
        self.entries.push(cancellable);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cancel and forget everything stored so far.
    pub fn cancel_all(&mut self) {
        for entry in self.entries.drain(..) {
            entry.cancel();
        }
    }
}

impl Drop for CancelBag {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
