//! Blocking pull consumer backed by a bounded channel.
//!
//! The subscriber grants demand equal to the channel capacity and one more
//! unit each time the handle takes a value out, so the channel never holds
//! more than the consumer asked for.

use crate::core::{Cancellable, Publisher, Subscriber, SubscriptionRef, SubscriptionSlot};
use crate::types::{Completion, Demand};
use crossbeam_channel::{bounded, Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Configuration for [`ChannelHandle`].
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Values buffered ahead of the consumer.
    /// Default: 16
    pub capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { capacity: 16 }
    }
}

/// One item taken from a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent<T, E> {
    Value(T),
    Completion(Completion<E>),
}

/// Consumer end of [`PublisherExt::into_channel`](crate::PublisherExt::into_channel).
pub struct ChannelHandle<T, E> {
    receiver: Receiver<StreamEvent<T, E>>,
    slot: Arc<SubscriptionSlot>,
}

impl<T, E> ChannelHandle<T, E> {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<StreamEvent<T, E>, RecvError> {
        let event = self.receiver.recv()?;
        Ok(self.replenish(event))
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<StreamEvent<T, E>, TryRecvError> {
        let event = self.receiver.try_recv()?;
        Ok(self.replenish(event))
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<StreamEvent<T, E>, RecvTimeoutError> {
        let event = self.receiver.recv_timeout(timeout)?;
        Ok(self.replenish(event))
    }

    /// Handle that cancels the underlying subscription.
    pub fn cancellable(&self) -> Cancellable {
        Cancellable::new(Arc::clone(&self.slot))
    }

    fn replenish(&self, event: StreamEvent<T, E>) -> StreamEvent<T, E> {
        if let StreamEvent::Value(_) = event {
            if let Some(subscription) = self.slot.get() {
                subscription.request(Demand::max(1));
            }
        }
        event
    }
}

impl<T, E> Iterator for ChannelHandle<T, E> {
    type Item = StreamEvent<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv().ok()
    }
}

impl<T, E> Drop for ChannelHandle<T, E> {
    fn drop(&mut self) {
        self.slot.cancel();
    }
}

struct ChannelSubscriber<T, E> {
    sender: Sender<StreamEvent<T, E>>,
    slot: Arc<SubscriptionSlot>,
    capacity: usize,
}

impl<T, E> Subscriber for ChannelSubscriber<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        if self.slot.fill(Arc::clone(&subscription)) {
            subscription.request(Demand::max(self.capacity));
        }
    }

    fn receive(&mut self, input: T) -> Demand {
        if self.sender.try_send(StreamEvent::Value(input)).is_err() {
            debug!("channel consumer gone, cancelling");
            self.slot.cancel();
        }
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.slot.clear();
        let _ = self.sender.try_send(StreamEvent::Completion(completion));
    }
}

pub(crate) fn channel<P>(publisher: &P, config: ChannelConfig) -> ChannelHandle<P::Output, P::Failure>
where
    P: Publisher,
{
    let capacity = config.capacity.max(1);
    // One extra slot so the completion never waits behind a full buffer.
    let (sender, receiver) = bounded(capacity + 1);
    let slot = SubscriptionSlot::new();
    publisher.subscribe(ChannelSubscriber {
        sender,
        slot: Arc::clone(&slot),
        capacity,
    });
    ChannelHandle { receiver, slot }
}
