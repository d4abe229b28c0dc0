//! Closure-driven subscriber with unlimited demand.

use crate::core::{Cancellable, Publisher, Subscriber, SubscriptionRef, SubscriptionSlot};
use crate::types::{Completion, Demand};
use std::sync::Arc;

/// Requests unlimited demand and hands everything to closures.
pub struct Sink<T, E> {
    on_value: Box<dyn FnMut(T) + Send>,
    on_completion: Box<dyn FnMut(Completion<E>) + Send>,
    slot: Arc<SubscriptionSlot>,
}

impl<T, E> Sink<T, E> {
    /// Build a sink and the handle that cancels it.
    pub fn new(
        on_value: impl FnMut(T) + Send + 'static,
        on_completion: impl FnMut(Completion<E>) + Send + 'static,
    ) -> (Self, Cancellable) {
        let slot = SubscriptionSlot::new();
        let sink = Self {
            on_value: Box::new(on_value),
            on_completion: Box::new(on_completion),
            slot: Arc::clone(&slot),
        };
        (sink, Cancellable::new(slot))
    }
}

impl<T, E> Subscriber for Sink<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        if self.slot.fill(Arc::clone(&subscription)) {
            subscription.request(Demand::Unlimited);
        }
    }

    fn receive(&mut self, input: T) -> Demand {
        (self.on_value)(input);
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.slot.clear();
        (self.on_completion)(completion);
    }
}

pub(crate) fn sink<P, V, C>(publisher: &P, on_value: V, on_completion: C) -> Cancellable
where
    P: Publisher,
    V: FnMut(P::Output) + Send + 'static,
    C: FnMut(Completion<P::Failure>) + Send + 'static,
{
    let (sink, cancellable) = Sink::new(on_value, on_completion);
    publisher.subscribe(sink);
    cancellable
}
