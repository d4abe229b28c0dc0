//! Buffer everything, emit once.

use super::link::Link;
use crate::core::{BoxedSubscriber, Publisher, Subscriber, SubscriptionRef};
use crate::types::{Completion, Demand};
use std::mem;
use std::sync::Arc;

/// Emits a single `Vec` of every upstream value once the upstream
/// finishes. On failure the buffer is discarded and the failure passes
/// through.
pub struct Collect<P> {
    upstream: P,
}

impl<P> Collect<P> {
    pub(crate) fn new(upstream: P) -> Self {
        Self { upstream }
    }
}

impl<P> Publisher for Collect<P>
where
    P: Publisher,
{
    type Output = Vec<P::Output>;
    type Failure = P::Failure;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<Vec<P::Output>, P::Failure>) {
        self.upstream.subscribe(CollectSubscriber {
            link: Link::buffering(subscriber),
            buffer: Vec::new(),
        });
    }
}

struct CollectSubscriber<T, E> {
    link: Arc<Link<Vec<T>, E>>,
    buffer: Vec<T>,
}

impl<T, E> Subscriber for CollectSubscriber<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        self.link.connect(subscription);
    }

    fn receive(&mut self, input: T) -> Demand {
        self.buffer.push(input);
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        let collected = mem::take(&mut self.buffer);
        if completion.is_finished() && !self.link.is_terminated() {
            self.link.emit(collected);
        }
        self.link.finish(completion);
    }
}
