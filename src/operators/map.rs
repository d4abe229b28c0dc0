//! Value and failure transforms.

use super::link::Link;
use crate::core::{BoxedSubscriber, Publisher, Subscriber, SubscriptionRef};
use crate::types::{Completion, Demand};
use std::marker::PhantomData;
use std::sync::Arc;

/// Applies a function to every value.
pub struct Map<P, F> {
    upstream: P,
    transform: Arc<F>,
}

impl<P, F> Map<P, F> {
    pub(crate) fn new(upstream: P, transform: F) -> Self {
        Self {
            upstream,
            transform: Arc::new(transform),
        }
    }
}

impl<P, F, U> Publisher for Map<P, F>
where
    P: Publisher,
    F: Fn(P::Output) -> U + Send + Sync + 'static,
    U: Send + 'static,
{
    type Output = U;
    type Failure = P::Failure;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<U, P::Failure>) {
        self.upstream.subscribe(MapSubscriber {
            link: Link::forwarding(subscriber),
            transform: Arc::clone(&self.transform),
            _input: PhantomData,
        });
    }
}

struct MapSubscriber<T, U, E, F> {
    link: Arc<Link<U, E>>,
    transform: Arc<F>,
    _input: PhantomData<fn(T)>,
}

impl<T, U, E, F> Subscriber for MapSubscriber<T, U, E, F>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        self.link.connect(subscription);
    }

    fn receive(&mut self, input: T) -> Demand {
        self.link.emit((self.transform)(input));
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.link.finish(completion);
    }
}

/// Applies a function to the failure, leaving values untouched.
pub struct MapError<P, F> {
    upstream: P,
    transform: Arc<F>,
}

impl<P, F> MapError<P, F> {
    pub(crate) fn new(upstream: P, transform: F) -> Self {
        Self {
            upstream,
            transform: Arc::new(transform),
        }
    }
}

impl<P, F, E> Publisher for MapError<P, F>
where
    P: Publisher,
    F: Fn(P::Failure) -> E + Send + Sync + 'static,
    E: Send + 'static,
{
    type Output = P::Output;
    type Failure = E;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<P::Output, E>) {
        self.upstream.subscribe(MapErrorSubscriber {
            link: Link::forwarding(subscriber),
            transform: Arc::clone(&self.transform),
            _failure: PhantomData,
        });
    }
}

struct MapErrorSubscriber<T, E, G, F> {
    link: Arc<Link<T, G>>,
    transform: Arc<F>,
    _failure: PhantomData<fn(E)>,
}

impl<T, E, G, F> Subscriber for MapErrorSubscriber<T, E, G, F>
where
    T: Send + 'static,
    E: Send + 'static,
    G: Send + 'static,
    F: Fn(E) -> G + Send + Sync + 'static,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        self.link.connect(subscription);
    }

    fn receive(&mut self, input: T) -> Demand {
        self.link.emit(input);
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        let transform = &self.transform;
        self.link.finish(completion.map_failure(|e| transform(e)));
    }
}
