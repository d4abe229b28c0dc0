//! The publisher/subscriber protocol.
//!
//! A [`Publisher`] describes a stream. Subscribing hands a boxed
//! [`Subscriber`] to the publisher, which creates one [`Subscription`] for
//! that pair and passes it to the subscriber. From then on only the
//! subscriber requests demand; the producer delivers values (each returning
//! extra demand) and finally at most one [`Completion`].
//!
//! Delivery into a subscriber is serialized per subscription, so the
//! protocol methods may be called from any thread.

mod cancellable;
mod downstream;

pub use cancellable::{CancelBag, Cancellable};
pub(crate) use cancellable::SubscriptionSlot;
pub(crate) use downstream::{Downstream, Overflow};

use crate::types::{Completion, Demand};
use std::sync::Arc;

/// Live per-pair state enabling demand requests and cancellation.
pub trait Subscription: Send + Sync {
    /// Grant `demand` more values. Additive across calls.
    fn request(&self, demand: Demand);

    /// Tear down the subscription. Idempotent; nothing is delivered after
    /// this returns.
    fn cancel(&self);
}

/// Shared handle to a subscription.
pub type SubscriptionRef = Arc<dyn Subscription>;

/// Consumer side of the protocol.
pub trait Subscriber: Send + 'static {
    type Input: Send + 'static;
    type Failure: Send + 'static;

    /// Called exactly once, before anything else.
    fn receive_subscription(&mut self, subscription: SubscriptionRef);

    /// Called once per value; the returned demand is added to the
    /// outstanding demand.
    fn receive(&mut self, input: Self::Input) -> Demand;

    /// Terminal signal. Nothing follows it.
    fn receive_completion(&mut self, completion: Completion<Self::Failure>);
}

/// Subscriber with its concrete type erased.
pub type BoxedSubscriber<T, E> = Box<dyn Subscriber<Input = T, Failure = E>>;

impl<T, E> Subscriber for BoxedSubscriber<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        (**self).receive_subscription(subscription)
    }

    fn receive(&mut self, input: T) -> Demand {
        (**self).receive(input)
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        (**self).receive_completion(completion)
    }
}

/// Description of a potential stream. Every subscription is independent.
pub trait Publisher: Send + Sync + 'static {
    type Output: Send + 'static;
    type Failure: Send + 'static;

    /// Attach a subscriber, creating a new subscription for it.
    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<Self::Output, Self::Failure>);

    /// Attach a concrete subscriber.
    fn subscribe<S>(&self, subscriber: S)
    where
        Self: Sized,
        S: Subscriber<Input = Self::Output, Failure = Self::Failure>,
    {
        self.subscribe_boxed(Box::new(subscriber))
    }
}

impl<P> Publisher for Arc<P>
where
    P: Publisher + ?Sized,
{
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<Self::Output, Self::Failure>) {
        (**self).subscribe_boxed(subscriber)
    }
}

/// Type-erased publisher, for API boundaries that hide the operator graph.
pub struct AnyPublisher<T, E> {
    inner: Arc<dyn Publisher<Output = T, Failure = E>>,
}

impl<T, E> AnyPublisher<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new<P>(publisher: P) -> Self
    where
        P: Publisher<Output = T, Failure = E>,
    {
        Self {
            inner: Arc::new(publisher),
        }
    }
}

impl<T, E> Clone for AnyPublisher<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> Publisher for AnyPublisher<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<T, E>) {
        self.inner.subscribe_boxed(subscriber)
    }
}
