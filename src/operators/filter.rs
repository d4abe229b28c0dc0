//! Predicate-driven suppression.
//!
//! Every suppressed value gives its unit of demand back to the upstream, so
//! the upstream keeps producing at the rate the downstream asked for.

use super::link::Link;
use crate::core::{BoxedSubscriber, Publisher, Subscriber, SubscriptionRef};
use crate::types::{Completion, Demand};
use std::sync::Arc;

/// Passes only values matching a predicate.
pub struct Filter<P, F> {
    upstream: P,
    predicate: Arc<F>,
}

impl<P, F> Filter<P, F> {
    pub(crate) fn new(upstream: P, predicate: F) -> Self {
        Self {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

impl<P, F> Publisher for Filter<P, F>
where
    P: Publisher,
    F: Fn(&P::Output) -> bool + Send + Sync + 'static,
{
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<P::Output, P::Failure>) {
        self.upstream.subscribe(FilterSubscriber {
            link: Link::forwarding(subscriber),
            predicate: Arc::clone(&self.predicate),
            dropping: None,
        });
    }
}

/// Suppresses values while a predicate holds, then passes everything.
pub struct DropWhile<P, F> {
    upstream: P,
    predicate: Arc<F>,
}

impl<P, F> DropWhile<P, F> {
    pub(crate) fn new(upstream: P, predicate: F) -> Self {
        Self {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

impl<P, F> Publisher for DropWhile<P, F>
where
    P: Publisher,
    F: Fn(&P::Output) -> bool + Send + Sync + 'static,
{
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<P::Output, P::Failure>) {
        self.upstream.subscribe(FilterSubscriber {
            link: Link::forwarding(subscriber),
            predicate: Arc::clone(&self.predicate),
            dropping: Some(true),
        });
    }
}

/// Shared by `Filter` (`dropping: None`) and `DropWhile`, where `dropping`
/// flips to false on the first value failing the predicate and stays there.
struct FilterSubscriber<T, E, F> {
    link: Arc<Link<T, E>>,
    predicate: Arc<F>,
    dropping: Option<bool>,
}

impl<T, E, F> FilterSubscriber<T, E, F>
where
    F: Fn(&T) -> bool,
{
    fn passes(&mut self, input: &T) -> bool {
        match self.dropping {
            None => (self.predicate)(input),
            Some(false) => true,
            Some(true) => {
                if (self.predicate)(input) {
                    false
                } else {
                    self.dropping = Some(false);
                    true
                }
            }
        }
    }
}

impl<T, E, F> Subscriber for FilterSubscriber<T, E, F>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        self.link.connect(subscription);
    }

    fn receive(&mut self, input: T) -> Demand {
        if self.passes(&input) {
            self.link.emit(input);
            Demand::NONE
        } else {
            Demand::max(1)
        }
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.link.finish(completion);
    }
}
