//! Side-effect taps on every protocol event.

use super::link::Link;
use crate::core::{BoxedSubscriber, Publisher, Subscriber, Subscription, SubscriptionRef};
use crate::types::{Completion, Demand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Hook = Option<Box<dyn Fn() + Send + Sync>>;

/// Callbacks invoked by [`HandleEvents`]. Unset hooks are skipped.
pub struct EventHooks<T, E> {
    subscription: Hook,
    output: Option<Box<dyn Fn(&T) + Send + Sync>>,
    completion: Option<Box<dyn Fn(&Completion<E>) + Send + Sync>>,
    cancel: Hook,
    request: Option<Box<dyn Fn(Demand) + Send + Sync>>,
}

impl<T, E> EventHooks<T, E> {
    pub fn new() -> Self {
        Self {
            subscription: None,
            output: None,
            completion: None,
            cancel: None,
            request: None,
        }
    }

    /// Runs when the upstream hands over its subscription.
    pub fn on_subscription(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.subscription = Some(Box::new(hook));
        self
    }

    pub fn on_completion(
        mut self,
        hook: impl Fn(&Completion<E>) + Send + Sync + 'static,
    ) -> Self {
        self.completion = Some(Box::new(hook));
        self
    }

    /// Runs at most once, and only if the subscription is cancelled before
    /// it terminated.
    pub fn on_cancel(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.cancel = Some(Box::new(hook));
        self
    }

    pub fn on_request(mut self, hook: impl Fn(Demand) + Send + Sync + 'static) -> Self {
        self.request = Some(Box::new(hook));
        self
    }

    pub fn on_output(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.output = Some(Box::new(hook));
        self
    }
}

impl<T, E> Default for EventHooks<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Passes everything through unchanged while running [`EventHooks`].
pub struct HandleEvents<P: Publisher> {
    upstream: P,
    hooks: Arc<EventHooks<P::Output, P::Failure>>,
}

impl<P: Publisher> HandleEvents<P> {
    pub(crate) fn new(upstream: P, hooks: EventHooks<P::Output, P::Failure>) -> Self {
        Self {
            upstream,
            hooks: Arc::new(hooks),
        }
    }
}

impl<P> Publisher for HandleEvents<P>
where
    P: Publisher,
{
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<P::Output, P::Failure>) {
        let tap = Arc::new(Tap {
            link: Link::forwarding(subscriber),
            hooks: Arc::clone(&self.hooks),
            done: AtomicBool::new(false),
        });
        self.upstream.subscribe(TapSubscriber { tap });
    }
}

struct Tap<T, E> {
    link: Arc<Link<T, E>>,
    hooks: Arc<EventHooks<T, E>>,
    /// Set by completion or cancellation, whichever comes first.
    done: AtomicBool,
}

impl<T, E> Subscription for Tap<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn request(&self, demand: Demand) {
        if let Some(hook) = &self.hooks.request {
            hook(demand);
        }
        self.link.request(demand);
    }

    fn cancel(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            if let Some(hook) = &self.hooks.cancel {
                hook();
            }
        }
        self.link.cancel();
    }
}

struct TapSubscriber<T, E> {
    tap: Arc<Tap<T, E>>,
}

impl<T, E> Subscriber for TapSubscriber<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        if let Some(hook) = &self.tap.hooks.subscription {
            hook();
        }
        let handle: SubscriptionRef = self.tap.clone();
        self.tap.link.connect_as(subscription, handle);
    }

    fn receive(&mut self, input: T) -> Demand {
        if let Some(hook) = &self.tap.hooks.output {
            hook(&input);
        }
        self.tap.link.emit(input);
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.tap.done.store(true, Ordering::Release);
        if let Some(hook) = &self.tap.hooks.completion {
            hook(&completion);
        }
        self.tap.link.finish(completion);
    }
}
