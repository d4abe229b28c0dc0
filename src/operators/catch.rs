//! Failure recovery by switching to a replacement publisher.

use crate::core::{BoxedSubscriber, Downstream, Overflow, Publisher, Subscriber, Subscription, SubscriptionRef};
use crate::types::{Completion, Demand};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// On upstream failure, subscribes to `recover(failure)` and continues
/// with its values and completion. A successful upstream passes through
/// and `recover` is never called.
pub struct Catch<P, F> {
    upstream: P,
    recover: Arc<F>,
}

impl<P, F> Catch<P, F> {
    pub(crate) fn new(upstream: P, recover: F) -> Self {
        Self {
            upstream,
            recover: Arc::new(recover),
        }
    }
}

impl<P, F, Q> Publisher for Catch<P, F>
where
    P: Publisher,
    F: Fn(P::Failure) -> Q + Send + Sync + 'static,
    Q: Publisher<Output = P::Output>,
{
    type Output = P::Output;
    type Failure = Q::Failure;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<P::Output, Q::Failure>) {
        let handoff = Arc::new(Handoff {
            downstream: Downstream::new(subscriber, Overflow::Strict),
            current: Mutex::new(None),
        });
        self.upstream.subscribe(PrimarySubscriber {
            handoff,
            recover: Arc::clone(&self.recover),
            _failure: PhantomData,
        });
    }
}

/// The downstream's view: whichever upstream is current receives its
/// demand. Outstanding demand carries over to the replacement.
struct Handoff<T, E> {
    downstream: Arc<Downstream<T, E>>,
    current: Mutex<Option<SubscriptionRef>>,
}

impl<T, E> Handoff<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Install a new current upstream and return the demand it inherits.
    fn install(&self, subscription: &SubscriptionRef) -> Option<Demand> {
        let mut current = self.current.lock();
        if self.downstream.is_cancelled() {
            return None;
        }
        *current = Some(Arc::clone(subscription));
        Some(self.downstream.demand())
    }

    fn clear(&self) {
        self.current.lock().take();
    }
}

impl<T, E> Subscription for Handoff<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn request(&self, demand: Demand) {
        // Demand and the current upstream are read together so a switch
        // never sees the same demand twice.
        let current = {
            let current = self.current.lock();
            self.downstream.add_demand(demand);
            current.clone()
        };
        if let Some(current) = current {
            current.request(demand);
        }
        self.downstream.drain();
    }

    fn cancel(&self) {
        self.downstream.cancel();
        let current = self.current.lock().take();
        if let Some(current) = current {
            current.cancel();
        }
    }
}

struct PrimarySubscriber<T, E, G, F> {
    handoff: Arc<Handoff<T, G>>,
    recover: Arc<F>,
    _failure: PhantomData<fn(E)>,
}

impl<T, E, G, F, Q> Subscriber for PrimarySubscriber<T, E, G, F>
where
    T: Send + 'static,
    E: Send + 'static,
    G: Send + 'static,
    F: Fn(E) -> Q + Send + Sync + 'static,
    Q: Publisher<Output = T, Failure = G>,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        *self.handoff.current.lock() = Some(subscription);
        let handle: SubscriptionRef = self.handoff.clone();
        self.handoff.downstream.attach(handle);
    }

    fn receive(&mut self, input: T) -> Demand {
        self.handoff.downstream.emit(input);
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.handoff.clear();
        match completion {
            Completion::Finished => self.handoff.downstream.complete(Completion::Finished),
            Completion::Failed(error) => {
                if self.handoff.downstream.is_cancelled() {
                    return;
                }
                debug!("upstream failed, switching to replacement");
                let replacement = (self.recover)(error);
                replacement.subscribe(ReplacementSubscriber {
                    handoff: Arc::clone(&self.handoff),
                });
            }
        }
    }
}

struct ReplacementSubscriber<T, G> {
    handoff: Arc<Handoff<T, G>>,
}

impl<T, G> Subscriber for ReplacementSubscriber<T, G>
where
    T: Send + 'static,
    G: Send + 'static,
{
    type Input = T;
    type Failure = G;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        match self.handoff.install(&subscription) {
            Some(inherited) if !inherited.is_none() => subscription.request(inherited),
            Some(_) => {}
            None => subscription.cancel(),
        }
    }

    fn receive(&mut self, input: T) -> Demand {
        self.handoff.downstream.emit(input);
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion<G>) {
        self.handoff.clear();
        self.handoff.downstream.complete(completion);
    }
}
