//! Many upstreams into one downstream: `merge` and `flat_map`.
//!
//! Both subscribe to every inner publisher with unlimited demand and park
//! values in the downstream until it asks for them. The stream finishes
//! once the outer source is done and every inner has finished; the first
//! failure cancels everything still running.

use crate::core::{
    AnyPublisher, BoxedSubscriber, Downstream, Overflow, Publisher, Subscriber, Subscription,
    SubscriptionRef,
};
use crate::types::{Completion, Demand};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Configuration for [`FlatMap`].
#[derive(Clone, Copy, Debug)]
pub struct FlatMapConfig {
    /// Maximum number of inner publishers running at once. The upstream is
    /// asked for this many values up front and for one more each time an
    /// inner finishes.
    /// Default: unlimited
    pub max_publishers: Demand,
}

impl Default for FlatMapConfig {
    fn default() -> Self {
        Self {
            max_publishers: Demand::Unlimited,
        }
    }
}

struct FanInState {
    outer: Option<SubscriptionRef>,
    outer_done: bool,
    /// Active inners; `None` until the inner's subscription arrives.
    inners: BTreeMap<u64, Option<SubscriptionRef>>,
    next_inner: u64,
    terminated: bool,
}

struct FanIn<T, E> {
    downstream: Arc<Downstream<T, E>>,
    state: Mutex<FanInState>,
    max_publishers: Demand,
}

impl<T, E> FanIn<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn start(subscriber: BoxedSubscriber<T, E>, max_publishers: Demand) -> Arc<Self> {
        let fan_in = Arc::new(Self {
            downstream: Downstream::new(subscriber, Overflow::Buffer),
            state: Mutex::new(FanInState {
                outer: None,
                outer_done: false,
                inners: BTreeMap::new(),
                next_inner: 0,
                terminated: false,
            }),
            max_publishers,
        });
        let handle: SubscriptionRef = fan_in.clone();
        fan_in.downstream.attach(handle);
        fan_in
    }

    fn set_outer(&self, subscription: SubscriptionRef) {
        {
            let mut state = self.state.lock();
            if !state.terminated {
                state.outer = Some(Arc::clone(&subscription));
                drop(state);
                subscription.request(self.max_publishers);
                return;
            }
        }
        subscription.cancel();
    }

    fn spawn<Q>(self: &Arc<Self>, publisher: &Q)
    where
        Q: Publisher<Output = T, Failure = E>,
    {
        let id = {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            let id = state.next_inner;
            state.next_inner += 1;
            state.inners.insert(id, None);
            id
        };
        publisher.subscribe(InnerSubscriber {
            fan_in: Arc::clone(self),
            id,
        });
    }

    fn inner_subscribed(&self, id: u64, subscription: SubscriptionRef) {
        {
            let mut state = self.state.lock();
            if let Some(slot) = state.inners.get_mut(&id) {
                *slot = Some(Arc::clone(&subscription));
                drop(state);
                subscription.request(Demand::Unlimited);
                return;
            }
        }
        subscription.cancel();
    }

    fn inner_finished(&self, id: u64) {
        let (complete, refill) = {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            state.inners.remove(&id);
            if state.outer_done && state.inners.is_empty() {
                state.terminated = true;
                (true, None)
            } else if self.max_publishers.is_unlimited() {
                (false, None)
            } else {
                (false, state.outer.clone())
            }
        };
        if complete {
            self.downstream.complete(Completion::Finished);
        } else if let Some(outer) = refill {
            outer.request(Demand::max(1));
        }
    }

    fn outer_finished(&self) {
        let complete = {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            state.outer_done = true;
            state.outer = None;
            state.terminated = state.inners.is_empty();
            state.terminated
        };
        if complete {
            self.downstream.complete(Completion::Finished);
        }
    }

    /// Take every live upstream out of the state, marking it terminated.
    fn shut_down(&self) -> Option<Vec<SubscriptionRef>> {
        let mut state = self.state.lock();
        if state.terminated {
            return None;
        }
        state.terminated = true;
        let mut live: Vec<SubscriptionRef> = state.outer.take().into_iter().collect();
        live.extend(std::mem::take(&mut state.inners).into_values().flatten());
        Some(live)
    }

    fn fail(&self, error: E) {
        if let Some(live) = self.shut_down() {
            debug!(cancelled = live.len(), "fan-in failed, cancelling upstreams");
            for subscription in live {
                subscription.cancel();
            }
            self.downstream.complete(Completion::Failed(error));
        }
    }
}

impl<T, E> Subscription for FanIn<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn request(&self, demand: Demand) {
        self.downstream.request(demand);
    }

    fn cancel(&self) {
        self.downstream.cancel();
        if let Some(live) = self.shut_down() {
            debug!(cancelled = live.len(), "fan-in cancelled");
            for subscription in live {
                subscription.cancel();
            }
        }
    }
}

struct InnerSubscriber<T, E> {
    fan_in: Arc<FanIn<T, E>>,
    id: u64,
}

impl<T, E> Subscriber for InnerSubscriber<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        self.fan_in.inner_subscribed(self.id, subscription);
    }

    fn receive(&mut self, input: T) -> Demand {
        self.fan_in.downstream.emit(input);
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        match completion {
            Completion::Finished => self.fan_in.inner_finished(self.id),
            Completion::Failed(error) => self.fan_in.fail(error),
        }
    }
}

/// Interleaves values from several upstreams in arrival order.
pub struct Merge<T, E> {
    upstreams: Vec<AnyPublisher<T, E>>,
}

impl<T, E> Merge<T, E> {
    pub fn new(upstreams: Vec<AnyPublisher<T, E>>) -> Self {
        Self { upstreams }
    }
}

impl<T, E> Publisher for Merge<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<T, E>) {
        let fan_in = FanIn::start(subscriber, Demand::Unlimited);
        for upstream in &self.upstreams {
            fan_in.spawn(upstream);
        }
        fan_in.outer_finished();
    }
}

/// Subscribes to a publisher derived from every upstream value and
/// forwards all of their values.
pub struct FlatMap<P, F> {
    upstream: P,
    transform: Arc<F>,
    config: FlatMapConfig,
}

impl<P, F> FlatMap<P, F> {
    pub(crate) fn new(upstream: P, config: FlatMapConfig, transform: F) -> Self {
        Self {
            upstream,
            transform: Arc::new(transform),
            config,
        }
    }
}

impl<P, F, Q> Publisher for FlatMap<P, F>
where
    P: Publisher,
    F: Fn(P::Output) -> Q + Send + Sync + 'static,
    Q: Publisher<Failure = P::Failure>,
{
    type Output = Q::Output;
    type Failure = P::Failure;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<Q::Output, P::Failure>) {
        let fan_in = FanIn::start(subscriber, self.config.max_publishers);
        self.upstream.subscribe(OuterSubscriber {
            fan_in,
            transform: Arc::clone(&self.transform),
            _input: PhantomData,
        });
    }
}

struct OuterSubscriber<T, U, E, F> {
    fan_in: Arc<FanIn<U, E>>,
    transform: Arc<F>,
    _input: PhantomData<fn(T)>,
}

impl<T, U, E, F, Q> Subscriber for OuterSubscriber<T, U, E, F>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> Q + Send + Sync + 'static,
    Q: Publisher<Output = U, Failure = E>,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        self.fan_in.set_outer(subscription);
    }

    fn receive(&mut self, input: T) -> Demand {
        let inner = (self.transform)(input);
        self.fan_in.spawn(&inner);
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        match completion {
            Completion::Finished => self.fan_in.outer_finished(),
            Completion::Failed(error) => self.fan_in.fail(error),
        }
    }
}
