//! Latest-value combination of several upstreams.

use super::PublisherExt;
use crate::core::{
    AnyPublisher, BoxedSubscriber, Downstream, Overflow, Publisher, Subscriber, Subscription,
    SubscriptionRef,
};
use crate::types::{Completion, Demand, Never};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Emits the latest value of every upstream, in upstream order, each time
/// any of them produces, once all of them have produced at least once.
///
/// Upstreams are drained with unlimited demand. While the downstream has no
/// demand only the newest combination is kept.
pub struct CombineLatestAll<T, E> {
    upstreams: Vec<AnyPublisher<T, E>>,
}

impl<T, E> CombineLatestAll<T, E> {
    pub fn new(upstreams: Vec<AnyPublisher<T, E>>) -> Self {
        Self { upstreams }
    }
}

impl<T, E> Publisher for CombineLatestAll<T, E>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    type Output = Vec<T>;
    type Failure = E;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<Vec<T>, E>) {
        let arity = self.upstreams.len();
        let combiner = Arc::new(Combiner {
            downstream: Downstream::new(subscriber, Overflow::Latest),
            state: Mutex::new(CombinerState {
                latest: vec![None; arity],
                subscriptions: vec![None; arity],
                finished: 0,
                terminated: false,
            }),
        });
        let handle: SubscriptionRef = combiner.clone();
        combiner.downstream.attach(handle);

        if arity == 0 {
            combiner.downstream.complete(Completion::Finished);
            return;
        }
        for (index, upstream) in self.upstreams.iter().enumerate() {
            upstream.subscribe(CombineSubscriber {
                combiner: Arc::clone(&combiner),
                index,
            });
        }
    }
}

struct CombinerState<T> {
    latest: Vec<Option<T>>,
    subscriptions: Vec<Option<SubscriptionRef>>,
    finished: usize,
    terminated: bool,
}

struct Combiner<T, E> {
    downstream: Arc<Downstream<Vec<T>, E>>,
    state: Mutex<CombinerState<T>>,
}

impl<T, E> Combiner<T, E>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    fn subscribed(&self, index: usize, subscription: SubscriptionRef) {
        {
            let mut state = self.state.lock();
            if !state.terminated {
                state.subscriptions[index] = Some(Arc::clone(&subscription));
                drop(state);
                subscription.request(Demand::Unlimited);
                return;
            }
        }
        subscription.cancel();
    }

    fn value(&self, index: usize, value: T) {
        {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            state.latest[index] = Some(value);
            let combined: Option<Vec<T>> = state.latest.iter().cloned().collect();
            // Enqueued under the lock so combinations keep their order.
            if let Some(combined) = combined {
                self.downstream.enqueue(combined);
            }
        }
        self.downstream.drain();
    }

    fn finished(&self, index: usize) {
        let complete = {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            state.subscriptions[index] = None;
            state.finished += 1;
            state.terminated = state.finished == state.latest.len();
            state.terminated
        };
        if complete {
            self.downstream.complete(Completion::Finished);
        }
    }

    fn shut_down(&self) -> Option<Vec<SubscriptionRef>> {
        let mut state = self.state.lock();
        if state.terminated {
            return None;
        }
        state.terminated = true;
        Some(state.subscriptions.iter_mut().filter_map(Option::take).collect())
    }

    fn fail(&self, error: E) {
        if let Some(live) = self.shut_down() {
            debug!(cancelled = live.len(), "combine_latest failed, cancelling upstreams");
            for subscription in live {
                subscription.cancel();
            }
            self.downstream.complete(Completion::Failed(error));
        }
    }
}

impl<T, E> Subscription for Combiner<T, E>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    fn request(&self, demand: Demand) {
        self.downstream.request(demand);
    }

    fn cancel(&self) {
        self.downstream.cancel();
        if let Some(live) = self.shut_down() {
            for subscription in live {
                subscription.cancel();
            }
        }
    }
}

struct CombineSubscriber<T, E> {
    combiner: Arc<Combiner<T, E>>,
    index: usize,
}

impl<T, E> Subscriber for CombineSubscriber<T, E>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        self.combiner.subscribed(self.index, subscription);
    }

    fn receive(&mut self, input: T) -> Demand {
        self.combiner.value(self.index, input);
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        match completion {
            Completion::Finished => self.combiner.finished(self.index),
            Completion::Failed(error) => self.combiner.fail(error),
        }
    }
}

/// Position tag used to funnel differently typed upstreams through
/// [`CombineLatestAll`].
#[derive(Clone)]
enum Slot<A, B, C> {
    First(A),
    Second(B),
    Third(C),
}

/// Typed pairs from two upstreams.
pub struct CombineLatest<A, B, E> {
    inner: AnyPublisher<(A, B), E>,
}

impl<A, B, E> CombineLatest<A, B, E>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    E: Send + 'static,
{
    pub fn new<PA, PB>(first: PA, second: PB) -> Self
    where
        PA: Publisher<Output = A, Failure = E>,
        PB: Publisher<Output = B, Failure = E>,
    {
        let all = CombineLatestAll::new(vec![
            first.map(Slot::<A, B, Never>::First).erase(),
            second.map(Slot::<A, B, Never>::Second).erase(),
        ]);
        let inner = all
            .map(|slots| match <[_; 2]>::try_from(slots) {
                Ok([Slot::First(a), Slot::Second(b)]) => (a, b),
                _ => unreachable!("combine_latest slots out of order"),
            })
            .erase();
        Self { inner }
    }
}

impl<A, B, E> Publisher for CombineLatest<A, B, E>
where
    A: Send + 'static,
    B: Send + 'static,
    E: Send + 'static,
{
    type Output = (A, B);
    type Failure = E;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<(A, B), E>) {
        self.inner.subscribe_boxed(subscriber)
    }
}

/// Typed triples from three upstreams.
pub struct CombineLatest3<A, B, C, E> {
    inner: AnyPublisher<(A, B, C), E>,
}

impl<A, B, C, E> CombineLatest3<A, B, C, E>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
    E: Send + 'static,
{
    pub fn new<PA, PB, PC>(first: PA, second: PB, third: PC) -> Self
    where
        PA: Publisher<Output = A, Failure = E>,
        PB: Publisher<Output = B, Failure = E>,
        PC: Publisher<Output = C, Failure = E>,
    {
        let all = CombineLatestAll::new(vec![
            first.map(Slot::<A, B, C>::First).erase(),
            second.map(Slot::<A, B, C>::Second).erase(),
            third.map(Slot::<A, B, C>::Third).erase(),
        ]);
        let inner = all
            .map(|slots| match <[_; 3]>::try_from(slots) {
                Ok([Slot::First(a), Slot::Second(b), Slot::Third(c)]) => (a, b, c),
                _ => unreachable!("combine_latest slots out of order"),
            })
            .erase();
        Self { inner }
    }
}

impl<A, B, C, E> Publisher for CombineLatest3<A, B, C, E>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    E: Send + 'static,
{
    type Output = (A, B, C);
    type Failure = E;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<(A, B, C), E>) {
        self.inner.subscribe_boxed(subscriber)
    }
}
