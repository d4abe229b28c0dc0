//! Serialized, demand-accounted delivery into one subscriber.
//!
//! Producers never call a subscriber directly. They enqueue values and
//! completions here, and whichever caller wins the `draining` role delivers
//! the queue one signal at a time. A subscriber that requests demand, sends
//! into a subject or cancels from inside its own `receive` therefore only
//! appends work for the active drain loop instead of recursing into itself.
//!
//! Rule for callers: never invoke `drain` (or `emit`/`complete`/`request`)
//! while holding a lock that the subscriber could reach again.

use super::{BoxedSubscriber, SubscriptionRef};
use crate::types::{Completion, Demand};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// What happens to a value offered while demand is exhausted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Overflow {
    /// The producer promised to respect demand; a violation panics.
    Strict,
    /// The value is lost for this subscriber.
    Drop,
    /// The value waits until demand arrives.
    Buffer,
    /// Only the newest waiting value is kept.
    Latest,
}

enum Signal<T, E> {
    Value(T),
    Completion(Completion<E>),
}

struct State<T, E> {
    /// Outstanding demand not yet reserved by an enqueued value.
    demand: Demand,
    /// Signals already covered by demand, in delivery order.
    ready: VecDeque<Signal<T, E>>,
    /// Values waiting for demand.
    backlog: VecDeque<T>,
    /// A finished completion parked behind the backlog.
    held_completion: Option<Completion<E>>,
    /// The backlog front is a primed value that newer values replace
    /// until it is delivered.
    primed: bool,
    draining: bool,
    completed: bool,
}

pub(crate) struct Downstream<T, E> {
    overflow: Overflow,
    state: Mutex<State<T, E>>,
    subscriber: Mutex<Option<BoxedSubscriber<T, E>>>,
    /// The subscription handed to the subscriber. Demand returned from
    /// `receive` is requested through it. Dropped on termination.
    subscription: Mutex<Option<SubscriptionRef>>,
    cancelled: AtomicBool,
}

impl<T, E> Downstream<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new(subscriber: BoxedSubscriber<T, E>, overflow: Overflow) -> Arc<Self> {
        Arc::new(Self {
            overflow,
            state: Mutex::new(State {
                demand: Demand::NONE,
                ready: VecDeque::new(),
                backlog: VecDeque::new(),
                held_completion: None,
                primed: false,
                draining: false,
                completed: false,
            }),
            subscriber: Mutex::new(Some(subscriber)),
            subscription: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        })
    }

    /// Hand the subscription to the subscriber, then deliver whatever the
    /// subscriber's initial requests produced. Must run before the
    /// downstream is shared with any producer.
    pub fn attach(&self, subscription: SubscriptionRef) {
        *self.subscription.lock() = Some(Arc::clone(&subscription));
        self.state.lock().draining = true;
        {
            let mut guard = self.subscriber.lock();
            if let Some(subscriber) = guard.as_mut() {
                if !self.is_cancelled() {
                    subscriber.receive_subscription(subscription);
                }
            }
        }
        self.run_drain();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// True once a completion was accepted or the subscription was cancelled.
    pub fn is_completed(&self) -> bool {
        self.state.lock().completed
    }

    pub fn demand(&self) -> Demand {
        self.state.lock().demand
    }

    pub fn has_demand(&self) -> bool {
        !self.state.lock().demand.is_none()
    }

    /// Account for new demand without delivering.
    pub fn add_demand(&self, demand: Demand) {
        let mut state = self.state.lock();
        if state.completed && state.held_completion.is_none() {
            return;
        }
        state.demand += demand;
        Self::promote(&mut state);
    }

    /// Account for new demand and deliver.
    pub fn request(&self, demand: Demand) {
        self.add_demand(demand);
        self.drain();
    }

    /// Place a value ahead of everything else, delivered as soon as any
    /// demand exists. Until then, each value a `Drop` downstream would lose
    /// takes its place, so the first delivery is always the newest.
    pub fn prime(&self, value: T) {
        let mut state = self.state.lock();
        state.backlog.push_front(value);
        state.primed = true;
        Self::promote(&mut state);
    }

    /// Queue a value without delivering. Returns false if the value was
    /// dropped.
    pub fn enqueue(&self, value: T) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let mut state = self.state.lock();
        if state.completed {
            return false;
        }
        if state.demand.consume_one() {
            state.ready.push_back(Signal::Value(value));
            return true;
        }
        match self.overflow {
            Overflow::Strict => {
                drop(state);
                panic!("value emitted without outstanding demand");
            }
            Overflow::Drop if state.primed => {
                if let Some(front) = state.backlog.front_mut() {
                    *front = value;
                }
                true
            }
            Overflow::Drop => {
                trace!("dropping value for subscriber without demand");
                false
            }
            Overflow::Buffer => {
                state.backlog.push_back(value);
                true
            }
            Overflow::Latest => {
                state.backlog.clear();
                state.backlog.push_back(value);
                true
            }
        }
    }

    /// Queue the terminal completion without delivering. Later calls are
    /// ignored.
    pub fn enqueue_completion(&self, completion: Completion<E>) {
        let mut state = self.state.lock();
        if state.completed {
            return;
        }
        state.completed = true;
        match completion {
            Completion::Failed(_) => {
                state.backlog.clear();
                state.ready.push_back(Signal::Completion(completion));
            }
            Completion::Finished if state.backlog.is_empty() => {
                state.ready.push_back(Signal::Completion(completion));
            }
            Completion::Finished => state.held_completion = Some(completion),
        }
    }

    pub fn emit(&self, value: T) -> bool {
        let accepted = self.enqueue(value);
        self.drain();
        accepted
    }

    pub fn complete(&self, completion: Completion<E>) {
        self.enqueue_completion(completion);
        self.drain();
    }

    /// Deliver queued signals unless another caller is already doing so.
    pub fn drain(&self) {
        {
            let mut state = self.state.lock();
            if state.draining {
                return;
            }
            state.draining = true;
        }
        self.run_drain();
    }

    /// Stop all delivery and release the subscriber. Idempotent.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        {
            let mut state = self.state.lock();
            state.ready.clear();
            state.backlog.clear();
            state.held_completion = None;
            state.primed = false;
            state.completed = true;
        }
        self.subscription.lock().take();
        // A busy subscriber is released by the drain loop that holds it.
        let released = self.subscriber.try_lock().and_then(|mut guard| guard.take());
        drop(released);
    }

    fn promote(state: &mut State<T, E>) {
        while !state.backlog.is_empty() && state.demand.consume_one() {
            if let Some(value) = state.backlog.pop_front() {
                state.primed = false;
                state.ready.push_back(Signal::Value(value));
            }
        }
        if state.backlog.is_empty() {
            if let Some(completion) = state.held_completion.take() {
                state.ready.push_back(Signal::Completion(completion));
            }
        }
    }

    /// Drain loop. The caller must own the `draining` role.
    fn run_drain(&self) {
        loop {
            let signal = {
                let mut state = self.state.lock();
                if self.is_cancelled() {
                    state.ready.clear();
                    state.draining = false;
                    drop(state);
                    self.release();
                    return;
                }
                match state.ready.pop_front() {
                    Some(signal) => signal,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };

            match signal {
                Signal::Value(value) => {
                    let more = {
                        let mut guard = self.subscriber.lock();
                        match guard.as_mut() {
                            Some(subscriber) if !self.is_cancelled() => subscriber.receive(value),
                            _ => Demand::NONE,
                        }
                    };
                    if !more.is_none() {
                        let subscription = self.subscription.lock().clone();
                        if let Some(subscription) = subscription {
                            subscription.request(more);
                        }
                    }
                }
                Signal::Completion(completion) => {
                    let subscriber = self.subscriber.lock().take();
                    self.subscription.lock().take();
                    if let Some(mut subscriber) = subscriber {
                        if !self.is_cancelled() {
                            subscriber.receive_completion(completion);
                        }
                    }
                }
            }
        }
    }

    fn release(&self) {
        self.subscription.lock().take();
        let subscriber = self.subscriber.lock().take();
        drop(subscriber);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Subscriber, Subscription};

    struct Log {
        values: Arc<Mutex<Vec<i32>>>,
        completions: Arc<Mutex<Vec<Completion<String>>>>,
    }

    impl Subscriber for Log {
        type Input = i32;
        type Failure = String;

        fn receive_subscription(&mut self, _subscription: SubscriptionRef) {}

        fn receive(&mut self, input: i32) -> Demand {
            self.values.lock().push(input);
            Demand::NONE
        }

        fn receive_completion(&mut self, completion: Completion<String>) {
            self.completions.lock().push(completion);
        }
    }

    struct Inert;

    impl Subscription for Inert {
        fn request(&self, _demand: Demand) {}
        fn cancel(&self) {}
    }

    type Probe = (
        Arc<Downstream<i32, String>>,
        Arc<Mutex<Vec<i32>>>,
        Arc<Mutex<Vec<Completion<String>>>>,
    );

    fn downstream(overflow: Overflow) -> Probe {
        let values = Arc::new(Mutex::new(Vec::new()));
        let completions = Arc::new(Mutex::new(Vec::new()));
        let log = Log {
            values: Arc::clone(&values),
            completions: Arc::clone(&completions),
        };
        let downstream = Downstream::new(Box::new(log), overflow);
        downstream.attach(Arc::new(Inert));
        (downstream, values, completions)
    }

    #[test]
    fn test_buffer_waits_for_demand() {
        let (downstream, values, completions) = downstream(Overflow::Buffer);

        downstream.emit(1);
        downstream.emit(2);
        downstream.complete(Completion::Finished);
        assert!(values.lock().is_empty());
        assert!(completions.lock().is_empty());

        downstream.request(Demand::max(1));
        assert_eq!(*values.lock(), vec![1]);
        assert!(completions.lock().is_empty());

        downstream.request(Demand::max(1));
        assert_eq!(*values.lock(), vec![1, 2]);
        assert_eq!(*completions.lock(), vec![Completion::Finished]);
    }

    #[test]
    fn test_drop_without_demand() {
        let (downstream, values, _) = downstream(Overflow::Drop);

        assert!(!downstream.emit(1));
        downstream.request(Demand::max(1));
        assert!(downstream.emit(2));
        assert!(!downstream.emit(3));
        assert_eq!(*values.lock(), vec![2]);
    }

    #[test]
    fn test_latest_keeps_newest() {
        let (downstream, values, _) = downstream(Overflow::Latest);

        downstream.emit(1);
        downstream.emit(2);
        downstream.emit(3);
        downstream.request(Demand::max(5));
        assert_eq!(*values.lock(), vec![3]);
    }

    #[test]
    fn test_failure_discards_backlog() {
        let (downstream, values, completions) = downstream(Overflow::Buffer);

        downstream.emit(1);
        downstream.complete(Completion::Failed("boom".into()));
        downstream.request(Demand::Unlimited);
        assert!(values.lock().is_empty());
        assert_eq!(*completions.lock(), vec![Completion::Failed("boom".into())]);
    }

    #[test]
    fn test_primed_value_comes_first() {
        let (downstream, values, _) = downstream(Overflow::Drop);

        downstream.prime(0);
        downstream.request(Demand::max(2));
        downstream.emit(1);
        assert_eq!(*values.lock(), vec![0, 1]);
    }

    #[test]
    fn test_primed_value_replaced_until_demand() {
        let (downstream, values, _) = downstream(Overflow::Drop);

        downstream.prime(0);
        assert!(downstream.emit(5));
        assert!(downstream.emit(9));
        downstream.request(Demand::max(2));
        assert!(downstream.emit(10));
        assert!(!downstream.emit(11));
        assert_eq!(*values.lock(), vec![9, 10]);
    }

    #[test]
    fn test_nothing_after_cancel() {
        let (downstream, values, completions) = downstream(Overflow::Buffer);

        downstream.emit(1);
        downstream.cancel();
        downstream.request(Demand::Unlimited);
        downstream.emit(2);
        downstream.complete(Completion::Finished);
        assert!(values.lock().is_empty());
        assert!(completions.lock().is_empty());
    }

    #[test]
    #[should_panic(expected = "without outstanding demand")]
    fn test_strict_rejects_unrequested_value() {
        let (downstream, _, _) = downstream(Overflow::Strict);
        downstream.emit(1);
    }
}
