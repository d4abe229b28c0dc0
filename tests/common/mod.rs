//! Shared test subscriber.

#![allow(dead_code)]

use parking_lot::Mutex;
use relay::{Completion, Demand, Publisher, Subscriber, SubscriptionRef};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub enum Event<T, E> {
    Subscribed,
    Value(T),
    Completion(Completion<E>),
}

struct ProbeState<T, E> {
    events: Vec<Event<T, E>>,
    subscription: Option<SubscriptionRef>,
}

/// Records everything a subscription delivers. Grants `initial` demand on
/// subscribe and `per_value` after each value.
pub struct Probe<T, E> {
    state: Arc<Mutex<ProbeState<T, E>>>,
}

impl<T, E> Clone for Probe<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T, E> Probe<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn subscribe<P>(publisher: &P, initial: Demand) -> Self
    where
        P: Publisher<Output = T, Failure = E>,
    {
        Self::subscribe_with(publisher, initial, Demand::NONE)
    }

    pub fn subscribe_with<P>(publisher: &P, initial: Demand, per_value: Demand) -> Self
    where
        P: Publisher<Output = T, Failure = E>,
    {
        let probe = Self {
            state: Arc::new(Mutex::new(ProbeState {
                events: Vec::new(),
                subscription: None,
            })),
        };
        publisher.subscribe(ProbeSubscriber {
            state: Arc::clone(&probe.state),
            initial,
            per_value,
        });
        probe
    }

    pub fn events(&self) -> Vec<Event<T, E>> {
        self.state.lock().events.clone()
    }

    pub fn values(&self) -> Vec<T> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Value(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn completion(&self) -> Option<Completion<E>> {
        self.state.lock().events.iter().find_map(|event| match event {
            Event::Completion(completion) => Some(completion.clone()),
            _ => None,
        })
    }

    pub fn completions(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|event| matches!(event, Event::Completion(_)))
            .count()
    }

    pub fn request(&self, demand: Demand) {
        let subscription = self.state.lock().subscription.clone();
        if let Some(subscription) = subscription {
            subscription.request(demand);
        }
    }

    pub fn cancel(&self) {
        let subscription = self.state.lock().subscription.clone();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }
}

struct ProbeSubscriber<T, E> {
    state: Arc<Mutex<ProbeState<T, E>>>,
    initial: Demand,
    per_value: Demand,
}

impl<T, E> Subscriber for ProbeSubscriber<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        {
            let mut state = self.state.lock();
            state.events.push(Event::Subscribed);
            state.subscription = Some(Arc::clone(&subscription));
        }
        if !self.initial.is_none() {
            subscription.request(self.initial);
        }
    }

    fn receive(&mut self, input: T) -> Demand {
        self.state.lock().events.push(Event::Value(input));
        self.per_value
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        let mut state = self.state.lock();
        state.events.push(Event::Completion(completion));
        state.subscription = None;
    }
}

/// Install a test-writer tracing subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
