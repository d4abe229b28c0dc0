//! Finite, demand-driven sources.
//!
//! Each subscription gets its own [`Emitter`], which pulls from an iterator
//! only while the subscriber has outstanding demand. The completion never
//! waits for demand.

use crate::core::{BoxedSubscriber, Downstream, Overflow, Publisher, Subscription, SubscriptionRef};
use crate::types::{Completion, Demand, Never};
use parking_lot::Mutex;
use std::iter::Peekable;
use std::marker::PhantomData;
use std::sync::Arc;

type Values<T> = Peekable<Box<dyn Iterator<Item = T> + Send>>;

struct Pending<T, E> {
    values: Values<T>,
    completion: Completion<E>,
}

/// Per-subscription producer for iterator-backed sources.
pub(crate) struct Emitter<T, E> {
    downstream: Arc<Downstream<T, E>>,
    pending: Mutex<Option<Pending<T, E>>>,
}

impl<T, E> Emitter<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn start(
        subscriber: BoxedSubscriber<T, E>,
        values: Box<dyn Iterator<Item = T> + Send>,
        completion: Completion<E>,
    ) {
        let emitter = Arc::new(Self {
            downstream: Downstream::new(subscriber, Overflow::Strict),
            pending: Mutex::new(Some(Pending {
                values: values.peekable(),
                completion,
            })),
        });
        let handle: SubscriptionRef = emitter.clone();
        emitter.downstream.attach(handle);
        emitter.pump();
    }

    fn pump(&self) {
        {
            let mut pending = self.pending.lock();
            if let Some(current) = pending.as_mut() {
                while self.downstream.has_demand() {
                    match current.values.next() {
                        Some(value) => {
                            self.downstream.enqueue(value);
                        }
                        None => break,
                    }
                }
                if current.values.peek().is_none() {
                    if let Some(done) = pending.take() {
                        self.downstream.enqueue_completion(done.completion);
                    }
                }
            }
        }
        self.downstream.drain();
    }
}

impl<T, E> Subscription for Emitter<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn request(&self, demand: Demand) {
        self.downstream.add_demand(demand);
        self.pump();
    }

    fn cancel(&self) {
        self.downstream.cancel();
        self.pending.lock().take();
    }
}

/// Emits one value, then finishes.
pub struct Just<T, E = Never> {
    value: T,
    _failure: PhantomData<fn() -> E>,
}

impl<T> Just<T, Never> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            _failure: PhantomData,
        }
    }
}

impl<T, E> Just<T, E> {
    /// Same value, typed to fit a pipeline that can fail with `F`.
    pub fn with_failure_type<F>(self) -> Just<T, F> {
        Just {
            value: self.value,
            _failure: PhantomData,
        }
    }
}

impl<T, E> Publisher for Just<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<T, E>) {
        let values = Box::new(std::iter::once(self.value.clone()));
        Emitter::start(subscriber, values, Completion::Finished);
    }
}

/// Finishes immediately without emitting.
pub struct Empty<T, E = Never> {
    _types: PhantomData<fn() -> (T, E)>,
}

impl<T, E> Empty<T, E> {
    pub fn new() -> Self {
        Self {
            _types: PhantomData,
        }
    }
}

impl<T, E> Default for Empty<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Publisher for Empty<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<T, E>) {
        Emitter::start(subscriber, Box::new(std::iter::empty()), Completion::Finished);
    }
}

/// Fails immediately with a clone of `error`.
pub struct Fail<T, E> {
    error: E,
    _output: PhantomData<fn() -> T>,
}

impl<T, E> Fail<T, E> {
    pub fn new(error: E) -> Self {
        Self {
            error,
            _output: PhantomData,
        }
    }
}

impl<T, E> Publisher for Fail<T, E>
where
    T: Send + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<T, E>) {
        Emitter::start(
            subscriber,
            Box::new(std::iter::empty()),
            Completion::Failed(self.error.clone()),
        );
    }
}

/// Emits a fixed list of values in order, then finishes. Every subscription
/// starts from the first value.
pub struct Sequence<T, E = Never> {
    items: Arc<Vec<T>>,
    _failure: PhantomData<fn() -> E>,
}

impl<T, E> Sequence<T, E> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(items),
            _failure: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T, E> FromIterator<T> for Sequence<T, E> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T, E> Clone for Sequence<T, E> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            _failure: PhantomData,
        }
    }
}

impl<T, E> Publisher for Sequence<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<T, E>) {
        let items = Arc::clone(&self.items);
        let values = Box::new((0..items.len()).map(move |index| items[index].clone()));
        Emitter::start(subscriber, values, Completion::Finished);
    }
}

/// Shorthand for [`Sequence::from_iter`].
pub fn from_iter<T, E, I>(items: I) -> Sequence<T, E>
where
    I: IntoIterator<Item = T>,
{
    items.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Subscriber;
    use crate::operators::PublisherExt;

    struct Stepper {
        seen: Arc<Mutex<Vec<i32>>>,
        done: Arc<Mutex<Option<Completion<Never>>>>,
        initial: Demand,
    }

    impl Subscriber for Stepper {
        type Input = i32;
        type Failure = Never;

        fn receive_subscription(&mut self, subscription: SubscriptionRef) {
            subscription.request(self.initial);
        }

        fn receive(&mut self, input: i32) -> Demand {
            self.seen.lock().push(input);
            Demand::max(1)
        }

        fn receive_completion(&mut self, completion: Completion<Never>) {
            *self.done.lock() = Some(completion);
        }
    }

    #[test]
    fn test_sequence_pulls_one_at_a_time() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Mutex::new(None));
        let source: Sequence<i32> = (1..=1000).collect();
        source.subscribe(Stepper {
            seen: Arc::clone(&seen),
            done: Arc::clone(&done),
            initial: Demand::max(1),
        });

        assert_eq!(seen.lock().len(), 1000);
        assert_eq!(*done.lock(), Some(Completion::Finished));
    }

    #[test]
    fn test_empty_finishes_without_demand() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Mutex::new(None));
        Empty::<i32>::new().subscribe(Stepper {
            seen: Arc::clone(&seen),
            done: Arc::clone(&done),
            initial: Demand::NONE,
        });

        assert!(seen.lock().is_empty());
        assert_eq!(*done.lock(), Some(Completion::Finished));
    }

    #[test]
    fn test_fail_delivers_error() {
        let done = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&done);
        let _handle = Fail::<i32, &str>::new("nope").sink(|_| {}, move |c| sink.lock().push(c));
        assert_eq!(*done.lock(), vec![Completion::Failed("nope")]);
    }

    #[test]
    fn test_just_restarts_per_subscription() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let just = Arc::new(Just::new(7));
        for _ in 0..2 {
            let sink = Arc::clone(&seen);
            let _handle = Arc::clone(&just).sink_values(move |v| sink.lock().push(v));
        }
        assert_eq!(*seen.lock(), vec![7, 7]);
    }
}
