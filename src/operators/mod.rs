//! Operator library.
//!
//! Every operator is a publisher wrapping one or more upstream publishers
//! and subscribing to them on behalf of its own subscribers. The chaining
//! methods live on [`PublisherExt`], implemented for every publisher.
//!
//! # Example
//!
//! ```ignore
//! let email = CurrentValueSubject::<String, Never>::new(String::new());
//! let valid = email
//!     .clone()
//!     .map(|s| s.trim().to_lowercase())
//!     .map(|s| s.contains('@') && s.contains('.'));
//!
//! let mut bag = CancelBag::new();
//! valid.sink_values(|ok| println!("valid: {ok}")).store_in(&mut bag);
//! ```

mod catch;
mod collect;
mod combine_latest;
mod fan_in;
mod filter;
mod handle_events;
mod link;
mod map;

pub use catch::Catch;
pub use collect::Collect;
pub use combine_latest::{CombineLatest, CombineLatest3, CombineLatestAll};
pub use fan_in::{FlatMap, FlatMapConfig, Merge};
pub use filter::{DropWhile, Filter};
pub use handle_events::{EventHooks, HandleEvents};
pub use map::{Map, MapError};

use crate::core::{AnyPublisher, Cancellable, Publisher};
use crate::record::{self, Recorder};
use crate::subjects::CurrentValueSubject;
use crate::subscribers::{self, ChannelConfig, ChannelHandle};
use crate::types::{Completion, Never};

fn absurd<E>(never: Never) -> E {
    match never {}
}

/// Interleave any number of publishers sharing one output type.
pub fn merge_all<T, E>(upstreams: Vec<AnyPublisher<T, E>>) -> Merge<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    Merge::new(upstreams)
}

/// Latest value of every upstream, as a `Vec` in upstream order.
pub fn combine_latest_all<T, E>(upstreams: Vec<AnyPublisher<T, E>>) -> CombineLatestAll<T, E>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    CombineLatestAll::new(upstreams)
}

/// Chaining methods available on every publisher.
pub trait PublisherExt: Publisher + Sized {
    fn map<U, F>(self, transform: F) -> Map<Self, F>
    where
        F: Fn(Self::Output) -> U + Send + Sync + 'static,
        U: Send + 'static,
    {
        Map::new(self, transform)
    }

    fn map_error<E, F>(self, transform: F) -> MapError<Self, F>
    where
        F: Fn(Self::Failure) -> E + Send + Sync + 'static,
        E: Send + 'static,
    {
        MapError::new(self, transform)
    }

    /// Give a never-failing publisher any failure type.
    fn set_failure_type<E>(self) -> MapError<Self, fn(Never) -> E>
    where
        Self: Publisher<Failure = Never>,
        E: Send + 'static,
    {
        MapError::new(self, absurd::<E> as fn(Never) -> E)
    }

    fn filter<F>(self, predicate: F) -> Filter<Self, F>
    where
        F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        Filter::new(self, predicate)
    }

    fn drop_while<F>(self, predicate: F) -> DropWhile<Self, F>
    where
        F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        DropWhile::new(self, predicate)
    }

    fn combine_latest<Q>(self, other: Q) -> CombineLatest<Self::Output, Q::Output, Self::Failure>
    where
        Self::Output: Clone,
        Q: Publisher<Failure = Self::Failure>,
        Q::Output: Clone,
    {
        CombineLatest::new(self, other)
    }

    fn combine_latest3<Q, R>(
        self,
        second: Q,
        third: R,
    ) -> CombineLatest3<Self::Output, Q::Output, R::Output, Self::Failure>
    where
        Self::Output: Clone,
        Q: Publisher<Failure = Self::Failure>,
        Q::Output: Clone,
        R: Publisher<Failure = Self::Failure>,
        R::Output: Clone,
    {
        CombineLatest3::new(self, second, third)
    }

    fn merge<Q>(self, other: Q) -> Merge<Self::Output, Self::Failure>
    where
        Q: Publisher<Output = Self::Output, Failure = Self::Failure>,
    {
        Merge::new(vec![self.erase(), other.erase()])
    }

    fn flat_map<Q, F>(self, transform: F) -> FlatMap<Self, F>
    where
        F: Fn(Self::Output) -> Q + Send + Sync + 'static,
        Q: Publisher<Failure = Self::Failure>,
    {
        FlatMap::new(self, FlatMapConfig::default(), transform)
    }

    fn flat_map_with<Q, F>(self, config: FlatMapConfig, transform: F) -> FlatMap<Self, F>
    where
        F: Fn(Self::Output) -> Q + Send + Sync + 'static,
        Q: Publisher<Failure = Self::Failure>,
    {
        FlatMap::new(self, config, transform)
    }

    fn collect(self) -> Collect<Self> {
        Collect::new(self)
    }

    fn catch<Q, F>(self, recover: F) -> Catch<Self, F>
    where
        F: Fn(Self::Failure) -> Q + Send + Sync + 'static,
        Q: Publisher<Output = Self::Output>,
    {
        Catch::new(self, recover)
    }

    fn handle_events(self, hooks: EventHooks<Self::Output, Self::Failure>) -> HandleEvents<Self> {
        HandleEvents::new(self, hooks)
    }

    fn erase(self) -> AnyPublisher<Self::Output, Self::Failure> {
        AnyPublisher::new(self)
    }

    /// Subscribe with unlimited demand.
    fn sink<V, C>(self, on_value: V, on_completion: C) -> Cancellable
    where
        V: FnMut(Self::Output) + Send + 'static,
        C: FnMut(Completion<Self::Failure>) + Send + 'static,
    {
        subscribers::sink(&self, on_value, on_completion)
    }

    fn sink_values<V>(self, on_value: V) -> Cancellable
    where
        Self: Publisher<Failure = Never>,
        V: FnMut(Self::Output) + Send + 'static,
    {
        subscribers::sink(&self, on_value, |_| {})
    }

    /// Hand every value to `setter`; the last assignment wins.
    fn assign<S>(self, setter: S) -> Cancellable
    where
        Self: Publisher<Failure = Never>,
        S: FnMut(Self::Output) + Send + 'static,
    {
        subscribers::sink(&self, setter, |_| {})
    }

    /// Forward every value into `subject`.
    fn assign_to<E>(self, subject: &CurrentValueSubject<Self::Output, E>) -> Cancellable
    where
        Self: Publisher<Failure = Never>,
        Self::Output: Clone,
        E: Clone + Send + 'static,
    {
        let subject = subject.clone();
        subscribers::sink(&self, move |value| subject.send(value), |_| {})
    }

    /// Pull values through a bounded channel.
    fn into_channel(self, config: ChannelConfig) -> ChannelHandle<Self::Output, Self::Failure> {
        subscribers::channel(&self, config)
    }

    /// Capture every value and the completion.
    fn record(self) -> Recorder<Self::Output, Self::Failure>
    where
        Self::Output: Clone,
        Self::Failure: Clone,
    {
        record::record(&self)
    }
}

impl<P: Publisher> PublisherExt for P {}
