//! Subject that remembers its latest value and seeds new subscribers with it.

use super::SubjectCore;
use crate::core::{BoxedSubscriber, Publisher};
use crate::types::Completion;
use std::fmt;
use std::sync::Arc;

/// Subject that always holds a current value. A new subscriber receives
/// the value that is current when its first demand arrives, then every
/// later send.
///
/// Clones share the same subject.
pub struct CurrentValueSubject<T, E> {
    core: Arc<SubjectCore<T, E>>,
}

impl<T, E> CurrentValueSubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new(initial: T) -> Self {
        Self {
            core: SubjectCore::current_value(initial),
        }
    }

    /// The value most recently sent, or the initial value.
    pub fn value(&self) -> T {
        match self.core.value() {
            Some(value) => value,
            None => unreachable!("current-value subject always holds a value"),
        }
    }

    /// Store `value` as current, then deliver it to every subscriber with
    /// outstanding demand.
    ///
    /// # Panics
    ///
    /// If the subject already completed.
    pub fn send(&self, value: T) {
        self.core.send(value)
    }

    pub fn send_completion(&self, completion: Completion<E>) {
        self.core.send_completion(completion)
    }

    pub fn subscriber_count(&self) -> usize {
        self.core.subscriber_count()
    }
}

impl<T, E> Clone for CurrentValueSubject<T, E> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T, E> fmt::Debug for CurrentValueSubject<T, E>
where
    T: Clone + Send + fmt::Debug + 'static,
    E: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentValueSubject")
            .field("value", &self.value())
            .finish_non_exhaustive()
    }
}

impl<T, E> Publisher for CurrentValueSubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<T, E>) {
        self.core.subscribe(subscriber)
    }
}
