//! Subject that forwards sent values without keeping them.

use super::SubjectCore;
use crate::core::{BoxedSubscriber, Publisher};
use crate::types::Completion;
use std::fmt;
use std::sync::Arc;

/// Subject with no stored value. Subscribers only see what is sent after
/// they subscribed.
///
/// Clones share the same subject.
pub struct PassthroughSubject<T, E> {
    core: Arc<SubjectCore<T, E>>,
}

impl<T, E> PassthroughSubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            core: SubjectCore::passthrough(),
        }
    }

    /// Deliver `value` to every subscriber with outstanding demand.
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

impl<T, E> Default for PassthroughSubject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for PassthroughSubject<T, E> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T, E> fmt::Debug for PassthroughSubject<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassthroughSubject").finish_non_exhaustive()
    }
}

impl<T, E> Publisher for PassthroughSubject<T, E>
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::PublisherExt;
    use crate::types::Never;
    use parking_lot::Mutex;

    #[test]
    fn test_late_subscriber_misses_earlier_values() {
        let subject = PassthroughSubject::<i32, Never>::new();
        subject.send(1);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _handle = subject.clone().sink_values(move |v| sink.lock().push(v));
        subject.send(2);

        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn test_completion_replayed_to_late_subscriber() {
        let subject = PassthroughSubject::<i32, String>::new();
        subject.send_completion(Completion::Failed("closed".into()));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _handle = subject.clone().sink(|_| {}, move |c| sink.lock().push(c));

        assert_eq!(*seen.lock(), vec![Completion::Failed("closed".to_string())]);
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn test_second_completion_ignored() {
        let subject = PassthroughSubject::<i32, String>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _handle = subject.clone().sink(|_| {}, move |c| sink.lock().push(c));

        subject.send_completion(Completion::Finished);
        subject.send_completion(Completion::Failed("late".into()));

        assert_eq!(*seen.lock(), vec![Completion::Finished]);
    }

    #[test]
    #[should_panic(expected = "after completion")]
    fn test_send_after_completion_panics() {
        let subject = PassthroughSubject::<i32, Never>::new();
        subject.send_completion(Completion::Finished);
        subject.send(1);
    }
}
