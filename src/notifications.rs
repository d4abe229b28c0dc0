//! In-process named event broadcaster.
//!
//! Stands in for a platform notification source: producers post named
//! events carrying a payload, and consumers get a never-failing publisher
//! per name, usually followed by a `map` that turns the payload into the
//! type the pipeline needs.
//!
//! # Example
//!
//! ```ignore
//! let center = NotificationCenter::<KeyboardFrame>::new();
//! let heights = center
//!     .publisher("keyboard_will_show")
//!     .map(|note| note.payload.height);
//!
//! center.post("keyboard_will_show", KeyboardFrame { height: 291.0 });
//! ```

use crate::core::AnyPublisher;
use crate::subjects::PassthroughSubject;
use crate::types::Never;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::trace;

/// One posted event.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification<P> {
    pub name: String,
    pub payload: P,
}

/// Routes posted notifications to the subscribers of their name.
///
/// A name holds no state until `publisher` is first called for it; posts to
/// such a name are discarded.
pub struct NotificationCenter<P> {
    channels: RwLock<HashMap<String, PassthroughSubject<Notification<P>, Never>>>,
}

impl<P> NotificationCenter<P>
where
    P: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Deliver `payload` under `name` to every current subscriber with
    /// demand. Returns the number of subscribers registered for the name.
    pub fn post(&self, name: &str, payload: P) -> usize {
        let subject = self.channels.read().get(name).cloned();
        let Some(subject) = subject else {
            trace!(name, "notification posted with no listeners");
            return 0;
        };
        let count = subject.subscriber_count();
        subject.send(Notification {
            name: name.to_string(),
            payload,
        });
        count
    }

    /// Publisher of every notification posted under `name` from now on.
    pub fn publisher(&self, name: &str) -> AnyPublisher<Notification<P>, Never> {
        if let Some(subject) = self.channels.read().get(name) {
            return AnyPublisher::new(subject.clone());
        }
        let subject = self
            .channels
            .write()
            .entry(name.to_string())
            .or_default()
            .clone();
        AnyPublisher::new(subject)
    }

    pub fn subscriber_count(&self, name: &str) -> usize {
        self.channels
            .read()
            .get(name)
            .map_or(0, |subject| subject.subscriber_count())
    }
}

impl<P> Default for NotificationCenter<P>
where
    P: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::PublisherExt;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Debug, PartialEq)]
    struct Frame {
        height: f64,
    }

    #[test]
    fn test_post_reaches_matching_name_only() {
        let center = NotificationCenter::<Frame>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _handle = center
            .publisher("will_show")
            .map(|note| note.payload.height)
            .sink_values(move |h| sink.lock().push(h));

        assert_eq!(center.post("will_show", Frame { height: 291.0 }), 1);
        assert_eq!(center.post("will_hide", Frame { height: 0.0 }), 0);

        assert_eq!(*seen.lock(), vec![291.0]);
    }

    #[test]
    fn test_unused_name_holds_no_state() {
        let center = NotificationCenter::<Frame>::new();
        center.post("nobody", Frame { height: 1.0 });
        assert!(center.channels.read().is_empty());
    }
}
