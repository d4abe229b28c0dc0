//! Imperative entry points into the stream world.
//!
//! A subject is a publisher that code can push values into. Every
//! subscriber gets its own queue and demand; a value sent while a
//! subscriber has no outstanding demand is dropped for that subscriber
//! only. Once a completion is sent it is stored and replayed to anyone
//! subscribing later.

mod current_value;
mod passthrough;

pub use current_value::CurrentValueSubject;
pub use passthrough::PassthroughSubject;

use crate::core::{BoxedSubscriber, Downstream, Overflow, Subscription, SubscriptionRef};
use crate::types::{Completion, Demand};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

struct Registry<T, E> {
    subscribers: BTreeMap<u64, Arc<Downstream<T, E>>>,
    completion: Option<Completion<E>>,
    /// Latest value, kept only by current-value subjects.
    current: Option<T>,
}

/// State shared by both subject kinds.
pub(crate) struct SubjectCore<T, E> {
    registry: Mutex<Registry<T, E>>,
    next_id: AtomicU64,
    keeps_current: bool,
}

impl<T, E> SubjectCore<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn passthrough() -> Arc<Self> {
        Self::build(None, false)
    }

    pub fn current_value(initial: T) -> Arc<Self> {
        Self::build(Some(initial), true)
    }

    fn build(current: Option<T>, keeps_current: bool) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(Registry {
                subscribers: BTreeMap::new(),
                completion: None,
                current,
            }),
            next_id: AtomicU64::new(0),
            keeps_current,
        })
    }

    pub fn value(&self) -> Option<T> {
        self.registry.lock().current.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().subscribers.len()
    }

    pub fn subscribe(self: &Arc<Self>, subscriber: BoxedSubscriber<T, E>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let downstream = Downstream::new(subscriber, Overflow::Drop);
        let subscription: SubscriptionRef = Arc::new(SubjectSubscription {
            core: Arc::downgrade(self),
            downstream: Arc::clone(&downstream),
            id,
        });
        downstream.attach(subscription);

        {
            let mut registry = self.registry.lock();
            if let Some(completion) = registry.completion.clone() {
                downstream.enqueue_completion(completion);
            } else if !downstream.is_cancelled() {
                if let Some(current) = registry.current.clone() {
                    downstream.prime(current);
                }
                registry.subscribers.insert(id, Arc::clone(&downstream));
                trace!(id, "subject subscriber registered");
            }
        }
        downstream.drain();
    }

    /// Broadcast a value. Panics if the subject already completed.
    pub fn send(&self, value: T) {
        let targets: Vec<_> = {
            let mut registry = self.registry.lock();
            assert!(
                registry.completion.is_none(),
                "value sent to a subject after completion"
            );
            if self.keeps_current {
                registry.current = Some(value.clone());
            }
            for downstream in registry.subscribers.values() {
                downstream.enqueue(value.clone());
            }
            registry.subscribers.values().cloned().collect()
        };
        for downstream in targets {
            downstream.drain();
        }
    }

    /// Broadcast the terminal completion. A second completion is ignored.
    pub fn send_completion(&self, completion: Completion<E>) {
        let targets = {
            let mut registry = self.registry.lock();
            if registry.completion.is_some() {
                debug!("subject already completed, ignoring completion");
                return;
            }
            registry.completion = Some(completion.clone());
            let targets = std::mem::take(&mut registry.subscribers);
            for downstream in targets.values() {
                downstream.enqueue_completion(completion.clone());
            }
            targets
        };
        debug!(subscribers = targets.len(), "subject completed");
        for downstream in targets.into_values() {
            downstream.drain();
        }
    }

    fn remove(&self, id: u64) {
        self.registry.lock().subscribers.remove(&id);
    }
}

struct SubjectSubscription<T, E> {
    core: Weak<SubjectCore<T, E>>,
    downstream: Arc<Downstream<T, E>>,
    id: u64,
}

impl<T, E> Subscription for SubjectSubscription<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn request(&self, demand: Demand) {
        self.downstream.request(demand);
    }

    fn cancel(&self) {
        self.downstream.cancel();
        if let Some(core) = self.core.upgrade() {
            core.remove(self.id);
            trace!(id = self.id, "subject subscriber cancelled");
        }
    }
}
