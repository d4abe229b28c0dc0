//! One-shot results fulfilled by a callback, possibly from another thread.

use crate::core::{BoxedSubscriber, Downstream, Overflow, Publisher, Subscription, SubscriptionRef};
use crate::types::{Completion, Demand};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

struct Outcome<T, E> {
    result: Option<Result<T, E>>,
    /// Subscribers that arrived before the result.
    waiting: BTreeMap<u64, Arc<Downstream<T, E>>>,
}

struct Shared<T, E> {
    outcome: Mutex<Outcome<T, E>>,
    next_id: AtomicU64,
}

impl<T, E> Shared<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn fulfill(&self, result: Result<T, E>) -> bool {
        let waiting = {
            let mut outcome = self.outcome.lock();
            if outcome.result.is_some() {
                warn!("promise fulfilled more than once, discarding later result");
                return false;
            }
            outcome.result = Some(result.clone());
            std::mem::take(&mut outcome.waiting)
        };
        debug!(
            subscribers = waiting.len(),
            ok = result.is_ok(),
            "future resolved"
        );
        for downstream in waiting.into_values() {
            deliver(&downstream, result.clone());
        }
        true
    }

    fn remove(&self, id: u64) {
        self.outcome.lock().waiting.remove(&id);
    }
}

fn deliver<T, E>(downstream: &Downstream<T, E>, result: Result<T, E>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    match result {
        Ok(value) => {
            downstream.enqueue(value);
            downstream.enqueue_completion(Completion::Finished);
        }
        Err(error) => downstream.enqueue_completion(Completion::Failed(error)),
    }
    downstream.drain();
}

/// One-shot publisher resolved by a [`Promise`].
///
/// The worker runs once, inside `new`, and may keep the promise to fulfill
/// it later from any thread. Every subscriber, before or after resolution,
/// receives the same outcome: the value (once it has demand) followed by
/// `finished`, or the failure.
pub struct Future<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new<W>(worker: W) -> Self
    where
        W: FnOnce(Promise<T, E>),
    {
        let shared = Arc::new(Shared {
            outcome: Mutex::new(Outcome {
                result: None,
                waiting: BTreeMap::new(),
            }),
            next_id: AtomicU64::new(0),
        });
        worker(Promise {
            shared: Arc::clone(&shared),
        });
        Self { shared }
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.outcome.lock().result.is_some()
    }
}

impl<T, E> Clone for Future<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> fmt::Debug for Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl<T, E> Publisher for Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<T, E>) {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let downstream = Downstream::new(subscriber, Overflow::Buffer);
        let subscription: SubscriptionRef = Arc::new(FutureSubscription {
            shared: Arc::downgrade(&self.shared),
            downstream: Arc::clone(&downstream),
            id,
        });
        downstream.attach(subscription);

        let resolved = {
            let mut outcome = self.shared.outcome.lock();
            match outcome.result.clone() {
                Some(result) => Some(result),
                None => {
                    if !downstream.is_cancelled() {
                        outcome.waiting.insert(id, Arc::clone(&downstream));
                    }
                    None
                }
            }
        };
        if let Some(result) = resolved {
            deliver(&downstream, result);
        }
    }
}

struct FutureSubscription<T, E> {
    shared: Weak<Shared<T, E>>,
    downstream: Arc<Downstream<T, E>>,
    id: u64,
}

impl<T, E> Subscription for FutureSubscription<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn request(&self, demand: Demand) {
        self.downstream.request(demand);
    }

    fn cancel(&self) {
        self.downstream.cancel();
        if let Some(shared) = self.shared.upgrade() {
            shared.remove(self.id);
        }
    }
}

/// Completion callback handed to a [`Future`]'s worker.
///
/// Only the first fulfillment counts. Later calls log a warning, change
/// nothing and return `false`.
pub struct Promise<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn fulfill(&self, result: Result<T, E>) -> bool {
        self.shared.fulfill(result)
    }

    pub fn succeed(&self, value: T) -> bool {
        self.fulfill(Ok(value))
    }

    pub fn fail(&self, error: E) -> bool {
        self.fulfill(Err(error))
    }
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}
