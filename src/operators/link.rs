//! Subscription shared by single-upstream operators.

use crate::core::{BoxedSubscriber, Downstream, Overflow, Subscription, SubscriptionRef};
use crate::types::{Completion, Demand};
use parking_lot::Mutex;
use std::sync::Arc;

/// Connects one upstream subscription to one downstream subscriber.
///
/// A forwarding link passes downstream demand straight upstream, so the
/// operator emits at most what was requested. A buffering link asks the
/// upstream for everything and parks output until demand arrives.
pub(crate) struct Link<T, E> {
    downstream: Arc<Downstream<T, E>>,
    upstream: Mutex<Option<SubscriptionRef>>,
    forwards_demand: bool,
}

impl<T, E> Link<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn forwarding(subscriber: BoxedSubscriber<T, E>) -> Arc<Self> {
        Arc::new(Self {
            downstream: Downstream::new(subscriber, Overflow::Strict),
            upstream: Mutex::new(None),
            forwards_demand: true,
        })
    }

    pub fn buffering(subscriber: BoxedSubscriber<T, E>) -> Arc<Self> {
        Arc::new(Self {
            downstream: Downstream::new(subscriber, Overflow::Buffer),
            upstream: Mutex::new(None),
            forwards_demand: false,
        })
    }

    /// Store the upstream subscription and hand `self` downstream.
    pub fn connect(self: &Arc<Self>, upstream: SubscriptionRef) {
        let handle: SubscriptionRef = self.clone();
        self.connect_as(upstream, handle);
    }

    /// Like `connect`, but the downstream sees `handle`, which wraps this
    /// link.
    pub fn connect_as(&self, upstream: SubscriptionRef, handle: SubscriptionRef) {
        *self.upstream.lock() = Some(Arc::clone(&upstream));
        self.downstream.attach(handle);
        if !self.forwards_demand && !self.downstream.is_cancelled() {
            upstream.request(Demand::Unlimited);
        }
    }

    pub fn emit(&self, value: T) {
        self.downstream.emit(value);
    }

    /// Forward the upstream's completion.
    pub fn finish(&self, completion: Completion<E>) {
        self.upstream.lock().take();
        self.downstream.complete(completion);
    }

    pub fn is_terminated(&self) -> bool {
        self.downstream.is_completed()
    }
}

impl<T, E> Subscription for Link<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn request(&self, demand: Demand) {
        self.downstream.add_demand(demand);
        if self.forwards_demand {
            let upstream = self.upstream.lock().clone();
            if let Some(upstream) = upstream {
                upstream.request(demand);
            }
        }
        self.downstream.drain();
    }

    fn cancel(&self) {
        self.downstream.cancel();
        let upstream = self.upstream.lock().take();
        if let Some(upstream) = upstream {
            upstream.cancel();
        }
    }
}
