//! Per-subscription publisher construction.

use crate::core::{BoxedSubscriber, Publisher};
use tracing::trace;

/// Calls `factory` on every subscribe and subscribes to what it returns.
pub struct Deferred<F> {
    factory: F,
}

impl<F> Deferred<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<F, P> Publisher for Deferred<F>
where
    F: Fn() -> P + Send + Sync + 'static,
    P: Publisher,
{
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<P::Output, P::Failure>) {
        trace!("deferred: building publisher for new subscription");
        (self.factory)().subscribe_boxed(subscriber)
    }
}
