//! Capturing a live stream into a recording.

use super::Recording;
use crate::core::{Publisher, Subscriber, SubscriptionRef, SubscriptionSlot};
use crate::types::{Completion, Demand};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Live capture of a publisher's output.
///
/// The capture runs until the source completes or the recorder is
/// cancelled. Dropping the recorder does not stop it.
pub struct Recorder<T, E> {
    recording: Arc<Mutex<Recording<T, E>>>,
    slot: Arc<SubscriptionSlot>,
}

impl<T, E> Recorder<T, E>
where
    T: Clone,
    E: Clone,
{
    /// Snapshot of everything captured so far.
    pub fn recording(&self) -> Recording<T, E> {
        self.recording.lock().clone()
    }

    /// True once the source completed.
    pub fn is_finished(&self) -> bool {
        self.recording.lock().is_sealed()
    }

    /// Stop capturing. The recording keeps what it has and stays unsealed.
    pub fn cancel(&self) {
        self.slot.cancel();
    }
}

struct RecordingSubscriber<T, E> {
    recording: Arc<Mutex<Recording<T, E>>>,
    slot: Arc<SubscriptionSlot>,
}

impl<T, E> Subscriber for RecordingSubscriber<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
        if self.slot.fill(Arc::clone(&subscription)) {
            subscription.request(Demand::Unlimited);
        }
    }

    fn receive(&mut self, input: T) -> Demand {
        self.recording.lock().receive(input);
        Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion<E>) {
        self.slot.clear();
        let mut recording = self.recording.lock();
        recording.receive_completion(completion);
        debug!(values = recording.len(), "recording sealed");
    }
}

pub(crate) fn record<P>(publisher: &P) -> Recorder<P::Output, P::Failure>
where
    P: Publisher,
{
    let recording = Arc::new(Mutex::new(Recording::new()));
    let slot = SubscriptionSlot::new();
    publisher.subscribe(RecordingSubscriber {
        recording: Arc::clone(&recording),
        slot: Arc::clone(&slot),
    });
    Recorder { recording, slot }
}
