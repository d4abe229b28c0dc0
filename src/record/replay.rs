//! Restartable playback of a recording.

use super::{RecordedItem, Recording};
use crate::core::{BoxedSubscriber, Publisher};
use crate::sources::Emitter;
use crate::types::Completion;
use std::sync::Arc;

/// Plays a [`Recording`] back. Every subscription starts from the first
/// value and honors its own demand; the recorded completion follows the
/// last value. An unsealed recording finishes after its values.
pub struct Record<T, E> {
    recording: Arc<Recording<T, E>>,
}

impl<T, E> Record<T, E> {
    pub fn new(recording: Recording<T, E>) -> Self {
        Self {
            recording: Arc::new(recording),
        }
    }

    /// Fill a fresh recording inline and wrap it.
    pub fn build<F>(fill: F) -> Self
    where
        F: FnOnce(&mut Recording<T, E>),
    {
        let mut recording = Recording::new();
        fill(&mut recording);
        Self::new(recording)
    }

    pub fn recording(&self) -> &Recording<T, E> {
        &self.recording
    }
}

impl<T, E> Clone for Record<T, E> {
    fn clone(&self) -> Self {
        Self {
            recording: Arc::clone(&self.recording),
        }
    }
}

impl<T, E> Publisher for Record<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Output = T;
    type Failure = E;

    fn subscribe_boxed(&self, subscriber: BoxedSubscriber<T, E>) {
        let recording = Arc::clone(&self.recording);
        let completion = recording
            .completion()
            .cloned()
            .unwrap_or(Completion::Finished);
        let count = recording.items().len();
        let values = Box::new((0..count).filter_map(move |index| {
            match &recording.items()[index] {
                RecordedItem::Value(value) => Some(value.clone()),
                RecordedItem::Completion(_) => None,
            }
        }));
        Emitter::start(subscriber, values, completion);
    }
}

/// Publisher that replays `recording`.
pub fn replay<T, E>(recording: Recording<T, E>) -> Record<T, E> {
    Record::new(recording)
}
