//! Ordered capture of a stream, sealed by its completion.

use crate::error::{RelayError, Result};
use crate::types::Completion;
use serde::{Deserialize, Serialize};

/// One captured signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedItem<T, E> {
    Value(T),
    Completion(Completion<E>),
}

/// Ordered values plus at most one trailing completion.
///
/// Append-only while capturing; sealed once a completion is appended.
/// Decoding rejects documents that break this shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecording<T, E>")]
#[serde(bound(
    serialize = "T: Serialize, E: Serialize",
    deserialize = "T: Deserialize<'de>, E: Deserialize<'de>"
))]
pub struct Recording<T, E> {
    items: Vec<RecordedItem<T, E>>,
}

#[derive(Deserialize)]
struct RawRecording<T, E> {
    items: Vec<RecordedItem<T, E>>,
}

impl<T, E> TryFrom<RawRecording<T, E>> for Recording<T, E> {
    type Error = String;

    fn try_from(raw: RawRecording<T, E>) -> std::result::Result<Self, String> {
        validate(&raw.items)?;
        Ok(Self { items: raw.items })
    }
}

fn validate<T, E>(items: &[RecordedItem<T, E>]) -> std::result::Result<(), String> {
    let last = items.len().saturating_sub(1);
    for (index, item) in items.iter().enumerate() {
        if let RecordedItem::Completion(_) = item {
            if index != last {
                return Err(format!(
                    "completion at position {} is followed by {} more item(s)",
                    index,
                    last - index
                ));
            }
        }
    }
    Ok(())
}

impl<T, E> Recording<T, E> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build from raw items, checking that only the last one is a
    /// completion.
    pub fn from_items(items: Vec<RecordedItem<T, E>>) -> Result<Self> {
        validate(&items).map_err(RelayError::InvalidRecording)?;
        Ok(Self { items })
    }

    /// Append a value.
    ///
    /// # Panics
    ///
    /// If the recording is sealed.
    pub fn receive(&mut self, value: T) {
        assert!(!self.is_sealed(), "value appended to a sealed recording");
        self.items.push(RecordedItem::Value(value));
    }

    /// Append the completion and seal the recording.
    ///
    /// # Panics
    ///
    /// If the recording is already sealed.
    pub fn receive_completion(&mut self, completion: Completion<E>) {
        assert!(!self.is_sealed(), "recording already sealed");
        self.items.push(RecordedItem::Completion(completion));
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self.items.last(), Some(RecordedItem::Completion(_)))
    }

    pub fn completion(&self) -> Option<&Completion<E>> {
        match self.items.last() {
            Some(RecordedItem::Completion(completion)) => Some(completion),
            _ => None,
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter_map(|item| match item {
            RecordedItem::Value(value) => Some(value),
            RecordedItem::Completion(_) => None,
        })
    }

    pub fn items(&self) -> &[RecordedItem<T, E>] {
        &self.items
    }

    /// Number of captured values.
    pub fn len(&self) -> usize {
        self.values().count()
    }

    /// True when no value was captured, even if the recording is sealed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, E> Default for Recording<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    enum Fault {
        OutOfGas,
    }

    #[test]
    fn test_seals_on_completion() {
        let mut recording = Recording::<i32, Fault>::new();
        recording.receive(1);
        recording.receive(2);
        assert!(!recording.is_sealed());

        recording.receive_completion(Completion::Failed(Fault::OutOfGas));
        assert!(recording.is_sealed());
        assert_eq!(recording.values().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(recording.completion(), Some(&Completion::Failed(Fault::OutOfGas)));
    }

    #[test]
    fn test_completion_only_recording_is_empty() {
        let mut recording = Recording::<i32, Fault>::new();
        recording.receive_completion(Completion::Finished);
        assert_eq!(recording.len(), 0);
        assert!(recording.is_empty());
        assert_eq!(recording.items().len(), 1);
    }

    #[test]
    #[should_panic(expected = "sealed")]
    fn test_append_after_seal_panics() {
        let mut recording = Recording::<i32, Fault>::new();
        recording.receive_completion(Completion::Finished);
        recording.receive(1);
    }

    #[test]
    fn test_from_items_rejects_value_after_completion() {
        let items = vec![
            RecordedItem::Value(1),
            RecordedItem::Completion(Completion::Finished),
            RecordedItem::Value(2),
        ];
        let result = Recording::<i32, Fault>::from_items(items);
        assert!(matches!(result, Err(RelayError::InvalidRecording(_))));
    }

    #[test]
    fn test_from_items_rejects_two_completions() {
        let items = vec![
            RecordedItem::Completion(Completion::Finished),
            RecordedItem::Completion(Completion::Failed(Fault::OutOfGas)),
        ];
        assert!(Recording::<i32, Fault>::from_items(items).is_err());
    }
}
