//! # Relay
//!
//! A demand-driven reactive stream engine: publishers describe streams,
//! subscribers pull values by granting demand, and operators compose the
//! two into pipelines.
//!
//! ## Core Concepts
//!
//! - **Publishers**: Reusable stream descriptions; every subscribe starts an independent run
//! - **Demand**: Subscribers request values; producers never deliver more than requested
//! - **Subjects**: Imperative entry points that broadcast sent values to subscribers
//! - **Futures**: One-shot results bridged in from callback-style work on any thread
//! - **Recordings**: Captured streams that can be encoded, decoded and replayed
//!
//! ## Example
//!
//! ```ignore
//! use relay::{CancelBag, CurrentValueSubject, Never, PublisherExt};
//!
//! let username = CurrentValueSubject::<String, Never>::new(String::new());
//! let password = CurrentValueSubject::<String, Never>::new(String::new());
//!
//! let mut bag = CancelBag::new();
//! username
//!     .clone()
//!     .combine_latest(password.clone())
//!     .map(|(user, pass)| user.len() >= 3 && pass.len() >= 8)
//!     .sink_values(|enabled| println!("sign up enabled: {enabled}"))
//!     .store_in(&mut bag);
//!
//! username.send("ada".into());
//! password.send("correct horse".into());
//! ```

pub mod bridge;
pub mod core;
pub mod error;
pub mod notifications;
pub mod operators;
pub mod record;
pub mod sources;
pub mod subjects;
pub mod subscribers;
pub mod types;

// Re-exports
pub use crate::core::{
    AnyPublisher, BoxedSubscriber, CancelBag, Cancellable, Publisher, Subscriber, Subscription,
    SubscriptionRef,
};
pub use bridge::{Deferred, Future, Promise};
pub use error::{RelayError, Result};
pub use notifications::{Notification, NotificationCenter};
pub use operators::{
    combine_latest_all, merge_all, Catch, Collect, CombineLatest, CombineLatest3,
    CombineLatestAll, DropWhile, EventHooks, Filter, FlatMap, FlatMapConfig, HandleEvents, Map,
    MapError, Merge, PublisherExt,
};
pub use record::{replay, Record, RecordedItem, Recorder, Recording, RecordingFormat};
pub use sources::{from_iter, Empty, Fail, Just, Sequence};
pub use subjects::{CurrentValueSubject, PassthroughSubject};
pub use subscribers::{ChannelConfig, ChannelHandle, Sink, StreamEvent};
pub use types::*;
