//! Capturing a stream and playing it back.
//!
//! [`record`](crate::PublisherExt::record) subscribes with unlimited demand
//! and fills a [`Recording`]. A recording can be encoded, decoded and
//! handed to [`Record`] (or [`replay`]), a publisher that delivers the
//! captured values and completion to every subscriber from the start.

mod codec;
mod recorder;
mod recording;
mod replay;

pub use codec::RecordingFormat;
pub use recorder::Recorder;
pub use recording::{RecordedItem, Recording};
pub use replay::{replay, Record};

pub(crate) use recorder::record;
