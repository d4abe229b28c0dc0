//! Terminal subscribers: closures, assignment and blocking channels.

mod channel;
mod sink;

pub use channel::{ChannelConfig, ChannelHandle, StreamEvent};
pub use sink::Sink;

pub(crate) use channel::channel;
pub(crate) use sink::sink;
