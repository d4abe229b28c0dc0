//! Bridges from callback-style work into publishers.
//!
//! A [`Future`] starts its worker once, at construction, and shares the
//! single outcome with every subscriber. A [`Deferred`] builds a fresh
//! publisher per subscription, so wrapping a future factory in it gives
//! each subscriber its own run of the work.

mod deferred;
mod future;

pub use deferred::Deferred;
pub use future::{Future, Promise};
