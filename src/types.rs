//! Core value types shared by every publisher and subscriber.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Failure type of publishers that cannot fail.
pub type Never = std::convert::Infallible;

/// How many more values a subscriber is willing to accept.
///
/// Demand accumulates additively across requests and is consumed one unit
/// per delivered value. `Unlimited` absorbs every addition and is never
/// consumed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Demand {
    Unlimited,
    Max(usize),
}

impl Demand {
    /// No additional demand.
    pub const NONE: Demand = Demand::Max(0);

    /// Shorthand for `Demand::Max(n)`.
    pub fn max(n: usize) -> Self {
        Demand::Max(n)
    }

    pub fn is_none(self) -> bool {
        self == Demand::NONE
    }

    pub fn is_unlimited(self) -> bool {
        matches!(self, Demand::Unlimited)
    }

    /// Take one unit of demand. Returns false if none was available.
    pub fn consume_one(&mut self) -> bool {
        match self {
            Demand::Unlimited => true,
            Demand::Max(0) => false,
            Demand::Max(n) => {
                *n -= 1;
                true
            }
        }
    }

    /// Finite count, `None` for unlimited.
    pub fn as_count(self) -> Option<usize> {
        match self {
            Demand::Unlimited => None,
            Demand::Max(n) => Some(n),
        }
    }
}

impl Default for Demand {
    fn default() -> Self {
        Demand::NONE
    }
}

impl Add for Demand {
    type Output = Demand;

    fn add(self, rhs: Demand) -> Demand {
        match (self, rhs) {
            (Demand::Max(a), Demand::Max(b)) => match a.checked_add(b) {
                Some(n) => Demand::Max(n),
                None => Demand::Unlimited,
            },
            _ => Demand::Unlimited,
        }
    }
}

impl AddAssign for Demand {
    fn add_assign(&mut self, rhs: Demand) {
        *self = *self + rhs;
    }
}

impl fmt::Debug for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Demand::Unlimited => write!(f, "Demand(unlimited)"),
            Demand::Max(n) => write!(f, "Demand({})", n),
        }
    }
}

/// Terminal signal of a stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion<E> {
    Finished,
    Failed(E),
}

impl<E> Completion<E> {
    pub fn is_finished(&self) -> bool {
        matches!(self, Completion::Finished)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Completion::Failed(_))
    }

    /// Failure payload, if any.
    pub fn failure(&self) -> Option<&E> {
        match self {
            Completion::Finished => None,
            Completion::Failed(e) => Some(e),
        }
    }

    /// Convert the failure payload.
    pub fn map_failure<F, G>(self, f: G) -> Completion<F>
    where
        G: FnOnce(E) -> F,
    {
        match self {
            Completion::Finished => Completion::Finished,
            Completion::Failed(e) => Completion::Failed(f(e)),
        }
    }
}

impl<E> From<Result<(), E>> for Completion<E> {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Completion::Finished,
            Err(e) => Completion::Failed(e),
        }
    }
}
