//! Range domain model
//!
//! Cards, actions, hand buckets and the `Range` aggregate, plus the payload
//! types that validate client input into them.

pub mod card;
pub mod payload;
pub mod range;
pub mod token;

pub use card::{Card, CardSuit, CardValue};
pub use payload::{ActionPayload, HandRangePayload, RangePayload};
pub use range::{Action, ActionType, HandRange, Range, RangeId};
pub use token::ClosedSet;
