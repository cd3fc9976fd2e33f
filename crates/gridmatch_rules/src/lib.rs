//! Pure board rules for 3x3 tic-tac-toe.
//!
//! This crate knows nothing about sessions, rooms, or player identities.
//! It provides the board representation, move legality checks, and
//! win/draw evaluation used by the session layer.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod rules;
mod types;

pub use types::{Board, Cell, Mark, Outcome, PlaceError, SIZE};
