//! SQLite persistence for player profiles, game history, and outcomes.

mod error;
mod models;
mod repository;
mod schema;

pub use error::DbError;
pub use models::{GameRecordRow, NewGameRecordRow, NewOutcomeRow, NewPlayerRow, OutcomeRow, PlayerRow};
pub use repository::{DieselSink, StatsRepository};
