//! Statistics sink boundary.
//!
//! The registry persists game snapshots and terminal outcomes through
//! this trait. A statistics-store outage must never prevent gameplay:
//! the registry commits state in memory first and logs sink failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, instrument};

use crate::db::DbError;
use crate::session::{GameSnapshot, Identity};

/// Game outcome from one player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    /// Player won the game.
    Win,
    /// Player lost the game.
    Loss,
    /// Game ended in a draw.
    Draw,
}

impl GameOutcome {
    /// Converts the outcome to the string stored in the database.
    pub fn to_db_string(self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Loss => "loss",
            Self::Draw => "draw",
        }
    }

    /// Parses the outcome from the string stored in the database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the string is not a valid outcome value.
    pub fn from_db_string(s: &str) -> Result<Self, DbError> {
        match s {
            "win" => Ok(Self::Win),
            "loss" => Ok(Self::Loss),
            "draw" => Ok(Self::Draw),
            _ => Err(DbError::new(format!("Invalid outcome: '{}'", s))),
        }
    }
}

/// Durable per-identity profile record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct PlayerRecord {
    /// Durable identity.
    identity: Identity,
    /// Display name last seen for this identity.
    display_name: String,
    /// First-seen time.
    created_at: DateTime<Utc>,
}

/// Aggregated win/loss/draw tallies for one identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct AggregatedStats {
    /// Total finished games.
    total_games: i64,
    /// Games won.
    wins: i64,
    /// Games lost.
    losses: i64,
    /// Games drawn.
    draws: i64,
}

impl AggregatedStats {
    /// Win rate as a percentage (0.0 to 100.0).
    pub fn win_rate(&self) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            (self.wins as f64 / self.total_games as f64) * 100.0
        }
    }

    fn bump(&mut self, outcome: GameOutcome) {
        self.total_games += 1;
        match outcome {
            GameOutcome::Win => self.wins += 1,
            GameOutcome::Loss => self.losses += 1,
            GameOutcome::Draw => self.draws += 1,
        }
    }
}

/// External persistence boundary for game history and statistics.
#[async_trait]
pub trait StatsSink: Send + Sync {
    /// Persists a game snapshot after a successful move.
    async fn save_game(
        &self,
        game: &GameSnapshot,
        identities: &[Identity],
    ) -> Result<(), DbError>;

    /// Records one player's terminal outcome.
    async fn record_outcome(
        &self,
        identity: &Identity,
        outcome: GameOutcome,
    ) -> Result<(), DbError>;

    /// Returns the profile for an identity, creating it on first sight.
    async fn get_or_create_player(
        &self,
        identity: &Identity,
        display_name: &str,
    ) -> Result<PlayerRecord, DbError>;

    /// Returns aggregated tallies for an identity.
    async fn get_stats(&self, identity: &Identity) -> Result<AggregatedStats, DbError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    players: HashMap<Identity, PlayerRecord>,
    stats: HashMap<Identity, AggregatedStats>,
    saved_games: Vec<GameSnapshot>,
}

/// In-memory sink used as the default store and in tests.
///
/// `fail_everything` makes every call return an error, exercising the
/// registry's swallow-and-log path.
#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<MemoryState>,
    fail_everything: AtomicBool,
}

impl MemorySink {
    /// Creates an empty in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles failure injection for every subsequent call.
    pub fn set_failing(&self, failing: bool) {
        self.fail_everything.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DbError> {
        if self.fail_everything.load(Ordering::SeqCst) {
            return Err(DbError::new("memory sink failure injected"));
        }
        Ok(())
    }

    /// Number of game snapshots persisted so far.
    pub fn saved_game_count(&self) -> usize {
        self.state.lock().expect("sink mutex poisoned").saved_games.len()
    }
}

#[async_trait]
impl StatsSink for MemorySink {
    #[instrument(skip(self, game, identities), fields(game_id = game.game_id))]
    async fn save_game(
        &self,
        game: &GameSnapshot,
        identities: &[Identity],
    ) -> Result<(), DbError> {
        self.check()?;
        debug!(players = identities.len(), "Saving game snapshot");
        let mut state = self.state.lock().expect("sink mutex poisoned");
        state.saved_games.push(game.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn record_outcome(
        &self,
        identity: &Identity,
        outcome: GameOutcome,
    ) -> Result<(), DbError> {
        self.check()?;
        let mut state = self.state.lock().expect("sink mutex poisoned");
        state.stats.entry(identity.clone()).or_default().bump(outcome);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_or_create_player(
        &self,
        identity: &Identity,
        display_name: &str,
    ) -> Result<PlayerRecord, DbError> {
        self.check()?;
        let mut state = self.state.lock().expect("sink mutex poisoned");
        let record = state
            .players
            .entry(identity.clone())
            .or_insert_with(|| {
                PlayerRecord::new(identity.clone(), display_name.to_string(), Utc::now())
            })
            .clone();
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn get_stats(&self, identity: &Identity) -> Result<AggregatedStats, DbError> {
        self.check()?;
        let state = self.state.lock().expect("sink mutex poisoned");
        Ok(state.stats.get(identity).copied().unwrap_or_default())
    }
}
