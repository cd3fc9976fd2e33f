//! SQLite-backed statistics repository and its sink adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::db::models::{
    NewGameRecordRow, NewOutcomeRow, NewPlayerRow, OutcomeRow, PlayerRow,
};
use crate::db::{DbError, schema};
use crate::session::{GameSnapshot, GameStatus, Identity};
use crate::stats::{AggregatedStats, GameOutcome, PlayerRecord, StatsSink};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// SQLite repository for player profiles, game history, and outcomes.
///
/// Use `":memory:"` for an in-memory database in tests. Connections are
/// established per call; SQLite serializes writers internally.
#[derive(Debug, Clone)]
pub struct StatsRepository {
    db_path: String,
}

impl StatsRepository {
    /// Creates a repository and runs pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or a
    /// migration fails.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        info!(path = %db_path, "Opening statistics database");
        let repo = Self { db_path };
        let mut conn = repo.connection()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migration failed: {}", e)))?;
        Ok(repo)
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }

    /// Returns the profile row for an identity, creating it on first
    /// sight.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on database errors.
    #[instrument(skip(self))]
    pub fn get_or_create_player(
        &self,
        identity: &str,
        display_name: &str,
    ) -> Result<PlayerRow, DbError> {
        let mut conn = self.connection()?;

        let existing = schema::players::table
            .filter(schema::players::identity.eq(identity))
            .first::<PlayerRow>(&mut conn)
            .optional()?;

        if let Some(row) = existing {
            debug!(player_id = row.id(), "Existing player found");
            return Ok(row);
        }

        let row = diesel::insert_into(schema::players::table)
            .values(&NewPlayerRow::new(
                identity.to_string(),
                display_name.to_string(),
            ))
            .returning(PlayerRow::as_returning())
            .get_result(&mut conn)?;

        info!(player_id = row.id(), identity = %identity, "Player profile created");
        Ok(row)
    }

    /// Persists a game snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on serialization or database errors.
    #[instrument(skip(self, game), fields(game_id = game.game_id))]
    pub fn save_game(&self, game: &GameSnapshot, identities: &[Identity]) -> Result<(), DbError> {
        let mut conn = self.connection()?;

        let board = serde_json::to_string(&game.board)
            .map_err(|e| DbError::new(format!("Board serialization failed: {}", e)))?;
        let identities = serde_json::to_string(identities)
            .map_err(|e| DbError::new(format!("Identity serialization failed: {}", e)))?;
        let status = match game.status {
            GameStatus::Waiting => "waiting",
            GameStatus::Active => "active",
            GameStatus::Finished => "finished",
        };
        let outcome = game
            .outcome
            .map(|o| serde_json::to_string(&o))
            .transpose()
            .map_err(|e| DbError::new(format!("Outcome serialization failed: {}", e)))?;

        diesel::insert_into(schema::game_records::table)
            .values(&NewGameRecordRow::new(
                game.game_id as i64,
                identities,
                board,
                status.to_string(),
                outcome,
            ))
            .execute(&mut conn)?;

        debug!("Game snapshot saved");
        Ok(())
    }

    /// Records one player's terminal outcome, creating the profile row
    /// if it has never been seen.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on database errors.
    #[instrument(skip(self))]
    pub fn record_outcome(&self, identity: &str, outcome: GameOutcome) -> Result<(), DbError> {
        let player = self.get_or_create_player(identity, identity)?;
        let mut conn = self.connection()?;

        diesel::insert_into(schema::outcome_records::table)
            .values(&NewOutcomeRow::new(
                *player.id(),
                outcome.to_db_string().to_string(),
            ))
            .execute(&mut conn)?;

        info!(player_id = player.id(), outcome = outcome.to_db_string(), "Outcome recorded");
        Ok(())
    }

    /// Aggregates win/loss/draw tallies for an identity. An unknown
    /// identity yields all-zero tallies.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on database errors.
    #[instrument(skip(self))]
    pub fn get_stats(&self, identity: &str) -> Result<AggregatedStats, DbError> {
        let mut conn = self.connection()?;

        let player = schema::players::table
            .filter(schema::players::identity.eq(identity))
            .first::<PlayerRow>(&mut conn)
            .optional()?;
        let Some(player) = player else {
            return Ok(AggregatedStats::default());
        };

        let rows = OutcomeRow::belonging_to(&player).load::<OutcomeRow>(&mut conn)?;

        let mut wins = 0;
        let mut losses = 0;
        let mut draws = 0;
        for row in &rows {
            match GameOutcome::from_db_string(row.outcome())? {
                GameOutcome::Win => wins += 1,
                GameOutcome::Loss => losses += 1,
                GameOutcome::Draw => draws += 1,
            }
        }

        Ok(AggregatedStats::new(
            rows.len() as i64,
            wins,
            losses,
            draws,
        ))
    }
}

/// [`StatsSink`] adapter running the blocking repository on the tokio
/// blocking pool.
#[derive(Debug, Clone)]
pub struct DieselSink {
    repo: StatsRepository,
}

impl DieselSink {
    /// Wraps a repository for use behind the sink boundary.
    pub fn new(repo: StatsRepository) -> Self {
        Self { repo }
    }

    /// Convenience constructor opening the database at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened.
    pub fn open(db_path: String) -> Result<Arc<Self>, DbError> {
        Ok(Arc::new(Self::new(StatsRepository::new(db_path)?)))
    }

    async fn run<T, F>(&self, job: F) -> Result<T, DbError>
    where
        T: Send + 'static,
        F: FnOnce(StatsRepository) -> Result<T, DbError> + Send + 'static,
    {
        let repo = self.repo.clone();
        tokio::task::spawn_blocking(move || job(repo))
            .await
            .map_err(|e| {
                warn!(error = %e, "Blocking persistence task failed");
                DbError::new(format!("Persistence task join error: {}", e))
            })?
    }
}

#[async_trait]
impl StatsSink for DieselSink {
    async fn save_game(
        &self,
        game: &GameSnapshot,
        identities: &[Identity],
    ) -> Result<(), DbError> {
        let game = game.clone();
        let identities = identities.to_vec();
        self.run(move |repo| repo.save_game(&game, &identities)).await
    }

    async fn record_outcome(
        &self,
        identity: &Identity,
        outcome: GameOutcome,
    ) -> Result<(), DbError> {
        let identity = identity.clone();
        self.run(move |repo| repo.record_outcome(&identity, outcome))
            .await
    }

    async fn get_or_create_player(
        &self,
        identity: &Identity,
        display_name: &str,
    ) -> Result<PlayerRecord, DbError> {
        let identity = identity.clone();
        let display_name = display_name.to_string();
        let row = self
            .run(move |repo| repo.get_or_create_player(&identity, &display_name))
            .await?;
        Ok(PlayerRecord::new(
            row.identity().clone(),
            row.display_name().clone(),
            DateTime::<Utc>::from_naive_utc_and_offset(*row.created_at(), Utc),
        ))
    }

    async fn get_stats(&self, identity: &Identity) -> Result<AggregatedStats, DbError> {
        let identity = identity.clone();
        self.run(move |repo| repo.get_stats(&identity)).await
    }
}
