//! Database row models.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;

use crate::db::schema;

/// Player profile row.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::players)]
pub struct PlayerRow {
    id: i32,
    identity: String,
    display_name: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Insertable player profile.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::players)]
pub struct NewPlayerRow {
    identity: String,
    display_name: String,
}

/// Saved game snapshot row. One row per successful move; the latest row
/// for a game id is its most recent state.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::game_records)]
pub struct GameRecordRow {
    id: i32,
    game_id: i64,
    identities: String,
    board: String,
    status: String,
    outcome: Option<String>,
    saved_at: NaiveDateTime,
}

/// Insertable game snapshot.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::game_records)]
pub struct NewGameRecordRow {
    game_id: i64,
    identities: String,
    board: String,
    status: String,
    outcome: Option<String>,
}

/// Terminal outcome row for one player.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::outcome_records)]
#[diesel(belongs_to(PlayerRow, foreign_key = player_id))]
pub struct OutcomeRow {
    id: i32,
    player_id: i32,
    outcome: String,
    recorded_at: NaiveDateTime,
}

/// Insertable outcome row.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::outcome_records)]
pub struct NewOutcomeRow {
    player_id: i32,
    outcome: String,
}
