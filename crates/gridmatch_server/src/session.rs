//! Domain records for players, games, and rooms.
//!
//! These are the registry's internal mutable records plus the immutable
//! snapshot types handed to callers for broadcast. External callers only
//! ever see snapshots; the live records never leave the registry.

use chrono::{DateTime, Utc};
use gridmatch_rules::{Board, Mark, Outcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ephemeral handle for one live connection.
pub type ConnectionId = String;

/// Durable identity used for statistics, stable across reconnects and
/// rematches.
pub type Identity = String;

/// Unique identifier for a room.
pub type RoomId = String;

/// Unique identifier for one game within a room.
pub type GameId = u64;

/// A connected participant playing in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Live connection handle.
    pub connection_id: ConnectionId,
    /// Durable identity for statistics.
    pub identity: Identity,
    /// Display name shown to the opponent.
    pub display_name: String,
    /// Mark held in the current game. Meaningful once the room fills;
    /// a lone waiter provisionally holds Mark::A.
    pub mark: Mark,
    /// Whether this player has asked for a rematch of a finished game.
    pub ready_for_rematch: bool,
}

impl Player {
    /// Creates a player record for a fresh connection.
    pub fn new(
        connection_id: impl Into<ConnectionId>,
        identity: impl Into<Identity>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            identity: identity.into(),
            display_name: display_name.into(),
            mark: Mark::A,
            ready_for_rematch: false,
        }
    }
}

/// Lifecycle status of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// One player, awaiting an opponent.
    Waiting,
    /// Two players, moves being exchanged.
    Active,
    /// Terminal outcome reached.
    Finished,
}

/// One played-out match from empty board to terminal outcome.
#[derive(Debug, Clone)]
pub struct Game {
    /// Identifier, replaced on rematch.
    pub game_id: GameId,
    /// One player while waiting, two once active.
    pub players: Vec<Player>,
    /// The board.
    pub board: Board,
    /// Mark that owns the current turn.
    pub turn: Mark,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Terminal outcome, set only when finished.
    pub outcome: Option<Outcome>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Game {
    /// Creates a waiting game holding a single player.
    pub fn new(game_id: GameId, creator: Player) -> Self {
        let now = Utc::now();
        Self {
            game_id,
            players: vec![creator],
            board: Board::new(),
            turn: Mark::A,
            status: GameStatus::Waiting,
            outcome: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Finds a player by connection id.
    pub fn player(&self, connection_id: &str) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.connection_id == connection_id)
    }

    /// Finds a player mutably by connection id.
    pub fn player_mut(&mut self, connection_id: &str) -> Option<&mut Player> {
        self.players
            .iter_mut()
            .find(|p| p.connection_id == connection_id)
    }

    /// Durable identities of the seated players.
    pub fn identities(&self) -> Vec<Identity> {
        self.players.iter().map(|p| p.identity.clone()).collect()
    }
}

/// The persistent container for one game plus its spectators.
///
/// A rematch replaces the game in place (new game id) but the room
/// identity and spectator set survive.
#[derive(Debug, Clone)]
pub struct Room {
    /// Room identifier.
    pub room_id: RoomId,
    /// The current game.
    pub game: Game,
    /// Passive viewers, by connection id.
    pub spectators: BTreeSet<ConnectionId>,
}

impl Room {
    /// Creates a room around a freshly created waiting game.
    pub fn new(room_id: RoomId, game: Game) -> Self {
        Self {
            room_id,
            game,
            spectators: BTreeSet::new(),
        }
    }

    /// Whether the room holds no players and no spectators.
    pub fn is_empty(&self) -> bool {
        self.game.players.is_empty() && self.spectators.is_empty()
    }

    /// Connection ids of everyone who should receive broadcasts for
    /// this room: seated players plus spectators.
    pub fn participants(&self) -> Vec<ConnectionId> {
        self.game
            .players
            .iter()
            .map(|p| p.connection_id.clone())
            .chain(self.spectators.iter().cloned())
            .collect()
    }

    /// Takes an immutable snapshot for broadcast.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id.clone(),
            game: self.game.snapshot(),
            spectators: self.spectators.iter().cloned().collect(),
        }
    }
}

/// Immutable copy of a player for broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Connection handle.
    pub connection_id: ConnectionId,
    /// Durable identity.
    pub identity: Identity,
    /// Display name.
    pub display_name: String,
    /// Assigned mark.
    pub mark: Mark,
    /// Rematch readiness flag.
    pub ready_for_rematch: bool,
}

/// Immutable copy of a game for broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Game identifier.
    pub game_id: GameId,
    /// Seated players.
    pub players: Vec<PlayerSnapshot>,
    /// Board contents.
    pub board: Board,
    /// Mark owning the current turn.
    pub turn: Mark,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Terminal outcome, if finished.
    pub outcome: Option<Outcome>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

/// Immutable copy of a room for broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// Room identifier.
    pub room_id: RoomId,
    /// Current game.
    pub game: GameSnapshot,
    /// Spectating connections.
    pub spectators: Vec<ConnectionId>,
}

impl RoomSnapshot {
    /// Connection ids of players plus spectators.
    pub fn participants(&self) -> Vec<ConnectionId> {
        self.game
            .players
            .iter()
            .map(|p| p.connection_id.clone())
            .chain(self.spectators.iter().cloned())
            .collect()
    }
}

impl Game {
    /// Takes an immutable snapshot for broadcast.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            game_id: self.game_id,
            players: self
                .players
                .iter()
                .map(|p| PlayerSnapshot {
                    connection_id: p.connection_id.clone(),
                    identity: p.identity.clone(),
                    display_name: p.display_name.clone(),
                    mark: p.mark,
                    ready_for_rematch: p.ready_for_rematch,
                })
                .collect(),
            board: self.board.clone(),
            turn: self.turn,
            status: self.status,
            outcome: self.outcome,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
