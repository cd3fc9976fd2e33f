//! Wire-level event vocabulary spoken over the gateway.
//!
//! Inbound events carry an authenticated connection identity attached
//! by the gateway; outbound events are broadcast to every participant
//! of the affected room.

use serde::{Deserialize, Serialize};

use crate::session::{ConnectionId, GameSnapshot, Identity, RoomId, RoomSnapshot};
use crate::stats::AggregatedStats;

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Open a new room and wait for an opponent.
    CreateRoom,
    /// Join a specific room by id.
    JoinRoom {
        /// Target room.
        room_id: RoomId,
    },
    /// Enter the matchmaking queue.
    FindMatch,
    /// Place a mark.
    MakeMove {
        /// Target row.
        row: usize,
        /// Target column.
        col: usize,
    },
    /// Ask the opponent for a rematch.
    RequestRematch,
    /// Accept a pending rematch request.
    AcceptRematch,
    /// Decline a pending rematch request.
    DeclineRematch,
    /// Leave the current room. A dropped connection takes the same
    /// path implicitly.
    LeaveRoom,
}

/// Per-player statistics attached to a game-ended event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Durable identity the tallies belong to.
    pub identity: Identity,
    /// Aggregated tallies.
    pub stats: AggregatedStats,
}

/// Events the server broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A room was created for the sender.
    RoomCreated {
        /// The new room's id.
        room_id: RoomId,
    },
    /// Someone entered the room.
    RoomJoined {
        /// Post-join room state.
        room: RoomSnapshot,
    },
    /// Matchmaking paired two players.
    MatchFound {
        /// The now-active room.
        room: RoomSnapshot,
    },
    /// General game state refresh.
    GameUpdated {
        /// Current game state.
        game: GameSnapshot,
    },
    /// A move was applied.
    MoveMade {
        /// Post-move game state.
        game: GameSnapshot,
    },
    /// The game reached a terminal outcome.
    GameEnded {
        /// Final game state.
        game: GameSnapshot,
        /// Updated tallies for both players.
        stats: Vec<PlayerStats>,
    },
    /// One player asked for a rematch.
    RematchRequested {
        /// Connection id of the requester.
        requester: ConnectionId,
    },
    /// Both players agreed; a fresh game started.
    RematchAccepted {
        /// Room with the new active game.
        room: RoomSnapshot,
    },
    /// A player declined the rematch.
    RematchDeclined,
    /// A participant left the room.
    PlayerLeft {
        /// Connection id of the departed participant.
        player_id: ConnectionId,
    },
    /// An operation failed; the message is user-visible.
    Error {
        /// Failure description.
        message: String,
    },
}
