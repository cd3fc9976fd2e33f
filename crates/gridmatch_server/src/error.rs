//! Failure taxonomy for session operations.

use derive_more::{Display, Error};

use crate::session::{ConnectionId, RoomId};

/// Recoverable failures returned by registry, matchmaking, and rematch
/// operations.
///
/// Every variant is recoverable by the caller: the core never
/// terminates on these, and the gateway translates them into
/// user-visible `error` events.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GameError {
    /// No room exists with the given id.
    #[display("room not found: {room_id}")]
    RoomNotFound {
        /// The unknown room id.
        room_id: RoomId,
    },

    /// The connection is not registered in any room.
    #[display("connection {connection_id} is not in a room")]
    PlayerNotInRoom {
        /// The unregistered connection.
        connection_id: ConnectionId,
    },

    /// The connection is in the room but is not one of the two players
    /// (spectators cannot move or request rematches).
    #[display("connection {connection_id} is not a player in this game")]
    PlayerNotFound {
        /// The spectating or unknown connection.
        connection_id: ConnectionId,
    },

    /// The game has not started or has already finished.
    #[display("game is not active")]
    GameNotActive,

    /// A rematch was requested before the game reached a terminal state.
    #[display("game is not finished")]
    GameNotFinished,

    /// The mark held by this player does not own the current turn.
    #[display("not your turn")]
    NotYourTurn,

    /// Move coordinates are out of range or the cell is occupied.
    #[display("invalid move at row {row}, col {col}")]
    InvalidMove {
        /// Attempted row.
        row: usize,
        /// Attempted column.
        col: usize,
    },
}
