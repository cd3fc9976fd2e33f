//! Symmetric rematch handshake on top of a finished game.
//!
//! Per room the handshake moves from no flags set, through one player
//! ready, to both ready, at which point the game is reset in place. The
//! room identity and spectator set survive; only the game is replaced.

use gridmatch_rules::{Board, Mark};
use tracing::{debug, info, instrument};

use crate::error::GameError;
use crate::registry::SessionRegistry;
use crate::session::{GameStatus, PlayerSnapshot, RoomSnapshot};

/// Result of a rematch request.
#[derive(Debug, Clone)]
pub enum RematchOutcome {
    /// Only the requester is ready; the opponent must be solicited
    /// out-of-band.
    Pending {
        /// Post-request room snapshot.
        room: RoomSnapshot,
        /// The player whose flag was just set.
        requester: PlayerSnapshot,
    },
    /// Both players were ready; a fresh game has started.
    Started(RoomSnapshot),
}

impl SessionRegistry {
    /// Flags the requester as ready for a rematch of a finished game.
    /// When the opponent is already ready, the reset happens
    /// immediately: marks swapped between the two players, Mark::A to
    /// move, empty board, new game id, both flags cleared.
    ///
    /// Accepting a rematch is the same operation issued by the second
    /// party.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PlayerNotInRoom`] for a connection without
    /// a room, [`GameError::PlayerNotFound`] for spectators, and
    /// [`GameError::GameNotFinished`] unless the game reached a
    /// terminal outcome.
    #[instrument(skip(self))]
    pub fn request_rematch(&self, connection_id: &str) -> Result<RematchOutcome, GameError> {
        let mut state = self.lock();

        let room_id = state
            .room_id_for(connection_id)
            .cloned()
            .ok_or_else(|| GameError::PlayerNotInRoom {
                connection_id: connection_id.to_string(),
            })?;
        let room = state
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| GameError::PlayerNotInRoom {
                connection_id: connection_id.to_string(),
            })?;

        if room.game.player(connection_id).is_none() {
            return Err(GameError::PlayerNotFound {
                connection_id: connection_id.to_string(),
            });
        }
        if room.game.status != GameStatus::Finished {
            debug!(room_id = %room_id, status = ?room.game.status, "Rematch rejected: game not finished");
            return Err(GameError::GameNotFinished);
        }

        let requester = room
            .game
            .player_mut(connection_id)
            .expect("player presence checked above");
        requester.ready_for_rematch = true;
        let requester_snapshot = PlayerSnapshot {
            connection_id: requester.connection_id.clone(),
            identity: requester.identity.clone(),
            display_name: requester.display_name.clone(),
            mark: requester.mark,
            ready_for_rematch: true,
        };

        let both_ready =
            room.game.players.len() == 2 && room.game.players.iter().all(|p| p.ready_for_rematch);
        if !both_ready {
            info!(room_id = %room_id, "Rematch pending, waiting for opponent");
            return Ok(RematchOutcome::Pending {
                room: room.snapshot(),
                requester: requester_snapshot,
            });
        }

        // Both flags set: reset the game in place under a fresh id.
        // Marks are swapped so turn-order fairness is not fixed to one
        // physical player; Mark::A still moves first.
        let new_game_id = state.alloc_game_id();
        let room = state
            .rooms
            .get_mut(&room_id)
            .expect("room still present during rematch reset");
        let game = &mut room.game;
        for player in &mut game.players {
            player.mark = player.mark.opponent();
            player.ready_for_rematch = false;
        }
        game.game_id = new_game_id;
        game.board = Board::new();
        game.turn = Mark::A;
        game.status = GameStatus::Active;
        game.outcome = None;
        let now = chrono::Utc::now();
        game.created_at = now;
        game.updated_at = now;

        info!(room_id = %room_id, game_id = new_game_id, "Rematch accepted, new game started");
        Ok(RematchOutcome::Started(room.snapshot()))
    }

    /// Declines a pending rematch request. Clears both players' ready
    /// flags so a stale flag cannot auto-trigger the next handshake.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PlayerNotInRoom`] for a connection without
    /// a room and [`GameError::PlayerNotFound`] for spectators.
    #[instrument(skip(self))]
    pub fn decline_rematch(&self, connection_id: &str) -> Result<RoomSnapshot, GameError> {
        let mut state = self.lock();

        let room_id = state
            .room_id_for(connection_id)
            .cloned()
            .ok_or_else(|| GameError::PlayerNotInRoom {
                connection_id: connection_id.to_string(),
            })?;
        let room = state
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| GameError::PlayerNotInRoom {
                connection_id: connection_id.to_string(),
            })?;

        if room.game.player(connection_id).is_none() {
            return Err(GameError::PlayerNotFound {
                connection_id: connection_id.to_string(),
            });
        }

        for player in &mut room.game.players {
            player.ready_for_rematch = false;
        }
        info!(room_id = %room_id, "Rematch declined, ready flags cleared");
        Ok(room.snapshot())
    }
}
