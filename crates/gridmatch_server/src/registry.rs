//! The session registry: owner of all active rooms.
//!
//! The registry's maps are the sole source of truth. Every mutating
//! operation takes the registry mutex, applies its full effect, and
//! releases the lock before any persistence call, so a slow statistics
//! sink never blocks move or leave processing for other rooms. State is
//! committed in memory before persistence is attempted; a persistence
//! failure is logged and swallowed.

use gridmatch_rules::{Board, Mark, Outcome};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::coin::{FairCoin, RngCoin};
use crate::error::GameError;
use crate::session::{
    ConnectionId, Game, GameId, GameStatus, Player, Room, RoomId, RoomSnapshot,
};
use crate::stats::{GameOutcome, StatsSink};

/// Length of generated room codes.
const ROOM_CODE_LEN: usize = 6;

/// Internal registry state guarded by the registry mutex.
#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    /// All live rooms by id.
    pub(crate) rooms: HashMap<RoomId, Room>,
    /// One room per connection, enforced.
    pub(crate) room_by_connection: HashMap<ConnectionId, RoomId>,
    /// FIFO matchmaking queue of waiting connections.
    pub(crate) queue: VecDeque<ConnectionId>,
    /// Monotonic game id source.
    next_game_id: GameId,
}

impl RegistryState {
    pub(crate) fn alloc_game_id(&mut self) -> GameId {
        self.next_game_id += 1;
        self.next_game_id
    }

    /// Generates a room code not currently in use.
    fn alloc_room_code(&self) -> RoomId {
        let mut rng = rand::thread_rng();
        loop {
            let code: String = (0..ROOM_CODE_LEN)
                .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_uppercase())
                .collect();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }

    /// Allocates a waiting room around the given creator. The creator
    /// is detached from any previous room first.
    pub(crate) fn open_room(&mut self, creator: Player) -> RoomId {
        self.detach(&creator.connection_id);
        let room_id = self.alloc_room_code();
        let game_id = self.alloc_game_id();
        let connection_id = creator.connection_id.clone();
        let room = Room::new(room_id.clone(), Game::new(game_id, creator));
        self.rooms.insert(room_id.clone(), room);
        self.room_by_connection.insert(connection_id, room_id.clone());
        room_id
    }

    /// Seats `joiner` as the second player of a waiting room and starts
    /// the game. The coin decides which physical player receives
    /// Mark::A; Mark::A always moves first either way.
    ///
    /// Callers must have verified the room is waiting with one player.
    pub(crate) fn seat_second_player(
        &mut self,
        room_id: &str,
        mut joiner: Player,
        coin: &dyn FairCoin,
    ) {
        let room = self
            .rooms
            .get_mut(room_id)
            .expect("seat_second_player called for a known room");
        let incumbent_gets_a = coin.flip();
        let incumbent = &mut room.game.players[0];
        incumbent.mark = if incumbent_gets_a { Mark::A } else { Mark::B };
        incumbent.ready_for_rematch = false;
        joiner.mark = incumbent.mark.opponent();
        joiner.ready_for_rematch = false;

        self.room_by_connection
            .insert(joiner.connection_id.clone(), room_id.to_string());
        room.game.players.push(joiner);
        room.game.turn = Mark::A;
        room.game.status = GameStatus::Active;
        room.game.updated_at = chrono::Utc::now();
    }

    /// Detaches a connection from the matchmaking queue and from
    /// whatever room it occupies, deleting the room if it empties out.
    /// Enforces the one-room-per-connection rule when a connection
    /// enters a new room.
    ///
    /// A started game never continues with a vacated seat: when a
    /// seated player is pulled out of an active or finished game, the
    /// survivor's game restarts as a fresh waiting game.
    pub(crate) fn detach(&mut self, connection_id: &str) -> Option<(RoomId, Option<RoomSnapshot>)> {
        self.queue.retain(|c| c != connection_id);
        let room_id = self.room_by_connection.remove(connection_id)?;
        let (emptied, seat_vacated) = {
            let room = self.rooms.get_mut(&room_id)?;
            let seats = room.game.players.len();
            room.game
                .players
                .retain(|p| p.connection_id != connection_id);
            room.spectators.remove(connection_id);
            room.game.updated_at = chrono::Utc::now();
            (
                room.is_empty(),
                room.game.players.len() < seats && room.game.status != GameStatus::Waiting,
            )
        };
        if emptied {
            self.rooms.remove(&room_id);
            return Some((room_id, None));
        }
        if seat_vacated {
            self.restart_game(&room_id);
        }
        let snapshot = self.rooms.get(&room_id)?.snapshot();
        Some((room_id, Some(snapshot)))
    }

    /// Restarts a room's game as a fresh waiting game under a new id,
    /// keeping whoever remains seated.
    fn restart_game(&mut self, room_id: &str) {
        let game_id = self.alloc_game_id();
        let Some(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        let game = &mut room.game;
        game.game_id = game_id;
        game.board = Board::new();
        game.turn = Mark::A;
        game.status = GameStatus::Waiting;
        game.outcome = None;
        game.updated_at = chrono::Utc::now();
        for player in &mut game.players {
            player.mark = Mark::A;
            player.ready_for_rematch = false;
        }
    }

    /// Whether the given connection still waits alone in a waiting room.
    /// Used by matchmaking to discard stale queue entries.
    pub(crate) fn is_eligible_waiter(&self, connection_id: &str) -> bool {
        self.room_by_connection
            .get(connection_id)
            .and_then(|room_id| self.rooms.get(room_id))
            .map(|room| {
                room.game.status == GameStatus::Waiting && room.game.players.len() == 1
            })
            .unwrap_or(false)
    }

    /// Room id the connection currently occupies.
    pub(crate) fn room_id_for(&self, connection_id: &str) -> Option<&RoomId> {
        self.room_by_connection.get(connection_id)
    }
}

/// Result of a join: the joiner either takes a player seat or lands
/// in the spectator set.
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    /// Joined as a seated player; the game is active once both seats
    /// are filled.
    Seated {
        /// Post-join room snapshot.
        room: RoomSnapshot,
        /// Room the joiner implicitly left, when it survived without
        /// them.
        departed: Option<RoomSnapshot>,
    },
    /// Room already had two players; joined as a passive viewer.
    Spectating {
        /// Post-join room snapshot.
        room: RoomSnapshot,
        /// Room the joiner implicitly left, when it survived without
        /// them.
        departed: Option<RoomSnapshot>,
    },
}

impl JoinOutcome {
    /// The post-join room snapshot, whichever seat was taken.
    pub fn room(&self) -> &RoomSnapshot {
        match self {
            JoinOutcome::Seated { room, .. } | JoinOutcome::Spectating { room, .. } => room,
        }
    }

    /// The room the joiner implicitly left, for departure broadcasts.
    pub fn departed(&self) -> Option<&RoomSnapshot> {
        match self {
            JoinOutcome::Seated { departed, .. } | JoinOutcome::Spectating { departed, .. } => {
                departed.as_ref()
            }
        }
    }
}

/// Result of a successful move.
#[derive(Debug, Clone)]
pub struct MoveResult {
    /// Post-move room snapshot.
    pub room: RoomSnapshot,
    /// Whether this move produced a terminal outcome.
    pub finished: bool,
}

/// Result of a leave, signalled by value because disconnects routinely
/// race with no-op leaves.
#[derive(Debug, Clone)]
pub enum LeaveOutcome {
    /// The connection was removed from its room.
    Left {
        /// Room the connection left.
        room_id: RoomId,
        /// Remaining room state, or `None` if the room emptied out and
        /// was deleted.
        room: Option<RoomSnapshot>,
    },
    /// The connection had no room; nothing to do.
    NotInRoom,
}

/// Owns all active rooms and serializes every state-changing operation.
///
/// Cheap to clone; clones share the same state, sink, and coin.
#[derive(Clone)]
pub struct SessionRegistry {
    state: Arc<Mutex<RegistryState>>,
    sink: Arc<dyn StatsSink>,
    coin: Arc<dyn FairCoin>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry").finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Creates a registry with a real random coin.
    #[instrument(skip(sink))]
    pub fn new(sink: Arc<dyn StatsSink>) -> Self {
        info!("Creating session registry");
        Self::with_coin(sink, Arc::new(RngCoin))
    }

    /// Creates a registry with an injected coin (deterministic tests).
    pub fn with_coin(sink: Arc<dyn StatsSink>, coin: Arc<dyn FairCoin>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
            sink,
            coin,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().expect("registry mutex poisoned")
    }

    pub(crate) fn coin(&self) -> &dyn FairCoin {
        self.coin.as_ref()
    }

    pub(crate) fn sink(&self) -> &Arc<dyn StatsSink> {
        &self.sink
    }

    /// Allocates a new waiting room owned by `creator`.
    ///
    /// Pure allocation, no failure mode.
    #[instrument(skip(self, creator), fields(connection_id = %creator.connection_id))]
    pub fn create_room(&self, creator: Player) -> RoomSnapshot {
        let mut state = self.lock();
        let room_id = state.open_room(creator);
        info!(room_id = %room_id, "Room created");
        state.rooms[&room_id].snapshot()
    }

    /// Joins an existing room, either as a seated player or as a
    /// spectator once two seats are taken.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RoomNotFound`] if the room id is unknown.
    /// A failed join leaves all state untouched, including the
    /// caller's current room membership.
    #[instrument(skip(self, joiner), fields(room_id, connection_id = %joiner.connection_id))]
    pub fn join_room(&self, room_id: &str, mut joiner: Player) -> Result<JoinOutcome, GameError> {
        let mut state = self.lock();

        // Validate the target before touching any state.
        if !state.rooms.contains_key(room_id) {
            debug!(room_id, "Join rejected: room not found");
            return Err(GameError::RoomNotFound {
                room_id: room_id.to_string(),
            });
        }

        // Rejoining the current room is a no-op; the game is untouched.
        if state
            .room_id_for(&joiner.connection_id)
            .map(|r| r.as_str())
            == Some(room_id)
        {
            let room = &state.rooms[room_id];
            let snapshot = room.snapshot();
            let seated = room.game.player(&joiner.connection_id).is_some();
            debug!(room_id, "Rejoin is a no-op");
            return Ok(if seated {
                JoinOutcome::Seated {
                    room: snapshot,
                    departed: None,
                }
            } else {
                JoinOutcome::Spectating {
                    room: snapshot,
                    departed: None,
                }
            });
        }

        let departed = state
            .detach(&joiner.connection_id)
            .and_then(|(_, room)| room);

        let player_count = state.rooms[room_id].game.players.len();
        match player_count {
            0 => {
                // Spectator-kept room: the joiner takes the waiting seat.
                joiner.mark = Mark::A;
                joiner.ready_for_rematch = false;
                let connection_id = joiner.connection_id.clone();
                state
                    .room_by_connection
                    .insert(connection_id, room_id.to_string());
                let room = state
                    .rooms
                    .get_mut(room_id)
                    .expect("room presence checked above");
                room.game.players.push(joiner);
                room.game.updated_at = chrono::Utc::now();
                info!(room_id, "Joined an empty room as the waiting player");
                Ok(JoinOutcome::Seated {
                    room: room.snapshot(),
                    departed,
                })
            }
            1 => {
                state.seat_second_player(room_id, joiner, self.coin.as_ref());
                let snapshot = state.rooms[room_id].snapshot();
                info!(room_id, game_id = snapshot.game.game_id, "Room filled, game active");
                Ok(JoinOutcome::Seated {
                    room: snapshot,
                    departed,
                })
            }
            _ => {
                // Third and later joiners always succeed as spectators.
                let connection_id = joiner.connection_id.clone();
                state
                    .room_by_connection
                    .insert(connection_id.clone(), room_id.to_string());
                let room = state
                    .rooms
                    .get_mut(room_id)
                    .expect("room presence checked above");
                room.spectators.insert(connection_id);
                info!(room_id, "Joined as spectator");
                Ok(JoinOutcome::Spectating {
                    room: room.snapshot(),
                    departed,
                })
            }
        }
    }

    /// Applies a move for the given connection.
    ///
    /// On success the cell is placed, the outcome re-evaluated, and the
    /// turn flipped (or the game finished). The resulting snapshot is
    /// persisted through the statistics sink after the lock is
    /// released; a sink failure is logged and never rolls back or fails
    /// the move.
    ///
    /// # Errors
    ///
    /// In order of evaluation: [`GameError::PlayerNotInRoom`],
    /// [`GameError::GameNotActive`], [`GameError::PlayerNotFound`],
    /// [`GameError::NotYourTurn`], [`GameError::InvalidMove`].
    #[instrument(skip(self))]
    pub async fn make_move(
        &self,
        connection_id: &str,
        row: usize,
        col: usize,
    ) -> Result<MoveResult, GameError> {
        // Commit phase: everything under the lock, no awaits.
        let (result, identities, outcomes) = {
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

            if room.game.status != GameStatus::Active {
                debug!(room_id = %room_id, "Move rejected: game not active");
                return Err(GameError::GameNotActive);
            }

            let mark = room
                .game
                .player(connection_id)
                .map(|p| p.mark)
                .ok_or_else(|| GameError::PlayerNotFound {
                    connection_id: connection_id.to_string(),
                })?;

            if mark != room.game.turn {
                debug!(room_id = %room_id, ?mark, turn = ?room.game.turn, "Move rejected: not this player's turn");
                return Err(GameError::NotYourTurn);
            }

            room.game
                .board
                .place(row, col, mark)
                .map_err(|_| GameError::InvalidMove { row, col })?;
            room.game.updated_at = chrono::Utc::now();

            let outcome = room.game.board.evaluate();
            let mut outcomes = Vec::new();
            match outcome {
                Some(result) => {
                    room.game.status = GameStatus::Finished;
                    room.game.outcome = Some(result);
                    for player in &room.game.players {
                        outcomes.push((player.identity.clone(), stat_for(player.mark, result)));
                    }
                    info!(room_id = %room_id, ?result, "Game finished");
                }
                None => {
                    room.game.turn = mark.opponent();
                }
            }

            let identities = room.game.identities();
            let snapshot = room.snapshot();
            debug!(
                room_id = %room_id,
                row,
                col,
                ?mark,
                finished = outcome.is_some(),
                "Move committed"
            );
            (
                MoveResult {
                    room: snapshot,
                    finished: outcome.is_some(),
                },
                identities,
                outcomes,
            )
        };

        // Persistence phase: lock released, failures swallowed.
        if let Err(e) = self.sink.save_game(&result.room.game, &identities).await {
            warn!(error = %e, game_id = result.room.game.game_id, "Failed to persist game snapshot");
        }
        for (identity, outcome) in outcomes {
            if let Err(e) = self.sink.record_outcome(&identity, outcome).await {
                warn!(error = %e, identity = %identity, "Failed to record outcome");
            }
        }

        Ok(result)
    }

    /// Removes the connection from its room and from the matchmaking
    /// queue. Deletes the room once both the player list and spectator
    /// set are empty.
    #[instrument(skip(self))]
    pub fn leave_room(&self, connection_id: &str) -> LeaveOutcome {
        let mut state = self.lock();
        match state.detach(connection_id) {
            None => {
                debug!(connection_id, "Leave was a no-op: connection has no room");
                LeaveOutcome::NotInRoom
            }
            Some((room_id, None)) => {
                info!(room_id = %room_id, "Room emptied and deleted");
                LeaveOutcome::Left {
                    room_id,
                    room: None,
                }
            }
            Some((room_id, room)) => {
                info!(room_id = %room_id, "Connection left room");
                LeaveOutcome::Left { room_id, room }
            }
        }
    }

    /// Looks up a room by id.
    #[instrument(skip(self))]
    pub fn get_room(&self, room_id: &str) -> Option<RoomSnapshot> {
        self.lock().rooms.get(room_id).map(Room::snapshot)
    }

    /// Looks up the room a connection currently occupies.
    #[instrument(skip(self))]
    pub fn room_for_connection(&self, connection_id: &str) -> Option<RoomSnapshot> {
        let state = self.lock();
        state
            .room_id_for(connection_id)
            .and_then(|room_id| state.rooms.get(room_id))
            .map(Room::snapshot)
    }
}

/// Maps a terminal outcome to one player's statistics entry.
fn stat_for(mark: Mark, outcome: Outcome) -> GameOutcome {
    match outcome {
        Outcome::Draw => GameOutcome::Draw,
        Outcome::Winner(winner) if winner == mark => GameOutcome::Win,
        Outcome::Winner(_) => GameOutcome::Loss,
    }
}
