//! FIFO matchmaking over the session registry.
//!
//! The queue holds connection ids of players waiting alone in a waiting
//! room. Eligibility is validated before an entry is taken: waiters
//! whose room has since been filled by a direct join, or who left
//! entirely, are discarded during the scan, so a caller is never
//! matched against a dead entry and never silently dropped.

use tracing::{debug, info, instrument};

use crate::registry::SessionRegistry;
use crate::session::{Player, RoomSnapshot};

/// Result of a matchmaking attempt.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    /// Paired with the first eligible waiter; the game is now active.
    Matched {
        /// The now-active room.
        room: RoomSnapshot,
        /// Room the seeker implicitly left, when it survived without
        /// them.
        departed: Option<RoomSnapshot>,
    },
    /// No eligible waiter; the caller owns a fresh waiting room and
    /// occupies the back of the queue.
    Queued {
        /// The fresh waiting room.
        room: RoomSnapshot,
        /// Room the seeker implicitly left, when it survived without
        /// them.
        departed: Option<RoomSnapshot>,
    },
}

impl MatchOutcome {
    /// The room snapshot, matched or queued.
    pub fn room(&self) -> &RoomSnapshot {
        match self {
            MatchOutcome::Matched { room, .. } | MatchOutcome::Queued { room, .. } => room,
        }
    }

    /// The room the seeker implicitly left, for departure broadcasts.
    pub fn departed(&self) -> Option<&RoomSnapshot> {
        match self {
            MatchOutcome::Matched { departed, .. } | MatchOutcome::Queued { departed, .. } => {
                departed.as_ref()
            }
        }
    }

    /// Whether an opponent was found.
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchOutcome::Matched { .. })
    }
}

impl SessionRegistry {
    /// Pairs the caller with the first eligible waiter, or enqueues the
    /// caller with a fresh waiting room when none exists.
    ///
    /// Strict FIFO: the longest-waiting eligible player is matched
    /// first. Re-entrant calls first drop the caller's own stale queue
    /// entry, so a connection never occupies two queue slots.
    #[instrument(skip(self, seeker), fields(connection_id = %seeker.connection_id))]
    pub fn find_match(&self, seeker: Player) -> MatchOutcome {
        let mut state = self.lock();

        let connection_id = seeker.connection_id.clone();
        // Detaching also drops the caller's own stale queue entry.
        let departed = state
            .detach(&connection_id)
            .and_then(|(_, room)| room);

        // Scan from the head, discarding entries whose room is no
        // longer a single-player waiting room.
        while let Some(waiter) = state.queue.pop_front() {
            if !state.is_eligible_waiter(&waiter) {
                debug!(waiter = %waiter, "Discarding stale queue entry");
                continue;
            }
            let room_id = state
                .room_id_for(&waiter)
                .cloned()
                .expect("eligible waiter has a room");
            state.seat_second_player(&room_id, seeker, self.coin());
            let snapshot = state.rooms[&room_id].snapshot();
            info!(room_id = %room_id, waiter = %waiter, "Match found");
            return MatchOutcome::Matched {
                room: snapshot,
                departed,
            };
        }

        // Queue exhausted: the caller becomes the waiter.
        let room_id = state.open_room(seeker);
        state.queue.push_back(connection_id);
        let snapshot = state.rooms[&room_id].snapshot();
        info!(room_id = %room_id, "No opponent waiting, queued");
        MatchOutcome::Queued {
            room: snapshot,
            departed,
        }
    }

    /// Number of connections currently waiting for a match.
    #[instrument(skip(self))]
    pub fn queue_len(&self) -> usize {
        self.lock().queue.len()
    }
}
