//! Tests for the session registry: capacity, turn order, outcome
//! recording, and room lifecycle.

use gridmatch_rules::{Cell, Mark, Outcome};
use gridmatch_server::{
    FixedCoin, GameError, GameStatus, JoinOutcome, LeaveOutcome, MemorySink, Player,
    SessionRegistry, StatsSink,
};
use std::sync::Arc;

/// Registry with a pinned coin: the incumbent always receives Mark::A.
fn registry(sink: Arc<MemorySink>) -> SessionRegistry {
    SessionRegistry::with_coin(sink, Arc::new(FixedCoin(true)))
}

fn player(n: &str) -> Player {
    Player::new(format!("conn-{n}"), format!("id-{n}"), n)
}

#[tokio::test]
async fn create_then_join_activates_game() {
    let reg = registry(Arc::new(MemorySink::new()));

    let room = reg.create_room(player("1"));
    assert_eq!(room.game.status, GameStatus::Waiting);
    assert_eq!(room.game.players.len(), 1);

    let outcome = reg.join_room(&room.room_id, player("2")).expect("join");
    let JoinOutcome::Seated { room, .. } = outcome else {
        panic!("second joiner must take a seat");
    };
    assert_eq!(room.game.status, GameStatus::Active);
    assert_eq!(room.game.players.len(), 2);
    assert_eq!(room.game.turn, Mark::A);

    // Pinned coin: creator holds Mark::A, joiner holds Mark::B.
    assert_eq!(room.game.players[0].mark, Mark::A);
    assert_eq!(room.game.players[1].mark, Mark::B);
}

#[tokio::test]
async fn third_joiner_becomes_spectator() {
    let reg = registry(Arc::new(MemorySink::new()));
    let room = reg.create_room(player("1"));
    reg.join_room(&room.room_id, player("2")).expect("join");

    let outcome = reg.join_room(&room.room_id, player("3")).expect("join");
    let JoinOutcome::Spectating { room, .. } = outcome else {
        panic!("third joiner must spectate");
    };
    assert_eq!(room.game.players.len(), 2);
    assert!(room.spectators.contains(&"conn-3".to_string()));

    // A fourth joiner also lands in the spectator set.
    let outcome = reg.join_room(&room.room_id, player("4")).expect("join");
    assert!(matches!(outcome, JoinOutcome::Spectating { .. }));
}

#[test]
fn join_unknown_room_fails() {
    let reg = registry(Arc::new(MemorySink::new()));
    let err = reg.join_room("NOSUCH", player("1")).unwrap_err();
    assert_eq!(
        err,
        GameError::RoomNotFound {
            room_id: "NOSUCH".to_string()
        }
    );
}

#[tokio::test]
async fn move_failure_taxonomy() {
    let reg = registry(Arc::new(MemorySink::new()));

    // No room at all.
    let err = reg.make_move("conn-9", 0, 0).await.unwrap_err();
    assert!(matches!(err, GameError::PlayerNotInRoom { .. }));

    // Waiting room: game not active yet.
    let room = reg.create_room(player("1"));
    let err = reg.make_move("conn-1", 0, 0).await.unwrap_err();
    assert_eq!(err, GameError::GameNotActive);

    reg.join_room(&room.room_id, player("2")).expect("join");
    reg.join_room(&room.room_id, player("3")).expect("spectate");

    // Spectators are in the room but not players.
    let err = reg.make_move("conn-3", 0, 0).await.unwrap_err();
    assert!(matches!(err, GameError::PlayerNotFound { .. }));

    // Mark::B does not own the first turn.
    let err = reg.make_move("conn-2", 0, 0).await.unwrap_err();
    assert_eq!(err, GameError::NotYourTurn);

    // Out of range.
    let err = reg.make_move("conn-1", 3, 0).await.unwrap_err();
    assert_eq!(err, GameError::InvalidMove { row: 3, col: 0 });

    // Occupied cell, and the failed move leaves turn and board alone.
    reg.make_move("conn-1", 1, 1).await.expect("legal move");
    let err = reg.make_move("conn-2", 1, 1).await.unwrap_err();
    assert_eq!(err, GameError::InvalidMove { row: 1, col: 1 });
    let room = reg.get_room(&room.room_id).expect("room");
    assert_eq!(room.game.turn, Mark::B);
}

#[tokio::test]
async fn turn_alternates_until_terminal_move() {
    let reg = registry(Arc::new(MemorySink::new()));
    let room = reg.create_room(player("1"));
    reg.join_room(&room.room_id, player("2")).expect("join");

    let result = reg.make_move("conn-1", 0, 0).await.expect("move");
    assert_eq!(result.room.game.turn, Mark::B);
    let result = reg.make_move("conn-2", 1, 0).await.expect("move");
    assert_eq!(result.room.game.turn, Mark::A);
}

#[tokio::test]
async fn win_scenario_records_outcomes() {
    let sink = Arc::new(MemorySink::new());
    let reg = registry(sink.clone());
    let room = reg.create_room(player("1"));
    reg.join_room(&room.room_id, player("2")).expect("join");

    // A takes the top row while B fills the middle row.
    reg.make_move("conn-1", 0, 0).await.expect("move");
    reg.make_move("conn-2", 1, 0).await.expect("move");
    reg.make_move("conn-1", 0, 1).await.expect("move");
    reg.make_move("conn-2", 1, 1).await.expect("move");
    let result = reg.make_move("conn-1", 0, 2).await.expect("move");

    assert!(result.finished);
    assert_eq!(result.room.game.status, GameStatus::Finished);
    assert_eq!(result.room.game.outcome, Some(Outcome::Winner(Mark::A)));
    // The turn owner never changes after a terminal move.
    assert_eq!(result.room.game.turn, Mark::A);

    // Every successful move persisted a snapshot.
    assert_eq!(sink.saved_game_count(), 5);

    let winner = sink.get_stats(&"id-1".to_string()).await.expect("stats");
    assert_eq!(*winner.wins(), 1);
    assert_eq!(*winner.total_games(), 1);
    let loser = sink.get_stats(&"id-2".to_string()).await.expect("stats");
    assert_eq!(*loser.losses(), 1);
}

#[tokio::test]
async fn draw_scenario_records_draws() {
    let sink = Arc::new(MemorySink::new());
    let reg = registry(sink.clone());
    let room = reg.create_room(player("1"));
    reg.join_room(&room.room_id, player("2")).expect("join");

    // X(0,0) O(1,1) X(0,1) O(0,2) X(1,0) O(1,2) X(2,1) O(2,0) X(2,2)
    let moves = [
        ("conn-1", 0, 0),
        ("conn-2", 1, 1),
        ("conn-1", 0, 1),
        ("conn-2", 0, 2),
        ("conn-1", 1, 0),
        ("conn-2", 1, 2),
        ("conn-1", 2, 1),
        ("conn-2", 2, 0),
        ("conn-1", 2, 2),
    ];
    let mut last = None;
    for (conn, row, col) in moves {
        last = Some(reg.make_move(conn, row, col).await.expect("move"));
    }
    let result = last.expect("at least one move");
    assert!(result.finished);
    assert_eq!(result.room.game.outcome, Some(Outcome::Draw));

    for identity in ["id-1", "id-2"] {
        let stats = sink.get_stats(&identity.to_string()).await.expect("stats");
        assert_eq!(*stats.draws(), 1);
        assert_eq!(*stats.wins(), 0);
    }
}

#[tokio::test]
async fn moves_after_finish_are_rejected() {
    let reg = registry(Arc::new(MemorySink::new()));
    let room = reg.create_room(player("1"));
    reg.join_room(&room.room_id, player("2")).expect("join");

    reg.make_move("conn-1", 0, 0).await.expect("move");
    reg.make_move("conn-2", 1, 0).await.expect("move");
    reg.make_move("conn-1", 0, 1).await.expect("move");
    reg.make_move("conn-2", 1, 1).await.expect("move");
    reg.make_move("conn-1", 0, 2).await.expect("move");

    let err = reg.make_move("conn-2", 2, 2).await.unwrap_err();
    assert_eq!(err, GameError::GameNotActive);
}

#[tokio::test]
async fn persistence_failure_never_fails_the_move() {
    let sink = Arc::new(MemorySink::new());
    let reg = registry(sink.clone());
    let room = reg.create_room(player("1"));
    reg.join_room(&room.room_id, player("2")).expect("join");

    sink.set_failing(true);
    let result = reg.make_move("conn-1", 0, 0).await.expect("move succeeds");
    assert_eq!(result.room.game.turn, Mark::B);
    assert_eq!(sink.saved_game_count(), 0);

    // The sink recovering does not require any registry intervention.
    sink.set_failing(false);
    reg.make_move("conn-2", 1, 1).await.expect("move succeeds");
    assert_eq!(sink.saved_game_count(), 1);
}

#[tokio::test]
async fn leave_is_idempotent_and_deletes_empty_rooms() {
    let reg = registry(Arc::new(MemorySink::new()));
    let room = reg.create_room(player("1"));
    reg.join_room(&room.room_id, player("2")).expect("join");

    let outcome = reg.leave_room("conn-1");
    assert!(matches!(
        outcome,
        LeaveOutcome::Left { room: Some(_), .. }
    ));
    // Second leave for the same connection is a signalled no-op.
    assert!(matches!(reg.leave_room("conn-1"), LeaveOutcome::NotInRoom));

    // Room survives while the other player remains.
    assert!(reg.get_room(&room.room_id).is_some());

    let outcome = reg.leave_room("conn-2");
    assert!(matches!(outcome, LeaveOutcome::Left { room: None, .. }));
    assert!(reg.get_room(&room.room_id).is_none());
}

#[tokio::test]
async fn room_survives_until_last_spectator_leaves() {
    let reg = registry(Arc::new(MemorySink::new()));
    let room = reg.create_room(player("1"));
    reg.join_room(&room.room_id, player("2")).expect("join");
    reg.join_room(&room.room_id, player("3")).expect("spectate");

    reg.leave_room("conn-1");
    reg.leave_room("conn-2");
    // Both players gone, spectator keeps the room alive.
    assert!(reg.get_room(&room.room_id).is_some());

    let outcome = reg.leave_room("conn-3");
    assert!(matches!(outcome, LeaveOutcome::Left { room: None, .. }));
    assert!(reg.get_room(&room.room_id).is_none());
}

#[tokio::test]
async fn leaving_midgame_restarts_the_survivors_game() {
    let reg = registry(Arc::new(MemorySink::new()));
    let room = reg.create_room(player("1"));
    reg.join_room(&room.room_id, player("2")).expect("join");
    reg.make_move("conn-1", 0, 0).await.expect("move");
    let old_game_id = reg.get_room(&room.room_id).expect("room").game.game_id;

    reg.leave_room("conn-1");

    // The survivor never stays in a started game with an open seat.
    let room = reg.get_room(&room.room_id).expect("room survives");
    assert_eq!(room.game.status, GameStatus::Waiting);
    assert_eq!(room.game.players.len(), 1);
    assert_eq!(room.game.players[0].connection_id, "conn-2");
    assert_eq!(room.game.outcome, None);
    assert_ne!(room.game.game_id, old_game_id);
    assert!(
        room.game
            .board
            .cells()
            .iter()
            .flatten()
            .all(|c| *c == Cell::Empty)
    );
}

#[tokio::test]
async fn seat_after_midgame_leave_starts_fresh() {
    let reg = registry(Arc::new(MemorySink::new()));
    let room = reg.create_room(player("1"));
    reg.join_room(&room.room_id, player("2")).expect("join");
    reg.make_move("conn-1", 0, 0).await.expect("move");
    reg.leave_room("conn-1");

    // The replacement opponent seats onto an empty board, not the
    // half-played one.
    let outcome = reg.join_room(&room.room_id, player("3")).expect("join");
    let JoinOutcome::Seated { room, .. } = outcome else {
        panic!("replacement must take the open seat");
    };
    assert_eq!(room.game.status, GameStatus::Active);
    assert_eq!(room.game.turn, Mark::A);
    assert!(
        room.game
            .board
            .cells()
            .iter()
            .flatten()
            .all(|c| *c == Cell::Empty)
    );
}

#[tokio::test]
async fn leaving_a_finished_game_clears_the_result() {
    let reg = registry(Arc::new(MemorySink::new()));
    let room = reg.create_room(player("1"));
    reg.join_room(&room.room_id, player("2")).expect("join");
    reg.make_move("conn-1", 0, 0).await.expect("move");
    reg.make_move("conn-2", 1, 0).await.expect("move");
    reg.make_move("conn-1", 0, 1).await.expect("move");
    reg.make_move("conn-2", 1, 1).await.expect("move");
    reg.make_move("conn-1", 0, 2).await.expect("move");

    reg.leave_room("conn-1");

    let room = reg.get_room(&room.room_id).expect("room survives");
    assert_eq!(room.game.status, GameStatus::Waiting);
    assert_eq!(room.game.outcome, None);
}

#[tokio::test]
async fn failed_join_leaves_the_callers_room_intact() {
    let reg = registry(Arc::new(MemorySink::new()));
    let room = reg.create_room(player("1"));

    let err = reg.join_room("NOSUCH", player("1")).unwrap_err();
    assert!(matches!(err, GameError::RoomNotFound { .. }));

    // The caller's room and membership are untouched.
    assert!(reg.get_room(&room.room_id).is_some());
    let current = reg.room_for_connection("conn-1").expect("still a member");
    assert_eq!(current.room_id, room.room_id);
}

#[tokio::test]
async fn rejoining_the_current_room_is_a_no_op() {
    let reg = registry(Arc::new(MemorySink::new()));
    let room = reg.create_room(player("1"));
    reg.join_room(&room.room_id, player("2")).expect("join");
    reg.make_move("conn-1", 0, 0).await.expect("move");

    let outcome = reg.join_room(&room.room_id, player("1")).expect("rejoin");
    let JoinOutcome::Seated { room, departed } = outcome else {
        panic!("player rejoin must report the held seat");
    };
    assert!(departed.is_none());
    assert_eq!(room.game.players.len(), 2);
    assert_eq!(room.game.status, GameStatus::Active);
    // The running game is undisturbed.
    assert_eq!(room.game.board.get(0, 0), Some(Cell::Occupied(Mark::A)));
}

#[tokio::test]
async fn joining_a_spectator_only_room_takes_the_waiting_seat() {
    let reg = registry(Arc::new(MemorySink::new()));
    let room = reg.create_room(player("1"));
    reg.join_room(&room.room_id, player("2")).expect("join");
    reg.join_room(&room.room_id, player("3")).expect("spectate");
    reg.leave_room("conn-1");
    reg.leave_room("conn-2");

    let outcome = reg.join_room(&room.room_id, player("4")).expect("join");
    let JoinOutcome::Seated { room, .. } = outcome else {
        panic!("joiner must take the open waiting seat");
    };
    assert_eq!(room.game.status, GameStatus::Waiting);
    assert_eq!(room.game.players.len(), 1);
    assert_eq!(room.game.players[0].connection_id, "conn-4");
}

#[tokio::test]
async fn switching_rooms_surfaces_the_departed_room() {
    let reg = registry(Arc::new(MemorySink::new()));
    let first = reg.create_room(player("1"));
    reg.join_room(&first.room_id, player("2")).expect("join");
    let second = reg.create_room(player("3"));

    let outcome = reg.join_room(&second.room_id, player("2")).expect("switch");
    let departed = outcome.departed().expect("previous room surfaced");
    assert_eq!(departed.room_id, first.room_id);
    assert_eq!(departed.game.players.len(), 1);
    assert_eq!(departed.game.status, GameStatus::Waiting);
}

#[tokio::test]
async fn lookups_return_none_for_unknown_ids() {
    let reg = registry(Arc::new(MemorySink::new()));
    assert!(reg.get_room("NOSUCH").is_none());
    assert!(reg.room_for_connection("conn-9").is_none());

    let room = reg.create_room(player("1"));
    let found = reg.room_for_connection("conn-1").expect("room");
    assert_eq!(found.room_id, room.room_id);
}
