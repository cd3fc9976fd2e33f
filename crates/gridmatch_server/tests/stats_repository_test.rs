//! Tests for the SQLite statistics repository and its sink adapter.

use chrono::Utc;
use gridmatch_rules::{Board, Mark, Outcome};
use gridmatch_server::{
    DbError, GameOutcome, GameSnapshot, GameStatus, StatsRepository, StatsSink,
};
use tempfile::TempDir;

fn open_repo() -> (TempDir, StatsRepository) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("stats.db").to_string_lossy().to_string();
    let repo = StatsRepository::new(path).expect("open repository");
    (dir, repo)
}

fn snapshot(game_id: u64, outcome: Option<Outcome>) -> GameSnapshot {
    let now = Utc::now();
    GameSnapshot {
        game_id,
        players: Vec::new(),
        board: Board::new(),
        turn: Mark::A,
        status: if outcome.is_some() {
            GameStatus::Finished
        } else {
            GameStatus::Active
        },
        outcome,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn get_or_create_player_is_idempotent() {
    let (_dir, repo) = open_repo();

    let first = repo.get_or_create_player("alice", "Alice").expect("create");
    let second = repo.get_or_create_player("alice", "Alice").expect("fetch");
    assert_eq!(first.id(), second.id());
    assert_eq!(second.display_name().as_str(), "Alice");
}

#[test]
fn outcomes_aggregate_into_stats() {
    let (_dir, repo) = open_repo();

    repo.record_outcome("alice", GameOutcome::Win).expect("record");
    repo.record_outcome("alice", GameOutcome::Win).expect("record");
    repo.record_outcome("alice", GameOutcome::Loss).expect("record");
    repo.record_outcome("alice", GameOutcome::Draw).expect("record");

    let stats = repo.get_stats("alice").expect("stats");
    assert_eq!(*stats.total_games(), 4);
    assert_eq!(*stats.wins(), 2);
    assert_eq!(*stats.losses(), 1);
    assert_eq!(*stats.draws(), 1);
    assert_eq!(stats.win_rate(), 50.0);
}

#[test]
fn unknown_identity_has_zero_stats() {
    let (_dir, repo) = open_repo();
    let stats = repo.get_stats("nobody").expect("stats");
    assert_eq!(*stats.total_games(), 0);
    assert_eq!(stats.win_rate(), 0.0);
}

#[test]
fn save_game_accepts_running_and_finished_snapshots() {
    let (_dir, repo) = open_repo();
    let identities = vec!["alice".to_string(), "bob".to_string()];

    repo.save_game(&snapshot(1, None), &identities).expect("save");
    repo.save_game(&snapshot(1, Some(Outcome::Winner(Mark::A))), &identities)
        .expect("save");
    repo.save_game(&snapshot(2, Some(Outcome::Draw)), &identities)
        .expect("save");
}

#[test]
fn db_error_reports_raise_location() {
    let err = DbError::new("boom");
    let text = err.to_string();
    assert!(text.contains("boom"));
    assert!(text.contains("stats_repository_test.rs"));
}

#[tokio::test]
async fn diesel_sink_round_trip() {
    use gridmatch_server::DieselSink;

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("stats.db").to_string_lossy().to_string();
    let sink = DieselSink::open(path).expect("open sink");

    let record = sink
        .get_or_create_player(&"carol".to_string(), "Carol")
        .await
        .expect("profile");
    assert_eq!(record.identity().as_str(), "carol");

    sink.record_outcome(&"carol".to_string(), GameOutcome::Draw)
        .await
        .expect("record");
    let stats = sink.get_stats(&"carol".to_string()).await.expect("stats");
    assert_eq!(*stats.draws(), 1);

    sink.save_game(&snapshot(7, Some(Outcome::Draw)), &["carol".to_string()])
        .await
        .expect("save");
}
