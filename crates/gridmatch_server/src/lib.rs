//! Gridmatch server library.
//!
//! Real-time session manager for two-player turn-based games played
//! over a persistent WebSocket connection.
//!
//! # Architecture
//!
//! - **Registry**: owns all active rooms, enforces capacity and turn
//!   order, serializes every state-changing operation
//! - **Matchmaking**: FIFO pairing of waiting players into rooms
//! - **Rematch**: symmetric two-party handshake producing a fresh game
//!   inside an existing room
//! - **Gateway**: WebSocket surface translating wire events onto the
//!   registry and broadcasting snapshots
//! - **Stats**: pluggable persistence sink (in-memory or SQLite)
//!
//! Board rules live in the `gridmatch_rules` crate.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod coin;
mod config;
mod db;
mod error;
mod events;
mod gateway;
mod matchmaking;
mod registry;
mod rematch;
mod session;
mod stats;

/// Command-line interface.
pub mod cli;

// Crate-level exports - coin injection
pub use coin::{FairCoin, FixedCoin, RngCoin};

// Crate-level exports - configuration
pub use config::{ConfigError, ServerConfig};

// Crate-level exports - persistence
pub use db::{
    DbError, DieselSink, GameRecordRow, NewGameRecordRow, NewOutcomeRow, NewPlayerRow, OutcomeRow,
    PlayerRow, StatsRepository,
};

// Crate-level exports - failure taxonomy
pub use error::GameError;

// Crate-level exports - wire events
pub use events::{ClientEvent, PlayerStats, ServerEvent};

// Crate-level exports - gateway
pub use gateway::{ConnectParams, Gateway};

// Crate-level exports - matchmaking
pub use matchmaking::MatchOutcome;

// Crate-level exports - registry operations
pub use registry::{JoinOutcome, LeaveOutcome, MoveResult, SessionRegistry};

// Crate-level exports - rematch handshake
pub use rematch::RematchOutcome;

// Crate-level exports - domain records and snapshots
pub use session::{
    ConnectionId, Game, GameId, GameSnapshot, GameStatus, Identity, Player, PlayerSnapshot, Room,
    RoomId, RoomSnapshot,
};

// Crate-level exports - statistics boundary
pub use stats::{AggregatedStats, GameOutcome, MemorySink, PlayerRecord, StatsSink};
