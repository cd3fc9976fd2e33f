//! WebSocket gateway.
//!
//! Translates the wire event vocabulary onto registry operations and
//! broadcasts resulting snapshots to every participant of the affected
//! room. Carries no game logic of its own. Identity arrives pre-verified
//! in the connection query; the authentication handshake itself is out
//! of scope.

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::events::{ClientEvent, PlayerStats, ServerEvent};
use crate::matchmaking::MatchOutcome;
use crate::registry::{LeaveOutcome, SessionRegistry};
use crate::rematch::RematchOutcome;
use crate::session::{ConnectionId, GameSnapshot, Player, RoomSnapshot};
use crate::stats::StatsSink;

/// Query parameters of a WebSocket connection. `identity` is treated as
/// already authenticated.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectParams {
    /// Durable player identity.
    pub identity: String,
    /// Optional display name; defaults to the identity.
    pub name: Option<String>,
}

type PeerMap = Arc<Mutex<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>>;

/// WebSocket gateway over the session registry.
#[derive(Clone)]
pub struct Gateway {
    registry: SessionRegistry,
    sink: Arc<dyn StatsSink>,
    peers: PeerMap,
}

impl Gateway {
    /// Creates a gateway over the given registry and sink.
    #[instrument(skip(registry, sink))]
    pub fn new(registry: SessionRegistry, sink: Arc<dyn StatsSink>) -> Self {
        info!("Creating gateway");
        Self {
            registry,
            sink,
            peers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Builds the axum router exposing `/ws`.
    pub fn router(self) -> Router {
        Router::new().route("/ws", get(ws_handler)).with_state(self)
    }

    /// Delivers an event to one connection. A closed peer is dropped
    /// silently; its disconnect path cleans up the registry.
    fn send_to(&self, connection_id: &str, event: ServerEvent) {
        let peers = self.peers.lock().expect("peer map poisoned");
        if let Some(tx) = peers.get(connection_id) {
            let _ = tx.send(event);
        }
    }

    /// Delivers an event to every listed connection.
    fn broadcast(&self, participants: &[ConnectionId], event: ServerEvent) {
        let peers = self.peers.lock().expect("peer map poisoned");
        for connection_id in participants {
            if let Some(tx) = peers.get(connection_id) {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Handles one parsed client event.
    #[instrument(skip(self, event), fields(connection_id = %connection_id))]
    async fn dispatch(
        &self,
        connection_id: &str,
        identity: &str,
        display_name: &str,
        event: ClientEvent,
    ) {
        debug!(?event, "Dispatching client event");
        let player = || Player::new(connection_id, identity, display_name);

        match event {
            ClientEvent::CreateRoom => {
                // The implicit leave of any previous room is announced
                // before the new room opens.
                self.handle_leave(connection_id);
                let room = self.registry.create_room(player());
                self.send_to(
                    connection_id,
                    ServerEvent::RoomCreated {
                        room_id: room.room_id,
                    },
                );
            }
            ClientEvent::JoinRoom { room_id } => match self.registry.join_room(&room_id, player()) {
                Ok(outcome) => {
                    if let Some(departed) = outcome.departed() {
                        self.broadcast_departure(connection_id, departed);
                    }
                    let room = outcome.room().clone();
                    self.broadcast(&room.participants(), ServerEvent::RoomJoined { room });
                }
                Err(e) => self.send_error(connection_id, &e),
            },
            ClientEvent::FindMatch => {
                let outcome = self.registry.find_match(player());
                if let Some(departed) = outcome.departed() {
                    self.broadcast_departure(connection_id, departed);
                }
                match outcome {
                    MatchOutcome::Matched { room, .. } => {
                        self.broadcast(&room.participants(), ServerEvent::MatchFound { room });
                    }
                    MatchOutcome::Queued { room, .. } => {
                        self.send_to(
                            connection_id,
                            ServerEvent::RoomCreated {
                                room_id: room.room_id,
                            },
                        );
                    }
                }
            }
            ClientEvent::MakeMove { row, col } => {
                match self.registry.make_move(connection_id, row, col).await {
                    Ok(result) => {
                        let participants = result.room.participants();
                        self.broadcast(
                            &participants,
                            ServerEvent::MoveMade {
                                game: result.room.game.clone(),
                            },
                        );
                        if result.finished {
                            let stats = self.collect_stats(&result.room.game).await;
                            self.broadcast(
                                &participants,
                                ServerEvent::GameEnded {
                                    game: result.room.game,
                                    stats,
                                },
                            );
                        }
                    }
                    Err(e) => self.send_error(connection_id, &e),
                }
            }
            ClientEvent::RequestRematch | ClientEvent::AcceptRematch => {
                match self.registry.request_rematch(connection_id) {
                    Ok(RematchOutcome::Pending { room, requester }) => {
                        // Solicit the opponent; the requester already
                        // knows their own flag flipped.
                        let others: Vec<_> = room
                            .participants()
                            .into_iter()
                            .filter(|c| c != connection_id)
                            .collect();
                        self.broadcast(
                            &others,
                            ServerEvent::RematchRequested {
                                requester: requester.connection_id,
                            },
                        );
                    }
                    Ok(RematchOutcome::Started(room)) => {
                        self.broadcast(&room.participants(), ServerEvent::RematchAccepted { room });
                    }
                    Err(e) => self.send_error(connection_id, &e),
                }
            }
            ClientEvent::DeclineRematch => match self.registry.decline_rematch(connection_id) {
                Ok(room) => {
                    self.broadcast(&room.participants(), ServerEvent::RematchDeclined);
                }
                Err(e) => self.send_error(connection_id, &e),
            },
            ClientEvent::LeaveRoom => self.handle_leave(connection_id),
        }
    }

    /// Leave path shared by the explicit event, room switches, and
    /// disconnects.
    fn handle_leave(&self, connection_id: &str) {
        if let LeaveOutcome::Left {
            room: Some(room), ..
        } = self.registry.leave_room(connection_id)
        {
            self.broadcast_departure(connection_id, &room);
        }
    }

    /// Tells a room's remaining participants that a connection left,
    /// followed by the room's refreshed game state (the game restarts
    /// as a waiting game when a seated player departs mid-game).
    fn broadcast_departure(&self, connection_id: &str, departed: &RoomSnapshot) {
        let participants = departed.participants();
        self.broadcast(
            &participants,
            ServerEvent::PlayerLeft {
                player_id: connection_id.to_string(),
            },
        );
        self.broadcast(
            &participants,
            ServerEvent::GameUpdated {
                game: departed.game.clone(),
            },
        );
    }

    fn send_error(&self, connection_id: &str, error: &crate::error::GameError) {
        debug!(connection_id, error = %error, "Operation failed");
        self.send_to(
            connection_id,
            ServerEvent::Error {
                message: error.to_string(),
            },
        );
    }

    /// Fetches both players' tallies for a game-ended broadcast. A sink
    /// outage degrades to zeroed tallies rather than blocking the event.
    async fn collect_stats(&self, game: &GameSnapshot) -> Vec<PlayerStats> {
        let mut stats = Vec::with_capacity(game.players.len());
        for player in &game.players {
            let tallies = match self.sink.get_stats(&player.identity).await {
                Ok(tallies) => tallies,
                Err(e) => {
                    warn!(error = %e, identity = %player.identity, "Failed to fetch stats");
                    Default::default()
                }
            };
            stats.push(PlayerStats {
                identity: player.identity.clone(),
                stats: tallies,
            });
        }
        stats
    }

    /// Runs one connection to completion.
    #[instrument(skip(self, socket, params), fields(identity = %params.identity))]
    async fn handle_socket(self, socket: WebSocket, params: ConnectParams) {
        let connection_id = connection_code();
        let display_name = params.name.clone().unwrap_or_else(|| params.identity.clone());
        info!(connection_id = %connection_id, "Connection established");

        if let Err(e) = self
            .sink
            .get_or_create_player(&params.identity, &display_name)
            .await
        {
            warn!(error = %e, "Failed to touch player profile");
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
        self.peers
            .lock()
            .expect("peer map poisoned")
            .insert(connection_id.clone(), tx);

        let (mut ws_tx, mut ws_rx) = socket.split();
        let writer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize event");
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        });

        while let Some(message) = ws_rx.next().await {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    debug!(error = %e, "Socket error, closing");
                    break;
                }
            };
            match message {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                    Ok(event) => {
                        self.dispatch(&connection_id, &params.identity, &display_name, event)
                            .await;
                    }
                    Err(e) => {
                        self.send_to(
                            &connection_id,
                            ServerEvent::Error {
                                message: format!("Unrecognized event: {}", e),
                            },
                        );
                    }
                },
                Message::Close(_) => break,
                // Pings are answered by axum; binary frames are ignored.
                _ => {}
            }
        }

        // Disconnect takes the same path as an explicit leave.
        info!(connection_id = %connection_id, "Connection closed");
        self.handle_leave(&connection_id);
        self.peers
            .lock()
            .expect("peer map poisoned")
            .remove(&connection_id);
        writer.abort();
    }
}

/// WebSocket upgrade endpoint.
async fn ws_handler(
    State(gateway): State<Gateway>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| gateway.handle_socket(socket, params))
}

/// Generates an ephemeral connection handle.
fn connection_code() -> ConnectionId {
    let mut rng = rand::thread_rng();
    let code: String = (0..12).map(|_| char::from(rng.sample(Alphanumeric))).collect();
    format!("conn-{}", code)
}
