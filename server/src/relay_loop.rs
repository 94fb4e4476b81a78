use crate::config::ServerConfig;
use crate::state::RelayState;
use pong_shared::protocol::{
    HostChangedMsg, PeerId, PlayerLeftMsg, RelayedSyncMsg, ServerMsg, SyncEnvelope, WelcomeMsg,
};
use pong_shared::team::Team;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Commands from client connections to the relay loop
pub enum RelayCommand {
    Join {
        room: String,
        nick: String,
        response: oneshot::Sender<Result<(PeerId, WelcomeMsg), String>>,
    },
    Leave {
        id: PeerId,
    },
    SetProperties {
        id: PeerId,
        team: Option<Team>,
        ready: Option<bool>,
    },
    StartMatch {
        id: PeerId,
    },
    Sync {
        id: PeerId,
        envelope: SyncEnvelope,
    },
    /// Resend the room state to a connection that fell behind the broadcast
    Resync {
        id: PeerId,
    },
}

/// Who in a room should receive a broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Everyone,
    AllExcept(PeerId),
    Only(PeerId),
}

/// Broadcast from the relay loop; each connection filters by room and target.
#[derive(Debug, Clone)]
pub struct RelayBroadcast {
    pub room: String,
    pub target: Target,
    pub msg: ServerMsg,
}

impl RelayBroadcast {
    pub fn is_for(&self, room: &str, id: PeerId) -> bool {
        if self.room != room {
            return false;
        }
        match self.target {
            Target::Everyone => true,
            Target::AllExcept(excluded) => excluded != id,
            Target::Only(recipient) => recipient == id,
        }
    }
}

/// Run the relay loop. Owns all room state.
pub async fn run_relay_loop(
    mut cmd_rx: mpsc::Receiver<RelayCommand>,
    broadcast_tx: broadcast::Sender<RelayBroadcast>,
    config: ServerConfig,
) {
    let mut state = RelayState::new(config);
    let send = |room: &str, target: Target, msg: ServerMsg| {
        let _ = broadcast_tx.send(RelayBroadcast {
            room: room.to_string(),
            target,
            msg,
        });
    };

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            RelayCommand::Join {
                room,
                nick,
                response,
            } => match state.join(&room, nick) {
                Ok((id, welcome)) => {
                    tracing::info!(player_id = id, room = %room, "player joined");
                    let _ = response.send(Ok((id, welcome)));
                    if let Some(players) = state.players_state(&room) {
                        send(&room, Target::AllExcept(id), ServerMsg::PlayersState(players));
                    }
                }
                Err(e) => {
                    tracing::info!(room = %room, reason = %e, "join rejected");
                    let _ = response.send(Err(e.to_string()));
                }
            },
            RelayCommand::Leave { id } => {
                let Some(outcome) = state.leave(id) else {
                    continue;
                };
                let room = outcome.room;
                tracing::info!(player_id = id, room = %room, "player left");
                if let Some(players) = outcome.players_state {
                    send(
                        &room,
                        Target::Everyone,
                        ServerMsg::PlayerLeft(PlayerLeftMsg {
                            id,
                            nick: outcome.departure.member.nick,
                        }),
                    );
                    if let Some(host_id) = outcome.departure.new_host {
                        tracing::info!(room = %room, host_id, "host migrated");
                        send(
                            &room,
                            Target::Everyone,
                            ServerMsg::HostChanged(HostChangedMsg { host_id }),
                        );
                    }
                    send(&room, Target::Everyone, ServerMsg::PlayersState(players));
                }
            }
            RelayCommand::SetProperties { id, team, ready } => {
                if let Some((room, players)) = state.set_properties(id, team, ready) {
                    send(&room, Target::Everyone, ServerMsg::PlayersState(players));
                }
            }
            RelayCommand::StartMatch { id } => match state.start_match(id) {
                Some((room, Ok(()))) => {
                    tracing::info!(room = %room, "match started");
                    send(&room, Target::Everyone, ServerMsg::MatchStarted);
                }
                Some((room, Err(e))) => {
                    tracing::warn!(player_id = id, room = %room, reason = %e, "start refused");
                }
                None => {}
            },
            RelayCommand::Sync { id, envelope } => match state.authorize_sync(id, &envelope) {
                Some(room) => send(
                    &room,
                    Target::AllExcept(id),
                    ServerMsg::Sync(RelayedSyncMsg { from: id, envelope }),
                ),
                None => {
                    tracing::debug!(player_id = id, "dropping unauthorized sync");
                }
            },
            RelayCommand::Resync { id } => {
                if let Some((room, players)) = state.players_state_of(id) {
                    tracing::debug!(player_id = id, room = %room, "resending room state");
                    send(&room, Target::Only(id), ServerMsg::PlayersState(players));
                }
            }
        }
    }

    tracing::info!("Relay loop ended");
}
