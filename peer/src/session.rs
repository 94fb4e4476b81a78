//! Room membership as seen by one peer: who is here, who hosts, and our own
//! custom properties. Fed by relay messages, it queues outgoing client messages.

use pong_shared::config::MatchConfig;
use pong_shared::protocol::{
    ClientMsg, PeerId, PlayerWire, RelayedSyncMsg, ServerMsg, SyncEnvelope,
};
use pong_shared::team::Team;

pub trait Session {
    /// True when this peer hosts the room and so owns the ball and score.
    fn is_authority(&self) -> bool;
    fn local_player_id(&self) -> Option<PeerId>;
    fn player_list(&self) -> &[PlayerWire];
    fn local_properties(&self) -> Option<&PlayerWire>;
    /// Update our own properties. `None` fields are left untouched.
    fn set_properties(&mut self, team: Option<Team>, ready: Option<bool>);
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Joined {
        self_id: PeerId,
        host_id: PeerId,
        config: MatchConfig,
    },
    /// New roster. `departed` lists members that vanished without a
    /// `player_left` reaching us.
    PlayersChanged {
        departed: Vec<PlayerWire>,
    },
    HostChanged {
        host_id: PeerId,
        is_self: bool,
    },
    MatchStarted,
    PlayerLeft {
        id: PeerId,
        nick: String,
    },
    Rejected {
        reason: String,
    },
    Sync {
        from: PeerId,
        envelope: SyncEnvelope,
    },
}

#[derive(Debug, Default)]
pub struct RelaySession {
    self_id: Option<PeerId>,
    host_id: Option<PeerId>,
    room: String,
    players: Vec<PlayerWire>,
    outgoing: Vec<ClientMsg>,
}

impl RelaySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, msg: ServerMsg) -> SessionEvent {
        match msg {
            ServerMsg::Welcome(welcome) => {
                self.self_id = Some(welcome.self_id);
                self.host_id = Some(welcome.host_id);
                self.room = welcome.room;
                self.players = welcome.players;
                tracing::info!(
                    self_id = welcome.self_id,
                    host_id = welcome.host_id,
                    room = %self.room,
                    "joined room"
                );
                SessionEvent::Joined {
                    self_id: welcome.self_id,
                    host_id: welcome.host_id,
                    config: welcome.config,
                }
            }
            ServerMsg::PlayersState(state) => {
                self.host_id = Some(state.host_id);
                let previous = std::mem::replace(&mut self.players, state.players);
                let departed = previous
                    .into_iter()
                    .filter(|old| self.players.iter().all(|p| p.id != old.id))
                    .collect();
                SessionEvent::PlayersChanged { departed }
            }
            ServerMsg::HostChanged(changed) => {
                self.host_id = Some(changed.host_id);
                SessionEvent::HostChanged {
                    host_id: changed.host_id,
                    is_self: self.self_id == Some(changed.host_id),
                }
            }
            ServerMsg::MatchStarted => SessionEvent::MatchStarted,
            ServerMsg::PlayerLeft(left) => {
                self.players.retain(|p| p.id != left.id);
                SessionEvent::PlayerLeft {
                    id: left.id,
                    nick: left.nick,
                }
            }
            ServerMsg::JoinRejected(rejected) => {
                tracing::warn!(reason = %rejected.reason, "join rejected");
                SessionEvent::Rejected {
                    reason: rejected.reason,
                }
            }
            ServerMsg::Sync(RelayedSyncMsg { from, envelope }) => {
                SessionEvent::Sync { from, envelope }
            }
        }
    }

    pub fn request_start(&mut self) {
        self.outgoing.push(ClientMsg::StartMatch);
    }

    pub fn send_sync(&mut self, envelope: SyncEnvelope) {
        self.outgoing.push(ClientMsg::Sync { envelope });
    }

    pub fn take_outgoing(&mut self) -> Vec<ClientMsg> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn host_id(&self) -> Option<PeerId> {
        self.host_id
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// Forget the room after the connection dropped.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Session for RelaySession {
    fn is_authority(&self) -> bool {
        self.self_id.is_some() && self.self_id == self.host_id
    }

    fn local_player_id(&self) -> Option<PeerId> {
        self.self_id
    }

    fn player_list(&self) -> &[PlayerWire] {
        &self.players
    }

    fn local_properties(&self) -> Option<&PlayerWire> {
        let id = self.self_id?;
        self.players.iter().find(|p| p.id == id)
    }

    fn set_properties(&mut self, team: Option<Team>, ready: Option<bool>) {
        if team.is_none() && ready.is_none() {
            return;
        }
        if let Some(id) = self.self_id {
            if let Some(me) = self.players.iter_mut().find(|p| p.id == id) {
                if team.is_some() {
                    me.team = team;
                }
                if let Some(ready) = ready {
                    me.ready = ready;
                }
            }
        }
        self.outgoing.push(ClientMsg::SetProperties { team, ready });
    }
}
