use std::time::Duration;

use url::Url;

use pong_shared::protocol::ClientMsg;
use pong_shared::team::{can_start, lobby_status};

use crate::config::PeerConfig;
use crate::input::{BotInput, InputSource};
use crate::net::{spawn_connection, NetError, NetEvent};
use crate::presentation::Presentation;
use crate::session::{RelaySession, Session, SessionEvent};
use crate::simulation::Simulation;

/// A headless player: session bookkeeping plus the match simulation.
/// Pure state; the async loop below feeds it network events and ticks.
pub struct Peer<P: Presentation + Default> {
    seed: u64,
    auto_start: bool,
    session: RelaySession,
    sim: Option<Simulation<P>>,
    input: Box<dyn InputSource + Send>,
    start_requested: bool,
}

impl<P: Presentation + Default> Peer<P> {
    pub fn new(seed: u64, auto_start: bool, input: Box<dyn InputSource + Send>) -> Self {
        Self {
            seed,
            auto_start,
            session: RelaySession::new(),
            sim: None,
            input,
            start_requested: false,
        }
    }

    pub fn handle_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::Connected => tracing::info!("connected to relay"),
            NetEvent::Disconnected => {
                if self.sim.is_some() {
                    tracing::warn!("disconnected; match state dropped");
                }
                self.session.reset();
                self.sim = None;
                self.start_requested = false;
            }
            NetEvent::ProtocolMismatch { server, client } => {
                tracing::error!(server, client, "relay speaks a different protocol");
            }
            NetEvent::Message(msg) => {
                let event = self.session.handle(msg);
                self.handle_session_event(event);
            }
        }
    }

    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Joined {
                self_id,
                host_id,
                config,
            } => {
                let seed = self.seed ^ u64::from(self_id);
                self.sim = Some(Simulation::new(config, self_id, self_id == host_id, seed, P::default()));
                if self.auto_start {
                    self.session.set_properties(None, Some(true));
                }
                self.log_lobby();
            }
            SessionEvent::PlayersChanged { departed } => {
                for gone in departed {
                    tracing::info!(id = gone.id, nick = %gone.nick, "player gone from roster");
                    if let Some(sim) = self.sim.as_mut() {
                        sim.on_player_left(gone.id, &gone.nick);
                    }
                }
                self.sync_authority();
                self.start_requested = false;
                self.log_lobby();
                self.maybe_start();
            }
            SessionEvent::HostChanged { host_id, .. } => {
                tracing::info!(host_id, "host changed");
                self.sync_authority();
                self.maybe_start();
            }
            SessionEvent::MatchStarted => {
                let players = self.session.player_list().to_vec();
                if let Some(sim) = self.sim.as_mut() {
                    sim.start_match(&players);
                }
            }
            SessionEvent::PlayerLeft { id, nick } => {
                tracing::info!(id, nick = %nick, "player left");
                if let Some(sim) = self.sim.as_mut() {
                    sim.on_player_left(id, &nick);
                }
            }
            SessionEvent::Rejected { reason } => {
                tracing::warn!(room = %self.session.room(), "could not join: {}", reason);
            }
            SessionEvent::Sync { from, envelope } => {
                if let Some(sim) = self.sim.as_mut() {
                    sim.apply_remote(from, &envelope);
                }
            }
        }
    }

    /// Own the ball exactly when the relay says we host.
    fn sync_authority(&mut self) {
        let hosting = self.session.is_authority();
        if let Some(sim) = self.sim.as_mut() {
            if hosting && !sim.is_authority() {
                sim.promote();
            } else if !hosting && sim.is_authority() {
                sim.demote();
            }
        }
    }

    fn log_lobby(&self) {
        if self.is_match_started() {
            return;
        }
        tracing::info!("{}", lobby_status(self.session.player_list()));
    }

    /// The host starts the match once both teams are staffed and everyone is ready.
    fn maybe_start(&mut self) {
        if !self.auto_start || self.start_requested || self.is_match_started() {
            return;
        }
        if self.session.is_authority() && can_start(self.session.player_list()) {
            tracing::info!("lobby ready; starting match");
            self.session.request_start();
            self.start_requested = true;
        }
    }

    pub fn tick(&mut self, dt: f32) {
        if let Some(sim) = self.sim.as_mut() {
            sim.tick(dt, self.input.as_mut());
        }
    }

    /// Messages to send to the relay, sync envelopes included.
    pub fn flush(&mut self) -> Vec<ClientMsg> {
        if let Some(sim) = self.sim.as_mut() {
            for envelope in sim.drain_outgoing() {
                self.session.send_sync(envelope);
            }
        }
        self.session.take_outgoing()
    }

    pub fn is_match_started(&self) -> bool {
        self.sim.as_ref().is_some_and(|s| s.is_started())
    }

    pub fn simulation(&self) -> Option<&Simulation<P>> {
        self.sim.as_ref()
    }

    pub fn session(&self) -> &RelaySession {
        &self.session
    }
}

/// Run a bot peer against the relay at `url` until the connection is given up or Ctrl-C.
pub async fn run_peer<P: Presentation + Default>(config: &PeerConfig, url: Url) -> Result<(), NetError> {
    let (net, mut events) = spawn_connection(url);

    let bot_seed = (config.seed as u32) ^ ((config.seed >> 32) as u32);
    let mut peer: Peer<P> = Peer::new(config.seed, config.auto_start, Box::new(BotInput::new(bot_seed)));

    let dt = config.tick_seconds();
    let mut tick_interval = tokio::time::interval(Duration::from_secs_f32(dt));
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                peer.tick(dt);
            }

            event = events.recv() => {
                match event {
                    Some(NetEvent::ProtocolMismatch { server, client }) => {
                        peer.handle_event(NetEvent::ProtocolMismatch { server, client });
                        return Err(NetError::ProtocolMismatch { server, client });
                    }
                    Some(event) => peer.handle_event(event),
                    None => return Err(NetError::Closed),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                return Ok(());
            }
        }

        for msg in peer.flush() {
            net.send(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::IdleInput;
    use crate::presentation::RecordingPresentation;
    use pong_shared::config::MatchConfig;
    use pong_shared::protocol::{
        PlayerWire, PlayersStateMsg, ServerMsg, WelcomeMsg, PROTOCOL_VERSION,
    };
    use pong_shared::team::Team;

    fn welcome(self_id: u32, host_id: u32, players: Vec<PlayerWire>) -> NetEvent {
        NetEvent::Message(ServerMsg::Welcome(WelcomeMsg {
            protocol_version: PROTOCOL_VERSION,
            self_id,
            room: "practice".to_string(),
            host_id,
            players,
            config: MatchConfig::default(),
        }))
    }

    fn player(id: u32, team: Team, ready: bool) -> PlayerWire {
        PlayerWire {
            id,
            nick: format!("p{}", id),
            team: Some(team),
            ready,
        }
    }

    fn peer() -> Peer<RecordingPresentation> {
        Peer::new(9, true, Box::new(IdleInput))
    }

    #[test]
    fn readies_on_join() {
        let mut p = peer();
        p.handle_event(welcome(1, 1, vec![player(1, Team::Zero, false)]));
        let sent = p.flush();
        assert!(matches!(
            sent.as_slice(),
            [ClientMsg::SetProperties {
                team: None,
                ready: Some(true)
            }]
        ));
        assert!(p.simulation().is_some_and(|s| s.is_authority()));
    }

    #[test]
    fn host_starts_once_lobby_is_ready() {
        let mut p = peer();
        p.handle_event(welcome(1, 1, vec![player(1, Team::Zero, true)]));
        p.flush();

        // Only one team staffed
        p.handle_event(NetEvent::Message(ServerMsg::PlayersState(PlayersStateMsg {
            host_id: 1,
            players: vec![player(1, Team::Zero, true), player(2, Team::One, false)],
        })));
        assert!(p.flush().is_empty());

        p.handle_event(NetEvent::Message(ServerMsg::PlayersState(PlayersStateMsg {
            host_id: 1,
            players: vec![player(1, Team::Zero, true), player(2, Team::One, true)],
        })));
        let sent = p.flush();
        assert!(matches!(sent.as_slice(), [ClientMsg::StartMatch]));
    }

    #[test]
    fn guest_never_requests_start() {
        let mut p = peer();
        p.handle_event(welcome(2, 1, vec![player(1, Team::Zero, true)]));
        p.flush();
        p.handle_event(NetEvent::Message(ServerMsg::PlayersState(PlayersStateMsg {
            host_id: 1,
            players: vec![player(1, Team::Zero, true), player(2, Team::One, true)],
        })));
        assert!(p.flush().is_empty());
    }

    #[test]
    fn match_start_emits_spawns_from_host() {
        let mut p = peer();
        let players = vec![player(1, Team::Zero, true), player(2, Team::One, true)];
        p.handle_event(welcome(1, 1, players));
        p.flush();
        p.handle_event(NetEvent::Message(ServerMsg::MatchStarted));
        assert!(p.is_match_started());

        let syncs = p
            .flush()
            .into_iter()
            .filter(|m| matches!(m, ClientMsg::Sync { .. }))
            .count();
        assert!(syncs >= 4, "two spawns, score, position and direction");
    }

    #[test]
    fn disconnect_drops_match() {
        let mut p = peer();
        p.handle_event(welcome(1, 1, vec![player(1, Team::Zero, true)]));
        p.handle_event(NetEvent::Disconnected);
        assert!(p.simulation().is_none());
        assert!(!p.session().is_authority());
    }

    #[test]
    fn roster_alone_promotes_new_host() {
        let mut p = peer();
        let players = vec![player(1, Team::Zero, true), player(2, Team::One, true)];
        p.handle_event(welcome(2, 1, players));
        p.handle_event(NetEvent::Message(ServerMsg::MatchStarted));
        p.flush();
        assert!(p.simulation().is_some_and(|s| !s.is_authority()));

        // player_left and host_changed were lost; only the roster arrives
        p.handle_event(NetEvent::Message(ServerMsg::PlayersState(PlayersStateMsg {
            host_id: 2,
            players: vec![player(2, Team::One, true)],
        })));

        let sim = p.simulation().expect("simulation");
        assert!(sim.is_authority());
        assert!(sim.match_state().is_paused());
        assert_eq!(sim.shadow().pause_message, "p1 disconnected");
        assert!(p
            .flush()
            .iter()
            .any(|m| matches!(m, ClientMsg::Sync { .. })));
    }

    #[test]
    fn roster_demotes_stale_host() {
        let mut p = peer();
        let players = vec![player(1, Team::Zero, true), player(2, Team::One, true)];
        p.handle_event(welcome(1, 1, players.clone()));
        assert!(p.simulation().is_some_and(|s| s.is_authority()));

        p.handle_event(NetEvent::Message(ServerMsg::PlayersState(PlayersStateMsg {
            host_id: 2,
            players,
        })));
        assert!(p.simulation().is_some_and(|s| !s.is_authority()));
    }
}
