//! One peer's match: the authoritative ball and score when hosting, the shadow
//! state always, and the owner-local paddle.
//!
//! Everything the authority changes goes through the outbox. Outgoing envelopes
//! are applied to the local shadow as they are produced, so the authority's
//! shadow and every remote shadow run the same reducer on the same envelopes.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pong_shared::config::MatchConfig;
use pong_shared::protocol::{PeerId, PlayerWire, SyncEnvelope, SyncMsg};
use pong_shared::shadow::ShadowState;
use pong_shared::team::Team;

use crate::ball::BallAuthority;
use crate::input::{InputSource, InputView};
use crate::match_state::{GoalOutcome, MatchState};
use crate::outbox::Outbox;
use crate::paddle;
use crate::presentation::Presentation;

/// How often the periodic sync messages go out.
#[derive(Debug, Clone, Copy)]
pub struct SyncRates {
    /// Ball position refreshes while the ball moves
    pub position_hz: f32,
    /// Own paddle updates while it moves
    pub paddle_hz: f32,
}

impl Default for SyncRates {
    fn default() -> Self {
        Self {
            position_hz: 15.0,
            paddle_hz: 20.0,
        }
    }
}

pub struct Simulation<P: Presentation> {
    config: MatchConfig,
    local_id: PeerId,
    rates: SyncRates,
    match_state: MatchState,
    /// Present only while this peer is the authority
    ball: Option<BallAuthority>,
    shadow: ShadowState,
    outbox: Outbox,
    presentation: P,
    rng: ChaCha8Rng,
    started: bool,
    position_timer: f32,
    paddle_timer: f32,
    paddle_dirty: bool,
}

impl<P: Presentation> Simulation<P> {
    pub fn new(
        config: MatchConfig,
        local_id: PeerId,
        authority: bool,
        seed: u64,
        presentation: P,
    ) -> Self {
        Self {
            config,
            local_id,
            rates: SyncRates::default(),
            match_state: MatchState::new(config.winning_score),
            ball: authority.then(|| BallAuthority::new(&config)),
            shadow: ShadowState::new(),
            outbox: Outbox::new(),
            presentation,
            rng: ChaCha8Rng::seed_from_u64(seed),
            started: false,
            position_timer: 0.0,
            paddle_timer: 0.0,
            paddle_dirty: false,
        }
    }

    pub fn is_authority(&self) -> bool {
        self.ball.is_some()
    }

    /// Begin the match. The authority spawns every paddle and launches the ball;
    /// the other peers wait for those to arrive as sync messages.
    pub fn start_match(&mut self, players: &[PlayerWire]) {
        if self.started {
            tracing::debug!("match already started");
            return;
        }
        self.started = true;
        self.presentation.update_score(0, 0);

        let allowed = self.match_state.allow_ball_movement();
        if let Some(ball) = self.ball.as_mut() {
            for spawn in paddle::spawn_layout(players, &self.config) {
                self.outbox.push(SyncMsg::SpawnPaddle(spawn));
            }
            let [team0, team1] = self.match_state.score();
            self.outbox.push(SyncMsg::Score { team0, team1 });
            ball.launch(&self.config, &mut self.rng, &mut self.outbox);
            ball.set_movement_enabled(allowed);
            tracing::info!(players = players.len(), "match started as host");
        } else {
            tracing::info!("match started");
        }
        self.commit();
    }

    /// One fixed step: serve timer, input, move, wall bounce, paddle contact, goal check.
    pub fn tick(&mut self, dt: f32, input: &mut dyn InputSource) {
        if !self.started {
            return;
        }

        let allowed = self.match_state.allow_ball_movement();
        if let Some(ball) = self.ball.as_mut() {
            ball.advance_serve(dt, allowed);
        }

        self.apply_local_input(dt, input);

        if let Some(ball) = self.ball.as_mut() {
            ball.tick(dt);
            ball.bounce_off_walls(self.config.vertical_limit, &mut self.outbox);

            if let Some(hit) = self
                .shadow
                .paddles
                .values()
                .find(|p| ball.collides_with(p, &self.config))
            {
                ball.bounce_off_paddle(hit, &self.config, &mut self.outbox);
            }
        }

        let goal = self.pending_goal();
        if let Some(ball) = self.ball.as_mut() {
            if ball.is_moving() && goal.is_none() {
                self.position_timer += dt;
                if self.position_timer >= 1.0 / self.rates.position_hz {
                    self.position_timer = 0.0;
                    ball.emit_position(&mut self.outbox);
                }
            }
        }

        if let Some(team) = goal {
            self.report_goal(team);
        }
        self.commit();
    }

    /// Team owed a goal by the ball's position. None once the match is over,
    /// since the final ball rests past the line.
    fn pending_goal(&self) -> Option<Team> {
        if self.match_state.is_ended() {
            return None;
        }
        self.ball.as_ref()?.goal_scored_by(self.config.horizontal_limit)
    }

    fn apply_local_input(&mut self, dt: f32, input: &mut dyn InputSource) {
        let (ball_position, ball_direction) = match &self.ball {
            Some(ball) => (ball.position(), ball.direction()),
            None => (self.shadow.ball.position, self.shadow.ball.direction),
        };
        let allowed = self.match_state.allow_player_input();
        let Some(own) = self.shadow.paddles.get_mut(&self.local_id) else {
            return;
        };

        let view = InputView {
            paddle_y: own.y,
            ball_position,
            ball_direction,
        };
        let axis = input.axis(dt, &view);
        if allowed && paddle::apply_input(own, axis, dt, &self.config) {
            self.paddle_dirty = true;
        }

        self.paddle_timer += dt;
        if self.paddle_dirty && self.paddle_timer >= 1.0 / self.rates.paddle_hz {
            self.paddle_timer = 0.0;
            self.paddle_dirty = false;
            self.outbox.push(SyncMsg::Paddle {
                owner_id: self.local_id,
                y: own.y,
            });
        }
    }

    /// Score a goal. Only the authority scores; elsewhere the score arrives by sync.
    pub fn report_goal(&mut self, scoring_team: Team) -> GoalOutcome {
        if self.ball.is_none() {
            tracing::debug!("ignoring goal report on a non-authoritative peer");
            return GoalOutcome::Ignored;
        }

        let outcome = self.match_state.report_goal(scoring_team);
        match &outcome {
            GoalOutcome::Ignored => {}
            GoalOutcome::Scored { score } => {
                self.publish_score(*score);
                if let Some(ball) = self.ball.as_mut() {
                    ball.prepare_next_serve(scoring_team, &self.config, &mut self.rng, &mut self.outbox);
                }
            }
            GoalOutcome::Won { winner, score } => {
                self.publish_score(*score);
                self.refresh_ball_allowance();
                let message = winner.victory_message();
                tracing::info!(winner = winner.index(), ?score, "match over");
                self.presentation.show_end(true, &message);
                self.outbox.push(SyncMsg::MatchEnd {
                    winner: *winner,
                    message,
                });
            }
        }
        self.commit();
        outcome
    }

    fn publish_score(&mut self, [team0, team1]: [u32; 2]) {
        tracing::info!(team0, team1, "goal");
        self.presentation.update_score(team0, team1);
        self.outbox.push(SyncMsg::Score { team0, team1 });
    }

    /// Pause or resume locally. The authority also tells everyone else.
    pub fn set_paused(&mut self, paused: bool, message: &str) {
        self.match_state.set_paused(paused);
        self.shadow.set_paused(paused, message);
        self.presentation.show_pause(paused, message);
        self.refresh_ball_allowance();
        if self.ball.is_some() {
            self.outbox.push(SyncMsg::Pause {
                paused,
                message: message.to_string(),
            });
            self.commit();
        }
    }

    fn refresh_ball_allowance(&mut self) {
        let allowed = self.match_state.allow_ball_movement();
        if let Some(ball) = self.ball.as_mut() {
            ball.set_movement_enabled(allowed);
        }
    }

    /// Apply a message relayed from another peer. Returns false if it was dropped.
    pub fn apply_remote(&mut self, from: PeerId, envelope: &SyncEnvelope) -> bool {
        if envelope.msg.requires_authority() && self.is_authority() {
            tracing::debug!(from, "ignoring authority message while authoritative");
            return false;
        }
        if matches!(envelope.msg, SyncMsg::Paddle { owner_id, .. } if owner_id == self.local_id) {
            return false;
        }
        if !self.shadow.apply(envelope) {
            return false;
        }

        match &envelope.msg {
            SyncMsg::Score { team0, team1 } => {
                self.match_state.mirror_score([*team0, *team1]);
                self.presentation.update_score(*team0, *team1);
            }
            SyncMsg::Pause { paused, message } => {
                self.match_state.set_paused(*paused);
                self.presentation.show_pause(*paused, message);
            }
            SyncMsg::MatchEnd { message, .. } => {
                self.match_state.mark_ended();
                self.presentation.show_end(true, message);
            }
            SyncMsg::SpawnPaddle(_) => {
                self.started = true;
            }
            SyncMsg::Direction { .. } | SyncMsg::Position { .. } | SyncMsg::Paddle { .. } => {}
        }
        true
    }

    /// Take over as authority, continuing from the last observed ball state.
    pub fn promote(&mut self) {
        if self.ball.is_some() {
            return;
        }
        let mut ball = BallAuthority::from_shadow(&self.shadow.ball, &self.config);
        self.outbox.continue_after(self.shadow.highest_authority_seq());
        if self.started {
            ball.set_movement_enabled(self.match_state.allow_ball_movement());
            ball.emit_position(&mut self.outbox);
            self.outbox.push(SyncMsg::Direction {
                x: ball.direction().x,
                y: ball.direction().y,
            });
        }
        tracing::info!(seq = self.outbox.next_seq(), "promoted to authority");
        self.ball = Some(ball);
        self.commit();
    }

    pub fn demote(&mut self) {
        if self.ball.take().is_some() {
            tracing::info!("no longer authority");
        }
    }

    /// Another player left the room: drop their paddle and pause everywhere.
    pub fn on_player_left(&mut self, id: PeerId, nick: &str) {
        self.shadow.paddles.remove(&id);
        if self.started && !self.match_state.is_ended() {
            self.set_paused(true, &format!("{} disconnected", nick));
        }
    }

    /// Envelopes to send, in order.
    pub fn drain_outgoing(&mut self) -> Vec<SyncEnvelope> {
        self.commit();
        self.outbox.drain()
    }

    fn commit(&mut self) {
        for envelope in self.outbox.pending() {
            self.shadow.apply(envelope);
        }
    }

    pub fn shadow(&self) -> &ShadowState {
        &self.shadow
    }

    pub fn match_state(&self) -> &MatchState {
        &self.match_state
    }

    pub fn ball(&self) -> Option<&BallAuthority> {
        self.ball.as_ref()
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn local_id(&self) -> PeerId {
        self.local_id
    }

    #[cfg(test)]
    pub(crate) fn ball_mut(&mut self) -> Option<&mut BallAuthority> {
        self.ball.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::IdleInput;
    use crate::presentation::{RecordingPresentation, Shown};
    use pong_shared::vec2::Vec2;

    fn players() -> Vec<PlayerWire> {
        vec![
            PlayerWire {
                id: 1,
                nick: "host".to_string(),
                team: Some(Team::Zero),
                ready: true,
            },
            PlayerWire {
                id: 2,
                nick: "guest".to_string(),
                team: Some(Team::One),
                ready: true,
            },
        ]
    }

    fn host() -> Simulation<RecordingPresentation> {
        let mut sim = Simulation::new(MatchConfig::default(), 1, true, 5, RecordingPresentation::default());
        sim.start_match(&players());
        sim
    }

    fn guest() -> Simulation<RecordingPresentation> {
        Simulation::new(MatchConfig::default(), 2, false, 6, RecordingPresentation::default())
    }

    fn relay(from: &mut Simulation<RecordingPresentation>, from_id: PeerId, to: &mut Simulation<RecordingPresentation>) {
        for envelope in from.drain_outgoing() {
            to.apply_remote(from_id, &envelope);
        }
    }

    #[test]
    fn host_spawns_paddles_and_launches() {
        let mut sim = host();
        assert!(sim.is_authority());
        assert_eq!(sim.shadow().paddles.len(), 2);
        assert!(sim.ball().is_some_and(|b| b.is_moving()));

        let sent = sim.drain_outgoing();
        let spawns = sent
            .iter()
            .filter(|e| matches!(e.msg, SyncMsg::SpawnPaddle(_)))
            .count();
        assert_eq!(spawns, 2);
        assert!(sent.iter().any(|e| matches!(e.msg, SyncMsg::Direction { .. })));
    }

    #[test]
    fn guest_mirrors_host() {
        let mut h = host();
        let mut g = guest();
        relay(&mut h, 1, &mut g);

        assert!(g.is_started());
        assert!(!g.is_authority());
        assert_eq!(g.shadow().paddles.len(), 2);
        assert_eq!(g.shadow().ball.direction, h.shadow().ball.direction);
    }

    #[test]
    fn goal_on_four_three_ends_match() {
        let mut sim = host();
        for _ in 0..4 {
            sim.report_goal(Team::Zero);
        }
        for _ in 0..3 {
            sim.report_goal(Team::One);
        }
        assert_eq!(sim.match_state().score(), [4, 3]);
        assert!(!sim.match_state().is_ended());

        let outcome = sim.report_goal(Team::Zero);
        assert_eq!(
            outcome,
            GoalOutcome::Won {
                winner: Team::Zero,
                score: [5, 3]
            }
        );
        assert!(sim.match_state().is_ended());
        assert!(sim.ball().is_some_and(|b| !b.is_moving() && !b.serve_pending()));
        assert_eq!(sim.presentation().end_text(), Some("Team 1 wins!"));
        assert_eq!(sim.presentation().last_score(), Some((5, 3)));

        assert_eq!(sim.report_goal(Team::One), GoalOutcome::Ignored);
        assert_eq!(sim.match_state().score(), [5, 3]);
    }

    #[test]
    fn ended_match_stops_checking_goals() {
        let mut sim = host();
        for _ in 0..5 {
            sim.report_goal(Team::Zero);
        }
        assert!(sim.match_state().is_ended());
        if let Some(ball) = sim.ball_mut() {
            ball.place(Vec2::new(9.0, 0.0), Vec2::new(1.0, 0.0));
        }
        assert_eq!(sim.pending_goal(), None);

        let shown = sim.presentation().shown.len();
        sim.tick(1.0 / 60.0, &mut IdleInput);
        assert_eq!(sim.match_state().score(), [5, 0]);
        assert_eq!(sim.presentation().shown.len(), shown);
    }

    #[test]
    fn guest_sees_match_end() {
        let mut h = host();
        let mut g = guest();
        for _ in 0..5 {
            h.report_goal(Team::One);
        }
        relay(&mut h, 1, &mut g);
        assert!(g.match_state().is_ended());
        assert_eq!(g.match_state().score(), [0, 5]);
        assert_eq!(g.presentation().end_text(), Some("Team 2 wins!"));
    }

    #[test]
    fn goal_schedules_serve_from_centre() {
        let mut sim = host();
        sim.report_goal(Team::One);
        let ball = sim.ball().expect("host owns the ball");
        assert_eq!(ball.position(), Vec2::ZERO);
        assert!(ball.direction().x > 0.0);
        assert!(!ball.is_moving());
        assert!(ball.serve_pending());

        let mut idle = IdleInput;
        for _ in 0..70 {
            sim.tick(1.0 / 60.0, &mut idle);
        }
        assert!(sim.ball().is_some_and(|b| b.is_moving()));
    }

    #[test]
    fn ball_crossing_right_edge_scores_for_team_zero() {
        let mut sim = host();
        if let Some(ball) = sim.ball_mut() {
            ball.place(Vec2::new(8.45, 0.0), Vec2::new(1.0, 0.0));
        }
        sim.tick(0.05, &mut IdleInput);
        assert_eq!(sim.match_state().score(), [1, 0]);
        assert_eq!(sim.shadow().score, [1, 0]);
    }

    #[test]
    fn pause_stops_ball_and_is_broadcast() {
        let mut h = host();
        let mut g = guest();
        relay(&mut h, 1, &mut g);

        h.set_paused(true, "guest disconnected");
        assert!(h.ball().is_some_and(|b| !b.is_moving()));
        relay(&mut h, 1, &mut g);
        assert!(g.match_state().is_paused());
        assert!(g
            .presentation()
            .shown
            .contains(&Shown::Pause(true, "guest disconnected".to_string())));

        let before = h.ball().map(|b| b.position());
        h.tick(0.1, &mut IdleInput);
        assert_eq!(h.ball().map(|b| b.position()), before);
    }

    #[test]
    fn authority_ignores_remote_ball_state() {
        let mut h = host();
        let forged = SyncEnvelope {
            seq: 10_000,
            msg: SyncMsg::Score { team0: 4, team1: 4 },
        };
        assert!(!h.apply_remote(2, &forged));
        assert_eq!(h.match_state().score(), [0, 0]);
    }

    #[test]
    fn stale_remote_messages_dropped() {
        let mut g = guest();
        let newer = SyncEnvelope {
            seq: 5,
            msg: SyncMsg::Score { team0: 2, team1: 1 },
        };
        let older = SyncEnvelope {
            seq: 4,
            msg: SyncMsg::Score { team0: 1, team1: 1 },
        };
        assert!(g.apply_remote(1, &newer));
        assert!(!g.apply_remote(1, &older));
        assert_eq!(g.match_state().score(), [2, 1]);
    }

    #[test]
    fn guest_paddle_moves_and_syncs() {
        struct Up;
        impl InputSource for Up {
            fn axis(&mut self, _dt: f32, _view: &InputView) -> f32 {
                1.0
            }
        }

        let mut h = host();
        let mut g = guest();
        relay(&mut h, 1, &mut g);

        for _ in 0..10 {
            g.tick(1.0 / 60.0, &mut Up);
        }
        let spawn_y = MatchConfig::default().spawn_point(Team::One, 0).y;
        let guest_y = g.shadow().paddles.get(&2).map(|p| p.y).unwrap_or(spawn_y);
        assert!(guest_y > spawn_y);

        relay(&mut g, 2, &mut h);
        let seen_by_host = h.shadow().paddles.get(&2).map(|p| p.y).unwrap_or(spawn_y);
        assert!(seen_by_host > spawn_y);
        assert!(seen_by_host <= guest_y);
    }

    #[test]
    fn promotion_continues_sequence() {
        let mut h = host();
        let mut g = guest();
        relay(&mut h, 1, &mut g);
        let observed = g.shadow().highest_authority_seq();

        g.on_player_left(1, "host");
        g.promote();
        assert!(g.is_authority());
        assert!(g.match_state().is_paused());
        assert!(g.ball().is_some_and(|b| !b.is_moving()));

        let sent = g.drain_outgoing();
        assert!(!sent.is_empty());
        assert!(sent.iter().all(|e| e.seq > observed));
        assert!(!g.shadow().paddles.contains_key(&1));
    }

    #[test]
    fn player_left_pauses_with_nick() {
        let mut h = host();
        h.on_player_left(2, "Player_0042");
        assert!(h.match_state().is_paused());
        assert_eq!(h.shadow().pause_message, "Player_0042 disconnected");
    }
}
