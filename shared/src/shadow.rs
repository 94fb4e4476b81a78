//! A peer's local view of the match, driven only by sync messages.
//!
//! `ShadowState::apply` is the reducer every peer runs on incoming envelopes
//! (the authority also runs it on its own outgoing ones). Each `SyncStream`
//! is last-write-wins by sequence number, so a late or reordered envelope
//! never overwrites a newer one.

use std::collections::HashMap;

use crate::protocol::{PaddleSpawn, PeerId, SyncEnvelope, SyncMsg, SyncStream};
use crate::team::Team;
use crate::vec2::{normalize, Vec2};

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowBall {
    pub position: Vec2,
    pub direction: Vec2,
}

impl Default for ShadowBall {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            direction: Vec2::new(1.0, 0.0),
        }
    }
}

/// Paddle as known to this peer. `initialized` is false for a paddle whose
/// spawn data was incomplete; such a paddle never moves.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddleState {
    pub owner_id: PeerId,
    pub team: Team,
    pub x: f32,
    pub y: f32,
    pub color: u32,
    pub initialized: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ShadowState {
    pub ball: ShadowBall,
    pub score: [u32; 2],
    pub paused: bool,
    pub pause_message: String,
    /// Winner and terminal message once the match is over
    pub ended: Option<(Team, String)>,
    pub paddles: HashMap<PeerId, PaddleState>,
    /// Spawns that arrived without an owner, kept so they can be reported
    pub inert_spawns: Vec<PaddleSpawn>,
    last_seq: HashMap<SyncStream, u64>,
}

impl ShadowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an envelope. Returns false when it was dropped as stale.
    pub fn apply(&mut self, envelope: &SyncEnvelope) -> bool {
        let stream = envelope.msg.stream();
        if stream != SyncStream::Orphan {
            if let Some(&last) = self.last_seq.get(&stream) {
                if envelope.seq <= last {
                    tracing::trace!(?stream, seq = envelope.seq, last, "dropping stale sync");
                    return false;
                }
            }
            self.last_seq.insert(stream, envelope.seq);
        }

        match &envelope.msg {
            SyncMsg::Direction { x, y } => {
                self.ball.direction = normalize(Vec2::new(*x, *y));
            }
            SyncMsg::Position { pos } => {
                self.ball.position = Vec2::from_wire(*pos);
            }
            SyncMsg::Score { team0, team1 } => {
                self.score = [*team0, *team1];
            }
            SyncMsg::Pause { paused, message } => {
                self.paused = *paused;
                self.pause_message = message.clone();
            }
            SyncMsg::MatchEnd { winner, message } => {
                self.ended = Some((*winner, message.clone()));
            }
            SyncMsg::SpawnPaddle(spawn) => self.apply_spawn(spawn),
            SyncMsg::Paddle { owner_id, y } => {
                if let Some(paddle) = self.paddles.get_mut(owner_id) {
                    if paddle.initialized {
                        paddle.y = *y;
                    }
                }
            }
        }
        true
    }

    fn apply_spawn(&mut self, spawn: &PaddleSpawn) {
        match (spawn.owner_id, spawn.team) {
            (Some(owner_id), Some(team)) => {
                self.paddles.insert(
                    owner_id,
                    PaddleState {
                        owner_id,
                        team,
                        x: spawn.x,
                        y: spawn.y,
                        color: spawn.color,
                        initialized: true,
                    },
                );
            }
            (Some(owner_id), None) => {
                tracing::error!(owner_id, "paddle spawned without a team; leaving it inert");
                self.paddles.insert(
                    owner_id,
                    PaddleState {
                        owner_id,
                        team: Team::Zero,
                        x: spawn.x,
                        y: spawn.y,
                        color: spawn.color,
                        initialized: false,
                    },
                );
            }
            (None, _) => {
                tracing::error!("paddle spawned without an owner; leaving it inert");
                self.inert_spawns.push(spawn.clone());
            }
        }
    }

    /// Highest sequence seen on any authority-published stream.
    pub fn highest_authority_seq(&self) -> u64 {
        self.last_seq
            .iter()
            .filter(|(stream, _)| !matches!(stream, SyncStream::Paddle(_)))
            .map(|(_, seq)| *seq)
            .max()
            .unwrap_or(0)
    }

    /// Record a locally produced value without going through an envelope.
    pub fn set_paused(&mut self, paused: bool, message: &str) {
        self.paused = paused;
        self.pause_message = message.to_string();
    }
}
