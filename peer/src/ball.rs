//! The authoritative ball. Only the host ever holds a `BallAuthority`;
//! every other peer follows the ball through its shadow state.

use rand::Rng;

use pong_shared::config::MatchConfig;
use pong_shared::protocol::SyncMsg;
use pong_shared::shadow::{PaddleState, ShadowBall};
use pong_shared::team::Team;
use pong_shared::vec2::{add, from_angle, normalize, scale, sign, Vec2};

use crate::outbox::Outbox;
use crate::paddle;
use crate::serve::ServeTimer;

#[derive(Debug)]
pub struct BallAuthority {
    position: Vec2,
    direction: Vec2,
    speed: f32,
    movement_enabled: bool,
    serve: ServeTimer,
}

impl BallAuthority {
    /// A resting ball at the centre spot.
    pub fn new(config: &MatchConfig) -> Self {
        Self {
            position: Vec2::ZERO,
            direction: Vec2::new(1.0, 0.0),
            speed: config.ball_speed,
            movement_enabled: false,
            serve: ServeTimer::new(),
        }
    }

    /// Take over a ball last seen through sync messages (host migration).
    pub fn from_shadow(ball: &ShadowBall, config: &MatchConfig) -> Self {
        Self {
            position: ball.position,
            direction: normalize(ball.direction),
            ..Self::new(config)
        }
    }

    /// Initial kick-off: random side, shallow random angle.
    pub fn launch<R: Rng + ?Sized>(&mut self, config: &MatchConfig, rng: &mut R, out: &mut Outbox) {
        let x = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let y = random_spread(rng, config.launch_spread);
        self.position = Vec2::ZERO;
        self.direction = normalize(Vec2::new(x, y));
        out.push(SyncMsg::Position {
            pos: self.position.to_wire(),
        });
        self.emit_direction(out);
        tracing::debug!(x = self.direction.x, y = self.direction.y, "ball launched");
    }

    pub fn tick(&mut self, dt: f32) {
        if !self.movement_enabled {
            return;
        }
        self.position = add(self.position, scale(self.direction, self.speed * dt));
    }

    /// Reflect off the top/bottom wall. Returns true if the ball bounced.
    pub fn bounce_off_walls(&mut self, limit: f32, out: &mut Outbox) -> bool {
        if self.position.y.abs() <= limit {
            return false;
        }
        self.direction.y = -self.direction.y;
        self.position.y = self.position.y.clamp(-limit, limit);
        self.emit_direction(out);
        true
    }

    /// Which team scored, if the ball has left the field horizontally.
    pub fn goal_scored_by(&self, limit: f32) -> Option<Team> {
        if self.position.x > limit {
            Some(Team::Zero)
        } else if self.position.x < -limit {
            Some(Team::One)
        } else {
            None
        }
    }

    /// Overlapping the paddle while still travelling toward it.
    pub fn collides_with(&self, paddle: &PaddleState, config: &MatchConfig) -> bool {
        if !paddle.initialized {
            return false;
        }
        let approaching = (paddle.x - self.position.x) * self.direction.x > 0.0;
        approaching && paddle::overlaps(paddle, self.position, config)
    }

    /// Return the ball at an angle set by where it struck the paddle, away from the paddle's side.
    pub fn bounce_off_paddle(&mut self, paddle: &PaddleState, config: &MatchConfig, out: &mut Outbox) {
        let offset = ((self.position.y - paddle.y) / config.paddle_half_height).clamp(-1.0, 1.0);
        let angle = offset * config.max_bounce_angle();
        let x_sign = sign(self.position.x - paddle.x);
        self.direction = from_angle(angle, x_sign);
        self.emit_direction(out);
    }

    /// Recentre after a goal and schedule the next serve toward the conceding side's opponent.
    pub fn prepare_next_serve<R: Rng + ?Sized>(
        &mut self,
        scoring_team: Team,
        config: &MatchConfig,
        rng: &mut R,
        out: &mut Outbox,
    ) {
        self.movement_enabled = false;
        self.position = Vec2::ZERO;
        out.push(SyncMsg::Position {
            pos: self.position.to_wire(),
        });

        let x = match scoring_team {
            Team::Zero => -1.0,
            Team::One => 1.0,
        };
        let y = random_spread(rng, config.serve_spread);
        self.direction = normalize(Vec2::new(x, y));
        self.emit_direction(out);

        let handle = self.serve.schedule(config.serve_delay);
        tracing::debug!(?handle, scoring_team = scoring_team.index(), "serve scheduled");
    }

    /// Disabling cancels a pending serve. Enabling while a serve is pending
    /// leaves the ball resting until the serve fires.
    pub fn set_movement_enabled(&mut self, enabled: bool) {
        if !enabled {
            if let Some(handle) = self.serve.cancel() {
                tracing::debug!(?handle, "pending serve cancelled");
            }
            self.movement_enabled = false;
            return;
        }
        if !self.serve.is_pending() {
            self.movement_enabled = true;
        }
    }

    /// Advance the serve delay. When it expires the ball moves again if `allowed`.
    /// Returns true on the tick the serve fired.
    pub fn advance_serve(&mut self, dt: f32, allowed: bool) -> bool {
        match self.serve.advance(dt) {
            Some(handle) => {
                tracing::debug!(?handle, allowed, "serve fired");
                self.movement_enabled = allowed;
                true
            }
            None => false,
        }
    }

    pub fn emit_position(&self, out: &mut Outbox) {
        out.push(SyncMsg::Position {
            pos: self.position.to_wire(),
        });
    }

    fn emit_direction(&self, out: &mut Outbox) {
        out.push(SyncMsg::Direction {
            x: self.direction.x,
            y: self.direction.y,
        });
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn is_moving(&self) -> bool {
        self.movement_enabled
    }

    pub fn serve_pending(&self) -> bool {
        self.serve.is_pending()
    }

    #[cfg(test)]
    pub(crate) fn place(&mut self, position: Vec2, direction: Vec2) {
        self.position = position;
        self.direction = direction;
    }
}

fn random_spread<R: Rng + ?Sized>(rng: &mut R, spread: f32) -> f32 {
    if !(spread.is_finite() && spread > 0.0) {
        return 0.0;
    }
    rng.gen_range(-spread..=spread)
}
