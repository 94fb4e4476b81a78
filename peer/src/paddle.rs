//! Paddle spawning, owner-local movement and ball contact geometry.

use pong_shared::config::MatchConfig;
use pong_shared::protocol::{PaddleSpawn, PlayerWire};
use pong_shared::shadow::PaddleState;
use pong_shared::team::Team;
use pong_shared::vec2::Vec2;

/// Spawn data for every player, cycling each team through its spawn points.
/// Players without a team property default to team 0.
pub fn spawn_layout(players: &[PlayerWire], config: &MatchConfig) -> Vec<PaddleSpawn> {
    let mut next_index = [0usize; 2];
    players
        .iter()
        .map(|player| {
            let team = player.team.unwrap_or(Team::Zero);
            let slot = &mut next_index[team.index()];
            let point = config.spawn_point(team, *slot);
            *slot += 1;
            PaddleSpawn {
                owner_id: Some(player.id),
                team: Some(team),
                x: point.x,
                y: point.y,
                color: team.color(),
            }
        })
        .collect()
}

/// Move an owned paddle by one tick of input. `axis` is clamped to [-1, 1].
/// Returns true if the paddle moved.
pub fn apply_input(paddle: &mut PaddleState, axis: f32, dt: f32, config: &MatchConfig) -> bool {
    if !paddle.initialized {
        return false;
    }
    let delta = axis.clamp(-1.0, 1.0) * config.paddle_move_speed * dt;
    if delta.abs() < f32::EPSILON {
        return false;
    }
    let before = paddle.y;
    paddle.y = (paddle.y + delta).clamp(config.paddle_min_y, config.paddle_max_y);
    paddle.y != before
}

/// Whether the ball circle at `ball` overlaps the paddle rectangle.
pub fn overlaps(paddle: &PaddleState, ball: Vec2, config: &MatchConfig) -> bool {
    let nearest_x = ball
        .x
        .clamp(paddle.x - config.paddle_half_width, paddle.x + config.paddle_half_width);
    let nearest_y = ball
        .y
        .clamp(paddle.y - config.paddle_half_height, paddle.y + config.paddle_half_height);
    let dx = ball.x - nearest_x;
    let dy = ball.y - nearest_y;
    dx * dx + dy * dy <= config.ball_radius * config.ball_radius
}
