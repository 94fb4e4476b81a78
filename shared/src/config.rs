use crate::team::Team;
use crate::vec2::Vec2;

/// Match tuning. The relay hands this to every peer in its welcome so the
/// authority and the shadows agree on geometry.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchConfig {
    /// Ball speed (units/s)
    pub ball_speed: f32,
    pub ball_radius: f32,
    /// Ball bounces off the top/bottom walls past this |y|
    pub vertical_limit: f32,
    /// A goal is scored once |x| passes this
    pub horizontal_limit: f32,
    /// Steepest paddle return, in degrees from the horizontal
    pub max_bounce_angle_deg: f32,
    /// Paddle speed at full input (units/s)
    pub paddle_move_speed: f32,
    pub paddle_min_y: f32,
    pub paddle_max_y: f32,
    pub paddle_half_height: f32,
    pub paddle_half_width: f32,
    /// Delay between a goal and the next serve (seconds)
    pub serve_delay: f32,
    /// Max |y| of the unnormalized serve direction after a goal
    pub serve_spread: f32,
    /// Max |y| of the unnormalized direction of the very first launch
    pub launch_spread: f32,
    pub winning_score: u32,
    /// Spawn points for team 0 (left side). Team 1 uses the mirror image.
    pub spawn_points: [[f32; 2]; 2],
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            ball_speed: 7.5,
            ball_radius: 0.2,
            vertical_limit: 4.25,
            horizontal_limit: 8.5,
            max_bounce_angle_deg: 45.0,
            paddle_move_speed: 6.0,
            paddle_min_y: -3.75,
            paddle_max_y: 3.75,
            paddle_half_height: 0.75,
            paddle_half_width: 0.15,
            serve_delay: 1.0,
            serve_spread: 0.45,
            launch_spread: 0.35,
            winning_score: 5,
            spawn_points: [[-7.5, 1.5], [-5.5, -1.5]],
        }
    }
}

impl MatchConfig {
    pub fn max_bounce_angle(&self) -> f32 {
        self.max_bounce_angle_deg.to_radians()
    }

    /// Spawn point `index` for `team`, cycling through the team's points.
    pub fn spawn_point(&self, team: Team, index: usize) -> Vec2 {
        let [x, y] = self.spawn_points[index % self.spawn_points.len()];
        match team {
            Team::Zero => Vec2::new(x, y),
            Team::One => Vec2::new(-x, y),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.ball_speed.is_finite() || self.ball_speed <= 0.0 {
            return Err("ball_speed must be finite and > 0".to_string());
        }
        if !self.vertical_limit.is_finite() || self.vertical_limit <= 0.0 {
            return Err("vertical_limit must be finite and > 0".to_string());
        }
        if !self.horizontal_limit.is_finite() || self.horizontal_limit <= 0.0 {
            return Err("horizontal_limit must be finite and > 0".to_string());
        }
        if !(0.0..90.0).contains(&self.max_bounce_angle_deg) {
            return Err("max_bounce_angle_deg must be in [0, 90)".to_string());
        }
        if self.paddle_min_y > self.paddle_max_y {
            return Err("paddle_min_y must be <= paddle_max_y".to_string());
        }
        if !self.paddle_half_height.is_finite() || self.paddle_half_height <= 0.0 {
            return Err("paddle_half_height must be finite and > 0".to_string());
        }
        if !self.serve_delay.is_finite() || self.serve_delay < 0.0 {
            return Err("serve_delay must be finite and >= 0".to_string());
        }
        if !self.serve_spread.is_finite() || self.serve_spread < 0.0 {
            return Err("serve_spread must be finite and >= 0".to_string());
        }
        if !self.launch_spread.is_finite() || self.launch_spread < 0.0 {
            return Err("launch_spread must be finite and >= 0".to_string());
        }
        if self.winning_score == 0 {
            return Err("winning_score must be > 0".to_string());
        }
        for [x, _] in self.spawn_points {
            if x >= 0.0 || x.abs() >= self.horizontal_limit {
                return Err("spawn points must lie on the left half, inside the field".to_string());
            }
        }
        Ok(())
    }
}
