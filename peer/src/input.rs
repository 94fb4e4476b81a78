//! Where a paddle's 1-D axis comes from. The headless peer drives its paddle
//! with a simple tracking bot.

use pong_shared::vec2::Vec2;

/// What an input source may look at when choosing its axis.
#[derive(Debug, Clone, Copy)]
pub struct InputView {
    pub paddle_y: f32,
    pub ball_position: Vec2,
    pub ball_direction: Vec2,
}

pub trait InputSource {
    /// Axis in [-1, 1] for this tick.
    fn axis(&mut self, dt: f32, view: &InputView) -> f32;
}

/// Never moves.
#[derive(Debug, Default)]
pub struct IdleInput;

impl InputSource for IdleInput {
    fn axis(&mut self, _dt: f32, _view: &InputView) -> f32 {
        0.0
    }
}

const DEAD_ZONE: f32 = 0.15;
const REACTION_MIN: f32 = 0.08;
const REACTION_MAX: f32 = 0.25;
const AIM_JITTER: f32 = 0.4;
/// How far ahead along the ball's heading the bot aims
const LEAD: f32 = 1.0;

/// Follows the ball height, leaning toward where it is heading, with a
/// reaction delay and a little aim error.
#[derive(Debug)]
pub struct BotInput {
    target_y: f32,
    reaction: f32,
    seed: u32,
}

impl BotInput {
    pub fn new(seed: u32) -> Self {
        Self {
            target_y: 0.0,
            reaction: 0.0,
            seed: seed.max(1),
        }
    }

    fn next_random(&mut self) -> f32 {
        self.seed = self.seed.wrapping_mul(1664525).wrapping_add(1013904223) & 0x7fff_ffff;
        self.seed as f32 / 0x7fff_ffffu32 as f32
    }
}

impl Default for BotInput {
    fn default() -> Self {
        Self::new(1)
    }
}

impl InputSource for BotInput {
    fn axis(&mut self, dt: f32, view: &InputView) -> f32 {
        self.reaction -= dt;
        if self.reaction <= 0.0 {
            self.reaction = REACTION_MIN + self.next_random() * (REACTION_MAX - REACTION_MIN);
            let jitter = (self.next_random() * 2.0 - 1.0) * AIM_JITTER;
            self.target_y = view.ball_position.y + view.ball_direction.y * LEAD + jitter;
        }

        let error = self.target_y - view.paddle_y;
        if error.abs() < DEAD_ZONE {
            0.0
        } else {
            error.signum()
        }
    }
}
