//! Headless Pong peer.
//!
//! Each peer runs the same `Simulation`. The room host owns the ball and the
//! score and publishes sequenced sync messages; every other peer folds those
//! into its shadow state and only moves its own paddle.

pub mod ball;
pub mod config;
pub mod game_loop;
pub mod input;
pub mod match_state;
pub mod net;
pub mod outbox;
pub mod paddle;
pub mod presentation;
pub mod serve;
pub mod session;
pub mod simulation;
