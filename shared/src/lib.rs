//! Types shared by the relay and the game peers: tuning, wire protocol,
//! teams and the shadow-state reducer.

pub mod config;
pub mod protocol;
pub mod shadow;
pub mod team;
pub mod vec2;
