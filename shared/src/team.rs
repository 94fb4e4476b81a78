//! Teams and the lobby rules built on the per-player `team`/`ready` properties.

use crate::protocol::PlayerWire;
use serde::{Deserialize, Serialize};

/// One of the two sides. On the wire a team is its index, 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub enum Team {
    /// Defends the left goal, scores past +x
    Zero,
    /// Defends the right goal, scores past -x
    One,
}

impl Team {
    pub const ALL: [Team; 2] = [Team::Zero, Team::One];

    /// Map any integer onto a team, clamping out-of-range values.
    pub fn from_index(index: i64) -> Self {
        if index >= 1 {
            Team::One
        } else {
            Team::Zero
        }
    }

    pub fn index(self) -> usize {
        match self {
            Team::Zero => 0,
            Team::One => 1,
        }
    }

    /// Player-facing name. Teams are numbered from 1 on screen.
    pub fn label(self) -> &'static str {
        match self {
            Team::Zero => "Team 1",
            Team::One => "Team 2",
        }
    }

    /// Terminal message shown when this team wins.
    pub fn victory_message(self) -> String {
        format!("{} wins!", self.label())
    }

    /// Paddle colour (0xRRGGBB).
    pub fn color(self) -> u32 {
        match self {
            Team::Zero => 0x3d8bfd,
            Team::One => 0xf25c54,
        }
    }
}

impl From<i64> for Team {
    fn from(index: i64) -> Self {
        Team::from_index(index)
    }
}

impl From<Team> for u8 {
    fn from(team: Team) -> Self {
        team.index() as u8
    }
}

/// Pick a team for a player who has none: the smaller side, ties to team 0.
pub fn auto_assign<I>(existing: I) -> Team
where
    I: IntoIterator<Item = Option<Team>>,
{
    let mut counts = [0usize; 2];
    for team in existing.into_iter().flatten() {
        counts[team.index()] += 1;
    }
    if counts[1] < counts[0] {
        Team::One
    } else {
        Team::Zero
    }
}

pub fn team_size(players: &[PlayerWire], team: Team) -> usize {
    players.iter().filter(|p| p.team == Some(team)).count()
}

/// Host may start once both sides are staffed and everyone is ready.
pub fn can_start(players: &[PlayerWire]) -> bool {
    let staffed = Team::ALL.iter().all(|t| team_size(players, *t) > 0);
    staffed && players.iter().all(|p| p.ready)
}

/// One-line lobby summary, e.g. `Team 1: 2 | Team 2: 1 · Ready: 2/3`.
pub fn lobby_status(players: &[PlayerWire]) -> String {
    let ready = players.iter().filter(|p| p.ready).count();
    format!(
        "{}: {} | {}: {} · Ready: {}/{}",
        Team::Zero.label(),
        team_size(players, Team::Zero),
        Team::One.label(),
        team_size(players, Team::One),
        ready,
        players.len()
    )
}
