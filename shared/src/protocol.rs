use serde::{Deserialize, Serialize};

use crate::config::MatchConfig;
use crate::team::Team;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Relay-assigned player identifier, unique per relay process.
pub type PeerId = u32;

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMsg),
    #[serde(rename = "players_state")]
    PlayersState(PlayersStateMsg),
    #[serde(rename = "host_changed")]
    HostChanged(HostChangedMsg),
    #[serde(rename = "match_started")]
    MatchStarted,
    #[serde(rename = "player_left")]
    PlayerLeft(PlayerLeftMsg),
    #[serde(rename = "join_rejected")]
    JoinRejected(JoinRejectedMsg),
    #[serde(rename = "sync")]
    Sync(RelayedSyncMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub self_id: PeerId,
    pub room: String,
    pub host_id: PeerId,
    pub players: Vec<PlayerWire>,
    pub config: MatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayersStateMsg {
    pub host_id: PeerId,
    pub players: Vec<PlayerWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostChangedMsg {
    pub host_id: PeerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerLeftMsg {
    pub id: PeerId,
    pub nick: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRejectedMsg {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayedSyncMsg {
    pub from: PeerId,
    pub envelope: SyncEnvelope,
}

/// A room member and its custom properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerWire {
    pub id: PeerId,
    pub nick: String,
    #[serde(default)]
    pub team: Option<Team>,
    #[serde(default)]
    pub ready: bool,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    /// Update the sender's own custom properties. Absent fields are untouched.
    #[serde(rename = "set_properties")]
    SetProperties {
        #[serde(default)]
        team: Option<Team>,
        #[serde(default)]
        ready: Option<bool>,
    },
    #[serde(rename = "start_match")]
    StartMatch,
    #[serde(rename = "sync")]
    Sync { envelope: SyncEnvelope },
}

// === Peer <-> Peer (relayed) ===

/// A sync message stamped with the sender's monotonic sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEnvelope {
    pub seq: u64,
    pub msg: SyncMsg,
}

/// State deltas published by peers. Everything except `Paddle` comes from the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncMsg {
    /// Replace the shadow ball direction (renormalized on apply)
    Direction { x: f32, y: f32 },
    /// Replace the shadow ball position verbatim
    Position { pos: [f32; 3] },
    Score { team0: u32, team1: u32 },
    Pause { paused: bool, message: String },
    MatchEnd { winner: Team, message: String },
    SpawnPaddle(PaddleSpawn),
    /// Owner-published paddle height
    Paddle {
        #[serde(rename = "ownerId")]
        owner_id: PeerId,
        y: f32,
    },
}

/// Spawn data for a paddle. Owner and team are optional on the wire so a
/// malformed spawn can be detected and the paddle left inert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaddleSpawn {
    #[serde(default)]
    pub owner_id: Option<PeerId>,
    #[serde(default)]
    pub team: Option<Team>,
    pub x: f32,
    pub y: f32,
    pub color: u32,
}

/// Independent last-write-wins streams. Sequence numbers are compared per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStream {
    Direction,
    Position,
    Score,
    Pause,
    MatchEnd,
    Spawn(PeerId),
    Paddle(PeerId),
    /// Spawns with no owner; never deduplicated
    Orphan,
}

impl SyncMsg {
    pub fn stream(&self) -> SyncStream {
        match self {
            SyncMsg::Direction { .. } => SyncStream::Direction,
            SyncMsg::Position { .. } => SyncStream::Position,
            SyncMsg::Score { .. } => SyncStream::Score,
            SyncMsg::Pause { .. } => SyncStream::Pause,
            SyncMsg::MatchEnd { .. } => SyncStream::MatchEnd,
            SyncMsg::SpawnPaddle(spawn) => match spawn.owner_id {
                Some(owner) => SyncStream::Spawn(owner),
                None => SyncStream::Orphan,
            },
            SyncMsg::Paddle { owner_id, .. } => SyncStream::Paddle(*owner_id),
        }
    }

    /// Whether only the authority may publish this message.
    pub fn requires_authority(&self) -> bool {
        !matches!(self, SyncMsg::Paddle { .. })
    }
}
