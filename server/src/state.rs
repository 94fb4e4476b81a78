use std::collections::HashMap;

use pong_shared::protocol::{
    PeerId, PlayersStateMsg, SyncEnvelope, WelcomeMsg, PROTOCOL_VERSION,
};
use pong_shared::team::Team;

use crate::config::ServerConfig;
use crate::room::{Departure, JoinError, Room, StartError};

/// Central relay state owned by the relay loop task.
pub struct RelayState {
    pub rooms: HashMap<String, Room>,
    /// Which room each connected player is in
    member_rooms: HashMap<PeerId, String>,
    config: ServerConfig,
    next_player_id: PeerId,
}

/// What the loop must announce after a player leaves.
#[derive(Debug)]
pub struct LeaveOutcome {
    pub room: String,
    pub departure: Departure,
    /// Room state after the departure; None when the room was dropped
    pub players_state: Option<PlayersStateMsg>,
}

impl RelayState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            member_rooms: HashMap::new(),
            config,
            next_player_id: 1,
        }
    }

    /// Join or create `room_name`. Returns the new player's id and welcome.
    pub fn join(&mut self, room_name: &str, nick: String) -> Result<(PeerId, WelcomeMsg), JoinError> {
        let capacity = self.config.max_players_per_room;
        let id = self.next_player_id;

        let room = self
            .rooms
            .entry(room_name.to_string())
            .or_insert_with(|| Room::new(room_name));
        let result = room.join(id, nick, capacity).map(|_| ());
        if let Err(e) = result {
            if room.is_empty() {
                self.rooms.remove(room_name);
            }
            return Err(e);
        }

        self.next_player_id += 1;
        self.member_rooms.insert(id, room_name.to_string());

        let welcome = WelcomeMsg {
            protocol_version: PROTOCOL_VERSION,
            self_id: id,
            room: room_name.to_string(),
            host_id: room.host_id().unwrap_or(id),
            players: room.players(),
            config: self.config.match_config,
        };
        Ok((id, welcome))
    }

    /// Remove a player. Empty rooms are dropped.
    pub fn leave(&mut self, id: PeerId) -> Option<LeaveOutcome> {
        let room_name = self.member_rooms.remove(&id)?;
        let room = self.rooms.get_mut(&room_name)?;
        let departure = room.leave(id)?;

        let players_state = if room.is_empty() {
            self.rooms.remove(&room_name);
            None
        } else {
            Some(players_state(room))
        };

        Some(LeaveOutcome {
            room: room_name,
            departure,
            players_state,
        })
    }

    /// Apply a property change. Returns the room and its new state if anything changed.
    pub fn set_properties(
        &mut self,
        id: PeerId,
        team: Option<Team>,
        ready: Option<bool>,
    ) -> Option<(String, PlayersStateMsg)> {
        let room = self.room_of_mut(id)?;
        if !room.set_properties(id, team, ready) {
            return None;
        }
        Some((room.name.clone(), players_state(room)))
    }

    pub fn start_match(&mut self, id: PeerId) -> Option<(String, Result<(), StartError>)> {
        let room = self.room_of_mut(id)?;
        let result = room.start(id);
        Some((room.name.clone(), result))
    }

    /// Check a sync envelope against the room's authority rules.
    /// Returns the room to relay into, or None if the envelope must be dropped.
    pub fn authorize_sync(&self, id: PeerId, envelope: &SyncEnvelope) -> Option<String> {
        let room_name = self.member_rooms.get(&id)?;
        let room = self.rooms.get(room_name)?;
        if room.authorize_sync(id, &envelope.msg) {
            Some(room_name.clone())
        } else {
            None
        }
    }

    pub fn players_state(&self, room_name: &str) -> Option<PlayersStateMsg> {
        self.rooms.get(room_name).map(players_state)
    }

    /// Current state of the room `id` is in.
    pub fn players_state_of(&self, id: PeerId) -> Option<(String, PlayersStateMsg)> {
        let room_name = self.member_rooms.get(&id)?;
        let room = self.rooms.get(room_name)?;
        Some((room_name.clone(), players_state(room)))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn room_of_mut(&mut self, id: PeerId) -> Option<&mut Room> {
        let room_name = self.member_rooms.get(&id)?;
        self.rooms.get_mut(room_name)
    }
}

fn players_state(room: &Room) -> PlayersStateMsg {
    PlayersStateMsg {
        host_id: room.host_id().unwrap_or_default(),
        players: room.players(),
    }
}
