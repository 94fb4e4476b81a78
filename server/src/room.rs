use pong_shared::protocol::{PeerId, PlayerWire, SyncMsg};
use pong_shared::team::{auto_assign, can_start, Team};

/// A room member and its custom properties
#[derive(Debug, Clone)]
pub struct Member {
    pub id: PeerId,
    pub nick: String,
    pub team: Option<Team>,
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Room is full")]
    Full,
    #[error("Match already in progress")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    #[error("only the host can start the match")]
    NotHost,
    #[error("each team needs a player and everyone must be ready")]
    NotReady,
    #[error("match already started")]
    AlreadyStarted,
}

/// Result of a member leaving
#[derive(Debug)]
pub struct Departure {
    pub member: Member,
    /// Set when the leaving member was host and someone else took over
    pub new_host: Option<PeerId>,
}

/// A relay room. Members are kept in join order; the host is the oldest member.
#[derive(Debug)]
pub struct Room {
    pub name: String,
    members: Vec<Member>,
    host_id: Option<PeerId>,
    /// Closed once the match starts
    open: bool,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            host_id: None,
            open: true,
        }
    }

    /// Add a member, auto-assigning a team. The first member becomes host.
    pub fn join(&mut self, id: PeerId, nick: String, capacity: usize) -> Result<&Member, JoinError> {
        if !self.open {
            return Err(JoinError::Closed);
        }
        if self.members.len() >= capacity {
            return Err(JoinError::Full);
        }

        let team = auto_assign(self.members.iter().map(|m| m.team));
        self.members.push(Member {
            id,
            nick,
            team: Some(team),
            ready: false,
        });
        if self.host_id.is_none() {
            self.host_id = Some(id);
        }
        Ok(&self.members[self.members.len() - 1])
    }

    /// Remove a member. Host migrates to the oldest remaining member.
    pub fn leave(&mut self, id: PeerId) -> Option<Departure> {
        let idx = self.members.iter().position(|m| m.id == id)?;
        let member = self.members.remove(idx);

        let mut new_host = None;
        if self.host_id == Some(id) {
            self.host_id = self.members.first().map(|m| m.id);
            new_host = self.host_id;
        }
        Some(Departure { member, new_host })
    }

    /// Update a member's properties. Returns true if anything changed.
    pub fn set_properties(&mut self, id: PeerId, team: Option<Team>, ready: Option<bool>) -> bool {
        let Some(member) = self.members.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        let mut changed = false;
        if let Some(team) = team {
            if member.team != Some(team) {
                member.team = Some(team);
                changed = true;
            }
        }
        if let Some(ready) = ready {
            if member.ready != ready {
                member.ready = ready;
                changed = true;
            }
        }
        changed
    }

    /// Start the match on the host's request and close the room.
    pub fn start(&mut self, requested_by: PeerId) -> Result<(), StartError> {
        if self.host_id != Some(requested_by) {
            return Err(StartError::NotHost);
        }
        if !self.open {
            return Err(StartError::AlreadyStarted);
        }
        if !can_start(&self.players()) {
            return Err(StartError::NotReady);
        }
        self.open = false;
        Ok(())
    }

    /// Whether `from` may publish `msg` to the room.
    pub fn authorize_sync(&self, from: PeerId, msg: &SyncMsg) -> bool {
        if !self.contains(from) {
            return false;
        }
        match msg {
            SyncMsg::Paddle { owner_id, .. } => *owner_id == from,
            _ => self.host_id == Some(from),
        }
    }

    pub fn players(&self) -> Vec<PlayerWire> {
        self.members
            .iter()
            .map(|m| PlayerWire {
                id: m.id,
                nick: m.nick.clone(),
                team: m.team,
                ready: m.ready,
            })
            .collect()
    }

    pub fn host_id(&self) -> Option<PeerId> {
        self.host_id
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
