use pong_shared::team::Team;

/// What a goal report did to the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalOutcome {
    /// Match already over; nothing changed
    Ignored,
    Scored { score: [u32; 2] },
    /// This goal ended the match
    Won { winner: Team, score: [u32; 2] },
}

/// Score and the pause/end flags. Mutated by the authority; mirrored on shadows.
#[derive(Debug, Clone)]
pub struct MatchState {
    score: [u32; 2],
    ended: bool,
    paused: bool,
    winning_score: u32,
}

impl MatchState {
    pub fn new(winning_score: u32) -> Self {
        Self {
            score: [0, 0],
            ended: false,
            paused: false,
            winning_score,
        }
    }

    pub fn report_goal(&mut self, scoring_team: Team) -> GoalOutcome {
        if self.ended {
            return GoalOutcome::Ignored;
        }
        self.score[scoring_team.index()] += 1;

        if self.score.iter().any(|s| *s >= self.winning_score) {
            self.ended = true;
            GoalOutcome::Won {
                winner: scoring_team,
                score: self.score,
            }
        } else {
            GoalOutcome::Scored { score: self.score }
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Overwrite from a received correction.
    pub fn mirror_score(&mut self, score: [u32; 2]) {
        self.score = score;
    }

    pub fn mark_ended(&mut self) {
        self.ended = true;
    }

    pub fn allow_ball_movement(&self) -> bool {
        !self.ended && !self.paused
    }

    pub fn allow_player_input(&self) -> bool {
        !self.ended && !self.paused
    }

    pub fn score(&self) -> [u32; 2] {
        self.score
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}
