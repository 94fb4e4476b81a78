//! One-way sink for what a player would see: score, pause overlay, end screen.

pub trait Presentation {
    fn update_score(&mut self, team0: u32, team1: u32);
    fn show_pause(&mut self, visible: bool, text: &str);
    fn show_end(&mut self, visible: bool, text: &str);
}

/// Headless presentation that writes to the log.
#[derive(Debug, Default)]
pub struct LogPresentation;

impl Presentation for LogPresentation {
    fn update_score(&mut self, team0: u32, team1: u32) {
        tracing::info!("Score {} - {}", team0, team1);
    }

    fn show_pause(&mut self, visible: bool, text: &str) {
        if visible {
            tracing::info!("Paused: {}", text);
        } else {
            tracing::info!("Resumed");
        }
    }

    fn show_end(&mut self, visible: bool, text: &str) {
        if visible {
            tracing::info!("{}", text);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    Score(u32, u32),
    Pause(bool, String),
    End(bool, String),
}

/// Records every call, for tests and tooling.
#[derive(Debug, Default)]
pub struct RecordingPresentation {
    pub shown: Vec<Shown>,
}

impl RecordingPresentation {
    pub fn last_score(&self) -> Option<(u32, u32)> {
        self.shown.iter().rev().find_map(|s| match s {
            Shown::Score(a, b) => Some((*a, *b)),
            _ => None,
        })
    }

    pub fn end_text(&self) -> Option<&str> {
        self.shown.iter().rev().find_map(|s| match s {
            Shown::End(true, text) => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Presentation for RecordingPresentation {
    fn update_score(&mut self, team0: u32, team1: u32) {
        self.shown.push(Shown::Score(team0, team1));
    }

    fn show_pause(&mut self, visible: bool, text: &str) {
        self.shown.push(Shown::Pause(visible, text.to_string()));
    }

    fn show_end(&mut self, visible: bool, text: &str) {
        self.shown.push(Shown::End(visible, text.to_string()));
    }
}
