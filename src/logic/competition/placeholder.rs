// Symbolic references to teams that are decided by an earlier stage.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::logic::{competition::Stage, types::Slot};

#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
pub enum Role {
    Winner,
    // Second in a group, or the loser of a knockout match.
    RunnerUp,
}

impl Role {
    // Rank in the group table that the role refers to.
    pub fn rank(self) -> usize {
        match self {
            Role::Winner => 1,
            Role::RunnerUp => 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
pub enum Source {
    // A group, by its label.
    Group(char),
    // A match of an earlier knockout stage, by its bracket slot.
    Slot { stage: Stage, slot: Slot },
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Group(label) => write!(f, "Group {label}"),
            Source::Slot { stage, slot } => write!(f, "{stage} #{slot}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
pub struct Placeholder {
    pub role: Role,
    pub source: Source,
}

impl Placeholder {
    pub fn winner_of_group(label: char) -> Self {
        Self { role: Role::Winner, source: Source::Group(label) }
    }

    pub fn runner_up_of_group(label: char) -> Self {
        Self { role: Role::RunnerUp, source: Source::Group(label) }
    }

    pub fn winner_of(stage: Stage, slot: Slot) -> Self {
        Self { role: Role::Winner, source: Source::Slot { stage, slot } }
    }

    pub fn loser_of(stage: Stage, slot: Slot) -> Self {
        Self { role: Role::RunnerUp, source: Source::Slot { stage, slot } }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match (self.role, self.source) {
            (Role::Winner, _) => "Winner",
            (Role::RunnerUp, Source::Group(_)) => "Runner-up",
            (Role::RunnerUp, Source::Slot { .. }) => "Loser",
        };
        write!(f, "{role} {}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_read_like_a_bracket() {
        assert_eq!(Placeholder::winner_of_group('A').to_string(), "Winner Group A");
        assert_eq!(Placeholder::runner_up_of_group('B').to_string(), "Runner-up Group B");
        assert_eq!(Placeholder::winner_of(Stage::RoundOf16, 3).to_string(), "Winner Round of 16 #3");
        assert_eq!(Placeholder::loser_of(Stage::Semifinal, 1).to_string(), "Loser Semifinal #1");
    }

    #[test]
    fn json_form_is_stable() {
        let json = serde_json::to_string(&Placeholder::winner_of_group('C')).unwrap();
        assert_eq!(json, r#"{"role":"Winner","source":{"Group":"C"}}"#);

        let back: Placeholder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Placeholder::winner_of_group('C'));
    }
}
