// The stages of the tournament and their scheduling parameters.
pub mod checker;
pub mod fixture;
pub mod placeholder;
pub mod ranking;
pub mod repair;
pub mod resolver;
pub mod schedule_generator;
pub mod tournament;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, Time};

use crate::logic::{competition::fixture::{Fixture, Match}, error::Result, group::Group, time::{iso_date_format, slots_format}};

/// A phase of the tournament. The derived order is the order in which stages are played.
#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[derive(sqlx::Type)]
pub enum Stage {
    GroupStage,
    RoundOf16,
    Quarterfinal,
    Semifinal,
    Final,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::GroupStage,
        Stage::RoundOf16,
        Stage::Quarterfinal,
        Stage::Semifinal,
        Stage::Final,
    ];

    // Position of the stage in the tournament order.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn previous(self) -> Option<Stage> {
        match self.index() {
            0 => None,
            i => Some(Self::ALL[i - 1]),
        }
    }

    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.index() + 1).copied()
    }

    // Every stage played after this one.
    pub fn later_stages(self) -> impl Iterator<Item = Stage> {
        Self::ALL.into_iter().filter(move |stage| *stage > self)
    }

    pub fn is_knockout(self) -> bool {
        self != Stage::GroupStage
    }

    // Number of matches in a knockout stage. None for the group stage, which depends on the groups.
    pub fn knockout_matches(self) -> Option<usize> {
        match self {
            Stage::GroupStage => None,
            Stage::RoundOf16 => Some(8),
            Stage::Quarterfinal => Some(4),
            Stage::Semifinal => Some(2),
            Stage::Final => Some(1),
        }
    }

    // How many matches the stage should hold once generated.
    pub fn expected_matches(self, groups: &[Group]) -> usize {
        match self.knockout_matches() {
            Some(matches) => matches,
            None => groups.iter().map(Group::expected_matches).sum(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::GroupStage => "Group Stage",
            Stage::RoundOf16 => "Round of 16",
            Stage::Quarterfinal => "Quarterfinal",
            Stage::Semifinal => "Semifinal",
            Stage::Final => "Final",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "group" | "groups" | "groupstage" => Ok(Stage::GroupStage),
            "r16" | "roundof16" | "last16" => Ok(Stage::RoundOf16),
            "qf" | "quarterfinal" | "quarterfinals" => Ok(Stage::Quarterfinal),
            "sf" | "semifinal" | "semifinals" => Ok(Stage::Semifinal),
            "final" | "f" => Ok(Stage::Final),
            _ => Err(format!("unknown stage '{s}'")),
        }
    }
}

fn default_day_gap() -> u8 {
    1
}

/// Scheduling parameters of a stage. Stored in the Stage table so repairs and checks use the same values.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct StageFormat {
    pub stage: Stage,
    #[serde(with = "iso_date_format")]
    pub start_date: Date,
    pub matches_per_day: u8,
    #[serde(with = "slots_format")]
    pub time_slots: Vec<Time>,

    // Days between consecutive match days. 1 means consecutive days.
    #[serde(default = "default_day_gap")]
    pub day_gap: u8,
}

impl StageFormat {
    pub fn build(stage: Stage, start_date: Date, matches_per_day: u8, time_slots: Vec<Time>) -> Self {
        Self {
            stage,
            start_date,
            matches_per_day,
            time_slots,
            day_gap: default_day_gap(),
        }
    }

    pub fn with_day_gap(mut self, day_gap: u8) -> Self {
        self.day_gap = day_gap;
        self
    }

    // Check the parameters without any matches to place.
    pub fn validate(&self) -> Result<()> {
        schedule_generator::validate_spec(0, self.matches_per_day, &self.time_slots, self.day_gap)
    }

    // Schedule the fixtures with these parameters.
    pub fn schedule(&self, fixtures: &[Fixture]) -> Result<Vec<Match>> {
        schedule_generator::build(self.stage, fixtures, self.start_date, self.matches_per_day, &self.time_slots, self.day_gap)
    }

    // The dates and times the given number of matches should occupy, in slot order.
    pub fn day_slots(&self, matches: usize) -> Result<Vec<(Date, Time)>> {
        schedule_generator::day_slots(matches, self.start_date, self.matches_per_day, &self.time_slots, self.day_gap)
    }

    // Number of match days the stage should span.
    pub fn expected_days(&self, matches: usize) -> usize {
        match self.matches_per_day {
            0 => 0,
            mpd => matches.div_ceil(usize::from(mpd)),
        }
    }
}
