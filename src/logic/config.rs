// Runtime configuration and tournament setup files.
use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};
use time::macros::{date, time};

use crate::logic::{competition::{Stage, StageFormat, ranking::PointsRules}, error::{Error, Result}, io::read_json_file};

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub points: PointsRules,
    #[serde(default = "default_stages")]
    pub stages: Vec<StageFormat>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            timeout_secs: default_timeout_secs(),
            points: PointsRules::default(),
            stages: default_stages(),
        }
    }
}

// Calendar of a 32-team tournament.
fn default_stages() -> Vec<StageFormat> {
    let slots = vec![time!(16:00), time!(18:00), time!(20:00), time!(22:00)];
    vec![
        StageFormat::build(Stage::GroupStage, date!(2025-06-11), 4, slots.clone()),
        StageFormat::build(Stage::RoundOf16, date!(2025-06-25), 4, slots),
        StageFormat::build(Stage::Quarterfinal, date!(2025-06-28), 2, vec![time!(18:00), time!(21:00)]),
        StageFormat::build(Stage::Semifinal, date!(2025-07-02), 1, vec![time!(21:00)]),
        StageFormat::build(Stage::Final, date!(2025-07-06), 1, vec![time!(20:00)]),
    ]
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = read_json_file(path)?;
        config.validate()?;
        return Ok(config);
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(Error::Config("database_url cannot be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".to_string()));
        }

        let mut seen = HashSet::new();
        for format in self.stages.iter() {
            if !seen.insert(format.stage) {
                return Err(Error::Config(format!("{} is configured twice", format.stage)));
            }
            format.validate().map_err(|e| Error::Config(format!("{}: {e}", format.stage)))?;
        }
        Ok(())
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageFormat> {
        self.stages.iter().find(|format| format.stage == stage)
    }
}

/// Groups and their teams in draw order.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct TournamentSetup {
    pub groups: Vec<GroupSetup>,
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct GroupSetup {
    pub label: char,
    // Defaults to the number of teams listed.
    #[serde(default)]
    pub team_count: Option<u8>,
    #[serde(default)]
    pub teams: Vec<String>,
}

impl TournamentSetup {
    pub fn load(path: &Path) -> Result<Self> {
        read_json_file(path)
    }
}

impl GroupSetup {
    pub fn team_count(&self) -> Result<u8> {
        match self.team_count {
            Some(count) => Ok(count),
            None => u8::try_from(self.teams.len())
                .map_err(|_| Error::Validation(format!("group {} lists too many teams", self.label))),
        }
    }
}
