// Fixtures (who plays whom) and the scheduled matches built from them.
use serde::{Deserialize, Serialize};
use time::{Date, Time};

use crate::logic::{competition::{Stage, placeholder::{Placeholder, Source}}, error::{Error, Result}, types::{Goals, GroupId, MatchId, Slot, TeamId}};

#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize)]
#[derive(sqlx::Type)]
pub enum HomeAway {
    Home,
    Away,
}

/// One side of a fixture. Knockout sides keep their placeholder after it has been resolved.
#[derive(Debug, Default, Clone, Copy)]
#[derive(PartialEq, Eq, Hash)]
#[derive(Serialize)]
pub struct Side {
    pub placeholder: Option<Placeholder>,
    pub team_id: Option<TeamId>,
}

impl Side {
    pub fn team(team_id: TeamId) -> Self {
        Self { placeholder: None, team_id: Some(team_id) }
    }

    pub fn placeholder(placeholder: Placeholder) -> Self {
        Self { placeholder: Some(placeholder), team_id: None }
    }

    pub fn is_resolved(&self) -> bool {
        self.team_id.is_some()
    }

    // The placeholder if it is still waiting for a team.
    pub fn pending(&self) -> Option<Placeholder> {
        match self.team_id {
            Some(_) => None,
            None => self.placeholder,
        }
    }

    // What identifies this side when looking for duplicates: the team once known, the placeholder until then.
    pub fn participant(&self) -> Option<Participant> {
        match (self.team_id, self.placeholder) {
            (Some(team_id), _) => Some(Participant::Team(team_id)),
            (None, Some(placeholder)) => Some(Participant::Placeholder(placeholder)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Participant {
    Team(TeamId),
    Placeholder(Placeholder),
}

/// A pairing waiting for a date and a time.
#[derive(Debug, Default, Clone, Copy)]
#[derive(PartialEq, Eq)]
pub struct Fixture {
    pub group_id: Option<GroupId>,
    pub home: Side,
    pub away: Side,
}

impl Fixture {
    pub fn teams(group_id: GroupId, home: TeamId, away: TeamId) -> Self {
        Self {
            group_id: Some(group_id),
            home: Side::team(home),
            away: Side::team(away),
        }
    }

    pub fn placeholders(home: Placeholder, away: Placeholder) -> Self {
        Self {
            group_id: None,
            home: Side::placeholder(home),
            away: Side::placeholder(away),
        }
    }
}

#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq)]
#[derive(Serialize)]
pub struct Score {
    pub home_goals: Goals,
    pub away_goals: Goals,
    // Only for knockout matches that ended level.
    pub shootout_winner: Option<HomeAway>,
}

impl Score {
    pub fn build(home_goals: Goals, away_goals: Goals, shootout_winner: Option<HomeAway>) -> Self {
        Self { home_goals, away_goals, shootout_winner }
    }

    // The side that won, if any.
    pub fn winner(&self) -> Option<HomeAway> {
        if self.home_goals > self.away_goals {
            return Some(HomeAway::Home);
        }
        if self.away_goals > self.home_goals {
            return Some(HomeAway::Away);
        }
        self.shootout_winner
    }

    pub fn validate(&self, stage: Stage) -> Result<()> {
        let level = self.home_goals == self.away_goals;
        match (stage.is_knockout(), level, self.shootout_winner) {
            (true, true, None) => Err(Error::Validation(format!("a level {stage} match needs a shootout winner"))),
            (true, false, Some(_)) => Err(Error::Validation("a shootout winner is only recorded for level matches".to_string())),
            (false, _, Some(_)) => Err(Error::Validation("group matches have no shootouts".to_string())),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
#[derive(PartialEq, Eq)]
#[derive(Serialize)]
pub struct Match {
    pub id: MatchId,
    pub stage: Stage,
    pub slot: Slot,
    pub group_id: Option<GroupId>,
    pub date: Date,
    pub time_slot: Time,
    pub home: Side,
    pub away: Side,
    pub score: Option<Score>,
}

// Basics.
impl Match {
    // Build an unsaved match from a fixture.
    pub fn build(stage: Stage, slot: Slot, fixture: &Fixture, date: Date, time_slot: Time) -> Self {
        Self {
            id: MatchId::default(),
            stage,
            slot,
            group_id: fixture.group_id,
            date,
            time_slot,
            home: fixture.home,
            away: fixture.away,
            score: None,
        }
    }

    pub fn fixture(&self) -> Fixture {
        Fixture {
            group_id: self.group_id,
            home: self.home,
            away: self.away,
        }
    }

    pub fn side(&self, side: HomeAway) -> &Side {
        match side {
            HomeAway::Home => &self.home,
            HomeAway::Away => &self.away,
        }
    }

    pub fn side_mut(&mut self, side: HomeAway) -> &mut Side {
        match side {
            HomeAway::Home => &mut self.home,
            HomeAway::Away => &mut self.away,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.home.is_resolved() && self.away.is_resolved()
    }

    // Whether the match has a result that names a winner, or a group result.
    pub fn is_decided(&self) -> bool {
        match (&self.score, self.stage.is_knockout()) {
            (None, _) => false,
            (Some(score), true) => score.winner().is_some(),
            (Some(_), false) => true,
        }
    }

    // Winner and loser of a decided knockout match.
    pub fn winner_loser(&self) -> Option<(TeamId, TeamId)> {
        let home = self.home.team_id?;
        let away = self.away.team_id?;
        match self.score.as_ref()?.winner()? {
            HomeAway::Home => Some((home, away)),
            HomeAway::Away => Some((away, home)),
        }
    }

    // Placeholders that still wait for a team.
    pub fn pending(&self) -> Vec<(HomeAway, Placeholder)> {
        [HomeAway::Home, HomeAway::Away].into_iter()
            .filter_map(|side| self.side(side).pending().map(|p| (side, p)))
            .collect()
    }

    // The unordered participant pair, smaller first.
    pub fn participants(&self) -> Option<(Participant, Participant)> {
        let home = self.home.participant()?;
        let away = self.away.participant()?;
        Some(if home <= away { (home, away) } else { (away, home) })
    }

    // Two matches with the same key are the same fixture played twice.
    pub fn duplicate_key(&self) -> (Date, Time, Option<(Participant, Participant)>) {
        (self.date, self.time_slot, self.participants())
    }
}

// Validation.
impl Match {
    // Check the shape of the match for its stage.
    pub fn validate(&self) -> Result<()> {
        if self.slot == 0 {
            return Err(Error::Validation("bracket slots start from 1".to_string()));
        }

        if self.stage.is_knockout() {
            self.validate_knockout()?;
        }
        else {
            self.validate_group()?;
        }

        if let (Some(home), Some(away)) = (self.home.team_id, self.away.team_id) {
            if home == away {
                return Err(Error::Validation(format!("team {home} cannot play itself")));
            }
        }

        if let Some(score) = &self.score {
            score.validate(self.stage)?;
        }
        Ok(())
    }

    fn validate_group(&self) -> Result<()> {
        if self.group_id.is_none() {
            return Err(Error::Validation("a group stage match must belong to a group".to_string()));
        }
        if self.home.placeholder.is_some() || self.away.placeholder.is_some() {
            return Err(Error::Validation("group stage matches are between known teams".to_string()));
        }
        if !self.is_resolved() {
            return Err(Error::Validation("a group stage match needs two teams".to_string()));
        }
        Ok(())
    }

    fn validate_knockout(&self) -> Result<()> {
        if self.group_id.is_some() {
            return Err(Error::Validation(format!("a {} match does not belong to a group", self.stage)));
        }

        for side in [&self.home, &self.away] {
            let placeholder = match side.placeholder {
                Some(p) => p,
                None => return Err(Error::Validation(format!("both sides of a {} match need a placeholder", self.stage))),
            };

            if let Source::Slot { stage, slot } = placeholder.source {
                if stage >= self.stage || !stage.is_knockout() {
                    return Err(Error::Validation(format!("{placeholder} must come from an earlier knockout stage than {}", self.stage)));
                }
                let slots = stage.knockout_matches().unwrap_or_default();
                if slot == 0 || usize::from(slot) > slots {
                    return Err(Error::Validation(format!("{stage} has no slot {slot}")));
                }
            }
        }

        if self.home.placeholder == self.away.placeholder {
            return Err(Error::Validation(format!("both sides of a {} match are the same placeholder", self.stage)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, time};

    use super::*;

    fn knockout(home: Placeholder, away: Placeholder) -> Match {
        Match::build(Stage::RoundOf16, 1, &Fixture::placeholders(home, away), date!(2025-06-25), time!(16:00))
    }

    #[test]
    fn duplicates_match_in_either_order() {
        let mut a = knockout(Placeholder::winner_of_group('A'), Placeholder::runner_up_of_group('B'));
        let mut b = knockout(Placeholder::runner_up_of_group('B'), Placeholder::winner_of_group('A'));
        assert_eq!(a.duplicate_key(), b.duplicate_key());

        // A resolved side is compared by its team.
        b.home.team_id = Some(7);
        assert_ne!(a.duplicate_key(), b.duplicate_key());
        a.away.team_id = Some(7);
        assert_eq!(a.duplicate_key(), b.duplicate_key());

        b.time_slot = time!(18:00);
        assert_ne!(a.duplicate_key(), b.duplicate_key());
    }

    #[test]
    fn knockout_shape_is_validated() {
        assert!(knockout(Placeholder::winner_of_group('A'), Placeholder::runner_up_of_group('B')).validate().is_ok());

        let same = knockout(Placeholder::winner_of_group('A'), Placeholder::winner_of_group('A'));
        assert!(matches!(same.validate(), Err(Error::Validation(_))));

        let forward = knockout(Placeholder::winner_of(Stage::Quarterfinal, 1), Placeholder::winner_of_group('A'));
        assert!(matches!(forward.validate(), Err(Error::Validation(_))));

        let mut mixed = knockout(Placeholder::winner_of_group('A'), Placeholder::runner_up_of_group('B'));
        mixed.away = Side::team(3);
        assert!(matches!(mixed.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn group_matches_carry_teams_only() {
        let m = Match::build(Stage::GroupStage, 1, &Fixture::teams(1, 1, 2), date!(2025-06-11), time!(16:00));
        assert!(m.validate().is_ok());

        let mut itself = m.clone();
        itself.away = Side::team(1);
        assert!(matches!(itself.validate(), Err(Error::Validation(_))));

        let mut no_group = m.clone();
        no_group.group_id = None;
        assert!(matches!(no_group.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn knockout_winner_needs_a_shootout_when_level() {
        assert_eq!(Score::build(2, 1, None).winner(), Some(HomeAway::Home));
        assert_eq!(Score::build(1, 1, Some(HomeAway::Away)).winner(), Some(HomeAway::Away));
        assert!(Score::build(1, 1, None).validate(Stage::RoundOf16).is_err());
        assert!(Score::build(1, 1, None).validate(Stage::GroupStage).is_ok());
        assert!(Score::build(1, 1, Some(HomeAway::Home)).validate(Stage::GroupStage).is_err());
        assert!(Score::build(2, 1, Some(HomeAway::Home)).validate(Stage::Final).is_err());
    }

    #[test]
    fn winner_and_loser_follow_the_score() {
        let mut m = knockout(Placeholder::winner_of_group('A'), Placeholder::runner_up_of_group('B'));
        m.home.team_id = Some(1);
        m.away.team_id = Some(2);
        assert_eq!(m.winner_loser(), None);
        assert!(!m.is_decided());

        m.score = Some(Score::build(0, 0, Some(HomeAway::Away)));
        assert_eq!(m.winner_loser(), Some((2, 1)));
        assert!(m.is_decided());
    }
}
