// Methods for generating fixtures and giving them dates and kick-off times.
use std::{collections::HashSet, iter::zip};

use time::{Date, Time};

use crate::logic::{competition::{Stage, fixture::{Fixture, Match}, placeholder::Placeholder}, error::{Error, Result}, group::Group, team::Team, time::days_after, types::{Slot, TeamId}};

// Generate a single round robin with the circle method.
// Returns the rounds, each a list of [home, away] pairs. An odd number of teams gets one bye per round.
pub fn round_robin(teams: &[TeamId]) -> Vec<Vec<[TeamId; 2]>> {
    let mut circle: Vec<Option<TeamId>> = teams.iter().copied().map(Some).collect();
    if circle.len() % 2 != 0 {
        circle.push(None);  // The bye.
    }

    let n = circle.len();
    if n < 2 { return Vec::new(); }

    let mut rounds = Vec::new();
    for round in 0..n - 1 {
        let mut pairs = Vec::new();
        for i in 0..n / 2 {
            let (Some(a), Some(b)) = (circle[i], circle[n - 1 - i]) else {
                continue;
            };

            // The fixed team would always be at home otherwise.
            if i == 0 && round % 2 == 1 {
                pairs.push([b, a]);
            }
            else {
                pairs.push([a, b]);
            }
        }
        rounds.push(pairs);

        // Keep the first team in place and turn the rest of the circle.
        circle[1..].rotate_right(1);
    }

    return rounds;
}

// Generate the group stage fixtures: round by round, and within a round, group by group in label order.
pub fn group_stage_fixtures(groups: &[(Group, Vec<Team>)]) -> Result<Vec<Fixture>> {
    let mut sorted: Vec<&(Group, Vec<Team>)> = groups.iter().collect();
    sorted.sort_by_key(|(group, _)| group.label);

    let mut group_rounds = Vec::new();
    for (group, teams) in sorted {
        if teams.len() != usize::from(group.team_count) {
            return Err(Error::Validation(format!(
                "group {} has {} of its {} teams", group.label, teams.len(), group.team_count
            )));
        }

        let mut ordered: Vec<&Team> = teams.iter().collect();
        ordered.sort_by_key(|team| team.position);
        let ids: Vec<TeamId> = ordered.iter().map(|team| team.id).collect();
        group_rounds.push((group.id, round_robin(&ids)));
    }

    let max_rounds = group_rounds.iter().map(|(_, rounds)| rounds.len()).max().unwrap_or(0);
    let mut fixtures = Vec::new();
    for round in 0..max_rounds {
        for (group_id, rounds) in group_rounds.iter() {
            let Some(pairs) = rounds.get(round) else { continue };
            for [home, away] in pairs {
                fixtures.push(Fixture::teams(*group_id, *home, *away));
            }
        }
    }

    return Ok(fixtures);
}

// Generate the fixtures of a knockout stage.
// The Round of 16 crosses neighbouring groups (A with B, C with D...), later stages pair consecutive slots.
pub fn knockout_fixtures(stage: Stage, group_labels: &[char]) -> Result<Vec<Fixture>> {
    let Some(matches) = stage.knockout_matches() else {
        return Err(Error::InvalidScheduleSpec(format!("{stage} is not a knockout stage")));
    };

    let previous = stage.previous().unwrap_or(Stage::GroupStage);
    if previous == Stage::GroupStage {
        return round_of_16_fixtures(stage, matches, group_labels);
    }

    let mut fixtures = Vec::new();
    for k in 1..=matches {
        let first = slot(2 * k - 1)?;
        let second = slot(2 * k)?;
        fixtures.push(Fixture::placeholders(
            Placeholder::winner_of(previous, first),
            Placeholder::winner_of(previous, second),
        ));
    }
    return Ok(fixtures);
}

fn round_of_16_fixtures(stage: Stage, matches: usize, group_labels: &[char]) -> Result<Vec<Fixture>> {
    let mut labels = group_labels.to_vec();
    labels.sort();
    labels.dedup();

    // Winner and runner-up of every group go through.
    if labels.len() != matches {
        return Err(Error::InvalidScheduleSpec(format!(
            "the {stage} needs {matches} groups to fill {} places, there are {}", matches * 2, labels.len()
        )));
    }

    let mut fixtures = Vec::new();
    for pair in labels.chunks_exact(2) {
        let (a, b) = (pair[0], pair[1]);
        fixtures.push(Fixture::placeholders(Placeholder::winner_of_group(a), Placeholder::runner_up_of_group(b)));
        fixtures.push(Fixture::placeholders(Placeholder::winner_of_group(b), Placeholder::runner_up_of_group(a)));
    }
    return Ok(fixtures);
}

fn slot(index: usize) -> Result<Slot> {
    Slot::try_from(index).map_err(|_| Error::InvalidScheduleSpec(format!("slot {index} is out of range")))
}

// Check the chunking request before anything is scheduled.
pub fn validate_spec(matches: usize, matches_per_day: u8, time_slots: &[Time], day_gap: u8) -> Result<()> {
    if matches_per_day == 0 {
        return Err(Error::InvalidScheduleSpec("matches per day must be at least 1".to_string()));
    }
    if day_gap == 0 {
        return Err(Error::InvalidScheduleSpec("the day gap must be at least 1".to_string()));
    }
    if matches % usize::from(matches_per_day) != 0 {
        return Err(Error::InvalidScheduleSpec(format!(
            "{matches} matches do not fill days of {matches_per_day}"
        )));
    }
    if time_slots.len() < usize::from(matches_per_day) {
        return Err(Error::InvalidScheduleSpec(format!(
            "{} time slots cannot hold {matches_per_day} matches a day", time_slots.len()
        )));
    }

    let distinct: HashSet<&Time> = time_slots.iter().collect();
    if distinct.len() != time_slots.len() {
        return Err(Error::InvalidScheduleSpec("time slots must be distinct".to_string()));
    }
    Ok(())
}

// The date and time of every match position: chunk i is played day_gap * i days after the start,
// match j of a chunk takes time slot j.
pub fn day_slots(matches: usize, start_date: Date, matches_per_day: u8, time_slots: &[Time], day_gap: u8) -> Result<Vec<(Date, Time)>> {
    validate_spec(matches, matches_per_day, time_slots, day_gap)?;

    let per_day = usize::from(matches_per_day);
    let mut slots = Vec::with_capacity(matches);
    for i in 0..matches {
        let day = u32::try_from(i / per_day)
            .map_err(|_| Error::InvalidScheduleSpec(format!("{matches} matches is too many")))?;
        let date = days_after(start_date, day * u32::from(day_gap))?;
        slots.push((date, time_slots[i % per_day]));
    }

    return Ok(slots);
}

// Give each fixture a date and a time slot. The fixture's position becomes its bracket slot.
pub fn build(stage: Stage, fixtures: &[Fixture], start_date: Date, matches_per_day: u8, time_slots: &[Time], day_gap: u8) -> Result<Vec<Match>> {
    let slots = day_slots(fixtures.len(), start_date, matches_per_day, time_slots, day_gap)?;

    let mut matches = Vec::with_capacity(fixtures.len());
    for (i, (fixture, (date, time_slot))) in zip(fixtures.iter(), slots.into_iter()).enumerate() {
        matches.push(Match::build(stage, slot(i + 1)?, fixture, date, time_slot));
    }

    return Ok(matches);
}
