// Functions and methods for ranking teams within a group.
//
// The order is fixed: points, goal difference, goals scored, head-to-head points
// and head-to-head goal difference among the teams still level, draw position, team id.
use std::{cmp::Ordering, collections::HashMap};

use serde::{Deserialize, Serialize};

use crate::logic::{competition::fixture::Match, group::Group, team::Team, types::TeamId};

// Points given for each result.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct PointsRules {
    pub win: u8,
    pub draw: u8,
    pub loss: u8,
}

impl Default for PointsRules {
    fn default() -> Self {
        Self { win: 3, draw: 1, loss: 0 }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
#[derive(Serialize)]
pub struct TeamStanding {
    pub team_id: TeamId,
    pub position: u8,
    pub played: u8,
    pub wins: u8,
    pub draws: u8,
    pub losses: u8,
    pub goals_scored: u16,
    pub goals_conceded: u16,
    pub points: u16,

    // Only counted among teams level on points, goal difference and goals scored.
    pub h2h_points: u16,
    pub h2h_goal_difference: i16,
}

impl TeamStanding {
    fn build(team: &Team) -> Self {
        Self {
            team_id: team.id,
            position: team.position,
            ..Default::default()
        }
    }

    pub fn goal_difference(&self) -> i16 {
        self.goals_scored as i16 - self.goals_conceded as i16
    }

    fn add_result(&mut self, scored: u8, conceded: u8, points: &PointsRules) {
        self.played += 1;
        self.goals_scored += u16::from(scored);
        self.goals_conceded += u16::from(conceded);

        match scored.cmp(&conceded) {
            Ordering::Greater => {
                self.wins += 1;
                self.points += u16::from(points.win);
            },
            Ordering::Equal => {
                self.draws += 1;
                self.points += u16::from(points.draw);
            },
            Ordering::Less => {
                self.losses += 1;
                self.points += u16::from(points.loss);
            },
        }
    }

    // The values the first three criteria look at.
    fn level_key(&self) -> (u16, i16, u16) {
        (self.points, self.goal_difference(), self.goals_scored)
    }
}

// What ranking criteria the group table uses.
#[derive(Debug, Clone, Copy)]
#[derive(Eq, Hash, PartialEq)]
pub enum RankCriteria {
    Points,
    GoalDifference,
    GoalsScored,
    HeadToHeadPoints,
    HeadToHeadGoalDifference,
    DrawPosition,   // Lower is better.
    TeamId,         // Lower is better.
}

pub const TIEBREAK_ORDER: [RankCriteria; 7] = [
    RankCriteria::Points,
    RankCriteria::GoalDifference,
    RankCriteria::GoalsScored,
    RankCriteria::HeadToHeadPoints,
    RankCriteria::HeadToHeadGoalDifference,
    RankCriteria::DrawPosition,
    RankCriteria::TeamId,
];

type CmpFunc = fn (&TeamStanding, &TeamStanding) -> Ordering;

// Compare functions here.

fn compare_points(a: &TeamStanding, b: &TeamStanding) -> Ordering {
    b.points.cmp(&a.points)
}

fn compare_goal_difference(a: &TeamStanding, b: &TeamStanding) -> Ordering {
    b.goal_difference().cmp(&a.goal_difference())
}

fn compare_goals_scored(a: &TeamStanding, b: &TeamStanding) -> Ordering {
    b.goals_scored.cmp(&a.goals_scored)
}

fn compare_h2h_points(a: &TeamStanding, b: &TeamStanding) -> Ordering {
    b.h2h_points.cmp(&a.h2h_points)
}

fn compare_h2h_goal_difference(a: &TeamStanding, b: &TeamStanding) -> Ordering {
    b.h2h_goal_difference.cmp(&a.h2h_goal_difference)
}

fn compare_draw_position(a: &TeamStanding, b: &TeamStanding) -> Ordering {
    a.position.cmp(&b.position)
}

fn compare_team_id(a: &TeamStanding, b: &TeamStanding) -> Ordering {
    a.team_id.cmp(&b.team_id)
}

// Get the available sort functions.
pub fn get_sort_functions() -> HashMap<RankCriteria, CmpFunc> {
    let mut functions: HashMap<RankCriteria, CmpFunc> = HashMap::new();
    functions.insert(RankCriteria::Points, compare_points);
    functions.insert(RankCriteria::GoalDifference, compare_goal_difference);
    functions.insert(RankCriteria::GoalsScored, compare_goals_scored);
    functions.insert(RankCriteria::HeadToHeadPoints, compare_h2h_points);
    functions.insert(RankCriteria::HeadToHeadGoalDifference, compare_h2h_goal_difference);
    functions.insert(RankCriteria::DrawPosition, compare_draw_position);
    functions.insert(RankCriteria::TeamId, compare_team_id);
    return functions;
}

/// The group table, or how far the group is from being final.
#[derive(Debug, Clone, PartialEq)]
pub enum Standings {
    Final(Vec<TeamStanding>),
    NotFinal { played: usize, expected: usize },
}

impl Standings {
    // Team at the given 1-based rank of a final table.
    pub fn team_at(&self, rank: usize) -> Option<TeamId> {
        match self {
            Standings::Final(table) => table.get(rank.checked_sub(1)?).map(|s| s.team_id),
            Standings::NotFinal { .. } => None,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Standings::Final(_))
    }
}

// Build the standings of a group from its teams and matches.
// The group is final once it is fully populated and every one of its round robin matches has a score.
pub fn standings(group: &Group, teams: &[Team], matches: &[Match], points: &PointsRules) -> Standings {
    let expected = group.expected_matches();
    let played = matches.iter().filter(|m| m.score.is_some()).count();

    if teams.len() != usize::from(group.team_count) || matches.len() != expected || played != expected {
        return Standings::NotFinal { played, expected };
    }

    Standings::Final(rank_teams(teams, matches, points))
}

// Get the teams in the order of betterhood.
pub fn rank_teams(teams: &[Team], matches: &[Match], points: &PointsRules) -> Vec<TeamStanding> {
    let mut table: Vec<TeamStanding> = teams.iter().map(TeamStanding::build).collect();
    tally(&mut table, matches, points, |_, _| true);

    // Head-to-head mini tables for every set of teams level on the first three criteria.
    let mut level: HashMap<(u16, i16, u16), Vec<TeamId>> = HashMap::new();
    for team in table.iter() {
        level.entry(team.level_key()).or_default().push(team.team_id);
    }

    for tied in level.values().filter(|ids| ids.len() > 1) {
        let mut mini: Vec<TeamStanding> = table.iter()
            .filter(|s| tied.contains(&s.team_id))
            .map(|s| TeamStanding { team_id: s.team_id, ..Default::default() })
            .collect();
        tally(&mut mini, matches, points, |home, away| tied.contains(&home) && tied.contains(&away));

        for entry in mini {
            if let Some(team) = table.iter_mut().find(|s| s.team_id == entry.team_id) {
                team.h2h_points = entry.points;
                team.h2h_goal_difference = entry.goal_difference();
            }
        }
    }

    sort_table(&mut table);
    return table;
}

// Sort with the fixed criteria. Every criterion compares a stored value, so the order is total.
fn sort_table(table: &mut [TeamStanding]) {
    let sort_functions = get_sort_functions();
    table.sort_by(|a, b| {
        let mut order = Ordering::Equal;
        for criterium in TIEBREAK_ORDER.iter() {
            order = sort_functions[criterium](a, b);
            if order.is_ne() { break; }
        }
        order
    });
}

// Add every scored match between teams accepted by the filter to the table.
fn tally<F>(table: &mut [TeamStanding], matches: &[Match], points: &PointsRules, include: F)
where F: Fn(TeamId, TeamId) -> bool {
    for game in matches {
        let (Some(score), Some(home_id), Some(away_id)) = (&game.score, game.home.team_id, game.away.team_id) else {
            continue;
        };
        if !include(home_id, away_id) { continue; }

        if let Some(home) = table.iter_mut().find(|s| s.team_id == home_id) {
            home.add_result(score.home_goals, score.away_goals, points);
        }
        if let Some(away) = table.iter_mut().find(|s| s.team_id == away_id) {
            away.add_result(score.away_goals, score.home_goals, points);
        }
    }
}
