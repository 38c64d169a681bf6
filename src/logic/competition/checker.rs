// Consistency checks over the stored schedule of one stage.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use time::Date;
use tracing::{debug, warn};

use crate::logic::{app_data::AppData, competition::{Stage, StageFormat, fixture::Match, placeholder::Placeholder, ranking::PointsRules, resolver::SourceCache}, error::Result, group::Group, time::{date_to_string, days_after, slot_to_string}, types::{Conn, GroupId, MatchId, TeamId}};

#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize)]
pub enum ViolationKind {
    WrongDayCount,
    UnevenMatchesPerDay,
    DuplicateFixture,
    OrphanedPlaceholder,
    StaleResolution,
    MissingTeamCount,
}

/// A problem found in the schedule, with the ids a repair needs to act on it.
#[derive(Debug, Clone)]
#[derive(PartialEq, Eq)]
#[derive(Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub detail: String,
    pub match_ids: Vec<MatchId>,
    pub group_id: Option<GroupId>,
}

impl Violation {
    fn build(kind: ViolationKind, detail: String, mut match_ids: Vec<MatchId>) -> Self {
        match_ids.sort();
        Self { kind, detail, match_ids, group_id: None }
    }
}

/// Everything the checks look at, read in one go.
#[derive(Debug, Clone)]
pub struct StageSnapshot {
    pub format: StageFormat,
    pub matches: Vec<Match>,
    // Declared groups with the number of teams they actually hold.
    pub groups: Vec<(Group, usize)>,
    // The team each placeholder of the stage stands for, if its source is decided.
    pub outcomes: HashMap<Placeholder, TeamId>,
}

impl StageSnapshot {
    pub fn stage(&self) -> Stage {
        self.format.stage
    }

    fn expected_matches(&self) -> usize {
        let groups: Vec<Group> = self.groups.iter().map(|(group, _)| group.clone()).collect();
        self.stage().expected_matches(&groups)
    }
}

// Run every check on the snapshot. Violations come sorted by kind, then detail.
pub fn check_snapshot(snapshot: &StageSnapshot) -> Vec<Violation> {
    let mut violations = Vec::new();
    violations.extend(check_day_count(snapshot));
    violations.extend(check_matches_per_day(snapshot));
    violations.extend(check_duplicates(snapshot));
    violations.extend(check_orphans(snapshot));
    violations.extend(check_stale_resolutions(snapshot));
    if snapshot.stage() == Stage::GroupStage {
        violations.extend(check_team_counts(snapshot));
    }

    violations.sort_by(|a, b| {
        a.kind.cmp(&b.kind)
            .then_with(|| a.detail.cmp(&b.detail))
            .then_with(|| a.match_ids.cmp(&b.match_ids))
    });
    return violations;
}

fn matches_by_date(matches: &[Match]) -> BTreeMap<Date, Vec<MatchId>> {
    let mut days: BTreeMap<Date, Vec<MatchId>> = BTreeMap::new();
    for m in matches {
        days.entry(m.date).or_default().push(m.id);
    }
    days
}

// The stage should span exactly the days its parameters give it.
fn check_day_count(snapshot: &StageSnapshot) -> Option<Violation> {
    let format = &snapshot.format;
    let expected_days = format.expected_days(snapshot.expected_matches());
    let days = matches_by_date(&snapshot.matches);

    if days.len() != expected_days {
        return Some(Violation::build(
            ViolationKind::WrongDayCount,
            format!("{} is played on {} day(s), expected {expected_days}", format.stage, days.len()),
            snapshot.matches.iter().map(|m| m.id).collect(),
        ));
    }

    // Right number of days, but on the wrong dates.
    let mut expected_dates = BTreeSet::new();
    for i in 0..expected_days {
        let date = u32::try_from(i).ok()
            .and_then(|i| i.checked_mul(u32::from(format.day_gap)))
            .and_then(|offset| days_after(format.start_date, offset).ok());

        match date {
            Some(date) => { expected_dates.insert(date); },
            None => return Some(Violation::build(
                ViolationKind::WrongDayCount,
                format!("day {} of {} falls outside the calendar", i + 1, format.stage),
                snapshot.matches.iter().map(|m| m.id).collect(),
            )),
        }
    }

    let stray: Vec<(&Date, &Vec<MatchId>)> = days.iter().filter(|(date, _)| !expected_dates.contains(*date)).collect();
    if stray.is_empty() {
        return None;
    }

    let dates: Vec<String> = stray.iter().map(|(date, _)| date_to_string(**date)).collect();
    Some(Violation::build(
        ViolationKind::WrongDayCount,
        format!("{} has matches on unexpected dates {}", format.stage, dates.join(", ")),
        stray.into_iter().flat_map(|(_, ids)| ids.iter().copied()).collect(),
    ))
}

fn check_matches_per_day(snapshot: &StageSnapshot) -> Vec<Violation> {
    let per_day = usize::from(snapshot.format.matches_per_day);
    matches_by_date(&snapshot.matches).into_iter()
        .filter(|(_, ids)| ids.len() != per_day)
        .map(|(date, ids)| Violation::build(
            ViolationKind::UnevenMatchesPerDay,
            format!("{} has {} match(es), expected {per_day}", date_to_string(date), ids.len()),
            ids,
        ))
        .collect()
}

// Same date, same time, same pair of participants.
fn check_duplicates(snapshot: &StageSnapshot) -> Vec<Violation> {
    let mut sets: BTreeMap<_, Vec<&Match>> = BTreeMap::new();
    for m in snapshot.matches.iter() {
        let (date, time, participants) = m.duplicate_key();
        let Some(pair) = participants else { continue };
        sets.entry((date, time, pair)).or_default().push(m);
    }

    sets.into_values()
        .filter(|set| set.len() > 1)
        .map(|set| {
            let first = set[0];
            Violation::build(
                ViolationKind::DuplicateFixture,
                format!(
                    "{} v {} on {} at {} is scheduled {} times",
                    side_label(first, true), side_label(first, false),
                    date_to_string(first.date), slot_to_string(first.time_slot), set.len()
                ),
                set.iter().map(|m| m.id).collect(),
            )
        })
        .collect()
}

fn side_label(m: &Match, home: bool) -> String {
    let side = if home { &m.home } else { &m.away };
    match (side.placeholder, side.team_id) {
        (Some(placeholder), _) => placeholder.to_string(),
        (None, Some(team_id)) => format!("team {team_id}"),
        (None, None) => "nobody".to_string(),
    }
}

// A placeholder that could have been resolved but was not.
fn check_orphans(snapshot: &StageSnapshot) -> Vec<Violation> {
    let mut violations = Vec::new();
    for m in snapshot.matches.iter() {
        for (_, placeholder) in m.pending() {
            if snapshot.outcomes.contains_key(&placeholder) {
                violations.push(Violation::build(
                    ViolationKind::OrphanedPlaceholder,
                    format!("{} slot {} still waits for {placeholder}, which is already decided", m.stage, m.slot),
                    vec![m.id],
                ));
            }
        }
    }
    violations
}

// A side holding a team its source no longer gives.
fn check_stale_resolutions(snapshot: &StageSnapshot) -> Vec<Violation> {
    let mut violations = Vec::new();
    for m in snapshot.matches.iter() {
        for side in [&m.home, &m.away] {
            let (Some(placeholder), Some(team_id)) = (side.placeholder, side.team_id) else { continue };

            let detail = match snapshot.outcomes.get(&placeholder) {
                Some(expected) if *expected == team_id => continue,
                Some(expected) => format!("{} slot {} has team {team_id} as {placeholder}, which is now team {expected}", m.stage, m.slot),
                None => format!("{} slot {} has team {team_id} as {placeholder}, which is no longer decided", m.stage, m.slot),
            };
            violations.push(Violation::build(ViolationKind::StaleResolution, detail, vec![m.id]));
        }
    }
    violations
}

fn check_team_counts(snapshot: &StageSnapshot) -> Vec<Violation> {
    snapshot.groups.iter()
        .filter(|(group, actual)| *actual != usize::from(group.team_count))
        .map(|(group, actual)| {
            let mut violation = Violation::build(
                ViolationKind::MissingTeamCount,
                format!("group {} has {actual} team(s), expected {}", group.label, group.team_count),
                Vec::new(),
            );
            violation.group_id = Some(group.id);
            violation
        })
        .collect()
}

// Read what the checks need through the given connection, so a repair can check its own transaction.
pub async fn load_snapshot(conn: &mut Conn, stage: Stage, points: &PointsRules) -> Result<StageSnapshot> {
    let format = StageFormat::fetch(&mut *conn, stage).await?;
    let matches = Match::fetch_stage(&mut *conn, stage).await?;

    let mut groups = Vec::new();
    for group in Group::fetch_all(&mut *conn).await? {
        let actual = group.no_of_teams(&mut *conn).await?;
        groups.push((group, actual));
    }

    let placeholders: BTreeSet<Placeholder> = matches.iter()
        .flat_map(|m| [m.home.placeholder, m.away.placeholder])
        .flatten()
        .collect();

    let mut cache = SourceCache::default();
    let mut outcomes = HashMap::new();
    for placeholder in placeholders {
        if let Ok(team_id) = cache.lookup(&mut *conn, placeholder, points).await? {
            outcomes.insert(placeholder, team_id);
        }
    }

    Ok(StageSnapshot { format, matches, groups, outcomes })
}

/// Runs the checks under a shared stage lock.
#[derive(Debug, Clone)]
pub struct Checker {
    data: AppData,
}

impl Checker {
    pub fn new(data: &AppData) -> Self {
        Self { data: data.clone() }
    }

    pub async fn check(&self, stage: Stage) -> Result<Vec<Violation>> {
        self.data.within("check", self.check_locked(stage)).await
    }

    async fn check_locked(&self, stage: Stage) -> Result<Vec<Violation>> {
        let _guard = self.data.locks.read(stage).await;
        let mut conn = self.data.db.acquire().await?;
        let snapshot = load_snapshot(&mut conn, stage, &self.data.points).await?;

        let violations = check_snapshot(&snapshot);
        if violations.is_empty() {
            debug!(%stage, matches = snapshot.matches.len(), "schedule is consistent");
        }
        for violation in violations.iter() {
            warn!(%stage, kind = ?violation.kind, ids = ?violation.match_ids, "{}", violation.detail);
        }
        return Ok(violations);
    }
}
