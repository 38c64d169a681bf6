// Repairs for the violations the checker reports.
//
// Every repair runs in one transaction, checks the transaction's own view before committing,
// and rolls back with Error::RepairIncomplete if violations of its kinds remain.
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::logic::{app_data::AppData, competition::{Stage, StageFormat, checker::{Violation, ViolationKind, check_snapshot, load_snapshot}, fixture::Match, ranking::PointsRules, resolver::resolve_stage}, error::{Error, Result}, types::{Conn, MatchId}};

/// What a repair changed.
#[derive(Debug, Default, Clone)]
#[derive(PartialEq, Eq)]
#[derive(Serialize)]
pub struct RepairReport {
    pub removed: Vec<MatchId>,
    pub moved: Vec<MatchId>,
    pub resolved: usize,
    // Sides emptied because their source is no longer decided.
    pub cleared: usize,
    pub rebuilt: bool,
}

impl RepairReport {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// Keep the lowest id of every duplicate set and delete the rest.
pub async fn deduplicate(conn: &mut Conn, stage: Stage) -> Result<Vec<MatchId>> {
    let mut sets: BTreeMap<_, Vec<MatchId>> = BTreeMap::new();
    for m in Match::fetch_stage(&mut *conn, stage).await? {
        let (date, time, participants) = m.duplicate_key();
        let Some(pair) = participants else { continue };
        sets.entry((date, time, pair)).or_default().push(m.id);
    }

    let mut removed = Vec::new();
    for mut ids in sets.into_values().filter(|ids| ids.len() > 1) {
        ids.sort();
        for id in ids.into_iter().skip(1) {
            debug!(%stage, match_id = id, "deleting duplicate match");
            Match::delete(&mut *conn, id).await?;
            removed.push(id);
        }
    }

    removed.sort();
    return Ok(removed);
}

// Chunk the existing matches into days again, in bracket slot order.
// Pairings and results stay; only the date and time of a match change.
pub async fn renormalize(conn: &mut Conn, stage: Stage) -> Result<Vec<MatchId>> {
    let format = StageFormat::fetch(&mut *conn, stage).await?;
    let mut matches = Match::fetch_stage(&mut *conn, stage).await?;
    matches.sort_by_key(|m| (m.slot, m.id));

    // Fails before anything is written if the matches cannot be spread evenly.
    let slots = format.day_slots(matches.len())?;

    let mut moved = Vec::new();
    for (mut m, (date, time_slot)) in matches.into_iter().zip(slots) {
        if m.date == date && m.time_slot == time_slot { continue; }

        debug!(%stage, match_id = m.id, from = %m.date, to = %date, "moving match");
        m.date = date;
        m.time_slot = time_slot;
        m.save_schedule(&mut *conn).await?;
        moved.push(m.id);
    }

    return Ok(moved);
}

// Delete the stage and build it again from the groups and the bracket.
pub async fn rebuild(conn: &mut Conn, stage: Stage, points: &PointsRules) -> Result<(Vec<Match>, usize)> {
    let format = StageFormat::fetch(&mut *conn, stage).await?;
    let deleted = Match::delete_stage(&mut *conn, stage).await?;

    let matches = format.populate(&mut *conn).await?;
    let resolved = resolve_stage(&mut *conn, stage, points).await?.resolved.len();

    info!(%stage, deleted, created = matches.len(), resolved, "rebuilt stage");
    return Ok((matches, resolved));
}

// Check the transaction's view. None checks every kind.
pub async fn verify(conn: &mut Conn, stage: Stage, points: &PointsRules, kinds: Option<&[ViolationKind]>) -> Result<()> {
    let snapshot = load_snapshot(conn, stage, points).await?;
    let remaining: Vec<Violation> = check_snapshot(&snapshot).into_iter()
        .filter(|v| kinds.map_or(true, |kinds| kinds.contains(&v.kind)))
        .collect();

    if remaining.is_empty() {
        return Ok(());
    }

    warn!(%stage, remaining = remaining.len(), "repair did not converge, rolling back");
    Err(Error::RepairIncomplete { stage, remaining })
}

#[derive(Debug, Clone)]
pub struct Repairer {
    data: AppData,
}

impl Repairer {
    pub fn new(data: &AppData) -> Self {
        Self { data: data.clone() }
    }

    pub async fn deduplicate_fixtures(&self, stage: Stage) -> Result<RepairReport> {
        self.data.within("deduplicate fixtures", self.deduplicate_fixtures_locked(stage)).await
    }

    async fn deduplicate_fixtures_locked(&self, stage: Stage) -> Result<RepairReport> {
        let _guard = self.data.locks.write(stage).await;
        let mut tx = self.data.db.begin().await?;

        let removed = deduplicate(&mut tx, stage).await?;
        verify(&mut tx, stage, &self.data.points, Some(&[ViolationKind::DuplicateFixture][..])).await?;
        tx.commit().await?;

        info!(%stage, removed = removed.len(), "removed duplicate matches");
        return Ok(RepairReport { removed, ..Default::default() });
    }

    pub async fn renormalize_day_assignment(&self, stage: Stage) -> Result<RepairReport> {
        self.data.within("renormalize day assignment", self.renormalize_day_assignment_locked(stage)).await
    }

    async fn renormalize_day_assignment_locked(&self, stage: Stage) -> Result<RepairReport> {
        let _guard = self.data.locks.write(stage).await;
        let mut tx = self.data.db.begin().await?;

        let moved = renormalize(&mut tx, stage).await?;
        verify(&mut tx, stage, &self.data.points, Some(&[ViolationKind::WrongDayCount, ViolationKind::UnevenMatchesPerDay][..])).await?;
        tx.commit().await?;

        info!(%stage, moved = moved.len(), "reassigned match days");
        return Ok(RepairReport { moved, ..Default::default() });
    }

    // Destroy and recreate the stage. The new schedule must come out clean.
    pub async fn rebuild_stage(&self, stage: Stage) -> Result<RepairReport> {
        self.data.within("rebuild stage", self.rebuild_stage_locked(stage)).await
    }

    async fn rebuild_stage_locked(&self, stage: Stage) -> Result<RepairReport> {
        let _guard = self.data.locks.write(stage).await;
        let mut tx = self.data.db.begin().await?;

        let (_, resolved) = rebuild(&mut tx, stage, &self.data.points).await?;
        verify(&mut tx, stage, &self.data.points, None).await?;
        tx.commit().await?;

        return Ok(RepairReport { resolved, rebuilt: true, ..Default::default() });
    }

    // Apply whatever the checker asks for, falling back to a rebuild when the targeted repairs are not enough.
    pub async fn repair(&self, stage: Stage) -> Result<RepairReport> {
        self.data.within("repair", self.repair_locked(stage)).await
    }

    async fn repair_locked(&self, stage: Stage) -> Result<RepairReport> {
        let _guard = self.data.locks.write(stage).await;
        let mut tx = self.data.db.begin().await?;
        let points = &self.data.points;
        let mut report = RepairReport::default();

        let violations = check_snapshot(&load_snapshot(&mut tx, stage, points).await?);
        if violations.is_empty() {
            debug!(%stage, "nothing to repair");
            return Ok(report);
        }
        let has = |kind: ViolationKind| violations.iter().any(|v| v.kind == kind);

        if has(ViolationKind::DuplicateFixture) {
            report.removed = deduplicate(&mut tx, stage).await?;
        }
        if has(ViolationKind::WrongDayCount) || has(ViolationKind::UnevenMatchesPerDay) {
            match renormalize(&mut tx, stage).await {
                Ok(moved) => report.moved = moved,
                // Leaves the rebuild to sort it out.
                Err(Error::InvalidScheduleSpec(reason)) => debug!(%stage, %reason, "cannot renormalize"),
                Err(e) => return Err(e),
            }
        }
        if has(ViolationKind::OrphanedPlaceholder) || has(ViolationKind::StaleResolution) {
            let resolution = resolve_stage(&mut tx, stage, points).await?;
            report.resolved = resolution.resolved.len();
            report.cleared = resolution.cleared.len();
        }

        let remaining = check_snapshot(&load_snapshot(&mut tx, stage, points).await?);
        if !remaining.is_empty() {
            info!(%stage, remaining = remaining.len(), "targeted repairs not enough, rebuilding");
            match rebuild(&mut tx, stage, points).await {
                Ok((_, resolved)) => {
                    report.resolved += resolved;
                    report.rebuilt = true;
                },
                Err(Error::Validation(reason) | Error::InvalidScheduleSpec(reason)) => {
                    warn!(%stage, %reason, "stage cannot be rebuilt");
                    return Err(Error::RepairIncomplete { stage, remaining });
                },
                Err(e) => return Err(e),
            }
        }

        verify(&mut tx, stage, points, None).await?;
        tx.commit().await?;

        info!(%stage, removed = report.removed.len(), moved = report.moved.len(), resolved = report.resolved, cleared = report.cleared, rebuilt = report.rebuilt, "repaired stage");
        return Ok(report);
    }
}
