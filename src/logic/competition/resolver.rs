// Filling knockout placeholders with real teams once their source is decided.
use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::logic::{app_data::AppData, competition::{Stage, fixture::{HomeAway, Match}, placeholder::{Placeholder, Role, Source}, ranking::{PointsRules, Standings}}, error::{Error, Result}, group::Group, types::{Conn, MatchId, Slot, TeamId}};

/// One side filled in by a resolver run.
#[derive(Debug, Clone, Copy)]
#[derive(PartialEq, Eq)]
#[derive(Serialize)]
pub struct Resolution {
    pub match_id: MatchId,
    pub side: HomeAway,
    pub placeholder: Placeholder,
    pub team_id: TeamId,
}

#[derive(Debug, Default)]
pub struct ResolutionResult {
    pub resolved: Vec<Resolution>,
    // Sides emptied because their source is no longer decided. Holds the team that was removed.
    pub cleared: Vec<Resolution>,
    // Every one of these is an Error::UnresolvedDependency.
    pub unresolved: Vec<Error>,
}

impl ResolutionResult {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

// Sources are looked up once per run.
#[derive(Default)]
pub(crate) struct SourceCache {
    groups: HashMap<char, Option<Standings>>,
    slots: HashMap<(Stage, Slot), Option<Match>>,
}

impl SourceCache {
    // The team a placeholder stands for, or why it cannot be known yet.
    pub(crate) async fn lookup(&mut self, conn: &mut Conn, placeholder: Placeholder, points: &PointsRules) -> Result<std::result::Result<TeamId, String>> {
        match placeholder.source {
            Source::Group(label) => {
                if !self.groups.contains_key(&label) {
                    let standings = match Group::fetch_by_label(&mut *conn, label).await? {
                        Some(group) => Some(group.standings(&mut *conn, points).await?),
                        None => None,
                    };
                    self.groups.insert(label, standings);
                }

                Ok(match self.groups.get(&label) {
                    Some(Some(standings @ Standings::Final(_))) => standings.team_at(placeholder.role.rank())
                        .ok_or_else(|| format!("group {label} has no rank {}", placeholder.role.rank())),
                    Some(Some(Standings::NotFinal { played, expected })) => Err(format!(
                        "group {label} has {played} of {expected} matches scored"
                    )),
                    _ => Err(format!("there is no group {label}")),
                })
            },
            Source::Slot { stage, slot } => {
                if !self.slots.contains_key(&(stage, slot)) {
                    let source = Match::fetch_slot(&mut *conn, stage, slot).await?;
                    self.slots.insert((stage, slot), source);
                }

                Ok(match self.slots.get(&(stage, slot)) {
                    Some(Some(source)) => match (source.winner_loser(), placeholder.role) {
                        (Some((winner, _)), Role::Winner) => Ok(winner),
                        (Some((_, loser)), Role::RunnerUp) => Ok(loser),
                        (None, _) => Err(format!("{stage} #{slot} is not decided")),
                    },
                    _ => Err(format!("{stage} #{slot} is not scheduled")),
                })
            },
        }
    }
}

// Derive every placeholder side of the stage again through the given connection.
// A side that disagrees with its source is overwritten, and emptied when the source is no longer decided.
// Only team columns are written, plus the score of a match whose teams changed.
pub async fn resolve_stage(conn: &mut Conn, stage: Stage, points: &PointsRules) -> Result<ResolutionResult> {
    let mut result = ResolutionResult::default();
    let mut cache = SourceCache::default();

    for mut game in Match::fetch_stage(&mut *conn, stage).await? {
        let mut changed = false;
        for side in [HomeAway::Home, HomeAway::Away] {
            let current = *game.side(side);
            let Some(placeholder) = current.placeholder else { continue };

            match cache.lookup(&mut *conn, placeholder, points).await? {
                Ok(team_id) => {
                    if current.team_id == Some(team_id) { continue; }

                    debug!(match_id = game.id, ?side, %placeholder, team_id, previous = ?current.team_id, "placeholder resolved");
                    game.side_mut(side).team_id = Some(team_id);
                    result.resolved.push(Resolution { match_id: game.id, side, placeholder, team_id });
                    changed = true;
                },
                Err(reason) => {
                    if let Some(team_id) = current.team_id {
                        debug!(match_id = game.id, ?side, %placeholder, team_id, %reason, "placeholder cleared");
                        game.side_mut(side).team_id = None;
                        result.cleared.push(Resolution { match_id: game.id, side, placeholder, team_id });
                        changed = true;
                    }
                    else {
                        debug!(match_id = game.id, %placeholder, %reason, "placeholder still pending");
                    }
                    result.unresolved.push(Error::UnresolvedDependency { match_id: game.id, placeholder, reason });
                },
            }
        }

        if !changed { continue; }

        // The result was between other teams.
        if game.score.is_some() {
            warn!(%stage, match_id = game.id, slot = game.slot, "teams changed, discarding the recorded result");
            game.score = None;
            game.save_score(&mut *conn).await?;
        }
        game.validate()?;
        game.save_teams(&mut *conn).await?;
    }

    return Ok(result);
}

#[derive(Debug, Clone)]
pub struct Resolver {
    data: AppData,
}

impl Resolver {
    pub fn new(data: &AppData) -> Self {
        Self { data: data.clone() }
    }

    // Resolve the stage in a transaction of its own. Partial results are committed.
    pub async fn resolve(&self, stage: Stage) -> Result<ResolutionResult> {
        self.data.within("resolve", self.resolve_locked(stage)).await
    }

    async fn resolve_locked(&self, stage: Stage) -> Result<ResolutionResult> {
        let _guard = self.data.locks.write(stage).await;
        let mut tx = self.data.db.begin().await?;
        let result = resolve_stage(&mut tx, stage, &self.data.points).await?;
        tx.commit().await?;

        info!(%stage, resolved = result.resolved.len(), cleared = result.cleared.len(), pending = result.unresolved.len(), "resolved placeholders");
        return Ok(result);
    }
}
