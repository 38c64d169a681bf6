// The entry points callers use: setup, generation, results and the integrity tools.
use tracing::info;

use crate::{logic::{app_data::AppData, competition::{Stage, StageFormat, checker::{Checker, Violation}, fixture::{Match, Score}, repair::{RepairReport, Repairer}, resolver::{ResolutionResult, Resolver, resolve_stage}}, config::TournamentSetup, error::{Error, Result}, group::Group, team::Team, types::{MatchId, TeamId}}, packages::schedule::SchedulePackage};

#[derive(Debug, Clone)]
pub struct Tournament {
    data: AppData,
    resolver: Resolver,
    checker: Checker,
    repairer: Repairer,
}

impl Tournament {
    pub fn new(data: AppData) -> Self {
        Self {
            resolver: Resolver::new(&data),
            checker: Checker::new(&data),
            repairer: Repairer::new(&data),
            data,
        }
    }

    pub fn data(&self) -> &AppData {
        &self.data
    }

    // Save the stage formats, groups and teams in one go.
    pub async fn setup(&self, setup: &TournamentSetup, formats: &[StageFormat]) -> Result<Vec<Group>> {
        self.data.within("setup", self.setup_locked(setup, formats)).await
    }

    async fn setup_locked(&self, setup: &TournamentSetup, formats: &[StageFormat]) -> Result<Vec<Group>> {
        let _guard = self.data.locks.write(Stage::GroupStage).await;
        let mut tx = self.data.db.begin().await?;

        for format in formats {
            format.save(&mut tx).await?;
        }

        let mut groups = Vec::new();
        for group_setup in setup.groups.iter() {
            let group = Group::build_and_save(&mut tx, group_setup.label, group_setup.team_count()?).await?;
            for name in group_setup.teams.iter() {
                group.add_team(&mut tx, name).await?;
            }
            groups.push(group);
        }

        tx.commit().await?;
        info!(groups = groups.len(), stages = formats.len(), "tournament set up");
        return Ok(groups);
    }

    pub async fn add_group(&self, label: char, team_count: u8) -> Result<Group> {
        self.data.within("add group", self.add_group_locked(label, team_count)).await
    }

    async fn add_group_locked(&self, label: char, team_count: u8) -> Result<Group> {
        let _guard = self.data.locks.write(Stage::GroupStage).await;
        let mut conn = self.data.db.acquire().await?;
        Group::build_and_save(&mut conn, label, team_count).await
    }

    // Add a team at the next draw position of the group.
    pub async fn add_team(&self, label: char, name: &str) -> Result<Team> {
        self.data.within("add team", self.add_team_locked(label, name)).await
    }

    async fn add_team_locked(&self, label: char, name: &str) -> Result<Team> {
        let _guard = self.data.locks.write(Stage::GroupStage).await;
        let mut conn = self.data.db.acquire().await?;
        let group = Group::fetch_by_label(&mut conn, label).await?
            .ok_or_else(|| Error::NotFound(format!("no group {label}")))?;
        group.add_team(&mut conn, name).await
    }

    pub async fn rename_team(&self, team_id: TeamId, name: &str) -> Result<Team> {
        self.data.within("rename team", self.rename_team_locked(team_id, name)).await
    }

    async fn rename_team_locked(&self, team_id: TeamId, name: &str) -> Result<Team> {
        let _guard = self.data.locks.write(Stage::GroupStage).await;
        let mut conn = self.data.db.acquire().await?;
        let mut team = Team::fetch(&mut conn, team_id).await?;
        team.rename(&mut conn, name).await?;
        return Ok(team);
    }

    pub async fn remove_team(&self, team_id: TeamId) -> Result<()> {
        self.data.within("remove team", self.remove_team_locked(team_id)).await
    }

    async fn remove_team_locked(&self, team_id: TeamId) -> Result<()> {
        let _guard = self.data.locks.write(Stage::GroupStage).await;
        let mut conn = self.data.db.acquire().await?;
        Team::remove(&mut conn, team_id).await
    }

    pub async fn save_stage_format(&self, format: &StageFormat) -> Result<()> {
        self.data.within("save stage format", self.save_stage_format_locked(format)).await
    }

    async fn save_stage_format_locked(&self, format: &StageFormat) -> Result<()> {
        let _guard = self.data.locks.write(format.stage).await;
        let mut conn = self.data.db.acquire().await?;
        format.save(&mut conn).await
    }

    // Create the schedule of a stage for the first time.
    pub async fn generate(&self, stage: Stage) -> Result<Vec<Match>> {
        self.data.within("generate", self.generate_locked(stage)).await
    }

    async fn generate_locked(&self, stage: Stage) -> Result<Vec<Match>> {
        let _guard = self.data.locks.write(stage).await;
        let mut tx = self.data.db.begin().await?;

        let existing = Match::count_stage(&mut tx, stage).await?;
        if existing > 0 {
            return Err(Error::Validation(format!("{stage} already has {existing} matches, rebuild it instead")));
        }

        let format = StageFormat::fetch(&mut tx, stage).await?;
        let mut matches = format.populate(&mut tx).await?;
        let resolution = resolve_stage(&mut tx, stage, &self.data.points).await?;
        if !resolution.resolved.is_empty() {
            matches = Match::fetch_stage(&mut tx, stage).await?;
        }
        tx.commit().await?;

        info!(%stage, matches = matches.len(), resolved = resolution.resolved.len(), "generated stage");
        return Ok(matches);
    }

    pub async fn record_result(&self, match_id: MatchId, score: Score) -> Result<Match> {
        self.data.within("record result", self.record_result_locked(match_id, score)).await
    }

    async fn record_result_locked(&self, match_id: MatchId, score: Score) -> Result<Match> {
        let stage = {
            let mut conn = self.data.db.acquire().await?;
            Match::fetch(&mut conn, match_id).await?.stage
        };

        let _guard = self.data.locks.write(stage).await;
        let mut tx = self.data.db.begin().await?;
        let mut game = Match::fetch(&mut tx, match_id).await?;
        if !game.is_resolved() {
            return Err(Error::Validation(format!("match {match_id} does not know both of its teams yet")));
        }

        game.score = Some(score);
        game.validate()?;
        game.save_score(&mut tx).await?;
        tx.commit().await?;

        info!(%stage, match_id, home = score.home_goals, away = score.away_goals, "result recorded");
        return Ok(game);
    }

    // Results of a stage are in: resolve every later stage.
    pub async fn results_final(&self, stage: Stage) -> Result<Vec<(Stage, ResolutionResult)>> {
        let mut results = Vec::new();
        for later in stage.later_stages() {
            results.push((later, self.resolver.resolve(later).await?));
        }
        return Ok(results);
    }

    pub async fn resolve(&self, stage: Stage) -> Result<ResolutionResult> {
        self.resolver.resolve(stage).await
    }

    // Rebuild the stage, then check what came out.
    pub async fn rebuild(&self, stage: Stage) -> Result<Vec<Violation>> {
        self.repairer.rebuild_stage(stage).await?;
        self.checker.check(stage).await
    }

    pub async fn check(&self, stage: Stage) -> Result<Vec<Violation>> {
        self.checker.check(stage).await
    }

    pub async fn repair(&self, stage: Stage) -> Result<RepairReport> {
        self.repairer.repair(stage).await
    }

    pub fn repairer(&self) -> &Repairer {
        &self.repairer
    }

    pub async fn schedule(&self, stage: Stage) -> Result<SchedulePackage> {
        self.data.within("schedule", self.schedule_locked(stage)).await
    }

    async fn schedule_locked(&self, stage: Stage) -> Result<SchedulePackage> {
        let _guard = self.data.locks.read(stage).await;
        let mut conn = self.data.db.acquire().await?;
        SchedulePackage::build(&mut conn, stage).await
    }

    pub async fn teams(&self) -> Result<Vec<Team>> {
        self.data.within("teams", self.teams_locked()).await
    }

    async fn teams_locked(&self) -> Result<Vec<Team>> {
        let _guard = self.data.locks.read(Stage::GroupStage).await;
        let mut conn = self.data.db.acquire().await?;
        Team::fetch_all(&mut conn).await
    }
}
