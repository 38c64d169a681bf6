use sqlx::{FromRow, Row, sqlite::SqliteRow};
use time::Time;
use tracing::{debug, info};

use crate::logic::{competition::{Stage, StageFormat, fixture::{Fixture, Match}, schedule_generator}, error::{Error, Result}, group::Group, time::{SLOT_FORMAT, slot_to_string}, types::Conn};

impl FromRow<'_, SqliteRow> for StageFormat {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let slots: Vec<String> = serde_json::from_str(row.try_get::<&str, _>("time_slots")?)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Self {
            stage: row.try_get("stage")?,
            start_date: row.try_get("start_date")?,
            matches_per_day: row.try_get("matches_per_day")?,
            time_slots: slots.iter()
                .map(|s| Time::parse(s, SLOT_FORMAT).map_err(|e| sqlx::Error::Decode(Box::new(e))))
                .collect::<sqlx::Result<Vec<Time>>>()?,
            day_gap: row.try_get("day_gap")?,
        })
    }
}

// Static read queries.
impl StageFormat {
    pub async fn fetch(conn: &mut Conn, stage: Stage) -> Result<Self> {
        sqlx::query_as(
            "SELECT * FROM Stage WHERE stage = $1"
        ).bind(stage)
        .fetch_optional(&mut *conn).await?
        .ok_or_else(|| Error::NotFound(format!("no schedule parameters for {stage}")))
    }

    pub async fn fetch_all(conn: &mut Conn) -> Result<Vec<Self>> {
        let mut formats: Vec<Self> = sqlx::query_as(
            "SELECT * FROM Stage"
        ).fetch_all(&mut *conn).await?;

        formats.sort_by_key(|format| format.stage);
        return Ok(formats);
    }
}

// Database write queries.
impl StageFormat {
    // Insert or replace the parameters of the stage.
    pub async fn save(&self, conn: &mut Conn) -> Result<()> {
        self.validate()?;
        let slots: Vec<String> = self.time_slots.iter().map(|slot| slot_to_string(*slot)).collect();

        sqlx::query(
            "INSERT INTO Stage (stage, start_date, matches_per_day, time_slots, day_gap)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (stage) DO UPDATE SET
            start_date = excluded.start_date,
            matches_per_day = excluded.matches_per_day,
            time_slots = excluded.time_slots,
            day_gap = excluded.day_gap"
        ).bind(self.stage)
        .bind(self.start_date)
        .bind(self.matches_per_day)
        .bind(serde_json::to_string(&slots)?)
        .bind(self.day_gap)
        .execute(&mut *conn).await?;

        debug!(stage = %self.stage, start = %self.start_date, per_day = self.matches_per_day, "saved stage format");
        Ok(())
    }

    // Generate the fixtures of an empty stage, schedule and insert them.
    pub async fn populate(&self, conn: &mut Conn) -> Result<Vec<Match>> {
        let groups = Group::fetch_all(&mut *conn).await?;

        let fixtures: Vec<Fixture> = match self.stage {
            Stage::GroupStage => {
                let mut with_teams = Vec::new();
                for group in groups {
                    let teams = group.teams(&mut *conn).await?;
                    with_teams.push((group, teams));
                }
                schedule_generator::group_stage_fixtures(&with_teams)?
            },
            stage => {
                let labels: Vec<char> = groups.iter().map(|group| group.label).collect();
                schedule_generator::knockout_fixtures(stage, &labels)?
            },
        };

        let mut matches = self.schedule(&fixtures)?;
        for game in matches.iter_mut() {
            game.insert(&mut *conn).await?;
        }

        info!(stage = %self.stage, matches = matches.len(), "scheduled stage");
        return Ok(matches);
    }
}
