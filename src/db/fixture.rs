use sqlx::{FromRow, Row, sqlite::SqliteRow};
use time::{Date, Time};
use tracing::{debug, info};

use crate::logic::{competition::{Stage, StageFormat, fixture::{Match, Score, Side}, placeholder::Source}, error::{Error, Result}, group::Group, team::Team, time::{SLOT_FORMAT, slot_to_string}, types::{Conn, GroupId, MatchId, Slot}};

impl FromRow<'_, SqliteRow> for Match {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let time_slot: &str = row.try_get("time_slot")?;
        let home_goals: Option<u8> = row.try_get("home_goals")?;
        let away_goals: Option<u8> = row.try_get("away_goals")?;

        Ok(Self {
            id: row.try_get("id")?,
            stage: row.try_get("stage")?,
            slot: row.try_get("slot")?,
            group_id: row.try_get("group_id")?,
            date: row.try_get("date")?,
            time_slot: Time::parse(time_slot, SLOT_FORMAT).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            home: Side {
                placeholder: row.try_get("home_placeholder")?,
                team_id: row.try_get("home_id")?,
            },
            away: Side {
                placeholder: row.try_get("away_placeholder")?,
                team_id: row.try_get("away_id")?,
            },
            score: match (home_goals, away_goals) {
                (Some(home_goals), Some(away_goals)) => Some(Score::build(home_goals, away_goals, row.try_get("shootout_winner")?)),
                _ => None,
            },
        })
    }
}

// Static read queries.
impl Match {
    pub const SELECT_QUERY: &str = "SELECT * FROM Fixture";

    pub async fn fetch(conn: &mut Conn, id: MatchId) -> Result<Self> {
        sqlx::query_as(
            format!("{} WHERE id = $1", Self::SELECT_QUERY).as_str()
        ).bind(id)
        .fetch_optional(&mut *conn).await?
        .ok_or_else(|| Error::NotFound(format!("no match {id}")))
    }

    // Matches of a stage in playing order.
    pub async fn fetch_stage(conn: &mut Conn, stage: Stage) -> Result<Vec<Self>> {
        Ok(sqlx::query_as(
            format!("{} WHERE stage = $1 ORDER BY date ASC, time_slot ASC, slot ASC, id ASC", Self::SELECT_QUERY).as_str()
        ).bind(stage)
        .fetch_all(&mut *conn).await?)
    }

    // Matches of every stage played on the given date.
    pub async fn fetch_date(conn: &mut Conn, date: Date) -> Result<Vec<Self>> {
        Ok(sqlx::query_as(
            format!("{} WHERE date = $1 ORDER BY time_slot ASC, id ASC", Self::SELECT_QUERY).as_str()
        ).bind(date)
        .fetch_all(&mut *conn).await?)
    }

    pub async fn fetch_group(conn: &mut Conn, stage: Stage, group_id: GroupId) -> Result<Vec<Self>> {
        Ok(sqlx::query_as(
            format!("{} WHERE stage = $1 AND group_id = $2 ORDER BY date ASC, time_slot ASC, id ASC", Self::SELECT_QUERY).as_str()
        ).bind(stage)
        .bind(group_id)
        .fetch_all(&mut *conn).await?)
    }

    // The match at a bracket slot. With duplicates around, the oldest one counts.
    pub async fn fetch_slot(conn: &mut Conn, stage: Stage, slot: Slot) -> Result<Option<Self>> {
        Ok(sqlx::query_as(
            format!("{} WHERE stage = $1 AND slot = $2 ORDER BY id ASC LIMIT 1", Self::SELECT_QUERY).as_str()
        ).bind(stage)
        .bind(slot)
        .fetch_optional(&mut *conn).await?)
    }

    pub async fn count_stage(conn: &mut Conn, stage: Stage) -> Result<i64> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM Fixture WHERE stage = $1"
        ).bind(stage)
        .fetch_one(&mut *conn).await?)
    }
}

// Validation against what is already stored.
impl Match {
    async fn validate_references(&self, conn: &mut Conn) -> Result<()> {
        match StageFormat::fetch(&mut *conn, self.stage).await {
            Err(Error::NotFound(_)) => return Err(Error::Validation(format!("{} has no schedule parameters", self.stage))),
            result => result?,
        };

        if let Some(group_id) = self.group_id {
            let group = Group::fetch(&mut *conn, group_id).await?
                .ok_or_else(|| Error::Validation(format!("group {group_id} does not exist")))?;

            for team_id in [self.home.team_id, self.away.team_id].into_iter().flatten() {
                let team = match Team::fetch(&mut *conn, team_id).await {
                    Err(Error::NotFound(_)) => return Err(Error::Validation(format!("team {team_id} does not exist"))),
                    result => result?,
                };
                if team.group_id != group_id {
                    return Err(Error::Validation(format!("{} is not in group {}", team.full_name, group.label)));
                }
            }
        }

        for placeholder in [self.home.placeholder, self.away.placeholder].into_iter().flatten() {
            if let Source::Group(label) = placeholder.source {
                if Group::fetch_by_label(&mut *conn, label).await?.is_none() {
                    return Err(Error::Validation(format!("{placeholder} refers to a group that does not exist")));
                }
            }
        }

        let key = self.duplicate_key();
        if Self::fetch_stage(&mut *conn, self.stage).await?.iter().any(|m| m.duplicate_key() == key) {
            return Err(Error::Validation(format!("{} slot {} duplicates an existing match", self.stage, self.slot)));
        }
        Ok(())
    }
}

// Database write queries.
impl Match {
    pub async fn insert(&mut self, conn: &mut Conn) -> Result<()> {
        self.validate()?;
        self.validate_references(&mut *conn).await?;

        self.id = sqlx::query_scalar(
            "INSERT INTO Fixture
            (stage, slot, group_id, date, time_slot, home_placeholder, away_placeholder, home_id, away_id,
            home_goals, away_goals, shootout_winner)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id"
        ).bind(self.stage)
        .bind(self.slot)
        .bind(self.group_id)
        .bind(self.date)
        .bind(slot_to_string(self.time_slot))
        .bind(self.home.placeholder)
        .bind(self.away.placeholder)
        .bind(self.home.team_id)
        .bind(self.away.team_id)
        .bind(self.score.map(|s| s.home_goals))
        .bind(self.score.map(|s| s.away_goals))
        .bind(self.score.and_then(|s| s.shootout_winner))
        .fetch_one(&mut *conn).await?;

        debug!(stage = %self.stage, slot = self.slot, id = self.id, date = %self.date, "match inserted");
        Ok(())
    }

    // Write the resolved teams. Nothing else changes.
    pub async fn save_teams(&self, conn: &mut Conn) -> Result<()> {
        sqlx::query(
            "UPDATE Fixture SET home_id = $1, away_id = $2 WHERE id = $3"
        ).bind(self.home.team_id)
        .bind(self.away.team_id)
        .bind(self.id)
        .execute(&mut *conn).await?;
        Ok(())
    }

    pub async fn save_schedule(&self, conn: &mut Conn) -> Result<()> {
        sqlx::query(
            "UPDATE Fixture SET date = $1, time_slot = $2 WHERE id = $3"
        ).bind(self.date)
        .bind(slot_to_string(self.time_slot))
        .bind(self.id)
        .execute(&mut *conn).await?;
        Ok(())
    }

    pub async fn save_score(&self, conn: &mut Conn) -> Result<()> {
        sqlx::query(
            "UPDATE Fixture SET home_goals = $1, away_goals = $2, shootout_winner = $3 WHERE id = $4"
        ).bind(self.score.map(|s| s.home_goals))
        .bind(self.score.map(|s| s.away_goals))
        .bind(self.score.and_then(|s| s.shootout_winner))
        .bind(self.id)
        .execute(&mut *conn).await?;
        Ok(())
    }

    pub async fn delete(conn: &mut Conn, id: MatchId) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM Fixture WHERE id = $1"
        ).bind(id)
        .execute(&mut *conn).await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("no match {id}")));
        }
        Ok(())
    }

    // Delete every match of the stage. Returns how many went.
    pub async fn delete_stage(conn: &mut Conn, stage: Stage) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM Fixture WHERE stage = $1"
        ).bind(stage)
        .execute(&mut *conn).await?;

        info!(%stage, deleted = result.rows_affected(), "deleted stage schedule");
        Ok(result.rows_affected())
    }
}
