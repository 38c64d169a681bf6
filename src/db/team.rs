use std::collections::HashMap;

use futures::TryStreamExt as _;
use sqlx::Connection as _;
use tracing::info;

use crate::logic::{error::{Error, Result}, group::Group, team::Team, types::{Conn, GroupId, TeamId}};

// Static read queries.
impl Team {
    pub async fn fetch(conn: &mut Conn, id: TeamId) -> Result<Self> {
        sqlx::query_as(
            "SELECT * FROM Team WHERE id = $1"
        ).bind(id)
        .fetch_optional(&mut *conn).await?
        .ok_or_else(|| Error::NotFound(format!("no team {id}")))
    }

    pub async fn fetch_all(conn: &mut Conn) -> Result<Vec<Self>> {
        Ok(sqlx::query_as(
            "SELECT Team.* FROM Team
            INNER JOIN TeamGroup ON TeamGroup.id = Team.group_id
            ORDER BY TeamGroup.label ASC, position ASC"
        ).fetch_all(&mut *conn).await?)
    }

    // Names of all teams by id.
    pub async fn names(conn: &mut Conn) -> Result<HashMap<TeamId, String>> {
        let mut names = HashMap::new();
        let mut rows = sqlx::query_as::<_, (TeamId, String)>(
            "SELECT id, full_name FROM Team"
        ).fetch(&mut *conn);

        while let Some((id, name)) = rows.try_next().await? {
            names.insert(id, name);
        }
        return Ok(names);
    }

    // Number of matches the team appears in, in any stage.
    async fn no_of_matches(conn: &mut Conn, id: TeamId) -> Result<i64> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM Fixture
            WHERE home_id = $1 OR away_id = $1"
        ).bind(id)
        .fetch_one(&mut *conn).await?)
    }
}

// Database write queries.
impl Team {
    // Save a team at the given draw position of the group.
    pub async fn build_and_save(conn: &mut Conn, name: &str, group_id: GroupId, position: u8) -> Result<Self> {
        Self::validate_name(name)?;
        let group = Group::fetch(&mut *conn, group_id).await?
            .ok_or_else(|| Error::Validation(format!("group {group_id} does not exist")))?;

        if position == 0 || position > group.team_count {
            return Err(Error::Validation(format!(
                "position {position} is outside group {}'s 1..={}", group.label, group.team_count
            )));
        }
        let teams = group.teams(&mut *conn).await?;
        if teams.len() >= usize::from(group.team_count) {
            return Err(Error::Validation(format!("group {} already has its {} teams", group.label, group.team_count)));
        }
        if teams.iter().any(|team| team.position == position) {
            return Err(Error::Validation(format!("position {position} of group {} is taken", group.label)));
        }

        let mut team = Self::build(name, group_id, position);
        team.id = sqlx::query_scalar(
            "INSERT INTO Team (full_name, group_id, position)
            VALUES ($1, $2, $3)
            RETURNING id"
        ).bind(team.full_name.as_str())
        .bind(team.group_id)
        .bind(team.position)
        .fetch_one(&mut *conn).await?;

        info!(team = %team.full_name, group = %group.label, position, "team added");
        return Ok(team);
    }

    pub async fn rename(&mut self, conn: &mut Conn, name: &str) -> Result<()> {
        Self::validate_name(name)?;
        self.full_name = name.trim().to_string();
        sqlx::query(
            "UPDATE Team SET full_name = $1 WHERE id = $2"
        ).bind(self.full_name.as_str())
        .bind(self.id)
        .execute(&mut *conn).await?;
        Ok(())
    }

    // Remove a team that plays no match and close the gap in its group's draw positions.
    pub async fn remove(conn: &mut Conn, id: TeamId) -> Result<()> {
        let team = Self::fetch(&mut *conn, id).await?;
        let matches = Self::no_of_matches(&mut *conn, id).await?;
        if matches > 0 {
            return Err(Error::Validation(format!("{} plays in {matches} match(es) and cannot be removed", team.full_name)));
        }

        let mut tx = conn.begin().await?;
        sqlx::query(
            "DELETE FROM Team WHERE id = $1"
        ).bind(id)
        .execute(&mut *tx).await?;

        // One row at a time, lowest first, so the unique positions never collide.
        let later: Vec<TeamId> = sqlx::query_scalar(
            "SELECT id FROM Team
            WHERE group_id = $1 AND position > $2
            ORDER BY position ASC"
        ).bind(team.group_id)
        .bind(team.position)
        .fetch_all(&mut *tx).await?;

        for later_id in later.iter() {
            sqlx::query(
                "UPDATE Team SET position = position - 1 WHERE id = $1"
            ).bind(*later_id)
            .execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!(team = %team.full_name, renumbered = later.len(), "team removed");
        Ok(())
    }
}
