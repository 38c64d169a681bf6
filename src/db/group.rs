use sqlx::{FromRow, Row, sqlite::SqliteRow};
use tracing::info;

use crate::logic::{competition::{Stage, fixture::Match, ranking::{self, PointsRules, Standings}}, error::{Error, Result}, group::Group, team::Team, types::{Conn, GroupId}};

impl FromRow<'_, SqliteRow> for Group {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let label: String = row.try_get("label")?;
        Ok(Self {
            id: row.try_get("id")?,
            label: label.chars().next().ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "label".to_string(),
                source: "empty group label".into(),
            })?,
            team_count: row.try_get("team_count")?,
        })
    }
}

// Static read queries.
impl Group {
    pub async fn fetch(conn: &mut Conn, id: GroupId) -> Result<Option<Self>> {
        Ok(sqlx::query_as(
            "SELECT * FROM TeamGroup WHERE id = $1"
        ).bind(id)
        .fetch_optional(&mut *conn).await?)
    }

    pub async fn fetch_by_label(conn: &mut Conn, label: char) -> Result<Option<Self>> {
        Ok(sqlx::query_as(
            "SELECT * FROM TeamGroup WHERE label = $1"
        ).bind(label.to_string())
        .fetch_optional(&mut *conn).await?)
    }

    // Every group in label order.
    pub async fn fetch_all(conn: &mut Conn) -> Result<Vec<Self>> {
        Ok(sqlx::query_as(
            "SELECT * FROM TeamGroup ORDER BY label ASC"
        ).fetch_all(&mut *conn).await?)
    }
}

// Database write queries.
impl Group {
    pub async fn build_and_save(conn: &mut Conn, label: char, team_count: u8) -> Result<Self> {
        let mut group = Self::build(label, team_count);
        group.validate()?;

        if Self::fetch_by_label(&mut *conn, label).await?.is_some() {
            return Err(Error::Validation(format!("group {label} already exists")));
        }

        group.id = sqlx::query_scalar(
            "INSERT INTO TeamGroup (label, team_count)
            VALUES ($1, $2)
            RETURNING id"
        ).bind(label.to_string())
        .bind(team_count)
        .fetch_one(&mut *conn).await?;

        info!(group = %label, team_count, "group created");
        return Ok(group);
    }

    // Add a team at the next free draw position.
    pub async fn add_team(&self, conn: &mut Conn, name: &str) -> Result<Team> {
        let position = u8::try_from(self.no_of_teams(&mut *conn).await? + 1)
            .map_err(|_| Error::Validation(format!("group {} is full", self.label)))?;
        Team::build_and_save(conn, name, self.id, position).await
    }
}

// Database read queries.
impl Group {
    // Teams in draw order.
    pub async fn teams(&self, conn: &mut Conn) -> Result<Vec<Team>> {
        Ok(sqlx::query_as(
            "SELECT * FROM Team WHERE group_id = $1
            ORDER BY position ASC"
        ).bind(self.id)
        .fetch_all(&mut *conn).await?)
    }

    pub async fn no_of_teams(&self, conn: &mut Conn) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM Team WHERE group_id = $1"
        ).bind(self.id)
        .fetch_one(&mut *conn).await?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    // Group stage matches of this group.
    pub async fn matches(&self, conn: &mut Conn) -> Result<Vec<Match>> {
        Match::fetch_group(conn, Stage::GroupStage, self.id).await
    }

    pub async fn standings(&self, conn: &mut Conn, points: &PointsRules) -> Result<Standings> {
        let teams = self.teams(&mut *conn).await?;
        let matches = self.matches(&mut *conn).await?;
        Ok(ranking::standings(self, &teams, &matches, points))
    }
}
