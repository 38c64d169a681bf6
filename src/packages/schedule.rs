use serde::Serialize;
use sqlx::{FromRow, Row, sqlite::SqliteRow};
use time::{Date, Time};

use crate::logic::{competition::{Stage, fixture::{HomeAway, Match, Side}}, error::Result, time::{iso_date_format, slot_format}, types::{Conn, Goals, MatchId, Slot}};

/// The schedule of one stage as shown to callers.
#[derive(Debug, Serialize)]
pub struct SchedulePackage {
    pub stage: Stage,
    pub matches: Vec<MatchPackage>,
}

#[derive(Debug, Serialize)]
pub struct MatchPackage {
    pub id: MatchId,
    pub slot: Slot,
    pub group: Option<char>,
    #[serde(with = "iso_date_format")]
    pub date: Date,
    #[serde(with = "slot_format")]
    pub time: Time,
    // Team name once known, the placeholder until then.
    pub home: String,
    pub away: String,
    pub home_goals: Option<Goals>,
    pub away_goals: Option<Goals>,
    pub shootout_winner: Option<HomeAway>,
}

fn label(side: &Side, name: Option<String>) -> String {
    match (name, side.placeholder) {
        (Some(name), _) => name,
        (None, Some(placeholder)) => placeholder.to_string(),
        (None, None) => "TBD".to_string(),
    }
}

impl FromRow<'_, SqliteRow> for MatchPackage {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let game = Match::from_row(row)?;
        let group: Option<String> = row.try_get("group_label")?;
        let score = game.score;

        Ok(Self {
            id: game.id,
            slot: game.slot,
            group: group.and_then(|label| label.chars().next()),
            date: game.date,
            time: game.time_slot,
            home: label(&game.home, row.try_get("home_name")?),
            away: label(&game.away, row.try_get("away_name")?),
            home_goals: score.map(|s| s.home_goals),
            away_goals: score.map(|s| s.away_goals),
            shootout_winner: score.and_then(|s| s.shootout_winner),
        })
    }
}

impl SchedulePackage {
    pub async fn build(conn: &mut Conn, stage: Stage) -> Result<Self> {
        let matches = sqlx::query_as(
            "SELECT Fixture.*,
            HomeTeam.full_name AS home_name,
            AwayTeam.full_name AS away_name,
            TeamGroup.label AS group_label
            FROM Fixture

            LEFT JOIN Team AS HomeTeam ON HomeTeam.id = Fixture.home_id
            LEFT JOIN Team AS AwayTeam ON AwayTeam.id = Fixture.away_id
            LEFT JOIN TeamGroup ON TeamGroup.id = Fixture.group_id

            WHERE stage = $1
            ORDER BY date ASC, time_slot ASC, slot ASC, Fixture.id ASC"
        ).bind(stage)
        .fetch_all(&mut *conn).await?;

        Ok(Self { stage, matches })
    }
}
