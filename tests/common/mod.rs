#![allow(dead_code)]

use cup_schedule_lib::{AppData, Config, Stage, Tournament, TournamentSetup, db, logic::{competition::fixture::{Match, Score}, config::GroupSetup, group::Group}};

pub const LABELS: [char; 8] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

// A fresh in-memory database with the schema in place.
pub async fn app_data() -> AppData {
    let config = Config::default();
    let db = db::setup(&config.database_url).await.unwrap();
    AppData::build(db, &config)
}

// Eight groups of four.
pub fn setup() -> TournamentSetup {
    TournamentSetup {
        groups: LABELS.iter().map(|label| GroupSetup {
            label: *label,
            team_count: None,
            teams: (1..=4).map(|n| format!("{label}{n}")).collect(),
        }).collect(),
    }
}

pub async fn tournament() -> Tournament {
    let tournament = Tournament::new(app_data().await);
    tournament.setup(&setup(), &Config::default().stages).await.unwrap();
    tournament
}

pub async fn stage_matches(tournament: &Tournament, stage: Stage) -> Vec<Match> {
    let mut conn = tournament.data().db.acquire().await.unwrap();
    Match::fetch_stage(&mut conn, stage).await.unwrap()
}

pub async fn group_matches(tournament: &Tournament, label: char) -> Vec<Match> {
    let mut conn = tournament.data().db.acquire().await.unwrap();
    let group = Group::fetch_by_label(&mut conn, label).await.unwrap().unwrap();
    group.matches(&mut conn).await.unwrap()
}

// The team with the lower id wins 1-0, so the table ends up in draw order.
pub fn lower_id_wins(game: &Match) -> Score {
    if game.home.team_id < game.away.team_id {
        Score::build(1, 0, None)
    }
    else {
        Score::build(0, 1, None)
    }
}

// Score the first `count` matches of a group.
pub async fn score_group(tournament: &Tournament, label: char, count: usize) {
    for game in group_matches(tournament, label).await.into_iter().take(count) {
        tournament.record_result(game.id, lower_id_wins(&game)).await.unwrap();
    }
}

pub async fn score_stage(tournament: &Tournament, stage: Stage) {
    for game in stage_matches(tournament, stage).await {
        tournament.record_result(game.id, lower_id_wins(&game)).await.unwrap();
    }
}

pub async fn team_id(tournament: &Tournament, name: &str) -> i64 {
    tournament.teams().await.unwrap().into_iter()
        .find(|team| team.full_name == name)
        .map(|team| team.id)
        .unwrap()
}
