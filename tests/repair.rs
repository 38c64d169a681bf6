mod common;

use std::time::Duration;

use cup_schedule_lib::{AppData, Config, Error, Stage, Tournament, logic::{error::Result, competition::{checker::{Checker, ViolationKind}, fixture::Match}, config::GroupSetup, group::Group}};

use common::{app_data, setup, stage_matches, tournament};

// Copy a match row as-is, the way a double submission would.
async fn duplicate(tournament: &Tournament, stage: Stage, slot: u16) {
    sqlx::query(
        "INSERT INTO Fixture
        (stage, slot, group_id, date, time_slot, home_placeholder, away_placeholder, home_id, away_id, home_goals, away_goals, shootout_winner)
        SELECT stage, slot, group_id, date, time_slot, home_placeholder, away_placeholder, home_id, away_id, home_goals, away_goals, shootout_winner
        FROM Fixture WHERE stage = $1 AND slot = $2"
    ).bind(stage)
    .bind(slot)
    .execute(&tournament.data().db).await.unwrap();
}

// Deletes the stage, then takes far longer than anyone is willing to wait before committing.
async fn slow_delete(data: &AppData) -> Result<()> {
    let mut tx = data.db.begin().await?;
    Match::delete_stage(&mut tx, Stage::RoundOf16).await?;
    tokio::time::sleep(Duration::from_secs(5)).await;
    tx.commit().await?;
    Ok(())
}

fn ids(matches: &[Match]) -> Vec<i64> {
    let mut ids: Vec<i64> = matches.iter().map(|m| m.id).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn duplicates_are_removed_down_to_one() {
    let tournament = tournament().await;
    tournament.generate(Stage::RoundOf16).await.unwrap();
    let original = ids(&stage_matches(&tournament, Stage::RoundOf16).await);

    // Nine matches, five of them on the first day.
    duplicate(&tournament, Stage::RoundOf16, 1).await;
    assert_eq!(stage_matches(&tournament, Stage::RoundOf16).await.len(), 9);
    let violations = tournament.check(Stage::RoundOf16).await.unwrap();
    let kinds: Vec<ViolationKind> = violations.iter().map(|v| v.kind).collect();
    assert_eq!(kinds, vec![ViolationKind::UnevenMatchesPerDay, ViolationKind::DuplicateFixture]);

    let report = tournament.repairer().deduplicate_fixtures(Stage::RoundOf16).await.unwrap();
    assert_eq!(report.removed.len(), 1);
    assert!(!original.contains(&report.removed[0]));

    let matches = stage_matches(&tournament, Stage::RoundOf16).await;
    assert_eq!(ids(&matches), original);
    assert!(tournament.check(Stage::RoundOf16).await.unwrap().is_empty());

    // Nothing left to do the second time.
    let again = tournament.repairer().deduplicate_fixtures(Stage::RoundOf16).await.unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn stray_days_are_moved_back_into_place() {
    let tournament = tournament().await;
    tournament.generate(Stage::RoundOf16).await.unwrap();
    sqlx::query("UPDATE Fixture SET date = '2025-06-27' WHERE stage = 'RoundOf16' AND slot = 8")
        .execute(&tournament.data().db).await.unwrap();

    let kinds: Vec<ViolationKind> = tournament.check(Stage::RoundOf16).await.unwrap().iter().map(|v| v.kind).collect();
    assert!(kinds.contains(&ViolationKind::WrongDayCount));
    assert!(kinds.contains(&ViolationKind::UnevenMatchesPerDay));

    let report = tournament.repairer().renormalize_day_assignment(Stage::RoundOf16).await.unwrap();
    assert_eq!(report.moved.len(), 1);

    let matches = stage_matches(&tournament, Stage::RoundOf16).await;
    let last = matches.iter().find(|m| m.slot == 8).unwrap();
    assert_eq!(last.date, time::macros::date!(2025-06-26));
    assert!(tournament.check(Stage::RoundOf16).await.unwrap().is_empty());
}

#[tokio::test]
async fn a_rebuild_leaves_no_duplicates() {
    let tournament = tournament().await;
    tournament.generate(Stage::RoundOf16).await.unwrap();
    duplicate(&tournament, Stage::RoundOf16, 3).await;
    duplicate(&tournament, Stage::RoundOf16, 6).await;
    let old = ids(&stage_matches(&tournament, Stage::RoundOf16).await);

    let violations = tournament.rebuild(Stage::RoundOf16).await.unwrap();
    assert!(violations.is_empty());

    let matches = stage_matches(&tournament, Stage::RoundOf16).await;
    assert_eq!(matches.len(), 8);
    // Ids are never handed out twice.
    assert!(matches.iter().all(|m| !old.contains(&m.id)));
}

#[tokio::test]
async fn a_failed_rebuild_leaves_the_stage_alone() {
    let tournament = tournament().await;
    tournament.generate(Stage::RoundOf16).await.unwrap();
    let before = stage_matches(&tournament, Stage::RoundOf16).await;

    // A ninth group cannot be fitted into the Round of 16.
    {
        let mut conn = tournament.data().db.acquire().await.unwrap();
        Group::build_and_save(&mut conn, 'I', 4).await.unwrap();
    }

    let result = tournament.rebuild(Stage::RoundOf16).await;
    assert!(matches!(result, Err(Error::InvalidScheduleSpec(_))));
    assert_eq!(stage_matches(&tournament, Stage::RoundOf16).await, before);
}

#[tokio::test]
async fn repair_falls_back_to_a_rebuild() {
    let tournament = tournament().await;
    tournament.generate(Stage::RoundOf16).await.unwrap();
    sqlx::query("DELETE FROM Fixture WHERE stage = 'RoundOf16' AND slot = 5")
        .execute(&tournament.data().db).await.unwrap();

    // Seven matches cannot be spread over days of four.
    let report = tournament.repair(Stage::RoundOf16).await.unwrap();
    assert!(report.rebuilt);
    assert!(report.moved.is_empty());
    assert_eq!(stage_matches(&tournament, Stage::RoundOf16).await.len(), 8);
    assert!(tournament.check(Stage::RoundOf16).await.unwrap().is_empty());
}

#[tokio::test]
async fn an_impossible_repair_is_rolled_back() {
    let tournament = Tournament::new(app_data().await);
    let mut short = setup();
    short.groups[0] = GroupSetup { label: 'A', team_count: Some(4), teams: vec!["A1".into(), "A2".into(), "A3".into()] };
    tournament.setup(&short, &Config::default().stages).await.unwrap();

    let kinds: Vec<ViolationKind> = tournament.check(Stage::GroupStage).await.unwrap().iter().map(|v| v.kind).collect();
    assert_eq!(kinds, vec![ViolationKind::WrongDayCount, ViolationKind::MissingTeamCount]);

    match tournament.repair(Stage::GroupStage).await {
        Err(Error::RepairIncomplete { stage, remaining }) => {
            assert_eq!(stage, Stage::GroupStage);
            assert!(remaining.iter().any(|v| v.kind == ViolationKind::MissingTeamCount));
        },
        other => panic!("expected an incomplete repair, got {other:?}"),
    }
    assert!(stage_matches(&tournament, Stage::GroupStage).await.is_empty());
}

#[tokio::test]
async fn an_expired_deadline_rolls_back() {
    let tournament = tournament().await;
    tournament.generate(Stage::RoundOf16).await.unwrap();
    let data = tournament.data().clone().with_timeout(Duration::from_millis(50));

    let result = data.within("slow rebuild", slow_delete(&data)).await;

    assert!(matches!(result, Err(Error::Timeout(_))));
    assert_eq!(stage_matches(&tournament, Stage::RoundOf16).await.len(), 8);
}

#[tokio::test]
async fn a_busy_stage_times_out_instead_of_waiting_forever() {
    let tournament = tournament().await;
    let data = tournament.data().clone().with_timeout(Duration::from_millis(50));
    let checker = Checker::new(&data);

    let _rebuilding = data.locks.write(Stage::Semifinal).await;
    assert!(matches!(checker.check(Stage::Semifinal).await, Err(Error::Timeout(_))));
    // Other stages are not held up.
    assert!(checker.check(Stage::Final).await.is_ok());
}
