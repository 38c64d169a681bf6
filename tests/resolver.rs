mod common;

use cup_schedule_lib::{Error, Stage, Tournament, logic::competition::{checker::ViolationKind, fixture::{HomeAway, Match, Score}, placeholder::Placeholder}};

use common::{group_matches, score_group, stage_matches, team_id, tournament};

#[tokio::test]
async fn resolution_is_partial_when_one_group_is_still_playing() {
    let tournament = tournament().await;
    tournament.generate(Stage::GroupStage).await.unwrap();
    score_group(&tournament, 'A', 6).await;
    score_group(&tournament, 'B', 5).await;
    tournament.generate(Stage::RoundOf16).await.unwrap();

    let result = tournament.resolve(Stage::RoundOf16).await.unwrap();
    let matches = stage_matches(&tournament, Stage::RoundOf16).await;
    let first = matches.iter().find(|m| m.slot == 1).unwrap();
    let second = matches.iter().find(|m| m.slot == 2).unwrap();

    // Winner A v Runner-up B: only the home side is known.
    assert_eq!(first.home.team_id, Some(team_id(&tournament, "A1").await));
    assert_eq!(first.away.team_id, None);
    // Winner B v Runner-up A: only the away side is known.
    assert_eq!(second.home.team_id, None);
    assert_eq!(second.away.team_id, Some(team_id(&tournament, "A2").await));

    assert!(!result.is_complete());
    assert!(result.unresolved.iter().any(|e| matches!(
        e,
        Error::UnresolvedDependency { match_id, placeholder, .. }
            if *match_id == first.id && *placeholder == Placeholder::runner_up_of_group('B')
    )));

    // Matches fed by other groups are untouched.
    assert!(matches.iter().filter(|m| m.slot > 2).all(|m| m.home.team_id.is_none() && m.away.team_id.is_none()));
    assert!(tournament.check(Stage::RoundOf16).await.unwrap().is_empty());
}

#[tokio::test]
async fn resolving_twice_changes_nothing() {
    let tournament = tournament().await;
    tournament.generate(Stage::GroupStage).await.unwrap();
    score_group(&tournament, 'C', 6).await;
    tournament.generate(Stage::RoundOf16).await.unwrap();

    tournament.resolve(Stage::RoundOf16).await.unwrap();
    let before = stage_matches(&tournament, Stage::RoundOf16).await;
    let again = tournament.resolve(Stage::RoundOf16).await.unwrap();
    let after = stage_matches(&tournament, Stage::RoundOf16).await;

    assert_eq!(before, after);
    assert!(again.resolved.is_empty());
}

#[tokio::test]
async fn resolution_keeps_dates_and_times() {
    let tournament = tournament().await;
    tournament.generate(Stage::GroupStage).await.unwrap();
    tournament.generate(Stage::RoundOf16).await.unwrap();
    let before = stage_matches(&tournament, Stage::RoundOf16).await;

    for label in common::LABELS {
        score_group(&tournament, label, 6).await;
    }
    let results = tournament.results_final(Stage::GroupStage).await.unwrap();
    let (stage, result) = &results[0];
    assert_eq!(*stage, Stage::RoundOf16);
    assert_eq!(result.resolved.len(), 16);
    assert!(result.is_complete());

    let after = stage_matches(&tournament, Stage::RoundOf16).await;
    for (old, new) in before.iter().zip(after.iter()) {
        assert_eq!((old.id, old.date, old.time_slot), (new.id, new.date, new.time_slot));
        assert!(new.is_resolved());
    }
}

#[tokio::test]
async fn an_unresolved_placeholder_of_a_final_group_is_orphaned() {
    let tournament = tournament().await;
    tournament.generate(Stage::GroupStage).await.unwrap();
    tournament.generate(Stage::RoundOf16).await.unwrap();

    // Scores arrive without anyone telling the bracket.
    score_group(&tournament, 'D', 6).await;
    let violations = tournament.check(Stage::RoundOf16).await.unwrap();
    assert_eq!(violations.len(), 2);
    assert!(violations.iter().all(|v| v.kind == ViolationKind::OrphanedPlaceholder));

    let report = tournament.repair(Stage::RoundOf16).await.unwrap();
    assert_eq!(report.resolved, 2);
    assert!(!report.rebuilt);
    assert!(tournament.check(Stage::RoundOf16).await.unwrap().is_empty());
}

#[tokio::test]
async fn knockout_sources_resolve_winner_and_loser() {
    let tournament = tournament().await;
    tournament.generate(Stage::GroupStage).await.unwrap();
    for label in common::LABELS {
        score_group(&tournament, label, 6).await;
    }
    tournament.generate(Stage::RoundOf16).await.unwrap();
    tournament.generate(Stage::Quarterfinal).await.unwrap();

    let round_of_16 = stage_matches(&tournament, Stage::RoundOf16).await;
    let first = round_of_16.iter().find(|m| m.slot == 1).unwrap();
    let second = round_of_16.iter().find(|m| m.slot == 2).unwrap();

    // A level match goes to the shootout winner.
    tournament.record_result(first.id, Score::build(2, 2, Some(HomeAway::Away))).await.unwrap();
    tournament.record_result(second.id, Score::build(3, 0, None)).await.unwrap();
    tournament.results_final(Stage::RoundOf16).await.unwrap();

    let quarterfinal = stage_matches(&tournament, Stage::Quarterfinal).await;
    let opener = quarterfinal.iter().find(|m| m.slot == 1).unwrap();
    assert_eq!(opener.home.team_id, first.away.team_id);
    assert_eq!(opener.away.team_id, second.home.team_id);
    assert_eq!(opener.home.placeholder, Some(Placeholder::winner_of(Stage::RoundOf16, 1)));
}

fn slot(matches: &[Match], slot: u16) -> Match {
    matches.iter().find(|m| m.slot == slot).cloned().unwrap()
}

// Score a whole group again, this time with the higher id winning every match.
async fn reverse_group(tournament: &Tournament, label: char) {
    for game in group_matches(tournament, label).await {
        let score = if game.home.team_id > game.away.team_id { Score::build(2, 0, None) } else { Score::build(0, 2, None) };
        tournament.record_result(game.id, score).await.unwrap();
    }
}

#[tokio::test]
async fn a_corrected_group_result_moves_the_bracket() {
    let tournament = tournament().await;
    tournament.generate(Stage::GroupStage).await.unwrap();
    score_group(&tournament, 'A', 6).await;
    score_group(&tournament, 'B', 6).await;
    tournament.generate(Stage::RoundOf16).await.unwrap();

    let before = stage_matches(&tournament, Stage::RoundOf16).await;
    assert_eq!(slot(&before, 1).home.team_id, Some(team_id(&tournament, "A1").await));

    reverse_group(&tournament, 'A').await;
    let violations = tournament.check(Stage::RoundOf16).await.unwrap();
    let kinds: Vec<ViolationKind> = violations.iter().map(|v| v.kind).collect();
    assert_eq!(kinds, vec![ViolationKind::StaleResolution; 2]);

    let report = tournament.repair(Stage::RoundOf16).await.unwrap();
    assert_eq!(report.resolved, 2);
    assert_eq!(report.cleared, 0);
    assert!(!report.rebuilt);

    let after = stage_matches(&tournament, Stage::RoundOf16).await;
    assert_eq!(slot(&after, 1).home.team_id, Some(team_id(&tournament, "A4").await));
    assert_eq!(slot(&after, 2).away.team_id, Some(team_id(&tournament, "A3").await));
    // Group B stood.
    assert_eq!(slot(&after, 1).away, slot(&before, 1).away);
    assert!(tournament.check(Stage::RoundOf16).await.unwrap().is_empty());
}

#[tokio::test]
async fn a_group_stage_rebuild_empties_the_bracket_again() {
    let tournament = tournament().await;
    tournament.generate(Stage::GroupStage).await.unwrap();
    score_group(&tournament, 'A', 6).await;
    score_group(&tournament, 'B', 6).await;
    tournament.generate(Stage::RoundOf16).await.unwrap();

    let round_of_16 = stage_matches(&tournament, Stage::RoundOf16).await;
    for n in [1, 2] {
        let game = slot(&round_of_16, n);
        tournament.record_result(game.id, common::lower_id_wins(&game)).await.unwrap();
    }
    let quarterfinal = tournament.generate(Stage::Quarterfinal).await.unwrap();
    assert!(slot(&quarterfinal, 1).is_resolved());

    // Every group score is gone.
    assert!(tournament.rebuild(Stage::GroupStage).await.unwrap().is_empty());
    let kinds: Vec<ViolationKind> = tournament.check(Stage::RoundOf16).await.unwrap().iter().map(|v| v.kind).collect();
    assert_eq!(kinds, vec![ViolationKind::StaleResolution; 4]);

    let report = tournament.repair(Stage::RoundOf16).await.unwrap();
    assert_eq!(report.cleared, 4);
    assert_eq!(report.resolved, 0);

    let round_of_16 = stage_matches(&tournament, Stage::RoundOf16).await;
    for n in [1, 2] {
        let game = slot(&round_of_16, n);
        assert_eq!((game.home.team_id, game.away.team_id), (None, None));
        // The results were between teams that no longer qualify.
        assert_eq!(game.score, None);
    }
    assert!(tournament.check(Stage::RoundOf16).await.unwrap().is_empty());

    // The quarterfinal follows once told.
    assert_eq!(tournament.check(Stage::Quarterfinal).await.unwrap().len(), 2);
    let results = tournament.results_final(Stage::RoundOf16).await.unwrap();
    let (stage, result) = &results[0];
    assert_eq!(*stage, Stage::Quarterfinal);
    assert_eq!(result.cleared.len(), 2);
    assert!(!slot(&stage_matches(&tournament, Stage::Quarterfinal).await, 1).home.is_resolved());
    assert!(tournament.check(Stage::Quarterfinal).await.unwrap().is_empty());
}
