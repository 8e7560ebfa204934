//! End-to-end flows through `AppState` and the session controllers.

mod common;

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::SeedableRng;

use common::{create_app_with_store, create_test_app, FlakyStore};
use mathe_stylistin::practice::{RewardPolicy, Topic, TopicSelection};
use mathe_stylistin::seed;
use mathe_stylistin::session::{
    DojoSession, MathTaskSession, PracticeSession, SessionPhase, SubmitOutcome,
};
use mathe_stylistin::storage::{
    AppliedStyling, ItemType, MemoryStore, Position, ProgressStore, Storage, StylingItem,
    UserProgress,
};
use mathe_stylistin::{AppError, AppState, LoadState, ProgressPatch};

fn answer_correctly<S: PracticeSession>(session: &mut S) -> SubmitOutcome {
    let answer = session.current_problem().correct_answer.to_string();
    let outcome = session.submit(&answer).expect("Failed to submit answer");
    if let SubmitOutcome::Correct { ticket, .. } = &outcome {
        assert!(session.advance(*ticket).expect("Failed to advance"));
    }
    outcome
}

// ============================================================
// Fetch-merge-write
// ============================================================

#[test]
fn test_patch_merges_with_latest_persisted_record() {
    let storage = Arc::new(Storage::in_memory().expect("Failed to create storage"));
    let app = create_app_with_store(storage.clone());

    let mut external = UserProgress::initial();
    external.correct_answers_streak = 0;
    external.total_correct_answers = 5;
    storage.save_user_progress(&external).expect("Failed to save");

    let updated = app
        .update_user_progress(ProgressPatch::new().streak(1).total_correct(6))
        .expect("Failed to update progress");
    assert_eq!(updated.correct_answers_streak, 1);
    assert_eq!(updated.total_correct_answers, 6);

    let updated = app
        .update_user_progress(ProgressPatch::new().difficulty(Topic::Multiplication, 4))
        .expect("Failed to update difficulty");
    assert_eq!(updated.correct_answers_streak, 1);
    assert_eq!(updated.total_correct_answers, 6);
    assert_eq!(updated.difficulty_for(Topic::Multiplication), 4);
    assert_eq!(updated.difficulty_for(Topic::Addition), 1);

    let stored = storage.get_user_progress().unwrap().unwrap();
    assert_eq!(stored, updated);
    assert_eq!(app.user_progress(), Some(updated));
}

#[test]
fn test_patch_does_not_resurrect_stale_snapshot_fields() {
    let storage = Arc::new(Storage::in_memory().expect("Failed to create storage"));
    let app = create_app_with_store(storage.clone());

    app.update_user_progress(ProgressPatch::new().total_incorrect(2))
        .expect("Failed to update progress");

    // another writer bumps the counter behind the app's back
    let mut external = storage.get_user_progress().unwrap().unwrap();
    external.total_incorrect_answers = 9;
    storage.save_user_progress(&external).unwrap();

    let updated = app
        .update_user_progress(ProgressPatch::new().streak(3))
        .expect("Failed to update progress");
    assert_eq!(updated.total_incorrect_answers, 9);
    assert_eq!(updated.correct_answers_streak, 3);
}

#[test]
fn test_concurrent_updates_are_not_lost() {
    let app = create_test_app();

    thread::scope(|scope| {
        for worker in 0..8 {
            let app = &app;
            scope.spawn(move || {
                for _ in 0..50 {
                    if worker % 2 == 0 {
                        app.modify_user_progress(|p| {
                            p.total_correct_answers += 1;
                            p.correct_answers_streak += 1;
                        })
                        .expect("Failed to bump counters");
                    } else {
                        app.modify_user_progress(|p| {
                            p.total_incorrect_answers += 1;
                            let level = p.difficulty_for(Topic::Sizes);
                            p.set_difficulty(Topic::Sizes, level % 10 + 1);
                        })
                        .expect("Failed to bump difficulty");
                    }
                }
            });
        }
    });

    let progress = app.refresh_user_progress().unwrap().unwrap();
    assert_eq!(progress.total_correct_answers, 200);
    assert_eq!(progress.correct_answers_streak, 200);
    assert_eq!(progress.total_incorrect_answers, 200);
    // 200 wrapping steps from level 1 land back on 1
    assert_eq!(progress.difficulty_for(Topic::Sizes), 1);
}

#[test]
fn test_difficulty_writes_are_clamped() {
    let app = create_test_app();
    let progress = app
        .set_difficulty_for_topic(Topic::Geometry, 42)
        .expect("Failed to set difficulty");
    assert_eq!(progress.difficulty_for(Topic::Geometry), 10);
    assert_eq!(app.difficulty_for_topic(Topic::Geometry), 10);
}

// ============================================================
// Sessions
// ============================================================

#[test]
fn test_math_task_requires_ready_app() {
    let storage = Storage::in_memory().expect("Failed to create storage");
    let app = Arc::new(AppState::new(Arc::new(storage), RewardPolicy::default()));
    let result = MathTaskSession::new(app, TopicSelection::Mixed);
    assert!(matches!(result, Err(AppError::NotReady)));
}

#[test]
fn test_fifth_correct_answer_unlocks_next_item() {
    let app = create_test_app();
    let mut session = MathTaskSession::with_rng(
        app.clone(),
        TopicSelection::Concrete(Topic::Addition),
        StdRng::seed_from_u64(11),
    )
    .expect("Failed to start session");

    for expected_streak in 1..=4 {
        match answer_correctly(&mut session) {
            SubmitOutcome::Correct { streak, unlocked, .. } => {
                assert_eq!(streak, expected_streak);
                assert!(unlocked.is_none());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(session.scoreboard().progress_to_next_unlock, Some(4));

    let SubmitOutcome::Correct { streak, unlocked, .. } = answer_correctly(&mut session) else {
        panic!("expected a correct outcome");
    };
    assert_eq!(streak, 5);
    assert_eq!(unlocked.map(|item| item.id).as_deref(), Some("color-purple"));

    let summary = app.unlock_summary();
    assert_eq!(summary.unlocked, 4);
    assert_eq!(app.progress_to_next_unlock(), 0);

    let progress = app.user_progress().unwrap();
    assert_eq!(progress.total_correct_answers, 5);
    assert_eq!(progress.difficulty_for(Topic::Addition), 6);
    assert!(progress.last_session_date.is_some());
}

#[test]
fn test_incorrect_answer_resets_streak_and_allows_retry() {
    let app = create_test_app();
    app.set_difficulty_for_topic(Topic::Subtraction, 3).unwrap();
    let mut session = MathTaskSession::with_rng(
        app.clone(),
        TopicSelection::Concrete(Topic::Subtraction),
        StdRng::seed_from_u64(3),
    )
    .unwrap();

    answer_correctly(&mut session);
    assert_eq!(session.submit("nope").unwrap(), SubmitOutcome::Incorrect { streak: 0 });
    assert_eq!(session.phase(), SessionPhase::FeedbackIncorrect);

    let progress = app.user_progress().unwrap();
    assert_eq!(progress.correct_answers_streak, 0);
    assert_eq!(progress.total_incorrect_answers, 1);
    // up once, down once
    assert_eq!(progress.difficulty_for(Topic::Subtraction), 3);

    assert!(matches!(answer_correctly(&mut session), SubmitOutcome::Correct { streak: 1, .. }));
}

#[test]
fn test_submit_during_feedback_is_ignored() {
    let app = create_test_app();
    let mut session = MathTaskSession::with_rng(
        app.clone(),
        TopicSelection::Concrete(Topic::Multiplication),
        StdRng::seed_from_u64(8),
    )
    .unwrap();

    let answer = session.current_problem().correct_answer.to_string();
    let SubmitOutcome::Correct { ticket, .. } = session.submit(&answer).unwrap() else {
        panic!("expected a correct outcome");
    };
    assert_eq!(session.submit(&answer).unwrap(), SubmitOutcome::Ignored);
    assert_eq!(app.user_progress().unwrap().total_correct_answers, 1);

    // a manual next supersedes the pending timer
    session.next_problem().unwrap();
    assert!(!session.advance(ticket).unwrap());
}

#[test]
fn test_skip_persists_streak_reset() {
    let app = create_test_app();
    let mut session = MathTaskSession::with_rng(
        app.clone(),
        TopicSelection::Concrete(Topic::Division),
        StdRng::seed_from_u64(21),
    )
    .unwrap();

    answer_correctly(&mut session);
    answer_correctly(&mut session);
    assert_eq!(app.user_progress().unwrap().correct_answers_streak, 2);

    session.skip().unwrap();
    let progress = app.user_progress().unwrap();
    assert_eq!(progress.correct_answers_streak, 0);
    assert_eq!(progress.total_correct_answers, 2);
}

#[test]
fn test_failed_progress_write_counts_nothing() {
    let store = Arc::new(FlakyStore::new(MemoryStore::new()));
    let app = create_app_with_store(store.clone());
    let mut session = MathTaskSession::with_rng(
        app.clone(),
        TopicSelection::Concrete(Topic::Addition),
        StdRng::seed_from_u64(17),
    )
    .unwrap();
    let answer = session.current_problem().correct_answer.to_string();

    store.fail_saves.store(true, Ordering::SeqCst);
    assert!(session.submit(&answer).is_err());
    assert_eq!(session.phase(), SessionPhase::AwaitingAnswer);
    assert_eq!(app.user_progress().unwrap().total_correct_answers, 0);

    store.fail_saves.store(false, Ordering::SeqCst);
    let outcome = session.submit(&answer).unwrap();
    assert!(matches!(outcome, SubmitOutcome::Correct { streak: 1, .. }));

    let progress = store.inner().get_user_progress().unwrap().unwrap();
    assert_eq!(progress.total_correct_answers, 1);
    assert_eq!(progress.correct_answers_streak, 1);
    assert_eq!(progress.difficulty_for(Topic::Addition), 2);
}

#[test]
fn test_failed_unlock_keeps_answer_counted_once_and_retries() {
    let store = Arc::new(FlakyStore::new(MemoryStore::new()));
    let app = create_app_with_store(store.clone());
    let mut session = MathTaskSession::with_rng(
        app.clone(),
        TopicSelection::Concrete(Topic::Multiplication),
        StdRng::seed_from_u64(23),
    )
    .unwrap();

    for _ in 0..4 {
        answer_correctly(&mut session);
    }

    store.fail_item_saves.store(true, Ordering::SeqCst);
    let answer = session.current_problem().correct_answer.to_string();
    let SubmitOutcome::Correct { ticket, streak, unlocked } = session.submit(&answer).unwrap()
    else {
        panic!("expected a correct outcome");
    };
    assert_eq!(streak, 5);
    assert!(unlocked.is_none());
    assert_eq!(session.phase(), SessionPhase::FeedbackCorrect);
    assert_eq!(session.submit(&answer).unwrap(), SubmitOutcome::Ignored);
    assert_eq!(app.user_progress().unwrap().total_correct_answers, 5);
    assert_eq!(app.unlock_summary().unlocked, 3);

    store.fail_item_saves.store(false, Ordering::SeqCst);
    assert!(session.advance(ticket).unwrap());
    let SubmitOutcome::Correct { streak, unlocked, .. } = answer_correctly(&mut session) else {
        panic!("expected a correct outcome");
    };
    assert_eq!(streak, 6);
    assert_eq!(unlocked.map(|item| item.id).as_deref(), Some("color-purple"));
    assert_eq!(app.user_progress().unwrap().total_correct_answers, 6);
}

#[test]
fn test_mixed_session_spreads_over_all_topics() {
    let app = create_test_app();
    let mut session =
        MathTaskSession::with_rng(app, TopicSelection::Mixed, StdRng::seed_from_u64(99))
            .unwrap();

    let mut seen = HashSet::new();
    for _ in 0..300 {
        seen.insert(session.current_problem().topic);
        session.next_problem().unwrap();
    }
    assert_eq!(seen.len(), 6);
}

#[test]
fn test_dojo_never_touches_persisted_progress() {
    let app = create_test_app();
    let before = app.user_progress();

    let mut dojo = DojoSession::topic_with_rng(
        TopicSelection::Concrete(Topic::Addition),
        StdRng::seed_from_u64(4),
    );
    for _ in 0..6 {
        let SubmitOutcome::Correct { unlocked, .. } = answer_correctly(&mut dojo) else {
            panic!("expected a correct outcome");
        };
        assert!(unlocked.is_none());
    }
    assert_eq!(dojo.scoreboard().streak, 6);

    assert_eq!(app.user_progress(), before);
    assert_eq!(app.unlock_summary().unlocked, 3);
}

// ============================================================
// Character styling
// ============================================================

#[test]
fn test_applying_same_item_twice_keeps_one_entry() {
    let app = create_test_app();

    let state = app
        .apply_styling(AppliedStyling::new("accessory-glasses-1"))
        .expect("Failed to apply styling");
    assert_eq!(state.applied_items.len(), 1);
    assert_eq!(state.applied_items[0].position, Some(Position::new(50.0, 38.0)));

    let moved = AppliedStyling::new("accessory-glasses-1").at(Position::new(40.0, 40.0));
    let state = app.apply_styling(moved).unwrap();
    assert_eq!(state.applied_items.len(), 1);
    assert_eq!(state.applied_items[0].position, Some(Position::new(40.0, 40.0)));

    let state = app.apply_styling(AppliedStyling::new("color-blue")).unwrap();
    assert_eq!(state.background_color.as_deref(), Some("#87CEEB"));
    assert_eq!(state.applied_items.len(), 1);
}

#[test]
fn test_locked_and_unknown_items_are_rejected() {
    let app = create_test_app();
    assert!(matches!(
        app.apply_styling(AppliedStyling::new("accessory-crown")),
        Err(AppError::ItemLocked(_))
    ));
    assert!(matches!(
        app.apply_styling(AppliedStyling::new("does-not-exist")),
        Err(AppError::UnknownItem(_))
    ));
    assert!(matches!(
        app.select_background("accessory-glasses-1"),
        Err(AppError::NotAColor(_))
    ));
    assert!(app.character_state().applied_items.is_empty());
}

#[test]
fn test_partial_catalog_save_keeps_order_in_both_stores() {
    let stores: [Arc<dyn ProgressStore>; 2] = [
        Arc::new(Storage::in_memory().expect("Failed to create storage")),
        Arc::new(MemoryStore::new()),
    ];
    let seed_ids: Vec<String> = seed::initial_styling_items()
        .into_iter()
        .map(|item| item.id)
        .collect();

    for store in stores {
        let app = create_app_with_store(store);
        let mut renamed = app.styling_items()[5].clone();
        renamed.name = "Umbenannt".to_string();
        let extra = StylingItem::new("effect-hearts", ItemType::Effect, "Herzen", "💖");

        let saved = app
            .save_styling_items(&[extra, renamed])
            .expect("Failed to save catalog");

        let ids: Vec<String> = saved.iter().map(|item| item.id.clone()).collect();
        assert_eq!(&ids[..seed_ids.len()], &seed_ids[..]);
        assert_eq!(ids.last().map(String::as_str), Some("effect-hearts"));
        assert_eq!(saved[5].name, "Umbenannt");
    }
}

// ============================================================
// Reset
// ============================================================

#[test]
fn test_reset_restores_seed_everywhere() {
    let storage = Arc::new(Storage::in_memory().expect("Failed to create storage"));
    let app = create_app_with_store(storage.clone());

    app.update_user_progress(ProgressPatch::new().streak(4).total_correct(40))
        .unwrap();
    app.check_and_unlock_between(4, 5).unwrap();
    app.apply_styling(AppliedStyling::new("accessory-glasses-1"))
        .unwrap();

    app.reset_all_data().expect("Failed to reset");

    assert_eq!(app.user_progress(), Some(seed::initial_user_progress()));
    assert_eq!(app.styling_items(), seed::initial_styling_items());
    assert_eq!(app.character_state(), seed::initial_character_state());

    assert_eq!(
        storage.get_user_progress().unwrap(),
        Some(seed::initial_user_progress())
    );
    assert_eq!(
        storage.get_all_styling_items().unwrap(),
        seed::initial_styling_items()
    );
    assert_eq!(
        storage.get_character_state().unwrap(),
        Some(seed::initial_character_state())
    );
}

#[test]
fn test_failed_reset_leaves_state_unchanged() {
    let store = Arc::new(FlakyStore::new(MemoryStore::new()));
    let app = create_app_with_store(store.clone());

    app.update_user_progress(ProgressPatch::new().total_correct(12))
        .unwrap();
    app.apply_styling(AppliedStyling::new("accessory-glasses-1"))
        .unwrap();

    store.fail_reset.store(true, Ordering::SeqCst);
    let result = app.reset_all_data();
    assert!(matches!(result, Err(AppError::Reset(_))));

    assert_eq!(app.user_progress().unwrap().total_correct_answers, 12);
    assert_eq!(app.character_state().applied_items.len(), 1);
    assert_eq!(
        store.inner().get_user_progress().unwrap().unwrap().total_correct_answers,
        12
    );
}

// ============================================================
// Bootstrap
// ============================================================

#[test]
fn test_bootstrap_degrades_to_memory_on_read_failure() {
    let store = Arc::new(FlakyStore::new(MemoryStore::new()));
    store.fail_reads.store(true, Ordering::SeqCst);

    let app = AppState::new(store.clone(), RewardPolicy::default());
    let state = app.bootstrap().expect("Failed to bootstrap");
    assert_eq!(state, LoadState::Ready { degraded: true });
    assert!(app.is_degraded());
    assert_eq!(app.styling_items(), seed::initial_styling_items());

    // the fallback store keeps working for the rest of the run
    let progress = app
        .update_user_progress(ProgressPatch::new().streak(2))
        .expect("Failed to update in degraded mode");
    assert_eq!(progress.correct_answers_streak, 2);
    assert!(store.inner().get_user_progress().unwrap().is_none());
}

#[test]
fn test_bootstrap_is_idempotent() {
    let app = create_test_app();
    app.update_user_progress(ProgressPatch::new().streak(3)).unwrap();
    assert_eq!(app.bootstrap().unwrap(), LoadState::Ready { degraded: false });
    assert_eq!(app.user_progress().unwrap().correct_answers_streak, 3);
}

#[test]
fn test_progress_survives_reopen() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("nested").join("progress.db");

    {
        let storage = Storage::open(&db_path).expect("Failed to open storage");
        let app = create_app_with_store(Arc::new(storage));
        app.update_user_progress(ProgressPatch::new().total_correct(7).difficulty(Topic::Sizes, 5))
            .unwrap();
        app.check_and_unlock_between(0, 5).unwrap();
        app.apply_styling(AppliedStyling::new("color-purple")).unwrap();
    }

    let storage = Storage::open(&db_path).expect("Failed to reopen storage");
    let app = create_app_with_store(Arc::new(storage));
    let progress = app.user_progress().unwrap();
    assert_eq!(progress.total_correct_answers, 7);
    assert_eq!(progress.difficulty_for(Topic::Sizes), 5);
    assert_eq!(app.unlock_summary().unlocked, 4);
    assert_eq!(
        app.character_state().background_color.as_deref(),
        Some("#DDA0DD")
    );
}

#[test]
fn test_export_contains_snapshot() {
    let app = create_test_app();
    let json = app.export_json().expect("Failed to export");
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["loadState"]["state"], "ready");
    assert_eq!(value["unlockThreshold"], 5);
    assert_eq!(value["stylingItems"].as_array().unwrap().len(), 14);
}
