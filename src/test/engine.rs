#[cfg(test)]
mod tests {
    use rocket::tokio;

    use crate::error::AppError;
    use crate::models::{CompletionCategory, SandboxDocument};
    use crate::progress::{DEFAULT_HEATMAP_WEEKS, RADAR_SKILLS, intensity};
    use crate::store::StorageKey;
    use crate::test::test_utils::{TestProfileBuilder, empty_profile};

    #[tokio::test]
    async fn test_xp_accumulates_into_levels() {
        let profile = empty_profile().await;

        profile.engine.add_xp(100).await.unwrap();
        profile.engine.add_xp(100).await.unwrap();
        let total = profile.engine.add_xp(50).await.unwrap();

        assert_eq!(total, 250);
        let summary = profile.engine.level_summary().await;
        assert_eq!(summary.level, 2);
        assert_eq!(summary.progress_percent, 50.0);
        assert_eq!(summary.xp_for_next_level, 300);
    }

    #[tokio::test]
    async fn test_zero_xp_is_rejected() {
        let profile = TestProfileBuilder::new().xp(30).build().await.unwrap();

        let result = profile.engine.add_xp(0).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(profile.engine.xp().await, 30);
    }

    #[tokio::test]
    async fn test_completing_twice_keeps_one_entry() {
        let profile = empty_profile().await;

        assert!(profile.engine.complete(CompletionCategory::Lesson, "intro").await);
        assert!(!profile.engine.complete(CompletionCategory::Lesson, "intro").await);

        assert_eq!(
            profile.engine.completed(CompletionCategory::Lesson).await,
            vec!["intro".to_string()]
        );
        assert!(profile.engine.is_completed(CompletionCategory::Lesson, "intro").await);
        assert!(!profile.engine.is_completed(CompletionCategory::Quiz, "intro").await);
    }

    #[tokio::test]
    async fn test_categories_are_independent() {
        let profile = empty_profile().await;

        for category in CompletionCategory::ALL {
            profile.engine.complete(category, "shared-id").await;
        }

        let stats = profile.engine.user_stats().await;
        assert_eq!(stats.completed_lessons, 1);
        assert_eq!(stats.completed_quizzes, 1);
        assert_eq!(stats.completed_projects, 1);
        assert_eq!(stats.completed_bugs, 1);
    }

    #[tokio::test]
    async fn test_reward_is_paid_once() {
        let profile = TestProfileBuilder::new().xp(90).build().await.unwrap();

        let first = profile
            .engine
            .complete_with_reward(CompletionCategory::Lesson, "intro", 20)
            .await;
        let repeat = profile
            .engine
            .complete_with_reward(CompletionCategory::Lesson, "intro", 20)
            .await;

        assert!(first.newly_completed);
        assert_eq!(first.xp_awarded, 20);
        assert_eq!(first.total_xp, 110);
        assert_eq!(first.level_up, Some(1));
        let unlocked: Vec<&str> = first.achievements.iter().map(|a| a.id).collect();
        assert_eq!(unlocked, vec!["first_lesson", "xp_100"]);

        assert!(!repeat.newly_completed);
        assert_eq!(repeat.xp_awarded, 0);
        assert_eq!(repeat.total_xp, 110);
        assert!(repeat.achievements.is_empty());
    }

    #[tokio::test]
    async fn test_quiz_pass_mark_rounds_up() {
        let profile = empty_profile().await;

        let failed = profile
            .engine
            .record_quiz_attempt("quiz-css", 2, 5, 30)
            .await
            .unwrap();
        assert_eq!(failed.passing_score, 3);
        assert!(!failed.passed);
        assert!(failed.reward.is_none());
        assert!(!profile.engine.is_completed(CompletionCategory::Quiz, "quiz-css").await);

        let passed = profile
            .engine
            .record_quiz_attempt("quiz-css", 3, 5, 30)
            .await
            .unwrap();
        assert!(passed.passed);
        assert_eq!(passed.reward.map(|r| r.xp_awarded), Some(30));
        assert_eq!(profile.engine.xp().await, 30);
    }

    #[tokio::test]
    async fn test_quiz_retake_pays_no_further_xp() {
        let profile = empty_profile().await;

        profile
            .engine
            .record_quiz_attempt("quiz-html", 4, 4, 40)
            .await
            .unwrap();
        let retake = profile
            .engine
            .record_quiz_attempt("quiz-html", 4, 4, 40)
            .await
            .unwrap();

        assert!(retake.passed);
        let reward = retake.reward.expect("a passing retake still reports its reward");
        assert!(!reward.newly_completed);
        assert_eq!(reward.xp_awarded, 0);
        assert_eq!(profile.engine.xp().await, 40);
        assert_eq!(
            profile.engine.completed(CompletionCategory::Quiz).await,
            vec!["quiz-html".to_string()]
        );
    }

    #[tokio::test]
    async fn test_quiz_attempt_bounds() {
        let profile = empty_profile().await;

        let no_questions = profile.engine.record_quiz_attempt("q", 0, 0, 0).await;
        let over_score = profile.engine.record_quiz_attempt("q", 6, 5, 0).await;

        assert!(matches!(no_questions, Err(AppError::Validation(_))));
        assert!(matches!(over_score, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_bookmark_toggle_round_trip() {
        let profile = empty_profile().await;

        assert!(profile.engine.add_bookmark("css-grid").await);
        assert!(!profile.engine.add_bookmark("css-grid").await);
        assert!(profile.engine.add_bookmark("js-closures").await);
        assert!(profile.engine.is_bookmarked("css-grid").await);

        assert!(profile.engine.remove_bookmark("css-grid").await);
        assert!(!profile.engine.remove_bookmark("css-grid").await);

        assert!(!profile.engine.is_bookmarked("css-grid").await);
        assert_eq!(profile.engine.bookmarks().await, vec!["js-closures".to_string()]);
    }

    #[tokio::test]
    async fn test_saved_code_round_trip() {
        let profile = empty_profile().await;

        assert_eq!(profile.engine.saved_code().await, "");
        assert_eq!(profile.engine.sandbox_document().await, SandboxDocument::default());

        profile.engine.save_code("let x = 1;").await;
        assert_eq!(profile.engine.saved_code().await, "let x = 1;");
        assert_eq!(profile.engine.sandbox_document().await.js, "let x = 1;");

        let document = SandboxDocument {
            html: "<h1>Hi</h1>".to_string(),
            css: "h1 { color: red; }".to_string(),
            js: String::new(),
        };
        profile.engine.save_sandbox_document(&document).await;
        assert_eq!(profile.engine.sandbox_document().await, document);
    }

    #[tokio::test]
    async fn test_notes_newest_first_with_unique_ids() {
        let profile = empty_profile().await;

        let first = profile.engine.add_note("Selectors", "a > b").await;
        let second = profile.engine.add_note("Specificity", "ids win").await;
        profile.clock.advance_millis(5);
        let third = profile.engine.add_note("Box model", "margin collapse").await;

        assert_ne!(first.id, second.id);
        assert_eq!(second.id, first.id + 1);
        assert_eq!(third.id, first.id + 5);
        assert_eq!(first.timestamp, "2024-03-10T12:00:00.000Z");

        let titles: Vec<String> = profile
            .engine
            .notes()
            .await
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["Box model", "Specificity", "Selectors"]);

        assert!(profile.engine.delete_note(second.id).await);
        assert!(!profile.engine.delete_note(second.id).await);
        assert_eq!(profile.engine.notes().await.len(), 2);
    }

    #[tokio::test]
    async fn test_skill_radar_covers_fixed_axes() {
        let profile = empty_profile().await;

        profile.engine.add_skill_points("frontend", 10).await;
        assert_eq!(profile.engine.add_skill_points("frontend", 5).await, 15);
        profile.engine.add_skill_points("rust", 40).await;

        let radar = profile.engine.skill_radar().await;

        assert_eq!(radar.len(), RADAR_SKILLS.len());
        assert_eq!(radar[0].label, "Frontend");
        assert_eq!(radar[0].value, 15);
        assert!(radar[1..].iter().all(|s| s.value == 0));
        assert_eq!(profile.engine.skill_points().await.get("rust"), Some(&40));
    }

    #[tokio::test]
    async fn test_learning_path_progress_never_regresses() {
        let profile = empty_profile().await;

        assert_eq!(profile.engine.record_learning_path_step("web", 3).await, 3);
        assert_eq!(profile.engine.record_learning_path_step("web", 1).await, 3);
        assert_eq!(profile.engine.record_learning_path_step("web", 4).await, 4);
        assert_eq!(profile.engine.record_learning_path_step("python", 0).await, 0);

        let progress = profile.engine.learning_path_progress().await;
        assert_eq!(progress.get("web"), Some(&4));
        assert_eq!(progress.get("python"), Some(&0));
    }

    #[tokio::test]
    async fn test_activity_counts_per_day() {
        let profile = empty_profile().await;

        assert_eq!(profile.engine.log_activity().await, 1);
        assert_eq!(profile.engine.log_activity().await, 2);
        profile.clock.advance_days(1);
        assert_eq!(profile.engine.log_activity().await, 1);

        let log = profile.engine.activity_log().await;
        assert_eq!(log.get("2024-03-10"), Some(&2));
        assert_eq!(log.get("2024-03-11"), Some(&1));
    }

    #[tokio::test]
    async fn test_heatmap_window() {
        let profile = TestProfileBuilder::new()
            .activity("2024-03-10", 7)
            .activity("2024-03-08", 3)
            .activity("2023-11-01", 50)
            .build()
            .await
            .unwrap();

        let window = profile.engine.activity_window(DEFAULT_HEATMAP_WEEKS).await;

        assert_eq!(window.len(), 84);
        assert_eq!(window[0].date, "2023-12-18");
        let last = window.last().unwrap();
        assert_eq!(last.date, "2024-03-10");
        assert_eq!(last.level, 3);
        assert_eq!(window[81].count, 3);
        assert_eq!(window[81].level, 2);
        assert_eq!(window.iter().map(|d| d.count).sum::<u64>(), 10);
    }

    #[test]
    fn test_intensity_buckets() {
        assert_eq!(intensity(0), 0);
        assert_eq!(intensity(1), 1);
        assert_eq!(intensity(2), 1);
        assert_eq!(intensity(3), 2);
        assert_eq!(intensity(5), 2);
        assert_eq!(intensity(6), 3);
        assert_eq!(intensity(10), 3);
        assert_eq!(intensity(11), 4);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let profile = TestProfileBuilder::new()
            .xp(700)
            .streak(9, 0)
            .lessons(4)
            .bookmark("css-grid")
            .achievement("xp_500")
            .raw(StorageKey::SavedCode, "<p>hi</p>")
            .build()
            .await
            .unwrap();

        profile.engine.reset_progress().await;

        let stats = profile.engine.user_stats().await;
        assert_eq!(stats.xp, 0);
        assert_eq!(stats.streak, 0);
        assert_eq!(stats.completed_lessons, 0);
        assert_eq!(stats.bookmarks, 0);
        assert!(stats.achievements.is_empty());
        assert_eq!(profile.engine.saved_code().await, "");
        assert_eq!(profile.engine.streak_state().await.last_active, None);
    }
}
