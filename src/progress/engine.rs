use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::SecondsFormat;
use tracing::{debug, info, instrument};

use super::{
    ACHIEVEMENTS, Achievement, AchievementStatus, ActivityDay, Clock, LevelSummary,
    ProgressExport, ProgressImport, StreakState, StreakUpdate, activity_key, activity_window,
    advance_streak, calculate_level, find_achievement, format_visit_date, newly_satisfied,
    parse_visit_date,
};
use crate::error::AppError;
use crate::models::{
    CompletionCategory, CompletionOutcome, Note, QuizOutcome, SandboxDocument, SkillScore,
    UserStats,
};
use crate::store::{StorageKey, Store};

/// Skill categories shown on the profile radar, with their display labels.
pub const RADAR_SKILLS: [(&str, &str); 6] = [
    ("frontend", "Frontend"),
    ("backend", "Backend"),
    ("debugging", "Debugging"),
    ("logic", "Logic"),
    ("database", "Database"),
    ("tools", "Tools"),
];

/// All progress operations the page layer may call.
pub struct ProgressEngine {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl ProgressEngine {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // XP and levels

    pub async fn xp(&self) -> u64 {
        self.store.get_counter(StorageKey::Xp).await
    }

    /// Adds XP and returns the new total. Zero is rejected.
    #[instrument(skip(self))]
    pub async fn add_xp(&self, amount: u64) -> Result<u64, AppError> {
        if amount == 0 {
            return Err(AppError::Validation(
                "XP amount must be a positive integer".to_string(),
            ));
        }

        Ok(self.credit_xp(amount).await)
    }

    async fn credit_xp(&self, amount: u64) -> u64 {
        let total = self.xp().await.saturating_add(amount);
        self.store.set_counter(StorageKey::Xp, total).await;
        info!(amount, total, "Awarded XP");
        total
    }

    pub async fn level_summary(&self) -> LevelSummary {
        LevelSummary::for_xp(self.xp().await)
    }

    // Streaks

    pub async fn streak_state(&self) -> StreakState {
        let count = self.store.get_counter(StorageKey::Streak).await;
        let last_active = self
            .store
            .get_raw(StorageKey::LastVisit)
            .await
            .and_then(|raw| parse_visit_date(&raw));

        StreakState { count, last_active }
    }

    /// Records today's visit. Only the first call of a calendar day changes
    /// anything; milestone bonuses are credited on that call.
    #[instrument(skip(self))]
    pub async fn update_streak(&self) -> StreakUpdate {
        let today = self.clock.today();
        let transition = advance_streak(self.streak_state().await, today);

        if transition.is_new_day {
            self.store
                .set_counter(StorageKey::Streak, transition.state.count)
                .await;
            self.store
                .set_raw(StorageKey::LastVisit, &format_visit_date(today))
                .await;
            info!(streak = transition.state.count, "Streak advanced");
        }

        if transition.bonus_xp > 0 {
            self.credit_xp(transition.bonus_xp).await;
        }

        StreakUpdate::from(transition)
    }

    // Completed items

    pub async fn completed(&self, category: CompletionCategory) -> Vec<String> {
        self.store.get_json(category.storage_key()).await
    }

    pub async fn is_completed(&self, category: CompletionCategory, id: &str) -> bool {
        self.completed(category).await.iter().any(|c| c == id)
    }

    /// Marks an item complete, returning `true` if it was not already.
    #[instrument(skip(self))]
    pub async fn complete(&self, category: CompletionCategory, id: &str) -> bool {
        let mut completed = self.completed(category).await;
        if completed.iter().any(|c| c == id) {
            debug!("Item already completed");
            return false;
        }

        completed.push(id.to_string());
        self.store.set_json(category.storage_key(), &completed).await;
        true
    }

    /// Completes an item and pays its XP once. Repeat completions are
    /// reported but award nothing.
    #[instrument(skip(self))]
    pub async fn complete_with_reward(
        &self,
        category: CompletionCategory,
        id: &str,
        xp: u64,
    ) -> CompletionOutcome {
        let before = self.xp().await;

        if !self.complete(category, id).await {
            return CompletionOutcome {
                category,
                id: id.to_string(),
                newly_completed: false,
                xp_awarded: 0,
                total_xp: before,
                level_up: None,
                achievements: Vec::new(),
            };
        }

        let total_xp = if xp > 0 {
            self.credit_xp(xp).await
        } else {
            before
        };

        let new_level = calculate_level(total_xp);
        let level_up = (new_level > calculate_level(before)).then_some(new_level);

        CompletionOutcome {
            category,
            id: id.to_string(),
            newly_completed: true,
            xp_awarded: xp,
            total_xp,
            level_up,
            achievements: self.check_and_unlock_achievements().await,
        }
    }

    /// Scores a quiz attempt. At least half the questions, rounded up, must
    /// be correct for the quiz to count as completed.
    #[instrument(skip(self))]
    pub async fn record_quiz_attempt(
        &self,
        quiz_id: &str,
        score: u32,
        question_count: u32,
        xp: u64,
    ) -> Result<QuizOutcome, AppError> {
        if question_count == 0 {
            return Err(AppError::Validation(
                "A quiz needs at least one question".to_string(),
            ));
        }
        if score > question_count {
            return Err(AppError::Validation(format!(
                "Score {} exceeds question count {}",
                score, question_count
            )));
        }

        let passing_score = question_count.div_ceil(2);
        let passed = score >= passing_score;

        let reward = if passed {
            Some(
                self.complete_with_reward(CompletionCategory::Quiz, quiz_id, xp)
                    .await,
            )
        } else {
            None
        };

        Ok(QuizOutcome {
            quiz_id: quiz_id.to_string(),
            score,
            question_count,
            passing_score,
            passed,
            reward,
        })
    }

    // Bookmarks

    pub async fn bookmarks(&self) -> Vec<String> {
        self.store.get_json(StorageKey::Bookmarks).await
    }

    pub async fn is_bookmarked(&self, id: &str) -> bool {
        self.bookmarks().await.iter().any(|b| b == id)
    }

    pub async fn add_bookmark(&self, id: &str) -> bool {
        let mut bookmarks = self.bookmarks().await;
        if bookmarks.iter().any(|b| b == id) {
            return false;
        }

        bookmarks.push(id.to_string());
        self.store.set_json(StorageKey::Bookmarks, &bookmarks).await;
        true
    }

    pub async fn remove_bookmark(&self, id: &str) -> bool {
        let mut bookmarks = self.bookmarks().await;
        let before = bookmarks.len();
        bookmarks.retain(|b| b != id);

        if bookmarks.len() == before {
            return false;
        }

        self.store.set_json(StorageKey::Bookmarks, &bookmarks).await;
        true
    }

    // Sandbox code

    pub async fn saved_code(&self) -> String {
        self.store.get_text(StorageKey::SavedCode).await
    }

    pub async fn save_code(&self, code: &str) {
        self.store.set_raw(StorageKey::SavedCode, code).await;
    }

    /// The saved code as an html/css/js document. A plain blob saved by the
    /// single-editor sandbox is returned as the `js` part.
    pub async fn sandbox_document(&self) -> SandboxDocument {
        let blob = self.saved_code().await;
        if blob.is_empty() {
            return SandboxDocument::default();
        }

        serde_json::from_str(&blob).unwrap_or(SandboxDocument {
            js: blob,
            ..SandboxDocument::default()
        })
    }

    pub async fn save_sandbox_document(&self, document: &SandboxDocument) {
        self.store.set_json(StorageKey::SavedCode, document).await;
    }

    // Achievements

    pub async fn achievements(&self) -> Vec<String> {
        self.store.get_json(StorageKey::Achievements).await
    }

    #[instrument(skip(self))]
    pub async fn unlock_achievement(&self, id: &str) -> Result<bool, AppError> {
        if find_achievement(id).is_none() {
            return Err(AppError::NotFound(format!("Achievement '{}'", id)));
        }

        let mut unlocked = self.achievements().await;
        if unlocked.iter().any(|a| a == id) {
            return Ok(false);
        }

        unlocked.push(id.to_string());
        self.store.set_json(StorageKey::Achievements, &unlocked).await;
        info!(achievement = %id, "Achievement unlocked");
        Ok(true)
    }

    /// Unlocks everything the current stats satisfy and returns only the
    /// achievements unlocked by this call.
    #[instrument(skip(self))]
    pub async fn check_and_unlock_achievements(&self) -> Vec<&'static Achievement> {
        let stats = self.user_stats().await;
        let fresh = newly_satisfied(&stats);

        if !fresh.is_empty() {
            let mut unlocked = stats.achievements;
            unlocked.extend(fresh.iter().map(|a| a.id.to_string()));
            self.store.set_json(StorageKey::Achievements, &unlocked).await;
            info!(count = fresh.len(), "Unlocked achievements");
        }

        fresh
    }

    pub async fn achievement_board(&self) -> Vec<AchievementStatus> {
        let unlocked = self.achievements().await;
        ACHIEVEMENTS
            .iter()
            .map(|achievement| AchievementStatus {
                achievement,
                unlocked: unlocked.iter().any(|id| id == achievement.id),
            })
            .collect()
    }

    pub async fn user_stats(&self) -> UserStats {
        let xp = self.xp().await;
        UserStats {
            xp,
            level: calculate_level(xp),
            streak: self.store.get_counter(StorageKey::Streak).await,
            completed_lessons: self.completed(CompletionCategory::Lesson).await.len(),
            completed_quizzes: self.completed(CompletionCategory::Quiz).await.len(),
            completed_projects: self.completed(CompletionCategory::Project).await.len(),
            completed_bugs: self.completed(CompletionCategory::Bug).await.len(),
            bookmarks: self.bookmarks().await.len(),
            achievements: self.achievements().await,
        }
    }

    // Activity log

    pub async fn activity_log(&self) -> BTreeMap<String, u64> {
        self.store.get_json(StorageKey::ActivityLog).await
    }

    /// Counts one activity for today and returns today's total.
    #[instrument(skip(self))]
    pub async fn log_activity(&self) -> u64 {
        let mut log = self.activity_log().await;
        let count = log.entry(activity_key(self.clock.today())).or_insert(0);
        *count = count.saturating_add(1);
        let today_count = *count;

        self.store.set_json(StorageKey::ActivityLog, &log).await;
        today_count
    }

    pub async fn activity_window(&self, weeks: u32) -> Vec<ActivityDay> {
        activity_window(&self.activity_log().await, self.clock.today(), weeks)
    }

    // Skills

    pub async fn skill_points(&self) -> BTreeMap<String, u64> {
        self.store.get_json(StorageKey::SkillPoints).await
    }

    pub async fn add_skill_points(&self, skill: &str, points: u64) -> u64 {
        let mut skills = self.skill_points().await;
        let score = skills.entry(skill.to_string()).or_insert(0);
        *score = score.saturating_add(points);
        let total = *score;

        self.store.set_json(StorageKey::SkillPoints, &skills).await;
        total
    }

    pub async fn skill_radar(&self) -> Vec<SkillScore> {
        let skills = self.skill_points().await;
        RADAR_SKILLS
            .iter()
            .map(|(skill, label)| SkillScore {
                skill: skill.to_string(),
                label: label.to_string(),
                value: skills.get(*skill).copied().unwrap_or(0),
            })
            .collect()
    }

    // Notes

    pub async fn notes(&self) -> Vec<Note> {
        self.store.get_json(StorageKey::UserNotes).await
    }

    #[instrument(skip(self, content))]
    pub async fn add_note(&self, title: &str, content: &str) -> Note {
        let mut notes = self.notes().await;
        let now = self.clock.now();

        let mut id = now.timestamp_millis();
        while notes.iter().any(|n| n.id == id) {
            id += 1;
        }

        let note = Note {
            id,
            title: title.to_string(),
            content: content.to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        notes.insert(0, note.clone());
        self.store.set_json(StorageKey::UserNotes, &notes).await;
        note
    }

    pub async fn delete_note(&self, id: i64) -> bool {
        let mut notes = self.notes().await;
        let before = notes.len();
        notes.retain(|n| n.id != id);

        if notes.len() == before {
            return false;
        }

        self.store.set_json(StorageKey::UserNotes, &notes).await;
        true
    }

    // Learning paths

    pub async fn learning_path_progress(&self) -> BTreeMap<String, u64> {
        self.store.get_json(StorageKey::LearningPathProgress).await
    }

    /// Records a finished step. Progress never moves backwards.
    pub async fn record_learning_path_step(&self, path_id: &str, step: u64) -> u64 {
        let mut progress = self.learning_path_progress().await;
        match progress.get(path_id).copied() {
            Some(current) if current >= step => current,
            _ => {
                progress.insert(path_id.to_string(), step);
                self.store
                    .set_json(StorageKey::LearningPathProgress, &progress)
                    .await;
                step
            }
        }
    }

    // Export, import and reset

    #[instrument(skip(self))]
    pub async fn export_progress(&self) -> Result<String, AppError> {
        let state = self.streak_state().await;

        let document = ProgressExport {
            xp: Some(self.xp().await),
            streak: Some(state.count),
            last_visit: state.last_active.map(format_visit_date),
            completed_lessons: Some(self.completed(CompletionCategory::Lesson).await),
            completed_quizzes: Some(self.completed(CompletionCategory::Quiz).await),
            bookmarks: Some(self.bookmarks().await),
            saved_code: Some(self.saved_code().await),
            achievements: Some(self.achievements().await),
            export_date: Some(self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            completed_projects: Some(self.completed(CompletionCategory::Project).await),
            completed_bugs: Some(self.completed(CompletionCategory::Bug).await),
            activity_log: Some(self.activity_log().await),
            skill_points: Some(self.skill_points().await),
            user_notes: Some(self.notes().await),
            learning_path_progress: Some(self.learning_path_progress().await),
        };

        info!("Exporting progress");
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Replaces the profile with a backup. The whole document is validated
    /// before the first write.
    #[instrument(skip(self, text))]
    pub async fn import_progress(&self, text: &str) -> Result<(), AppError> {
        let import = ProgressImport::from_json(text)?;

        self.store.set_counter(StorageKey::Xp, import.xp).await;
        self.store.set_counter(StorageKey::Streak, import.streak).await;
        match import.last_visit {
            Some(date) => {
                self.store
                    .set_raw(StorageKey::LastVisit, &format_visit_date(date))
                    .await
            }
            None => self.store.remove(StorageKey::LastVisit).await,
        }
        self.store
            .set_json(StorageKey::CompletedLessons, &import.completed_lessons)
            .await;
        self.store
            .set_json(StorageKey::CompletedQuizzes, &import.completed_quizzes)
            .await;
        self.store
            .set_json(StorageKey::Bookmarks, &import.bookmarks)
            .await;
        self.store
            .set_raw(StorageKey::SavedCode, &import.saved_code)
            .await;
        self.store
            .set_json(StorageKey::Achievements, &import.achievements)
            .await;

        if let Some(projects) = &import.completed_projects {
            self.store
                .set_json(StorageKey::CompletedProjects, projects)
                .await;
        }
        if let Some(bugs) = &import.completed_bugs {
            self.store.set_json(StorageKey::CompletedBugs, bugs).await;
        }
        if let Some(log) = &import.activity_log {
            self.store.set_json(StorageKey::ActivityLog, log).await;
        }
        if let Some(skills) = &import.skill_points {
            self.store.set_json(StorageKey::SkillPoints, skills).await;
        }
        if let Some(notes) = &import.user_notes {
            self.store.set_json(StorageKey::UserNotes, notes).await;
        }
        if let Some(paths) = &import.learning_path_progress {
            self.store
                .set_json(StorageKey::LearningPathProgress, paths)
                .await;
        }

        info!(xp = import.xp, streak = import.streak, "Imported progress");
        Ok(())
    }

    pub async fn reset_progress(&self) {
        self.store.clear_all().await;
    }
}
