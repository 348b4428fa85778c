use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::parse_visit_date;
use crate::error::AppError;
use crate::models::Note;

const INVALID_PROGRESS_DATA: &str = "Invalid progress data";

/// The backup file format.
///
/// `xp` through `exportDate` are the long-standing contract fields. The
/// remaining ones were added later; on import they are optional so that
/// older backups keep loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressExport {
    #[serde(default)]
    pub xp: Option<u64>,
    #[serde(default)]
    pub streak: Option<u64>,
    #[serde(default)]
    pub last_visit: Option<String>,
    #[serde(default)]
    pub completed_lessons: Option<Vec<String>>,
    #[serde(default)]
    pub completed_quizzes: Option<Vec<String>>,
    #[serde(default)]
    pub bookmarks: Option<Vec<String>>,
    #[serde(default)]
    pub saved_code: Option<String>,
    #[serde(default)]
    pub achievements: Option<Vec<String>>,
    #[serde(default)]
    pub export_date: Option<String>,

    #[serde(default)]
    pub completed_projects: Option<Vec<String>>,
    #[serde(default)]
    pub completed_bugs: Option<Vec<String>>,
    #[serde(default)]
    pub activity_log: Option<BTreeMap<String, u64>>,
    #[serde(default)]
    pub skill_points: Option<BTreeMap<String, u64>>,
    #[serde(default)]
    pub user_notes: Option<Vec<Note>>,
    #[serde(default)]
    pub learning_path_progress: Option<BTreeMap<String, u64>>,
}

/// A backup that has been fully parsed and checked, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressImport {
    pub xp: u64,
    pub streak: u64,
    pub last_visit: Option<NaiveDate>,
    pub completed_lessons: Vec<String>,
    pub completed_quizzes: Vec<String>,
    pub bookmarks: Vec<String>,
    pub saved_code: String,
    pub achievements: Vec<String>,

    pub completed_projects: Option<Vec<String>>,
    pub completed_bugs: Option<Vec<String>>,
    pub activity_log: Option<BTreeMap<String, u64>>,
    pub skill_points: Option<BTreeMap<String, u64>>,
    pub user_notes: Option<Vec<Note>>,
    pub learning_path_progress: Option<BTreeMap<String, u64>>,
}

impl ProgressImport {
    /// Parses a backup. Nothing is written here, so a rejected document
    /// leaves the profile untouched.
    pub fn from_json(text: &str) -> Result<Self, AppError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| AppError::InvalidImport(format!("{}: {}", INVALID_PROGRESS_DATA, e)))?;

        // Derived structs also accept JSON arrays positionally.
        if !value.is_object() {
            return Err(AppError::InvalidImport(format!(
                "{}: expected a JSON object",
                INVALID_PROGRESS_DATA
            )));
        }

        let document: ProgressExport = serde_json::from_value(value)
            .map_err(|e| AppError::InvalidImport(format!("{}: {}", INVALID_PROGRESS_DATA, e)))?;

        let last_visit = match document.last_visit.as_deref() {
            Some(raw) => Some(parse_visit_date(raw).ok_or_else(|| {
                AppError::InvalidImport(format!(
                    "{}: lastVisit '{}' is not a date",
                    INVALID_PROGRESS_DATA, raw
                ))
            })?),
            None => None,
        };

        Ok(Self {
            xp: document.xp.unwrap_or_default(),
            streak: document.streak.unwrap_or_default(),
            last_visit,
            completed_lessons: dedup_ids(document.completed_lessons.unwrap_or_default()),
            completed_quizzes: dedup_ids(document.completed_quizzes.unwrap_or_default()),
            bookmarks: dedup_ids(document.bookmarks.unwrap_or_default()),
            saved_code: document.saved_code.unwrap_or_default(),
            achievements: dedup_ids(document.achievements.unwrap_or_default()),
            completed_projects: document.completed_projects.map(dedup_ids),
            completed_bugs: document.completed_bugs.map(dedup_ids),
            activity_log: document.activity_log,
            skill_points: document.skill_points,
            user_notes: document.user_notes.map(renumber_notes),
            learning_path_progress: document.learning_path_progress,
        })
    }
}

/// Drops repeated ids, keeping the first occurrence.
pub fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

/// Gives every note a distinct id. A repeated id is bumped until it is free,
/// the same way a new note's id is chosen.
pub fn renumber_notes(notes: Vec<Note>) -> Vec<Note> {
    let mut taken: HashSet<i64> = HashSet::with_capacity(notes.len());
    notes
        .into_iter()
        .map(|mut note| {
            while !taken.insert(note.id) {
                note.id = note.id.wrapping_add(1);
            }
            note
        })
        .collect()
}
