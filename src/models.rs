use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::progress::Achievement;
use crate::store::StorageKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionCategory {
    Lesson,
    Quiz,
    Project,
    Bug,
}

impl CompletionCategory {
    pub const ALL: [CompletionCategory; 4] = [
        CompletionCategory::Lesson,
        CompletionCategory::Quiz,
        CompletionCategory::Project,
        CompletionCategory::Bug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionCategory::Lesson => "lesson",
            CompletionCategory::Quiz => "quiz",
            CompletionCategory::Project => "project",
            CompletionCategory::Bug => "bug",
        }
    }

    pub fn storage_key(&self) -> StorageKey {
        match self {
            CompletionCategory::Lesson => StorageKey::CompletedLessons,
            CompletionCategory::Quiz => StorageKey::CompletedQuizzes,
            CompletionCategory::Project => StorageKey::CompletedProjects,
            CompletionCategory::Bug => StorageKey::CompletedBugs,
        }
    }
}

impl fmt::Display for CompletionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompletionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lesson" | "lessons" => Ok(CompletionCategory::Lesson),
            "quiz" | "quizzes" => Ok(CompletionCategory::Quiz),
            "project" | "projects" => Ok(CompletionCategory::Project),
            "bug" | "bugs" => Ok(CompletionCategory::Bug),
            _ => Err(format!("Unknown completion category: {}", s)),
        }
    }
}

/// Snapshot the achievement conditions are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub xp: u64,
    pub level: u64,
    pub streak: u64,
    pub completed_lessons: usize,
    pub completed_quizzes: usize,
    pub completed_projects: usize,
    pub completed_bugs: usize,
    pub bookmarks: usize,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxDocument {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub js: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillScore {
    pub skill: String,
    pub label: String,
    pub value: u64,
}

#[derive(Debug, Serialize)]
pub struct CompletionOutcome {
    pub category: CompletionCategory,
    pub id: String,
    pub newly_completed: bool,
    pub xp_awarded: u64,
    pub total_xp: u64,
    pub level_up: Option<u64>,
    pub achievements: Vec<&'static Achievement>,
}

#[derive(Debug, Serialize)]
pub struct QuizOutcome {
    pub quiz_id: String,
    pub score: u32,
    pub question_count: u32,
    pub passing_score: u32,
    pub passed: bool,
    pub reward: Option<CompletionOutcome>,
}
