use std::fmt;

/// Every value the progress profile keeps, by its un-namespaced key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Xp,
    Streak,
    LastVisit,
    CompletedLessons,
    CompletedQuizzes,
    CompletedProjects,
    CompletedBugs,
    Bookmarks,
    SavedCode,
    Achievements,
    ActivityLog,
    SkillPoints,
    UserNotes,
    LearningPathProgress,
}

impl StorageKey {
    pub const ALL: [StorageKey; 14] = [
        StorageKey::Xp,
        StorageKey::Streak,
        StorageKey::LastVisit,
        StorageKey::CompletedLessons,
        StorageKey::CompletedQuizzes,
        StorageKey::CompletedProjects,
        StorageKey::CompletedBugs,
        StorageKey::Bookmarks,
        StorageKey::SavedCode,
        StorageKey::Achievements,
        StorageKey::ActivityLog,
        StorageKey::SkillPoints,
        StorageKey::UserNotes,
        StorageKey::LearningPathProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Xp => "xp",
            StorageKey::Streak => "streak",
            StorageKey::LastVisit => "lastVisit",
            StorageKey::CompletedLessons => "completedLessons",
            StorageKey::CompletedQuizzes => "completedQuizzes",
            StorageKey::CompletedProjects => "completedProjects",
            StorageKey::CompletedBugs => "completedBugs",
            StorageKey::Bookmarks => "bookmarks",
            StorageKey::SavedCode => "savedCode",
            StorageKey::Achievements => "achievements",
            StorageKey::ActivityLog => "activityLog",
            StorageKey::SkillPoints => "skillPoints",
            StorageKey::UserNotes => "userNotes",
            StorageKey::LearningPathProgress => "learningPathProgress",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
