use std::fmt;

use serde::Serialize;

use crate::models::UserStats;

/// A permanently unlockable milestone.
///
/// Conditions only ever read counters that grow, so once a condition holds
/// it keeps holding and the order of evaluation does not matter.
#[derive(Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    #[serde(skip)]
    pub condition: fn(&UserStats) -> bool,
}

impl fmt::Debug for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Achievement")
            .field("id", &self.id)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

pub static ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first_lesson",
        title: "First Steps",
        description: "Complete your first lesson",
        icon: "🎯",
        condition: |stats| stats.completed_lessons >= 1,
    },
    Achievement {
        id: "lesson_master_5",
        title: "Getting Started",
        description: "Complete 5 lessons",
        icon: "📚",
        condition: |stats| stats.completed_lessons >= 5,
    },
    Achievement {
        id: "lesson_master_10",
        title: "Dedicated Learner",
        description: "Complete 10 lessons",
        icon: "🏆",
        condition: |stats| stats.completed_lessons >= 10,
    },
    Achievement {
        id: "xp_100",
        title: "Century Club",
        description: "Earn 100 XP",
        icon: "💯",
        condition: |stats| stats.xp >= 100,
    },
    Achievement {
        id: "xp_500",
        title: "XP Champion",
        description: "Earn 500 XP",
        icon: "⭐",
        condition: |stats| stats.xp >= 500,
    },
    Achievement {
        id: "xp_1000",
        title: "XP Legend",
        description: "Earn 1000 XP",
        icon: "🌟",
        condition: |stats| stats.xp >= 1000,
    },
    Achievement {
        id: "streak_3",
        title: "Consistent",
        description: "Maintain a 3-day streak",
        icon: "🔥",
        condition: |stats| stats.streak >= 3,
    },
    Achievement {
        id: "streak_7",
        title: "Week Warrior",
        description: "Maintain a 7-day streak",
        icon: "🔥🔥",
        condition: |stats| stats.streak >= 7,
    },
    Achievement {
        id: "streak_30",
        title: "Unstoppable",
        description: "Maintain a 30-day streak",
        icon: "🔥🔥🔥",
        condition: |stats| stats.streak >= 30,
    },
    Achievement {
        id: "quiz_master",
        title: "Quiz Master",
        description: "Complete 5 quizzes",
        icon: "🎓",
        condition: |stats| stats.completed_quizzes >= 5,
    },
    Achievement {
        id: "level_5",
        title: "Level 5",
        description: "Reach level 5",
        icon: "⬆️",
        condition: |stats| stats.level >= 5,
    },
    Achievement {
        id: "level_10",
        title: "Level 10",
        description: "Reach level 10",
        icon: "🚀",
        condition: |stats| stats.level >= 10,
    },
    Achievement {
        id: "first_project",
        title: "Builder",
        description: "Finish your first project",
        icon: "🛠️",
        condition: |stats| stats.completed_projects >= 1,
    },
    Achievement {
        id: "bug_hunter",
        title: "Bug Hunter",
        description: "Squash 5 bugs",
        icon: "🐛",
        condition: |stats| stats.completed_bugs >= 5,
    },
];

pub fn find_achievement(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

/// Catalog entries whose condition holds but which are not unlocked yet.
pub fn newly_satisfied(stats: &UserStats) -> Vec<&'static Achievement> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| !stats.achievements.iter().any(|id| id == a.id))
        .filter(|a| (a.condition)(stats))
        .collect()
}

#[derive(Debug, Serialize)]
pub struct AchievementStatus {
    #[serde(flatten)]
    pub achievement: &'static Achievement,
    pub unlocked: bool,
}
