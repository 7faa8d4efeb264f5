//! Achievement definitions and the unlock sweep.
//!
//! Conditions are plain data (`kind`-tagged) so books can be loaded from TOML
//! and evaluated without running user code.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::character::Character;
use crate::quest::definition::{completed_count, Quest, QuestTag};

/// Unlock condition evaluated against a character and all quests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Condition {
    LevelAtLeast { value: i32 },
    AffinityLevelAtLeast { value: i32 },
    CompletedQuestsAtLeast { count: usize },
    CompletedQuestsWithTag { tag: QuestTag, count: usize },
}

impl Condition {
    pub fn is_met(&self, character: &Character, quests: &[Quest]) -> bool {
        match self {
            Condition::LevelAtLeast { value } => character.level >= *value,
            Condition::AffinityLevelAtLeast { value } => character.affinity_level >= *value,
            Condition::CompletedQuestsAtLeast { count } => completed_count(quests, None) >= *count,
            Condition::CompletedQuestsWithTag { tag, count } => {
                completed_count(quests, Some(*tag)) >= *count
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    #[serde(default)]
    pub category_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementCategory {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
}

impl AchievementCategory {
    /// (unlocked, total) for the progress bar
    pub fn progress(&self, character: &Character) -> (usize, usize) {
        let unlocked = self
            .achievements
            .iter()
            .filter(|a| character.has_unlocked(&a.id))
            .count();
        (unlocked, self.achievements.len())
    }
}

#[derive(Debug, Deserialize)]
struct RawAchievementBook {
    #[serde(default)]
    category: Vec<AchievementCategory>,
}

/// Ordered set of achievement categories
#[derive(Debug, Clone, Default)]
pub struct AchievementBook {
    categories: Vec<AchievementCategory>,
}

impl AchievementBook {
    pub fn new(categories: Vec<AchievementCategory>) -> Result<Self, String> {
        let mut seen = HashSet::new();
        let mut categories = categories;
        for category in &mut categories {
            for achievement in &mut category.achievements {
                if !seen.insert(achievement.id.clone()) {
                    return Err(format!("Duplicate achievement id '{}'", achievement.id));
                }
                if achievement.category_id.is_empty() {
                    achievement.category_id = category.id.clone();
                }
            }
        }
        Ok(Self { categories })
    }

    /// Load a book from a TOML file of `[[category]]` tables
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
        Self::from_toml(&content).map_err(|e| format!("Failed to parse {:?}: {}", path, e))
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        let raw: RawAchievementBook = toml::from_str(content).map_err(|e| e.to_string())?;
        let book = Self::new(raw.category)?;
        info!("Loaded {} achievements", book.len());
        Ok(book)
    }

    /// The default growth / affinity / quest / versatility set
    pub fn builtin() -> Self {
        let levels = [
            (10, "First Steps"),
            (30, "Seasoned Adventurer"),
            (50, "Foot of the Summit"),
            (100, "Birth of a Legend"),
        ];
        let affinity = [
            (3, "Getting Closer"),
            (7, "Good Friends"),
            (20, "Inseparable"),
            (50, "Soul Partners"),
        ];
        let completed = [
            (1, "A Journey of a Thousand Miles"),
            (5, "Beyond Three Days"),
            (10, "Habit Formed"),
            (30, "Proof of Grit"),
        ];
        let tagged = [
            ("tag_work_5", QuestTag::Work, "Workhorse"),
            ("tag_hobby_5", QuestTag::Hobby, "Hobby Collector"),
            ("tag_self_5", QuestTag::SelfDev, "Living Your Best Life"),
            ("tag_health_5", QuestTag::Health, "Health First"),
        ];

        let categories = vec![
            AchievementCategory {
                id: "growth".into(),
                title: "Slow and Steady (Growth)".into(),
                achievements: levels
                    .iter()
                    .map(|(value, title)| Achievement {
                        id: format!("growth_{}", value),
                        category_id: "growth".into(),
                        title: (*title).into(),
                        description: format!("Reach level {}", value),
                        condition: Condition::LevelAtLeast { value: *value },
                    })
                    .collect(),
            },
            AchievementCategory {
                id: "affinity".into(),
                title: "Kindred Spirits (Bond)".into(),
                achievements: affinity
                    .iter()
                    .map(|(value, title)| Achievement {
                        id: format!("aff_{}", value),
                        category_id: "affinity".into(),
                        title: (*title).into(),
                        description: format!("Reach affinity Lv.{}", value),
                        condition: Condition::AffinityLevelAtLeast { value: *value },
                    })
                    .collect(),
            },
            AchievementCategory {
                id: "quest".into(),
                title: "Moving Mountains (Diligence)".into(),
                achievements: completed
                    .iter()
                    .map(|(count, title)| Achievement {
                        id: format!("qst_{}", count),
                        category_id: "quest".into(),
                        title: (*title).into(),
                        description: format!("Complete {} quest(s)", count),
                        condition: Condition::CompletedQuestsAtLeast { count: *count },
                    })
                    .collect(),
            },
            AchievementCategory {
                id: "tag".into(),
                title: "Jack of All Trades (Versatility)".into(),
                achievements: tagged
                    .iter()
                    .map(|(id, tag, title)| Achievement {
                        id: (*id).into(),
                        category_id: "tag".into(),
                        title: (*title).into(),
                        description: format!("Complete 5 {} quests", tag.label()),
                        condition: Condition::CompletedQuestsWithTag { tag: *tag, count: 5 },
                    })
                    .collect(),
            },
        ];

        Self { categories }
    }

    pub fn categories(&self) -> &[AchievementCategory] {
        &self.categories
    }

    /// All achievements in definition order
    pub fn iter(&self) -> impl Iterator<Item = &Achievement> {
        self.categories.iter().flat_map(|c| c.achievements.iter())
    }

    pub fn get(&self, id: &str) -> Option<&Achievement> {
        self.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unlock every achievement whose condition now holds.
    ///
    /// Returns the titles of newly unlocked achievements in definition order.
    /// Already-unlocked ids are never evaluated or added again.
    pub fn sweep(&self, character: &mut Character, quests: &[Quest]) -> Vec<String> {
        let mut unlocked = Vec::new();
        for achievement in self.iter() {
            if character.has_unlocked(&achievement.id) {
                continue;
            }
            if achievement.condition.is_met(character, quests) {
                info!("Achievement unlocked for {}: {}", character.id, achievement.id);
                character.unlocked_achievements.push(achievement.id.clone());
                unlocked.push(achievement.title.clone());
            }
        }
        unlocked
    }

    /// Ids in the unlocked set that this book does not define
    pub fn unknown_unlocks<'a>(&self, character: &'a Character) -> Vec<&'a str> {
        let unknown: Vec<&str> = character
            .unlocked_achievements
            .iter()
            .filter(|id| self.get(id).is_none())
            .map(|id| id.as_str())
            .collect();
        if !unknown.is_empty() {
            warn!("Character {} has {} unknown achievement ids", character.id, unknown.len());
        }
        unknown
    }
}
