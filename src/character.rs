//! Companion character state.
//!
//! Level/EXP/affinity bookkeeping lives here; the rules that mutate it are in
//! [`crate::progression`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// EXP needed to go from level 1 to level 2
pub const BASE_NEXT_LEVEL_EXP: i64 = 100;

/// Affinity points per affinity level
pub const AFFINITY_PER_LEVEL: i64 = 100;

/// Affinity level derived from raw affinity: `affinity / 100 + 1`
pub fn affinity_level_for(affinity: i64) -> i32 {
    (affinity.max(0) / AFFINITY_PER_LEVEL) as i32 + 1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default = "default_level")]
    pub level: i32,
    #[serde(default)]
    pub current_exp: i64,
    #[serde(default = "default_next_level_exp")]
    pub next_level_exp: i64,
    #[serde(default)]
    pub affinity: i64,
    #[serde(default = "default_level")]
    pub affinity_level: i32,
    /// Calendar day (`%Y-%m-%d`) of the last click-counter reset
    #[serde(default)]
    pub last_click_date: Option<String>,
    #[serde(default)]
    pub daily_click_count: u32,
    #[serde(default)]
    pub unlocked_achievements: Vec<String>,
}

fn default_level() -> i32 {
    1
}

fn default_next_level_exp() -> i64 {
    BASE_NEXT_LEVEL_EXP
}

impl Character {
    /// Create a fresh level 1 character with a random id
    pub fn new(name: &str) -> Self {
        Self::with_id(&Uuid::new_v4().to_string(), name)
    }

    pub fn with_id(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            image_path: None,
            level: 1,
            current_exp: 0,
            next_level_exp: BASE_NEXT_LEVEL_EXP,
            affinity: 0,
            affinity_level: 1,
            last_click_date: None,
            daily_click_count: 0,
            unlocked_achievements: Vec::new(),
        }
    }

    pub fn has_unlocked(&self, achievement_id: &str) -> bool {
        self.unlocked_achievements.iter().any(|id| id == achievement_id)
    }

    /// EXP progress within the current level (0.0 to 1.0)
    pub fn exp_progress(&self) -> f32 {
        if self.next_level_exp <= 0 {
            return 0.0;
        }
        (self.current_exp as f32 / self.next_level_exp as f32).clamp(0.0, 1.0)
    }

    /// Repair fields that a hand-edited or legacy record may carry out of range.
    pub fn normalize(&mut self) {
        self.level = self.level.max(1);
        if self.next_level_exp <= 0 {
            self.next_level_exp = BASE_NEXT_LEVEL_EXP;
        }
        self.current_exp = self.current_exp.max(0);
        while self.current_exp >= self.next_level_exp {
            self.current_exp -= self.next_level_exp;
            self.level += 1;
            self.next_level_exp = crate::progression::next_threshold(self.next_level_exp);
        }
        self.affinity = self.affinity.max(0);
        self.affinity_level = affinity_level_for(self.affinity);
        let mut seen = std::collections::HashSet::new();
        self.unlocked_achievements.retain(|id| seen.insert(id.clone()));
    }
}
