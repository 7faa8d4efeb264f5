//! Quest Data Structures
//!
//! These structures are persisted as camelCase JSON. Older records may lack
//! `tag` (and other optional fields); serde defaults upgrade them on load.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::MapPosition;

/// Reward for the first step of a freshly created quest
pub const START_STEP_REWARD: i64 = 10;

/// Reward for steps appended through the editor
pub const DEFAULT_STEP_REWARD: i64 = 20;

/// Quest category tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuestTag {
    Work,
    Hobby,
    SelfDev,
    Health,
    /// Catch-all tag, also used for legacy quests saved without a tag
    #[default]
    Etc,
}

impl QuestTag {
    pub fn label(&self) -> &'static str {
        match self {
            QuestTag::Work => "Work",
            QuestTag::Hobby => "Hobby",
            QuestTag::SelfDev => "Self-development",
            QuestTag::Health => "Health",
            QuestTag::Etc => "Other",
        }
    }
}

/// A single step of a quest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestStep {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub exp_reward: i64,
    #[serde(default)]
    pub map_position: MapPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl QuestStep {
    pub fn new(text: &str, exp_reward: i64, map_position: MapPosition) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            is_completed: false,
            exp_reward: exp_reward.max(0),
            map_position,
            memo: None,
        }
    }
}

/// A user-defined quest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tag: QuestTag,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Index of the first incomplete step (`steps.len()` when all are done)
    #[serde(default)]
    pub current_step: usize,
    #[serde(default)]
    pub steps: Vec<QuestStep>,
}

fn default_active() -> bool {
    true
}

impl Quest {
    /// Create an active quest with a single starting step at `start`
    pub fn new(title: &str, start: MapPosition) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            tag: QuestTag::Etc,
            is_active: true,
            current_step: 0,
            steps: vec![QuestStep::new("Starting point", START_STEP_REWARD, start)],
        }
    }

    /// All steps completed. A quest without steps counts as completed.
    pub fn is_completed(&self) -> bool {
        self.steps.iter().all(|s| s.is_completed)
    }

    pub fn step_index(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    pub fn step(&self, step_id: &str) -> Option<&QuestStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn step_mut(&mut self, step_id: &str) -> Option<&mut QuestStep> {
        self.steps.iter_mut().find(|s| s.id == step_id)
    }

    /// The step under the cursor, if any remain
    pub fn current(&self) -> Option<&QuestStep> {
        self.steps.get(self.current_step)
    }

    /// First incomplete step index, or `steps.len()` if all are complete
    pub fn first_incomplete(&self) -> usize {
        self.steps
            .iter()
            .position(|s| !s.is_completed)
            .unwrap_or(self.steps.len())
    }

    /// Re-derive `current_step` from the per-step flags
    pub fn recompute_cursor(&mut self) {
        self.current_step = self.first_incomplete();
    }

    /// Where the character stands for this quest: the current step, or the
    /// last step once everything is done.
    pub fn follow_position(&self) -> Option<MapPosition> {
        self.current()
            .or_else(|| self.steps.last())
            .map(|s| s.map_position)
    }

    /// "n/total" progress label as shown on the quest banner
    pub fn progress_label(&self) -> String {
        let shown = (self.current_step + 1).min(self.steps.len());
        format!("{}/{}", shown, self.steps.len())
    }

    pub fn current_step_text(&self) -> Option<&str> {
        self.current().map(|s| s.text.as_str())
    }

    /// Positions of every step, in traversal order (map polyline)
    pub fn path(&self) -> Vec<MapPosition> {
        self.steps.iter().map(|s| s.map_position).collect()
    }

    pub fn remove_step(&mut self, step_id: &str) -> Option<QuestStep> {
        let index = self.step_index(step_id)?;
        let removed = self.steps.remove(index);
        self.recompute_cursor();
        Some(removed)
    }

    /// Set or clear a step memo. Blank text clears it.
    pub fn set_memo(&mut self, step_id: &str, memo: &str) -> bool {
        match self.step_mut(step_id) {
            Some(step) => {
                let trimmed = memo.trim();
                step.memo = if trimmed.is_empty() {
                    None
                } else {
                    Some(memo.to_string())
                };
                true
            }
            None => false,
        }
    }
}

/// Count quests whose steps are all completed, optionally restricted to a tag
pub fn completed_count(quests: &[Quest], tag: Option<QuestTag>) -> usize {
    quests
        .iter()
        .filter(|q| tag.map_or(true, |t| q.tag == t))
        .filter(|q| q.is_completed())
        .count()
}
