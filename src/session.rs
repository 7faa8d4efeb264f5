//! Top-level widget state.
//!
//! [`QuestMap`] owns the config (characters) and the quest list and is the
//! only writer of both. Each user action runs to completion here: the quest
//! state machine, the progression engine, the layout allocator and the
//! camera are all called from these handlers.

use std::sync::Arc;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::achievement::AchievementBook;
use crate::camera::{self, Placement, ViewportCamera};
use crate::config::{random_limit_dialog, GlobalConfig};
use crate::geometry::MapPosition;
use crate::layout;
use crate::progression::{self, ProgressAction, ProgressOutcome};
use crate::quest::definition::DEFAULT_STEP_REWARD;
use crate::quest::{Quest, QuestStep, QuestTag, StepToggle};

pub const NEW_QUEST_TITLE: &str = "New adventure";
pub const NEW_STEP_TEXT: &str = "New objective";

/// Session shared between concurrent callers; the mutex keeps a single writer
pub type SharedQuestMap = Arc<Mutex<QuestMap>>;

/// Something the UI should surface after an action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    Dialog { text: String },
    #[serde(rename_all = "camelCase")]
    ClickLimitReached { text: String },
    #[serde(rename_all = "camelCase")]
    LevelUp { character_id: String, level: i32 },
    /// Only the first title unlocked by an action is announced
    #[serde(rename_all = "camelCase")]
    AchievementUnlocked { title: String },
    #[serde(rename_all = "camelCase")]
    ConfirmationRequired { quest_id: String, step_id: String },
    #[serde(rename_all = "camelCase")]
    StepCompleted { quest_id: String, step_id: String, exp: i64 },
    #[serde(rename_all = "camelCase")]
    StepReverted { quest_id: String, step_id: String, exp: i64 },
    #[serde(rename_all = "camelCase")]
    QuestCompleted { quest_id: String },
}

/// Quest list tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestTab {
    Active,
    Completed,
}

/// Summary of what the widget shows right now
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub character_id: String,
    pub character_name: String,
    pub level: i32,
    pub current_exp: i64,
    pub next_level_exp: i64,
    /// Fill ratio of the EXP bar
    pub exp_progress: f32,
    pub affinity: i64,
    pub affinity_level: i32,
    pub clicks_left_today: u32,
    pub focused_quest_id: Option<String>,
    pub quest_progress: Option<String>,
    pub current_step_text: Option<String>,
    pub character_position: MapPosition,
    pub viewport_offset: MapPosition,
    pub unlocked_achievements: usize,
    pub total_achievements: usize,
}

/// Achievement category progress for the status screen
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProgress {
    pub category_id: String,
    pub title: String,
    pub unlocked: usize,
    pub total: usize,
}

pub struct QuestMap<R: Rng = StdRng> {
    config: GlobalConfig,
    quests: Vec<Quest>,
    camera: ViewportCamera,
    focused_quest_id: Option<String>,
    book: AchievementBook,
    rng: R,
    clock: fn() -> NaiveDate,
}

impl QuestMap<StdRng> {
    pub fn new(config: GlobalConfig, quests: Vec<Quest>, book: AchievementBook) -> Self {
        Self::with_rng(config, quests, book, StdRng::from_entropy())
    }

    pub fn into_shared(self) -> SharedQuestMap {
        Arc::new(Mutex::new(self))
    }
}

impl<R: Rng> QuestMap<R> {
    pub fn with_rng(mut config: GlobalConfig, quests: Vec<Quest>, book: AchievementBook, rng: R) -> Self {
        config.repair();
        for character in &config.characters {
            book.unknown_unlocks(character);
        }
        Self {
            config,
            quests,
            camera: ViewportCamera::new(),
            focused_quest_id: None,
            book,
            rng,
            clock: progression::today,
        }
    }

    /// Replace the calendar source used for the daily click cap
    pub fn set_clock(&mut self, clock: fn() -> NaiveDate) {
        self.clock = clock;
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GlobalConfig {
        &mut self.config
    }

    pub fn quests(&self) -> &[Quest] {
        &self.quests
    }

    pub fn quest(&self, quest_id: &str) -> Option<&Quest> {
        self.quests.iter().find(|q| q.id == quest_id)
    }

    fn quest_mut(&mut self, quest_id: &str) -> Option<&mut Quest> {
        self.quests.iter_mut().find(|q| q.id == quest_id)
    }

    pub fn book(&self) -> &AchievementBook {
        &self.book
    }

    pub fn camera(&self) -> &ViewportCamera {
        &self.camera
    }

    // ------------------------------------------------------------------------
    // Progression
    // ------------------------------------------------------------------------

    /// Apply one progression action to the active character and collect the
    /// resulting notifications. Returns `None` if the click cap was hit.
    fn progress(&mut self, action: ProgressAction) -> Option<Vec<SessionEvent>> {
        let today = (self.clock)();
        let Some(character) = self.config.active_character() else {
            warn!("No active character, dropping progression action");
            return Some(Vec::new());
        };
        let outcome = progression::apply(character, action, today, &self.quests, &self.book);
        let report = match outcome {
            ProgressOutcome::Applied(report) => report,
            ProgressOutcome::LimitReached => return None,
        };

        let mut events = Vec::new();
        if report.leveled_up {
            events.push(SessionEvent::LevelUp {
                character_id: report.character.id.clone(),
                level: report.character.level,
            });
        }
        if let Some(title) = report.first_unlocked() {
            events.push(SessionEvent::AchievementUnlocked {
                title: title.to_string(),
            });
        }
        if let Some(slot) = self.config.active_character_mut() {
            *slot = report.character;
        }
        Some(events)
    }

    /// The user clicked the character
    pub fn interact(&mut self) -> Vec<SessionEvent> {
        match self.progress(ProgressAction::Click) {
            Some(mut events) => {
                let affinity_level = self
                    .config
                    .active_character()
                    .map_or(1, |c| c.affinity_level);
                let text = self.config.random_dialog(&mut self.rng, affinity_level);
                events.insert(0, SessionEvent::Dialog { text });
                events
            }
            None => vec![SessionEvent::ClickLimitReached {
                text: random_limit_dialog(&mut self.rng),
            }],
        }
    }

    /// Complete or undo a step. `confirmed` authorizes an out-of-order undo.
    pub fn toggle_step(&mut self, quest_id: &str, step_id: &str, confirmed: bool) -> Vec<SessionEvent> {
        let Some(quest) = self.quest_mut(quest_id) else {
            debug!("Toggle for unknown quest {}", quest_id);
            return Vec::new();
        };
        let was_completed = quest.is_completed();
        let transition = crate::quest::toggle_step(quest, step_id, confirmed);
        let now_completed = quest.is_completed();

        let mut events = match transition {
            StepToggle::Ignored => return Vec::new(),
            StepToggle::NeedsConfirmation { .. } => {
                return vec![SessionEvent::ConfirmationRequired {
                    quest_id: quest_id.to_string(),
                    step_id: step_id.to_string(),
                }];
            }
            StepToggle::Completed { exp_delta, .. } => vec![SessionEvent::StepCompleted {
                quest_id: quest_id.to_string(),
                step_id: step_id.to_string(),
                exp: exp_delta,
            }],
            StepToggle::Reverted { exp_delta, .. } => vec![SessionEvent::StepReverted {
                quest_id: quest_id.to_string(),
                step_id: step_id.to_string(),
                exp: exp_delta,
            }],
        };
        if now_completed && !was_completed {
            info!("Quest {} completed", quest_id);
            events.push(SessionEvent::QuestCompleted {
                quest_id: quest_id.to_string(),
            });
        }

        if let Some(delta) = transition.exp_delta() {
            // Rewards are never rate limited, so this always applies
            if let Some(progress_events) = self.progress(ProgressAction::Reward(delta)) {
                events.extend(progress_events);
            }
        }
        events
    }

    // ------------------------------------------------------------------------
    // Quest editing
    // ------------------------------------------------------------------------

    /// Create a quest with one starting step. Returns its id.
    pub fn add_quest(&mut self) -> String {
        let start = layout::quest_start_position(&mut self.rng);
        let quest = Quest::new(NEW_QUEST_TITLE, start);
        let id = quest.id.clone();
        info!("Created quest {}", id);
        self.quests.push(quest);
        id
    }

    /// Append a step placed by the layout allocator. Returns the step id.
    pub fn add_step(&mut self, quest_id: &str) -> Option<String> {
        let quest = self.quests.iter().find(|q| q.id == quest_id)?;
        let position = layout::next_position(&mut self.rng, &quest.steps, &self.quests);
        let step = QuestStep::new(NEW_STEP_TEXT, DEFAULT_STEP_REWARD, position);
        let step_id = step.id.clone();

        let quest = self.quest_mut(quest_id)?;
        quest.steps.push(step);
        quest.recompute_cursor();
        Some(step_id)
    }

    pub fn remove_quest(&mut self, quest_id: &str) -> bool {
        let before = self.quests.len();
        self.quests.retain(|q| q.id != quest_id);
        if self.focused_quest_id.as_deref() == Some(quest_id) {
            self.focused_quest_id = None;
        }
        if self.camera.placing().is_some_and(|p| p.quest_id == quest_id) {
            self.camera.cancel_placement();
        }
        self.quests.len() != before
    }

    pub fn remove_step(&mut self, quest_id: &str, step_id: &str) -> bool {
        self.quest_mut(quest_id)
            .and_then(|q| q.remove_step(step_id))
            .is_some()
    }

    pub fn rename_quest(&mut self, quest_id: &str, title: &str) -> bool {
        self.edit_quest(quest_id, |q| q.title = title.to_string())
    }

    pub fn set_tag(&mut self, quest_id: &str, tag: QuestTag) -> bool {
        self.edit_quest(quest_id, |q| q.tag = tag)
    }

    pub fn set_active(&mut self, quest_id: &str, active: bool) -> bool {
        self.edit_quest(quest_id, |q| q.is_active = active)
    }

    pub fn edit_step_text(&mut self, quest_id: &str, step_id: &str, text: &str) -> bool {
        self.edit_step(quest_id, step_id, |s| s.text = text.to_string())
    }

    pub fn set_step_reward(&mut self, quest_id: &str, step_id: &str, reward: i64) -> bool {
        self.edit_step(quest_id, step_id, |s| s.exp_reward = reward.max(0))
    }

    pub fn set_memo(&mut self, quest_id: &str, step_id: &str, memo: &str) -> bool {
        self.quest_mut(quest_id)
            .is_some_and(|q| q.set_memo(step_id, memo))
    }

    fn edit_quest(&mut self, quest_id: &str, edit: impl FnOnce(&mut Quest)) -> bool {
        match self.quest_mut(quest_id) {
            Some(quest) => {
                edit(quest);
                true
            }
            None => false,
        }
    }

    fn edit_step(&mut self, quest_id: &str, step_id: &str, edit: impl FnOnce(&mut QuestStep)) -> bool {
        match self.quest_mut(quest_id).and_then(|q| q.step_mut(step_id)) {
            Some(step) => {
                edit(step);
                true
            }
            None => false,
        }
    }

    /// Drop all quests and the map image. Characters keep their progress.
    pub fn start_new_season(&mut self) {
        info!("Starting a new season, clearing {} quests", self.quests.len());
        self.quests.clear();
        self.config.reset_map();
        self.focused_quest_id = None;
        self.camera = ViewportCamera::new();
    }

    pub fn quests_filtered(&self, tab: QuestTab, tag: Option<QuestTag>) -> Vec<&Quest> {
        self.quests
            .iter()
            .filter(|q| match tab {
                QuestTab::Active => q.is_active && !q.is_completed(),
                QuestTab::Completed => q.is_completed(),
            })
            .filter(|q| tag.map_or(true, |t| q.tag == t))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Focus and camera
    // ------------------------------------------------------------------------

    pub fn focus_quest(&mut self, quest_id: &str) -> bool {
        if self.quest(quest_id).is_none() {
            return false;
        }
        self.focused_quest_id = Some(quest_id.to_string());
        true
    }

    /// Explicitly focused quest, else the first active one, else the first one
    pub fn focused_quest(&self) -> Option<&Quest> {
        self.focused_quest_id
            .as_deref()
            .and_then(|id| self.quest(id))
            .or_else(|| self.quests.iter().find(|q| q.is_active))
            .or_else(|| self.quests.first())
    }

    pub fn follow_position(&self) -> MapPosition {
        camera::follow_position(self.focused_quest())
    }

    pub fn viewport_offset(&self) -> MapPosition {
        self.camera.viewport_offset(self.follow_position())
    }

    pub fn begin_drag(&mut self, pointer: MapPosition) -> bool {
        self.camera.begin_drag(pointer)
    }

    pub fn drag_to(&mut self, pointer: MapPosition) {
        self.camera.drag_to(pointer);
    }

    pub fn end_drag(&mut self) {
        self.camera.end_drag();
    }

    pub fn recenter(&mut self) {
        self.camera.recenter();
    }

    /// Bring a step under the anchor without moving the character
    pub fn jump_to_step(&mut self, quest_id: &str, step_id: &str) -> bool {
        let Some(target) = self
            .quest(quest_id)
            .and_then(|q| q.step(step_id))
            .map(|s| s.map_position)
        else {
            return false;
        };
        let follow = self.follow_position();
        self.camera.jump_to(follow, target);
        true
    }

    pub fn begin_placement(&mut self, quest_id: &str, step_id: &str) -> bool {
        if self.quest(quest_id).and_then(|q| q.step(step_id)).is_none() {
            return false;
        }
        self.camera.begin_placement(quest_id, step_id);
        true
    }

    pub fn cancel_placement(&mut self) {
        self.camera.cancel_placement();
    }

    /// Assign the clicked, grid-snapped map position to the pending step
    pub fn place_click(&mut self, click: MapPosition) -> Option<Placement> {
        let follow = self.follow_position();
        let placement = self.camera.place_click(click, follow)?;
        let moved = self.edit_step(&placement.quest_id, &placement.step_id, |s| {
            s.map_position = placement.position
        });
        if !moved {
            warn!("Placement target {} vanished", placement.step_id);
            return None;
        }
        Some(placement)
    }

    // ------------------------------------------------------------------------
    // Read models
    // ------------------------------------------------------------------------

    pub fn achievement_progress(&self) -> Vec<CategoryProgress> {
        let Some(character) = self.config.active_character() else {
            return Vec::new();
        };
        self.book
            .categories()
            .iter()
            .map(|category| {
                let (unlocked, total) = category.progress(character);
                CategoryProgress {
                    category_id: category.id.clone(),
                    title: category.title.clone(),
                    unlocked,
                    total,
                }
            })
            .collect()
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        let character = self.config.active_character()?;
        let today = progression::day_key((self.clock)());
        let clicks_used = if character.last_click_date.as_deref() == Some(today.as_str()) {
            character.daily_click_count
        } else {
            0
        };
        let focused = self.focused_quest();
        Some(Snapshot {
            character_id: character.id.clone(),
            character_name: character.name.clone(),
            level: character.level,
            current_exp: character.current_exp,
            next_level_exp: character.next_level_exp,
            exp_progress: character.exp_progress(),
            affinity: character.affinity,
            affinity_level: character.affinity_level,
            clicks_left_today: progression::DAILY_CLICK_LIMIT.saturating_sub(clicks_used),
            focused_quest_id: focused.map(|q| q.id.clone()),
            quest_progress: focused.map(|q| q.progress_label()),
            current_step_text: focused.and_then(|q| q.current_step_text().map(str::to_string)),
            character_position: self.follow_position(),
            viewport_offset: self.viewport_offset(),
            unlocked_achievements: character.unlocked_achievements.len(),
            total_achievements: self.book.len(),
        })
    }
}
