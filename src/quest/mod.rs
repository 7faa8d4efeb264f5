//! Quest Module
//!
//! User-defined quests: ordered checklists of steps pinned to map coordinates,
//! plus the in-order completion state machine that drives rewards.

pub mod definition;
pub mod state;

pub use definition::{Quest, QuestStep, QuestTag};
pub use state::{toggle_step, StepToggle};
