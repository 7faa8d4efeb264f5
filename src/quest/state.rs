//! Quest Step State Machine
//!
//! Steps move `Pending -> Completed` strictly in order and may move back
//! `Completed -> Pending` at any time. Skipping back past the most recent
//! completion needs an explicit confirmation from the caller.
//!
//! The machine only mutates the quest and reports the EXP delta; the caller
//! hands that delta to [`crate::progression`] exactly once per transition.

use super::definition::Quest;

/// Outcome of a single toggle request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepToggle {
    /// Unknown step or out-of-order completion; nothing changed
    Ignored,
    /// Undo skips the most recent completion and was not confirmed; nothing changed
    NeedsConfirmation { index: usize },
    /// Step completed, award `exp_delta`
    Completed { index: usize, exp_delta: i64 },
    /// Step reverted to pending, apply (negative) `exp_delta`
    Reverted { index: usize, exp_delta: i64 },
}

impl StepToggle {
    /// EXP to hand to the progression engine, if the quest changed
    pub fn exp_delta(&self) -> Option<i64> {
        match self {
            StepToggle::Completed { exp_delta, .. } | StepToggle::Reverted { exp_delta, .. } => {
                Some(*exp_delta)
            }
            StepToggle::Ignored | StepToggle::NeedsConfirmation { .. } => None,
        }
    }
}

/// Whether undoing `index` needs confirmation given the current cursor
pub fn undo_needs_confirmation(quest: &Quest, index: usize) -> bool {
    let len = quest.steps.len();
    let most_recent = quest.current_step.checked_sub(1) == Some(index);
    let last_of_finished = quest.current_step == len && index + 1 == len;
    !most_recent && !last_of_finished
}

/// Toggle the completion of `step_id`.
///
/// `confirmed` authorizes an out-of-order undo; it is ignored otherwise.
pub fn toggle_step(quest: &mut Quest, step_id: &str, confirmed: bool) -> StepToggle {
    let Some(index) = quest.step_index(step_id) else {
        return StepToggle::Ignored;
    };
    let step = &quest.steps[index];
    let reward = step.exp_reward;

    if !step.is_completed {
        if index != quest.current_step {
            return StepToggle::Ignored;
        }
        quest.steps[index].is_completed = true;
        quest.recompute_cursor();
        StepToggle::Completed { index, exp_delta: reward }
    } else {
        if undo_needs_confirmation(quest, index) && !confirmed {
            return StepToggle::NeedsConfirmation { index };
        }
        quest.steps[index].is_completed = false;
        quest.recompute_cursor();
        StepToggle::Reverted { index, exp_delta: -reward }
    }
}
