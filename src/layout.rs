//! Placement of new step markers on the quest map.
//!
//! New steps are dropped "forward" (down the map) from the previous step with
//! some horizontal jitter, avoiding markers of every quest. The search is
//! bounded; when it runs out the step goes straight ahead and may overlap.

use rand::Rng;
use tracing::debug;

use crate::geometry::MapPosition;
use crate::quest::{Quest, QuestStep};

/// Half-width of the square the first step of a quest is scattered in
pub const FIRST_STEP_SCATTER: f64 = 100.0;

/// Half-width of the square new quests start in
pub const QUEST_START_SCATTER: f64 = 150.0;

/// Maximum horizontal offset from the previous step
pub const HORIZONTAL_SPREAD: f64 = 120.0;

pub const FORWARD_MIN: f64 = 80.0;
pub const FORWARD_MAX: f64 = 160.0;

/// Minimum distance between a new marker and any existing marker
pub const MIN_SPACING: f64 = 60.0;

pub const MAX_ATTEMPTS: usize = 15;

/// Forward distance used when every attempt collides
pub const FALLBACK_FORWARD: f64 = 100.0;

/// Propose a position for a step appended to `quest_steps`.
///
/// `all_quests` supplies the markers to keep clear of; it may include the
/// quest being extended.
pub fn next_position<R: Rng + ?Sized>(
    rng: &mut R,
    quest_steps: &[QuestStep],
    all_quests: &[Quest],
) -> MapPosition {
    let Some(last) = quest_steps.last() else {
        return MapPosition::new(
            rng.gen_range(-FIRST_STEP_SCATTER..FIRST_STEP_SCATTER),
            rng.gen_range(-FIRST_STEP_SCATTER..FIRST_STEP_SCATTER),
        );
    };
    let seed = last.map_position;

    let existing: Vec<MapPosition> = all_quests
        .iter()
        .flat_map(|q| q.steps.iter().map(|s| s.map_position))
        .collect();

    for _ in 0..MAX_ATTEMPTS {
        let candidate = seed.offset(
            rng.gen_range(-HORIZONTAL_SPREAD..HORIZONTAL_SPREAD),
            rng.gen_range(FORWARD_MIN..FORWARD_MAX),
        );
        if is_clear(&candidate, &existing) {
            return candidate;
        }
    }

    debug!(
        "No free spot near ({:.0}, {:.0}) after {} attempts, placing straight ahead",
        seed.x(),
        seed.y(),
        MAX_ATTEMPTS
    );
    seed.offset(0.0, FALLBACK_FORWARD)
}

/// Starting point for a brand new quest
pub fn quest_start_position<R: Rng + ?Sized>(rng: &mut R) -> MapPosition {
    MapPosition::new(
        rng.gen_range(-QUEST_START_SCATTER..QUEST_START_SCATTER),
        rng.gen_range(-QUEST_START_SCATTER..QUEST_START_SCATTER),
    )
}

/// True if `candidate` keeps at least [`MIN_SPACING`] from every point
pub fn is_clear(candidate: &MapPosition, existing: &[MapPosition]) -> bool {
    existing.iter().all(|p| candidate.distance(p) >= MIN_SPACING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quest_at(points: &[(f64, f64)]) -> Quest {
        let mut quest = Quest::new("Layout", MapPosition::ORIGIN);
        quest.steps = points
            .iter()
            .map(|(x, y)| QuestStep::new("step", 20, MapPosition::new(*x, *y)))
            .collect();
        quest
    }

    #[test]
    fn test_first_step_is_scattered_near_origin() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let pos = next_position(&mut rng, &[], &[]);
            assert!(pos.x().abs() <= FIRST_STEP_SCATTER);
            assert!(pos.y().abs() <= FIRST_STEP_SCATTER);
        }
    }

    #[test]
    fn test_candidates_move_forward_and_keep_spacing() {
        let mut rng = StdRng::seed_from_u64(42);
        let quest = quest_at(&[(0.0, 0.0)]);
        let other = quest_at(&[(200.0, 120.0), (-150.0, 100.0)]);
        let all = vec![quest.clone(), other];

        for _ in 0..200 {
            let pos = next_position(&mut rng, &quest.steps, &all);
            assert!(pos.y() >= FORWARD_MIN);
            assert!(pos.y() <= FORWARD_MAX);
            assert!(pos.x().abs() <= HORIZONTAL_SPREAD);
            let existing: Vec<MapPosition> = all.iter().flat_map(|q| q.path()).collect();
            assert!(is_clear(&pos, &existing));
        }
    }

    #[test]
    fn test_crowded_map_falls_back_straight_ahead() {
        // Blanket the whole candidate area with markers 40 units apart
        let mut points = vec![(0.0, 0.0)];
        let mut x = -200.0;
        while x <= 200.0 {
            let mut y = 40.0;
            while y <= 220.0 {
                points.push((x, y));
                y += 40.0;
            }
            x += 40.0;
        }
        let quest = quest_at(&points[..1]);
        let crowd = quest_at(&points[1..]);
        let all = vec![quest.clone(), crowd];

        let mut first = StdRng::seed_from_u64(1);
        let mut second = StdRng::seed_from_u64(99);
        let a = next_position(&mut first, &quest.steps, &all);
        let b = next_position(&mut second, &quest.steps, &all);
        assert_eq!(a, MapPosition::new(0.0, FALLBACK_FORWARD));
        assert_eq!(a, b);
    }

    #[test]
    fn test_quest_start_position_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let pos = quest_start_position(&mut rng);
            assert!(pos.x().abs() <= QUEST_START_SCATTER);
            assert!(pos.y().abs() <= QUEST_START_SCATTER);
        }
    }
}
