//! Viewport camera: follow target, user pan and grid-snapped step placement.

use serde::{Deserialize, Serialize};

use crate::geometry::MapPosition;
use crate::quest::Quest;

/// Fixed on-screen point the character sprite is drawn at
pub const ANCHOR: MapPosition = MapPosition(210.0, 210.0);

/// Grid that manually placed steps snap to
pub const PLACEMENT_GRID: f64 = 10.0;

/// A step waiting for the user to click its new map position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementTarget {
    pub quest_id: String,
    pub step_id: String,
}

/// Result of a placement click
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub quest_id: String,
    pub step_id: String,
    pub position: MapPosition,
}

/// Where the camera follows for `quest`: its current step, its last step once
/// finished, or the map origin when there is nothing to follow.
pub fn follow_position(quest: Option<&Quest>) -> MapPosition {
    quest
        .and_then(|q| q.follow_position())
        .unwrap_or(MapPosition::ORIGIN)
}

/// Map view state: user pan on top of the follow target
#[derive(Debug, Clone, Default)]
pub struct ViewportCamera {
    /// Accumulated drag delta, cleared only by an explicit recenter
    pub pan_offset: MapPosition,
    dragging: bool,
    last_pointer: MapPosition,
    placing: Option<PlacementTarget>,
}

impl ViewportCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translation applied to the map layer
    pub fn viewport_offset(&self, follow: MapPosition) -> MapPosition {
        ANCHOR.minus(&follow).plus(&self.pan_offset)
    }

    pub fn screen_to_map(&self, screen: MapPosition, follow: MapPosition) -> MapPosition {
        screen.minus(&self.viewport_offset(follow))
    }

    pub fn map_to_screen(&self, map: MapPosition, follow: MapPosition) -> MapPosition {
        map.plus(&self.viewport_offset(follow))
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Start a drag. Ignored while waiting for a placement click.
    pub fn begin_drag(&mut self, pointer: MapPosition) -> bool {
        if self.placing.is_some() {
            return false;
        }
        self.dragging = true;
        self.last_pointer = pointer;
        true
    }

    /// Pointer moved; pans only while a drag is active
    pub fn drag_to(&mut self, pointer: MapPosition) {
        if !self.dragging {
            return;
        }
        let delta = pointer.minus(&self.last_pointer);
        self.pan_offset = self.pan_offset.plus(&delta);
        self.last_pointer = pointer;
    }

    /// End the drag. Safe to call without a matching `begin_drag`.
    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// Pan so `target` sits under the anchor. The follow target itself is
    /// not moved.
    pub fn jump_to(&mut self, follow: MapPosition, target: MapPosition) {
        self.pan_offset = follow.minus(&target);
    }

    /// Drop any manual pan and snap back onto the follow target
    pub fn recenter(&mut self) {
        self.pan_offset = MapPosition::ORIGIN;
    }

    pub fn placing(&self) -> Option<&PlacementTarget> {
        self.placing.as_ref()
    }

    pub fn begin_placement(&mut self, quest_id: &str, step_id: &str) {
        self.dragging = false;
        self.placing = Some(PlacementTarget {
            quest_id: quest_id.to_string(),
            step_id: step_id.to_string(),
        });
    }

    pub fn cancel_placement(&mut self) {
        self.placing = None;
    }

    /// Map a click to a grid-snapped map position for the pending step.
    /// Returns `None` (and does nothing) when no placement is pending.
    pub fn place_click(&mut self, click: MapPosition, follow: MapPosition) -> Option<Placement> {
        let target = self.placing.take()?;
        let position = self.screen_to_map(click, follow).snapped(PLACEMENT_GRID);
        Some(Placement {
            quest_id: target.quest_id,
            step_id: target.step_id,
            position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::QuestStep;

    #[test]
    fn test_offset_follows_target() {
        let camera = ViewportCamera::new();
        let offset = camera.viewport_offset(MapPosition::new(50.0, 300.0));
        assert_eq!(offset, MapPosition::new(160.0, -90.0));
        // The followed point lands on the anchor
        assert_eq!(camera.map_to_screen(MapPosition::new(50.0, 300.0), MapPosition::new(50.0, 300.0)), ANCHOR);
    }

    #[test]
    fn test_follow_position_fallbacks() {
        assert_eq!(follow_position(None), MapPosition::ORIGIN);

        let mut quest = Quest::new("Walk", MapPosition::new(5.0, 5.0));
        quest.steps.push(QuestStep::new("Park", 20, MapPosition::new(5.0, 105.0)));
        assert_eq!(follow_position(Some(&quest)), MapPosition::new(5.0, 5.0));

        for step in &mut quest.steps {
            step.is_completed = true;
        }
        quest.recompute_cursor();
        assert_eq!(follow_position(Some(&quest)), MapPosition::new(5.0, 105.0));
    }

    #[test]
    fn test_drag_accumulates_only_while_active() {
        let mut camera = ViewportCamera::new();
        camera.drag_to(MapPosition::new(30.0, 30.0));
        assert_eq!(camera.pan_offset, MapPosition::ORIGIN);

        camera.begin_drag(MapPosition::new(100.0, 100.0));
        camera.drag_to(MapPosition::new(110.0, 95.0));
        camera.drag_to(MapPosition::new(130.0, 90.0));
        camera.end_drag();
        camera.drag_to(MapPosition::new(500.0, 500.0));
        assert_eq!(camera.pan_offset, MapPosition::new(30.0, -10.0));

        // Second drag keeps the earlier pan
        camera.begin_drag(MapPosition::new(0.0, 0.0));
        camera.drag_to(MapPosition::new(5.0, 5.0));
        assert_eq!(camera.pan_offset, MapPosition::new(35.0, -5.0));
    }

    #[test]
    fn test_end_without_start_is_noop() {
        let mut camera = ViewportCamera::new();
        camera.end_drag();
        camera.end_drag();
        assert!(!camera.is_dragging());
        assert_eq!(camera.pan_offset, MapPosition::ORIGIN);
    }

    #[test]
    fn test_jump_and_recenter() {
        let mut camera = ViewportCamera::new();
        let follow = MapPosition::new(0.0, 0.0);
        let target = MapPosition::new(40.0, 200.0);
        camera.jump_to(follow, target);
        assert_eq!(camera.pan_offset, MapPosition::new(-40.0, -200.0));
        assert_eq!(camera.map_to_screen(target, follow), ANCHOR);

        camera.recenter();
        assert_eq!(camera.pan_offset, MapPosition::ORIGIN);
    }

    #[test]
    fn test_placement_click_snaps_to_grid() {
        let mut camera = ViewportCamera::new();
        let follow = MapPosition::new(0.0, 0.0);
        assert!(camera.place_click(MapPosition::new(0.0, 0.0), follow).is_none());

        camera.begin_placement("q1", "s1");
        assert!(!camera.begin_drag(MapPosition::new(1.0, 1.0)));

        // offset is (210, 210); click at (253, 166) -> map (43, -44) -> (40, -40)
        let placement = camera.place_click(MapPosition::new(253.0, 166.0), follow).unwrap();
        assert_eq!(placement.quest_id, "q1");
        assert_eq!(placement.step_id, "s1");
        assert_eq!(placement.position, MapPosition::new(40.0, -40.0));
        assert!(camera.placing().is_none());
    }
}
