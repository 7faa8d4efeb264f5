use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::camera::Placement;
use crate::geometry::MapPosition;
use crate::quest::{Quest, QuestTag};
use crate::session::{CategoryProgress, QuestMap, QuestTab, SessionEvent, Snapshot};

// ============================================================================
// UI -> Core Commands
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    #[serde(rename = "snapshot")]
    Snapshot,

    #[serde(rename = "listQuests")]
    ListQuests {
        #[serde(default)]
        tab: Option<QuestTab>,
        #[serde(default)]
        tag: Option<QuestTag>,
    },

    #[serde(rename = "achievements")]
    Achievements,

    /// Poke the character
    #[serde(rename = "interact")]
    Interact,

    #[serde(rename = "toggleStep")]
    ToggleStep {
        quest_id: String,
        step_id: String,
        #[serde(default)]
        confirmed: bool,
    },

    #[serde(rename = "addQuest")]
    AddQuest,

    #[serde(rename = "addStep")]
    AddStep { quest_id: String },

    #[serde(rename = "removeQuest")]
    RemoveQuest { quest_id: String },

    #[serde(rename = "removeStep")]
    RemoveStep { quest_id: String, step_id: String },

    #[serde(rename = "renameQuest")]
    RenameQuest { quest_id: String, title: String },

    #[serde(rename = "setTag")]
    SetTag { quest_id: String, tag: QuestTag },

    #[serde(rename = "setActive")]
    SetActive { quest_id: String, active: bool },

    #[serde(rename = "editStep")]
    EditStep {
        quest_id: String,
        step_id: String,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        exp_reward: Option<i64>,
    },

    #[serde(rename = "setMemo")]
    SetMemo { quest_id: String, step_id: String, memo: String },

    #[serde(rename = "focusQuest")]
    FocusQuest { quest_id: String },

    #[serde(rename = "dragStart")]
    DragStart { x: f64, y: f64 },

    #[serde(rename = "dragMove")]
    DragMove { x: f64, y: f64 },

    #[serde(rename = "dragEnd")]
    DragEnd,

    #[serde(rename = "jumpToStep")]
    JumpToStep { quest_id: String, step_id: String },

    #[serde(rename = "recenter")]
    Recenter,

    #[serde(rename = "beginPlacement")]
    BeginPlacement { quest_id: String, step_id: String },

    #[serde(rename = "cancelPlacement")]
    CancelPlacement,

    #[serde(rename = "placeClick")]
    PlaceClick { x: f64, y: f64 },

    #[serde(rename = "addCharacter")]
    AddCharacter {
        #[serde(default)]
        name: Option<String>,
    },

    #[serde(rename = "selectCharacter")]
    SelectCharacter { character_id: String },

    #[serde(rename = "renameCharacter")]
    RenameCharacter { character_id: String, name: String },

    #[serde(rename = "setCharacterImage")]
    SetCharacterImage {
        character_id: String,
        #[serde(default)]
        image: Option<String>,
    },

    #[serde(rename = "deleteCharacter")]
    DeleteCharacter { character_id: String },

    #[serde(rename = "setMapScale")]
    SetMapScale { scale: f64 },

    #[serde(rename = "setDialogs")]
    SetDialogs { lines: Vec<String> },

    #[serde(rename = "newSeason")]
    NewSeason,
}

impl ClientCommand {
    /// Whether the command can change persisted state
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            ClientCommand::Snapshot
                | ClientCommand::ListQuests { .. }
                | ClientCommand::Achievements
                | ClientCommand::FocusQuest { .. }
                | ClientCommand::DragStart { .. }
                | ClientCommand::DragMove { .. }
                | ClientCommand::DragEnd
                | ClientCommand::JumpToStep { .. }
                | ClientCommand::Recenter
                | ClientCommand::BeginPlacement { .. }
                | ClientCommand::CancelPlacement
        )
    }
}

// ============================================================================
// Core -> UI Events
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    Snapshot { snapshot: Option<Snapshot> },
    Quests { quests: Vec<Quest> },
    Achievements { categories: Vec<CategoryProgress> },
    Events { events: Vec<SessionEvent> },
    Created { id: String },
    Placed { placement: Placement },
    Viewport { offset: MapPosition },
    Ack { ok: bool },
    Error { message: String },
}

/// Run one command against the session
pub fn dispatch<R: Rng>(map: &mut QuestMap<R>, command: ClientCommand) -> ServerEvent {
    match command {
        ClientCommand::Snapshot => ServerEvent::Snapshot {
            snapshot: map.snapshot(),
        },
        ClientCommand::ListQuests { tab, tag } => {
            let quests = match tab {
                Some(tab) => map.quests_filtered(tab, tag).into_iter().cloned().collect(),
                None => map
                    .quests()
                    .iter()
                    .filter(|q| tag.map_or(true, |t| q.tag == t))
                    .cloned()
                    .collect(),
            };
            ServerEvent::Quests { quests }
        }
        ClientCommand::Achievements => ServerEvent::Achievements {
            categories: map.achievement_progress(),
        },
        ClientCommand::Interact => ServerEvent::Events {
            events: map.interact(),
        },
        ClientCommand::ToggleStep { quest_id, step_id, confirmed } => ServerEvent::Events {
            events: map.toggle_step(&quest_id, &step_id, confirmed),
        },
        ClientCommand::AddQuest => ServerEvent::Created { id: map.add_quest() },
        ClientCommand::AddStep { quest_id } => match map.add_step(&quest_id) {
            Some(id) => ServerEvent::Created { id },
            None => unknown_quest(&quest_id),
        },
        ClientCommand::RemoveQuest { quest_id } => ack(map.remove_quest(&quest_id)),
        ClientCommand::RemoveStep { quest_id, step_id } => ack(map.remove_step(&quest_id, &step_id)),
        ClientCommand::RenameQuest { quest_id, title } => ack(map.rename_quest(&quest_id, &title)),
        ClientCommand::SetTag { quest_id, tag } => ack(map.set_tag(&quest_id, tag)),
        ClientCommand::SetActive { quest_id, active } => ack(map.set_active(&quest_id, active)),
        ClientCommand::EditStep { quest_id, step_id, text, exp_reward } => {
            let mut ok = true;
            if let Some(text) = text {
                ok &= map.edit_step_text(&quest_id, &step_id, &text);
            }
            if let Some(reward) = exp_reward {
                ok &= map.set_step_reward(&quest_id, &step_id, reward);
            }
            ack(ok)
        }
        ClientCommand::SetMemo { quest_id, step_id, memo } => ack(map.set_memo(&quest_id, &step_id, &memo)),
        ClientCommand::FocusQuest { quest_id } => ack(map.focus_quest(&quest_id)),
        ClientCommand::DragStart { x, y } => ack(map.begin_drag(MapPosition::new(x, y))),
        ClientCommand::DragMove { x, y } => {
            map.drag_to(MapPosition::new(x, y));
            viewport(map)
        }
        ClientCommand::DragEnd => {
            map.end_drag();
            viewport(map)
        }
        ClientCommand::JumpToStep { quest_id, step_id } => {
            if map.jump_to_step(&quest_id, &step_id) {
                viewport(map)
            } else {
                ack(false)
            }
        }
        ClientCommand::Recenter => {
            map.recenter();
            viewport(map)
        }
        ClientCommand::BeginPlacement { quest_id, step_id } => ack(map.begin_placement(&quest_id, &step_id)),
        ClientCommand::CancelPlacement => {
            map.cancel_placement();
            ack(true)
        }
        ClientCommand::PlaceClick { x, y } => match map.place_click(MapPosition::new(x, y)) {
            Some(placement) => ServerEvent::Placed { placement },
            None => ack(false),
        },
        ClientCommand::AddCharacter { name } => ServerEvent::Created {
            id: map.config_mut().add_character(name.as_deref()).id.clone(),
        },
        ClientCommand::SelectCharacter { character_id } => ack(map.config_mut().select_character(&character_id)),
        ClientCommand::RenameCharacter { character_id, name } => {
            ack(map.config_mut().rename_character(&character_id, &name))
        }
        ClientCommand::SetCharacterImage { character_id, image } => {
            ack(map.config_mut().set_character_image(&character_id, image))
        }
        ClientCommand::DeleteCharacter { character_id } => ack(map.config_mut().delete_character(&character_id)),
        ClientCommand::SetMapScale { scale } => {
            map.config_mut().set_map_scale(scale);
            ack(true)
        }
        ClientCommand::SetDialogs { lines } => {
            map.config_mut().custom_dialogs = lines;
            ack(true)
        }
        ClientCommand::NewSeason => {
            map.start_new_season();
            ack(true)
        }
    }
}

fn ack(ok: bool) -> ServerEvent {
    ServerEvent::Ack { ok }
}

fn viewport<R: Rng>(map: &QuestMap<R>) -> ServerEvent {
    ServerEvent::Viewport {
        offset: map.viewport_offset(),
    }
}

fn unknown_quest(quest_id: &str) -> ServerEvent {
    ServerEvent::Error {
        message: format!("Unknown quest '{}'", quest_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievement::AchievementBook;
    use crate::config::GlobalConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn session() -> QuestMap {
        QuestMap::with_rng(
            GlobalConfig::default(),
            Vec::new(),
            AchievementBook::builtin(),
            StdRng::seed_from_u64(2),
        )
    }

    fn parse(json: &str) -> ClientCommand {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_command_parsing() {
        let cmd = parse(r#"{"type":"toggleStep","quest_id":"q","step_id":"s"}"#);
        assert!(matches!(cmd, ClientCommand::ToggleStep { confirmed: false, .. }));
        assert!(cmd.is_mutating());

        let cmd = parse(r#"{"type":"listQuests","tab":"completed","tag":"Work"}"#);
        assert!(matches!(
            cmd,
            ClientCommand::ListQuests { tab: Some(QuestTab::Completed), tag: Some(QuestTag::Work) }
        ));
        assert!(!cmd.is_mutating());

        assert!(serde_json::from_str::<ClientCommand>(r#"{"type":"fly"}"#).is_err());
    }

    #[test]
    fn test_quest_flow_over_protocol() {
        let mut map = session();
        let ServerEvent::Created { id: quest_id } = dispatch(&mut map, ClientCommand::AddQuest) else {
            panic!("expected created");
        };
        let step_id = map.quest(&quest_id).unwrap().steps[0].id.clone();

        let event = dispatch(
            &mut map,
            ClientCommand::ToggleStep { quest_id: quest_id.clone(), step_id, confirmed: false },
        );
        let ServerEvent::Events { events } = event else {
            panic!("expected events");
        };
        assert!(events.iter().any(|e| matches!(e, SessionEvent::QuestCompleted { .. })));

        let json = serde_json::to_value(dispatch(&mut map, ClientCommand::Snapshot)).unwrap();
        assert_eq!(json["type"], "snapshot");
        assert_eq!(json["snapshot"]["currentExp"], 10);
    }

    #[test]
    fn test_character_image_command() {
        let mut map = session();
        let id = map.config().active_character().unwrap().id.clone();
        let cmd = parse(&format!(
            r#"{{"type":"setCharacterImage","character_id":"{}","image":"hero.png"}}"#,
            id
        ));
        assert!(cmd.is_mutating());
        assert!(matches!(dispatch(&mut map, cmd), ServerEvent::Ack { ok: true }));
        assert_eq!(
            map.config().active_character().unwrap().image_path.as_deref(),
            Some("hero.png")
        );

        let missing = ClientCommand::SetCharacterImage { character_id: "ghost".into(), image: None };
        assert!(matches!(dispatch(&mut map, missing), ServerEvent::Ack { ok: false }));
    }

    #[test]
    fn test_unknown_quest_reports_error() {
        let mut map = session();
        let event = dispatch(&mut map, ClientCommand::AddStep { quest_id: "ghost".into() });
        assert!(matches!(event, ServerEvent::Error { .. }));
    }

    #[test]
    fn test_event_serialization() {
        let event = ServerEvent::Events {
            events: vec![SessionEvent::LevelUp { character_id: "c".into(), level: 3 }],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "events");
        assert_eq!(json["events"][0]["event"], "levelUp");
        assert_eq!(json["events"][0]["characterId"], "c");
        assert_eq!(json["events"][0]["level"], 3);
    }
}
