//! Core of the quest map companion: a character that levels up as the user
//! completes ordered quest steps laid out on a 2D map.

pub mod achievement;
pub mod camera;
pub mod character;
pub mod config;
pub mod geometry;
pub mod layout;
pub mod progression;
pub mod protocol;
pub mod quest;
pub mod session;
pub mod storage;

pub use achievement::AchievementBook;
pub use character::Character;
pub use config::{AppSettings, GlobalConfig};
pub use geometry::MapPosition;
pub use quest::{Quest, QuestStep, QuestTag};
pub use session::{QuestMap, SharedQuestMap};
pub use storage::{JsonStore, Storage, StorageError};
