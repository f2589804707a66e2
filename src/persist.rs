//! Character persistence gateway.
//!
//! The engine loads a character, mutates a session-scoped copy, and
//! commits whole records back at checkpoints. `MemoryStore` backs tests
//! and single-process deployments; `JsonFileStore` keeps one pretty
//! JSON file per character. Neither format is part of the contract.

use crate::world::{Character, PlayerId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("character not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load/save contract between the engine and whatever owns the records.
#[allow(async_fn_in_trait)]
pub trait CharacterStore {
    async fn load(&self, id: &PlayerId) -> Result<Character, PersistError>;
    async fn save(&self, character: &Character) -> Result<(), PersistError>;
    async fn exists(&self, id: &PlayerId) -> bool {
        self.load(id).await.is_ok()
    }
}

/// In-memory store for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<PlayerId, Character>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CharacterStore for MemoryStore {
    async fn load(&self, id: &PlayerId) -> Result<Character, PersistError> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| PersistError::NotFound(id.to_string()))
    }

    async fn save(&self, character: &Character) -> Result<(), PersistError> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(character.id.clone(), character.clone());
        Ok(())
    }
}

/// One JSON file per character under a base directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, id: &PlayerId) -> PathBuf {
        // Player ids come from the chat platform; keep only filename-safe
        // characters.
        let safe: String = id
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl CharacterStore for JsonFileStore {
    async fn load(&self, id: &PlayerId) -> Result<Character, PersistError> {
        let path = self.path_for(id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistError::NotFound(id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, character: &Character) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir).await?;
        let content = serde_json::to_string_pretty(character)?;
        fs::write(self.path_for(&character.id), content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryStore::new();
        let id = PlayerId::from("player-1");
        assert!(matches!(
            store.load(&id).await,
            Err(PersistError::NotFound(_))
        ));

        let mut character = Character::new(id.clone(), "Hero");
        character.gold = 123;
        store.save(&character).await.unwrap();

        let loaded = store.load(&id).await.unwrap();
        assert_eq!(loaded.gold, 123);
        assert_eq!(loaded.name, "Hero");
        assert!(store.exists(&id).await);
    }

    #[tokio::test]
    async fn json_store_round_trips() {
        let dir = std::env::temp_dir().join(format!("rpg-core-store-{}", uuid::Uuid::new_v4()));
        let store = JsonFileStore::new(&dir);
        let id = PlayerId::from("file-player");
        assert!(matches!(
            store.load(&id).await,
            Err(PersistError::NotFound(_))
        ));

        let mut character = Character::new(id.clone(), "Saved");
        character.level = 7;
        store.save(&character).await.unwrap();
        let loaded = store.load(&id).await.unwrap();
        assert_eq!(loaded.level, 7);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn character_record_survives_serde() {
        let mut character = Character::new(PlayerId::from("p"), "Hero");
        character.skills.insert("iron_will".to_string(), true);
        character.add_item("potion", 3);
        character.achievements.insert("first_victory".to_string());
        character
            .progress_for("sewers")
            .completed_floors
            .insert(1);

        let json = serde_json::to_string(&character).unwrap();
        let back: Character = serde_json::from_str(&json).unwrap();
        assert_eq!(back.item_count("potion"), 3);
        assert!(back.is_unlocked("iron_will"));
        assert!(back.achievements.contains("first_victory"));
        assert!(back.dungeon_progress["sewers"].completed_floors.contains(&1));
    }
}
