//! Combat and progression engine for a chat-command RPG.
//!
//! This crate provides:
//! - Turn-based combat resolution with status effects and two damage
//!   formulas (duels and dungeons)
//! - Class skill trees with passive and active skills
//! - Leveling, prestige, achievements, and titles
//! - Dungeon floor progression with encounter generation and rewards
//! - Inventory and economy rules (merchant rotation, crafting, daily
//!   rewards)
//! - A persistence gateway for character records
//!
//! The chat platform is an external collaborator: it parses commands,
//! resolves actor/target ids, calls engine entry points, and renders
//! the structured result events. The engine never produces user-facing
//! text beyond short machine-checkable message payloads.
//!
//! # Quick Start
//!
//! ```ignore
//! use rpg_core::persist::MemoryStore;
//! use rpg_core::session;
//! use rpg_core::world::{ClassTag, PlayerId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new();
//!     let id = PlayerId::from("user-1");
//!
//!     session::register(&store, id.clone(), "Thorn").await?;
//!     session::choose_class(&store, &id, ClassTag::Warrior).await?;
//!
//!     let mut rng = rand::thread_rng();
//!     let mut loot_log = rpg_core::economy::LootLog::default();
//!     let outcome = session::run_dungeon(&store, &id, "sewers", &mut rng, &mut loot_log).await?;
//!     println!("victory: {}", outcome.victory);
//!     Ok(())
//! }
//! ```

pub mod combat;
pub mod content;
pub mod dungeon;
pub mod economy;
pub mod error;
pub mod persist;
pub mod session;
pub mod skills;
pub mod status;
pub mod world;

// Primary public API
pub use combat::{Battle, BattleResult, DamageStrategy, Side, TurnAction, TurnOutcome};
pub use dungeon::DungeonOutcome;
pub use economy::{LootLog, RotationSeed};
pub use error::EngineError;
pub use persist::{CharacterStore, JsonFileStore, MemoryStore, PersistError};
pub use session::{DuelConfig, DuelInputs, DuelReport, SessionError};
pub use skills::{ProgressionReport, UnlockError};
pub use world::{Character, ClassTag, Monster, PlayerId, StatusEffect, StatusKind};
