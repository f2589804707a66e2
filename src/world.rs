//! Core entity types for the RPG engine.
//!
//! Contains the records the engine mutates: characters, monsters,
//! status effects, inventory, equipment, and dungeon progress. These
//! types carry no behavior beyond invariant-preserving mutators; the
//! rules that drive them live in `status`, `combat`, `skills`,
//! `dungeon`, and `economy`.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Opaque player identifier handed in by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for one battle, scoping battle-local state such as
/// applied passives and status effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleSessionId(pub Uuid);

impl BattleSessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BattleSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BattleSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content identifiers are plain strings looked up in the content database.
pub type ItemId = String;
pub type SkillId = String;
pub type MonsterId = String;
pub type DungeonId = String;
pub type AchievementId = String;
pub type TitleId = String;

// ============================================================================
// Classes
// ============================================================================

/// Character classes. New characters start `Unassigned` and pick a class
/// exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ClassTag {
    #[default]
    Unassigned,
    Warrior,
    Mage,
    Rogue,
    Paladin,
    Archer,
    Berserker,
    Druid,
    Monk,
}

impl ClassTag {
    pub fn name(&self) -> &'static str {
        match self {
            ClassTag::Unassigned => "Unassigned",
            ClassTag::Warrior => "Warrior",
            ClassTag::Mage => "Mage",
            ClassTag::Rogue => "Rogue",
            ClassTag::Paladin => "Paladin",
            ClassTag::Archer => "Archer",
            ClassTag::Berserker => "Berserker",
            ClassTag::Druid => "Druid",
            ClassTag::Monk => "Monk",
        }
    }

    /// All selectable classes (excludes `Unassigned`).
    pub fn all() -> [ClassTag; 8] {
        [
            ClassTag::Warrior,
            ClassTag::Mage,
            ClassTag::Rogue,
            ClassTag::Paladin,
            ClassTag::Archer,
            ClassTag::Berserker,
            ClassTag::Druid,
            ClassTag::Monk,
        ]
    }
}

impl fmt::Display for ClassTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Base combat stats. `hp`/`mp` are kept within `[0, max]` by the
/// mutators on `Character`; write through those rather than the fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub hp: i32,
    pub max_hp: i32,
    pub mp: i32,
    pub max_mp: i32,
    pub strength: i32,
    pub defense: i32,
    pub magic: i32,
    pub agility: i32,
    pub speed: i32,
    pub luck: i32,
    pub resistance: i32,
}

impl Default for Stats {
    fn default() -> Self {
        // Novice baseline, before any class is chosen.
        Self {
            hp: 100,
            max_hp: 100,
            mp: 50,
            max_mp: 50,
            strength: 10,
            defense: 5,
            magic: 10,
            agility: 10,
            speed: 10,
            luck: 10,
            resistance: 5,
        }
    }
}

/// Derived combat stats, expressed in whole percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    pub crit_rate: u32,
    /// Critical damage multiplier in percent (150 = 1.5x).
    pub crit_dmg: u32,
    pub accuracy: u32,
    pub dodge: u32,
    pub block: u32,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            crit_rate: 5,
            crit_dmg: 150,
            accuracy: 90,
            dodge: 5,
            block: 10,
        }
    }
}

// ============================================================================
// Status Effects
// ============================================================================

/// Discriminant for status effect kinds. At most one effect of each kind
/// exists on a character at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Stealth,
    BlockStack,
    Poison,
    Parry,
}

impl StatusKind {
    pub fn name(&self) -> &'static str {
        match self {
            StatusKind::Stealth => "STEALTH",
            StatusKind::BlockStack => "BLOCK_STACK",
            StatusKind::Poison => "POISON",
            StatusKind::Parry => "PARRY",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A status effect with its kind-specific payload.
///
/// Only `BlockStack` stacks (capped at 3); the others are single-instance
/// and replaced on reapplication. Effects never outlive the battle they
/// were applied in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatusEffect {
    Stealth {
        /// Remaining turns.
        duration: u32,
        /// Dodge chance while hidden, percent.
        dodge: u32,
        /// Accuracy penalty applied to enemies, percent.
        enemy_accuracy_reduction: u32,
        invisible: bool,
    },
    BlockStack {
        stacks: u8,
        /// Damage reduction in percent (50 per stack).
        damage_reduction: u32,
        /// Counterattack chance in percent (20 per stack).
        counter_chance: u32,
    },
    Poison {
        duration: u32,
        damage_per_turn: i32,
    },
    Parry {
        duration: u32,
    },
}

impl StatusEffect {
    pub fn kind(&self) -> StatusKind {
        match self {
            StatusEffect::Stealth { .. } => StatusKind::Stealth,
            StatusEffect::BlockStack { .. } => StatusKind::BlockStack,
            StatusEffect::Poison { .. } => StatusKind::Poison,
            StatusEffect::Parry { .. } => StatusKind::Parry,
        }
    }
}

// ============================================================================
// Inventory & Equipment
// ============================================================================

/// Equipment slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipSlot {
    Weapon,
    Armor,
    Accessory,
}

impl EquipSlot {
    pub fn name(&self) -> &'static str {
        match self {
            EquipSlot::Weapon => "weapon",
            EquipSlot::Armor => "armor",
            EquipSlot::Accessory => "accessory",
        }
    }
}

/// Equipped item per slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub weapon: Option<ItemId>,
    pub armor: Option<ItemId>,
    pub accessory: Option<ItemId>,
}

impl Equipment {
    pub fn get(&self, slot: EquipSlot) -> Option<&ItemId> {
        match slot {
            EquipSlot::Weapon => self.weapon.as_ref(),
            EquipSlot::Armor => self.armor.as_ref(),
            EquipSlot::Accessory => self.accessory.as_ref(),
        }
    }

    pub fn set(&mut self, slot: EquipSlot, item: Option<ItemId>) {
        match slot {
            EquipSlot::Weapon => self.weapon = item,
            EquipSlot::Armor => self.armor = item,
            EquipSlot::Accessory => self.accessory = item,
        }
    }
}

// ============================================================================
// Dungeon Progress
// ============================================================================

/// Per-dungeon floor progress. `current_floor` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorProgress {
    pub current_floor: u32,
    pub completed_floors: HashSet<u32>,
}

impl Default for FloorProgress {
    fn default() -> Self {
        Self {
            current_floor: 1,
            completed_floors: HashSet::new(),
        }
    }
}

// ============================================================================
// Character
// ============================================================================

/// A player character record. Created on registration, mutated by every
/// combat, dungeon, skill, and economy transition, and persisted through
/// the `CharacterStore` gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: PlayerId,
    pub name: String,
    pub class: ClassTag,

    // Core progression
    pub level: u32,
    pub exp: u32,
    pub exp_to_next: u32,
    pub gold: u32,
    pub skill_points: u32,
    pub prestige: u32,

    // Combat
    pub stats: Stats,
    pub combat_stats: CombatStats,
    pub status_effects: Vec<StatusEffect>,

    // Skills
    pub skills: HashMap<SkillId, bool>,

    // Possessions
    pub inventory: HashMap<ItemId, u32>,
    pub equipment: Equipment,

    // Meta progression
    pub achievements: HashSet<AchievementId>,
    pub titles: HashSet<TitleId>,
    pub active_title: Option<TitleId>,
    pub dungeon_progress: HashMap<DungeonId, FloorProgress>,

    // Economy bookkeeping
    pub last_daily_unix: Option<u64>,
    pub daily_streak: u32,

    // Battle-scoped state. `battle_snapshot` holds the pre-battle stats so
    // passive modifiers can be rolled back when the session ends.
    #[serde(default)]
    pub battle_session: Option<BattleSessionId>,
    #[serde(default)]
    pub passives_applied: HashSet<SkillId>,
    #[serde(default)]
    pub battle_snapshot: Option<Stats>,
}

impl Character {
    /// Create a fresh character with novice base stats.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            class: ClassTag::Unassigned,
            level: 1,
            exp: 0,
            exp_to_next: 100,
            gold: 50,
            skill_points: 3,
            prestige: 0,
            stats: Stats::default(),
            combat_stats: CombatStats::default(),
            status_effects: Vec::new(),
            skills: HashMap::new(),
            inventory: HashMap::new(),
            equipment: Equipment::default(),
            achievements: HashSet::new(),
            titles: HashSet::new(),
            active_title: None,
            dungeon_progress: HashMap::new(),
            last_daily_unix: None,
            daily_streak: 0,
            battle_session: None,
            passives_applied: HashSet::new(),
            battle_snapshot: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.stats.hp > 0
    }

    /// Subtract damage from hp, flooring at 0. Returns true if the
    /// character dropped to 0.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.stats.hp = (self.stats.hp - amount.max(0)).max(0);
        self.stats.hp == 0
    }

    /// Restore hp up to `max_hp`; returns the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.stats.hp;
        self.stats.hp = (self.stats.hp + amount.max(0)).min(self.stats.max_hp);
        self.stats.hp - before
    }

    /// Restore mp up to `max_mp`; returns the amount actually restored.
    pub fn restore_mp(&mut self, amount: i32) -> i32 {
        let before = self.stats.mp;
        self.stats.mp = (self.stats.mp + amount.max(0)).min(self.stats.max_mp);
        self.stats.mp - before
    }

    /// Spend gold; returns false (and leaves the balance untouched) when
    /// there is not enough.
    pub fn spend_gold(&mut self, amount: u32) -> bool {
        if self.gold < amount {
            return false;
        }
        self.gold -= amount;
        true
    }

    pub fn add_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }

    // ---- status effect access -------------------------------------------

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.status_effects.iter().any(|e| e.kind() == kind)
    }

    pub fn find_status(&self, kind: StatusKind) -> Option<&StatusEffect> {
        self.status_effects.iter().find(|e| e.kind() == kind)
    }

    /// Remove the effect of the given kind, returning it if present.
    pub fn remove_status(&mut self, kind: StatusKind) -> Option<StatusEffect> {
        let idx = self.status_effects.iter().position(|e| e.kind() == kind)?;
        Some(self.status_effects.remove(idx))
    }

    /// Insert an effect, replacing any existing effect of the same kind.
    pub fn set_status(&mut self, effect: StatusEffect) {
        self.remove_status(effect.kind());
        self.status_effects.push(effect);
    }

    // ---- inventory access ------------------------------------------------

    pub fn item_count(&self, item: &str) -> u32 {
        self.inventory.get(item).copied().unwrap_or(0)
    }

    pub fn add_item(&mut self, item: impl Into<ItemId>, quantity: u32) {
        if quantity == 0 {
            return;
        }
        *self.inventory.entry(item.into()).or_insert(0) += quantity;
    }

    /// Remove items, dropping the entry when the quantity reaches zero.
    /// Returns false (and changes nothing) when there are not enough.
    pub fn remove_item(&mut self, item: &str, quantity: u32) -> bool {
        let Some(have) = self.inventory.get_mut(item) else {
            return false;
        };
        if *have < quantity {
            return false;
        }
        *have -= quantity;
        if *have == 0 {
            self.inventory.remove(item);
        }
        true
    }

    pub fn is_unlocked(&self, skill: &str) -> bool {
        self.skills.get(skill).copied().unwrap_or(false)
    }

    pub fn progress_for(&mut self, dungeon: &str) -> &mut FloorProgress {
        self.dungeon_progress
            .entry(dungeon.to_string())
            .or_default()
    }
}

// ============================================================================
// Monster
// ============================================================================

/// One entry in a monster's loot table, rolled independently on victory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    pub item: ItemId,
    /// Drop probability in [0, 1].
    pub chance: f64,
}

/// A monster instance fought inside a dungeon floor. Built from the
/// content database; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monster {
    pub id: MonsterId,
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    pub exp_reward: u32,
    pub gold_reward: u32,
    pub loot: Vec<LootEntry>,
}

impl Monster {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Subtract damage, flooring at 0. Returns true on death.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.hp = (self.hp - amount.max(0)).max(0);
        self.hp == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Character {
        Character::new(PlayerId::from("p1"), "Tester")
    }

    #[test]
    fn damage_floors_at_zero() {
        let mut c = sample();
        assert!(!c.take_damage(40));
        assert_eq!(c.stats.hp, 60);
        assert!(c.take_damage(1000));
        assert_eq!(c.stats.hp, 0);
        assert!(!c.is_alive());
    }

    #[test]
    fn heal_clamps_to_max() {
        let mut c = sample();
        c.stats.hp = 90;
        assert_eq!(c.heal(50), 10);
        assert_eq!(c.stats.hp, c.stats.max_hp);
    }

    #[test]
    fn inventory_drops_empty_entries() {
        let mut c = sample();
        c.add_item("potion", 2);
        assert!(c.remove_item("potion", 1));
        assert_eq!(c.item_count("potion"), 1);
        assert!(c.remove_item("potion", 1));
        assert!(!c.inventory.contains_key("potion"));
        assert!(!c.remove_item("potion", 1));
    }

    #[test]
    fn set_status_replaces_same_kind() {
        let mut c = sample();
        c.set_status(StatusEffect::Parry { duration: 1 });
        c.set_status(StatusEffect::Parry { duration: 1 });
        assert_eq!(
            c.status_effects
                .iter()
                .filter(|e| e.kind() == StatusKind::Parry)
                .count(),
            1
        );
    }

    #[test]
    fn spend_gold_refuses_overdraft() {
        let mut c = sample();
        assert!(!c.spend_gold(51));
        assert_eq!(c.gold, 50);
        assert!(c.spend_gold(50));
        assert_eq!(c.gold, 0);
    }
}
