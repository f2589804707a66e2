//! Static content database: classes, skill trees, items, monsters,
//! dungeons, achievements, and titles.
//!
//! All content is compiled in. Lookups hand out `'static` references so
//! the rules modules never copy definitions around.

use crate::skills::{PassiveEffect, SkillDef, SkillEffect, StatKind};
use crate::world::{ClassTag, EquipSlot, LootEntry, Monster, Stats};
use lazy_static::lazy_static;
use std::collections::HashMap;

// ============================================================================
// Classes
// ============================================================================

/// Class-specific data applied when a character picks a class.
pub struct ClassData {
    pub description: &'static str,
    pub base_stats: Stats,
}

impl ClassTag {
    /// Base stat block for class selection.
    pub fn data(&self) -> ClassData {
        match self {
            ClassTag::Unassigned => ClassData {
                description: "A wanderer who has not yet chosen a path.",
                base_stats: Stats::default(),
            },
            ClassTag::Warrior => ClassData {
                description: "Frontline fighter. Builds BLOCK stacks to absorb and return punishment.",
                base_stats: Stats {
                    hp: 120,
                    max_hp: 120,
                    mp: 30,
                    max_mp: 30,
                    strength: 14,
                    defense: 10,
                    magic: 6,
                    agility: 8,
                    speed: 8,
                    luck: 8,
                    resistance: 8,
                },
            },
            ClassTag::Mage => ClassData {
                description: "Glass cannon with a deep mana pool.",
                base_stats: Stats {
                    hp: 80,
                    max_hp: 80,
                    mp: 90,
                    max_mp: 90,
                    strength: 6,
                    defense: 4,
                    magic: 16,
                    agility: 9,
                    speed: 9,
                    luck: 10,
                    resistance: 10,
                },
            },
            ClassTag::Rogue => ClassData {
                description: "Strikes from stealth for ambush damage.",
                base_stats: Stats {
                    hp: 90,
                    max_hp: 90,
                    mp: 40,
                    max_mp: 40,
                    strength: 12,
                    defense: 5,
                    magic: 8,
                    agility: 15,
                    speed: 14,
                    luck: 12,
                    resistance: 6,
                },
            },
            ClassTag::Paladin => ClassData {
                description: "Armored devotee, hard to bring down.",
                base_stats: Stats {
                    hp: 110,
                    max_hp: 110,
                    mp: 50,
                    max_mp: 50,
                    strength: 12,
                    defense: 12,
                    magic: 10,
                    agility: 7,
                    speed: 7,
                    luck: 8,
                    resistance: 12,
                },
            },
            ClassTag::Archer => ClassData {
                description: "Keen-eyed skirmisher.",
                base_stats: Stats {
                    hp: 95,
                    max_hp: 95,
                    mp: 40,
                    max_mp: 40,
                    strength: 13,
                    defense: 5,
                    magic: 8,
                    agility: 13,
                    speed: 12,
                    luck: 11,
                    resistance: 6,
                },
            },
            ClassTag::Berserker => ClassData {
                description: "All offense, no regrets.",
                base_stats: Stats {
                    hp: 130,
                    max_hp: 130,
                    mp: 20,
                    max_mp: 20,
                    strength: 16,
                    defense: 6,
                    magic: 4,
                    agility: 10,
                    speed: 10,
                    luck: 7,
                    resistance: 5,
                },
            },
            ClassTag::Druid => ClassData {
                description: "Balanced caster attuned to the wilds.",
                base_stats: Stats {
                    hp: 100,
                    max_hp: 100,
                    mp: 70,
                    max_mp: 70,
                    strength: 9,
                    defense: 7,
                    magic: 13,
                    agility: 9,
                    speed: 9,
                    luck: 10,
                    resistance: 11,
                },
            },
            ClassTag::Monk => ClassData {
                description: "Disciplined striker with even growth.",
                base_stats: Stats {
                    hp: 105,
                    max_hp: 105,
                    mp: 55,
                    max_mp: 55,
                    strength: 12,
                    defense: 8,
                    magic: 9,
                    agility: 12,
                    speed: 12,
                    luck: 9,
                    resistance: 9,
                },
            },
        }
    }
}

// ============================================================================
// Skill trees
// ============================================================================

static WARRIOR_TREE: [SkillDef; 3] = [
    SkillDef {
        id: "iron_will",
        name: "Iron Will",
        description: "Raises maximum hp by 20% at battle start.",
        class: ClassTag::Warrior,
        cost: 1,
        requirements: &[],
        effect: SkillEffect::Passive(PassiveEffect::MaxHpScale { factor: 1.2 }),
    },
    SkillDef {
        id: "shield_expert",
        name: "Shield Expert",
        description: "Ready a parry against the next attack.",
        class: ClassTag::Warrior,
        cost: 1,
        requirements: &["iron_will"],
        effect: SkillEffect::Active,
    },
    SkillDef {
        id: "shield_slam",
        name: "Shield Slam",
        description: "Consume BLOCK stacks for a crushing strike.",
        class: ClassTag::Warrior,
        cost: 2,
        requirements: &["iron_will"],
        effect: SkillEffect::Active,
    },
];

static ROGUE_TREE: [SkillDef; 3] = [
    SkillDef {
        id: "ambush",
        name: "Ambush",
        description: "A sudden strike dealing double damage.",
        class: ClassTag::Rogue,
        cost: 1,
        requirements: &[],
        effect: SkillEffect::Active,
    },
    SkillDef {
        id: "poison_blade",
        name: "Poison Blade",
        description: "Coat your blade; the target bleeds poison for 3 turns.",
        class: ClassTag::Rogue,
        cost: 2,
        requirements: &["ambush"],
        effect: SkillEffect::Active,
    },
    SkillDef {
        id: "fleet_footed",
        name: "Fleet Footed",
        description: "Permanent spring in your step at battle start.",
        class: ClassTag::Rogue,
        cost: 1,
        requirements: &[],
        effect: SkillEffect::Passive(PassiveEffect::StatBonus {
            stat: StatKind::Agility,
            amount: 5,
        }),
    },
];

static MAGE_TREE: [SkillDef; 2] = [
    SkillDef {
        id: "arcane_mind",
        name: "Arcane Mind",
        description: "Raises maximum mp by 20% at battle start.",
        class: ClassTag::Mage,
        cost: 1,
        requirements: &[],
        effect: SkillEffect::Passive(PassiveEffect::MaxMpScale { factor: 1.2 }),
    },
    SkillDef {
        id: "spell_surge",
        name: "Spell Surge",
        description: "Channel raw mana into an unstable burst.",
        class: ClassTag::Mage,
        cost: 2,
        requirements: &["arcane_mind"],
        effect: SkillEffect::Active,
    },
];

/// The skill tree for a class. Classes without a tree yet get an empty
/// slice.
pub fn skill_tree(class: ClassTag) -> &'static [SkillDef] {
    match class {
        ClassTag::Warrior => &WARRIOR_TREE,
        ClassTag::Rogue => &ROGUE_TREE,
        ClassTag::Mage => &MAGE_TREE,
        _ => &[],
    }
}

// ============================================================================
// Items
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemKind {
    Consumable { hp: i32, mp: i32 },
    Material,
    Equipment { slot: EquipSlot },
    Trophy,
}

#[derive(Debug, Clone)]
pub struct ItemDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub price: u32,
    pub kind: ItemKind,
    pub rarity: Rarity,
}

static ITEMS: [ItemDef; 10] = [
    ItemDef {
        id: "potion",
        name: "Potion",
        description: "Restores 30 hp.",
        price: 15,
        kind: ItemKind::Consumable { hp: 30, mp: 0 },
        rarity: Rarity::Common,
    },
    ItemDef {
        id: "elixir",
        name: "Elixir",
        description: "Restores 30 mp.",
        price: 40,
        kind: ItemKind::Consumable { hp: 0, mp: 30 },
        rarity: Rarity::Uncommon,
    },
    ItemDef {
        id: "greater_potion",
        name: "Greater Potion",
        description: "Restores 80 hp.",
        price: 60,
        kind: ItemKind::Consumable { hp: 80, mp: 0 },
        rarity: Rarity::Uncommon,
    },
    ItemDef {
        id: "herb",
        name: "Herb",
        description: "A bitter leaf. Crafting material.",
        price: 5,
        kind: ItemKind::Material,
        rarity: Rarity::Common,
    },
    ItemDef {
        id: "magic_dust",
        name: "Magic Dust",
        description: "Glittering residue. Crafting material.",
        price: 25,
        kind: ItemKind::Material,
        rarity: Rarity::Uncommon,
    },
    ItemDef {
        id: "rare_gem",
        name: "Rare Gem",
        description: "Worth a small fortune to the right buyer.",
        price: 100,
        kind: ItemKind::Trophy,
        rarity: Rarity::Rare,
    },
    ItemDef {
        id: "ancient_scroll",
        name: "Ancient Scroll",
        description: "Unreadable, but collectors pay well.",
        price: 50,
        kind: ItemKind::Trophy,
        rarity: Rarity::Rare,
    },
    ItemDef {
        id: "iron_sword",
        name: "Iron Sword",
        description: "A dependable blade.",
        price: 120,
        kind: ItemKind::Equipment {
            slot: EquipSlot::Weapon,
        },
        rarity: Rarity::Uncommon,
    },
    ItemDef {
        id: "leather_armor",
        name: "Leather Armor",
        description: "Better than nothing.",
        price: 90,
        kind: ItemKind::Equipment {
            slot: EquipSlot::Armor,
        },
        rarity: Rarity::Common,
    },
    ItemDef {
        id: "lucky_charm",
        name: "Lucky Charm",
        description: "A rabbit's foot of dubious provenance.",
        price: 150,
        kind: ItemKind::Equipment {
            slot: EquipSlot::Accessory,
        },
        rarity: Rarity::Rare,
    },
];

lazy_static! {
    static ref ITEM_INDEX: HashMap<&'static str, &'static ItemDef> =
        ITEMS.iter().map(|item| (item.id, item)).collect();
}

pub fn get_item(id: &str) -> Option<&'static ItemDef> {
    ITEM_INDEX.get(id).copied()
}

/// Common-rarity items, the daily-reward bonus pool.
pub fn common_items() -> Vec<&'static ItemDef> {
    ITEMS.iter().filter(|i| i.rarity == Rarity::Common).collect()
}

/// Items the rotating merchant may stock.
pub static MERCHANT_POOL: [&str; 6] = [
    "potion",
    "elixir",
    "ancient_scroll",
    "rare_gem",
    "magic_dust",
    "iron_sword",
];

static GREATER_POTION_RECIPE: [(&str, u32); 2] = [("potion", 2), ("magic_dust", 1)];

lazy_static! {
    /// Crafting recipes: crafted item -> required materials.
    static ref RECIPES: HashMap<&'static str, &'static [(&'static str, u32)]> = {
        let mut m: HashMap<&'static str, &'static [(&'static str, u32)]> = HashMap::new();
        m.insert("greater_potion", &GREATER_POTION_RECIPE[..]);
        m
    };
}

pub fn recipe(item: &str) -> Option<&'static [(&'static str, u32)]> {
    RECIPES.get(item).copied()
}

// ============================================================================
// Monsters
// ============================================================================

#[derive(Debug, Clone)]
pub struct MonsterDef {
    pub id: &'static str,
    pub name: &'static str,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    pub exp_reward: u32,
    pub gold_reward: u32,
    pub loot: &'static [(&'static str, f64)],
}

impl MonsterDef {
    /// Build a fresh combat instance at full hp.
    pub fn spawn(&self) -> Monster {
        Monster {
            id: self.id.to_string(),
            name: self.name.to_string(),
            hp: self.hp,
            max_hp: self.hp,
            attack: self.attack,
            defense: self.defense,
            speed: self.speed,
            exp_reward: self.exp_reward,
            gold_reward: self.gold_reward,
            loot: self
                .loot
                .iter()
                .map(|(item, chance)| LootEntry {
                    item: item.to_string(),
                    chance: *chance,
                })
                .collect(),
        }
    }
}

static MONSTERS: [MonsterDef; 6] = [
    MonsterDef {
        id: "sewer_rat",
        name: "Sewer Rat",
        hp: 40,
        attack: 12,
        defense: 2,
        speed: 12,
        exp_reward: 25,
        gold_reward: 8,
        loot: &[("herb", 0.5)],
    },
    MonsterDef {
        id: "slime",
        name: "Slime",
        hp: 55,
        attack: 10,
        defense: 4,
        speed: 6,
        exp_reward: 30,
        gold_reward: 10,
        loot: &[("herb", 0.4), ("magic_dust", 0.1)],
    },
    MonsterDef {
        id: "sewer_king",
        name: "Sewer King",
        hp: 150,
        attack: 20,
        defense: 8,
        speed: 9,
        exp_reward: 120,
        gold_reward: 60,
        loot: &[("rare_gem", 0.5), ("ancient_scroll", 0.35)],
    },
    MonsterDef {
        id: "skeleton",
        name: "Skeleton",
        hp: 70,
        attack: 16,
        defense: 6,
        speed: 10,
        exp_reward: 45,
        gold_reward: 15,
        loot: &[("magic_dust", 0.25)],
    },
    MonsterDef {
        id: "ghoul",
        name: "Ghoul",
        hp: 85,
        attack: 18,
        defense: 7,
        speed: 8,
        exp_reward: 55,
        gold_reward: 20,
        loot: &[("magic_dust", 0.3), ("ancient_scroll", 0.1)],
    },
    MonsterDef {
        id: "bone_tyrant",
        name: "Bone Tyrant",
        hp: 220,
        attack: 26,
        defense: 10,
        speed: 10,
        exp_reward: 200,
        gold_reward: 120,
        loot: &[("rare_gem", 0.6), ("lucky_charm", 0.25)],
    },
];

pub fn get_monster(id: &str) -> Option<&'static MonsterDef> {
    MONSTERS.iter().find(|m| m.id == id)
}

// ============================================================================
// Dungeons
// ============================================================================

#[derive(Debug, Clone)]
pub struct FloorDef {
    pub min_level: u32,
    pub monsters: &'static [&'static str],
    pub boss: Option<&'static str>,
    pub rewards: &'static [&'static str],
    pub exp_reward: u32,
    pub gold_reward: u32,
}

#[derive(Debug, Clone)]
pub struct DungeonDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub floors: &'static [FloorDef],
}

static SEWERS_FLOORS: [FloorDef; 3] = [
    FloorDef {
        min_level: 1,
        monsters: &["sewer_rat", "slime"],
        boss: None,
        rewards: &["herb"],
        exp_reward: 80,
        gold_reward: 10,
    },
    FloorDef {
        min_level: 2,
        monsters: &["slime", "sewer_rat"],
        boss: None,
        rewards: &["potion"],
        exp_reward: 70,
        gold_reward: 15,
    },
    FloorDef {
        min_level: 2,
        monsters: &["slime", "skeleton"],
        boss: Some("sewer_king"),
        rewards: &["potion", "magic_dust"],
        exp_reward: 60,
        gold_reward: 30,
    },
];

static CATACOMBS_FLOORS: [FloorDef; 3] = [
    FloorDef {
        min_level: 3,
        monsters: &["skeleton"],
        boss: None,
        rewards: &["magic_dust"],
        exp_reward: 50,
        gold_reward: 20,
    },
    FloorDef {
        min_level: 4,
        monsters: &["skeleton", "ghoul"],
        boss: None,
        rewards: &["elixir", "magic_dust"],
        exp_reward: 80,
        gold_reward: 35,
    },
    FloorDef {
        min_level: 5,
        monsters: &["ghoul"],
        boss: Some("bone_tyrant"),
        rewards: &["ancient_scroll", "rare_gem"],
        exp_reward: 150,
        gold_reward: 75,
    },
];

static DUNGEONS: [DungeonDef; 2] = [
    DungeonDef {
        id: "sewers",
        name: "The Sewers",
        description: "Dank tunnels under the city. Something scurries.",
        floors: &SEWERS_FLOORS,
    },
    DungeonDef {
        id: "catacombs",
        name: "The Catacombs",
        description: "The dead here resent visitors.",
        floors: &CATACOMBS_FLOORS,
    },
];

pub fn get_dungeon(id: &str) -> Option<&'static DungeonDef> {
    DUNGEONS.iter().find(|d| d.id == id)
}

pub fn all_dungeons() -> &'static [DungeonDef] {
    &DUNGEONS
}

// ============================================================================
// Achievements & titles
// ============================================================================

#[derive(Debug, Clone)]
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone)]
pub struct TitleDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Achievement that unlocks this title, if any.
    pub requirement: Option<&'static str>,
}

static ACHIEVEMENTS: [AchievementDef; 3] = [
    AchievementDef {
        id: "dungeon_crawler",
        name: "Dungeon Crawler",
        description: "Clear every floor of a dungeon.",
    },
    AchievementDef {
        id: "first_victory",
        name: "First Victory",
        description: "Win your first duel.",
    },
    AchievementDef {
        id: "ascendant",
        name: "Ascendant",
        description: "Prestige for the first time.",
    },
];

static TITLES: [TitleDef; 3] = [
    TitleDef {
        id: "delver",
        name: "the Delver",
        description: "Earned in the deep places.",
        requirement: Some("dungeon_crawler"),
    },
    TitleDef {
        id: "duelist",
        name: "the Duelist",
        description: "Proven in single combat.",
        requirement: Some("first_victory"),
    },
    TitleDef {
        id: "reborn",
        name: "the Reborn",
        description: "Started over, stronger.",
        requirement: Some("ascendant"),
    },
];

pub fn get_achievement(id: &str) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

pub fn get_title(id: &str) -> Option<&'static TitleDef> {
    TITLES.iter().find(|t| t.id == id)
}

/// Titles unlocked by the given achievement.
pub fn titles_for_achievement(achievement_id: &str) -> Vec<&'static TitleDef> {
    TITLES
        .iter()
        .filter(|t| t.requirement == Some(achievement_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_classes_have_positive_stats() {
        for class in ClassTag::all() {
            let data = class.data();
            assert!(data.base_stats.max_hp > 0, "{class} hp");
            assert!(data.base_stats.max_mp > 0, "{class} mp");
            assert!(data.base_stats.strength > 0, "{class} strength");
            assert_eq!(data.base_stats.hp, data.base_stats.max_hp);
        }
    }

    #[test]
    fn skill_tree_references_resolve() {
        for class in ClassTag::all() {
            for skill in skill_tree(class) {
                assert_eq!(skill.class, class);
                for req in skill.requirements {
                    assert!(
                        skill_tree(class).iter().any(|s| s.id == *req),
                        "{} requires unknown {req}",
                        skill.id
                    );
                }
            }
        }
    }

    #[test]
    fn monster_loot_references_resolve() {
        for monster in &MONSTERS {
            for (item, chance) in monster.loot {
                assert!(get_item(item).is_some(), "{} drops unknown {item}", monster.id);
                assert!((0.0..=1.0).contains(chance));
            }
        }
    }

    #[test]
    fn dungeon_references_resolve() {
        for dungeon in all_dungeons() {
            assert!(!dungeon.floors.is_empty());
            for floor in dungeon.floors {
                assert!(!floor.monsters.is_empty());
                for id in floor.monsters {
                    assert!(get_monster(id).is_some(), "unknown monster {id}");
                }
                if let Some(boss) = floor.boss {
                    assert!(get_monster(boss).is_some(), "unknown boss {boss}");
                }
                for item in floor.rewards {
                    assert!(get_item(item).is_some(), "unknown reward {item}");
                }
            }
            // Floors gate progressively deeper.
            for pair in dungeon.floors.windows(2) {
                assert!(pair[0].min_level <= pair[1].min_level);
            }
        }
    }

    #[test]
    fn merchant_pool_items_exist() {
        for id in MERCHANT_POOL {
            assert!(get_item(id).is_some(), "unknown merchant item {id}");
        }
    }

    #[test]
    fn recipes_reference_real_items() {
        let materials = recipe("greater_potion").unwrap();
        assert!(get_item("greater_potion").is_some());
        for (item, qty) in materials {
            assert!(get_item(item).is_some());
            assert!(*qty > 0);
        }
        assert!(recipe("potion").is_none());
    }

    #[test]
    fn titles_cascade_from_achievements() {
        for title in &TITLES {
            if let Some(req) = title.requirement {
                assert!(get_achievement(req).is_some(), "{} needs unknown {req}", title.id);
            }
        }
        assert_eq!(titles_for_achievement("dungeon_crawler").len(), 1);
    }
}
