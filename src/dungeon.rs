//! Dungeon exploration: floor gating, encounter generation, the PvE
//! combat loop, and reward resolution.
//!
//! Dungeon combat uses the attack-minus-defense damage formula, unlike
//! duels. Defeat is a soft fail: a small gold toll and hp set to 1.

use crate::combat::DamageStrategy;
use crate::content;
use crate::economy::LootLog;
use crate::error::EngineError;
use crate::skills::{self, ProgressionReport};
use crate::status;
use crate::world::{AchievementId, Character, ItemId, MonsterId, TitleId};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

/// Probability that a floor's boss replaces the rolled monster.
pub const BOSS_CHANCE: f64 = 0.10;

/// Gold forfeited on defeat, capped by what the player carries.
pub const DEFEAT_GOLD_TOLL: u32 = 10;

const REST_HP: i32 = 50;
const REST_MP: i32 = 30;

/// The result of one dungeon run (one floor attempt).
#[derive(Debug, Clone, PartialEq)]
pub struct DungeonOutcome {
    pub dungeon: String,
    pub floor: u32,
    pub monster: MonsterId,
    pub was_boss: bool,
    pub victory: bool,
    pub rounds: u32,
    pub exp_gained: u32,
    pub gold_gained: u32,
    pub gold_lost: u32,
    pub loot: Vec<ItemId>,
    pub progression: Option<ProgressionReport>,
    pub dungeon_cleared: bool,
    pub new_achievements: Vec<AchievementId>,
    pub new_titles: Vec<TitleId>,
    pub hp_remaining: i32,
}

/// Attempt the player's current floor of a dungeon.
///
/// Preconditions: the floor's level gate and hp > 0. The encounter is a
/// uniform pick from the floor's pool, with a 10% boss substitution
/// when the floor has one. Victory pays floor and monster rewards
/// through the leveling path and never leaves the player below 1 hp;
/// defeat costs at most `DEFEAT_GOLD_TOLL` gold and sets hp to 1.
pub fn enter_dungeon(
    character: &mut Character,
    dungeon_id: &str,
    rng: &mut impl Rng,
    loot_log: &mut LootLog,
) -> Result<DungeonOutcome, EngineError> {
    let dungeon = content::get_dungeon(dungeon_id)
        .ok_or_else(|| EngineError::InvalidTarget(dungeon_id.to_string()))?;

    let floor_no = character.progress_for(dungeon_id).current_floor;
    if floor_no as usize > dungeon.floors.len() {
        return Err(EngineError::PreconditionFailed(
            "dungeon already cleared".to_string(),
        ));
    }
    let floor = &dungeon.floors[(floor_no - 1) as usize];
    if character.level < floor.min_level {
        return Err(EngineError::PreconditionFailed(format!(
            "level {} required for floor {floor_no}",
            floor.min_level
        )));
    }
    if !character.is_alive() {
        return Err(EngineError::PreconditionFailed(
            "cannot enter a dungeon at 0 hp".to_string(),
        ));
    }

    let pick = floor
        .monsters
        .choose(rng)
        .copied()
        .ok_or_else(|| EngineError::InvalidTarget(format!("{dungeon_id} floor {floor_no}")))?;
    let (monster_id, was_boss) = match floor.boss {
        Some(boss) if rng.gen_bool(BOSS_CHANCE) => (boss, true),
        _ => (pick, false),
    };
    let mut monster = content::get_monster(monster_id)
        .ok_or_else(|| EngineError::InvalidTarget(monster_id.to_string()))?
        .spawn();

    skills::begin_battle_session(character);
    skills::apply_passive_skills(character, content::skill_tree(character.class));

    let mut rounds = 0;
    let victory = loop {
        rounds += 1;

        // The explorer strikes first.
        let (ambush, multiplier) = status::check_and_consume_ambush(character);
        let mut damage =
            DamageStrategy::AttackDefense.base_damage(character.stats.strength, monster.defense);
        if ambush {
            damage = (damage as f64 * multiplier) as i32;
        }
        if monster.take_damage(damage) {
            break true;
        }

        let raw = DamageStrategy::AttackDefense.base_damage(monster.attack, character.stats.defense);
        let (hit, _) = status::consume_block_reduction(raw, character);
        if character.take_damage(hit) {
            break false;
        }

        let upkeep = status::end_of_round_effects(character, rng);
        if upkeep.died {
            break false;
        }
    };

    skills::end_battle_session(character);
    info!(
        player = %character.id,
        dungeon = dungeon_id,
        floor = floor_no,
        monster = monster_id,
        was_boss,
        victory,
        rounds,
        "dungeon encounter finished"
    );

    if !victory {
        let gold_lost = character.gold.min(DEFEAT_GOLD_TOLL);
        character.gold -= gold_lost;
        character.stats.hp = 1;
        return Ok(DungeonOutcome {
            dungeon: dungeon_id.to_string(),
            floor: floor_no,
            monster: monster_id.to_string(),
            was_boss,
            victory: false,
            rounds,
            exp_gained: 0,
            gold_gained: 0,
            gold_lost,
            loot: Vec::new(),
            progression: None,
            dungeon_cleared: false,
            new_achievements: Vec::new(),
            new_titles: Vec::new(),
            hp_remaining: character.stats.hp,
        });
    }

    // Rewards run after the battle session closes so level growth is
    // not rolled back with the session snapshot.
    let exp = floor.exp_reward + monster.exp_reward;
    let gold = floor.gold_reward + monster.gold_reward;
    let progression = skills::grant_exp_and_gold(character, exp, gold);

    let mut loot = Vec::new();
    for entry in &monster.loot {
        if rng.gen_bool(entry.chance) {
            character.add_item(entry.item.clone(), 1);
            loot_log.record(character.id.clone(), entry.item.clone());
            loot.push(entry.item.clone());
        }
    }
    if let Some(&reward) = floor.rewards.choose(rng) {
        character.add_item(reward, 1);
        loot_log.record(character.id.clone(), reward.to_string());
        loot.push(reward.to_string());
    }

    let progress = character.progress_for(dungeon_id);
    progress.completed_floors.insert(floor_no);
    progress.current_floor = floor_no + 1;
    let dungeon_cleared = progress.current_floor as usize > dungeon.floors.len();

    // Victory never kills the player as a side effect.
    if character.stats.hp < 1 {
        character.stats.hp = 1;
    }

    let mut new_achievements = Vec::new();
    let mut new_titles = Vec::new();
    if dungeon_cleared {
        let award = skills::award_achievement(character, "dungeon_crawler");
        new_achievements.extend(award.new_achievement);
        new_titles.extend(award.new_titles);
    }

    Ok(DungeonOutcome {
        dungeon: dungeon_id.to_string(),
        floor: floor_no,
        monster: monster_id.to_string(),
        was_boss,
        victory: true,
        rounds,
        exp_gained: exp,
        gold_gained: gold,
        gold_lost: 0,
        loot,
        progression: Some(progression),
        dungeon_cleared,
        new_achievements,
        new_titles,
        hp_remaining: character.stats.hp,
    })
}

/// What a rest restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestOutcome {
    pub hp_restored: i32,
    pub mp_restored: i32,
}

/// Recover up to 50 hp and 30 mp. Always available; any cooldown is an
/// external scheduling concern.
pub fn rest(character: &mut Character) -> RestOutcome {
    RestOutcome {
        hp_restored: character.heal(REST_HP),
        mp_restored: character.restore_mp(REST_MP),
    }
}
