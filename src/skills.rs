//! Skill trees, passive application, leveling, and meta progression.
//!
//! Unlock checks run in a fixed, observable order: already-unlocked,
//! then prerequisites in requirement order, then cost. Passive skills
//! are applied once per battle session; the session snapshot taken at
//! battle start is restored at battle end so repeated battles never
//! compound passive stat growth.

use crate::content;
use crate::error::EngineError;
use crate::world::{
    AchievementId, BattleSessionId, Character, ClassTag, SkillId, Stats, TitleId,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Failures from `can_unlock_skill`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnlockError {
    #[error("skill already unlocked")]
    AlreadyUnlocked,
    #[error("not enough skill points: need {cost}, have {available}")]
    InsufficientPoints { cost: u32, available: u32 },
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),
    #[error("unknown skill: {0}")]
    UnknownSkill(String),
}

/// A stat targeted by a passive bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatKind {
    Strength,
    Defense,
    Magic,
    Agility,
    Speed,
    Luck,
    Resistance,
}

/// Battle-start stat modifier carried by a passive skill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PassiveEffect {
    /// Scale max hp and top hp up to the new maximum.
    MaxHpScale { factor: f64 },
    /// Scale max mp and top mp up to the new maximum.
    MaxMpScale { factor: f64 },
    /// Flat bonus to one base stat.
    StatBonus { stat: StatKind, amount: i32 },
}

/// Whether a skill is a battle-start passive or a selectable combat
/// action. Active behavior is dispatched by skill id in `combat`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SkillEffect {
    Passive(PassiveEffect),
    Active,
}

/// A node in a class skill tree.
#[derive(Debug, Clone)]
pub struct SkillDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub class: ClassTag,
    pub cost: u32,
    /// Prerequisites checked in this order.
    pub requirements: &'static [&'static str],
    pub effect: SkillEffect,
}

fn find_skill<'a>(tree: &'a [SkillDef], skill_id: &str) -> Option<&'a SkillDef> {
    tree.iter().find(|s| s.id == skill_id)
}

/// Check whether `skill_id` can be unlocked. Prerequisites are checked
/// before cost, so a character failing both is told about the missing
/// prerequisite first.
pub fn can_unlock_skill(
    character: &Character,
    skill_id: &str,
    tree: &[SkillDef],
) -> Result<(), UnlockError> {
    let skill =
        find_skill(tree, skill_id).ok_or_else(|| UnlockError::UnknownSkill(skill_id.to_string()))?;
    if character.is_unlocked(skill_id) {
        return Err(UnlockError::AlreadyUnlocked);
    }
    for req in skill.requirements {
        if !character.is_unlocked(req) {
            return Err(UnlockError::MissingPrerequisite(req.to_string()));
        }
    }
    if character.skill_points < skill.cost {
        return Err(UnlockError::InsufficientPoints {
            cost: skill.cost,
            available: character.skill_points,
        });
    }
    Ok(())
}

/// Unlock a skill and pay its cost. Caller contract: only call after
/// `can_unlock_skill` succeeds; there is no internal re-check.
pub fn unlock_skill<'a>(
    character: &mut Character,
    skill_id: &str,
    tree: &'a [SkillDef],
) -> &'a SkillDef {
    let skill = find_skill(tree, skill_id).expect("unlock_skill called with unchecked skill id");
    character.skills.insert(skill_id.to_string(), true);
    character.skill_points = character.skill_points.saturating_sub(skill.cost);
    info!(player = %character.id, skill = skill_id, "skill unlocked");
    skill
}

/// Unlocked skills usable as combat actions (passive-only skills
/// excluded).
pub fn get_active_skills(character: &Character, tree: &[SkillDef]) -> Vec<SkillId> {
    tree.iter()
        .filter(|s| character.is_unlocked(s.id))
        .filter(|s| matches!(s.effect, SkillEffect::Active))
        .map(|s| s.id.to_string())
        .collect()
}

// ============================================================================
// Battle sessions & passive application
// ============================================================================

/// Open a battle session: snapshot the pre-battle stats and reset the
/// applied-passives markers. Returns the new session id.
pub fn begin_battle_session(character: &mut Character) -> BattleSessionId {
    let session = BattleSessionId::new();
    character.battle_session = Some(session);
    character.passives_applied.clear();
    character.battle_snapshot = Some(character.stats.clone());
    session
}

/// Apply unlocked passive skills for the current battle session.
/// Idempotent: each passive is applied at most once per session, so
/// repeated calls (re-entries, retries) never compound stat growth.
pub fn apply_passive_skills(character: &mut Character, tree: &[SkillDef]) {
    for skill in tree {
        let SkillEffect::Passive(effect) = skill.effect else {
            continue;
        };
        if !character.is_unlocked(skill.id) || character.passives_applied.contains(skill.id) {
            continue;
        }
        apply_passive(character, effect);
        character.passives_applied.insert(skill.id.to_string());
        debug!(player = %character.id, skill = skill.id, "passive applied");
    }
}

fn apply_passive(character: &mut Character, effect: PassiveEffect) {
    match effect {
        PassiveEffect::MaxHpScale { factor } => {
            character.stats.max_hp = (character.stats.max_hp as f64 * factor) as i32;
            character.stats.hp = character.stats.max_hp;
        }
        PassiveEffect::MaxMpScale { factor } => {
            character.stats.max_mp = (character.stats.max_mp as f64 * factor) as i32;
            character.stats.mp = character.stats.max_mp;
        }
        PassiveEffect::StatBonus { stat, amount } => {
            let target = match stat {
                StatKind::Strength => &mut character.stats.strength,
                StatKind::Defense => &mut character.stats.defense,
                StatKind::Magic => &mut character.stats.magic,
                StatKind::Agility => &mut character.stats.agility,
                StatKind::Speed => &mut character.stats.speed,
                StatKind::Luck => &mut character.stats.luck,
                StatKind::Resistance => &mut character.stats.resistance,
            };
            *target += amount;
        }
    }
}

/// Close the battle session: restore base and maximum stats from the
/// pre-battle snapshot (current hp/mp carry over, clamped), drop all
/// status effects, and clear the session markers.
pub fn end_battle_session(character: &mut Character) {
    if let Some(snapshot) = character.battle_snapshot.take() {
        let hp = character.stats.hp.min(snapshot.max_hp);
        let mp = character.stats.mp.min(snapshot.max_mp);
        character.stats = Stats { hp, mp, ..snapshot };
    }
    crate::status::clear_all(character);
    character.battle_session = None;
    character.passives_applied.clear();
}

// ============================================================================
// Leveling & prestige
// ============================================================================

/// Experience threshold growth per level: x1.2, rounded down.
fn next_threshold(current: u32) -> u32 {
    current * 6 / 5
}

/// Starting threshold, also restored by prestige.
pub const BASE_EXP_TO_NEXT: u32 = 100;

/// Stat growth granted on each level.
const LEVEL_HP_GROWTH: i32 = 10;
const LEVEL_MP_GROWTH: i32 = 5;

/// The result of an exp/gold grant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressionReport {
    pub exp_gained: u32,
    pub gold_gained: u32,
    pub levels_gained: u32,
    pub new_level: u32,
    pub skill_points_gained: u32,
}

/// Grant experience and gold, processing any number of level-ups in one
/// call. Each level raises max hp/mp and grants a skill point.
pub fn grant_exp_and_gold(character: &mut Character, exp: u32, gold: u32) -> ProgressionReport {
    character.exp += exp;
    character.add_gold(gold);

    let mut levels = 0;
    while character.exp >= character.exp_to_next {
        character.exp -= character.exp_to_next;
        character.exp_to_next = next_threshold(character.exp_to_next);
        character.level += 1;
        character.skill_points += 1;
        character.stats.max_hp += LEVEL_HP_GROWTH;
        character.stats.max_mp += LEVEL_MP_GROWTH;
        levels += 1;
    }
    if levels > 0 {
        info!(player = %character.id, level = character.level, "level up");
    }
    ProgressionReport {
        exp_gained: exp,
        gold_gained: gold,
        levels_gained: levels,
        new_level: character.level,
        skill_points_gained: levels,
    }
}

/// Level required before a character may prestige.
pub const PRESTIGE_LEVEL: u32 = 50;

/// Reset level and experience for a permanent prestige counter.
/// Returns the new prestige count.
pub fn prestige(character: &mut Character) -> Result<u32, EngineError> {
    if character.level < PRESTIGE_LEVEL {
        return Err(EngineError::PreconditionFailed(format!(
            "level {PRESTIGE_LEVEL} required to prestige"
        )));
    }
    character.level = 1;
    character.exp = 0;
    character.exp_to_next = BASE_EXP_TO_NEXT;
    character.prestige += 1;
    award_achievement(character, "ascendant");
    info!(player = %character.id, prestige = character.prestige, "prestiged");
    Ok(character.prestige)
}

// ============================================================================
// Achievements & titles
// ============================================================================

/// Awards produced by `award_achievement`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AwardReport {
    pub new_achievement: Option<AchievementId>,
    pub new_titles: Vec<TitleId>,
}

/// Grant an achievement if not already held, cascading any titles whose
/// requirement it satisfies. Idempotent.
pub fn award_achievement(character: &mut Character, achievement_id: &str) -> AwardReport {
    let mut report = AwardReport::default();
    if !character.achievements.insert(achievement_id.to_string()) {
        return report;
    }
    report.new_achievement = Some(achievement_id.to_string());
    for title in content::titles_for_achievement(achievement_id) {
        if character.titles.insert(title.id.to_string()) {
            report.new_titles.push(title.id.to_string());
        }
    }
    report
}

/// Equip a title the character owns.
pub fn set_active_title(character: &mut Character, title_id: &str) -> Result<(), EngineError> {
    if !character.titles.contains(title_id) {
        return Err(EngineError::PreconditionFailed(format!(
            "title not unlocked: {title_id}"
        )));
    }
    character.active_title = Some(title_id.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::PlayerId;

    fn warrior() -> Character {
        let mut c = Character::new(PlayerId::from("w"), "Wally");
        c.class = ClassTag::Warrior;
        c
    }

    fn tree() -> &'static [SkillDef] {
        content::skill_tree(ClassTag::Warrior)
    }

    #[test]
    fn prerequisite_reported_before_cost() {
        let mut c = warrior();
        c.skill_points = 0;
        // shield_slam requires iron_will; with neither points nor the
        // prerequisite, the prerequisite failure wins.
        let err = can_unlock_skill(&c, "shield_slam", tree()).unwrap_err();
        assert_eq!(err, UnlockError::MissingPrerequisite("iron_will".to_string()));
    }

    #[test]
    fn cost_checked_after_prerequisites() {
        let mut c = warrior();
        c.skills.insert("iron_will".to_string(), true);
        c.skill_points = 0;
        let err = can_unlock_skill(&c, "shield_slam", tree()).unwrap_err();
        assert!(matches!(err, UnlockError::InsufficientPoints { .. }));
    }

    #[test]
    fn unlock_spends_points() {
        let mut c = warrior();
        assert!(can_unlock_skill(&c, "iron_will", tree()).is_ok());
        let skill = unlock_skill(&mut c, "iron_will", tree());
        assert_eq!(skill.id, "iron_will");
        assert!(c.is_unlocked("iron_will"));
        assert_eq!(c.skill_points, 2);
        assert_eq!(
            can_unlock_skill(&c, "iron_will", tree()),
            Err(UnlockError::AlreadyUnlocked)
        );
    }

    #[test]
    fn passives_do_not_compound_within_a_session() {
        let mut c = warrior();
        unlock_skill(&mut c, "iron_will", tree());
        let base_max = c.stats.max_hp;
        begin_battle_session(&mut c);
        apply_passive_skills(&mut c, tree());
        let buffed = c.stats.max_hp;
        assert_eq!(buffed, (base_max as f64 * 1.2) as i32);
        // Re-applying within the same session changes nothing.
        apply_passive_skills(&mut c, tree());
        assert_eq!(c.stats.max_hp, buffed);
    }

    #[test]
    fn passives_do_not_compound_across_sessions() {
        let mut c = warrior();
        unlock_skill(&mut c, "iron_will", tree());
        let base_max = c.stats.max_hp;
        for _ in 0..3 {
            begin_battle_session(&mut c);
            apply_passive_skills(&mut c, tree());
            end_battle_session(&mut c);
        }
        assert_eq!(c.stats.max_hp, base_max);
    }

    #[test]
    fn session_end_clears_statuses() {
        let mut c = warrior();
        begin_battle_session(&mut c);
        crate::status::add_block_stack(&mut c).unwrap();
        end_battle_session(&mut c);
        assert!(c.status_effects.is_empty());
        assert!(c.battle_session.is_none());
    }

    #[test]
    fn multi_level_grant_matches_threshold_growth() {
        let mut c = warrior();
        let report = grant_exp_and_gold(&mut c, 250, 0);
        assert_eq!(report.levels_gained, 2);
        assert_eq!(c.level, 3);
        assert_eq!(c.exp, 30);
        assert_eq!(c.exp_to_next, 144);
    }

    #[test]
    fn prestige_gated_at_fifty() {
        let mut c = warrior();
        assert!(prestige(&mut c).is_err());
        c.level = 50;
        assert_eq!(prestige(&mut c).unwrap(), 1);
        assert_eq!(c.level, 1);
        assert_eq!(c.exp_to_next, BASE_EXP_TO_NEXT);
    }

    #[test]
    fn achievement_cascade_awards_titles() {
        let mut c = warrior();
        let report = award_achievement(&mut c, "dungeon_crawler");
        assert_eq!(report.new_achievement.as_deref(), Some("dungeon_crawler"));
        assert!(!report.new_titles.is_empty());
        // Second award is a no-op.
        let report = award_achievement(&mut c, "dungeon_crawler");
        assert_eq!(report, AwardReport::default());
        // The cascaded title can be equipped; unowned titles cannot.
        set_active_title(&mut c, "delver").unwrap();
        assert_eq!(c.active_title.as_deref(), Some("delver"));
        assert!(set_active_title(&mut c, "duelist").is_err());
    }

    #[test]
    fn active_skills_exclude_passives() {
        let mut c = warrior();
        unlock_skill(&mut c, "iron_will", tree());
        c.skill_points = 10;
        unlock_skill(&mut c, "shield_expert", tree());
        let active = get_active_skills(&c, tree());
        assert!(active.contains(&"shield_expert".to_string()));
        assert!(!active.contains(&"iron_will".to_string()));
    }
}
