//! Status effect engine: stealth, block stacks, poison, parry.
//!
//! Stealth and block stacks persist turn-to-turn within a single battle
//! and are consumed by the rules here; poison and parry tick down at
//! round end. Block reduction is all-or-nothing: the whole stack is
//! consumed by the first damage instance it reduces, not decremented.

use crate::error::EngineError;
use crate::world::{Character, ClassTag, StatusEffect, StatusKind};
use rand::Rng;

/// Stealth lasts three turns unless consumed by an ambush first.
const STEALTH_DURATION: u32 = 3;
const STEALTH_DODGE: u32 = 90;
const STEALTH_ACCURACY_REDUCTION: u32 = 30;

/// Bonus damage multiplier for the first attack out of stealth.
pub const AMBUSH_MULTIPLIER: f64 = 2.5;

const MAX_BLOCK_STACKS: u8 = 3;
const BLOCK_REDUCTION_PER_STACK: u32 = 50;
const BLOCK_COUNTER_PER_STACK: u32 = 20;

/// Chance per round for a warrior to gain a block stack, percent.
const WARRIOR_BLOCK_ROLL: u32 = 50;

/// Enter stealth: 90% dodge, untargetable, 30% enemy accuracy penalty,
/// three turns. Fails with `AlreadyActive` when stealth is already up —
/// it never double-stacks.
pub fn apply_stealth(character: &mut Character) -> Result<&'static str, EngineError> {
    if character.has_status(StatusKind::Stealth) {
        return Err(EngineError::AlreadyActive("stealth"));
    }
    character.status_effects.push(StatusEffect::Stealth {
        duration: STEALTH_DURATION,
        dodge: STEALTH_DODGE,
        enemy_accuracy_reduction: STEALTH_ACCURACY_REDUCTION,
        invisible: true,
    });
    Ok("you fade into the shadows")
}

/// Consuming read of the ambush state. If the attacker is stealthed the
/// stealth effect is removed and `(true, 2.5)` is returned; a second call
/// in a row yields `(false, 1.0)`.
pub fn check_and_consume_ambush(attacker: &mut Character) -> (bool, f64) {
    if attacker.remove_status(StatusKind::Stealth).is_some() {
        (true, AMBUSH_MULTIPLIER)
    } else {
        (false, 1.0)
    }
}

fn block_stacks(character: &Character) -> u8 {
    match character.find_status(StatusKind::BlockStack) {
        Some(StatusEffect::BlockStack { stacks, .. }) => *stacks,
        _ => 0,
    }
}

/// Grant one block stack to a warrior, up to three. The existing effect
/// is replaced with one carrying the recomputed reduction and counter
/// chance. Returns the new stack count.
pub fn add_block_stack(character: &mut Character) -> Result<u8, EngineError> {
    if character.class != ClassTag::Warrior {
        return Err(EngineError::PreconditionFailed(
            "only warriors can gain BLOCK stacks".to_string(),
        ));
    }
    let stacks = block_stacks(character);
    if stacks >= MAX_BLOCK_STACKS {
        return Err(EngineError::PreconditionFailed(format!(
            "maximum BLOCK stacks reached ({MAX_BLOCK_STACKS})"
        )));
    }
    let new_stacks = stacks + 1;
    character.set_status(StatusEffect::BlockStack {
        stacks: new_stacks,
        damage_reduction: BLOCK_REDUCTION_PER_STACK * new_stacks as u32,
        counter_chance: BLOCK_COUNTER_PER_STACK * new_stacks as u32,
    });
    Ok(new_stacks)
}

/// Apply block damage reduction to an incoming hit. With `n` stacks the
/// damage becomes `damage * (1 - 0.5n)`, clamped to a minimum of 1, and
/// the whole BLOCK_STACK effect is removed. Without stacks the damage
/// passes through unchanged.
pub fn consume_block_reduction(damage: i32, defender: &mut Character) -> (i32, Option<String>) {
    let stacks = block_stacks(defender);
    if stacks == 0 {
        return (damage, None);
    }
    defender.remove_status(StatusKind::BlockStack);
    let reduction = 0.5 * stacks as f64;
    let reduced = ((damage as f64) * (1.0 - reduction)).max(1.0) as i32;
    let percent = (reduction * 100.0) as u32;
    (reduced, Some(format!("BLOCK! damage reduced by {percent}%")))
}

/// Shield slam consumes the attacker's block stacks for bonus damage:
/// `base * (1 + 0.5n)`. Without stacks the base power is returned as-is.
pub fn consume_block_for_shield_slam(
    attacker: &mut Character,
    base_power: i32,
) -> (i32, Option<String>) {
    let stacks = block_stacks(attacker);
    if stacks == 0 {
        return (base_power, None);
    }
    attacker.remove_status(StatusKind::BlockStack);
    let total = ((base_power as f64) * (1.0 + 0.5 * stacks as f64)) as i32;
    let bonus = total - base_power;
    (
        total,
        Some(format!(
            "shield slam consumed {stacks} BLOCK stacks for +{bonus} damage"
        )),
    )
}

/// What happened to one character during end-of-round upkeep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundUpkeep {
    /// Block stack gained by the warrior passive roll.
    pub block_stack_gained: Option<u8>,
    /// Poison damage dealt this round.
    pub poison_damage: i32,
    /// Effects that expired this round.
    pub expired: Vec<StatusKind>,
    /// True if poison dropped the character to 0 hp.
    pub died: bool,
}

/// End-of-round upkeep for one combatant: the warrior 50% block-stack
/// roll, poison ticks, and duration expiry. Block stacks have no duration
/// and only leave by consumption.
pub fn end_of_round_effects(character: &mut Character, rng: &mut impl Rng) -> RoundUpkeep {
    let mut report = RoundUpkeep::default();

    if character.class == ClassTag::Warrior && rng.gen_range(1..=100) <= WARRIOR_BLOCK_ROLL {
        if let Ok(stacks) = add_block_stack(character) {
            report.block_stack_gained = Some(stacks);
        }
    }

    // Poison ticks before durations decrement, so a fresh 3-turn poison
    // deals damage on exactly three round ends.
    if let Some(StatusEffect::Poison {
        damage_per_turn, ..
    }) = character.find_status(StatusKind::Poison)
    {
        report.poison_damage = *damage_per_turn;
        report.died = character.take_damage(report.poison_damage);
    }

    let mut expired = Vec::new();
    for effect in character.status_effects.iter_mut() {
        let duration = match effect {
            StatusEffect::Stealth { duration, .. } => duration,
            StatusEffect::Poison { duration, .. } => duration,
            StatusEffect::Parry { duration } => duration,
            StatusEffect::BlockStack { .. } => continue,
        };
        *duration = duration.saturating_sub(1);
        if *duration == 0 {
            expired.push(effect.kind());
        }
    }
    for kind in &expired {
        character.remove_status(*kind);
    }
    report.expired = expired;
    report
}

/// Drop every status effect. Called when a battle session ends; effects
/// never persist across unrelated encounters.
pub fn clear_all(character: &mut Character) {
    character.status_effects.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::PlayerId;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn warrior() -> Character {
        let mut c = Character::new(PlayerId::from("w"), "Wally");
        c.class = ClassTag::Warrior;
        c
    }

    fn rogue() -> Character {
        let mut c = Character::new(PlayerId::from("r"), "Rin");
        c.class = ClassTag::Rogue;
        c
    }

    #[test]
    fn stealth_is_idempotent_safe() {
        let mut c = rogue();
        assert!(apply_stealth(&mut c).is_ok());
        assert!(matches!(
            apply_stealth(&mut c),
            Err(EngineError::AlreadyActive(_))
        ));
        assert_eq!(
            c.status_effects
                .iter()
                .filter(|e| e.kind() == StatusKind::Stealth)
                .count(),
            1
        );
    }

    #[test]
    fn ambush_is_a_consuming_read() {
        let mut c = rogue();
        apply_stealth(&mut c).unwrap();
        assert_eq!(check_and_consume_ambush(&mut c), (true, 2.5));
        assert_eq!(check_and_consume_ambush(&mut c), (false, 1.0));
    }

    #[test]
    fn block_stacks_cap_at_three() {
        let mut c = warrior();
        for expected in 1..=3u8 {
            assert_eq!(add_block_stack(&mut c).unwrap(), expected);
        }
        let err = add_block_stack(&mut c).unwrap_err();
        assert!(err.to_string().contains("maximum"));
    }

    #[test]
    fn non_warrior_cannot_block() {
        let mut c = rogue();
        assert!(add_block_stack(&mut c).is_err());
    }

    #[test]
    fn block_reduction_consumes_all_stacks() {
        let mut c = warrior();
        add_block_stack(&mut c).unwrap();
        add_block_stack(&mut c).unwrap();
        let (damage, message) = consume_block_reduction(100, &mut c);
        assert_eq!(damage, 1);
        assert!(message.is_some());
        // Fully consumed: the next hit passes through.
        let (damage, message) = consume_block_reduction(100, &mut c);
        assert_eq!(damage, 100);
        assert!(message.is_none());
    }

    #[test]
    fn shield_slam_scales_with_stacks() {
        let mut c = warrior();
        add_block_stack(&mut c).unwrap();
        add_block_stack(&mut c).unwrap();
        add_block_stack(&mut c).unwrap();
        let (power, message) = consume_block_for_shield_slam(&mut c, 80);
        assert_eq!(power, 200);
        assert!(message.is_some());
        assert!(!c.has_status(StatusKind::BlockStack));
        let (power, message) = consume_block_for_shield_slam(&mut c, 80);
        assert_eq!(power, 80);
        assert!(message.is_none());
    }

    #[test]
    fn poison_ticks_and_expires() {
        let mut c = rogue();
        c.set_status(StatusEffect::Poison {
            duration: 2,
            damage_per_turn: 5,
        });
        let mut rng = StdRng::seed_from_u64(7);
        let upkeep = end_of_round_effects(&mut c, &mut rng);
        assert_eq!(upkeep.poison_damage, 5);
        assert_eq!(c.stats.hp, 95);
        let upkeep = end_of_round_effects(&mut c, &mut rng);
        assert_eq!(upkeep.poison_damage, 5);
        assert!(upkeep.expired.contains(&StatusKind::Poison));
        assert!(!c.has_status(StatusKind::Poison));
    }

    #[test]
    fn warrior_round_roll_only_grants_to_warriors() {
        let mut c = rogue();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let upkeep = end_of_round_effects(&mut c, &mut rng);
            assert!(upkeep.block_stack_gained.is_none());
        }
    }
}
