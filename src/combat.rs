//! Turn-based combat resolution.
//!
//! A `Battle` walks the round state machine for a duel between two
//! characters; `resolve_turn` and `apply_skill_effect` are the
//! lower-level entry points it is built from, also used directly by the
//! dungeon encounter loop. Two damage formulas coexist on purpose: the
//! flat strength formula for duels and the attack-minus-defense formula
//! for dungeons. They are selected by context and never unified.

use crate::skills;
use crate::status::{self, RoundUpkeep};
use crate::world::{BattleSessionId, Character, ClassTag, PlayerId, SkillId, StatusEffect};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Base power of the warrior shield slam before block-stack bonuses.
pub const SHIELD_SLAM_BASE: i32 = 80;

/// Rounds fought before a duel is called as a draw.
pub const DEFAULT_ROUND_CAP: u32 = 20;

/// How base damage is computed for a strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageStrategy {
    /// `20 + 2 x strength`; ignores the defender entirely. The duel
    /// formula.
    FlatStrength,
    /// `max(1, attack - defense)`. The dungeon formula.
    AttackDefense,
}

impl DamageStrategy {
    /// `attacker_power` is strength for characters and attack for
    /// monsters.
    pub fn base_damage(&self, attacker_power: i32, defender_defense: i32) -> i32 {
        match self {
            DamageStrategy::FlatStrength => 20 + 2 * attacker_power,
            DamageStrategy::AttackDefense => (attacker_power - defender_defense).max(1),
        }
    }
}

/// The action a combatant takes on their turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Attack,
    /// A skill routed through the turn path (the warrior shield slam);
    /// named active skills go through `apply_skill_effect` instead.
    Skill,
}

/// What a combatant chose to do, as received from the input channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnAction {
    Attack,
    UseSkill(SkillId),
}

/// Result event for one resolved turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub final_damage: i32,
    pub defender_hp_remaining: i32,
    pub defender_defeated: bool,
    pub ambush: bool,
    pub blocked: bool,
    pub skill: bool,
    /// Short machine-checkable message payloads, not formatting.
    pub messages: Vec<String>,
}

/// Resolve one turn of a character-versus-character exchange.
///
/// Order: ambush check (attack actions only), base damage from the
/// strategy, shield-slam bonus (skill actions by warriors), the
/// defender's block reduction, then hp subtraction floored at 0.
pub fn resolve_turn(
    attacker: &mut Character,
    defender: &mut Character,
    action: ActionKind,
    strategy: DamageStrategy,
) -> TurnOutcome {
    let mut messages = Vec::new();

    let (ambush, multiplier) = if action == ActionKind::Attack {
        status::check_and_consume_ambush(attacker)
    } else {
        (false, 1.0)
    };

    let mut damage = strategy.base_damage(attacker.stats.strength, defender.stats.defense);
    if ambush {
        damage = (damage as f64 * multiplier) as i32;
        messages.push("AMBUSH! strike from the shadows".to_string());
    }

    if action == ActionKind::Skill && attacker.class == ClassTag::Warrior {
        let (power, message) = status::consume_block_for_shield_slam(attacker, SHIELD_SLAM_BASE);
        damage = power;
        if let Some(message) = message {
            messages.push(message);
        }
    }

    let (final_damage, block_message) = status::consume_block_reduction(damage, defender);
    let blocked = block_message.is_some();
    if let Some(message) = block_message {
        messages.push(message);
    }

    let defender_defeated = defender.take_damage(final_damage);
    debug!(
        attacker = %attacker.id,
        defender = %defender.id,
        final_damage,
        defender_hp = defender.stats.hp,
        "turn resolved"
    );

    TurnOutcome {
        final_damage,
        defender_hp_remaining: defender.stats.hp,
        defender_defeated,
        ambush,
        blocked,
        skill: action == ActionKind::Skill,
        messages,
    }
}

/// Result event for an active skill use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillOutcome {
    pub skill: SkillId,
    pub damage: Option<i32>,
    pub defender_defeated: bool,
    pub message: String,
}

/// Apply a named active skill. Dispatch is by skill id; an unrecognized
/// id is a permissive no-op, not an error.
pub fn apply_skill_effect(
    skill_id: &str,
    attacker: &mut Character,
    defender: &mut Character,
) -> SkillOutcome {
    match skill_id {
        // Flat double damage; bypasses both stealth consumption and the
        // defender's block. A separate path from the stealth ambush.
        "ambush" => {
            let damage = (20 + 2 * attacker.stats.strength) * 2;
            let defender_defeated = defender.take_damage(damage);
            SkillOutcome {
                skill: skill_id.to_string(),
                damage: Some(damage),
                defender_defeated,
                message: format!("ambush strike for {damage} damage"),
            }
        }
        "shield_expert" => {
            attacker.set_status(StatusEffect::Parry { duration: 1 });
            SkillOutcome {
                skill: skill_id.to_string(),
                damage: None,
                defender_defeated: false,
                message: "parry readied for the next attack".to_string(),
            }
        }
        "poison_blade" => {
            defender.set_status(StatusEffect::Poison {
                duration: 3,
                damage_per_turn: 5,
            });
            SkillOutcome {
                skill: skill_id.to_string(),
                damage: None,
                defender_defeated: false,
                message: "target poisoned for 3 turns".to_string(),
            }
        }
        _ => SkillOutcome {
            skill: skill_id.to_string(),
            damage: None,
            defender_defeated: false,
            message: "skill used".to_string(),
        },
    }
}

// ============================================================================
// Battle state machine
// ============================================================================

/// Which corner of the duel a combatant is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Challenger,
    Defender,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Challenger => Side::Defender,
            Side::Defender => Side::Challenger,
        }
    }
}

/// Terminal state of a duel. Reaching the round cap with both sides
/// alive is a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleResult {
    Victory { winner: Side },
    Draw,
}

/// Where the battle state machine currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattlePhase {
    AwaitingAction(Side),
    Finished(BattleResult),
}

/// Events accumulated over a battle, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum CombatEvent {
    RoundStarted {
        round: u32,
    },
    TurnResolved {
        actor: PlayerId,
        outcome: TurnOutcome,
    },
    SkillUsed {
        actor: PlayerId,
        outcome: SkillOutcome,
    },
    UpkeepApplied {
        actor: PlayerId,
        upkeep: RoundUpkeep,
    },
    BattleEnded {
        result: BattleResult,
    },
}

/// One duel between two characters. Owns session-scoped copies of both
/// records; callers commit them back through the persistence gateway at
/// checkpoints. Turns strictly alternate: challenger, defender, round
/// upkeep, next round.
#[derive(Debug)]
pub struct Battle {
    pub session_id: BattleSessionId,
    challenger: Character,
    defender: Character,
    round: u32,
    round_cap: u32,
    strategy: DamageStrategy,
    phase: BattlePhase,
    events: Vec<CombatEvent>,
}

impl Battle {
    /// Open battle sessions on both characters, apply their passives,
    /// and start round 1.
    pub fn new(
        mut challenger: Character,
        mut defender: Character,
        strategy: DamageStrategy,
        round_cap: u32,
    ) -> Self {
        let session_id = skills::begin_battle_session(&mut challenger);
        skills::begin_battle_session(&mut defender);
        skills::apply_passive_skills(&mut challenger, crate::content::skill_tree(challenger.class));
        skills::apply_passive_skills(&mut defender, crate::content::skill_tree(defender.class));
        Self {
            session_id,
            challenger,
            defender,
            round: 1,
            round_cap,
            strategy,
            phase: BattlePhase::AwaitingAction(Side::Challenger),
            events: vec![CombatEvent::RoundStarted { round: 1 }],
        }
    }

    pub fn phase(&self) -> BattlePhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    pub fn character(&self, side: Side) -> &Character {
        match side {
            Side::Challenger => &self.challenger,
            Side::Defender => &self.defender,
        }
    }

    fn pair_mut(&mut self, side: Side) -> (&mut Character, &mut Character) {
        match side {
            Side::Challenger => (&mut self.challenger, &mut self.defender),
            Side::Defender => (&mut self.defender, &mut self.challenger),
        }
    }

    /// Resolve the awaited side's action and advance the state machine.
    /// When the defender's action completes a round, end-of-round upkeep
    /// runs for both sides (warrior block rolls, poison ticks, expiry).
    ///
    /// Returns the phase the battle moved into.
    pub fn take_action(
        &mut self,
        side: Side,
        action: TurnAction,
        rng: &mut impl Rng,
    ) -> BattlePhase {
        let BattlePhase::AwaitingAction(expected) = self.phase else {
            return self.phase;
        };
        if side != expected {
            return self.phase;
        }

        let actor_id = self.character(side).id.clone();
        let strategy = self.strategy;
        let (attacker, defender) = self.pair_mut(side);
        let opponent_defeated = match action {
            TurnAction::Attack => {
                let outcome = resolve_turn(attacker, defender, ActionKind::Attack, strategy);
                let defeated = outcome.defender_defeated;
                self.events.push(CombatEvent::TurnResolved {
                    actor: actor_id,
                    outcome,
                });
                defeated
            }
            TurnAction::UseSkill(skill_id) if skill_id == "shield_slam" => {
                let outcome = resolve_turn(attacker, defender, ActionKind::Skill, strategy);
                let defeated = outcome.defender_defeated;
                self.events.push(CombatEvent::TurnResolved {
                    actor: actor_id,
                    outcome,
                });
                defeated
            }
            TurnAction::UseSkill(skill_id) => {
                let outcome = apply_skill_effect(&skill_id, attacker, defender);
                let defeated = outcome.defender_defeated;
                self.events.push(CombatEvent::SkillUsed {
                    actor: actor_id,
                    outcome,
                });
                defeated
            }
        };

        if opponent_defeated {
            return self.finish_with(BattleResult::Victory { winner: side });
        }

        match side {
            Side::Challenger => {
                self.phase = BattlePhase::AwaitingAction(Side::Defender);
            }
            Side::Defender => self.end_round(rng),
        }
        self.phase
    }

    fn end_round(&mut self, rng: &mut impl Rng) {
        for side in [Side::Challenger, Side::Defender] {
            let id = self.character(side).id.clone();
            let (character, _) = self.pair_mut(side);
            let upkeep = status::end_of_round_effects(character, rng);
            self.events.push(CombatEvent::UpkeepApplied {
                actor: id,
                upkeep,
            });
        }

        // Poison can finish a combatant during upkeep; both dying in the
        // same upkeep is a draw.
        let challenger_down = !self.challenger.is_alive();
        let defender_down = !self.defender.is_alive();
        match (challenger_down, defender_down) {
            (true, true) => {
                self.finish_with(BattleResult::Draw);
                return;
            }
            (true, false) => {
                self.finish_with(BattleResult::Victory {
                    winner: Side::Defender,
                });
                return;
            }
            (false, true) => {
                self.finish_with(BattleResult::Victory {
                    winner: Side::Challenger,
                });
                return;
            }
            (false, false) => {}
        }

        if self.round >= self.round_cap {
            self.finish_with(BattleResult::Draw);
            return;
        }
        self.round += 1;
        self.events.push(CombatEvent::RoundStarted { round: self.round });
        self.phase = BattlePhase::AwaitingAction(Side::Challenger);
    }

    fn finish_with(&mut self, result: BattleResult) -> BattlePhase {
        self.events.push(CombatEvent::BattleEnded { result });
        self.phase = BattlePhase::Finished(result);
        self.phase
    }

    /// Close both battle sessions and hand the records back for the
    /// final commit, together with the battle transcript.
    pub fn finish(mut self) -> (Character, Character, Vec<CombatEvent>) {
        skills::end_battle_session(&mut self.challenger);
        skills::end_battle_session(&mut self.defender);
        (self.challenger, self.defender, self.events)
    }
}
