//! Session orchestration over the persistence gateway.
//!
//! Each operation loads session-scoped copies of the characters it
//! touches, runs one engine transition, and commits whole records back.
//! Duels additionally hold their copies across rounds, committing at
//! end-of-turn checkpoints, so at most one mutation of a character is
//! ever in flight.

use crate::combat::{
    Battle, BattlePhase, BattleResult, CombatEvent, DamageStrategy, Side, TurnAction,
    DEFAULT_ROUND_CAP,
};
use crate::content;
use crate::dungeon::{self, DungeonOutcome, RestOutcome};
use crate::economy::LootLog;
use crate::error::EngineError;
use crate::persist::{CharacterStore, PersistError};
use crate::skills;
use crate::world::{Character, ClassTag, PlayerId};
use rand::Rng;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info};

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

async fn load_registered<S: CharacterStore>(
    store: &S,
    id: &PlayerId,
) -> Result<Character, SessionError> {
    match store.load(id).await {
        Ok(character) => Ok(character),
        Err(PersistError::NotFound(_)) => {
            Err(EngineError::NotRegistered(id.to_string()).into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Create a new character. Fails with `AlreadyActive` when the id is
/// taken.
pub async fn register<S: CharacterStore>(
    store: &S,
    id: PlayerId,
    name: impl Into<String>,
) -> Result<Character, SessionError> {
    match store.load(&id).await {
        Ok(_) => Err(EngineError::AlreadyActive("character").into()),
        Err(PersistError::NotFound(_)) => {
            let character = Character::new(id, name);
            store.save(&character).await?;
            info!(player = %character.id, "registered");
            Ok(character)
        }
        Err(err) => Err(err.into()),
    }
}

/// One-time class selection; applies the class's base stat block.
pub async fn choose_class<S: CharacterStore>(
    store: &S,
    id: &PlayerId,
    class: ClassTag,
) -> Result<Character, SessionError> {
    if class == ClassTag::Unassigned {
        return Err(EngineError::InvalidTarget("cannot choose Unassigned".to_string()).into());
    }
    let mut character = load_registered(store, id).await?;
    if character.class != ClassTag::Unassigned {
        return Err(EngineError::AlreadyActive("class").into());
    }
    character.class = class;
    character.stats = class.data().base_stats;
    store.save(&character).await?;
    info!(player = %character.id, class = class.name(), "class chosen");
    Ok(character)
}

/// Check and perform a skill unlock in one transaction.
pub async fn unlock_skill<S: CharacterStore>(
    store: &S,
    id: &PlayerId,
    skill_id: &str,
) -> Result<Character, SessionError> {
    let mut character = load_registered(store, id).await?;
    let tree = content::skill_tree(character.class);
    skills::can_unlock_skill(&character, skill_id, tree).map_err(EngineError::from)?;
    skills::unlock_skill(&mut character, skill_id, tree);
    store.save(&character).await?;
    Ok(character)
}

/// Grant exp and gold (combat/dungeon rewards or admin grants) through
/// the leveling path.
pub async fn grant_exp_and_gold<S: CharacterStore>(
    store: &S,
    id: &PlayerId,
    exp: u32,
    gold: u32,
) -> Result<skills::ProgressionReport, SessionError> {
    let mut character = load_registered(store, id).await?;
    let report = skills::grant_exp_and_gold(&mut character, exp, gold);
    store.save(&character).await?;
    Ok(report)
}

/// Attempt the player's current floor of a dungeon and commit the
/// result.
pub async fn run_dungeon<S: CharacterStore>(
    store: &S,
    id: &PlayerId,
    dungeon_id: &str,
    rng: &mut impl Rng,
    loot_log: &mut LootLog,
) -> Result<DungeonOutcome, SessionError> {
    let mut character = load_registered(store, id).await?;
    let outcome = dungeon::enter_dungeon(&mut character, dungeon_id, rng, loot_log)
        .map_err(SessionError::Engine)?;
    store.save(&character).await?;
    Ok(outcome)
}

/// Rest and commit.
pub async fn rest<S: CharacterStore>(
    store: &S,
    id: &PlayerId,
) -> Result<RestOutcome, SessionError> {
    let mut character = load_registered(store, id).await?;
    let outcome = dungeon::rest(&mut character);
    store.save(&character).await?;
    Ok(outcome)
}

// ============================================================================
// Duels
// ============================================================================

/// How long a combatant has to pick an action before the engine
/// defaults to a basic attack.
pub const TURN_DEADLINE: Duration = Duration::from_secs(30);

/// Duel parameters.
#[derive(Debug, Clone)]
pub struct DuelConfig {
    pub strategy: DamageStrategy,
    pub round_cap: u32,
    pub turn_timeout: Duration,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            strategy: DamageStrategy::FlatStrength,
            round_cap: DEFAULT_ROUND_CAP,
            turn_timeout: TURN_DEADLINE,
        }
    }
}

/// Action channels for both duelists. Dropping a sender is equivalent
/// to never answering: the engine falls back to basic attacks.
pub struct DuelInputs {
    pub challenger: mpsc::Receiver<TurnAction>,
    pub defender: mpsc::Receiver<TurnAction>,
}

impl DuelInputs {
    /// Build input channels for a duel, returning the senders the
    /// caller hands to its command plumbing.
    pub fn channels() -> (mpsc::Sender<TurnAction>, mpsc::Sender<TurnAction>, Self) {
        let (challenger_tx, challenger_rx) = mpsc::channel(8);
        let (defender_tx, defender_rx) = mpsc::channel(8);
        (
            challenger_tx,
            defender_tx,
            Self {
                challenger: challenger_rx,
                defender: defender_rx,
            },
        )
    }
}

/// The final word on a duel.
#[derive(Debug)]
pub struct DuelReport {
    pub result: BattleResult,
    pub winner: Option<PlayerId>,
    pub rounds: u32,
    pub events: Vec<CombatEvent>,
}

/// Await one side's action. Timeouts, closed channels, and picks of
/// skills the combatant does not have all resolve to a basic attack —
/// indistinguishable in engine state from a deliberate choice.
async fn select_action(
    battle: &Battle,
    side: Side,
    inputs: &mut DuelInputs,
    deadline: Duration,
) -> TurnAction {
    let character = battle.character(side);
    let options = skills::get_active_skills(character, content::skill_tree(character.class));
    if options.is_empty() {
        return TurnAction::Attack;
    }
    let rx = match side {
        Side::Challenger => &mut inputs.challenger,
        Side::Defender => &mut inputs.defender,
    };
    match timeout(deadline, rx.recv()).await {
        Ok(Some(TurnAction::UseSkill(id))) if options.contains(&id) => TurnAction::UseSkill(id),
        Ok(Some(_)) => TurnAction::Attack,
        Ok(None) => {
            debug!(?side, "input channel closed, defaulting to attack");
            TurnAction::Attack
        }
        Err(_) => {
            debug!(?side, "turn deadline passed, defaulting to attack");
            TurnAction::Attack
        }
    }
}

/// Run a duel to completion, committing both records at end-of-turn
/// checkpoints and once more after the battle closes.
pub async fn run_duel<S: CharacterStore>(
    store: &S,
    challenger_id: &PlayerId,
    defender_id: &PlayerId,
    inputs: &mut DuelInputs,
    rng: &mut impl Rng,
    config: DuelConfig,
) -> Result<DuelReport, SessionError> {
    if challenger_id == defender_id {
        return Err(EngineError::InvalidTarget("cannot battle yourself".to_string()).into());
    }
    let challenger = load_registered(store, challenger_id).await?;
    let defender = load_registered(store, defender_id).await?;
    info!(challenger = %challenger.id, defender = %defender.id, "duel started");

    let mut battle = Battle::new(challenger, defender, config.strategy, config.round_cap);
    let result = loop {
        match battle.phase() {
            BattlePhase::AwaitingAction(side) => {
                let action = select_action(&battle, side, inputs, config.turn_timeout).await;
                battle.take_action(side, action, rng);
                store.save(battle.character(Side::Challenger)).await?;
                store.save(battle.character(Side::Defender)).await?;
            }
            BattlePhase::Finished(result) => break result,
        }
    };

    let rounds = battle.round();
    let (mut challenger, mut defender, events) = battle.finish();
    let winner = match result {
        BattleResult::Victory {
            winner: Side::Challenger,
        } => {
            skills::award_achievement(&mut challenger, "first_victory");
            Some(challenger.id.clone())
        }
        BattleResult::Victory {
            winner: Side::Defender,
        } => {
            skills::award_achievement(&mut defender, "first_victory");
            Some(defender.id.clone())
        }
        BattleResult::Draw => None,
    };
    store.save(&challenger).await?;
    store.save(&defender).await?;
    info!(?result, rounds, "duel finished");

    Ok(DuelReport {
        result,
        winner,
        rounds,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStore;

    #[tokio::test]
    async fn register_is_guarded() {
        let store = MemoryStore::new();
        let id = PlayerId::from("u1");
        register(&store, id.clone(), "Hero").await.unwrap();
        let err = register(&store, id, "Hero").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Engine(EngineError::AlreadyActive(_))
        ));
    }

    #[tokio::test]
    async fn class_selection_is_one_time() {
        let store = MemoryStore::new();
        let id = PlayerId::from("u2");
        register(&store, id.clone(), "Hero").await.unwrap();

        let character = choose_class(&store, &id, ClassTag::Warrior).await.unwrap();
        assert_eq!(character.class, ClassTag::Warrior);
        assert_eq!(character.stats.max_hp, 120);

        let err = choose_class(&store, &id, ClassTag::Mage).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Engine(EngineError::AlreadyActive(_))
        ));
    }

    #[tokio::test]
    async fn operations_require_registration() {
        let store = MemoryStore::new();
        let id = PlayerId::from("ghost");
        let err = choose_class(&store, &id, ClassTag::Monk).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Engine(EngineError::NotRegistered(_))
        ));
        let err = rest(&store, &id).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Engine(EngineError::NotRegistered(_))
        ));
    }

    #[tokio::test]
    async fn unlock_commits_the_spent_points() {
        let store = MemoryStore::new();
        let id = PlayerId::from("u3");
        register(&store, id.clone(), "Hero").await.unwrap();
        choose_class(&store, &id, ClassTag::Warrior).await.unwrap();

        let character = unlock_skill(&store, &id, "iron_will").await.unwrap();
        assert!(character.is_unlocked("iron_will"));
        let reloaded = store.load(&id).await.unwrap();
        assert_eq!(reloaded.skill_points, 2);

        let err = unlock_skill(&store, &id, "iron_will").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Engine(EngineError::AlreadyUnlocked)
        ));
    }
}
