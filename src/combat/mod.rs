//! Combat tracking module
//!
//! Implements initiative-ordered combat with:
//! - Characters and monsters as one tagged combatant type
//! - Initiative rolls (d20 + dexterity modifier)
//! - Hit point tracking clamped to [0, max]
//! - Turn and round stepping that skips unrolled combatants

mod combatant;
mod dice;
mod store;
mod turn;

pub use combatant::{
    generate_monster_id, CharacterRecord, CharacterStats, Combatant, CombatantKind,
    MonsterRecord, MonsterStats, UNSET_INITIATIVE,
};
pub use dice::{ability_modifier, modifier_from_score, InitiativeRoll};
pub use store::CombatantStore;
pub use turn::{initiative_order, TurnState};
