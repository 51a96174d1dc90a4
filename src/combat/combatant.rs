//! Combatant records
//!
//! A combatant is either a character imported from a character sheet or a
//! manually entered monster. Both share an identifier, a display name, an
//! optional initiative and an optional note.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dice::modifier_from_score;

/// Effective initiative of a combatant that has not rolled yet
pub const UNSET_INITIATIVE: i32 = -999;

/// Character data as returned by the character sheet service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterRecord {
    pub id: String,
    pub name: String,
    /// Dexterity ability score, if the sheet had one
    pub dex_score: Option<i32>,
}

/// Monster data entered by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonsterRecord {
    pub name: String,
    pub max_hp: i32,
    pub ac: Option<i32>,
    pub dex_mod: i32,
}

/// Character-specific fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterStats {
    #[serde(rename = "dex", default)]
    dex_score: Option<i32>,
    dex_mod: i32,
}

impl CharacterStats {
    fn new(dex_score: Option<i32>) -> Self {
        Self {
            dex_score,
            dex_mod: modifier_from_score(dex_score),
        }
    }

    pub fn dex_score(&self) -> Option<i32> {
        self.dex_score
    }

    pub fn dex_mod(&self) -> i32 {
        self.dex_mod
    }
}

/// Monster-specific fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterStats {
    max_hp: i32,
    hp: i32,
    #[serde(default)]
    pub ac: Option<i32>,
    #[serde(default)]
    pub dex_mod: i32,
}

impl MonsterStats {
    fn new(max_hp: i32, ac: Option<i32>, dex_mod: i32) -> Self {
        let max_hp = max_hp.max(0);
        Self {
            max_hp,
            hp: max_hp,
            ac,
            dex_mod,
        }
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    /// Shift current hit points by `delta`, clamped to [0, max_hp]
    fn adjust_hp(&mut self, delta: i32) {
        self.hp = self.hp.saturating_add(delta).clamp(0, self.max_hp.max(0));
    }
}

/// The two kinds of combatant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source")]
pub enum CombatantKind {
    /// Imported from the character sheet service
    #[serde(rename = "ddb")]
    Character(CharacterStats),
    /// Entered by hand
    #[serde(rename = "monster")]
    Monster(MonsterStats),
}

/// A participant in the initiative order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    id: String,
    pub name: String,
    #[serde(default)]
    pub initiative: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    kind: CombatantKind,
}

impl Combatant {
    /// Build a character combatant with initiative unset
    pub fn character(record: CharacterRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            initiative: None,
            note: None,
            kind: CombatantKind::Character(CharacterStats::new(record.dex_score)),
        }
    }

    /// Build a monster combatant at full hit points with initiative unset
    pub fn monster(id: impl Into<String>, record: MonsterRecord) -> Self {
        Self {
            id: id.into(),
            name: record.name,
            initiative: None,
            note: None,
            kind: CombatantKind::Monster(MonsterStats::new(
                record.max_hp,
                record.ac,
                record.dex_mod,
            )),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &CombatantKind {
        &self.kind
    }

    pub fn is_monster(&self) -> bool {
        matches!(self.kind, CombatantKind::Monster(_))
    }

    /// Modifier added to initiative rolls
    pub fn dex_mod(&self) -> i32 {
        match &self.kind {
            CombatantKind::Character(c) => c.dex_mod(),
            CombatantKind::Monster(m) => m.dex_mod,
        }
    }

    /// Dexterity score, only known for characters
    pub fn dex_score(&self) -> Option<i32> {
        match &self.kind {
            CombatantKind::Character(c) => c.dex_score(),
            CombatantKind::Monster(_) => None,
        }
    }

    /// (current, max) hit points, only tracked for monsters
    pub fn hit_points(&self) -> Option<(i32, i32)> {
        match &self.kind {
            CombatantKind::Character(_) => None,
            CombatantKind::Monster(m) => Some((m.hp(), m.max_hp())),
        }
    }

    /// Initiative used for ordering, with unset mapped to a floor value
    pub fn effective_initiative(&self) -> i32 {
        self.initiative.unwrap_or(UNSET_INITIATIVE)
    }

    pub fn has_initiative(&self) -> bool {
        self.initiative.is_some()
    }

    /// Reduce hit points. Returns false if this combatant has none.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        match &mut self.kind {
            CombatantKind::Monster(m) => {
                m.adjust_hp(amount.saturating_neg());
                true
            }
            CombatantKind::Character(_) => false,
        }
    }

    /// Restore hit points. Returns false if this combatant has none.
    pub fn heal(&mut self, amount: i32) -> bool {
        match &mut self.kind {
            CombatantKind::Monster(m) => {
                m.adjust_hp(amount);
                true
            }
            CombatantKind::Character(_) => false,
        }
    }
}

/// Fresh identifier for a hand-entered monster
pub fn generate_monster_id() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("m_{}_{}", Utc::now().timestamp_millis(), &token[..8])
}
