//! Static game-data tables and the name lookup over them.
//!
//! The tables are bundled into the binary at compile time and parsed once on
//! first use. Lookups are case-insensitive substring matches on the name
//! field; when several records match, the first in table order is returned.
//! No relevance ranking is attempted, so short queries like "blade" resolve
//! to whichever matching record the table lists first.

use serde::Deserialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, Deserialize)]
pub struct Equipment {
    pub name: String,
    pub slot: String,
    pub rarity: String,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub stats: Vec<String>,
    #[serde(default)]
    pub obtained: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub category: String,
    pub damage: f64,
    /// Armour penetration, in percent.
    pub penetration: f64,
    pub swing_speed: f64,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub obtained: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Talent {
    pub name: String,
    pub rarity: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Option<String>,
    /// Flat health granted by the talent, used by the EHP breakdown.
    #[serde(default)]
    pub hp_bonus: u32,
    /// Damage fraction resisted by the talent, used by the EHP breakdown.
    #[serde(default)]
    pub resist_bonus: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Mantra {
    pub name: String,
    pub attunement: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Outfit {
    pub name: String,
    pub rarity: String,
    pub durability: u32,
    #[serde(default)]
    pub resistances: Vec<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub cost: Option<String>,
}

/// An equipment loadout shared through the planner, addressed by share id.
#[derive(Debug, Clone, Deserialize)]
pub struct Kit {
    pub kit_share_id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<KitItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KitItem {
    pub name: String,
    #[serde(default)]
    pub hp: u32,
}

impl Kit {
    /// Total flat health granted by the kit's items.
    pub fn total_hp(&self) -> u32 {
        self.items.iter().map(|item| item.hp).sum()
    }
}

static EQUIPMENT: LazyLock<Vec<Equipment>> =
    LazyLock::new(|| load_table(include_str!("data/equipment.json")));
static WEAPONS: LazyLock<Vec<Weapon>> =
    LazyLock::new(|| load_table(include_str!("data/weapons.json")));
static TALENTS: LazyLock<Vec<Talent>> =
    LazyLock::new(|| load_table(include_str!("data/talents.json")));
static MANTRAS: LazyLock<Vec<Mantra>> =
    LazyLock::new(|| load_table(include_str!("data/mantras.json")));
static OUTFITS: LazyLock<Vec<Outfit>> =
    LazyLock::new(|| load_table(include_str!("data/outfits.json")));
static KITS: LazyLock<Vec<Kit>> = LazyLock::new(|| load_table(include_str!("data/kits.json")));

fn load_table<T: serde::de::DeserializeOwned>(raw: &str) -> Vec<T> {
    serde_json::from_str(raw).expect("bundled game-data table is valid JSON")
}

pub fn find_equipment(query: &str) -> Option<&'static Equipment> {
    search(&EQUIPMENT, query, |record| &record.name)
}

pub fn find_weapon(query: &str) -> Option<&'static Weapon> {
    search(&WEAPONS, query, |record| &record.name)
}

pub fn find_talent(query: &str) -> Option<&'static Talent> {
    search(&TALENTS, query, |record| &record.name)
}

/// Exact talent lookup for names coming from the build planner.
pub fn talent_by_name(name: &str) -> Option<&'static Talent> {
    TALENTS
        .iter()
        .find(|talent| talent.name.eq_ignore_ascii_case(name))
}

pub fn find_mantra(query: &str) -> Option<&'static Mantra> {
    search(&MANTRAS, query, |record| &record.name)
}

pub fn find_outfit(query: &str) -> Option<&'static Outfit> {
    search(&OUTFITS, query, |record| &record.name)
}

/// Kits are addressed by their exact share id, not by substring.
pub fn find_kit(share_id: &str) -> Option<&'static Kit> {
    let share_id = share_id.trim();
    if share_id.is_empty() {
        return None;
    }
    KITS.iter()
        .find(|kit| kit.kit_share_id.eq_ignore_ascii_case(share_id))
}

fn search<'a, T>(table: &'a [T], query: &str, name: impl Fn(&T) -> &str) -> Option<&'a T> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }
    table
        .iter()
        .find(|record| name(record).to_lowercase().contains(&query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_tables_are_nonempty() {
        assert!(!EQUIPMENT.is_empty());
        assert!(!WEAPONS.is_empty());
        assert!(!TALENTS.is_empty());
        assert!(!MANTRAS.is_empty());
        assert!(!OUTFITS.is_empty());
        assert!(!KITS.is_empty());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(find_weapon("MESSER").unwrap().name, "Messer");
        assert_eq!(find_talent("exoskeleton").unwrap().name, "Exoskeleton");
    }

    #[test]
    fn test_partial_names_match() {
        assert_eq!(find_mantra("javelin").unwrap().name, "Grand Javelin");
        assert_eq!(find_outfit("diver").unwrap().name, "Black Diver");
        assert_eq!(find_equipment("  cape ").unwrap().name, "Brilliant Cape");
    }

    #[test]
    fn test_ambiguous_query_returns_first_in_table_order() {
        // Both "Railblade" and "Curved Blade of Winds" match; the table
        // lists Railblade first.
        assert_eq!(find_weapon("blade").unwrap().name, "Railblade");
    }

    #[test]
    fn test_empty_and_unknown_queries_find_nothing() {
        assert!(find_weapon("").is_none());
        assert!(find_weapon("   ").is_none());
        assert!(find_weapon("zzzz no such weapon").is_none());
        assert!(find_kit("").is_none());
    }

    #[test]
    fn test_kits_match_share_id_exactly() {
        let kit = find_kit("Xq3vR1").unwrap();
        assert_eq!(kit.name, "Shrine Duel Kit");
        assert_eq!(kit.total_hp(), 9);

        // Case differences are fine, substrings are not.
        assert!(find_kit("xq3vr1").is_some());
        assert!(find_kit(" Xq3vR1 ").is_some());
        assert!(find_kit("Xq3").is_none());
    }

    #[test]
    fn test_talent_bonuses_default_to_zero() {
        let ghost = find_talent("ghost").unwrap();
        assert_eq!(ghost.hp_bonus, 0);
        assert_eq!(ghost.resist_bonus, 0.0);

        let stalwart = talent_by_name("Stalwart Adventurer").unwrap();
        assert_eq!(stalwart.hp_bonus, 10);
        assert!(talent_by_name("No Such Talent").is_none());
    }
}
