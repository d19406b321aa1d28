//! Effective-health (EHP) math for build comparisons.
//!
//! A build's survivability is compared under two reference kits: a
//! physical-defense kit and a raw-health kit. Both assume the same attacker
//! (100 DPS at 50% armour penetration); what differs is how much flat health
//! and resistance the kit itself contributes.

use crate::deepwoken::Build;
use crate::lookup;

/// Health every character starts with.
pub const BASE_HP: f64 = 100.0;
/// Flat health per point of the Vitality trait.
pub const HP_PER_VITALITY: f64 = 3.0;

/// Attacker and kit assumptions for one breakdown panel.
#[derive(Debug, Clone, Copy)]
pub struct KitParams {
    pub label: &'static str,
    pub dps: f64,
    /// Attacker armour penetration, in percent.
    pub pen: f64,
    /// Flat health contributed by the kit's equipment.
    pub kit_hp: f64,
    /// Damage resistance contributed by the kit, in percent.
    pub kit_resist: f64,
}

/// Reference kit stacked for physical resistance.
pub fn phys_kit(extra_hp: u32) -> KitParams {
    KitParams {
        label: "Phys Kit",
        dps: 100.0,
        pen: 50.0,
        kit_hp: 112.0 + f64::from(extra_hp),
        kit_resist: 33.0,
    }
}

/// Reference kit stacked for flat health.
pub fn hp_kit(extra_hp: u32) -> KitParams {
    KitParams {
        label: "HP Kit",
        dps: 100.0,
        pen: 50.0,
        kit_hp: 154.0 + f64::from(extra_hp),
        kit_resist: 4.0,
    }
}

/// One bar of the health breakdown chart.
#[derive(Debug, Clone)]
pub struct HpSegment {
    pub label: &'static str,
    pub hp: f64,
}

#[derive(Debug, Clone)]
pub struct EhpBreakdown {
    pub label: &'static str,
    pub segments: Vec<HpSegment>,
    pub total_hp: f64,
    /// Damage fraction actually resisted once the attacker's penetration is
    /// taken into account.
    pub effective_resist: f64,
    pub ehp: f64,
    pub dps: f64,
}

impl EhpBreakdown {
    /// How long the build survives under the assumed attacker.
    pub fn seconds_to_live(&self) -> f64 {
        self.ehp / self.dps
    }
}

/// Computes the health breakdown of a build under one reference kit.
///
/// Talent contributions come from the bundled talent table; talents the
/// table does not know are treated as granting nothing. Resistances stack
/// multiplicatively, so the combined resist never reaches 100%.
pub fn breakdown(build: &Build, params: KitParams) -> EhpBreakdown {
    let vitality_hp = f64::from(build.traits.vitality) * HP_PER_VITALITY;

    let mut talent_hp = 0.0;
    let mut unresisted = 1.0 - params.kit_resist / 100.0;
    for name in &build.talents {
        if let Some(talent) = lookup::talent_by_name(name) {
            talent_hp += f64::from(talent.hp_bonus);
            unresisted *= 1.0 - talent.resist_bonus;
        }
    }
    let resist = 1.0 - unresisted;

    let total_hp = BASE_HP + vitality_hp + talent_hp + params.kit_hp;
    let effective_resist = resist * (1.0 - params.pen / 100.0);
    let ehp = total_hp / (1.0 - effective_resist);

    EhpBreakdown {
        label: params.label,
        segments: vec![
            HpSegment {
                label: "Base",
                hp: BASE_HP,
            },
            HpSegment {
                label: "Vitality",
                hp: vitality_hp,
            },
            HpSegment {
                label: "Talents",
                hp: talent_hp,
            },
            HpSegment {
                label: "Kit",
                hp: params.kit_hp,
            },
        ],
        total_hp,
        effective_resist,
        ehp,
        dps: params.dps,
    }
}
