//! Plausibility scoring of a decode under one layout profile.
//!
//! Every check subtracts from a budget of 100 points. The weights are public so
//! callers auditing large save collections can retune them.

use serde::Serialize;

use crate::decode::{ProfileDecode, PARTY_CAPACITY};
use crate::layout::{Encryption, GameCode, LayoutProfile};
use crate::pokemon::MAX_SPECIES;

pub const MAX_MONEY: u32 = 999_999;
pub const MAX_COINS: u16 = 9_999;
pub const MAX_ITEM_QUANTITY: u16 = 999;

const FULL_SCORE: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SanityLevel {
    None,
    Low,
    Medium,
    High,
}

impl SanityLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.80 {
            SanityLevel::High
        } else if confidence >= 0.55 {
            SanityLevel::Medium
        } else if confidence >= 0.30 {
            SanityLevel::Low
        } else {
            SanityLevel::None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreWeights {
    pub contradiction: u32,
    pub missing_anchor: u32,
    pub missing_anchor_cap: u32,
    pub flags_out_of_range: u32,
    pub too_few_vars: u32,
    pub too_many_vars: u32,
    pub party_count: u32,
    pub bad_party_record: u32,
    pub checksum_failure: u32,
    pub checksum_failure_cap: u32,
    pub money: u32,
    pub coins: u32,
    pub item_quantity: u32,
    pub item_quantity_cap: u32,
    pub unexpected_key: u32,
    pub missing_key: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            contradiction: 25,
            missing_anchor: 5,
            missing_anchor_cap: 15,
            flags_out_of_range: 30,
            too_few_vars: 15,
            too_many_vars: 20,
            party_count: 40,
            bad_party_record: 10,
            checksum_failure: 5,
            checksum_failure_cap: 20,
            money: 20,
            coins: 10,
            item_quantity: 5,
            item_quantity_cap: 20,
            unexpected_key: 30,
            missing_key: 15,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanityReport {
    pub level: SanityLevel,
    pub issues: Vec<String>,
    pub flags_set_count: u32,
    pub non_zero_var_count: u32,
    pub raw_party_count: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProfileScore {
    /// Points left out of 100.
    pub score: u32,
    pub confidence: f64,
    pub report: SanityReport,
}

struct Tally {
    penalty: u32,
    issues: Vec<String>,
}

impl Tally {
    fn penalize(&mut self, points: u32, issue: String) {
        self.penalty = self.penalty.saturating_add(points);
        self.issues.push(issue);
    }
}

fn saturating_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

pub fn score_profile(
    decode: &ProfileDecode,
    profile: &LayoutProfile,
    checksum_failures: usize,
    weights: &ScoreWeights,
) -> ProfileScore {
    let sanity = &profile.sanity;
    let mut tally = Tally {
        penalty: 0,
        issues: Vec::new(),
    };

    for implication in &sanity.implications {
        if decode.flags.is_set(implication.if_set) && !decode.flags.is_set(implication.requires) {
            tally.penalize(
                weights.contradiction,
                format!(
                    "contradiction: flag 0x{:x} is set without flag 0x{:x}",
                    implication.if_set, implication.requires
                ),
            );
        }
    }

    let raw_party_count = decode.raw_party_count.unwrap_or(0);
    let progressed = (1..=PARTY_CAPACITY).contains(&raw_party_count);
    if progressed {
        let missing_flags = sanity
            .progress_flags
            .iter()
            .filter(|flag_id| !decode.flags.is_set(**flag_id))
            .map(|flag_id| format!("flag 0x{flag_id:x}"));
        let missing_vars = sanity
            .progress_vars
            .iter()
            .filter(|var_id| decode.vars.value(**var_id) == 0)
            .map(|var_id| format!("var 0x{var_id:x}"));
        let missing: Vec<String> = missing_flags.chain(missing_vars).collect();
        if !missing.is_empty() {
            let points = weights
                .missing_anchor
                .saturating_mul(saturating_count(missing.len()))
                .min(weights.missing_anchor_cap);
            tally.penalize(
                points,
                format!(
                    "party present but progress anchors unset: {}",
                    missing.join(", ")
                ),
            );
        }
    }

    let flags_set_count = decode.flags.set_count() as u32;
    if flags_set_count < sanity.min_flags_set {
        tally.penalize(
            weights.flags_out_of_range,
            format!(
                "only {flags_set_count} flags set, expected at least {}",
                sanity.min_flags_set
            ),
        );
    } else if flags_set_count > sanity.max_flags_set {
        tally.penalize(
            weights.flags_out_of_range,
            format!(
                "{flags_set_count} flags set, expected at most {}",
                sanity.max_flags_set
            ),
        );
    }

    let non_zero_var_count = decode.vars.nonzero_count() as u32;
    if non_zero_var_count < sanity.min_nonzero_vars {
        tally.penalize(
            weights.too_few_vars,
            format!(
                "only {non_zero_var_count} nonzero vars, expected at least {}",
                sanity.min_nonzero_vars
            ),
        );
    } else if non_zero_var_count > sanity.max_nonzero_vars {
        tally.penalize(
            weights.too_many_vars,
            format!(
                "{non_zero_var_count} nonzero vars, expected at most {}",
                sanity.max_nonzero_vars
            ),
        );
    }

    if raw_party_count > PARTY_CAPACITY {
        tally.penalize(
            weights.party_count,
            format!("party count {raw_party_count} exceeds {PARTY_CAPACITY}"),
        );
    }
    for (index, pokemon) in decode.save_data.party.iter().enumerate() {
        if !pokemon.checksum_valid {
            tally.penalize(
                weights.bad_party_record,
                format!("party slot {index} fails its checksum"),
            );
        } else if pokemon.species() == 0 || pokemon.species() > MAX_SPECIES {
            tally.penalize(
                weights.bad_party_record,
                format!("party slot {index} has species {}", pokemon.species()),
            );
        }
    }

    if checksum_failures > 0 {
        let points = weights
            .checksum_failure
            .saturating_mul(saturating_count(checksum_failures))
            .min(weights.checksum_failure_cap);
        tally.penalize(
            points,
            format!("{checksum_failures} sector checksum failures"),
        );
    }

    if let Some(money) = decode.save_data.money.filter(|money| *money > MAX_MONEY) {
        tally.penalize(weights.money, format!("money {money} exceeds {MAX_MONEY}"));
    }
    if let Some(coins) = decode.save_data.coins.filter(|coins| *coins > MAX_COINS) {
        tally.penalize(weights.coins, format!("coins {coins} exceed {MAX_COINS}"));
    }
    let overfull_slots = decode
        .save_data
        .bag
        .pockets()
        .iter()
        .flat_map(|pocket| pocket.iter())
        .filter(|slot| slot.quantity > MAX_ITEM_QUANTITY)
        .count();
    let overfull_slots = saturating_count(overfull_slots);
    if overfull_slots > 0 {
        tally.penalize(
            weights.item_quantity.saturating_mul(overfull_slots).min(weights.item_quantity_cap),
            format!("{overfull_slots} bag slots hold more than {MAX_ITEM_QUANTITY} items"),
        );
    }

    let raw_key = decode.raw_key_field.unwrap_or(0);
    match profile.encryption {
        Encryption::None if raw_key != 0 => tally.penalize(
            weights.unexpected_key,
            format!("encryption key 0x{raw_key:08x} present but layout is unencrypted"),
        ),
        Encryption::Xor if profile.game == GameCode::Emerald && raw_key == 0 => tally.penalize(
            weights.missing_key,
            "encryption key is zero".to_owned(),
        ),
        _ => {}
    }

    let score = FULL_SCORE.saturating_sub(tally.penalty);
    let confidence = (score as f64 / FULL_SCORE as f64).clamp(0.0, 1.0);
    log::debug!(
        "Profile {} scored {score} with {} issues",
        profile.id,
        tally.issues.len()
    );

    ProfileScore {
        score,
        confidence,
        report: SanityReport {
            level: SanityLevel::from_confidence(confidence),
            issues: tally.issues,
            flags_set_count,
            non_zero_var_count,
            raw_party_count: decode.raw_party_count,
        },
    }
}
