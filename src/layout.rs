//! Layout profiles: named field-offset tables for one game or ROM-hack variant.
//!
//! A variant profile is written as a JSON override of a base profile. The
//! override is merged into the base once, when the profile is built, so field
//! lookups never walk an inheritance chain.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProfileError;
use crate::save::SECTIONS_PER_SLOT;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameCode {
    #[serde(rename = "E")]
    Emerald,
    #[serde(rename = "RS")]
    RubySapphire,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportLevel {
    Experimental,
    Stable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    Xor,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PocketLayout {
    pub offset: u16,
    pub capacity: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveBlock2Layout {
    pub player_name: u16,
    pub player_gender: u16,
    pub trainer_id: u16,
    pub play_time: u16,
    pub pokedex_owned: u16,
    pub pokedex_seen: u16,
    pub encryption_key: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveBlock1Layout {
    pub position: u16,
    pub location: u16,
    pub party_count: u16,
    pub party: u16,
    pub money: u16,
    pub coins: u16,
    pub registered_item: u16,
    pub pc_items: PocketLayout,
    pub items: PocketLayout,
    pub key_items: PocketLayout,
    pub poke_balls: PocketLayout,
    pub tms_hms: PocketLayout,
    pub berries: PocketLayout,
    pub flags: u16,
    pub flag_bytes: u16,
    pub vars: u16,
    pub var_count: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageLayout {
    pub current_box: u16,
    pub boxes: u16,
    pub box_names: u16,
    pub box_count: u8,
    pub box_capacity: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagImplication {
    pub if_set: u16,
    pub requires: u16,
}

/// Story-progress anchors for one variant. The flag and var ids are raw ids as
/// stored by that variant, before any alias is applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanityConfig {
    #[serde(default)]
    pub implications: Vec<FlagImplication>,
    #[serde(default)]
    pub progress_flags: Vec<u16>,
    #[serde(default)]
    pub progress_vars: Vec<u16>,
    pub min_flags_set: u32,
    pub max_flags_set: u32,
    pub min_nonzero_vars: u32,
    pub max_nonzero_vars: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutProfile {
    pub id: String,
    pub game: GameCode,
    pub support_level: SupportLevel,
    pub encryption: Encryption,
    pub section_sizes: [u16; SECTIONS_PER_SLOT],
    pub save_block1: SaveBlock1Layout,
    pub save_block2: SaveBlock2Layout,
    pub storage: StorageLayout,
    /// Variant flag id -> canonical flag id used for name lookup.
    #[serde(default)]
    pub flag_aliases: BTreeMap<u16, u16>,
    pub sanity: SanityConfig,
}

// Emerald system flags start after the trainer flags.
const EMERALD_SYSTEM_FLAGS: u16 = 0x860;
const RS_SYSTEM_FLAGS: u16 = 0x800;
const SYS_POKEMON_GET: u16 = 0x0;
const SYS_POKEDEX_GET: u16 = 0x1;
const SYS_POKENAV_GET: u16 = 0x2;
const SYS_GAME_CLEAR: u16 = 0x4;
const SYS_BADGE01_GET: u16 = 0x7;
const BADGE_COUNT: u16 = 8;
/// Highest system flag offset worth aliasing between variants.
const SYSTEM_FLAG_SPAN: u16 = 0x80;

const FLAG_ADVENTURE_STARTED: u16 = 0x74;
const VAR_STARTER_MON: u16 = 0x4023;
const VAR_LITTLEROOT_INTRO_STATE: u16 = 0x4092;

const RELOCATED_SYSTEM_FLAG_SHIFT: u16 = 0x200;

/// Flag ids are 16 bits wide, so at most 0x10000 flags fit in the region.
pub const MAX_FLAG_BYTES: u16 = 0x2000;

fn system_flag_implications(base: u16) -> Vec<FlagImplication> {
    let mut implications = vec![
        FlagImplication {
            if_set: base + SYS_POKEDEX_GET,
            requires: base + SYS_POKEMON_GET,
        },
        FlagImplication {
            if_set: base + SYS_POKENAV_GET,
            requires: base + SYS_POKEMON_GET,
        },
        FlagImplication {
            if_set: base + SYS_BADGE01_GET,
            requires: base + SYS_POKEMON_GET,
        },
        FlagImplication {
            if_set: base + SYS_GAME_CLEAR,
            requires: base + SYS_BADGE01_GET + BADGE_COUNT - 1,
        },
    ];
    implications.extend((1..BADGE_COUNT).map(|badge| FlagImplication {
        if_set: base + SYS_BADGE01_GET + badge,
        requires: base + SYS_BADGE01_GET + badge - 1,
    }));
    implications
}

impl LayoutProfile {
    pub fn emerald_vanilla() -> Self {
        let mut implications = system_flag_implications(EMERALD_SYSTEM_FLAGS);
        implications.push(FlagImplication {
            if_set: EMERALD_SYSTEM_FLAGS + SYS_POKEMON_GET,
            requires: FLAG_ADVENTURE_STARTED,
        });

        LayoutProfile {
            id: "emerald_vanilla".to_owned(),
            game: GameCode::Emerald,
            support_level: SupportLevel::Stable,
            encryption: Encryption::Xor,
            section_sizes: [
                0xf2c, 0xf80, 0xf80, 0xf80, 0xf08, 0xf80, 0xf80, 0xf80, 0xf80, 0xf80, 0xf80,
                0xf80, 0xf80, 0x7d0,
            ],
            save_block1: SaveBlock1Layout {
                position: 0x0000,
                location: 0x0004,
                party_count: 0x0234,
                party: 0x0238,
                money: 0x0490,
                coins: 0x0494,
                registered_item: 0x0496,
                pc_items: PocketLayout {
                    offset: 0x0498,
                    capacity: 50,
                },
                items: PocketLayout {
                    offset: 0x0560,
                    capacity: 30,
                },
                key_items: PocketLayout {
                    offset: 0x05d8,
                    capacity: 30,
                },
                poke_balls: PocketLayout {
                    offset: 0x0650,
                    capacity: 16,
                },
                tms_hms: PocketLayout {
                    offset: 0x0690,
                    capacity: 64,
                },
                berries: PocketLayout {
                    offset: 0x0790,
                    capacity: 46,
                },
                flags: 0x1270,
                flag_bytes: 300,
                vars: 0x139c,
                var_count: 256,
            },
            save_block2: SaveBlock2Layout {
                player_name: 0x00,
                player_gender: 0x08,
                trainer_id: 0x0a,
                play_time: 0x0e,
                pokedex_owned: 0x28,
                pokedex_seen: 0x5c,
                encryption_key: 0xac,
            },
            storage: StorageLayout {
                current_box: 0x0000,
                boxes: 0x0004,
                box_names: 0x8344,
                box_count: 14,
                box_capacity: 30,
            },
            flag_aliases: BTreeMap::new(),
            sanity: SanityConfig {
                implications,
                progress_flags: vec![
                    FLAG_ADVENTURE_STARTED,
                    EMERALD_SYSTEM_FLAGS + SYS_POKEMON_GET,
                ],
                progress_vars: vec![VAR_STARTER_MON, VAR_LITTLEROOT_INTRO_STATE],
                min_flags_set: 3,
                max_flags_set: 1800,
                min_nonzero_vars: 1,
                max_nonzero_vars: 200,
            },
        }
    }

    /// Ruby and Sapphire share one layout. Their system flags sit lower than
    /// Emerald's, so they are aliased onto the Emerald ids used by the name
    /// tables.
    pub fn ruby_sapphire() -> Self {
        let emerald = Self::emerald_vanilla();
        LayoutProfile {
            id: "ruby_sapphire".to_owned(),
            game: GameCode::RubySapphire,
            encryption: Encryption::None,
            section_sizes: [
                0x890, 0xf80, 0xf80, 0xf80, 0xc40, 0xf80, 0xf80, 0xf80, 0xf80, 0xf80, 0xf80,
                0xf80, 0xf80, 0x7d0,
            ],
            save_block1: SaveBlock1Layout {
                items: PocketLayout {
                    offset: 0x0560,
                    capacity: 20,
                },
                key_items: PocketLayout {
                    offset: 0x05b0,
                    capacity: 20,
                },
                poke_balls: PocketLayout {
                    offset: 0x0600,
                    capacity: 16,
                },
                tms_hms: PocketLayout {
                    offset: 0x0640,
                    capacity: 64,
                },
                berries: PocketLayout {
                    offset: 0x0740,
                    capacity: 46,
                },
                flags: 0x1220,
                flag_bytes: 0x120,
                vars: 0x1340,
                ..emerald.save_block1
            },
            flag_aliases: system_flag_aliases(RS_SYSTEM_FLAGS, EMERALD_SYSTEM_FLAGS),
            sanity: SanityConfig {
                implications: system_flag_implications(RS_SYSTEM_FLAGS),
                progress_flags: vec![RS_SYSTEM_FLAGS + SYS_POKEMON_GET],
                progress_vars: Vec::new(),
                ..emerald.sanity
            },
            ..emerald
        }
    }

    /// Emerald hacks that enlarge the flag and var arrays and move them into
    /// the unused tail of SaveBlock1, shifting the system flags with them.
    pub fn emerald_relocated_flags() -> Self {
        let emerald = Self::emerald_vanilla();
        let relocated = EMERALD_SYSTEM_FLAGS + RELOCATED_SYSTEM_FLAG_SHIFT;
        let mut implications = system_flag_implications(relocated);
        implications.push(FlagImplication {
            if_set: relocated + SYS_POKEMON_GET,
            requires: FLAG_ADVENTURE_STARTED,
        });

        LayoutProfile {
            id: "emerald_relocated_flags".to_owned(),
            support_level: SupportLevel::Experimental,
            save_block1: SaveBlock1Layout {
                flags: 0x3a00,
                flag_bytes: 0x180,
                vars: 0x3b80,
                var_count: 256,
                ..emerald.save_block1
            },
            flag_aliases: system_flag_aliases(relocated, EMERALD_SYSTEM_FLAGS),
            sanity: SanityConfig {
                implications,
                progress_flags: vec![FLAG_ADVENTURE_STARTED, relocated + SYS_POKEMON_GET],
                ..emerald.sanity
            },
            ..emerald
        }
    }

    /// Builds a new profile by deep-merging `override_json` onto `base`.
    /// Objects merge key by key, every other value replaces the base value.
    pub fn derive(
        base: &LayoutProfile,
        id: &str,
        override_json: Value,
    ) -> Result<LayoutProfile, ProfileError> {
        if !override_json.is_object() {
            return Err(ProfileError::OverrideNotObject(id.to_owned()));
        }

        let mut merged = serde_json::to_value(base)?;
        merge_json(&mut merged, override_json);
        if let Some(fields) = merged.as_object_mut() {
            fields.insert("id".to_owned(), Value::String(id.to_owned()));
        }

        let profile: LayoutProfile = serde_json::from_value(merged)?;
        if profile.save_block1.flag_bytes > MAX_FLAG_BYTES {
            return Err(ProfileError::FlagBytesTooLarge {
                id: profile.id,
                flag_bytes: profile.save_block1.flag_bytes,
            });
        }
        log::debug!("Derived layout profile {} from {}", profile.id, base.id);
        Ok(profile)
    }

    /// Maps a stored flag id to the canonical id used for name lookup.
    pub fn canonical_flag(&self, flag_id: u16) -> u16 {
        self.flag_aliases.get(&flag_id).copied().unwrap_or(flag_id)
    }
}

fn system_flag_aliases(from: u16, to: u16) -> BTreeMap<u16, u16> {
    (0..SYSTEM_FLAG_SPAN)
        .map(|offset| (from + offset, to + offset))
        .collect()
}

fn merge_json(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_fields), Value::Object(patch_fields)) => {
            for (key, value) in patch_fields {
                match base_fields.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_fields.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

#[derive(Debug, Deserialize)]
struct ProfileDefinition {
    id: String,
    base: String,
    #[serde(rename = "override", default = "empty_override")]
    override_json: Value,
}

fn empty_override() -> Value {
    Value::Object(serde_json::Map::new())
}

/// An ordered, id-unique collection of layout profiles.
#[derive(Clone, Debug, Default)]
pub struct LayoutProfileRegistry {
    profiles: Vec<LayoutProfile>,
}

impl LayoutProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        LayoutProfileRegistry {
            profiles: vec![
                LayoutProfile::emerald_vanilla(),
                LayoutProfile::ruby_sapphire(),
                LayoutProfile::emerald_relocated_flags(),
            ],
        }
    }

    pub fn insert(&mut self, profile: LayoutProfile) -> Result<(), ProfileError> {
        if self.get(&profile.id).is_some() {
            return Err(ProfileError::DuplicateId(profile.id));
        }
        self.profiles.push(profile);
        Ok(())
    }

    /// Derives a profile from a base already in the registry and adds it.
    pub fn derive(&mut self, base: &str, id: &str, override_json: Value) -> Result<(), ProfileError> {
        let base = self
            .get(base)
            .ok_or_else(|| ProfileError::UnknownBase(base.to_owned()))?;
        let profile = LayoutProfile::derive(base, id, override_json)?;
        self.insert(profile)
    }

    /// Loads `[{"id", "base", "override"}]` definitions. Definitions may build on
    /// profiles defined earlier in the same document.
    pub fn load_overrides(&mut self, json_text: &str) -> Result<usize, ProfileError> {
        let definitions: Vec<ProfileDefinition> = serde_json::from_str(json_text)?;
        let count = definitions.len();
        for definition in definitions {
            self.derive(&definition.base, &definition.id, definition.override_json)?;
        }
        log::info!("Loaded {count} layout profile overrides");
        Ok(count)
    }

    pub fn get(&self, id: &str) -> Option<&LayoutProfile> {
        self.profiles.iter().find(|profile| profile.id == id)
    }

    pub fn profiles(&self) -> &[LayoutProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
