//! Read-only id -> name lookup data consumed by the decoder.
//!
//! The full flag and var tables are generated elsewhere and loaded as JSON.
//! `NameTables::builtin` only covers the story anchors and badges.

use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug, Default)]
pub struct NameTables {
    pub flags: HashMap<u16, String>,
    pub vars: HashMap<u16, String>,
}

const BUILTIN_FLAGS: &[(u16, &str)] = &[
    (0x0074, "FLAG_ADVENTURE_STARTED"),
    (0x0860, "FLAG_SYS_POKEMON_GET"),
    (0x0861, "FLAG_SYS_POKEDEX_GET"),
    (0x0862, "FLAG_SYS_POKENAV_GET"),
    (0x0864, "FLAG_SYS_GAME_CLEAR"),
    (0x0867, "FLAG_BADGE01_GET"),
    (0x0868, "FLAG_BADGE02_GET"),
    (0x0869, "FLAG_BADGE03_GET"),
    (0x086a, "FLAG_BADGE04_GET"),
    (0x086b, "FLAG_BADGE05_GET"),
    (0x086c, "FLAG_BADGE06_GET"),
    (0x086d, "FLAG_BADGE07_GET"),
    (0x086e, "FLAG_BADGE08_GET"),
];

const BUILTIN_VARS: &[(u16, &str)] = &[
    (0x4023, "VAR_STARTER_MON"),
    (0x4084, "VAR_BIRCH_LAB_STATE"),
    (0x4092, "VAR_LITTLEROOT_INTRO_STATE"),
];

impl NameTables {
    pub fn builtin() -> Self {
        NameTables {
            flags: to_table(BUILTIN_FLAGS),
            vars: to_table(BUILTIN_VARS),
        }
    }

    /// Loads generated tables shaped as `{"FLAG_NAME": id, ...}`.
    pub fn from_json(flags_json: &str, vars_json: &str) -> Result<Self, serde_json::Error> {
        Ok(NameTables {
            flags: table_from_json(flags_json)?,
            vars: table_from_json(vars_json)?,
        })
    }

    pub fn flag_name(&self, flag_id: u16) -> Option<&str> {
        self.flags.get(&flag_id).map(String::as_str)
    }

    pub fn var_name(&self, var_id: u16) -> Option<&str> {
        self.vars.get(&var_id).map(String::as_str)
    }
}

fn to_table(entries: &[(u16, &str)]) -> HashMap<u16, String> {
    entries
        .iter()
        .map(|(id, name)| (*id, (*name).to_owned()))
        .collect()
}

/// Parses a `{"NAME": id}` document into an id -> name table.
pub fn table_from_json(json_text: &str) -> Result<HashMap<u16, String>, serde_json::Error> {
    let by_name: BTreeMap<String, u16> = serde_json::from_str(json_text)?;
    Ok(by_name.into_iter().map(|(name, id)| (id, name)).collect())
}

/// Resolves a map group and number to the game's internal map identifier.
/// Only used to label warp locations.
pub trait MapResolver {
    fn map_name(&self, map_group: u8, map_number: u8) -> Option<String>;
}

impl MapResolver for HashMap<(u8, u8), String> {
    fn map_name(&self, map_group: u8, map_number: u8) -> Option<String> {
        self.get(&(map_group, map_number)).cloned()
    }
}
