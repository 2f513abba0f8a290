use std::collections::{BTreeMap, BTreeSet};

use byteorder::{ByteOrder, LittleEndian};

use crate::layout::LayoutProfile;
use crate::names::NameTables;

pub const VAR_BASE: u16 = 0x4000;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedFlags {
    /// Every set bit, by stored id, named or not.
    pub set_ids: BTreeSet<u16>,
    /// Names of the set flags that resolve, in id order.
    pub names: Vec<String>,
}

impl DecodedFlags {
    pub fn is_set(&self, flag_id: u16) -> bool {
        self.set_ids.contains(&flag_id)
    }

    pub fn set_count(&self) -> usize {
        self.set_ids.len()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedVars {
    /// Every nonzero var, by id.
    pub nonzero: BTreeMap<u16, u16>,
    /// Nonzero vars that resolve to a name.
    pub named: BTreeMap<String, u16>,
}

impl DecodedVars {
    pub fn value(&self, var_id: u16) -> u16 {
        self.nonzero.get(&var_id).copied().unwrap_or(0)
    }

    pub fn nonzero_count(&self) -> usize {
        self.nonzero.len()
    }
}

/// Expands the flag bit array. Set bits without a name are counted but not
/// named; unset bits produce nothing.
pub fn decode_flags(bytes: &[u8], profile: &LayoutProfile, names: &NameTables) -> DecodedFlags {
    let mut decoded = DecodedFlags::default();
    for (byte_index, byte) in bytes.iter().enumerate() {
        if *byte == 0 {
            continue;
        }
        for bit_index in 0..8 {
            if byte & (1 << bit_index) == 0 {
                continue;
            }
            let flag_id = (byte_index * 8 + bit_index) as u16;
            decoded.set_ids.insert(flag_id);
            let canonical = profile.canonical_flag(flag_id);
            if let Some(name) = names.flag_name(canonical) {
                decoded.names.push(name.to_owned());
            }
        }
    }
    log::trace!(
        "{} flags set, {} named",
        decoded.set_count(),
        decoded.names.len()
    );
    decoded
}

/// Expands the var array. Zero vars are skipped.
pub fn decode_vars(bytes: &[u8], names: &NameTables) -> DecodedVars {
    let mut decoded = DecodedVars::default();
    for (index, word) in bytes.chunks_exact(2).enumerate() {
        let value = LittleEndian::read_u16(word);
        if value == 0 {
            continue;
        }
        let var_id = VAR_BASE + index as u16;
        decoded.nonzero.insert(var_id, value);
        if let Some(name) = names.var_name(var_id) {
            decoded.named.insert(name.to_owned(), value);
        }
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_only_named_set_flags() {
        let profile = LayoutProfile::emerald_vanilla();
        let names = NameTables::builtin();
        let mut bytes = vec![0u8; 300];
        bytes[0x74 / 8] |= 1 << (0x74 % 8);
        bytes[0x860 / 8] |= 1 << (0x860 % 8);
        bytes[3] = 0xff; // unnamed flags 24..32

        let flags = decode_flags(&bytes, &profile, &names);
        assert_eq!(flags.names, vec!["FLAG_ADVENTURE_STARTED", "FLAG_SYS_POKEMON_GET"]);
        assert_eq!(flags.set_count(), 10);
        assert!(flags.is_set(24));
        assert!(!flags.is_set(0x861));
    }

    #[test]
    fn aliases_resolve_relocated_flags() {
        let profile = LayoutProfile::emerald_relocated_flags();
        let names = NameTables::builtin();
        let mut bytes = vec![0u8; 0x180];
        bytes[0xa67 / 8] |= 1 << (0xa67 % 8);

        let flags = decode_flags(&bytes, &profile, &names);
        assert_eq!(flags.names, vec!["FLAG_BADGE01_GET"]);
        assert!(flags.is_set(0xa67));
    }

    #[test]
    fn skips_zero_and_unnamed_vars() {
        let names = NameTables::builtin();
        let mut bytes = vec![0u8; 512];
        LittleEndian::write_u16(&mut bytes[0x23 * 2..], 2);
        LittleEndian::write_u16(&mut bytes[0x10 * 2..], 7);

        let vars = decode_vars(&bytes, &names);
        assert_eq!(vars.named.len(), 1);
        assert_eq!(vars.named.get("VAR_STARTER_MON"), Some(&2));
        assert_eq!(vars.nonzero_count(), 2);
        assert_eq!(vars.value(0x4010), 7);
        assert_eq!(vars.value(0x4092), 0);
        assert!(!vars.named.values().any(|value| *value == 0));
    }
}
