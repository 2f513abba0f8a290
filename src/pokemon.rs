use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::Serialize;
use std::io::{self, Cursor, Read};

use super::{decode_text, TrainerId};

pub const PK3_SIZE_PARTY: usize = 100;
pub const PK3_SIZE_BOX: usize = 80;
const SUBSTRUCTURE_OFFSET: usize = 32;
const SUBSTRUCTURE_SIZE: usize = 12;
const PAYLOAD_SIZE: usize = 48;
const CHECKSUM_OFFSET: usize = 28;

/// Highest internal species index; 412 is the egg placeholder.
pub const MAX_SPECIES: u16 = 411;

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, Serialize)]
pub enum Language {
    Japanese = 1,
    English = 2,
    French = 3,
    Italian = 4,
    German = 5,
    Spanish = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Substructure {
    Growth = 0,
    Attacks = 1,
    EvsCondition = 2,
    Miscellaneous = 3,
}

/// Physical storage order of the four substructures, indexed by
/// `personality % 24`. Entry `[i][slot]` is the substructure stored in `slot`.
pub const SUBSTRUCTURE_ORDER: [[Substructure; 4]; 24] = {
    use Substructure::{Attacks as A, EvsCondition as E, Growth as G, Miscellaneous as M};
    [
        [G, A, E, M],
        [G, A, M, E],
        [G, E, A, M],
        [G, E, M, A],
        [G, M, A, E],
        [G, M, E, A],
        [A, G, E, M],
        [A, G, M, E],
        [A, E, G, M],
        [A, E, M, G],
        [A, M, G, E],
        [A, M, E, G],
        [E, G, A, M],
        [E, G, M, A],
        [E, A, G, M],
        [E, A, M, G],
        [E, M, G, A],
        [E, M, A, G],
        [M, G, A, E],
        [M, G, E, A],
        [M, A, G, E],
        [M, A, E, G],
        [M, E, G, A],
        [M, E, A, G],
    ]
};

pub type SubstructureBytes = [[u8; SUBSTRUCTURE_SIZE]; 4];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Gender {
    Male,
    Female,
    Genderless,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Growth {
    pub species: u16,
    pub held_item: u16,
    pub experience: u32,
    pub pp_bonuses: u8,
    pub friendship: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attacks {
    pub moves: [u16; 4],
    pub pp: [u8; 4],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// HP, Attack, Defense, Speed, Sp. Attack, Sp. Defense.
    pub evs: [u8; 6],
    /// Cool, Beauty, Cute, Smart, Tough, Sheen.
    pub contest: [u8; 6],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Misc {
    pub pokerus: u8,
    pub met_location: u8,
    pub met_level: u8,
    pub origin_game: u8,
    pub ball: u8,
    pub ot_gender: u8,
    /// HP, Attack, Defense, Speed, Sp. Attack, Sp. Defense.
    pub ivs: [u8; 6],
    pub is_egg: bool,
    pub ability_bit: u8,
    pub ribbons: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyStats {
    pub status: u32,
    pub level: u8,
    pub pokerus_days: u8,
    pub current_hp: u16,
    pub max_hp: u16,
    pub attack: u16,
    pub defense: u16,
    pub speed: u16,
    pub sp_attack: u16,
    pub sp_defense: u16,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EggData {
    pub is_bad_egg: bool,
    pub has_species: bool,
    pub use_egg_name: bool,
}

impl From<u8> for EggData {
    fn from(value: u8) -> Self {
        EggData {
            is_bad_egg: (value & 0b1) != 0,
            has_species: (value & 0b10) != 0,
            use_egg_name: (value & 0b100) != 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pokemon {
    pub personality_value: u32,
    pub original_trainer_id: TrainerId,
    pub nickname: String,
    pub origin_language: Option<Language>,
    pub egg_data: EggData,
    pub original_trainer_name: String,
    pub markings: u8,
    pub checksum_valid: bool,
    pub growth: Growth,
    pub attacks: Attacks,
    pub condition: Condition,
    pub misc: Misc,
    pub party_stats: Option<PartyStats>,
    pub is_shiny: bool,
    pub nature: u8,
    pub ability_slot: u8,
    pub gender_value: u8,
    #[serde(skip)]
    header: [u8; SUBSTRUCTURE_OFFSET],
    #[serde(skip)]
    party_data: Option<[u8; PK3_SIZE_PARTY - PK3_SIZE_BOX]>,
}

impl Pokemon {
    /// Decodes an 80-byte box record or a 100-byte party record.
    pub fn from_pk3(pk3: &[u8]) -> io::Result<Self> {
        if pk3.len() < PK3_SIZE_BOX {
            log::error!(
                "Expected at least {PK3_SIZE_BOX} bytes for pk3 data, got {}",
                pk3.len()
            );
            return Err(io::ErrorKind::InvalidData.into());
        }

        let mut header = [0u8; SUBSTRUCTURE_OFFSET];
        header.copy_from_slice(&pk3[..SUBSTRUCTURE_OFFSET]);

        let mut cursor = Cursor::new(&header[..]);
        let personality_value = cursor.read_u32::<LittleEndian>()?;
        let original_trainer_id = TrainerId::from(cursor.read_u32::<LittleEndian>()?);
        let mut nickname = [0u8; 10];
        cursor.read_exact(&mut nickname)?;
        let origin_language = Language::from_u8(cursor.read_u8()?);
        let egg_data = EggData::from(cursor.read_u8()?);
        let mut original_trainer_name = [0u8; 7];
        cursor.read_exact(&mut original_trainer_name)?;
        let markings = cursor.read_u8()?;
        let checksum = cursor.read_u16::<LittleEndian>()?;

        let mut stored = [0u8; PAYLOAD_SIZE];
        stored.copy_from_slice(&pk3[SUBSTRUCTURE_OFFSET..PK3_SIZE_BOX]);
        let logical = decrypt_payload(personality_value, original_trainer_id.into(), &stored);
        let checksum_valid = compute_checksum(&logical) == checksum;
        if !checksum_valid {
            log::debug!("PK3 checksum mismatch for personality 0x{personality_value:08x}");
        }

        let party_data = if pk3.len() >= PK3_SIZE_PARTY {
            let mut party_data = [0u8; PK3_SIZE_PARTY - PK3_SIZE_BOX];
            party_data.copy_from_slice(&pk3[PK3_SIZE_BOX..PK3_SIZE_PARTY]);
            Some(party_data)
        } else {
            None
        };

        let pkmn = Pokemon {
            personality_value,
            original_trainer_id,
            nickname: decode_text(&nickname),
            origin_language,
            egg_data,
            original_trainer_name: decode_text(&original_trainer_name),
            markings,
            checksum_valid,
            growth: read_growth(&logical[Substructure::Growth as usize]),
            attacks: read_attacks(&logical[Substructure::Attacks as usize]),
            condition: read_condition(&logical[Substructure::EvsCondition as usize]),
            misc: read_misc(&logical[Substructure::Miscellaneous as usize]),
            party_stats: party_data.as_ref().map(|data| read_party_stats(data)),
            is_shiny: is_shiny(personality_value, original_trainer_id),
            nature: (personality_value % 25) as u8,
            ability_slot: (personality_value & 1) as u8,
            gender_value: (personality_value & 0xff) as u8,
            header,
            party_data,
        };
        Ok(pkmn)
    }

    /// Re-encodes the record with its own personality and trainer id. The
    /// checksum is recomputed from the current substructure values.
    pub fn to_pk3(&self) -> Vec<u8> {
        let logical = [
            write_growth(&self.growth),
            write_attacks(&self.attacks),
            write_condition(&self.condition),
            write_misc(&self.misc),
        ];

        let mut header = self.header;
        LittleEndian::write_u16(&mut header[CHECKSUM_OFFSET..], compute_checksum(&logical));

        let mut pk3 = header.to_vec();
        pk3.extend_from_slice(&encrypt_payload(
            self.personality_value,
            self.original_trainer_id.into(),
            &logical,
        ));
        if let Some(party_data) = &self.party_data {
            pk3.extend_from_slice(party_data);
        }
        pk3
    }

    pub fn species(&self) -> u16 {
        self.growth.species
    }

    pub fn is_egg(&self) -> bool {
        self.misc.is_egg
    }

    /// `ratio` is the species' gender threshold: 0 is all male, 254 all female
    /// and 255 genderless.
    pub fn gender(&self, ratio: u8) -> Gender {
        match ratio {
            255 => Gender::Genderless,
            254 => Gender::Female,
            0 => Gender::Male,
            _ if self.gender_value < ratio => Gender::Female,
            _ => Gender::Male,
        }
    }
}

/// An all-zero record marks an empty slot.
pub fn is_empty_slot(pk3: &[u8]) -> bool {
    pk3.iter().all(|byte| *byte == 0x00)
}

pub fn is_shiny(personality_value: u32, trainer_id: TrainerId) -> bool {
    let personality_high = (personality_value >> 16) as u16;
    let personality_low = (personality_value & 0xffff) as u16;
    (trainer_id.public_id ^ trainer_id.secret_id ^ personality_high ^ personality_low) < 8
}

/// Decrypts the stored payload and then reorders it into logical order
/// (Growth, Attacks, EVs & Condition, Miscellaneous).
pub fn decrypt_payload(
    personality_value: u32,
    original_trainer_id: u32,
    stored: &[u8; PAYLOAD_SIZE],
) -> SubstructureBytes {
    let mut decrypted = *stored;
    xor_payload(&mut decrypted, personality_value ^ original_trainer_id);

    let order = &SUBSTRUCTURE_ORDER[(personality_value % 24) as usize];
    let mut logical = [[0u8; SUBSTRUCTURE_SIZE]; 4];
    for (slot, chunk) in decrypted.chunks_exact(SUBSTRUCTURE_SIZE).enumerate() {
        logical[order[slot] as usize].copy_from_slice(chunk);
    }
    logical
}

/// Inverse of [`decrypt_payload`]: lays the substructures out in storage
/// order and then encrypts them.
pub fn encrypt_payload(
    personality_value: u32,
    original_trainer_id: u32,
    logical: &SubstructureBytes,
) -> [u8; PAYLOAD_SIZE] {
    let order = &SUBSTRUCTURE_ORDER[(personality_value % 24) as usize];
    let mut stored = [0u8; PAYLOAD_SIZE];
    for (slot, chunk) in stored.chunks_exact_mut(SUBSTRUCTURE_SIZE).enumerate() {
        chunk.copy_from_slice(&logical[order[slot] as usize]);
    }
    xor_payload(&mut stored, personality_value ^ original_trainer_id);
    stored
}

fn xor_payload(payload: &mut [u8], key: u32) {
    for word in payload.chunks_exact_mut(4) {
        let value = LittleEndian::read_u32(word) ^ key;
        LittleEndian::write_u32(word, value);
    }
}

fn compute_checksum(logical: &SubstructureBytes) -> u16 {
    logical
        .iter()
        .flat_map(|chunk| chunk.chunks_exact(2))
        .map(LittleEndian::read_u16)
        .fold(0u16, u16::wrapping_add)
}

fn read_growth(data: &[u8; SUBSTRUCTURE_SIZE]) -> Growth {
    Growth {
        species: LittleEndian::read_u16(&data[0..]),
        held_item: LittleEndian::read_u16(&data[2..]),
        experience: LittleEndian::read_u32(&data[4..]),
        pp_bonuses: data[8],
        friendship: data[9],
    }
}

fn write_growth(growth: &Growth) -> [u8; SUBSTRUCTURE_SIZE] {
    let mut data = [0u8; SUBSTRUCTURE_SIZE];
    LittleEndian::write_u16(&mut data[0..], growth.species);
    LittleEndian::write_u16(&mut data[2..], growth.held_item);
    LittleEndian::write_u32(&mut data[4..], growth.experience);
    data[8] = growth.pp_bonuses;
    data[9] = growth.friendship;
    data
}

fn read_attacks(data: &[u8; SUBSTRUCTURE_SIZE]) -> Attacks {
    let mut moves = [0u16; 4];
    LittleEndian::read_u16_into(&data[..8], &mut moves);
    let mut pp = [0u8; 4];
    pp.copy_from_slice(&data[8..]);
    Attacks { moves, pp }
}

fn write_attacks(attacks: &Attacks) -> [u8; SUBSTRUCTURE_SIZE] {
    let mut data = [0u8; SUBSTRUCTURE_SIZE];
    LittleEndian::write_u16_into(&attacks.moves, &mut data[..8]);
    data[8..].copy_from_slice(&attacks.pp);
    data
}

fn read_condition(data: &[u8; SUBSTRUCTURE_SIZE]) -> Condition {
    let mut evs = [0u8; 6];
    let mut contest = [0u8; 6];
    evs.copy_from_slice(&data[..6]);
    contest.copy_from_slice(&data[6..]);
    Condition { evs, contest }
}

fn write_condition(condition: &Condition) -> [u8; SUBSTRUCTURE_SIZE] {
    let mut data = [0u8; SUBSTRUCTURE_SIZE];
    data[..6].copy_from_slice(&condition.evs);
    data[6..].copy_from_slice(&condition.contest);
    data
}

fn read_misc(data: &[u8; SUBSTRUCTURE_SIZE]) -> Misc {
    let origin_info = LittleEndian::read_u16(&data[2..]);
    let ivs_egg_ability_blob = LittleEndian::read_u32(&data[4..]);
    let mut ivs = [0u8; 6];
    for (idx, iv) in ivs.iter_mut().enumerate() {
        *iv = ((ivs_egg_ability_blob >> (5 * idx)) & 0b11111) as u8;
    }

    Misc {
        pokerus: data[0],
        met_location: data[1],
        met_level: (origin_info & 0x7f) as u8,
        origin_game: ((origin_info >> 7) & 0xf) as u8,
        ball: ((origin_info >> 11) & 0xf) as u8,
        ot_gender: (origin_info >> 15) as u8,
        ivs,
        is_egg: ((ivs_egg_ability_blob >> 30) & 0b1) != 0,
        ability_bit: ((ivs_egg_ability_blob >> 31) & 0b1) as u8,
        ribbons: LittleEndian::read_u32(&data[8..]),
    }
}

fn write_misc(misc: &Misc) -> [u8; SUBSTRUCTURE_SIZE] {
    let mut data = [0u8; SUBSTRUCTURE_SIZE];
    data[0] = misc.pokerus;
    data[1] = misc.met_location;
    let origin_info = (misc.met_level as u16 & 0x7f)
        | (misc.origin_game as u16 & 0xf) << 7
        | (misc.ball as u16 & 0xf) << 11
        | (misc.ot_gender as u16 & 0b1) << 15;
    LittleEndian::write_u16(&mut data[2..], origin_info);

    let mut blob = misc
        .ivs
        .iter()
        .enumerate()
        .fold(0u32, |blob, (idx, iv)| blob | ((*iv as u32 & 0b11111) << (5 * idx)));
    blob |= (misc.is_egg as u32) << 30;
    blob |= (misc.ability_bit as u32 & 0b1) << 31;
    LittleEndian::write_u32(&mut data[4..], blob);
    LittleEndian::write_u32(&mut data[8..], misc.ribbons);
    data
}

fn read_party_stats(data: &[u8; PK3_SIZE_PARTY - PK3_SIZE_BOX]) -> PartyStats {
    PartyStats {
        status: LittleEndian::read_u32(&data[0..]),
        level: data[4],
        pokerus_days: data[5],
        current_hp: LittleEndian::read_u16(&data[6..]),
        max_hp: LittleEndian::read_u16(&data[8..]),
        attack: LittleEndian::read_u16(&data[10..]),
        defense: LittleEndian::read_u16(&data[12..]),
        speed: LittleEndian::read_u16(&data[14..]),
        sp_attack: LittleEndian::read_u16(&data[16..]),
        sp_defense: LittleEndian::read_u16(&data[18..]),
    }
}
