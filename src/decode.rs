//! Decodes the active slot into game state under a single layout profile.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::bitfield::{decode_flags, decode_vars, DecodedFlags, DecodedVars};
use crate::crypto::Decryptor;
use crate::decode_text;
use crate::layout::{Encryption, LayoutProfile, PocketLayout};
use crate::names::{MapResolver, NameTables};
use crate::pokemon::{is_empty_slot, Pokemon, PK3_SIZE_BOX, PK3_SIZE_PARTY};
use crate::reader::{Block, FieldReader};
use crate::TrainerId;

pub const PARTY_CAPACITY: u32 = 6;
const NATIONAL_DEX_COUNT: usize = 386;
const POKEDEX_FLAG_BYTES: usize = 52;
const BOX_NAME_LENGTH: usize = 9;
const ITEM_SLOT_SIZE: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PlayerGender {
    Male,
    Female,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePlayed {
    pub hours: u16,
    pub minutes: u8,
    pub seconds: u8,
    pub frames: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerInfo {
    pub player_name: String,
    pub player_gender: Option<PlayerGender>,
    pub id: TrainerId,
    pub time_played: TimePlayed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PokedexSummary {
    pub owned: u16,
    pub seen: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSlot {
    pub item_id: u16,
    pub quantity: u16,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bag {
    pub items: Vec<ItemSlot>,
    pub key_items: Vec<ItemSlot>,
    pub poke_balls: Vec<ItemSlot>,
    pub tms_hms: Vec<ItemSlot>,
    pub berries: Vec<ItemSlot>,
}

impl Bag {
    pub fn pockets(&self) -> [&[ItemSlot]; 5] {
        [
            &self.items,
            &self.key_items,
            &self.poke_balls,
            &self.tms_hms,
            &self.berries,
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub map_group: u8,
    pub map_number: u8,
    pub x: i16,
    pub y: i16,
    pub map_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxSlot {
    pub slot: u8,
    pub pokemon: Pokemon,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PcBox {
    pub number: u8,
    pub name: String,
    pub pokemon: Vec<BoxSlot>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PcStorage {
    pub current_box: u8,
    pub boxes: Vec<PcBox>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveData {
    pub trainer: Option<TrainerInfo>,
    pub pokedex: Option<PokedexSummary>,
    pub money: Option<u32>,
    pub coins: Option<u16>,
    pub registered_item: Option<u16>,
    pub bag: Bag,
    pub pc_items: Vec<ItemSlot>,
    pub party: Vec<Pokemon>,
    pub pc_storage: Option<PcStorage>,
    pub location: Option<Location>,
    pub flags: Vec<String>,
    pub vars: BTreeMap<String, u16>,
}

/// A full decode under one profile, with the raw observations the sanity
/// scorer needs alongside the user-facing data.
#[derive(Clone, Debug)]
pub struct ProfileDecode {
    pub save_data: SaveData,
    pub encryption_key: u32,
    /// The word at the profile's key offset, whatever the encryption mode.
    pub raw_key_field: Option<u32>,
    pub raw_party_count: Option<u32>,
    pub flags: DecodedFlags,
    pub vars: DecodedVars,
}

pub fn decode_with_profile(
    reader: &FieldReader<'_>,
    profile: &LayoutProfile,
    names: &NameTables,
    map_resolver: Option<&dyn MapResolver>,
) -> ProfileDecode {
    let sb1 = &profile.save_block1;
    let sb2 = &profile.save_block2;

    let raw_key_field = reader.read_u32(Block::SaveBlock2, sb2.encryption_key as usize);
    let encryption_key = match profile.encryption {
        Encryption::Xor => raw_key_field.unwrap_or(0),
        Encryption::None => 0,
    };
    let decryptor = Decryptor::new(profile.encryption, encryption_key);
    log::debug!(
        "Decoding with profile {} (key 0x{:08x})",
        profile.id,
        decryptor.key()
    );

    let raw_party_count = reader.read_u32(Block::SaveBlock1, sb1.party_count as usize);
    let party = read_party(reader, profile, raw_party_count.unwrap_or(0));

    let flags = reader
        .read_bytes(Block::SaveBlock1, sb1.flags as usize, sb1.flag_bytes as usize)
        .map(|bytes| decode_flags(&bytes, profile, names))
        .unwrap_or_default();
    let vars = reader
        .read_bytes(Block::SaveBlock1, sb1.vars as usize, sb1.var_count as usize * 2)
        .map(|bytes| decode_vars(&bytes, names))
        .unwrap_or_default();

    let save_data = SaveData {
        trainer: read_trainer_info(reader, profile),
        pokedex: read_pokedex(reader, profile),
        money: reader
            .read_u32(Block::SaveBlock1, sb1.money as usize)
            .map(|raw| decryptor.money(raw)),
        coins: reader
            .read_u16(Block::SaveBlock1, sb1.coins as usize)
            .map(|raw| decryptor.coins(raw)),
        registered_item: reader
            .read_u16(Block::SaveBlock1, sb1.registered_item as usize)
            .map(|raw| decryptor.registered_item(raw)),
        bag: Bag {
            items: read_pocket(reader, &sb1.items, Some(&decryptor)),
            key_items: read_pocket(reader, &sb1.key_items, Some(&decryptor)),
            poke_balls: read_pocket(reader, &sb1.poke_balls, Some(&decryptor)),
            tms_hms: read_pocket(reader, &sb1.tms_hms, Some(&decryptor)),
            berries: read_pocket(reader, &sb1.berries, Some(&decryptor)),
        },
        pc_items: read_pocket(reader, &sb1.pc_items, None),
        party,
        pc_storage: read_pc_storage(reader, profile),
        location: read_location(reader, profile, map_resolver),
        flags: flags.names.clone(),
        vars: vars.named.clone(),
    };

    ProfileDecode {
        save_data,
        encryption_key: decryptor.key(),
        raw_key_field,
        raw_party_count,
        flags,
        vars,
    }
}

fn read_trainer_info(reader: &FieldReader<'_>, profile: &LayoutProfile) -> Option<TrainerInfo> {
    let sb2 = &profile.save_block2;
    let player_name = reader.read_bytes(Block::SaveBlock2, sb2.player_name as usize, 7)?;
    let player_gender = match reader.read_u8(Block::SaveBlock2, sb2.player_gender as usize)? {
        0x00 => Some(PlayerGender::Male),
        0x01 => Some(PlayerGender::Female),
        other => {
            log::debug!("Invalid player gender: 0x{other:x}");
            None
        }
    };
    let trainer_id = reader.read_u32(Block::SaveBlock2, sb2.trainer_id as usize)?;
    let play_time = sb2.play_time as usize;

    Some(TrainerInfo {
        player_name: decode_text(&player_name),
        player_gender,
        id: TrainerId::from(trainer_id),
        time_played: TimePlayed {
            hours: reader.read_u16(Block::SaveBlock2, play_time)?,
            minutes: reader.read_u8(Block::SaveBlock2, play_time + 2)?,
            seconds: reader.read_u8(Block::SaveBlock2, play_time + 3)?,
            frames: reader.read_u8(Block::SaveBlock2, play_time + 4)?,
        },
    })
}

fn read_pokedex(reader: &FieldReader<'_>, profile: &LayoutProfile) -> Option<PokedexSummary> {
    let sb2 = &profile.save_block2;
    let count = |offset: u16| -> Option<u16> {
        let bytes = reader.read_bytes(Block::SaveBlock2, offset as usize, POKEDEX_FLAG_BYTES)?;
        Some(
            (0..NATIONAL_DEX_COUNT)
                .filter(|bit| bytes[bit / 8] & (1 << (bit % 8)) != 0)
                .count() as u16,
        )
    };
    Some(PokedexSummary {
        owned: count(sb2.pokedex_owned)?,
        seen: count(sb2.pokedex_seen)?,
    })
}

fn read_pocket(
    reader: &FieldReader<'_>,
    pocket: &PocketLayout,
    decryptor: Option<&Decryptor>,
) -> Vec<ItemSlot> {
    (0..pocket.capacity as usize)
        .filter_map(|slot| {
            let offset = pocket.offset as usize + slot * ITEM_SLOT_SIZE;
            let item_id = reader.read_u16(Block::SaveBlock1, offset)?;
            if item_id == 0 {
                return None;
            }
            let raw_quantity = reader.read_u16(Block::SaveBlock1, offset + 2)?;
            let quantity = match decryptor {
                Some(decryptor) => decryptor.quantity(raw_quantity),
                None => raw_quantity,
            };
            Some(ItemSlot { item_id, quantity })
        })
        .collect()
}

fn read_party(reader: &FieldReader<'_>, profile: &LayoutProfile, raw_count: u32) -> Vec<Pokemon> {
    let party_offset = profile.save_block1.party as usize;
    (0..raw_count.min(PARTY_CAPACITY) as usize)
        .filter_map(|index| {
            let offset = party_offset + index * PK3_SIZE_PARTY;
            let pk3_data = reader.read_bytes(Block::SaveBlock1, offset, PK3_SIZE_PARTY)?;
            if is_empty_slot(&pk3_data) {
                log::debug!("Party slot {index} is empty despite party count {raw_count}");
                return None;
            }
            match Pokemon::from_pk3(&pk3_data) {
                Ok(pkmn) => Some(pkmn),
                Err(err) => {
                    log::warn!("Failed to decode party slot {index}: {err}");
                    None
                }
            }
        })
        .collect()
}

fn read_pc_storage(reader: &FieldReader<'_>, profile: &LayoutProfile) -> Option<PcStorage> {
    let storage = &profile.storage;
    let current_box = reader.read_u8(Block::PokemonStorage, storage.current_box as usize)?;
    let box_capacity = storage.box_capacity as usize;

    let boxes = (0..storage.box_count as usize)
        .map(|box_index| {
            let name = reader
                .read_bytes(
                    Block::PokemonStorage,
                    storage.box_names as usize + box_index * BOX_NAME_LENGTH,
                    BOX_NAME_LENGTH,
                )
                .map(|bytes| decode_text(&bytes))
                .unwrap_or_default();

            let pokemon = (0..box_capacity)
                .filter_map(|slot| {
                    let offset =
                        storage.boxes as usize + (box_index * box_capacity + slot) * PK3_SIZE_BOX;
                    let pk3_data = reader.read_bytes(Block::PokemonStorage, offset, PK3_SIZE_BOX)?;
                    if is_empty_slot(&pk3_data) {
                        return None;
                    }
                    log::trace!("Parsing PK3 from box {} slot {}", box_index + 1, slot + 1);
                    match Pokemon::from_pk3(&pk3_data) {
                        Ok(pokemon) => Some(BoxSlot {
                            slot: slot as u8 + 1,
                            pokemon,
                        }),
                        Err(err) => {
                            log::warn!(
                                "Failed to decode box {} slot {}: {err}",
                                box_index + 1,
                                slot + 1
                            );
                            None
                        }
                    }
                })
                .collect();

            PcBox {
                number: box_index as u8 + 1,
                name,
                pokemon,
            }
        })
        .collect();

    Some(PcStorage { current_box, boxes })
}

fn read_location(
    reader: &FieldReader<'_>,
    profile: &LayoutProfile,
    map_resolver: Option<&dyn MapResolver>,
) -> Option<Location> {
    let sb1 = &profile.save_block1;
    let map_group = reader.read_u8(Block::SaveBlock1, sb1.location as usize)?;
    let map_number = reader.read_u8(Block::SaveBlock1, sb1.location as usize + 1)?;
    Some(Location {
        map_group,
        map_number,
        x: reader.read_i16(Block::SaveBlock1, sb1.position as usize)?,
        y: reader.read_i16(Block::SaveBlock1, sb1.position as usize + 2)?,
        map_name: map_resolver.and_then(|resolver| resolver.map_name(map_group, map_number)),
    })
}
