//! Builds synthetic flash dumps from logical SaveBlock contents.
#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian};
use pksav::encode_text;
use pksav::layout::LayoutProfile;
use pksav::pokemon::encrypt_payload;
use pksav::save::{
    compute_section_checksum, SlotId, SECTIONS_PER_SLOT, SECTOR_DATA_SIZE, SECTOR_SIGNATURE,
    SECTOR_SIZE,
};

pub const FLASH_SIZE: usize = 0x20000;
pub const ENCRYPTION_KEY: u32 = 0x5a3c_91e7;
pub const TRAINER_ID: u32 = 0x1234_5678;
pub const MONEY: u32 = 3000;
pub const COINS: u16 = 50;

pub const VANILLA_FLAGS: usize = 0x1270;
pub const VANILLA_VARS: usize = 0x139c;
pub const VANILLA_SYSTEM_FLAGS: u16 = 0x860;
pub const RELOCATED_FLAGS: usize = 0x3a00;
pub const RELOCATED_VARS: usize = 0x3b80;
pub const RELOCATED_SYSTEM_FLAGS: u16 = 0xa60;

const FLAG_ADVENTURE_STARTED: u16 = 0x74;

pub struct SaveBuilder {
    section_sizes: [u16; SECTIONS_PER_SLOT],
    pub save_block2: Vec<u8>,
    pub save_block1: Vec<u8>,
    pub storage: Vec<u8>,
}

impl SaveBuilder {
    pub fn new() -> Self {
        let section_sizes = LayoutProfile::emerald_vanilla().section_sizes;
        let block_len = |range: std::ops::Range<usize>| -> usize {
            section_sizes[range].iter().map(|size| *size as usize).sum()
        };
        SaveBuilder {
            section_sizes,
            save_block2: vec![0u8; block_len(0..1)],
            save_block1: vec![0u8; block_len(1..5)],
            storage: vec![0u8; block_len(5..14)],
        }
    }

    /// A freshly progressed Emerald save: starter chosen, two badges.
    pub fn vanilla_emerald() -> Self {
        let mut builder = Self::new();
        builder.write_trainer();
        builder.write_inventory();
        builder.write_party();
        builder.write_storage();
        builder.write_story_progress(VANILLA_FLAGS, VANILLA_VARS, VANILLA_SYSTEM_FLAGS);
        builder
    }

    /// The same progress with flags and vars moved to the end of SaveBlock1 and
    /// the system flags shifted, as enlarged-flag hacks do.
    pub fn relocated_hack() -> Self {
        let mut builder = Self::new();
        builder.write_trainer();
        builder.write_inventory();
        builder.write_party();
        builder.write_storage();
        builder.write_story_progress(RELOCATED_FLAGS, RELOCATED_VARS, RELOCATED_SYSTEM_FLAGS);
        builder
    }

    pub fn write_trainer(&mut self) {
        let sb2 = &mut self.save_block2;
        sb2[0x00..0x07].copy_from_slice(&encode_text("MAY", 7));
        sb2[0x08] = 1;
        LittleEndian::write_u32(&mut sb2[0x0a..], TRAINER_ID);
        LittleEndian::write_u16(&mut sb2[0x0e..], 12);
        sb2[0x10] = 34;
        sb2[0x11] = 56;
        sb2[0x12] = 7;
        // three owned, five seen
        sb2[0x28] = 0b0000_0111;
        sb2[0x5c] = 0b0001_1111;
        LittleEndian::write_u32(&mut sb2[0xac..], ENCRYPTION_KEY);
    }

    pub fn write_inventory(&mut self) {
        let low_key = (ENCRYPTION_KEY & 0xffff) as u16;
        let sb1 = &mut self.save_block1;
        LittleEndian::write_i16(&mut sb1[0x00..], 7);
        LittleEndian::write_i16(&mut sb1[0x02..], -2);
        sb1[0x04] = 0;
        sb1[0x05] = 10;
        LittleEndian::write_u32(&mut sb1[0x490..], MONEY ^ ENCRYPTION_KEY);
        LittleEndian::write_u16(&mut sb1[0x494..], COINS ^ low_key);
        LittleEndian::write_u16(&mut sb1[0x496..], low_key);

        // PC items are stored in the clear.
        write_item(sb1, 0x498, 13, 1);
        write_item(sb1, 0x560, 13, 5 ^ low_key);
        write_item(sb1, 0x564, 17, 2 ^ low_key);
        write_item(sb1, 0x5d8, 259, 1 ^ low_key);
        write_item(sb1, 0x650, 4, 10 ^ low_key);
    }

    pub fn write_party(&mut self) {
        let sb1 = &mut self.save_block1;
        LittleEndian::write_u32(&mut sb1[0x234..], 2);
        let treecko = pk3_record(0x0000_000d, TRAINER_ID, 277, "TREECKO", Some(12));
        let zigzagoon = pk3_record(0x8a2f_1c44, TRAINER_ID, 288, "ZIGZAGOON", Some(7));
        sb1[0x238..0x238 + 100].copy_from_slice(&treecko);
        sb1[0x238 + 100..0x238 + 200].copy_from_slice(&zigzagoon);
    }

    pub fn write_storage(&mut self) {
        let storage = &mut self.storage;
        storage[0] = 0;
        for box_index in 0..14 {
            let name = encode_text(&format!("BOX{}", box_index + 1), 9);
            let offset = 0x8344 + box_index * 9;
            storage[offset..offset + 9].copy_from_slice(&name);
        }
        let wurmple = pk3_record(0x0301_7f22, TRAINER_ID, 290, "WURMPLE", None);
        let offset = 0x4 + 2 * 80;
        storage[offset..offset + 80].copy_from_slice(&wurmple);
    }

    pub fn write_story_progress(&mut self, flags: usize, vars: usize, system_flags: u16) {
        // trainer and hidden-object flags
        for flag_id in 0x04..0x1c {
            self.set_flag(flags, flag_id);
        }
        self.set_flag(flags, FLAG_ADVENTURE_STARTED);
        for system_flag in [0x0, 0x1, 0x2, 0x7, 0x8] {
            self.set_flag(flags, system_flags + system_flag);
        }

        self.set_var(vars, 0x4023, 2);
        self.set_var(vars, 0x4084, 1);
        self.set_var(vars, 0x4092, 3);
        self.set_var(vars, 0x4050, 5);
    }

    pub fn set_flag(&mut self, flags: usize, flag_id: u16) {
        let flag_id = flag_id as usize;
        self.save_block1[flags + flag_id / 8] |= 1 << (flag_id % 8);
    }

    pub fn set_var(&mut self, vars: usize, var_id: u16, value: u16) {
        let offset = vars + (var_id as usize - 0x4000) * 2;
        LittleEndian::write_u16(&mut self.save_block1[offset..], value);
    }

    /// Writes all 14 sections of one slot. `rotation` shifts which physical
    /// sector holds section 0, as the game does on every save.
    pub fn write_slot(&self, flash: &mut [u8], slot: SlotId, save_counter: u32, rotation: usize) {
        self.write_slot_at(flash, slot.base_offset(), save_counter, rotation);
    }

    /// Like [`SaveBuilder::write_slot`], at an arbitrary flash offset.
    pub fn write_slot_at(&self, flash: &mut [u8], base: usize, save_counter: u32, rotation: usize) {
        let sb1_sections = self.split_block(&self.save_block1, 1..5);
        let storage_sections = self.split_block(&self.storage, 5..14);
        let mut sections: Vec<&[u8]> = vec![self.save_block2.as_slice()];
        sections.extend(sb1_sections.iter().map(Vec::as_slice));
        sections.extend(storage_sections.iter().map(Vec::as_slice));

        for (physical, sector) in flash[base..base + SECTIONS_PER_SLOT * SECTOR_SIZE]
            .chunks_exact_mut(SECTOR_SIZE)
            .enumerate()
        {
            let section_id = (physical + rotation) % SECTIONS_PER_SLOT;
            sector.fill(0);
            let data = sections[section_id];
            sector[..data.len()].copy_from_slice(data);
            let checksum = compute_section_checksum(&sector[..SECTOR_DATA_SIZE]);
            LittleEndian::write_u16(&mut sector[0xff4..], section_id as u16);
            LittleEndian::write_u16(&mut sector[0xff6..], checksum);
            LittleEndian::write_u32(&mut sector[0xff8..], SECTOR_SIGNATURE);
            LittleEndian::write_u32(&mut sector[0xffc..], save_counter);
        }
    }

    fn split_block(&self, data: &[u8], section_ids: std::ops::Range<usize>) -> Vec<Vec<u8>> {
        let mut start = 0;
        section_ids
            .map(|section_id| {
                let size = self.section_sizes[section_id] as usize;
                let chunk = data[start..start + size].to_vec();
                start += size;
                chunk
            })
            .collect()
    }

    /// A 128 KiB dump with this save in slot A and an older copy in slot B.
    pub fn build(&self) -> Vec<u8> {
        let mut flash = vec![0u8; FLASH_SIZE];
        self.write_slot(&mut flash, SlotId::A, 8, 0);
        self.write_slot(&mut flash, SlotId::B, 7, 3);
        flash
    }
}

fn write_item(block: &mut [u8], offset: usize, item_id: u16, raw_quantity: u16) {
    LittleEndian::write_u16(&mut block[offset..], item_id);
    LittleEndian::write_u16(&mut block[offset + 2..], raw_quantity);
}

/// Encodes a record with a valid checksum. Party records carry `level`.
pub fn pk3_record(
    personality: u32,
    ot_id: u32,
    species: u16,
    nickname: &str,
    level: Option<u8>,
) -> Vec<u8> {
    let mut growth = [0u8; 12];
    LittleEndian::write_u16(&mut growth[0..], species);
    LittleEndian::write_u32(&mut growth[4..], 1000);
    growth[9] = 70;
    let mut attacks = [0u8; 12];
    LittleEndian::write_u16(&mut attacks[0..], 33);
    attacks[8] = 35;
    let evs = [0u8; 12];
    let mut misc = [0u8; 12];
    misc[1] = 16;
    LittleEndian::write_u16(&mut misc[2..], 5 | (3 << 7) | (4 << 11));
    let logical = [growth, attacks, evs, misc];

    let checksum = logical
        .iter()
        .flat_map(|chunk| chunk.chunks_exact(2))
        .map(LittleEndian::read_u16)
        .fold(0u16, u16::wrapping_add);

    let mut record = vec![0u8; 32];
    LittleEndian::write_u32(&mut record[0..], personality);
    LittleEndian::write_u32(&mut record[4..], ot_id);
    record[8..18].copy_from_slice(&encode_text(nickname, 10));
    record[18] = 2;
    record[19] = 0b010;
    record[20..27].copy_from_slice(&encode_text("MAY", 7));
    LittleEndian::write_u16(&mut record[28..], checksum);
    record.extend_from_slice(&encrypt_payload(personality, ot_id, &logical));

    if let Some(level) = level {
        let mut party_stats = [0u8; 20];
        party_stats[4] = level;
        LittleEndian::write_u16(&mut party_stats[6..], 30);
        LittleEndian::write_u16(&mut party_stats[8..], 30);
        record.extend_from_slice(&party_stats);
    }
    record
}
