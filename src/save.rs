use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::error::ParseError;

pub const SECTOR_SIZE: usize = 0x1000;
pub const SECTOR_DATA_SIZE: usize = 0xF80;
pub const SECTIONS_PER_SLOT: usize = 14;
pub const SLOT_LENGTH: usize = SECTOR_SIZE * SECTIONS_PER_SLOT;
pub const SECTOR_SIGNATURE: u32 = 0x0801_2025;

pub(crate) const SECTION_ID_OFFSET: usize = 0x0FF4;
pub(crate) const SECTION_CHECKSUM_OFFSET: usize = 0x0FF6;
pub(crate) const SIGNATURE_OFFSET: usize = 0x0FF8;
pub(crate) const SAVE_INDEX_OFFSET: usize = 0x0FFC;
const SAVE_A_OFFSET: usize = 0x0000;
const SAVE_B_OFFSET: usize = 0xE000;
/// Some tools split the 128 KiB chip into two 64 KiB halves and write the
/// second slot at the start of the upper half.
const SAVE_B_HALF_OFFSET: usize = 0x10000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    pub fn base_offset(self) -> usize {
        match self {
            SlotId::A => SAVE_A_OFFSET,
            SlotId::B => SAVE_B_OFFSET,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectorFooter {
    pub section_id: u16,
    pub checksum: u16,
    pub signature: u32,
    pub save_counter: u32,
}

impl SectorFooter {
    /// `sector` must hold a full 4 KiB sector.
    pub fn read(sector: &[u8]) -> Self {
        SectorFooter {
            section_id: LittleEndian::read_u16(&sector[SECTION_ID_OFFSET..]),
            checksum: LittleEndian::read_u16(&sector[SECTION_CHECKSUM_OFFSET..]),
            signature: LittleEndian::read_u32(&sector[SIGNATURE_OFFSET..]),
            save_counter: LittleEndian::read_u32(&sector[SAVE_INDEX_OFFSET..]),
        }
    }

    pub fn is_trusted(&self) -> bool {
        self.signature == SECTOR_SIGNATURE
    }
}

/// The result of scanning the 14 sectors of one slot.
#[derive(Clone, Debug)]
pub struct SlotScan {
    pub slot: SlotId,
    /// Absolute buffer offset of the sector holding each section.
    pub sections: [Option<usize>; SECTIONS_PER_SLOT],
    /// Section ids of the trusted sectors, in physical order.
    pub sector_order: Vec<u16>,
    /// Absolute sector indices whose stored checksum disagrees with the data.
    pub checksum_failures: Vec<usize>,
}

impl SlotScan {
    pub fn is_valid(&self) -> bool {
        self.sections.iter().all(Option::is_some)
    }

    pub fn section_offset(&self, section_id: usize) -> Option<usize> {
        self.sections.get(section_id).copied().flatten()
    }

    /// The save counter stored in the footer of section 0.
    pub fn save_counter(&self, buffer: &[u8]) -> Option<u32> {
        let offset = self.section_offset(0)?;
        let sector = buffer.get(offset..offset + SECTOR_SIZE)?;
        Some(SectorFooter::read(sector).save_counter)
    }
}

/// Scans one slot. Returns `None` when the buffer does not reach the end of the
/// slot, so a 64 KiB dump only ever yields slot A.
pub fn scan_slot(buffer: &[u8], slot: SlotId) -> Option<SlotScan> {
    scan_slot_at(buffer, slot, slot.base_offset())
}

/// Scans the 14 sectors starting at `base`, reporting them as `slot`.
pub fn scan_slot_at(buffer: &[u8], slot: SlotId, base: usize) -> Option<SlotScan> {
    let slot_data = buffer.get(base..base + SLOT_LENGTH)?;

    let mut scan = SlotScan {
        slot,
        sections: [None; SECTIONS_PER_SLOT],
        sector_order: Vec::with_capacity(SECTIONS_PER_SLOT),
        checksum_failures: Vec::new(),
    };

    for (index, sector) in slot_data.chunks_exact(SECTOR_SIZE).enumerate() {
        let absolute_index = base / SECTOR_SIZE + index;
        let footer = SectorFooter::read(sector);
        if !footer.is_trusted() {
            log::trace!(
                "Sector {absolute_index} has signature 0x{:08x}, skipping",
                footer.signature
            );
            continue;
        }

        let section_id = footer.section_id as usize;
        if section_id >= SECTIONS_PER_SLOT {
            log::debug!("Sector {absolute_index} claims unknown section {section_id}");
            continue;
        }
        if scan.sections[section_id].is_some() {
            log::warn!(
                "Sector {absolute_index} duplicates section {section_id} in slot {slot:?}, keeping the first copy"
            );
            continue;
        }

        let checksum = compute_section_checksum(&sector[..SECTOR_DATA_SIZE]);
        if checksum != footer.checksum {
            log::warn!(
                "Computed checksum 0x{checksum:x} for section {section_id} (sector {absolute_index}), but checksum was 0x{:x}",
                footer.checksum
            );
            scan.checksum_failures.push(absolute_index);
        }

        scan.sections[section_id] = Some(base + index * SECTOR_SIZE);
        scan.sector_order.push(footer.section_id);
    }

    Some(scan)
}

/// Picks the slot to decode. With two valid slots the strictly newer save
/// counter wins and ties go to slot A.
pub fn resolve_active_slot(buffer: &[u8]) -> Result<SlotScan, ParseError> {
    if buffer.len() < SLOT_LENGTH {
        return Err(ParseError::TooSmall {
            len: buffer.len(),
            min: SLOT_LENGTH,
        });
    }

    let slot_a = scan_slot(buffer, SlotId::A).filter(SlotScan::is_valid);
    let slot_b = scan_slot(buffer, SlotId::B)
        .filter(SlotScan::is_valid)
        .or_else(|| {
            let scan = scan_slot_at(buffer, SlotId::B, SAVE_B_HALF_OFFSET)
                .filter(SlotScan::is_valid)?;
            log::debug!("Slot B found in the upper half at 0x{SAVE_B_HALF_OFFSET:x}");
            Some(scan)
        });

    let save_index_a = slot_a.as_ref().and_then(|scan| scan.save_counter(buffer));
    let save_index_b = slot_b.as_ref().and_then(|scan| scan.save_counter(buffer));
    log::debug!("Save Index A: {save_index_a:?}");
    log::debug!("Save Index B: {save_index_b:?}");

    let active = match (slot_a, slot_b) {
        (Some(a), Some(b)) => {
            if save_index_b > save_index_a {
                b
            } else {
                a
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return Err(ParseError::NoValidSlot),
    };

    log::debug!(
        "Active slot {:?}, sector order {:?}",
        active.slot,
        active.sector_order
    );
    Ok(active)
}

/// Sums the sector data as little-endian words and folds the result to 16 bits.
pub fn compute_section_checksum(data: &[u8]) -> u16 {
    let checksum = data
        .chunks_exact(4)
        .map(LittleEndian::read_u32)
        .fold(0u32, u32::wrapping_add);

    let checksum_lower = (checksum & 0xffff) as u16;
    let checksum_upper = (checksum >> 16) as u16;
    checksum_upper.wrapping_add(checksum_lower)
}
