use byteorder::{ByteOrder, LittleEndian};

use crate::error::ParseError;
use crate::layout::LayoutProfile;
use crate::save::{SlotScan, SECTIONS_PER_SLOT, SECTOR_DATA_SIZE};

/// The logical structures the game splits across sections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Block {
    /// Section 0.
    SaveBlock2,
    /// Sections 1 to 4.
    SaveBlock1,
    /// Sections 5 to 13.
    PokemonStorage,
}

impl Block {
    fn first_section(self) -> usize {
        match self {
            Block::SaveBlock2 => 0,
            Block::SaveBlock1 => 1,
            Block::PokemonStorage => 5,
        }
    }

    fn section_count(self) -> usize {
        match self {
            Block::SaveBlock2 => 1,
            Block::SaveBlock1 => 4,
            Block::PokemonStorage => 9,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Cumulative section ends for one block: `ends[i]` is the logical offset one
/// past the last byte held by the block's `i`th section.
#[derive(Clone, Debug)]
struct BlockSpan {
    first_section: usize,
    ends: Vec<usize>,
}

impl BlockSpan {
    fn new(block: Block, section_sizes: &[u16; SECTIONS_PER_SLOT]) -> Self {
        let first_section = block.first_section();
        let mut total = 0usize;
        let ends = section_sizes[first_section..first_section + block.section_count()]
            .iter()
            .map(|&size| {
                // Never let a profile reach into the sector footer.
                total += (size as usize).min(SECTOR_DATA_SIZE);
                total
            })
            .collect();
        BlockSpan {
            first_section,
            ends,
        }
    }

    fn total(&self) -> usize {
        self.ends.last().copied().unwrap_or(0)
    }

    /// Returns `(section id, offset inside that section, bytes left in it)`.
    fn locate(&self, offset: usize) -> Option<(usize, usize, usize)> {
        let index = self.ends.partition_point(|&end| end <= offset);
        let end = *self.ends.get(index)?;
        let start = if index == 0 { 0 } else { self.ends[index - 1] };
        Some((self.first_section + index, offset - start, end - offset))
    }
}

/// Reads logical offsets of the active slot under one layout profile. Reads
/// that cross a section boundary are stitched together from both sections.
pub struct FieldReader<'a> {
    buffer: &'a [u8],
    sections: [Option<usize>; SECTIONS_PER_SLOT],
    spans: [BlockSpan; 3],
}

impl<'a> FieldReader<'a> {
    pub fn new(
        buffer: &'a [u8],
        slot: &SlotScan,
        profile: &LayoutProfile,
    ) -> Result<Self, ParseError> {
        if slot.section_offset(0).is_none() {
            return Err(ParseError::MissingSection0);
        }

        Ok(FieldReader {
            buffer,
            sections: slot.sections,
            spans: [
                BlockSpan::new(Block::SaveBlock2, &profile.section_sizes),
                BlockSpan::new(Block::SaveBlock1, &profile.section_sizes),
                BlockSpan::new(Block::PokemonStorage, &profile.section_sizes),
            ],
        })
    }

    pub fn block_len(&self, block: Block) -> usize {
        self.spans[block.index()].total()
    }

    /// Resolves a logical offset into `(section id, absolute buffer offset)`.
    pub fn resolve(&self, block: Block, offset: usize) -> Option<(usize, usize)> {
        let (section_id, section_offset, _) = self.spans[block.index()].locate(offset)?;
        let base = self.sections[section_id]?;
        Some((section_id, base + section_offset))
    }

    pub fn read_bytes(&self, block: Block, offset: usize, len: usize) -> Option<Vec<u8>> {
        let span = &self.spans[block.index()];
        let mut out = Vec::with_capacity(len);
        let mut cursor = offset;
        while out.len() < len {
            let (section_id, section_offset, available) = span.locate(cursor)?;
            let base = self.sections[section_id]?;
            let take = available.min(len - out.len());
            let start = base + section_offset;
            out.extend_from_slice(self.buffer.get(start..start + take)?);
            if out.len() < len {
                log::trace!("Read at {block:?}+0x{offset:x} continues past section {section_id}");
            }
            cursor += take;
        }
        Some(out)
    }

    pub fn read_u8(&self, block: Block, offset: usize) -> Option<u8> {
        let (_, position) = self.resolve(block, offset)?;
        self.buffer.get(position).copied()
    }

    pub fn read_u16(&self, block: Block, offset: usize) -> Option<u16> {
        self.read_bytes(block, offset, 2)
            .map(|bytes| LittleEndian::read_u16(&bytes))
    }

    pub fn read_u32(&self, block: Block, offset: usize) -> Option<u32> {
        self.read_bytes(block, offset, 4)
            .map(|bytes| LittleEndian::read_u32(&bytes))
    }

    pub fn read_i16(&self, block: Block, offset: usize) -> Option<i16> {
        self.read_u16(block, offset).map(|value| value as i16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::{SlotId, SECTOR_SIZE};

    fn identity_slot() -> SlotScan {
        let mut sections = [None; SECTIONS_PER_SLOT];
        for (id, section) in sections.iter_mut().enumerate() {
            *section = Some(id * SECTOR_SIZE);
        }
        SlotScan {
            slot: SlotId::A,
            sections,
            sector_order: (0..SECTIONS_PER_SLOT as u16).collect(),
            checksum_failures: Vec::new(),
        }
    }

    fn numbered_buffer() -> Vec<u8> {
        let mut buffer = vec![0u8; SECTIONS_PER_SLOT * SECTOR_SIZE];
        for (id, sector) in buffer.chunks_exact_mut(SECTOR_SIZE).enumerate() {
            sector.fill(id as u8);
        }
        buffer
    }

    #[test]
    fn resolves_across_uneven_sections() {
        let buffer = numbered_buffer();
        let profile = LayoutProfile::emerald_vanilla();
        let reader = FieldReader::new(&buffer, &identity_slot(), &profile).unwrap();

        assert_eq!(reader.resolve(Block::SaveBlock1, 0), Some((1, SECTOR_SIZE)));
        assert_eq!(
            reader.resolve(Block::SaveBlock1, 0xf7f),
            Some((1, SECTOR_SIZE + 0xf7f))
        );
        assert_eq!(reader.resolve(Block::SaveBlock1, 0xf80), Some((2, 2 * SECTOR_SIZE)));
        // Section 4 is the short one.
        assert_eq!(
            reader.resolve(Block::SaveBlock1, 3 * 0xf80 + 0xf07),
            Some((4, 4 * SECTOR_SIZE + 0xf07))
        );
        assert_eq!(reader.resolve(Block::SaveBlock1, 3 * 0xf80 + 0xf08), None);
        assert_eq!(reader.block_len(Block::SaveBlock1), 0x3d88);
        assert_eq!(reader.resolve(Block::SaveBlock2, 0xf2c), None);
        assert_eq!(reader.block_len(Block::PokemonStorage), 8 * 0xf80 + 0x7d0);
    }

    #[test]
    fn follows_rotated_sections() {
        let buffer = numbered_buffer();
        let mut slot = identity_slot();
        // Section 2 physically lives in sector 9.
        slot.sections[2] = Some(9 * SECTOR_SIZE);
        let profile = LayoutProfile::emerald_vanilla();
        let reader = FieldReader::new(&buffer, &slot, &profile).unwrap();
        assert_eq!(reader.read_u8(Block::SaveBlock1, 0xf80 + 5), Some(9));
    }

    #[test]
    fn straddling_reads_are_stitched() {
        let buffer = numbered_buffer();
        let profile = LayoutProfile::emerald_vanilla();
        let reader = FieldReader::new(&buffer, &identity_slot(), &profile).unwrap();
        let bytes = reader.read_bytes(Block::SaveBlock1, 0xf7e, 4).unwrap();
        assert_eq!(bytes, vec![1, 1, 2, 2]);
        assert_eq!(reader.read_u32(Block::SaveBlock1, 0xf7e), Some(0x0202_0101));
    }

    #[test]
    fn missing_sections_are_unreadable() {
        let buffer = numbered_buffer();
        let mut slot = identity_slot();
        slot.sections[3] = None;
        let profile = LayoutProfile::emerald_vanilla();
        let reader = FieldReader::new(&buffer, &slot, &profile).unwrap();
        assert_eq!(reader.read_u8(Block::SaveBlock1, 2 * 0xf80), None);
        assert_eq!(reader.read_u16(Block::SaveBlock1, 2 * 0xf80 - 1), None);
        assert_eq!(reader.read_u8(Block::SaveBlock1, 0), Some(1));

        slot.sections[0] = None;
        assert_eq!(
            FieldReader::new(&buffer, &slot, &profile).err(),
            Some(ParseError::MissingSection0)
        );
    }
}
