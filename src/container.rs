//! Normalizes raw input bytes into a native flash dump.
//!
//! Emulators and flash carts produce bare 64 KiB or 128 KiB dumps, but saves
//! also arrive inside transfer-cable containers (SharkPort `.sps`) or with a
//! few bytes of header or trailer glued on. The sector footer signature recurs
//! every 4 KiB, which is enough to find where the real data starts.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::error::ParseError;
use crate::save::{SECTOR_SIGNATURE, SECTOR_SIZE, SIGNATURE_OFFSET};

pub const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4e, 0x47];
pub const FLASH_64K: usize = 0x10000;
pub const FLASH_128K: usize = 0x20000;

const SHARKPORT_MARKER: &[u8] = b"SharkPortSave";
const SHARKPORT_MARKER_OFFSET: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Native,
    Wrapped,
    Sharkport,
}

#[derive(Clone, Copy, Debug)]
pub struct Unwrapped<'a> {
    pub format: SourceFormat,
    pub buffer: &'a [u8],
}

pub fn unwrap_container(raw: &[u8]) -> Result<Unwrapped<'_>, ParseError> {
    if raw.starts_with(&PNG_MAGIC) {
        return Err(ParseError::PngArtifact);
    }

    let sharkport = raw
        .get(SHARKPORT_MARKER_OFFSET..SHARKPORT_MARKER_OFFSET + SHARKPORT_MARKER.len())
        == Some(SHARKPORT_MARKER);

    let Some(start) = find_first_sector(raw) else {
        log::debug!("No sector signature period found in {} bytes", raw.len());
        let format = if sharkport {
            SourceFormat::Sharkport
        } else {
            SourceFormat::Native
        };
        return Ok(Unwrapped {
            format,
            buffer: raw,
        });
    };

    let end = raw.len().min(start + FLASH_128K);
    let format = if sharkport {
        SourceFormat::Sharkport
    } else if start == 0 && matches!(raw.len(), FLASH_64K | FLASH_128K) {
        SourceFormat::Native
    } else {
        SourceFormat::Wrapped
    };

    if format != SourceFormat::Native {
        log::debug!(
            "Unwrapped {format:?} container: skipping {start} leading and {} trailing bytes",
            raw.len() - end
        );
    }

    Ok(Unwrapped {
        format,
        buffer: &raw[start..end],
    })
}

/// Finds the number of wrapper bytes in front of the first sector by locating
/// two signatures exactly one sector apart. Leading sectors without a
/// signature (erased flash) are kept as long as the dump still fits in 128 KiB.
fn find_first_sector(raw: &[u8]) -> Option<usize> {
    let last_position = raw.len().checked_sub(SECTOR_SIZE + 4)?;
    let position = (SIGNATURE_OFFSET..=last_position).find(|&position| {
        signature_at(raw, position) && signature_at(raw, position + SECTOR_SIZE)
    })?;

    let mut start = position - SIGNATURE_OFFSET;
    while start >= SECTOR_SIZE && raw.len() - (start - SECTOR_SIZE) <= FLASH_128K {
        start -= SECTOR_SIZE;
    }
    Some(start)
}

fn signature_at(raw: &[u8], position: usize) -> bool {
    raw.get(position..position + 4)
        .map(|word| LittleEndian::read_u32(word) == SECTOR_SIGNATURE)
        .unwrap_or(false)
}
