pub mod bitfield;
pub mod container;
pub mod crypto;
pub mod decode;
pub mod error;
pub mod layout;
pub mod names;
pub mod parser;
pub mod pokemon;
pub mod reader;
pub mod sanity;
pub mod save;

pub use error::{ParseError, ProfileError};
pub use layout::{LayoutProfile, LayoutProfileRegistry};
pub use names::{MapResolver, NameTables};
pub use parser::{parse, NativeMetadata, ParseOptions, ParseReport, ParsedSave};
pub use pokemon::Pokemon;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerId {
    pub public_id: u16,
    pub secret_id: u16,
}

impl From<u32> for TrainerId {
    fn from(raw: u32) -> Self {
        TrainerId {
            public_id: (raw & 0xffff) as u16,
            secret_id: (raw >> 16) as u16,
        }
    }
}

impl From<TrainerId> for u32 {
    fn from(id: TrainerId) -> u32 {
        (id.secret_id as u32) << 16 | id.public_id as u32
    }
}

/// Decodes text in the western Generation III character set. Decoding stops at
/// the first terminator byte.
pub fn decode_text(text_data: &[u8]) -> String {
    let mut out_text = String::new();
    for byte in text_data {
        let decoded_char = match *byte {
            0xff => break,
            0x00 => ' ',
            0xa1..=0xaa => char::from(b'0' + (*byte - 0xa1)),
            0xab => '!',
            0xac => '?',
            0xad => '.',
            0xae => '-',
            0xb0 => '…',
            0xb1 => '“',
            0xb2 => '”',
            0xb3 => '‘',
            0xb4 => '\'',
            0xb5 => '♂',
            0xb6 => '♀',
            0xb8 => ',',
            0xba => '/',
            0xbb..=0xd4 => char::from(b'A' + (*byte - 0xbb)),
            0xd5..=0xee => char::from(b'a' + (*byte - 0xd5)),
            0xf0 => ':',
            _ => '*',
        };
        out_text.push(decoded_char);
    }

    out_text
}

/// Inverse of [`decode_text`] for the characters it produces. Unknown
/// characters become `?` and the remainder is padded with terminators.
pub fn encode_text(text: &str, len: usize) -> Vec<u8> {
    let mut out: Vec<u8> = text
        .chars()
        .take(len)
        .map(|ch| match ch {
            ' ' => 0x00,
            '0'..='9' => 0xa1 + (ch as u8 - b'0'),
            '!' => 0xab,
            '.' => 0xad,
            '-' => 0xae,
            '\'' => 0xb4,
            '♂' => 0xb5,
            '♀' => 0xb6,
            ',' => 0xb8,
            '/' => 0xba,
            'A'..='Z' => 0xbb + (ch as u8 - b'A'),
            'a'..='z' => 0xd5 + (ch as u8 - b'a'),
            ':' => 0xf0,
            _ => 0xac,
        })
        .collect();
    out.resize(len, 0xff);
    out
}
