use crate::layout::Encryption;

/// XOR stream Emerald applies to money, coins, the registered item and bag
/// quantities. Ruby and Sapphire store the same fields in the clear, which is
/// the same as a key of zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Decryptor {
    key: u32,
}

impl Decryptor {
    pub fn new(encryption: Encryption, key: u32) -> Self {
        match encryption {
            Encryption::Xor => Decryptor { key },
            Encryption::None => Decryptor { key: 0 },
        }
    }

    pub fn key(&self) -> u32 {
        self.key
    }

    pub fn money(&self, raw: u32) -> u32 {
        xor_u32(raw, self.key)
    }

    pub fn coins(&self, raw: u16) -> u16 {
        xor_u16(raw, self.key)
    }

    pub fn registered_item(&self, raw: u16) -> u16 {
        xor_u16(raw, self.key)
    }

    pub fn quantity(&self, raw: u16) -> u16 {
        xor_u16(raw, self.key)
    }
}

pub fn xor_u32(value: u32, key: u32) -> u32 {
    value ^ key
}

/// Sixteen-bit fields only use the low half of the key.
pub fn xor_u16(value: u16, key: u32) -> u16 {
    value ^ (key & 0xffff) as u16
}
