// src/address.rs

// account identifiers shared by the relay, the host and the factory

// dependencies
use std::fmt;

/// A 20-byte account identifier.
///
/// The all-zero address is the "unset" value; configuration rejects it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Build an address whose low eight bytes hold `value` (big-endian).
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Derive a child address from a parent and a nonce.
    /// The parent's leading twelve bytes are kept and the nonce fills the rest.
    pub fn derive(parent: Address, nonce: u64) -> Self {
        let mut bytes = parent.0;
        bytes[12..].copy_from_slice(&nonce.to_be_bytes());
        // keep derived addresses out of the zero space even for a zero parent
        bytes[0] |= 0x80;
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
