//! Chamber index and the persisted header that carries it.
//!
//! Layout (`HEADER_LEN` = 3 bytes):
//! ```text
//! Byte 0-1: Magic (u16, little-endian) - marks a header this firmware wrote
//! Byte 2:   Current chamber index
//! ```

use crate::config::HEADER_MAGIC;
use crate::error::Error;

/// Persisted header size in bytes.
pub const HEADER_LEN: usize = 3;

/// One slot in the rotation, identified by index.
///
/// Only the index is ever persisted; what a chamber does is resolved by the
/// payload dispatcher at fire time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Chamber(u8);

impl Chamber {
    /// The first chamber; also what every storage fault falls back to.
    pub const FIRST: Chamber = Chamber(0);

    /// Wrap a raw index, rejecting anything outside `0..total`.
    pub fn new(index: u8, total: u8) -> Option<Self> {
        (index < total).then_some(Chamber(index))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// The chamber after this one, wrapping to 0 after `total - 1`.
    pub fn next(self, total: u8) -> Self {
        if total == 0 {
            return Chamber::FIRST;
        }
        Chamber(((u16::from(self.0) + 1) % u16::from(total)) as u8)
    }
}

/// The one record kept in non-volatile storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    pub magic: u16,
    pub chamber: u8,
}

impl Header {
    /// A valid header pointing at `chamber`.
    pub const fn new(chamber: Chamber) -> Self {
        Self {
            magic: HEADER_MAGIC,
            chamber: chamber.0,
        }
    }

    /// Decode raw bytes. Returns `None` when the magic does not match, which
    /// is how erased or foreign storage shows up.
    pub fn from_bytes(bytes: &[u8; HEADER_LEN]) -> Option<Self> {
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        if magic != HEADER_MAGIC {
            return None;
        }
        Some(Self {
            magic,
            chamber: bytes[2],
        })
    }

    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let m = self.magic.to_le_bytes();
        [m[0], m[1], self.chamber]
    }

    /// The stored chamber, validated against the configured chamber count.
    pub fn chamber(self, total: u8) -> Result<Chamber, Error> {
        Chamber::new(self.chamber, total).ok_or(Error::CorruptHeader)
    }
}
