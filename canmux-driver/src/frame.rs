//! Bus frame value types

use crate::time::Instant;

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidId;

/// CAN identifier with its addressing mode
///
/// The raw form packs the extended-addressing flag into bit 31, which is
/// unused by both 11-bit standard and 29-bit extended identifiers. The same
/// packing is used by the monitoring link wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanId(u32);

impl CanId {
    const EXTENDED_FLAG: u32 = 1 << 31;

    pub const MAX_STANDARD: u32 = 0x7ff;
    pub const MAX_EXTENDED: u32 = 0x1fff_ffff;

    /// Creates an 11-bit standard identifier.
    pub const fn new_standard(id: u32) -> Option<Self> {
        if id <= Self::MAX_STANDARD {
            Some(Self(id))
        } else {
            None
        }
    }

    /// Creates a 29-bit extended identifier.
    pub const fn new_extended(id: u32) -> Option<Self> {
        if id <= Self::MAX_EXTENDED {
            Some(Self(id | Self::EXTENDED_FLAG))
        } else {
            None
        }
    }

    pub const fn is_extended(self) -> bool {
        self.0 & Self::EXTENDED_FLAG != 0
    }

    /// The identifier value without the addressing flag
    pub const fn value(self) -> u32 {
        self.0 & !Self::EXTENDED_FLAG
    }

    pub const fn into_raw(self) -> u32 {
        self.0
    }

    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw & Self::EXTENDED_FLAG != 0 {
            Self::new_extended(raw & !Self::EXTENDED_FLAG)
        } else {
            Self::new_standard(raw)
        }
    }
}

impl From<CanId> for u32 {
    fn from(value: CanId) -> Self {
        value.into_raw()
    }
}

impl TryFrom<u32> for CanId {
    type Error = InvalidId;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_raw(value).ok_or(InvalidId)
    }
}

#[cfg(feature = "embedded-can")]
impl From<embedded_can::Id> for CanId {
    fn from(value: embedded_can::Id) -> Self {
        match value {
            embedded_can::Id::Standard(id) => {
                unwrap!(Self::new_standard(u32::from(id.as_raw())))
            }
            embedded_can::Id::Extended(id) => unwrap!(Self::new_extended(id.as_raw())),
        }
    }
}

#[cfg(feature = "embedded-can")]
impl From<CanId> for embedded_can::Id {
    fn from(value: CanId) -> Self {
        if value.is_extended() {
            embedded_can::Id::Extended(unwrap!(embedded_can::ExtendedId::new(value.value())))
        } else {
            embedded_can::Id::Standard(unwrap!(embedded_can::StandardId::new(
                value.value() as u16
            )))
        }
    }
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidLength;

/// Classic CAN frame data vector
///
/// Holds 0 to 8 payload bytes. Only the first `length` bytes of the backing
/// array are meaningful; `Deref` exposes exactly those.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Data {
    length: u8,
    bytes: [u8; Self::MAX],
}

impl Data {
    pub const MAX: usize = 8;

    /// Creates a new vector from a slice of compatible length.
    pub fn new(data: &[u8]) -> Result<Self, InvalidLength> {
        if data.len() > Self::MAX {
            return Err(InvalidLength);
        }
        let mut bytes = [0; Self::MAX];
        bytes[..data.len()].copy_from_slice(data);

        Ok(Self {
            length: data.len() as u8,
            bytes,
        })
    }

    pub const fn empty() -> Self {
        Self {
            length: 0,
            bytes: [0; Self::MAX],
        }
    }

    pub const fn length(&self) -> usize {
        self.length as usize
    }
}

impl core::ops::Deref for Data {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes[..self.length()]
    }
}

impl core::ops::DerefMut for Data {
    fn deref_mut(&mut self) -> &mut Self::Target {
        let length = self.length();
        &mut self.bytes[..length]
    }
}

/// One addressed, length-bounded record exchanged over the bus
///
/// Copied by value between components. The timestamp is assigned by whichever
/// context produced the frame: the bus driver end for received frames, the
/// dispatch cycle for locally originated ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub id: CanId,
    pub data: Data,
    pub timestamp: Instant,
}

impl Frame {
    pub const fn new(id: CanId, data: Data, timestamp: Instant) -> Self {
        Self {
            id,
            data,
            timestamp,
        }
    }
}
