//! Addresses (C6)
//!
//! Grounded on `examples/original_source/deconz/aps.h`'s `Address` class and
//! `aps.cpp`'s `isNwkUnicast`/`isNwkBroadcast` bodies.

use std::fmt;

/// Network-layer broadcast addresses (examples/original_source/deconz/types.h).
pub mod broadcast {
    pub const ALL: u16 = 0xFFFF;
    pub const LOW_POWER_ROUTERS: u16 = 0xFFFB;
    pub const ROUTERS: u16 = 0xFFFC;
    pub const RX_ON_WHEN_IDLE: u16 = 0xFFFD;
    /// Network addresses at or above this value are broadcast, below are unicast.
    pub const THRESHOLD: u16 = 0xFFFA;
}

/// APS addressing mode, as carried in the `dst_addr_mode`/`src_addr_mode`
/// byte of the wire layout (SPEC_FULL.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AddressMode {
    None = 0x0,
    Group = 0x1,
    Nwk = 0x2,
    Ext = 0x3,
    NwkAndExt = 0x4,
}

impl TryFrom<u8> for AddressMode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0x0 => Ok(AddressMode::None),
            0x1 => Ok(AddressMode::Group),
            0x2 => Ok(AddressMode::Nwk),
            0x3 => Ok(AddressMode::Ext),
            0x4 => Ok(AddressMode::NwkAndExt),
            other => Err(other),
        }
    }
}

/// A Zigbee address carrying independently-present 16-bit network, 64-bit
/// extended (IEEE), and 16-bit group fields.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    nwk: Option<u16>,
    ext: Option<u64>,
    group: Option<u16>,
}

impl Address {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_nwk(&self) -> bool {
        self.nwk.is_some()
    }

    #[must_use]
    pub fn has_ext(&self) -> bool {
        self.ext.is_some()
    }

    #[must_use]
    pub fn has_group(&self) -> bool {
        self.group.is_some()
    }

    #[must_use]
    pub fn nwk(&self) -> Option<u16> {
        self.nwk
    }

    #[must_use]
    pub fn ext(&self) -> Option<u64> {
        self.ext
    }

    #[must_use]
    pub fn group(&self) -> Option<u16> {
        self.group
    }

    pub fn set_nwk(&mut self, nwk: u16) {
        self.nwk = Some(nwk);
    }

    pub fn set_ext(&mut self, ext: u64) {
        self.ext = Some(ext);
    }

    pub fn set_group(&mut self, group: u16) {
        self.group = Some(group);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.has_nwk() || self.has_ext() || self.has_group()
    }

    /// `true` iff `hasNwk()` and the network address is below the broadcast
    /// threshold `0xFFFA`.
    #[must_use]
    pub fn is_nwk_unicast(&self) -> bool {
        self.nwk.is_some_and(|nwk| nwk < broadcast::THRESHOLD)
    }

    /// `true` iff `hasNwk()` and the network address is at or above the
    /// broadcast threshold `0xFFFA`. Mutually exclusive with
    /// [`Address::is_nwk_unicast`] whenever a network address is present.
    #[must_use]
    pub fn is_nwk_broadcast(&self) -> bool {
        self.nwk.is_some_and(|nwk| nwk >= broadcast::THRESHOLD)
    }

    #[must_use]
    pub fn to_string_ext(&self) -> String {
        match self.ext {
            Some(ext) => format!("{ext:016X}"),
            None => String::new(),
        }
    }

    #[must_use]
    pub fn to_string_nwk(&self) -> String {
        match self.nwk {
            Some(nwk) => format!("{nwk:04X}"),
            None => String::new(),
        }
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.nwk == other.nwk && self.ext == other.ext && self.group == other.group
    }
}
impl Eq for Address {}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ext) = self.ext {
            write!(f, "0x{ext:016X}")
        } else if let Some(nwk) = self.nwk {
            write!(f, "0x{nwk:04X}")
        } else if let Some(group) = self.group {
            write!(f, "group 0x{group:04X}")
        } else {
            write!(f, "<no address>")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicast_xor_broadcast_holds_for_every_nwk_value() {
        for nwk in [0u16, 1, 0xFFF9, 0xFFFA, 0xFFFB, 0xFFFC, 0xFFFD, 0xFFFF] {
            let mut addr = Address::new();
            addr.set_nwk(nwk);
            assert_ne!(addr.is_nwk_unicast(), addr.is_nwk_broadcast());
        }
    }

    #[test]
    fn absent_nwk_is_neither_unicast_nor_broadcast() {
        let addr = Address::new();
        assert!(!addr.is_nwk_unicast());
        assert!(!addr.is_nwk_broadcast());
    }

    #[test]
    fn equality_compares_all_three_fields() {
        let mut a = Address::new();
        a.set_nwk(1);
        let mut b = Address::new();
        b.set_nwk(1);
        assert_eq!(a, b);
        b.set_ext(5);
        assert_ne!(a, b);
    }

    #[test]
    fn address_mode_round_trips() {
        for raw in 0..=4u8 {
            let mode = AddressMode::try_from(raw).unwrap();
            assert_eq!(mode as u8, raw);
        }
        assert!(AddressMode::try_from(5).is_err());
    }
}
