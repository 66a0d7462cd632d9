//! ZDP descriptors (C9)
//!
//! Grounded on `examples/original_source/deconz/zdp_descriptors.h`: MAC
//! capability bits, power/node/simple descriptor field layouts and their
//! `readFromStream`/`writeToStream` byte order.

use crate::error::{ProtocolError, Result};
use crate::ids::{ClusterId, ProfileId};

/// MAC capability bitfield, exact bit positions from
/// `examples/original_source/deconz/zdp_descriptors.h`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MacCapabilities(pub u8);

impl MacCapabilities {
    pub const ALTERNATE_PAN_COORDINATOR: u8 = 0x01;
    pub const FULL_FUNCTION_DEVICE: u8 = 0x02;
    pub const MAINS_POWER: u8 = 0x04;
    pub const RX_ON_WHEN_IDLE: u8 = 0x08;
    pub const SECURITY_CAPABLE: u8 = 0x40;
    pub const ALLOCATE_ADDRESS: u8 = 0x80;

    #[must_use]
    pub fn alternate_pan_coordinator(self) -> bool {
        self.0 & Self::ALTERNATE_PAN_COORDINATOR != 0
    }

    #[must_use]
    pub fn full_function_device(self) -> bool {
        self.0 & Self::FULL_FUNCTION_DEVICE != 0
    }

    #[must_use]
    pub fn mains_powered(self) -> bool {
        self.0 & Self::MAINS_POWER != 0
    }

    #[must_use]
    pub fn rx_on_when_idle(self) -> bool {
        self.0 & Self::RX_ON_WHEN_IDLE != 0
    }

    #[must_use]
    pub fn security_capable(self) -> bool {
        self.0 & Self::SECURITY_CAPABLE != 0
    }

    #[must_use]
    pub fn allocate_address(self) -> bool {
        self.0 & Self::ALLOCATE_ADDRESS != 0
    }
}

/// `LogicalType_t` (zdp_descriptors.h).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LogicalType {
    Coordinator,
    Router,
    EndDevice,
    Reserved(u8),
}

impl LogicalType {
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => LogicalType::Coordinator,
            1 => LogicalType::Router,
            2 => LogicalType::EndDevice,
            other => LogicalType::Reserved(other),
        }
    }

    #[must_use]
    pub fn to_bits(self) -> u8 {
        match self {
            LogicalType::Coordinator => 0,
            LogicalType::Router => 1,
            LogicalType::EndDevice => 2,
            LogicalType::Reserved(bits) => bits & 0x07,
        }
    }
}

/// `FrequencyBand_t` bit positions (zdp_descriptors.h): bit 3 is 868MHz,
/// bit 5 is 902-928MHz, bit 6 is 2.4GHz.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrequencyBand(pub u8);

impl FrequencyBand {
    pub const BAND_868_MHZ: u8 = 0x08;
    pub const BAND_902_MHZ: u8 = 0x20;
    pub const BAND_2400_MHZ: u8 = 0x40;

    #[must_use]
    pub fn supports_2400_mhz(self) -> bool {
        self.0 & Self::BAND_2400_MHZ != 0
    }
}

/// Node descriptor (ZDP), `NodeDescriptor` in zdp_descriptors.h.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeDescriptor {
    pub logical_type: LogicalType,
    pub complex_descriptor_available: bool,
    pub user_descriptor_available: bool,
    pub frequency_band: FrequencyBand,
    pub mac_capabilities: MacCapabilities,
    pub manufacturer_code: u16,
    pub max_buffer_size: u8,
    pub max_incoming_transfer_size: u16,
    pub server_mask: u16,
    pub max_outgoing_transfer_size: u16,
    pub descriptor_capabilities: u8,
}

impl NodeDescriptor {
    pub const WIRE_LEN: usize = 13;

    /// `NodeDescriptor::readFromStream`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        need(data, 0, Self::WIRE_LEN)?;
        let byte0 = data[0];
        let byte1 = data[1];

        let logical_type = LogicalType::from_bits(byte0);
        let complex_descriptor_available = byte0 & 0x08 != 0;
        let user_descriptor_available = byte0 & 0x10 != 0;
        let frequency_band = FrequencyBand(byte1 & 0xF8);

        let mac_capabilities = MacCapabilities(data[2]);
        let manufacturer_code = u16::from_le_bytes([data[3], data[4]]);
        let max_buffer_size = data[5];
        let max_incoming_transfer_size = u16::from_le_bytes([data[6], data[7]]);
        let server_mask = u16::from_le_bytes([data[8], data[9]]);
        let max_outgoing_transfer_size = u16::from_le_bytes([data[10], data[11]]);
        let descriptor_capabilities = data[12];

        Ok(Self {
            logical_type,
            complex_descriptor_available,
            user_descriptor_available,
            frequency_band,
            mac_capabilities,
            manufacturer_code,
            max_buffer_size,
            max_incoming_transfer_size,
            server_mask,
            max_outgoing_transfer_size,
            descriptor_capabilities,
        })
    }

    /// `NodeDescriptor::writeToStream`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut byte0 = self.logical_type.to_bits();
        if self.complex_descriptor_available {
            byte0 |= 0x08;
        }
        if self.user_descriptor_available {
            byte0 |= 0x10;
        }
        let byte1 = self.frequency_band.0 & 0xF8;

        let mut out = Vec::with_capacity(Self::WIRE_LEN);
        out.push(byte0);
        out.push(byte1);
        out.push(self.mac_capabilities.0);
        out.extend_from_slice(&self.manufacturer_code.to_le_bytes());
        out.push(self.max_buffer_size);
        out.extend_from_slice(&self.max_incoming_transfer_size.to_le_bytes());
        out.extend_from_slice(&self.server_mask.to_le_bytes());
        out.extend_from_slice(&self.max_outgoing_transfer_size.to_le_bytes());
        out.push(self.descriptor_capabilities);
        out
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.max_buffer_size > 0
    }
}

/// `PowerMode_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerMode {
    OnWhenIdle,
    Periodic,
    Stimulated,
    Reserved(u8),
}

impl PowerMode {
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x0F {
            0 => PowerMode::OnWhenIdle,
            1 => PowerMode::Periodic,
            2 => PowerMode::Stimulated,
            other => PowerMode::Reserved(other),
        }
    }
}

/// `PowerSource_t`, a bitflag set: mains, rechargeable, disposable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerSource(pub u8);

impl PowerSource {
    pub const UNKNOWN: u8 = 0x00;
    pub const MAINS: u8 = 0x01;
    pub const RECHARGEABLE: u8 = 0x02;
    pub const DISPOSABLE: u8 = 0x04;

    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0F)
    }

    #[must_use]
    pub fn is_mains(self) -> bool {
        self.0 & Self::MAINS != 0
    }
}

/// `PowerSourceLevel_t`: `Critical=0, 33%=4, 66%=8, 100%=0xC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerLevel {
    Critical,
    Level33,
    Level66,
    Level100,
    Reserved(u8),
}

impl PowerLevel {
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0xF0 {
            0x00 => PowerLevel::Critical,
            0x40 => PowerLevel::Level33,
            0x80 => PowerLevel::Level66,
            0xC0 => PowerLevel::Level100,
            other => PowerLevel::Reserved(other),
        }
    }
}

/// Power descriptor, `PowerDescriptor` in zdp_descriptors.h: 2 bytes on the
/// wire, little-endian bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerDescriptor {
    pub current_power_mode: PowerMode,
    pub available_power_sources: PowerSource,
    pub current_power_source: PowerSource,
    pub current_power_level: PowerLevel,
}

impl PowerDescriptor {
    pub const WIRE_LEN: usize = 2;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        need(data, 0, Self::WIRE_LEN)?;
        let raw = u16::from_le_bytes([data[0], data[1]]);
        let low = (raw & 0x00FF) as u8;
        let high = ((raw >> 8) & 0x00FF) as u8;
        Ok(Self {
            current_power_mode: PowerMode::from_bits(low),
            available_power_sources: PowerSource::from_bits(low >> 4),
            current_power_source: PowerSource::from_bits(high),
            current_power_level: PowerLevel::from_bits(high),
        })
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mode_bits = match self.current_power_mode {
            PowerMode::OnWhenIdle => 0,
            PowerMode::Periodic => 1,
            PowerMode::Stimulated => 2,
            PowerMode::Reserved(b) => b & 0x0F,
        };
        let low = mode_bits | ((self.available_power_sources.0 & 0x0F) << 4);
        let level_bits = match self.current_power_level {
            PowerLevel::Critical => 0x00,
            PowerLevel::Level33 => 0x40,
            PowerLevel::Level66 => 0x80,
            PowerLevel::Level100 => 0xC0,
            PowerLevel::Reserved(b) => b & 0xF0,
        };
        let high = (self.current_power_source.0 & 0x0F) | level_bits;
        u16::from_le_bytes([low, high]).to_le_bytes().to_vec()
    }
}

/// A single simple-descriptor cluster list entry, in or out.
pub type SimpleDescriptorClusterList = Vec<ClusterId>;

/// Simple descriptor (ZDP endpoint descriptor), `SimpleDescriptor` in
/// zdp_descriptors.h.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimpleDescriptor {
    pub endpoint: u8,
    pub profile_id: ProfileId,
    pub device_id: u16,
    pub device_version: u8,
    pub input_clusters: SimpleDescriptorClusterList,
    pub output_clusters: SimpleDescriptorClusterList,
}

impl SimpleDescriptor {
    /// `SimpleDescriptor::readFromStream`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut idx = 0usize;
        need(data, idx, 7)?;
        let endpoint = data[idx];
        let profile_id = ProfileId::new(u16::from_le_bytes([data[idx + 1], data[idx + 2]]));
        let device_id = u16::from_le_bytes([data[idx + 3], data[idx + 4]]);
        let device_version = data[idx + 5] & 0x0F;
        let in_count = data[idx + 6] as usize;
        idx += 7;

        need(data, idx, in_count * 2)?;
        let mut input_clusters = Vec::with_capacity(in_count);
        for i in 0..in_count {
            input_clusters.push(ClusterId::new(u16::from_le_bytes([
                data[idx + i * 2],
                data[idx + i * 2 + 1],
            ])));
        }
        idx += in_count * 2;

        need(data, idx, 1)?;
        let out_count = data[idx] as usize;
        idx += 1;
        need(data, idx, out_count * 2)?;
        let mut output_clusters = Vec::with_capacity(out_count);
        for i in 0..out_count {
            output_clusters.push(ClusterId::new(u16::from_le_bytes([
                data[idx + i * 2],
                data[idx + i * 2 + 1],
            ])));
        }

        Ok(Self {
            endpoint,
            profile_id,
            device_id,
            device_version,
            input_clusters,
            output_clusters,
        })
    }

    /// `SimpleDescriptor::writeToStream`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(self.endpoint);
        out.extend_from_slice(&u16::from(self.profile_id).to_le_bytes());
        out.extend_from_slice(&self.device_id.to_le_bytes());
        out.push(self.device_version & 0x0F);
        out.push(self.input_clusters.len() as u8);
        for cluster in &self.input_clusters {
            out.extend_from_slice(&cluster.value().to_le_bytes());
        }
        out.push(self.output_clusters.len() as u8);
        for cluster in &self.output_clusters {
            out.extend_from_slice(&cluster.value().to_le_bytes());
        }
        out
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.endpoint != 0
    }
}

fn need(data: &[u8], idx: usize, len: usize) -> Result<()> {
    if data.len() < idx + len {
        Err(ProtocolError::FrameTooShort { need: idx + len, have: data.len() })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_capabilities_bit_positions_match_reference() {
        let caps = MacCapabilities(0x8E);
        assert!(!caps.alternate_pan_coordinator());
        assert!(caps.full_function_device());
        assert!(caps.mains_powered());
        assert!(caps.rx_on_when_idle());
        assert!(!caps.security_capable());
        assert!(caps.allocate_address());
    }

    #[test]
    fn node_descriptor_round_trips_13_byte_wire_form() {
        // End-to-end scenario from SPEC_FULL.md §8: a 13-byte node descriptor
        // round-trips exactly through toByteArray()/readFromStream().
        let bytes: [u8; 13] = [
            0x01, 0x40, 0x8E, 0x09, 0x10, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        let n = NodeDescriptor::from_bytes(&bytes).unwrap();
        assert_eq!(n.logical_type, LogicalType::Router);
        assert_eq!(n.manufacturer_code, 0x1009);
        assert_eq!(n.to_bytes(), bytes);
    }

    #[test]
    fn power_descriptor_round_trips() {
        let pd = PowerDescriptor {
            current_power_mode: PowerMode::Periodic,
            available_power_sources: PowerSource::from_bits(PowerSource::MAINS),
            current_power_source: PowerSource::from_bits(PowerSource::MAINS),
            current_power_level: PowerLevel::Level100,
        };
        let bytes = pd.to_bytes();
        let decoded = PowerDescriptor::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, pd);
    }

    #[test]
    fn simple_descriptor_round_trips_with_cluster_lists() {
        let sd = SimpleDescriptor {
            endpoint: 0x01,
            profile_id: ProfileId::new(0x0104),
            device_id: 0x0100,
            device_version: 0x01,
            input_clusters: vec![ClusterId::new(0x0000), ClusterId::new(0x0006)],
            output_clusters: vec![ClusterId::new(0x0019)],
        };
        let bytes = sd.to_bytes();
        let decoded = SimpleDescriptor::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, sd);
        assert!(decoded.is_valid());
    }

    #[test]
    fn zero_endpoint_simple_descriptor_is_invalid() {
        let sd = SimpleDescriptor {
            endpoint: 0,
            profile_id: ProfileId::new(0),
            device_id: 0,
            device_version: 0,
            input_clusters: vec![],
            output_clusters: vec![],
        };
        assert!(!sd.is_valid());
    }
}
