//! APS request / confirm / indication (C7)
//!
//! Wire layout and state-machine semantics grounded on
//! `examples/original_source/deconz/aps.h` and the `writeToStream`/
//! `readFromStream` bodies in `aps.cpp`. See SPEC_FULL.md §4.7 and §6.2 for
//! the versioned layout this module implements.

use std::sync::atomic::{AtomicU8, Ordering};

use tracing::debug;

use crate::address::{Address, AddressMode};
use crate::error::{ProtocolError, Result};

/// Maximum ASDU length accepted for an inbound indication (asduBuf in the
/// reference implementation is a fixed 118-byte array).
pub const MAX_INBOUND_ASDU: usize = 118;

/// Maximum number of source-route relays a request can carry.
pub const MAX_SOURCE_ROUTE_RELAYS: usize = 9;

/// Monotonic 8-bit request-id generator, skipping 0, matching
/// `APS_NextApsRequestId()` (examples/original_source/deconz/aps.h).
#[derive(Debug, Default)]
pub struct RequestIdGenerator {
    next: AtomicU8,
}

impl RequestIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self { next: AtomicU8::new(1) }
    }

    /// Returns the next id in `1..=255`, wrapping past 255 back to 1 (never 0).
    pub fn next(&self) -> u8 {
        loop {
            let current = self.next.load(Ordering::Relaxed);
            let after = if current == 255 { 1 } else { current + 1 };
            if self
                .next
                .compare_exchange(current, after, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return current;
            }
        }
    }
}

/// APS transmit-option flags. Only the low nibble survives a decode from the
/// wire (SPEC_FULL.md §9 open question: preserved verbatim, matching the
/// reference's `u8 &= 0x0F`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApsTxOptions {
    pub security_enabled: bool,
    pub use_nwk_key: bool,
    pub acknowledged: bool,
    pub fragmentation_permitted: bool,
}

impl ApsTxOptions {
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        let byte = byte & 0x0F;
        Self {
            security_enabled: byte & 0x01 != 0,
            use_nwk_key: byte & 0x02 != 0,
            acknowledged: byte & 0x04 != 0,
            fragmentation_permitted: byte & 0x08 != 0,
        }
    }

    #[must_use]
    pub fn to_byte(self) -> u8 {
        let mut b = 0u8;
        if self.security_enabled {
            b |= 0x01;
        }
        if self.use_nwk_key {
            b |= 0x02;
        }
        if self.acknowledged {
            b |= 0x04;
        }
        if self.fragmentation_permitted {
            b |= 0x08;
        }
        b
    }
}

/// APS request lifecycle state (SPEC_FULL.md §4.7 state machine). The
/// deprecated `FireAndForget` state from the reference implementation has no
/// variant here; [`ApsState::from_legacy_byte`] is the boundary that coerces
/// any attempt to reach it back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApsState {
    Idle,
    Busy,
    Wait,
    Confirmed,
    Timeout,
    Failure,
    Finish,
}

impl ApsState {
    /// The reference implementation's deprecated fire-and-forget state,
    /// represented on the wire/legacy boundary by this sentinel byte.
    const LEGACY_FIRE_AND_FORGET: u8 = 0xFE;

    /// Construct a state from a legacy numeric encoding, coercing the
    /// deprecated fire-and-forget value to `Idle` with a debug log, mirroring
    /// the reference's `DBG_Assert(state != FireAndForgetState)`.
    #[must_use]
    pub fn from_legacy_byte(byte: u8) -> Self {
        match byte {
            0 => ApsState::Idle,
            1 => ApsState::Busy,
            2 => ApsState::Wait,
            3 => ApsState::Confirmed,
            4 => ApsState::Timeout,
            5 => ApsState::Failure,
            6 => ApsState::Finish,
            Self::LEGACY_FIRE_AND_FORGET => {
                debug!("coercing deprecated FireAndForget aps state to Idle");
                ApsState::Idle
            }
            other => {
                debug!(raw = other, "unknown aps state byte, coercing to Idle");
                ApsState::Idle
            }
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ApsState::Confirmed | ApsState::Timeout | ApsState::Failure | ApsState::Finish)
    }
}

/// Stable ASCII names for APS/ZDP/NWK/MAC status bytes, matching
/// `ApsStatusToString` (examples/original_source/aps.cpp) and the enums in
/// `examples/original_source/deconz/types.h`. Folds in the full taxonomy per
/// SPEC_FULL.md §10.6, not just the representative subset named in §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApsStatus(pub u8);

impl ApsStatus {
    pub const SUCCESS: ApsStatus = ApsStatus(0x00);

    #[must_use]
    pub fn name(self) -> &'static str {
        match self.0 {
            0x00 => "SUCCESS",
            0xa0 => "ASDU_TOO_LONG",
            0xa1 => "DEFRAG_DEFERRED",
            0xa2 => "DEFRAG_UNSUPPORTED",
            0xa3 => "ILLEGAL_REQUEST",
            0xa4 => "INVALID_BINDING",
            0xa5 => "INVALID_GROUP",
            0xa6 => "INVALID_PARAMETER",
            0xa7 => "NO_ACK",
            0xa8 => "NO_BOUND_DEVICE",
            0xa9 => "NO_SHORT_ADDRESS",
            0xaa => "NOT_SUPPORTED",
            0xab => "SECURED_LINK_KEY",
            0xac => "SECURED_NWK_KEY",
            0xad => "SECURITY_FAIL",
            0xae => "TABLE_FULL",
            0xaf => "UNSECURED",
            0xb0 => "UNSUPPORTED_ATTRIBUTE",
            // NWK status range
            0xc1 => "NWK_INVALID_PARAMETER",
            0xc2 => "NWK_INVALID_REQUEST",
            0xc3 => "NWK_NOT_PERMITTED",
            0xc4 => "NWK_STARTUP_FAILURE",
            0xc5 => "NWK_ALREADY_PRESENT",
            0xc6 => "NWK_SYNC_FAILURE",
            0xc7 => "NWK_NEIGHBOR_TABLE_FULL",
            0xca => "NWK_NO_NETWORK",
            0xd0 => "NWK_ROUTE_DISCOVERY_FAILED",
            0xd1 => "NWK_ROUTE_ERROR",
            0xd2 => "NWK_BROADCAST_TABLE_FULL",
            // MAC status range - note MAC_INVALID_PARAMETER intentionally
            // reuses the same ASCII name as the APS one, matching the
            // reference's ApsStatusToString.
            0xe1 => "MAC_NO_CHANNEL_ACCESS",
            0xe8 => "INVALID_PARAMETER",
            0xe9 => "MAC_NO_ACK",
            0xea => "NO_BEACON",
            0xf0 => "TRANSACTION_EXPIRED",
            _ => "UNKNOWN_STATUS",
        }
    }
}

/// Wire protocol version controlling layout per SPEC_FULL.md §6.2.
pub type ApsVersion = u8;

/// Source route attached to an outbound request: relay addresses are stored
/// by network address, never by node reference (SPEC_FULL.md §9 "cyclic
/// graphs" design note).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRouteAttachment {
    pub relays: Vec<u16>,
    pub uuid_hash: u32,
}

impl SourceRouteAttachment {
    /// Mirrors `ApsDataRequest::setSourceRoute`: silently truncates/rejects
    /// when more than 9 relays are supplied by zeroing the hash instead.
    #[must_use]
    pub fn new(relays: Vec<u16>, uuid_hash: u32) -> Self {
        if relays.len() > MAX_SOURCE_ROUTE_RELAYS {
            return Self { relays: Vec::new(), uuid_hash: 0 };
        }
        Self { relays, uuid_hash }
    }
}

/// APS data request (C7).
#[derive(Debug, Clone)]
pub struct ApsDataRequest {
    pub id: u8,
    pub dst_addr_mode: AddressMode,
    pub dst_addr: Address,
    pub dst_endpoint: u8,
    pub src_endpoint: u8,
    pub profile_id: u16,
    pub cluster_id: u16,
    pub response_cluster_id: u16,
    pub asdu: Vec<u8>,
    pub tx_options: ApsTxOptions,
    pub radius: u8,
    pub state: ApsState,
    pub confirmed: bool,
    pub node_id: Option<u16>,
    pub source_route: Option<SourceRouteAttachment>,
}

impl ApsDataRequest {
    #[must_use]
    pub fn new(id: u8, dst_addr_mode: AddressMode, dst_addr: Address, dst_endpoint: u8) -> Self {
        Self {
            id,
            dst_addr_mode,
            dst_addr,
            dst_endpoint,
            src_endpoint: 0,
            profile_id: 0,
            cluster_id: 0,
            response_cluster_id: 0,
            asdu: Vec::new(),
            tx_options: ApsTxOptions::default(),
            radius: 0,
            state: ApsState::Idle,
            confirmed: false,
            node_id: None,
            source_route: None,
        }
    }

    pub fn set_state(&mut self, state: ApsState) {
        self.state = state;
    }

    /// `clear()`: resets the source route, destination address and ASDU,
    /// matching `ApsDataRequest::clear()`.
    pub fn clear(&mut self) {
        self.source_route = None;
        self.dst_addr.clear();
        self.asdu.clear();
    }

    fn write_dst_addr(&self, out: &mut Vec<u8>) -> Result<()> {
        match self.dst_addr_mode {
            AddressMode::None => {}
            AddressMode::Group => {
                let group = self.dst_addr.group().ok_or_else(|| {
                    ProtocolError::Malformed("group address mode without group id".into())
                })?;
                out.extend_from_slice(&group.to_le_bytes());
            }
            AddressMode::Nwk => {
                let nwk = self.dst_addr.nwk().ok_or_else(|| {
                    ProtocolError::Malformed("nwk address mode without nwk address".into())
                })?;
                out.extend_from_slice(&nwk.to_le_bytes());
                out.push(self.dst_endpoint);
            }
            AddressMode::Ext => {
                let ext = self.dst_addr.ext().ok_or_else(|| {
                    ProtocolError::Malformed("ext address mode without ext address".into())
                })?;
                out.extend_from_slice(&ext.to_le_bytes());
                out.push(self.dst_endpoint);
            }
            AddressMode::NwkAndExt => {
                let nwk = self.dst_addr.nwk().unwrap_or(0);
                let ext = self.dst_addr.ext().unwrap_or(0);
                out.extend_from_slice(&nwk.to_le_bytes());
                out.extend_from_slice(&ext.to_le_bytes());
                out.push(self.dst_endpoint);
            }
        }
        Ok(())
    }

    fn read_dst_addr(mode: AddressMode, data: &[u8], idx: &mut usize) -> Result<(Address, u8)> {
        let mut addr = Address::new();
        let ep;
        match mode {
            AddressMode::None => {
                ep = 0;
            }
            AddressMode::Group => {
                need(data, *idx, 2)?;
                addr.set_group(u16::from_le_bytes([data[*idx], data[*idx + 1]]));
                *idx += 2;
                ep = 0;
            }
            AddressMode::Nwk => {
                need(data, *idx, 3)?;
                addr.set_nwk(u16::from_le_bytes([data[*idx], data[*idx + 1]]));
                ep = data[*idx + 2];
                *idx += 3;
            }
            AddressMode::Ext => {
                need(data, *idx, 9)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&data[*idx..*idx + 8]);
                addr.set_ext(u64::from_le_bytes(raw));
                ep = data[*idx + 8];
                *idx += 9;
            }
            AddressMode::NwkAndExt => {
                need(data, *idx, 11)?;
                addr.set_nwk(u16::from_le_bytes([data[*idx], data[*idx + 1]]));
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&data[*idx + 2..*idx + 10]);
                addr.set_ext(u64::from_le_bytes(raw));
                ep = data[*idx + 10];
                *idx += 11;
            }
        }
        Ok((addr, ep))
    }

    /// Serialize the outbound request per the version-gated layout in
    /// SPEC_FULL.md §4.7.
    pub fn to_bytes(&self, version: ApsVersion) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.push(self.id);

        let has_node_id = self.node_id.is_some();
        let has_relays = self
            .source_route
            .as_ref()
            .is_some_and(|sr| !sr.relays.is_empty());

        if version >= 2 {
            let mut flags = 0u8;
            if has_node_id {
                flags |= 0x01;
            }
            if has_relays {
                flags |= 0x02;
            }
            out.push(flags);
            if has_node_id {
                out.extend_from_slice(&self.node_id.unwrap().to_le_bytes());
            }
        }

        out.push(self.dst_addr_mode as u8);
        self.write_dst_addr(&mut out)?;

        out.extend_from_slice(&self.profile_id.to_le_bytes());
        out.extend_from_slice(&self.cluster_id.to_le_bytes());
        out.push(self.src_endpoint);

        if self.asdu.len() > u16::MAX as usize {
            return Err(ProtocolError::LengthExceeded(self.asdu.len()));
        }
        out.extend_from_slice(&(self.asdu.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.asdu);

        out.push(self.tx_options.to_byte());
        out.push(self.radius);

        if version >= 2 && has_relays {
            let relays = &self.source_route.as_ref().unwrap().relays;
            out.push(relays.len() as u8);
            for relay in relays {
                out.extend_from_slice(&relay.to_le_bytes());
            }
        }

        Ok(out)
    }

    /// Parse an outbound request back from bytes - used for the round-trip
    /// laws in SPEC_FULL.md §8 and for a radio-side peer replaying frames.
    pub fn from_bytes(data: &[u8], version: ApsVersion) -> Result<Self> {
        let mut idx = 0usize;
        need(data, idx, 1)?;
        let id = data[idx];
        idx += 1;

        let mut flags = 0u8;
        let mut node_id = None;
        if version >= 2 {
            need(data, idx, 1)?;
            flags = data[idx];
            idx += 1;
            if flags & 0x01 != 0 {
                need(data, idx, 2)?;
                node_id = Some(u16::from_le_bytes([data[idx], data[idx + 1]]));
                idx += 2;
            }
        }

        need(data, idx, 1)?;
        let dst_addr_mode = AddressMode::try_from(data[idx])
            .map_err(ProtocolError::UnsupportedAddressMode)?;
        idx += 1;

        let (dst_addr, dst_endpoint) = Self::read_dst_addr(dst_addr_mode, data, &mut idx)?;

        need(data, idx, 5)?;
        let profile_id = u16::from_le_bytes([data[idx], data[idx + 1]]);
        idx += 2;
        let cluster_id = u16::from_le_bytes([data[idx], data[idx + 1]]);
        idx += 2;
        let src_endpoint = data[idx];
        idx += 1;

        need(data, idx, 2)?;
        let asdu_len = u16::from_le_bytes([data[idx], data[idx + 1]]) as usize;
        idx += 2;
        need(data, idx, asdu_len)?;
        let asdu = data[idx..idx + asdu_len].to_vec();
        idx += asdu_len;

        need(data, idx, 2)?;
        let tx_options = ApsTxOptions::from_byte(data[idx]);
        let radius = data[idx + 1];
        idx += 2;

        let mut source_route = None;
        if version >= 2 && flags & 0x02 != 0 {
            need(data, idx, 1)?;
            let count = data[idx] as usize;
            idx += 1;
            need(data, idx, count * 2)?;
            let mut relays = Vec::with_capacity(count);
            for i in 0..count {
                relays.push(u16::from_le_bytes([data[idx + i * 2], data[idx + i * 2 + 1]]));
            }
            source_route = Some(SourceRouteAttachment { relays, uuid_hash: 0 });
        }

        Ok(Self {
            id,
            dst_addr_mode,
            dst_addr,
            dst_endpoint,
            src_endpoint,
            profile_id,
            cluster_id,
            response_cluster_id: 0,
            asdu,
            tx_options,
            radius,
            state: ApsState::Idle,
            confirmed: false,
            node_id,
            source_route,
        })
    }
}

/// APS data confirm (C7): matches a request by id.
#[derive(Debug, Clone)]
pub struct ApsDataConfirm {
    pub id: u8,
    pub dst_addr_mode: AddressMode,
    pub dst_addr: Address,
    pub dst_endpoint: u8,
    pub src_endpoint: u8,
    pub status: ApsStatus,
}

impl ApsDataConfirm {
    /// Synthesize an error confirm for a request that never made it onto the
    /// air, matching the reference's `(requestId, status)` constructor.
    #[must_use]
    pub fn from_request_error(request: &ApsDataRequest, status: ApsStatus) -> Self {
        Self {
            id: request.id,
            dst_addr_mode: request.dst_addr_mode,
            dst_addr: request.dst_addr,
            dst_endpoint: request.dst_endpoint,
            src_endpoint: request.src_endpoint,
            status,
        }
    }
}

/// APS data indication (C7).
#[derive(Debug, Clone)]
pub struct ApsDataIndication {
    pub dst_addr_mode: AddressMode,
    pub dst_addr: Address,
    pub dst_endpoint: u8,
    pub src_addr_mode: AddressMode,
    pub src_addr: Address,
    pub src_endpoint: u8,
    pub profile_id: u16,
    pub cluster_id: u16,
    pub asdu: Vec<u8>,
    pub status: ApsStatus,
    pub security_status: u8,
    pub link_quality: u8,
    pub rx_time: u32,
    pub rssi: i8,
    pub previous_hop: Option<u16>,
}

impl ApsDataIndication {
    /// Parse an inbound indication per the version-gated layout in
    /// SPEC_FULL.md §4.7. ASDU is capped at [`MAX_INBOUND_ASDU`] bytes;
    /// anything beyond that is consumed from the stream but discarded,
    /// matching the reference's fixed 118-byte `asduBuf`.
    pub fn from_bytes(data: &[u8], version: ApsVersion) -> Result<Self> {
        let mut idx = 0usize;

        need(data, idx, 1)?;
        let dst_addr_mode = AddressMode::try_from(data[idx])
            .map_err(ProtocolError::UnsupportedAddressMode)?;
        idx += 1;
        let (dst_addr, dst_endpoint) = ApsDataRequest::read_dst_addr(dst_addr_mode, data, &mut idx)?;

        need(data, idx, 1)?;
        let src_addr_mode = AddressMode::try_from(data[idx])
            .map_err(ProtocolError::UnsupportedAddressMode)?;
        idx += 1;
        let (src_addr, src_endpoint) = ApsDataRequest::read_dst_addr(src_addr_mode, data, &mut idx)?;

        need(data, idx, 4)?;
        let profile_id = u16::from_le_bytes([data[idx], data[idx + 1]]);
        idx += 2;
        let cluster_id = u16::from_le_bytes([data[idx], data[idx + 1]]);
        idx += 2;

        need(data, idx, 2)?;
        let asdu_len = u16::from_le_bytes([data[idx], data[idx + 1]]) as usize;
        idx += 2;
        need(data, idx, asdu_len)?;
        let keep = asdu_len.min(MAX_INBOUND_ASDU);
        let asdu = data[idx..idx + keep].to_vec();
        idx += asdu_len;

        let (status, security_status, previous_hop) = if version >= 3 {
            need(data, idx, 2)?;
            let prev_hop = u16::from_le_bytes([data[idx], data[idx + 1]]);
            idx += 2;
            (ApsStatus::SUCCESS, 0, Some(prev_hop))
        } else {
            need(data, idx, 2)?;
            let status = ApsStatus(data[idx]);
            let sec = data[idx + 1];
            idx += 2;
            (status, sec, None)
        };

        need(data, idx, 5)?;
        let link_quality = data[idx];
        let rx_time = u32::from_le_bytes([data[idx + 1], data[idx + 2], data[idx + 3], data[idx + 4]]);
        idx += 5;

        let rssi = if version >= 2 {
            need(data, idx, 1)?;
            data[idx] as i8
        } else {
            0
        };

        Ok(Self {
            dst_addr_mode,
            dst_addr,
            dst_endpoint,
            src_addr_mode,
            src_addr,
            src_endpoint,
            profile_id,
            cluster_id,
            asdu,
            status,
            security_status,
            link_quality,
            rx_time,
            rssi,
            previous_hop,
        })
    }

    fn write_addr(mode: AddressMode, addr: &Address, endpoint: u8, out: &mut Vec<u8>) -> Result<()> {
        out.push(mode as u8);
        match mode {
            AddressMode::None => {}
            AddressMode::Group => {
                out.extend_from_slice(&addr.group().unwrap_or(0).to_le_bytes());
            }
            AddressMode::Nwk => {
                out.extend_from_slice(&addr.nwk().unwrap_or(0).to_le_bytes());
                out.push(endpoint);
            }
            AddressMode::Ext => {
                out.extend_from_slice(&addr.ext().unwrap_or(0).to_le_bytes());
                out.push(endpoint);
            }
            AddressMode::NwkAndExt => {
                out.extend_from_slice(&addr.nwk().unwrap_or(0).to_le_bytes());
                out.extend_from_slice(&addr.ext().unwrap_or(0).to_le_bytes());
                out.push(endpoint);
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self, version: ApsVersion) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        Self::write_addr(self.dst_addr_mode, &self.dst_addr, self.dst_endpoint, &mut out)?;
        Self::write_addr(self.src_addr_mode, &self.src_addr, self.src_endpoint, &mut out)?;
        out.extend_from_slice(&self.profile_id.to_le_bytes());
        out.extend_from_slice(&self.cluster_id.to_le_bytes());

        if self.asdu.len() > u16::MAX as usize {
            return Err(ProtocolError::LengthExceeded(self.asdu.len()));
        }
        out.extend_from_slice(&(self.asdu.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.asdu);

        if version >= 3 {
            out.extend_from_slice(&self.previous_hop.unwrap_or(0).to_le_bytes());
        } else {
            out.push(self.status.0);
            out.push(self.security_status);
        }

        out.push(self.link_quality);
        out.extend_from_slice(&self.rx_time.to_le_bytes());

        if version >= 2 {
            out.push(self.rssi as u8);
        }

        Ok(out)
    }
}

fn need(data: &[u8], idx: usize, len: usize) -> Result<()> {
    if data.len() < idx + len {
        Err(ProtocolError::FrameTooShort { need: idx + len, have: data.len() })
    } else {
        Ok(())
    }
}
