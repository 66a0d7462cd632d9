//! ZCL frame codec (C5)
//!
//! Grounded on the teacher's `deconz-protocol/src/types.rs::ZclFrame`
//! (`parse`/`serialize`, frame-control bit accessors) and
//! `examples/original_source/deconz/zcl.h`'s `ZclFrame` class, generalized
//! from a flat On/Off-only command set to the manufacturer-specific,
//! direction-aware header SPEC_FULL.md §4.6 describes.

use deconz_protocol::{CommandId, ManufacturerCode};

use crate::error::{CodecError, Result};

const FRAME_TYPE_MASK: u8 = 0x03;
const FRAME_TYPE_CLUSTER_SPECIFIC: u8 = 0x01;
const MANUFACTURER_SPECIFIC_BIT: u8 = 0x04;
const DIRECTION_BIT: u8 = 0x08;
const DISABLE_DEFAULT_RESPONSE_BIT: u8 = 0x10;

/// `ZCL_DefaultResponse` (0x0B), matching `isDefaultResponse()`'s command id check.
pub const DEFAULT_RESPONSE_COMMAND_ID: u8 = 0x0B;

/// A decoded ZCL frame header plus its raw payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZclFrame {
    frame_control: u8,
    manufacturer_code: Option<ManufacturerCode>,
    transaction_sequence: u8,
    command_id: CommandId,
    payload: Vec<u8>,
}

impl ZclFrame {
    #[must_use]
    pub fn new(
        is_cluster_specific: bool,
        manufacturer_code: Option<ManufacturerCode>,
        from_server: bool,
        disable_default_response: bool,
        transaction_sequence: u8,
        command_id: CommandId,
        payload: Vec<u8>,
    ) -> Self {
        let mut frame_control = if is_cluster_specific { FRAME_TYPE_CLUSTER_SPECIFIC } else { 0 };
        if manufacturer_code.is_some() {
            frame_control |= MANUFACTURER_SPECIFIC_BIT;
        }
        if from_server {
            frame_control |= DIRECTION_BIT;
        }
        if disable_default_response {
            frame_control |= DISABLE_DEFAULT_RESPONSE_BIT;
        }
        Self { frame_control, manufacturer_code, transaction_sequence, command_id, payload }
    }

    #[must_use]
    pub fn frame_control(&self) -> u8 {
        self.frame_control
    }

    #[must_use]
    pub fn is_profile_wide(&self) -> bool {
        (self.frame_control & FRAME_TYPE_MASK) != FRAME_TYPE_CLUSTER_SPECIFIC
    }

    #[must_use]
    pub fn is_cluster_specific(&self) -> bool {
        (self.frame_control & FRAME_TYPE_MASK) == FRAME_TYPE_CLUSTER_SPECIFIC
    }

    #[must_use]
    pub fn is_manufacturer_specific(&self) -> bool {
        (self.frame_control & MANUFACTURER_SPECIFIC_BIT) != 0
    }

    #[must_use]
    pub fn is_from_server(&self) -> bool {
        (self.frame_control & DIRECTION_BIT) != 0
    }

    #[must_use]
    pub fn disable_default_response(&self) -> bool {
        (self.frame_control & DISABLE_DEFAULT_RESPONSE_BIT) != 0
    }

    #[must_use]
    pub fn manufacturer_code(&self) -> Option<ManufacturerCode> {
        self.manufacturer_code
    }

    #[must_use]
    pub fn transaction_sequence(&self) -> u8 {
        self.transaction_sequence
    }

    #[must_use]
    pub fn command_id(&self) -> CommandId {
        self.command_id
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// `isDefaultResponse()`: profile-wide and command id `0x0B`.
    #[must_use]
    pub fn is_default_response(&self) -> bool {
        self.is_profile_wide() && self.command_id.value() == DEFAULT_RESPONSE_COMMAND_ID
    }

    /// Parses the two-byte `[for-command-id, status]` body of a default
    /// response frame.
    pub fn default_response_body(&self) -> Result<(CommandId, u8)> {
        if !self.is_default_response() {
            return Err(CodecError::Malformed("not a default-response frame".into()));
        }
        if self.payload.len() < 2 {
            return Err(CodecError::FrameTooShort { need: 2, have: self.payload.len() });
        }
        Ok((CommandId::new(self.payload[0]), self.payload[1]))
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(CodecError::FrameTooShort { need: 1, have: 0 });
        }
        let frame_control = data[0];
        let mut idx = 1;

        let manufacturer_code = if (frame_control & MANUFACTURER_SPECIFIC_BIT) != 0 {
            if data.len() < idx + 2 {
                return Err(CodecError::FrameTooShort { need: idx + 2, have: data.len() });
            }
            let code = u16::from_le_bytes([data[idx], data[idx + 1]]);
            idx += 2;
            Some(ManufacturerCode::new(code))
        } else {
            None
        };

        if data.len() < idx + 2 {
            return Err(CodecError::FrameTooShort { need: idx + 2, have: data.len() });
        }
        let transaction_sequence = data[idx];
        idx += 1;
        let command_id = CommandId::new(data[idx]);
        idx += 1;

        Ok(Self {
            frame_control,
            manufacturer_code,
            transaction_sequence,
            command_id,
            payload: data[idx..].to_vec(),
        })
    }

    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.payload.len());
        out.push(self.frame_control);
        if let Some(mfcode) = self.manufacturer_code {
            out.extend_from_slice(&mfcode.value().to_le_bytes());
        }
        out.push(self.transaction_sequence);
        out.push(self.command_id.value());
        out.extend_from_slice(&self.payload);
        out
    }

    #[must_use]
    pub fn default_response(
        transaction_sequence: u8,
        for_command_id: CommandId,
        status: u8,
        from_server: bool,
    ) -> Self {
        Self::new(
            false,
            None,
            from_server,
            true,
            transaction_sequence,
            CommandId::new(DEFAULT_RESPONSE_COMMAND_ID),
            vec![for_command_id.value(), status],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_cluster_specific_frame() {
        let frame = ZclFrame::new(true, None, false, false, 7, CommandId::new(0x01), vec![0xAA]);
        let bytes = frame.serialize();
        assert_eq!(bytes, vec![0x01, 7, 0x01, 0xAA]);

        let parsed = ZclFrame::parse(&bytes).unwrap();
        assert_eq!(parsed, frame);
        assert!(parsed.is_cluster_specific());
        assert!(!parsed.is_manufacturer_specific());
    }

    #[test]
    fn round_trips_manufacturer_specific_frame() {
        let frame = ZclFrame::new(
            true,
            Some(ManufacturerCode::new(0x115F)),
            true,
            true,
            42,
            CommandId::new(0x00),
            vec![],
        );
        let bytes = frame.serialize();
        let parsed = ZclFrame::parse(&bytes).unwrap();
        assert_eq!(parsed.manufacturer_code(), Some(ManufacturerCode::new(0x115F)));
        assert!(parsed.is_from_server());
        assert!(parsed.disable_default_response());
    }

    #[test]
    fn default_response_body_round_trips() {
        let frame = ZclFrame::default_response(3, CommandId::new(0x01), 0x00, true);
        assert!(frame.is_default_response());
        let (cmd, status) = frame.default_response_body().unwrap();
        assert_eq!(cmd, CommandId::new(0x01));
        assert_eq!(status, 0x00);
    }

    #[test]
    fn parse_rejects_truncated_frame() {
        assert!(ZclFrame::parse(&[]).is_err());
        assert!(ZclFrame::parse(&[MANUFACTURER_SPECIFIC_BIT]).is_err());
    }

    #[test]
    fn default_response_body_rejects_non_default_frame() {
        let frame = ZclFrame::new(true, None, false, false, 1, CommandId::new(0x01), vec![0x00, 0x00]);
        assert!(frame.default_response_body().is_err());
    }
}
