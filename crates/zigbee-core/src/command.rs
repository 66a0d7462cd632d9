//! Runtime ZCL command (C5)
//!
//! Grounded on `examples/original_source/deconz/zcl.h`'s `ZclCommand` class
//! (`parameters()`, `readFromStream`/`writeToStream`, `directionReceived`,
//! `hasResponse`). Wraps a [`zcl_db::CommandSchema`] and holds the decoded
//! parameter values rather than duplicating the declaration.

use zcl_db::CommandSchema;

use crate::attribute::ZclAttribute;
use crate::error::Result;

/// A runtime ZCL command: its schema plus the parameter values decoded from
/// (or to be encoded into) a frame payload, in declaration order.
#[derive(Debug, Clone)]
pub struct ZclCommand {
    pub schema: CommandSchema,
    pub parameters: Vec<ZclAttribute>,
}

impl ZclCommand {
    #[must_use]
    pub fn new(schema: CommandSchema) -> Self {
        let parameters = schema.parameters.iter().cloned().map(ZclAttribute::new).collect();
        Self { schema, parameters }
    }

    #[must_use]
    pub fn has_response(&self) -> bool {
        self.schema.has_response()
    }

    /// `readFromStream`: walks `parameters` in declaration order, decoding
    /// each against the remaining payload bytes.
    pub fn decode_parameters(&mut self, payload: &[u8]) -> Result<()> {
        let mut offset = 0;
        for param in &mut self.parameters {
            offset += param.decode(&payload[offset..])?;
        }
        Ok(())
    }

    /// `writeToStream`: serializes `parameters` in declaration order.
    pub fn encode_parameters(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for param in &self.parameters {
            out.extend(param.encode()?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deconz_protocol::{AttributeId, CommandId, DataTypeId, ManufacturerCode, NumericValue};
    use zcl_db::Access;

    fn schema() -> CommandSchema {
        CommandSchema {
            id: CommandId::new(0x01),
            name: "MoveToLevel".to_string(),
            description: String::new(),
            manufacturer_id: ManufacturerCode::NONE,
            response_id: 0xFF,
            direction_received: true,
            mandatory: true,
            disable_default_response: false,
            is_profile_wide: false,
            parameters: vec![
                AttributeSchemaFixture::param(0x00, 0x20, "Level"),
                AttributeSchemaFixture::param(0x01, 0x21, "TransitionTime"),
            ],
        }
    }

    struct AttributeSchemaFixture;
    impl AttributeSchemaFixture {
        fn param(id: u16, data_type: u8, name: &str) -> zcl_db::AttributeSchema {
            zcl_db::AttributeSchema::new(AttributeId::new(id), DataTypeId::new(data_type), name, Access::Read, true)
        }
    }

    #[test]
    fn decodes_parameters_in_declaration_order() {
        let mut cmd = ZclCommand::new(schema());
        let payload = [0x32, 0x0A, 0x00];
        cmd.decode_parameters(&payload).unwrap();
        assert_eq!(cmd.parameters[0].value, Some(NumericValue::U8(0x32)));
        assert_eq!(cmd.parameters[1].value, Some(NumericValue::U16(0x000A)));
    }

    #[test]
    fn encodes_parameters_in_declaration_order() {
        let mut cmd = ZclCommand::new(schema());
        cmd.parameters[0].value = Some(NumericValue::U8(5));
        cmd.parameters[1].value = Some(NumericValue::U16(100));
        let bytes = cmd.encode_parameters().unwrap();
        assert_eq!(bytes, vec![5, 100, 0]);
    }

    #[test]
    fn has_response_reflects_schema() {
        let mut s = schema();
        assert!(!ZclCommand::new(s.clone()).has_response());
        s.response_id = 0x01;
        assert!(ZclCommand::new(s).has_response());
    }
}
