//! Runtime ZCL cluster (C5)
//!
//! Grounded on `examples/original_source/deconz/zcl.h`'s `ZclCluster` class
//! (attribute/attribute-set/command storage, `inCluster`/`outCluster` role)
//! and SPEC_FULL.md §4.6's `ZclCluster::readCommand` dispatch: walk the
//! command table, match on id, pick the first command whose direction bit
//! matches the frame's direction given the cluster's server/client role,
//! then read parameters in declaration order.

use zcl_db::ClusterSchema;

use crate::command::ZclCommand;
use crate::error::{CodecError, Result};
use crate::frame::ZclFrame;

/// A runtime ZCL cluster: its schema plus nothing else — attribute and
/// command *values* live on the [`ZclCommand`]/`ZclAttribute` instances
/// produced by [`ZclCluster::read_command`], not stored back on the
/// cluster itself (the schema's attribute/command lists are immutable
/// declarations shared across every node that exposes this cluster).
#[derive(Debug, Clone)]
pub struct ZclCluster {
    pub schema: ClusterSchema,
}

impl ZclCluster {
    #[must_use]
    pub fn new(schema: ClusterSchema) -> Self {
        Self { schema }
    }

    /// `ZclCluster::readCommand(ZclFrame)`: looks up the command whose id
    /// matches the frame and whose direction agrees with this cluster's
    /// server/client role, then decodes its parameters from the frame
    /// payload in declaration order.
    pub fn read_command(&self, frame: &ZclFrame) -> Result<ZclCommand> {
        let expects_received = frame.is_from_server() != self.schema.is_server;
        let schema = self
            .schema
            .commands
            .iter()
            .find(|c| c.id == frame.command_id() && c.direction_received == expects_received)
            .cloned()
            .ok_or_else(|| CodecError::Malformed(format!("no matching command for id {:#04x}", frame.command_id().value())))?;

        let mut command = ZclCommand::new(schema);
        command.decode_parameters(frame.payload())?;
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deconz_protocol::{AttributeId, CommandId, DataTypeId, ManufacturerCode, NumericValue};
    use zcl_db::{Access, AttributeSchema, CommandSchema};

    fn on_off_cluster() -> ZclCluster {
        let mut schema = ClusterSchema::unknown(deconz_protocol::ClusterId::new(0x0006));
        schema.name = "On/Off".to_string();
        schema.is_server = true;
        schema.commands.push(CommandSchema {
            id: CommandId::new(0x00),
            name: "Off".to_string(),
            description: String::new(),
            manufacturer_id: ManufacturerCode::NONE,
            response_id: 0xFF,
            direction_received: true,
            mandatory: true,
            disable_default_response: false,
            is_profile_wide: false,
            parameters: Vec::new(),
        });
        schema.commands.push(CommandSchema {
            id: CommandId::new(0x01),
            name: "MoveWithOnOff".to_string(),
            description: String::new(),
            manufacturer_id: ManufacturerCode::NONE,
            response_id: 0xFF,
            direction_received: true,
            mandatory: false,
            disable_default_response: false,
            is_profile_wide: false,
            parameters: vec![AttributeSchema::new(
                AttributeId::new(0x00),
                DataTypeId::new(0x20),
                "OnOffControl",
                Access::Read,
                true,
            )],
        });
        ZclCluster::new(schema)
    }

    #[test]
    fn dispatches_to_matching_command_by_id() {
        let cluster = on_off_cluster();
        let frame = ZclFrame::new(true, None, false, false, 1, CommandId::new(0x00), vec![]);
        let cmd = cluster.read_command(&frame).unwrap();
        assert_eq!(cmd.schema.name, "Off");
    }

    #[test]
    fn decodes_command_parameters_from_payload() {
        let cluster = on_off_cluster();
        let frame = ZclFrame::new(true, None, false, false, 1, CommandId::new(0x01), vec![0x01]);
        let cmd = cluster.read_command(&frame).unwrap();
        assert_eq!(cmd.parameters[0].value, Some(NumericValue::U8(0x01)));
    }

    #[test]
    fn unknown_command_id_errors() {
        let cluster = on_off_cluster();
        let frame = ZclFrame::new(true, None, false, false, 1, CommandId::new(0xEE), vec![]);
        assert!(cluster.read_command(&frame).is_err());
    }
}
