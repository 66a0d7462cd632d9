//! Host-side Zigbee protocol primitives: strong-typed identifiers, tagged
//! attribute values, object pools, addresses, and the APS/ZDP wire formats
//! that sit beneath the ZCL layer in `zigbee-core`.
//!
//! Grounded on the deCONZ/ConBee II reference stack (see DESIGN.md for the
//! per-module ledger).

pub mod address;
pub mod aps;
pub mod error;
pub mod ids;
pub mod pool;
pub mod value;
pub mod zdp;

pub use address::{Address, AddressMode};
pub use aps::{
    ApsDataConfirm, ApsDataIndication, ApsDataRequest, ApsState, ApsStatus, ApsTxOptions,
    RequestIdGenerator, SourceRouteAttachment,
};
pub use error::{ProtocolError, Result};
pub use ids::{AttributeId, ClusterId, CommandId, DataTypeId, ManufacturerCode, ProfileId};
pub use pool::Pool;
pub use value::{NumericValue, StringDecoded};
pub use zdp::{
    FrequencyBand, LogicalType, MacCapabilities, NodeDescriptor, PowerDescriptor, PowerLevel,
    PowerMode, PowerSource, SimpleDescriptor,
};
