//! Zigbee abstraction layer
//!
//! This crate provides the schema-aware ZCL attribute/command/cluster/frame
//! codec, the node cache and routing substrate, and the controller façade
//! on top of the low-level deCONZ protocol primitives in `deconz-protocol`.

pub mod attribute;
pub mod cluster;
pub mod command;
pub mod controller;
pub mod error;
pub mod frame;
pub mod node;
pub mod persistence;
pub mod resource_url;

pub use attribute::{utc_time_to_rfc3339, ArrayValue, FormatHint, NumericBase, ReportConfig, ZclAttribute};
pub use cluster::ZclCluster;
pub use command::ZclCommand;
pub use controller::{
    ArrayParameter, Controller, NodeEvent, StringParameter, SubmitOutcome, Transport,
    U16Parameter, U32Parameter, U64Parameter, U8Parameter,
};
pub use error::{CodecError, ControllerError, ControllerResult, Result};
pub use frame::ZclFrame;
pub use node::{
    AddSourceRouteResult, Binding, BindingDstAddressMode, BindingTable, Node, SourceRoute,
    SourceRouteState,
};
pub use resource_url::{ClusterSide, ResourceAddress};
