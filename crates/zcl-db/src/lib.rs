//! ZCL schema database (C4): data types, clusters, attributes, commands,
//! enumerations, devices and profiles, loaded from the declarative XML
//! sources described in SPEC_FULL.md §4.4, plus the `(profile, cluster,
//! manufacturer-code)` lookup used by the runtime ZCL layer in
//! `zigbee-core`.
//!
//! Grounded on the deCONZ reference stack's `zcl.h`/`zcl.cpp` (see
//! DESIGN.md for the per-module ledger).

pub mod config;
pub mod datatype;
pub mod error;
pub mod schema;
pub mod xml;

pub use config::{ZclDb, ZclDbConfig, DEFAULT_INDEX_PATH, ZCLDB_INDEX_ENV};
pub use datatype::{AnalogDiscrete, DataTypeDescriptor, DataTypeRegistry, STANDARD_TYPES};
pub use error::{Result, SchemaError};
pub use schema::{
    Access, AttributeSchema, AttributeSetSchema, ClusterSchema, CommandSchema, Device, Domain,
    Enumeration, EnumerationValue, Profile, SchemaDatabase,
};
pub use xml::load_index;
