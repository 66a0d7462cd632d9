//! Schema database (C4): clusters, attributes, commands, enumerations,
//! devices and profiles as parsed from the declarative XML sources, keyed
//! for lookup by `(profile, cluster, manufacturer-code)`.
//!
//! Grounded on `examples/original_source/deconz/zcl.h`'s `ZclCluster`/
//! `ZclAttribute`/`ZclAttributeSet`/`ZclCommand` classes (the structural,
//! schema-side fields only — runtime value state lives in `zigbee-core`'s
//! `ZclAttribute`, which wraps [`AttributeSchema`]) and `zcl.cpp`'s
//! `ZclDataBase::inCluster`/`outCluster` (domain-keyed lookup, the
//! `cluster_id >= 0xFC00` manufacturer-key rule, and the `0x115F`/`0x1037`
//! legacy alias).

use std::collections::HashMap;

use deconz_protocol::ids::mfcode_aliases_match;
use deconz_protocol::{AttributeId, ClusterId, CommandId, ManufacturerCode, ProfileId};

/// Read/write access mode of a schema attribute (`ZclAccess`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

/// Structural (schema-side) description of a ZCL attribute: everything that
/// comes from the XML and never changes at runtime. `zigbee-core`'s runtime
/// `ZclAttribute` wraps one of these plus the current value.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSchema {
    pub id: AttributeId,
    pub name: String,
    pub description: String,
    pub data_type: deconz_protocol::DataTypeId,
    pub access: Access,
    pub mandatory: bool,
    pub manufacturer_code: ManufacturerCode,
    /// Parent attribute-set id and its manufacturer code, if this attribute
    /// was declared inside an `<attribute-set>` element.
    pub attribute_set: Option<(u16, ManufacturerCode)>,
    /// Marks variable-length lists: the id of the attribute that carries the
    /// list's element count.
    pub list_size_attribute: Option<AttributeId>,
    pub range_min: Option<i64>,
    pub range_max: Option<i64>,
    /// Id of the [`Enumeration`] this attribute's value is rendered against,
    /// set from the `enumeration="<name>"` XML attribute (resolved against
    /// the domain's already-loaded enumerations at parse time).
    pub enumeration_id: Option<u8>,
    /// Inline value name/position overrides declared as nested `<value>`
    /// elements directly under this `<attribute>`, distinct from a shared
    /// [`Enumeration`] referenced by `enumeration_id`.
    pub value_names: Vec<EnumerationValue>,
    /// Named bits for a bitmap-typed attribute, position = bit index.
    pub bitmap_bits: Vec<EnumerationValue>,
}

impl AttributeSchema {
    #[must_use]
    pub fn new(
        id: AttributeId,
        data_type: deconz_protocol::DataTypeId,
        name: impl Into<String>,
        access: Access,
        mandatory: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            data_type,
            access,
            mandatory,
            manufacturer_code: ManufacturerCode::NONE,
            attribute_set: None,
            list_size_attribute: None,
            range_min: None,
            range_max: None,
            enumeration_id: None,
            value_names: Vec::new(),
            bitmap_bits: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_manufacturer_specific(&self) -> bool {
        self.manufacturer_code.is_specific()
    }

    /// Looks up `position` first in this attribute's own inline
    /// `value_names` override list, matching the reference's
    /// `m_valueNames`/`m_valuePos` pair taking precedence over a shared
    /// enumeration when both are present.
    #[must_use]
    pub fn value_name_at(&self, position: i32) -> Option<&str> {
        self.value_names.iter().find(|v| v.position == position).map(|v| v.name.as_str())
    }

    #[must_use]
    pub fn bit_name_at(&self, bit: i32) -> Option<&str> {
        self.bitmap_bits.iter().find(|v| v.position == bit).map(|v| v.name.as_str())
    }

    /// `true` for a matching caller mfcode: either the attribute is not
    /// manufacturer-specific, it matches exactly, or the legacy Xiaomi
    /// `0x115F`/`0x1037` alias applies.
    #[must_use]
    pub fn visible_to(&self, mfcode: ManufacturerCode) -> bool {
        !self.manufacturer_code.is_specific() || mfcode_aliases_match(self.manufacturer_code, mfcode)
    }
}

/// A named group of attributes within a cluster (`ZclAttributeSet`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSetSchema {
    pub id: u16,
    pub description: String,
    pub manufacturer_code: ManufacturerCode,
    /// Indexes into the owning cluster's `attributes` list.
    pub attribute_indexes: Vec<usize>,
}

/// Structural description of a ZCL command (`ZclCommand`).
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSchema {
    pub id: CommandId,
    pub name: String,
    pub description: String,
    pub manufacturer_id: ManufacturerCode,
    /// `0xFF` = no response.
    pub response_id: u8,
    /// `true` if the command is received by the cluster's role (server
    /// receives `recv`-direction commands), matching `directionReceived()`.
    pub direction_received: bool,
    pub mandatory: bool,
    pub disable_default_response: bool,
    pub is_profile_wide: bool,
    /// Ordered parameter list; structural only (each entry's `data_type` and
    /// `name` matter, value fields are unused for parameters).
    pub parameters: Vec<AttributeSchema>,
}

impl CommandSchema {
    #[must_use]
    pub fn has_response(&self) -> bool {
        self.response_id != 0xFF
    }
}

/// Structural description of a ZCL cluster (`ZclCluster`).
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSchema {
    pub id: ClusterId,
    pub opposite_id: ClusterId,
    pub manufacturer_code: ManufacturerCode,
    pub name: String,
    pub description: String,
    pub is_zcl: bool,
    pub is_server: bool,
    pub attributes: Vec<AttributeSchema>,
    pub attribute_sets: Vec<AttributeSetSchema>,
    pub commands: Vec<CommandSchema>,
}

impl ClusterSchema {
    #[must_use]
    pub fn unknown(id: ClusterId) -> Self {
        Self {
            id,
            opposite_id: id,
            manufacturer_code: ManufacturerCode::NONE,
            name: "Unknown".to_string(),
            description: String::new(),
            is_zcl: true,
            is_server: true,
            attributes: Vec::new(),
            attribute_sets: Vec::new(),
            commands: Vec::new(),
        }
    }

    #[must_use]
    pub fn attribute(&self, id: AttributeId) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.id == id)
    }

    #[must_use]
    pub fn command(&self, id: CommandId) -> Option<&CommandSchema> {
        self.commands.iter().find(|c| c.id == id)
    }

    /// Filters attributes and commands down to the ones visible to `mfcode`,
    /// matching `ZclDataBase::inCluster`'s `std::copy_if` passes.
    #[must_use]
    pub fn filtered_for(&self, mfcode: ManufacturerCode) -> Self {
        let mut filtered = self.clone();
        filtered.attributes.retain(|a| a.visible_to(mfcode));
        filtered
            .commands
            .retain(|c| !c.manufacturer_id.is_specific() || c.manufacturer_id == mfcode);
        filtered
    }
}

/// A single enumeration value (bitmap bit name or enum position name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationValue {
    pub position: i32,
    pub name: String,
}

/// A named enumeration or bitmap value set, referenced from an attribute by
/// `enumeration_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    pub id: u8,
    pub name: String,
    pub values: Vec<EnumerationValue>,
}

impl Enumeration {
    #[must_use]
    pub fn name_at(&self, position: i32) -> Option<&str> {
        self.values.iter().find(|v| v.position == position).map(|v| v.name.as_str())
    }
}

/// A device type entry, keyed by `(profile-id, device-id, name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// `None` means this entry is generic (applies across profiles); a
    /// profile-specific entry with the same device id is preferred when
    /// both exist, matching the spec's lookup-preference rule.
    pub profile_id: Option<ProfileId>,
    pub device_id: u16,
    pub name: String,
}

/// A named group of clusters, referenced by one or more profiles via
/// `<domain-ref>`.
#[derive(Debug, Clone, Default)]
pub struct Domain {
    pub name: String,
    pub description: String,
    pub use_zcl: bool,
    /// Keyed by the composite key described in SPEC_FULL.md §3: `cluster_id`
    /// when `< 0xFC00`, else `(mfcode << 16) | cluster_id`.
    pub in_clusters: HashMap<u32, ClusterSchema>,
    pub out_clusters: HashMap<u32, ClusterSchema>,
}

impl Domain {
    #[must_use]
    pub fn domain_key(cluster_id: u16, mfcode: ManufacturerCode) -> u32 {
        if cluster_id >= 0xFC00 {
            (u32::from(mfcode.value()) << 16) | u32::from(cluster_id)
        } else {
            u32::from(cluster_id)
        }
    }
}

/// A ZCL profile (e.g. Home Automation `0x0104`), referencing domains by
/// name.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    pub description: String,
    pub domain_refs: Vec<String>,
}

/// Top-level schema database: every domain, profile, device and data type
/// parsed from the XML sources, plus the lookup methods described in
/// SPEC_FULL.md §4.4.
#[derive(Debug, Clone, Default)]
pub struct SchemaDatabase {
    pub data_types: super::datatype::DataTypeRegistry,
    pub enumerations: Vec<Enumeration>,
    pub devices: Vec<Device>,
    pub profiles: HashMap<u16, Profile>,
    pub domains: HashMap<String, Domain>,
}

impl SchemaDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn data_type(&self, id: deconz_protocol::DataTypeId) -> Option<&super::datatype::DataTypeDescriptor> {
        self.data_types.by_id(id)
    }

    #[must_use]
    pub fn data_type_by_name(&self, name: &str) -> Option<&super::datatype::DataTypeDescriptor> {
        self.data_types.by_short_name(name)
    }

    #[must_use]
    pub fn enumeration(&self, id: u8) -> Option<&Enumeration> {
        self.enumerations.iter().find(|e| e.id == id)
    }

    /// Device lookup keyed by `(profile, device-id)`, preferring a
    /// profile-specific entry over a generic one (SPEC_FULL.md §3).
    #[must_use]
    pub fn device(&self, profile_id: ProfileId, device_id: u16) -> Option<&Device> {
        self.devices
            .iter()
            .find(|d| d.profile_id == Some(profile_id) && d.device_id == device_id)
            .or_else(|| self.devices.iter().find(|d| d.profile_id.is_none() && d.device_id == device_id))
    }

    fn lookup(&self, profile_id: u16, cluster_id: u16, mfcode: ManufacturerCode, server: bool) -> ClusterSchema {
        if let Some(profile) = self.profiles.get(&profile_id) {
            let key = Domain::domain_key(cluster_id, mfcode);
            for domain_name in &profile.domain_refs {
                let Some(domain) = self.domains.get(domain_name) else { continue };
                let table = if server { &domain.in_clusters } else { &domain.out_clusters };
                if let Some(cluster) = table.get(&key) {
                    return cluster.filtered_for(mfcode);
                }
            }
        }
        ClusterSchema::unknown(ClusterId::new(cluster_id))
    }

    /// `ZCL_InCluster(profileId, clusterId, mfcode)`: a server-side (incoming)
    /// cluster lookup. Returns a placeholder `"Unknown"` cluster when absent.
    #[must_use]
    pub fn in_cluster(&self, profile_id: ProfileId, cluster_id: ClusterId, mfcode: ManufacturerCode) -> ClusterSchema {
        self.lookup(profile_id.value(), cluster_id.value(), mfcode, true)
    }

    /// `ZCL_OutCluster(profileId, clusterId, mfcode)`: a client-side
    /// (outgoing) cluster lookup.
    #[must_use]
    pub fn out_cluster(&self, profile_id: ProfileId, cluster_id: ClusterId, mfcode: ManufacturerCode) -> ClusterSchema {
        self.lookup(profile_id.value(), cluster_id.value(), mfcode, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_db() -> SchemaDatabase {
        let mut db = SchemaDatabase::new();
        let mut cluster = ClusterSchema::unknown(ClusterId::new(0x0006));
        cluster.name = "On/Off".to_string();
        cluster.attributes.push(AttributeSchema::new(
            AttributeId::new(0x0000),
            deconz_protocol::DataTypeId::new(0x10),
            "OnOff",
            Access::Read,
            true,
        ));
        let mut mfattr = AttributeSchema::new(
            AttributeId::new(0x4001),
            deconz_protocol::DataTypeId::new(0x20),
            "VendorAttr",
            Access::ReadWrite,
            false,
        );
        mfattr.manufacturer_code = ManufacturerCode::new(0x115F);
        cluster.attributes.push(mfattr);

        let mut domain = Domain { name: "general".to_string(), use_zcl: true, ..Default::default() };
        domain.in_clusters.insert(0x0006, cluster);

        db.domains.insert("general".to_string(), domain);
        db.profiles.insert(
            0x0104,
            Profile {
                id: ProfileId::new(0x0104),
                name: "Home Automation".to_string(),
                description: String::new(),
                domain_refs: vec!["general".to_string()],
            },
        );
        db
    }

    #[test]
    fn in_cluster_returns_known_cluster() {
        let db = sample_db();
        let cl = db.in_cluster(ProfileId::new(0x0104), ClusterId::new(0x0006), ManufacturerCode::NONE);
        assert_eq!(cl.name, "On/Off");
        // The Xiaomi-specific attribute is filtered out for a non-matching mfcode.
        assert_eq!(cl.attributes.len(), 1);
    }

    #[test]
    fn legacy_mfcode_alias_unlocks_vendor_attribute() {
        let db = sample_db();
        let cl = db.in_cluster(ProfileId::new(0x0104), ClusterId::new(0x0006), ManufacturerCode::new(0x1037));
        assert_eq!(cl.attributes.len(), 2);
    }

    #[test]
    fn unknown_cluster_is_placeholder() {
        let db = sample_db();
        let cl = db.in_cluster(ProfileId::new(0x0104), ClusterId::new(0x1234), ManufacturerCode::NONE);
        assert_eq!(cl.name, "Unknown");
        assert_eq!(cl.id, ClusterId::new(0x1234));
    }

    #[test]
    fn manufacturer_specific_cluster_uses_composite_key() {
        let mut db = sample_db();
        let mut mf_cluster = ClusterSchema::unknown(ClusterId::new(0xFC01));
        mf_cluster.name = "VendorCluster".to_string();
        mf_cluster.manufacturer_code = ManufacturerCode::new(0x117C);
        let key = Domain::domain_key(0xFC01, ManufacturerCode::new(0x117C));
        db.domains.get_mut("general").unwrap().in_clusters.insert(key, mf_cluster);

        let found = db.in_cluster(ProfileId::new(0x0104), ClusterId::new(0xFC01), ManufacturerCode::new(0x117C));
        assert_eq!(found.name, "VendorCluster");

        let missing = db.in_cluster(ProfileId::new(0x0104), ClusterId::new(0xFC01), ManufacturerCode::new(0x0001));
        assert_eq!(missing.name, "Unknown");
    }
}
