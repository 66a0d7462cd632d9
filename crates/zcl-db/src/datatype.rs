//! ZCL data type descriptors (C4)
//!
//! Grounded on `examples/original_source/deconz/zcl.h`'s `ZclDataTypeId` enum
//! (the full 35+ entry table) and `ZclDataType` class (name/shortname/length/
//! analog-discrete tag). The static table below is the "seed" set always
//! present; [`DataTypeRegistry::by_short_name`] is also the boundary the XML
//! loader uses when an `attribute`'s `type="..."` is a short name rather than
//! a hex id (SPEC_FULL.md §9 "strong-typed IDs across the schema").

use deconz_protocol::DataTypeId;

/// Whether a data type represents a continuous (analog) or discrete value,
/// matching `ZclDataType::isAnalog`/`isDiscrete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogDiscrete {
    Analog,
    Discrete,
}

/// A single entry of the ZCL data-type table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTypeDescriptor {
    pub id: DataTypeId,
    pub name: &'static str,
    pub short_name: &'static str,
    pub length: u8,
    pub kind: AnalogDiscrete,
}

macro_rules! dt {
    ($id:expr, $name:expr, $short:expr, $len:expr, $kind:ident) => {
        DataTypeDescriptor {
            id: DataTypeId::new($id),
            name: $name,
            short_name: $short,
            length: $len,
            kind: AnalogDiscrete::$kind,
        }
    };
}

/// The standard ZCL data-type table (SPEC_FULL.md §3 "Schema database").
/// `length` is in bytes; variable-length types (strings, arrays) carry 0.
pub const STANDARD_TYPES: &[DataTypeDescriptor] = &[
    dt!(0x00, "No Data", "nodata", 0, Discrete),
    dt!(0x08, "General Data 8-bit", "data8", 1, Discrete),
    dt!(0x09, "General Data 16-bit", "data16", 2, Discrete),
    dt!(0x0a, "General Data 24-bit", "data24", 3, Discrete),
    dt!(0x0b, "General Data 32-bit", "data32", 4, Discrete),
    dt!(0x0c, "General Data 40-bit", "data40", 5, Discrete),
    dt!(0x0d, "General Data 48-bit", "data48", 6, Discrete),
    dt!(0x0e, "General Data 56-bit", "data56", 7, Discrete),
    dt!(0x0f, "General Data 64-bit", "data64", 8, Discrete),
    dt!(0x10, "Boolean", "bool", 1, Discrete),
    dt!(0x18, "8-bit Bitmap", "bmp8", 1, Discrete),
    dt!(0x19, "16-bit Bitmap", "bmp16", 2, Discrete),
    dt!(0x1a, "24-bit Bitmap", "bmp24", 3, Discrete),
    dt!(0x1b, "32-bit Bitmap", "bmp32", 4, Discrete),
    dt!(0x1c, "40-bit Bitmap", "bmp40", 5, Discrete),
    dt!(0x1d, "48-bit Bitmap", "bmp48", 6, Discrete),
    dt!(0x1e, "56-bit Bitmap", "bmp56", 7, Discrete),
    dt!(0x1f, "64-bit Bitmap", "bmp64", 8, Discrete),
    dt!(0x20, "Unsigned 8-bit Integer", "uint8", 1, Analog),
    dt!(0x21, "Unsigned 16-bit Integer", "uint16", 2, Analog),
    dt!(0x22, "Unsigned 24-bit Integer", "uint24", 3, Analog),
    dt!(0x23, "Unsigned 32-bit Integer", "uint32", 4, Analog),
    dt!(0x24, "Unsigned 40-bit Integer", "uint40", 5, Analog),
    dt!(0x25, "Unsigned 48-bit Integer", "uint48", 6, Analog),
    dt!(0x26, "Unsigned 56-bit Integer", "uint56", 7, Analog),
    dt!(0x27, "Unsigned 64-bit Integer", "uint64", 8, Analog),
    dt!(0x28, "Signed 8-bit Integer", "int8", 1, Analog),
    dt!(0x29, "Signed 16-bit Integer", "int16", 2, Analog),
    dt!(0x2a, "Signed 24-bit Integer", "int24", 3, Analog),
    dt!(0x2b, "Signed 32-bit Integer", "int32", 4, Analog),
    dt!(0x2c, "Signed 40-bit Integer", "int40", 5, Analog),
    dt!(0x2d, "Signed 48-bit Integer", "int48", 6, Analog),
    dt!(0x2e, "Signed 56-bit Integer", "int56", 7, Analog),
    dt!(0x2f, "Signed 64-bit Integer", "int64", 8, Analog),
    dt!(0x30, "8-bit Enumeration", "enum8", 1, Discrete),
    dt!(0x31, "16-bit Enumeration", "enum16", 2, Discrete),
    dt!(0x38, "Semi Float", "semi", 2, Analog),
    dt!(0x39, "Single Float", "single", 4, Analog),
    dt!(0x3a, "Double Float", "double", 8, Analog),
    dt!(0x41, "Octet String", "octstr", 0, Discrete),
    dt!(0x42, "Character String", "string", 0, Discrete),
    dt!(0x43, "Long Octet String", "octstr16", 0, Discrete),
    dt!(0x44, "Long Character String", "string16", 0, Discrete),
    dt!(0x48, "Array", "array", 0, Discrete),
    dt!(0x4c, "Structure", "struct", 0, Discrete),
    dt!(0xe0, "Time of Day", "tod", 4, Analog),
    dt!(0xe1, "Date", "date", 4, Analog),
    dt!(0xe2, "UTC Time", "utc", 4, Analog),
    dt!(0xe8, "Cluster Id", "clusterid", 2, Discrete),
    dt!(0xe9, "Attribute Id", "attribid", 2, Discrete),
    dt!(0xea, "BACnet OID", "bacoid", 4, Discrete),
    dt!(0xf0, "IEEE Address", "ieeeaddr", 8, Discrete),
    dt!(0xf1, "128-bit Security Key", "key128", 16, Discrete),
];

/// Runtime lookup table for data types, seeded from [`STANDARD_TYPES`] and
/// extended by anything the XML loader defines explicitly via a sibling
/// `<datatype>` element.
#[derive(Debug, Clone)]
pub struct DataTypeRegistry {
    entries: Vec<DataTypeDescriptor>,
}

impl Default for DataTypeRegistry {
    fn default() -> Self {
        Self { entries: STANDARD_TYPES.to_vec() }
    }
}

impl DataTypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: DataTypeDescriptor) {
        if let Some(existing) = self.entries.iter_mut().find(|d| d.id == descriptor.id) {
            *existing = descriptor;
        } else {
            self.entries.push(descriptor);
        }
    }

    #[must_use]
    pub fn by_id(&self, id: DataTypeId) -> Option<&DataTypeDescriptor> {
        self.entries.iter().find(|d| d.id == id)
    }

    #[must_use]
    pub fn by_short_name(&self, name: &str) -> Option<&DataTypeDescriptor> {
        self.entries.iter().find(|d| d.short_name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_round_trips_known_types() {
        let reg = DataTypeRegistry::new();
        let uint8 = reg.by_id(DataTypeId::new(0x20)).unwrap();
        assert_eq!(uint8.short_name, "uint8");
        assert_eq!(uint8.length, 1);
        assert_eq!(uint8.kind, AnalogDiscrete::Analog);

        let by_name = reg.by_short_name("bmp16").unwrap();
        assert_eq!(by_name.id, DataTypeId::new(0x19));
    }

    #[test]
    fn unknown_lookup_returns_none() {
        let reg = DataTypeRegistry::new();
        assert!(reg.by_id(DataTypeId::new(0x99)).is_none());
        assert!(reg.by_short_name("not-a-type").is_none());
    }

    #[test]
    fn insert_overrides_existing_id() {
        let mut reg = DataTypeRegistry::new();
        reg.insert(DataTypeDescriptor {
            id: DataTypeId::new(0x20),
            name: "Custom",
            short_name: "customu8",
            length: 1,
            kind: AnalogDiscrete::Analog,
        });
        assert_eq!(reg.by_id(DataTypeId::new(0x20)).unwrap().short_name, "customu8");
    }
}
