//! XML schema loader (C4): the index file and the stack-machine parser for
//! the declarative `domain > cluster > {server|client} > attribute-set? >
//! attribute > value*` / `command > payload > attribute*` source files,
//! grounded on `examples/original_source/zcl.cpp`'s `ZclDataBase::readXML`
//! element dispatch (domain/cluster/server/client/attribute-set/attribute/
//! command/payload/datatype/enumeration/device/profile/domain-ref, each
//! malformed or unrecognized element skipped with a logged line number
//! rather than aborting the whole file).

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

use deconz_protocol::{AttributeId, ClusterId, CommandId, DataTypeId, ManufacturerCode, ProfileId};

use crate::error::{Result, SchemaError};
use crate::schema::{
    Access, AttributeSchema, AttributeSetSchema, ClusterSchema, CommandSchema, Device, Domain,
    Enumeration, EnumerationValue, Profile, SchemaDatabase,
};

fn attr_str(start: &BytesStart<'_>, key: &str) -> Option<String> {
    start.attributes().flatten().find(|a| a.key.as_ref() == key.as_bytes()).map(|a| {
        String::from_utf8_lossy(&a.value).into_owned()
    })
}

fn attr_u16(start: &BytesStart<'_>, key: &str) -> Option<u16> {
    parse_int(&attr_str(start, key)?)
}

fn attr_u8(start: &BytesStart<'_>, key: &str) -> Option<u8> {
    parse_int(&attr_str(start, key)?)
}

fn attr_bool(start: &BytesStart<'_>, key: &str) -> bool {
    matches!(attr_str(start, key).as_deref(), Some("true") | Some("1"))
}

fn parse_int<T: TryFrom<u64>>(text: &str) -> Option<T> {
    let text = text.trim();
    let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()?
    } else {
        text.parse::<u64>().ok()?
    };
    T::try_from(value).ok()
}

fn parse_data_type(reg: &crate::datatype::DataTypeRegistry, text: &str) -> Option<DataTypeId> {
    if let Some(id) = parse_int::<u8>(text) {
        return Some(DataTypeId::new(id));
    }
    reg.by_short_name(text).map(|d| d.id)
}

/// Reads a newline-delimited index file of absolute XML paths (SPEC_FULL.md
/// §6.1). Blank lines and lines starting with `#` are ignored. If the file
/// is missing, empty, or names a `general.xml` that does not exist on disk,
/// falls back to the platform default path.
pub fn load_index(index_path: &Path, default_path: &Path) -> Result<Vec<PathBuf>> {
    let text = match fs::read_to_string(index_path) {
        Ok(t) => t,
        Err(_) => {
            debug!(path = %index_path.display(), "schema index missing, seeding default");
            return Ok(vec![default_path.to_path_buf()]);
        }
    };

    let mut paths: Vec<PathBuf> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect();

    let stale = paths.iter().any(|p| {
        p.file_name().and_then(|n| n.to_str()) == Some("general.xml") && !p.exists()
    });

    if paths.is_empty() || stale {
        debug!(path = %index_path.display(), "schema index empty or stale, seeding default");
        paths = vec![default_path.to_path_buf()];
    }

    Ok(paths)
}

/// Loads every file named by `index_path` (see [`load_index`]) into `db`.
pub fn load_all(db: &mut SchemaDatabase, index_path: &Path, default_path: &Path) -> Result<()> {
    for path in load_index(index_path, default_path)? {
        load_file(db, &path)?;
    }
    Ok(())
}

/// Parses a single XML schema source into `db`, merging with whatever is
/// already loaded (domains/profiles/devices/enumerations/data types accumulate
/// across files, matching the reference loader's multi-file index).
pub fn load_file(db: &mut SchemaDatabase, path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).map_err(|source| SchemaError::Io { path: path.display().to_string(), source })?;
    load_str(db, &text, &path.display().to_string())
}

#[derive(Debug)]
enum Frame {
    Root,
    Domain(Domain),
    Cluster { domain: Domain, cluster: ClusterSchema, server: bool },
    AttributeSet { domain: Domain, cluster: ClusterSchema, server: bool, set: AttributeSetSchema },
    Attribute { domain: Domain, cluster: ClusterSchema, server: bool, set: Option<AttributeSetSchema>, attr: AttributeSchema },
    Command { domain: Domain, cluster: ClusterSchema, server: bool, cmd: CommandSchema },
    Payload { domain: Domain, cluster: ClusterSchema, server: bool, cmd: CommandSchema },
    PayloadAttribute { domain: Domain, cluster: ClusterSchema, server: bool, cmd: CommandSchema, attr: AttributeSchema },
    Enumeration(Enumeration),
    Profile(Profile),
}

/// Parses XML already held in memory, tagged with `origin` only for log
/// messages. The stack machine mirrors the reference parser: unknown or
/// malformed elements are skipped (with a debug/warn log of the element
/// name and byte position) rather than aborting the whole file.
pub fn load_str(db: &mut SchemaDatabase, xml: &str, origin: &str) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text = true;

    let mut stack: Vec<Frame> = vec![Frame::Root];
    let mut buf = Vec::new();

    loop {
        let pos = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Err(source) => return Err(SchemaError::Xml { file: origin.to_string(), source }),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                open_element(db, &mut stack, &e, &name, origin, pos);
            }
            Ok(Event::Empty(e)) => {
                let name = e.name().as_ref().to_vec();
                open_element(db, &mut stack, &e, &name, origin, pos);
                close_element(db, &mut stack, &name, origin, pos);
            }
            Ok(Event::End(e)) => {
                let name = e.name().as_ref().to_vec();
                close_element(db, &mut stack, &name, origin, pos);
            }
            Ok(Event::Text(_)) | Ok(Event::Comment(_)) | Ok(Event::CData(_)) | Ok(Event::Decl(_)) | Ok(Event::PI(_)) | Ok(Event::DocType(_)) => {}
        }
        buf.clear();
    }

    Ok(())
}

fn open_element(
    db: &mut SchemaDatabase,
    stack: &mut Vec<Frame>,
    e: &BytesStart<'_>,
    name: &[u8],
    origin: &str,
    pos: u64,
) {
    match name {
        b"domain" => {
            let mut domain = Domain { name: attr_str(e, "name").unwrap_or_default(), ..Default::default() };
            domain.description = attr_str(e, "description").unwrap_or_default();
            domain.use_zcl = attr_bool(e, "zcl") || !e.attributes().flatten().any(|a| a.key.as_ref() == b"zcl");
            stack.push(Frame::Domain(domain));
        }
        b"cluster" => {
            let Some(Frame::Domain(_)) = stack.last() else {
                warn!(origin, pos, "<cluster> outside <domain>, skipping");
                return;
            };
            let Some(Frame::Domain(domain)) = stack.pop() else { unreachable!() };
            let id = attr_u16(e, "id").unwrap_or(0);
            let mut cluster = ClusterSchema::unknown(ClusterId::new(id));
            cluster.opposite_id = ClusterId::new(attr_u16(e, "opposite").unwrap_or(id));
            cluster.manufacturer_code = ManufacturerCode::new(attr_u16(e, "mfcode").unwrap_or(0));
            cluster.name = attr_str(e, "name").unwrap_or_else(|| "Unknown".to_string());
            cluster.description = attr_str(e, "description").unwrap_or_default();
            cluster.is_zcl = !attr_str(e, "zcl").as_deref().is_some_and(|v| v == "false");
            // `server`/`client` child elements set `is_server`; default to server.
            cluster.is_server = true;
            stack.push(Frame::Domain(domain));
            stack.push(Frame::Cluster { domain: Domain::default(), cluster, server: true });
        }
        b"server" | b"client" => {
            let server = name == b"server";
            match stack.pop() {
                Some(Frame::Cluster { domain, mut cluster, .. }) => {
                    cluster.is_server = server;
                    stack.push(Frame::Cluster { domain, cluster, server });
                }
                Some(other) => stack.push(other),
                None => {}
            }
        }
        b"attribute-set" => {
            if let Some(Frame::Cluster { domain, cluster, server }) = pop_matching(stack) {
                let set = AttributeSetSchema {
                    id: attr_u16(e, "id").unwrap_or(0),
                    description: attr_str(e, "description").unwrap_or_default(),
                    manufacturer_code: ManufacturerCode::new(attr_u16(e, "mfcode").unwrap_or(0)),
                    attribute_indexes: Vec::new(),
                };
                stack.push(Frame::AttributeSet { domain, cluster, server, set });
            } else {
                warn!(origin, pos, "<attribute-set> outside <cluster>, skipping");
            }
        }
        b"attribute" => {
            let data_type_text = attr_str(e, "type").unwrap_or_default();
            let data_type = parse_data_type(&db.data_types, &data_type_text).unwrap_or(DataTypeId::NO_DATA);
            let id = AttributeId::new(attr_u16(e, "id").unwrap_or(0));
            let mut attr = AttributeSchema::new(
                id,
                data_type,
                attr_str(e, "name").unwrap_or_default(),
                parse_access(attr_str(e, "access").as_deref()),
                attr_bool(e, "mandatory"),
            );
            attr.description = attr_str(e, "description").unwrap_or_default();
            attr.manufacturer_code = ManufacturerCode::new(attr_u16(e, "mfcode").unwrap_or(0));
            attr.range_min = attr_str(e, "min").and_then(|v| v.parse().ok());
            attr.range_max = attr_str(e, "max").and_then(|v| v.parse().ok());
            if let Some(enum_name) = attr_str(e, "enumeration") {
                match db.enumerations.iter().find(|en| en.name == enum_name) {
                    Some(found) => attr.enumeration_id = Some(found.id),
                    None => warn!(origin, pos, enum_name, "enumeration not found for attribute"),
                }
            }

            match stack.pop() {
                Some(Frame::AttributeSet { domain, cluster, server, set }) => {
                    attr.attribute_set = Some((set.id, set.manufacturer_code));
                    stack.push(Frame::Attribute { domain, cluster, server, set: Some(set), attr });
                }
                Some(Frame::Cluster { domain, cluster, server }) => {
                    stack.push(Frame::Attribute { domain, cluster, server, set: None, attr });
                }
                Some(Frame::Payload { domain, cluster, server, cmd }) => {
                    stack.push(Frame::PayloadAttribute { domain, cluster, server, cmd, attr });
                }
                other => {
                    warn!(origin, pos, "<attribute> in unexpected context, skipping");
                    if let Some(other) = other {
                        stack.push(other);
                    }
                }
            }
        }
        b"value" => {
            let Some(name) = attr_str(e, "name") else {
                warn!(origin, pos, "<value> missing name, skipping");
                return;
            };
            let Some(position) = attr_str(e, "value").and_then(|v| parse_int::<i32>(&v)) else {
                warn!(origin, pos, "<value> missing or invalid value, skipping");
                return;
            };
            match stack.last_mut() {
                Some(Frame::Enumeration(enumeration)) => {
                    enumeration.values.push(EnumerationValue { position, name });
                }
                Some(Frame::Attribute { attr, .. }) => {
                    attr.value_names.push(EnumerationValue { position, name });
                }
                _ => {
                    warn!(origin, pos, "<value> outside <enumeration> or <attribute>, skipping");
                }
            }
        }
        b"command" => {
            if let Some(Frame::Cluster { domain, cluster, server }) = pop_matching(stack) {
                let cmd = CommandSchema {
                    id: CommandId::new(attr_u8(e, "id").unwrap_or(0)),
                    name: attr_str(e, "name").unwrap_or_default(),
                    description: attr_str(e, "description").unwrap_or_default(),
                    manufacturer_id: ManufacturerCode::new(attr_u16(e, "mfcode").unwrap_or(0)),
                    response_id: attr_u8(e, "response").unwrap_or(0xFF),
                    direction_received: attr_str(e, "direction").as_deref() != Some("send"),
                    mandatory: attr_bool(e, "mandatory"),
                    disable_default_response: attr_bool(e, "disable-default-response"),
                    is_profile_wide: attr_bool(e, "profile-wide"),
                    parameters: Vec::new(),
                };
                stack.push(Frame::Command { domain, cluster, server, cmd });
            } else {
                warn!(origin, pos, "<command> outside <cluster>, skipping");
            }
        }
        b"payload" => match stack.pop() {
            Some(Frame::Command { domain, cluster, server, cmd }) => {
                stack.push(Frame::Payload { domain, cluster, server, cmd });
            }
            other => {
                warn!(origin, pos, "<payload> outside <command>, skipping");
                if let Some(other) = other {
                    stack.push(other);
                }
            }
        },
        b"datatype" => {
            let id = DataTypeId::new(attr_u8(e, "id").unwrap_or(0));
            let short_name = attr_str(e, "shortname").unwrap_or_default();
            let name = attr_str(e, "name").unwrap_or_default();
            let length = attr_u8(e, "length").unwrap_or(0);
            let analog = attr_str(e, "kind").as_deref() == Some("analog");
            db.data_types.insert(crate::datatype::DataTypeDescriptor {
                id,
                name: Box::leak(name.into_boxed_str()),
                short_name: Box::leak(short_name.into_boxed_str()),
                length,
                kind: if analog { crate::datatype::AnalogDiscrete::Analog } else { crate::datatype::AnalogDiscrete::Discrete },
            });
        }
        b"enumeration" => {
            stack.push(Frame::Enumeration(Enumeration {
                id: attr_u8(e, "id").unwrap_or(0),
                name: attr_str(e, "name").unwrap_or_default(),
                values: Vec::new(),
            }));
        }
        b"device" => {
            db.devices.push(Device {
                profile_id: attr_u16(e, "profile").map(ProfileId::new),
                device_id: attr_u16(e, "id").unwrap_or(0),
                name: attr_str(e, "name").unwrap_or_default(),
            });
        }
        b"profile" => {
            stack.push(Frame::Profile(Profile {
                id: ProfileId::new(attr_u16(e, "id").unwrap_or(0)),
                name: attr_str(e, "name").unwrap_or_default(),
                description: attr_str(e, "description").unwrap_or_default(),
                domain_refs: Vec::new(),
            }));
        }
        b"domain-ref" => {
            if let Some(Frame::Profile(profile)) = stack.last_mut() {
                if let Some(name) = attr_str(e, "name") {
                    profile.domain_refs.push(name);
                }
            } else {
                warn!(origin, pos, "<domain-ref> outside <profile>, skipping");
            }
        }
        other => {
            debug!(origin, pos, element = %String::from_utf8_lossy(other), "unrecognized schema element, skipping");
        }
    }
}

fn close_element(db: &mut SchemaDatabase, stack: &mut Vec<Frame>, name: &[u8], origin: &str, pos: u64) {
    match name {
        b"domain" => {
            if let Some(Frame::Domain(domain)) = stack.pop() {
                db.domains.insert(domain.name.clone(), domain);
            }
        }
        b"cluster" => {
            if let Some(Frame::Cluster { cluster, server, .. }) = stack.pop() {
                if let Some(Frame::Domain(domain)) = stack.last_mut() {
                    let key = Domain::domain_key(cluster.id.value(), cluster.manufacturer_code);
                    let table = if server { &mut domain.in_clusters } else { &mut domain.out_clusters };
                    table.insert(key, cluster);
                } else {
                    warn!(origin, pos, "</cluster> without enclosing <domain>");
                }
            }
        }
        b"server" | b"client" => {}
        b"attribute-set" => {
            if let Some(Frame::AttributeSet { domain, cluster, server, set }) = stack.pop() {
                let mut cluster = cluster;
                cluster.attribute_sets.push(set);
                stack.push(Frame::Cluster { domain, cluster, server });
            }
        }
        b"attribute" => match stack.pop() {
            Some(Frame::Attribute { domain, mut cluster, server, set, attr }) => {
                if let Some(mut set) = set {
                    set.attribute_indexes.push(cluster.attributes.len());
                    cluster.attributes.push(attr);
                    stack.push(Frame::AttributeSet { domain, cluster, server, set });
                } else {
                    cluster.attributes.push(attr);
                    stack.push(Frame::Cluster { domain, cluster, server });
                }
            }
            Some(Frame::PayloadAttribute { domain, cluster, server, mut cmd, attr }) => {
                cmd.parameters.push(attr);
                stack.push(Frame::Payload { domain, cluster, server, cmd });
            }
            other => {
                if let Some(other) = other {
                    stack.push(other);
                }
            }
        },
        b"value" => {}
        b"payload" => {
            if let Some(Frame::Payload { domain, cluster, server, cmd }) = stack.pop() {
                stack.push(Frame::Command { domain, cluster, server, cmd });
            }
        }
        b"command" => {
            if let Some(Frame::Command { domain, mut cluster, server, cmd }) = stack.pop() {
                cluster.commands.push(cmd);
                stack.push(Frame::Cluster { domain, cluster, server });
            }
        }
        b"datatype" | b"device" | b"domain-ref" => {}
        b"enumeration" => {
            if let Some(Frame::Enumeration(e)) = stack.pop() {
                db.enumerations.push(e);
            }
        }
        b"profile" => {
            if let Some(Frame::Profile(p)) = stack.pop() {
                db.profiles.insert(p.id.value(), p);
            }
        }
        _ => {}
    }
}

/// Pops a `Frame::Cluster` off the top of the stack without disturbing
/// anything else, returning it so the caller can wrap and re-push it.
fn pop_matching(stack: &mut Vec<Frame>) -> Option<Frame> {
    match stack.last() {
        Some(Frame::Cluster { .. }) => stack.pop(),
        _ => None,
    }
}

fn parse_access(text: Option<&str>) -> Access {
    match text {
        Some("w") | Some("write") => Access::Write,
        Some("rw") | Some("read-write") => Access::ReadWrite,
        _ => Access::Read,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERAL_XML: &str = r#"
        <profile id="0x0104" name="Home Automation">
            <domain-ref name="general"/>
        </profile>
        <domain name="general" description="Common clusters">
            <cluster id="0x0006" name="On/Off">
                <server>
                    <attribute id="0x0000" name="OnOff" type="bool" access="r" mandatory="true"/>
                    <command id="0x00" name="Off"/>
                    <command id="0x01" name="On"/>
                </server>
            </cluster>
        </domain>
    "#;

    #[test]
    fn parses_minimal_cluster_and_profile() {
        let mut db = SchemaDatabase::new();
        load_str(&mut db, GENERAL_XML, "test").unwrap();

        let cl = db.in_cluster(ProfileId::new(0x0104), ClusterId::new(0x0006), ManufacturerCode::NONE);
        assert_eq!(cl.name, "On/Off");
        assert_eq!(cl.attributes.len(), 1);
        assert_eq!(cl.attributes[0].name, "OnOff");
        assert_eq!(cl.commands.len(), 2);
    }

    #[test]
    fn unknown_element_is_skipped_not_fatal() {
        let mut db = SchemaDatabase::new();
        let xml = r#"<domain name="x"><bogus foo="bar"/><cluster id="1" name="C"><server/></cluster></domain>"#;
        load_str(&mut db, xml, "test").unwrap();
        assert!(db.domains.contains_key("x"));
    }

    #[test]
    fn enumeration_values_and_attribute_reference_are_parsed() {
        let mut db = SchemaDatabase::new();
        let xml = r#"
            <enumeration id="1" name="PowerSource">
                <value name="Battery" value="0x03"/>
                <value name="Mains" value="0x01"/>
            </enumeration>
            <domain name="general">
                <cluster id="1" name="C">
                    <server>
                        <attribute id="0" name="Source" type="enum8" enumeration="PowerSource">
                            <value name="Override" value="5"/>
                        </attribute>
                    </server>
                </cluster>
            </domain>
        "#;
        load_str(&mut db, xml, "test").unwrap();

        let enumeration = db.enumeration(1).unwrap();
        assert_eq!(enumeration.name_at(0x03), Some("Battery"));
        assert_eq!(enumeration.name_at(0x01), Some("Mains"));

        let domain = db.domains.get("general").unwrap();
        let cluster = domain.in_clusters.get(&1).unwrap();
        let attr = &cluster.attributes[0];
        assert_eq!(attr.enumeration_id, Some(1));
        assert_eq!(attr.value_name_at(5), Some("Override"));
    }

    #[test]
    fn index_falls_back_to_default_when_missing() {
        let paths = load_index(Path::new("/nonexistent/index.txt"), Path::new("/usr/share/app/zcl/general.xml")).unwrap();
        assert_eq!(paths, vec![PathBuf::from("/usr/share/app/zcl/general.xml")]);
    }

    #[test]
    fn index_ignores_blank_and_comment_lines() {
        let dir = std::env::temp_dir().join(format!("zcl-db-test-index-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let schema_file = dir.join("general.xml");
        std::fs::write(&schema_file, GENERAL_XML).unwrap();
        let index_file = dir.join("index.txt");
        std::fs::write(&index_file, format!("# comment\n\n{}\n", schema_file.display())).unwrap();

        let paths = load_index(&index_file, Path::new("/unused/default.xml")).unwrap();
        assert_eq!(paths, vec![schema_file]);
    }
}
