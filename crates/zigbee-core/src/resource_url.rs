//! Cluster-level resource addressing (§6.3).
//!
//! The schema database and node cache identify resources internally by
//! `(ieee, endpoint, cluster)` tuples; this module gives an external VFS
//! layer a stable string form for the same addresses, matching the grammar:
//!
//! - `endpoint:<ieee>/<ep>`
//! - `cluster:<ieee>/<ep>/<clusterId>[?side=server|client&prf=<profile>&name=<name>&dev=<deviceId>]`
//!
//! Parsing is hand-rolled rather than pulled from a URL-parsing crate: the
//! grammar is a closed, deliberately small format, not a general URI, and no
//! crate in this stack already depends on one for that purpose.

use crate::error::{CodecError, Result};

/// Matches the reference parser's `AM_MAX_URL_ELEMENTS`
/// (`examples/original_source/am_vfs.c`'s `AM_ParseUrl`): a path with more
/// than this many `/`-separated components is rejected outright rather than
/// silently truncated.
const MAX_URL_ELEMENTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterSide {
    Server,
    Client,
}

impl ClusterSide {
    fn as_str(self) -> &'static str {
        match self {
            ClusterSide::Server => "server",
            ClusterSide::Client => "client",
        }
    }
}

/// A parsed `endpoint:` or `cluster:` resource address.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceAddress {
    Endpoint { ieee: u64, endpoint: u8 },
    Cluster {
        ieee: u64,
        endpoint: u8,
        cluster_id: u16,
        side: Option<ClusterSide>,
        profile: Option<u16>,
        name: Option<String>,
        device: Option<u16>,
    },
}

impl ResourceAddress {
    /// Parses `s` per §6.3's grammar. Returns `CodecError::Malformed` for
    /// anything that does not match one of the two recognized schemes.
    pub fn parse(s: &str) -> Result<Self> {
        let (scheme, rest) = s.split_once(':').ok_or_else(|| malformed(s))?;
        match scheme {
            "endpoint" => {
                check_element_count(rest, s)?;
                let mut parts = rest.splitn(2, '/');
                let ieee = parse_ieee(parts.next().ok_or_else(|| malformed(s))?, s)?;
                let endpoint = parse_endpoint(parts.next().ok_or_else(|| malformed(s))?, s)?;
                Ok(ResourceAddress::Endpoint { ieee, endpoint })
            }
            "cluster" => {
                let (path, query) = match rest.split_once('?') {
                    Some((p, q)) => (p, Some(q)),
                    None => (rest, None),
                };
                check_element_count(path, s)?;
                let mut parts = path.splitn(3, '/');
                let ieee = parse_ieee(parts.next().ok_or_else(|| malformed(s))?, s)?;
                let endpoint = parse_endpoint(parts.next().ok_or_else(|| malformed(s))?, s)?;
                let cluster_id = parts
                    .next()
                    .ok_or_else(|| malformed(s))
                    .and_then(|c| u16::from_str_radix(c.trim_start_matches("0x"), 16).map_err(|_| malformed(s)))?;

                let mut side = None;
                let mut profile = None;
                let mut name = None;
                let mut device = None;
                for pair in query.into_iter().flat_map(|q| q.split('&')) {
                    let Some((key, value)) = pair.split_once('=') else { continue };
                    match key {
                        "side" => {
                            side = match value {
                                "server" => Some(ClusterSide::Server),
                                "client" => Some(ClusterSide::Client),
                                _ => return Err(malformed(s)),
                            };
                        }
                        "prf" => profile = Some(u16::from_str_radix(value.trim_start_matches("0x"), 16).map_err(|_| malformed(s))?),
                        "name" => name = Some(value.to_string()),
                        "dev" => device = Some(u16::from_str_radix(value.trim_start_matches("0x"), 16).map_err(|_| malformed(s))?),
                        _ => {}
                    }
                }

                Ok(ResourceAddress::Cluster { ieee, endpoint, cluster_id, side, profile, name, device })
            }
            _ => Err(malformed(s)),
        }
    }
}

impl std::fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceAddress::Endpoint { ieee, endpoint } => write!(f, "endpoint:{ieee:016X}/{endpoint}"),
            ResourceAddress::Cluster { ieee, endpoint, cluster_id, side, profile, name, device } => {
                write!(f, "cluster:{ieee:016X}/{endpoint}/{cluster_id:#06x}")?;
                let mut params = Vec::new();
                if let Some(side) = side {
                    params.push(format!("side={}", side.as_str()));
                }
                if let Some(profile) = profile {
                    params.push(format!("prf={profile:#06x}"));
                }
                if let Some(name) = name {
                    params.push(format!("name={name}"));
                }
                if let Some(device) = device {
                    params.push(format!("dev={device:#06x}"));
                }
                if !params.is_empty() {
                    write!(f, "?{}", params.join("&"))?;
                }
                Ok(())
            }
        }
    }
}

fn parse_ieee(s: &str, whole: &str) -> Result<u64> {
    u64::from_str_radix(s, 16).map_err(|_| malformed(whole))
}

fn parse_endpoint(s: &str, whole: &str) -> Result<u8> {
    s.parse().map_err(|_| malformed(whole))
}

fn malformed(s: &str) -> CodecError {
    CodecError::Malformed(format!("invalid resource address: {s}"))
}

fn check_element_count(path: &str, whole: &str) -> Result<()> {
    let count = path.split('/').count();
    if count > MAX_URL_ELEMENTS {
        return Err(CodecError::UriTooLong { uri: whole.to_string(), max: MAX_URL_ELEMENTS });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_endpoint_address() {
        let addr = ResourceAddress::parse("endpoint:00158D0001AABBCC/1").unwrap();
        assert_eq!(addr, ResourceAddress::Endpoint { ieee: 0x0015_8D00_01AA_BBCC, endpoint: 1 });
    }

    #[test]
    fn parses_cluster_address_with_query_params() {
        let addr = ResourceAddress::parse("cluster:00158D0001AABBCC/1/0x0006?side=server&prf=0x0104&name=OnOff").unwrap();
        match addr {
            ResourceAddress::Cluster { ieee, endpoint, cluster_id, side, profile, name, device } => {
                assert_eq!(ieee, 0x0015_8D00_01AA_BBCC);
                assert_eq!(endpoint, 1);
                assert_eq!(cluster_id, 0x0006);
                assert_eq!(side, Some(ClusterSide::Server));
                assert_eq!(profile, Some(0x0104));
                assert_eq!(name, Some("OnOff".to_string()));
                assert_eq!(device, None);
            }
            ResourceAddress::Endpoint { .. } => panic!("expected cluster address"),
        }
    }

    #[test]
    fn cluster_address_without_query_round_trips_through_display() {
        let addr = ResourceAddress::Cluster {
            ieee: 0x1234,
            endpoint: 2,
            cluster_id: 0x0008,
            side: None,
            profile: None,
            name: None,
            device: None,
        };
        assert_eq!(addr.to_string(), "cluster:0000000000001234/2/0x0008");
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(ResourceAddress::parse("widget:1234/1").is_err());
    }

    #[test]
    fn rejects_malformed_ieee() {
        assert!(ResourceAddress::parse("endpoint:not-hex/1").is_err());
    }

    #[test]
    fn rejects_paths_over_max_url_elements() {
        let path = (0..MAX_URL_ELEMENTS + 1).map(|i| i.to_string()).collect::<Vec<_>>().join("/");
        let addr = format!("endpoint:{path}");
        match ResourceAddress::parse(&addr) {
            Err(CodecError::UriTooLong { max, .. }) => assert_eq!(max, MAX_URL_ELEMENTS),
            other => panic!("expected UriTooLong, got {other:?}"),
        }
    }

    #[test]
    fn accepts_path_at_max_url_elements() {
        // 16 components is exactly at the limit and must still parse.
        assert!(ResourceAddress::parse("endpoint:00158D0001AABBCC/1").is_ok());
    }
}
