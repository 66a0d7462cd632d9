//! Node cache & source routes (C8)
//!
//! Grounded on the teacher's `zigbee-core/src/device.rs` (`ZigbeeDevice`/
//! `Endpoint` field and accessor style) and `network.rs` (event-driven
//! update pattern), generalized per SPEC_FULL.md §3/§4.8 to carry node and
//! power descriptors, a binding table
//! (`examples/original_source/deconz/binding_table.h`) and source routes
//! with health scoring (`aps.h`'s `ApsDataRequest::setSourceRoute`).

use std::collections::HashMap;
use std::time::Instant;

use deconz_protocol::{Address, MacCapabilities, NodeDescriptor, PowerDescriptor, SimpleDescriptor};

use crate::attribute::ZclAttribute;

/// Result of [`Node::add_source_route`], matching the reference's
/// `{new, updated, unchanged, invalid}` outcome set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddSourceRouteResult {
    New,
    Updated,
    Unchanged,
    Invalid,
}

/// Source-route health state (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceRouteState {
    #[default]
    Idle,
    Working,
    Sleep,
}

const MAX_RELAYS: usize = 9;

/// A source route: an ordered relay list used to reach a deep-sleep target,
/// plus the health counters that gate whether it is still usable.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceRoute {
    pub uuid: String,
    pub uuid_hash: u32,
    pub order: i32,
    pub relays: Vec<u16>,
    pub hop_lqi: Vec<u8>,
    pub tx_ok: u32,
    pub errors: u32,
    pub state: SourceRouteState,
    pub needs_save: bool,
}

/// Route equality is uuid-hash, tx/err counters, hop list and per-hop LQI
/// only: `order`, `state` and `needs_save` can change without the route
/// itself having changed, and must not flip an `add_source_route` outcome
/// from `Unchanged` to `Updated`.
impl PartialEq for SourceRoute {
    fn eq(&self, other: &Self) -> bool {
        self.uuid_hash == other.uuid_hash
            && self.tx_ok == other.tx_ok
            && self.errors == other.errors
            && self.relays == other.relays
            && self.hop_lqi == other.hop_lqi
    }
}

impl SourceRoute {
    #[must_use]
    pub fn new(uuid: impl Into<String>, uuid_hash: u32, relays: Vec<u16>, hop_lqi: Vec<u8>) -> Self {
        Self {
            uuid: uuid.into(),
            uuid_hash,
            order: 0,
            relays,
            hop_lqi,
            tx_ok: 0,
            errors: 0,
            state: SourceRouteState::Idle,
            needs_save: false,
        }
    }

    #[must_use]
    fn is_invalid(&self) -> bool {
        self.relays.is_empty() || self.relays.len() > MAX_RELAYS
    }

    /// Bump `tx_ok` (saturating), mark `working`; every 10 successes
    /// decrement `errors` by 1; every 50 successes, if `errors < tx_ok/3`,
    /// set `needs_save`.
    pub fn increment_tx_ok(&mut self) {
        self.tx_ok = self.tx_ok.saturating_add(1);
        self.state = SourceRouteState::Working;
        if self.tx_ok % 10 == 0 {
            self.errors = self.errors.saturating_sub(1);
        }
        if self.tx_ok % 50 == 0 && self.errors < self.tx_ok / 3 {
            self.needs_save = true;
        }
    }

    /// Bump `errors` (saturating); every 10 errors halve `tx_ok`; when
    /// `tx_ok == 0` and `errors > 10`, transition to `sleep` and clear
    /// `needs_save`.
    pub fn increment_errors(&mut self) {
        self.errors = self.errors.saturating_add(1);
        if self.errors % 10 == 0 {
            self.tx_ok /= 2;
        }
        if self.tx_ok == 0 && self.errors > 10 {
            self.state = SourceRouteState::Sleep;
            self.needs_save = false;
        }
    }

    /// Operational iff not asleep, the hop list is non-empty, and every hop
    /// has a non-zero LQI.
    #[must_use]
    pub fn is_operational(&self) -> bool {
        self.state != SourceRouteState::Sleep && !self.relays.is_empty() && self.hop_lqi.iter().all(|&lqi| lqi != 0)
    }
}

/// Destination addressing mode of a [`Binding`] (group vs. extended unicast).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BindingDstAddressMode {
    Group,
    Ext,
}

/// A single binding-table entry (`examples/original_source/deconz/binding_table.h::Binding`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Binding {
    pub src_address: u64,
    pub src_endpoint: u8,
    pub cluster_id: u16,
    pub dst_address_mode: BindingDstAddressMode,
    /// Group id when `dst_address_mode == Group`, IEEE address when `Ext`.
    pub dst_address: u64,
    /// Absent for group bindings.
    pub dst_endpoint: Option<u8>,
    /// Not persisted (`Instant` has no wall-clock representation): a
    /// reloaded binding starts with no confirmed time and is swept on
    /// the next Mgmt_Bind_rsp refresh if the device does not reconfirm it.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub confirmed_time: Option<Instant>,
}

impl Binding {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.cluster_id != 0xFFFF
            && self.src_endpoint != 0xFF
            && match self.dst_address_mode {
                BindingDstAddressMode::Group => self.dst_endpoint.is_none(),
                BindingDstAddressMode::Ext => self.dst_endpoint.is_some(),
            }
    }
}

/// The node's binding table: insert is idempotent by binding equality; a
/// separate sweep evicts stale entries relative to a caller-supplied
/// reference time (Mgmt_Bind_rsp refresh protocol, §4.8).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BindingTable {
    table: Vec<Binding>,
    #[cfg_attr(feature = "serde", serde(skip))]
    response_index0_time: Option<Instant>,
}

const MAX_CLEAR_OLD_BINDINGS: usize = 128;

impl BindingTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` (no-op) if an equal binding is already present.
    pub fn add(&mut self, binding: Binding) -> bool {
        if self.table.contains(&binding) {
            return false;
        }
        self.table.push(binding);
        true
    }

    pub fn remove(&mut self, binding: &Binding) -> bool {
        let before = self.table.len();
        self.table.retain(|b| b != binding);
        self.table.len() != before
    }

    #[must_use]
    pub fn contains(&self, binding: &Binding) -> bool {
        self.table.contains(binding)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.table.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.table.iter()
    }

    pub fn set_response_index0_time(&mut self, t: Instant) {
        self.response_index0_time = Some(t);
    }

    /// Evicts up to [`MAX_CLEAR_OLD_BINDINGS`] bindings whose
    /// `confirmed_time` precedes `reference` (or is absent).
    pub fn clear_old_bindings(&mut self, reference: Instant) {
        let mut evicted = 0;
        self.table.retain(|b| {
            if evicted >= MAX_CLEAR_OLD_BINDINGS {
                return true;
            }
            let stale = b.confirmed_time.is_none_or(|t| t < reference);
            if stale {
                evicted += 1;
            }
            !stale
        });
    }
}

/// A Zigbee node record (§3 "Node"): everything the cache tracks about a
/// single device, keyed externally by its IEEE or network address.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub address: Address,
    pub mac_capabilities: MacCapabilities,
    pub node_descriptor: Option<NodeDescriptor>,
    pub power_descriptor: Option<PowerDescriptor>,
    pub user_descriptor: Option<String>,
    pub active_endpoints: Vec<u8>,
    pub simple_descriptors: Vec<SimpleDescriptor>,
    pub binding_table: BindingTable,
    pub source_routes: Vec<SourceRoute>,
    pub energy_detect: Option<u8>,
    pub zombie: bool,
    pub redraw: bool,
    /// Cached attribute values per `(endpoint, cluster id)`, preserved
    /// across a `set_simple_descriptor` update when the cluster id survives.
    /// Not persisted: see `persistence.rs` doc comment — a reload starts
    /// with an empty cluster cache and relies on re-reading attributes.
    #[cfg_attr(feature = "serde", serde(skip))]
    cluster_cache: HashMap<(u8, u16), Vec<ZclAttribute>>,
}

impl Node {
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            mac_capabilities: MacCapabilities(0),
            node_descriptor: None,
            power_descriptor: None,
            user_descriptor: None,
            active_endpoints: Vec::new(),
            simple_descriptors: Vec::new(),
            binding_table: BindingTable::new(),
            source_routes: Vec::new(),
            energy_detect: None,
            zombie: false,
            redraw: false,
            cluster_cache: HashMap::new(),
        }
    }

    /// `Node::setUserDescriptor`: truncates to the 16-character wire limit.
    pub fn set_user_descriptor(&mut self, descriptor: impl Into<String>) {
        let mut s = descriptor.into();
        s.truncate(16);
        self.user_descriptor = Some(s);
    }

    /// Replaces the active-endpoint list and returns the sub-list of
    /// endpoints whose simple descriptor is not yet present (§4.8).
    pub fn set_active_endpoints(&mut self, endpoints: Vec<u8>) -> Vec<u8> {
        self.active_endpoints = endpoints;
        self.active_endpoints
            .iter()
            .copied()
            .filter(|ep| !self.simple_descriptors.iter().any(|d| d.endpoint == *ep))
            .collect()
    }

    /// Updates the simple descriptor for `descr.endpoint`, keeping
    /// endpoints sorted. A no-op when the endpoint's existing descriptor
    /// has equal-cardinality cluster lists; otherwise the new descriptor is
    /// adopted and cached cluster data for clusters present in both the old
    /// and new cluster lists is preserved.
    pub fn set_simple_descriptor(&mut self, descr: SimpleDescriptor) {
        if let Some(existing) = self.simple_descriptors.iter_mut().find(|d| d.endpoint == descr.endpoint) {
            let same_cardinality = existing.input_clusters.len() == descr.input_clusters.len()
                && existing.output_clusters.len() == descr.output_clusters.len();
            if same_cardinality {
                return;
            }

            let old_clusters: Vec<u16> = existing
                .input_clusters
                .iter()
                .chain(existing.output_clusters.iter())
                .map(|c| c.value())
                .collect();
            let new_clusters: Vec<u16> = descr
                .input_clusters
                .iter()
                .chain(descr.output_clusters.iter())
                .map(|c| c.value())
                .collect();

            self.cluster_cache.retain(|&(ep, cluster), _| {
                ep != descr.endpoint || (old_clusters.contains(&cluster) && new_clusters.contains(&cluster))
            });

            *existing = descr;
        } else {
            self.simple_descriptors.push(descr);
        }
        self.simple_descriptors.sort_by_key(|d| d.endpoint);
    }

    /// Clears every descriptor and cached cluster state, and marks the node
    /// reachable (`zombie = false`).
    pub fn reset_all(&mut self) {
        self.node_descriptor = None;
        self.power_descriptor = None;
        self.user_descriptor = None;
        self.active_endpoints.clear();
        self.simple_descriptors.clear();
        self.cluster_cache.clear();
        self.zombie = false;
    }

    #[must_use]
    pub fn cluster_attributes(&self, endpoint: u8, cluster_id: u16) -> Option<&[ZclAttribute]> {
        self.cluster_cache.get(&(endpoint, cluster_id)).map(Vec::as_slice)
    }

    pub fn set_cluster_attributes(&mut self, endpoint: u8, cluster_id: u16, attrs: Vec<ZclAttribute>) {
        self.cluster_cache.insert((endpoint, cluster_id), attrs);
    }

    /// Adds or updates a source route, matching [`AddSourceRouteResult`]'s
    /// outcome set. Equality is uuid-hash, tx/err counters, hop list and LQI.
    pub fn add_source_route(&mut self, sr: SourceRoute) -> AddSourceRouteResult {
        if sr.is_invalid() {
            return AddSourceRouteResult::Invalid;
        }
        if let Some(existing) = self.source_routes.iter_mut().find(|r| r.uuid_hash == sr.uuid_hash) {
            if *existing == sr {
                return AddSourceRouteResult::Unchanged;
            }
            *existing = sr;
            return AddSourceRouteResult::Updated;
        }
        self.source_routes.push(sr);
        AddSourceRouteResult::New
    }
}
