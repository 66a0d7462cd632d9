//! Controller façade (C10)
//!
//! Grounded on the teacher's `zigbee-core/src/network.rs::ZigbeeNetwork`
//! (broadcast-channel signal pattern, `transport()`/`subscribe()`/
//! `get_status()` method shapes) and `deconz-protocol/src/transport.rs`'s
//! request/response correlation idea, adapted behind a [`Transport`] trait
//! instead of a concrete serial2 implementation (§6.5). Method surface named
//! from `examples/original_source/deconz/aps_controller.h`'s `ApsController`.
//!
//! Single-threaded cooperative per §5: no locks, no worker threads. The
//! controller owns its state directly; `tokio::sync::broadcast`/`mpsc`
//! channels are used only for their fan-out/queueing semantics, not for
//! cross-thread synchronization.

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use deconz_protocol::{
    Address, ApsDataConfirm, ApsDataIndication, ApsDataRequest, ApsStatus, RequestIdGenerator,
};

use crate::error::{ControllerError, ControllerResult};
use crate::node::Node;

/// External transport collaborator (§6.5): `send`/`recv` over whatever
/// carries bytes to the radio coprocessor. No concrete serial/SLIP
/// implementation ships in this crate.
pub trait Transport: Send + Sync {
    fn send(&self, bytes: &[u8]) -> ControllerResult<()>;
}

/// `U8Parameter`/`U16Parameter`/`U32Parameter`/`U64Parameter` from
/// `aps_controller.h`, folded into one tagged enum per value width since
/// Rust has no C++-style function overloading on the parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum U8Parameter {
    CurrentChannel,
    DeviceType,
    SecurityMode,
    PermitJoin,
    OtauActive,
    NetworkUpdateId,
    DeviceConnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum U16Parameter {
    PanId,
    NwkAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum U32Parameter {
    ChannelMask,
    FirmwareVersion,
    FrameCounter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum U64Parameter {
    ApsUseExtendedPanId,
    ExtendedPanId,
    MacAddress,
    TrustCenterAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringParameter {
    DeviceName,
    DevicePath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayParameter {
    NetworkKey,
    TrustCenterLinkKey,
}

/// `NodeEvent` (§4.9): discriminated updates the controller publishes as it
/// observes node-cache changes.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    Selected(Address),
    Deselected(Address),
    Added(Address),
    Removed(Address),
    MacDataRequest(Address),
    ZombieChanged(Address, bool),
    UpdatedNodeDescriptor(Address),
    UpdatedPowerDescriptor(Address),
    UpdatedUserDescriptor(Address),
    UpdatedSimpleDescriptor(Address, u8),
    UpdatedClusterData(Address, u8, u16),
    EditDdf(Address),
}

/// `apsdeDataRequest` return codes (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ok,
    NotConnected,
    QueueFull,
    NodeIsZombie,
}

const MAX_QUEUE_DEPTH: usize = 64;

/// The controller façade singleton: APS submit surface, node cache, and the
/// confirm/indication/node-event broadcast channels.
pub struct Controller<T: Transport> {
    transport: Option<T>,
    request_ids: RequestIdGenerator,
    queue_depth: usize,
    nodes: Vec<Node>,
    confirm_tx: broadcast::Sender<ApsDataConfirm>,
    indication_tx: broadcast::Sender<ApsDataIndication>,
    node_event_tx: broadcast::Sender<NodeEvent>,
    enqueued_tx: mpsc::UnboundedSender<u8>,
    enqueued_rx: mpsc::UnboundedReceiver<u8>,
    u8_params: HashMap<U8Parameter, u8>,
    u16_params: HashMap<U16Parameter, u16>,
    u32_params: HashMap<U32Parameter, u32>,
    u64_params: HashMap<U64Parameter, u64>,
    string_params: HashMap<StringParameter, String>,
    array_params: HashMap<ArrayParameter, Vec<u8>>,
}

impl<T: Transport> Controller<T> {
    /// Constructs the controller with node index 0 reserved for the local
    /// node, matching "the node with index 0 is always the own node."
    #[must_use]
    pub fn new() -> Self {
        let (confirm_tx, _) = broadcast::channel(256);
        let (indication_tx, _) = broadcast::channel(256);
        let (node_event_tx, _) = broadcast::channel(256);
        let (enqueued_tx, enqueued_rx) = mpsc::unbounded_channel();
        Self {
            transport: None,
            request_ids: RequestIdGenerator::new(),
            queue_depth: 0,
            nodes: vec![Node::new(Address::default())],
            confirm_tx,
            indication_tx,
            node_event_tx,
            enqueued_tx,
            enqueued_rx,
            u8_params: HashMap::new(),
            u16_params: HashMap::new(),
            u32_params: HashMap::new(),
            u64_params: HashMap::new(),
            string_params: HashMap::new(),
            array_params: HashMap::new(),
        }
    }

    pub fn attach_transport(&mut self, transport: T) {
        self.transport = Some(transport);
    }

    pub fn detach_transport(&mut self) {
        self.transport = None;
    }

    #[must_use]
    pub fn subscribe_confirms(&self) -> broadcast::Receiver<ApsDataConfirm> {
        self.confirm_tx.subscribe()
    }

    #[must_use]
    pub fn subscribe_indications(&self) -> broadcast::Receiver<ApsDataIndication> {
        self.indication_tx.subscribe()
    }

    #[must_use]
    pub fn subscribe_node_events(&self) -> broadcast::Receiver<NodeEvent> {
        self.node_event_tx.subscribe()
    }

    /// `nextRequestId`: monotonic 1-255, skipping 0.
    #[must_use]
    pub fn next_request_id(&self) -> u8 {
        self.request_ids.next()
    }

    #[must_use]
    pub fn aps_queue_size(&self) -> usize {
        self.queue_depth
    }

    /// `apsdeDataRequest`: enqueue a request for transmission. Rejects
    /// synchronously when disconnected, the queue is full, or the
    /// destination node is a zombie; otherwise hands the serialized request
    /// to the transport and emits a synthetic confirm only on failure to
    /// submit (a real confirm follows later over [`Self::subscribe_confirms`]
    /// once the radio replies).
    pub fn apsde_data_request(&mut self, req: ApsDataRequest, version: u8) -> ControllerResult<SubmitOutcome> {
        let Some(transport) = self.transport.as_ref() else {
            return Ok(SubmitOutcome::NotConnected);
        };
        if self.queue_depth >= MAX_QUEUE_DEPTH {
            return Ok(SubmitOutcome::QueueFull);
        }
        if let Some(ext) = req.dst_addr.ext() {
            if self.node_by_ext(ext).is_some_and(|n| n.zombie) {
                return Ok(SubmitOutcome::NodeIsZombie);
            }
        }

        let bytes = req.to_bytes(version)?;
        match transport.send(&bytes) {
            Ok(()) => {
                self.queue_depth += 1;
                let _ = self.enqueued_tx.send(req.id);
                debug!(request_id = req.id, "aps request enqueued");
                Ok(SubmitOutcome::Ok)
            }
            Err(err) => {
                warn!(request_id = req.id, error = %err, "transport rejected aps request");
                let confirm = ApsDataConfirm::from_request_error(&req, ApsStatus(0xf0));
                let _ = self.confirm_tx.send(confirm);
                Err(err)
            }
        }
    }

    /// Called once the transport/radio yields a real confirm for a request
    /// previously submitted via [`Self::apsde_data_request`].
    pub fn deliver_confirm(&mut self, confirm: ApsDataConfirm) {
        self.queue_depth = self.queue_depth.saturating_sub(1);
        let _ = self.confirm_tx.send(confirm);
    }

    /// Called once the transport yields an inbound indication.
    pub fn deliver_indication(&mut self, indication: ApsDataIndication) {
        let _ = self.indication_tx.send(indication);
    }

    fn publish_node_event(&self, event: NodeEvent) {
        let _ = self.node_event_tx.send(event);
    }

    /// `resolveAddress`: fills in the missing nwk or ext half of `addr` from
    /// the node cache, given the other half is present.
    pub fn resolve_address(&self, addr: &mut Address) -> ControllerResult<()> {
        if addr.has_nwk() && addr.has_ext() {
            return Ok(());
        }
        let found = if let Some(ext) = addr.ext() {
            self.nodes.iter().find(|n| n.address.ext() == Some(ext))
        } else if let Some(nwk) = addr.nwk() {
            self.nodes.iter().find(|n| n.address.nwk() == Some(nwk))
        } else {
            None
        };
        match found {
            Some(node) => {
                if let Some(nwk) = node.address.nwk() {
                    addr.set_nwk(nwk);
                }
                if let Some(ext) = node.address.ext() {
                    addr.set_ext(ext);
                }
                Ok(())
            }
            None => Err(ControllerError::Transport("address not found in node cache".into())),
        }
    }

    /// `getNode(index)`: index 0 is always the local node.
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_by_ext(&self, ext: u64) -> Option<&Node> {
        self.nodes.iter().find(|n| n.address.ext() == Some(ext))
    }

    fn node_by_ext_mut(&mut self, ext: u64) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.address.ext() == Some(ext))
    }

    /// `updateNode`: upserts by extended IEEE address, emitting `Added` for
    /// a new node or the matching `Updated*` events for an existing one.
    pub fn update_node(&mut self, node: Node) -> ControllerResult<()> {
        let ext = node
            .address
            .ext()
            .ok_or_else(|| ControllerError::Transport("updateNode requires an extended address".into()))?;

        if self.node_by_ext_mut(ext).is_some() {
            let idx = self.nodes.iter().position(|n| n.address.ext() == Some(ext)).unwrap();
            self.nodes[idx] = node;
            self.publish_node_event(NodeEvent::UpdatedNodeDescriptor(self.nodes[idx].address));
        } else {
            self.nodes.push(node);
            let address = self.nodes.last().unwrap().address;
            self.publish_node_event(NodeEvent::Added(address));
        }
        Ok(())
    }

    pub fn remove_node(&mut self, ext: u64) -> bool {
        if let Some(idx) = self.nodes.iter().position(|n| n.address.ext() == Some(ext)) {
            let address = self.nodes[idx].address;
            self.nodes.remove(idx);
            self.publish_node_event(NodeEvent::Removed(address));
            true
        } else {
            false
        }
    }

    pub fn set_zombie(&mut self, ext: u64, zombie: bool) -> bool {
        if let Some(node) = self.node_by_ext_mut(ext) {
            if node.zombie != zombie {
                node.zombie = zombie;
                let address = node.address;
                self.publish_node_event(NodeEvent::ZombieChanged(address, zombie));
            }
            true
        } else {
            false
        }
    }

    /// `activateSourceRoute`: also invoked when a route is restored from
    /// persisted state.
    pub fn activate_source_route(&mut self, ext: u64, sr: crate::node::SourceRoute) -> ControllerResult<()> {
        let node = self
            .node_by_ext_mut(ext)
            .ok_or_else(|| ControllerError::Transport("no such node".into()))?;
        node.add_source_route(sr);
        Ok(())
    }

    pub fn add_binding(&mut self, ext: u64, binding: crate::node::Binding) -> ControllerResult<bool> {
        let node = self
            .node_by_ext_mut(ext)
            .ok_or_else(|| ControllerError::Transport("no such node".into()))?;
        Ok(node.binding_table.add(binding))
    }

    pub fn remove_binding(&mut self, ext: u64, binding: &crate::node::Binding) -> ControllerResult<bool> {
        let node = self
            .node_by_ext_mut(ext)
            .ok_or_else(|| ControllerError::Transport("no such node".into()))?;
        Ok(node.binding_table.remove(binding))
    }

    pub fn get_u8_parameter(&self, p: U8Parameter) -> u8 {
        self.u8_params.get(&p).copied().unwrap_or(0)
    }

    pub fn set_u8_parameter(&mut self, p: U8Parameter, value: u8) {
        self.u8_params.insert(p, value);
    }

    pub fn get_u16_parameter(&self, p: U16Parameter) -> u16 {
        self.u16_params.get(&p).copied().unwrap_or(0)
    }

    pub fn set_u16_parameter(&mut self, p: U16Parameter, value: u16) {
        self.u16_params.insert(p, value);
    }

    pub fn get_u32_parameter(&self, p: U32Parameter) -> u32 {
        self.u32_params.get(&p).copied().unwrap_or(0)
    }

    pub fn set_u32_parameter(&mut self, p: U32Parameter, value: u32) {
        self.u32_params.insert(p, value);
    }

    pub fn get_u64_parameter(&self, p: U64Parameter) -> u64 {
        self.u64_params.get(&p).copied().unwrap_or(0)
    }

    pub fn set_u64_parameter(&mut self, p: U64Parameter, value: u64) {
        self.u64_params.insert(p, value);
    }

    #[must_use]
    pub fn get_string_parameter(&self, p: StringParameter) -> Option<&str> {
        self.string_params.get(&p).map(String::as_str)
    }

    pub fn set_string_parameter(&mut self, p: StringParameter, value: String) {
        self.string_params.insert(p, value);
    }

    #[must_use]
    pub fn get_array_parameter(&self, p: ArrayParameter) -> Option<&[u8]> {
        self.array_params.get(&p).map(Vec::as_slice)
    }

    pub fn set_array_parameter(&mut self, p: ArrayParameter, value: Vec<u8>) {
        self.array_params.insert(p, value);
    }

    /// Drains pending "request enqueued" notifications (`apsdeDataRequestEnqueued`).
    pub fn try_recv_enqueued(&mut self) -> Option<u8> {
        self.enqueued_rx.try_recv().ok()
    }
}

impl<T: Transport> Default for Controller<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deconz_protocol::AddressMode;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeTransport {
        sent: Mutex<Vec<Vec<u8>>>,
        fail: bool,
    }

    impl Transport for FakeTransport {
        fn send(&self, bytes: &[u8]) -> ControllerResult<()> {
            if self.fail {
                return Err(ControllerError::Transport("forced failure".into()));
            }
            self.sent.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }
    }

    fn sample_request() -> ApsDataRequest {
        let mut addr = Address::new();
        addr.set_nwk(0x1234);
        ApsDataRequest::new(1, AddressMode::Nwk, addr, 1)
    }

    #[test]
    fn submit_without_transport_reports_not_connected() {
        let mut ctrl: Controller<FakeTransport> = Controller::new();
        let outcome = ctrl.apsde_data_request(sample_request(), 2).unwrap();
        assert_eq!(outcome, SubmitOutcome::NotConnected);
    }

    #[test]
    fn submit_with_transport_increments_queue_depth() {
        let mut ctrl = Controller::new();
        ctrl.attach_transport(FakeTransport::default());
        let outcome = ctrl.apsde_data_request(sample_request(), 2).unwrap();
        assert_eq!(outcome, SubmitOutcome::Ok);
        assert_eq!(ctrl.aps_queue_size(), 1);
    }

    #[test]
    fn submit_to_zombie_node_is_rejected() {
        let mut ctrl = Controller::new();
        ctrl.attach_transport(FakeTransport::default());
        let mut node = Node::new({
            let mut a = Address::new();
            a.set_ext(0xAABBCCDD);
            a
        });
        node.zombie = true;
        ctrl.update_node(node).unwrap();

        let mut addr = Address::new();
        addr.set_ext(0xAABBCCDD);
        let req = ApsDataRequest::new(1, AddressMode::Ext, addr, 1);
        let outcome = ctrl.apsde_data_request(req, 2).unwrap();
        assert_eq!(outcome, SubmitOutcome::NodeIsZombie);
    }

    #[test]
    fn node_index_zero_is_local_node() {
        let ctrl: Controller<FakeTransport> = Controller::new();
        assert!(ctrl.node(0).is_some());
    }

    #[test]
    fn update_node_emits_added_for_new_node() {
        let mut ctrl: Controller<FakeTransport> = Controller::new();
        let mut events = ctrl.subscribe_node_events();
        let mut addr = Address::new();
        addr.set_ext(0x1111);
        ctrl.update_node(Node::new(addr)).unwrap();
        assert_eq!(ctrl.node_count(), 2);
        let event = events.try_recv().unwrap();
        assert!(matches!(event, NodeEvent::Added(_)));
    }

    #[test]
    fn resolve_address_fills_missing_half() {
        let mut ctrl: Controller<FakeTransport> = Controller::new();
        let mut addr = Address::new();
        addr.set_ext(0x2222);
        addr.set_nwk(0x4321);
        ctrl.update_node(Node::new(addr)).unwrap();

        let mut query = Address::new();
        query.set_ext(0x2222);
        ctrl.resolve_address(&mut query).unwrap();
        assert_eq!(query.nwk(), Some(0x4321));
    }

    #[test]
    fn u8_parameter_round_trips() {
        let mut ctrl: Controller<FakeTransport> = Controller::new();
        ctrl.set_u8_parameter(U8Parameter::PermitJoin, 60);
        assert_eq!(ctrl.get_u8_parameter(U8Parameter::PermitJoin), 60);
    }

    #[test]
    fn failed_submit_publishes_synthetic_confirm() {
        let mut ctrl = Controller::new();
        ctrl.attach_transport(FakeTransport { fail: true, ..Default::default() });
        let mut confirms = ctrl.subscribe_confirms();
        let result = ctrl.apsde_data_request(sample_request(), 2);
        assert!(result.is_err());
        let confirm = confirms.try_recv().unwrap();
        assert_eq!(confirm.id, 1);
    }
}
