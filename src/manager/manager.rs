//! The mesh network manager.
//!
//! Owns the network model and wires the access codec and the transport
//! engine to a bearer and a delegate.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, mpsc, oneshot, watch};
use tokio::time::Instant;
use uuid::Uuid;

use super::config::ManagerConfig;
use super::delegate::MeshNetworkDelegate;
use super::handle::{MessageHandle, Signal};
use super::outbound::{self, Outgoing};
use crate::access::MessageRegistry;
use crate::access::config::{
    ConfigAppKeyAdd, ConfigAppKeyStatus, ConfigModelAppBind, ConfigModelAppStatus, ConfigNodeResetStatus,
};
use crate::core::{CryptoError, MAX_ACCESS_PAYLOAD, MeshError, MeshMessage, ModelError, SendError};
use crate::crypto::{ApplicationKeyMaterial, NetworkKeyMaterial, ReplayCache, virtual_address};
use crate::network::{Address, KeyIndex, MeshNetwork, Node};
use crate::transport::{
    AccessKey, Bearer, ExchangeState, LowerTransportPdu, MAX_NETWORK_PDU_SIZE, MIN_NETWORK_PDU_SIZE,
    NetworkHeader, NetworkPdu, Reassembler, SegmentAck, SegmentOutcome, SequenceCounter, TransportError,
    UpperContext, decrypt_access, peek_ivi_nid, seq_auth,
};

/// Key securing an outgoing message.
#[derive(Debug, Clone, Copy)]
enum KeySelector {
    Application(KeyIndex),
    Device,
}

/// A decoded message addressed to this node.
#[derive(Debug)]
struct Inbound {
    message: Arc<dyn MeshMessage>,
    source: Address,
    destination: Address,
}

#[derive(Debug)]
struct ExchangeEntry {
    destination: Address,
    response_opcode: Option<u32>,
    signals: mpsc::UnboundedSender<Signal>,
}

/// State shared between the manager and its exchange tasks.
pub(super) struct Shared {
    pub(super) config: ManagerConfig,
    pub(super) bearer: Arc<dyn Bearer>,
    pub(super) delegate: Arc<dyn MeshNetworkDelegate>,
    pub(super) sequence: SequenceCounter,
    pub(super) transmit_lock: Mutex<()>,
    network: RwLock<MeshNetwork>,
    registry: MessageRegistry,
    replay: Mutex<ReplayCache>,
    reassembler: Mutex<Reassembler>,
    exchanges: Mutex<HashMap<u64, ExchangeEntry>>,
    destination_locks: Mutex<HashMap<Address, Arc<tokio::sync::Mutex<()>>>>,
    labels: Mutex<HashMap<Address, Vec<Uuid>>>,
    next_id: AtomicU64,
    shut_down: AtomicBool,
}

impl Shared {
    pub(super) fn destination_lock(&self, destination: Address) -> Arc<tokio::sync::Mutex<()>> {
        self.destination_locks
            .lock()
            .entry(destination)
            .or_default()
            .clone()
    }

    fn local_address(&self, network: &MeshNetwork) -> Result<Address, MeshError> {
        self.config
            .local_address
            .or_else(|| network.local_provisioner().and_then(|p| p.unicast_address()))
            .ok_or_else(|| MeshError::Config("no local unicast address".into()))
    }

    fn is_local(&self, network: &MeshNetwork, local: Address, address: Address) -> bool {
        address == local
            || network
                .node(local)
                .is_some_and(|node| node.contains_address(address))
    }

    fn prepare(
        &self,
        network: &MeshNetwork,
        message: Arc<dyn MeshMessage>,
        destination: Address,
        label: Option<Uuid>,
        keys: KeySelector,
    ) -> Result<Outgoing, MeshError> {
        if !destination.is_valid_destination() || (destination.is_virtual() && label.is_none()) {
            return Err(MeshError::InvalidDestination(destination.value()));
        }
        let src = self.local_address(network)?;
        let access_pdu = self.registry.encode(message.as_ref())?;
        if access_pdu.len() > MAX_ACCESS_PAYLOAD {
            return Err(TransportError::PayloadTooLarge {
                size: access_pdu.len(),
                max: MAX_ACCESS_PAYLOAD,
            }
            .into());
        }

        let (network_key, access_key) = match keys {
            KeySelector::Application(index) => {
                let app = network
                    .application_key(index)
                    .ok_or(ModelError::UnknownApplicationKey(index))?;
                // A known node must already hold the key to decrypt.
                if let Some(node) = network.node(destination).filter(|_| destination.is_unicast()) {
                    if !node.knows_application_key(index) {
                        return Err(ModelError::ApplicationKeyNotKnown {
                            node: node.unicast_address().value(),
                            app_key: index,
                        }
                        .into());
                    }
                }
                let bound = app.bound_network_key();
                let net = network
                    .network_key(bound)
                    .ok_or(ModelError::UnknownNetworkKey(bound))?;
                let material = ApplicationKeyMaterial::derive(app.transmit_key(net.phase()))?;
                (net, AccessKey::application(&material))
            }
            KeySelector::Device => {
                if !destination.is_unicast() {
                    return Err(MeshError::InvalidDestination(destination.value()));
                }
                let node = network
                    .node(destination)
                    .ok_or(ModelError::UnknownNode(destination.value()))?;
                if let Some(add) = message.downcast_ref::<ConfigAppKeyAdd>() {
                    network.check_application_key_add(destination, add.net_key_index, add.app_key_index)?;
                } else if let Some(bind) = message.downcast_ref::<ConfigModelAppBind>() {
                    if !node.contains_address(bind.element_address) {
                        return Err(ModelError::UnknownElement(bind.element_address.value()).into());
                    }
                    network.check_model_bind(bind.element_address, bind.model_id, bind.app_key_index)?;
                }
                let net = node
                    .network_keys()
                    .first()
                    .and_then(|&index| network.network_key(index))
                    .or_else(|| network.network_keys().first())
                    .ok_or_else(|| MeshError::Config("network has no network key".into()))?;
                (net, AccessKey::device(node.device_key())?)
            }
        };

        Ok(Outgoing {
            response_opcode: message.response_opcode(),
            message,
            access_pdu,
            src,
            dst: destination,
            label,
            ttl: self.config.default_ttl,
            iv_index: network.iv_index().transmit_index(),
            network_key: NetworkKeyMaterial::derive(network_key.transmit_key())?,
            access_key,
        })
    }

    fn start(self: &Arc<Self>, job: Outgoing) -> MessageHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let destination = job.dst;
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ExchangeState::Pending);
        let (result_tx, result_rx) = oneshot::channel();

        self.exchanges.lock().insert(
            id,
            ExchangeEntry {
                destination,
                response_opcode: job.response_opcode,
                signals: signal_tx.clone(),
            },
        );

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let (message, source) = (job.message.clone(), job.src);
            let result = outbound::run(&shared, job, signal_rx, &state_tx).await;
            shared.finish(id, message, source, destination, &result, &state_tx);
            let _ = result_tx.send(result);
        });

        MessageHandle::new(id, destination, signal_tx, state_rx, result_rx)
    }

    fn finish(
        &self,
        id: u64,
        message: Arc<dyn MeshMessage>,
        source: Address,
        destination: Address,
        result: &Result<Option<Arc<dyn MeshMessage>>, SendError>,
        state: &watch::Sender<ExchangeState>,
    ) {
        self.exchanges.lock().remove(&id);
        self.destination_locks
            .lock()
            .retain(|_, lock| Arc::strong_count(lock) > 1);

        match result {
            Ok(_) => {
                state.send_replace(ExchangeState::Completed);
            }
            Err(error) => {
                let terminal = match error {
                    SendError::RetransmissionLimitExceeded { .. }
                    | SendError::ResponseTimeout { .. } => ExchangeState::TimedOut,
                    _ => ExchangeState::Failed,
                };
                state.send_replace(terminal);
                tracing::debug!(
                    "message {:#06x} from {source} to {destination} failed: {error}",
                    message.opcode()
                );
                self.delegate
                    .on_send_failed(message, source, destination, error.clone());
            }
        }
    }

    fn cancel_where(&self, matches: impl Fn(Address) -> bool) -> usize {
        let exchanges = self.exchanges.lock();
        let mut count = 0;
        for entry in exchanges.values().filter(|e| matches(e.destination)) {
            if entry.signals.send(Signal::Cancel).is_ok() {
                count += 1;
            }
        }
        count
    }

    fn route_ack(&self, source: Address, ack: SegmentAck) {
        for entry in self
            .exchanges
            .lock()
            .values()
            .filter(|e| e.destination == source)
        {
            let _ = entry.signals.send(Signal::SegmentAck(ack));
        }
    }

    fn route_response(&self, inbound: &Inbound) {
        let opcode = inbound.message.opcode();
        let exchanges = self.exchanges.lock();
        let waiting = exchanges
            .iter()
            .filter(|(_, e)| e.response_opcode == Some(opcode))
            .filter(|(_, e)| e.destination == inbound.source || !e.destination.is_unicast())
            .min_by_key(|(id, _)| **id);
        if let Some((id, entry)) = waiting {
            tracing::trace!("response {opcode:#06x} from {} completes exchange {id}", inbound.source);
            let _ = entry.signals.send(Signal::Response(inbound.message.clone()));
        }
    }

    /// Apply configuration results to the model. Returns the node removed
    /// by a reset.
    async fn apply_status(&self, inbound: &Inbound) -> Option<Node> {
        let message: &dyn MeshMessage = &*inbound.message;
        let source = inbound.source;

        if let Some(status) = message.downcast_ref::<ConfigAppKeyStatus>() {
            if status.status.is_success() {
                let mut network = self.network.write().await;
                if let Err(e) = network.node_add_application_key(source, status.app_key_index) {
                    tracing::warn!("cannot record application key on {source}: {e}");
                }
            }
        } else if let Some(status) = message.downcast_ref::<ConfigModelAppStatus>() {
            if status.status.is_success() {
                let mut network = self.network.write().await;
                if let Err(e) = network.model_bind_application_key(
                    status.element_address,
                    status.model_id,
                    status.app_key_index,
                ) {
                    tracing::warn!("cannot record model binding on {source}: {e}");
                }
            }
        } else if message.downcast_ref::<ConfigNodeResetStatus>().is_some() {
            let mut network = self.network.write().await;
            match network.remove_node(source) {
                Ok(node) => return Some(node),
                Err(e) => tracing::warn!("reset status from unknown node: {e}"),
            }
        }
        None
    }

    /// Drop every trace of a removed node.
    fn forget_node(&self, node: &Node) {
        let cancelled = self.cancel_where(|address| node.contains_address(address));
        let mut replay = self.replay.lock();
        let mut reassembler = self.reassembler.lock();
        for index in 0..node.element_count() {
            if let Some(address) = node.element_address(index as u8) {
                replay.remove(address.value());
                reassembler.forget(address);
            }
        }
        tracing::debug!(
            "node {} reset, {cancelled} exchanges cancelled",
            node.unicast_address()
        );
    }

    async fn deliver(&self, raw: &[u8]) {
        let inbound = {
            let network = self.network.read().await;
            match self.receive(&network, raw) {
                Ok(inbound) => inbound,
                Err(e) if e.is_replay() => {
                    tracing::trace!("dropped replayed pdu");
                    None
                }
                Err(e) => {
                    tracing::trace!("dropped pdu: {e}");
                    None
                }
            }
        };
        let Some(inbound) = inbound else {
            return;
        };

        let reset = self.apply_status(&inbound).await;
        self.route_response(&inbound);
        if let Some(node) = reset {
            self.forget_node(&node);
        }
        self.delegate
            .on_message_received(inbound.message, inbound.source, inbound.destination);
    }

    fn receive(&self, network: &MeshNetwork, raw: &[u8]) -> Result<Option<Inbound>, TransportError> {
        let (_, nid) = peek_ivi_nid(raw).ok_or(TransportError::PduTooShort {
            len: raw.len(),
            min: MIN_NETWORK_PDU_SIZE,
        })?;
        let iv_index = network.iv_index();
        let mut replayed = false;

        for network_key in network.network_keys() {
            for key in network_key.receive_keys() {
                let material = NetworkKeyMaterial::derive(key)?;
                if material.nid != nid {
                    continue;
                }
                let Ok(header) = NetworkHeader::deobfuscate(raw, &material, iv_index) else {
                    continue;
                };
                if self
                    .replay
                    .lock()
                    .is_replay(header.src.value(), header.iv_index, header.seq)
                {
                    replayed = true;
                    continue;
                }
                let Ok(pdu) = header.open(raw, &material) else {
                    continue;
                };
                self.replay
                    .lock()
                    .record(header.src.value(), header.iv_index, header.seq);
                return self.on_network_pdu(network, &material, header.iv_index, pdu);
            }
        }

        if replayed {
            Err(CryptoError::ReplayDetected.into())
        } else {
            Err(TransportError::NoMatchingKey)
        }
    }

    fn on_network_pdu(
        &self,
        network: &MeshNetwork,
        material: &NetworkKeyMaterial,
        iv_index: u32,
        pdu: NetworkPdu,
    ) -> Result<Option<Inbound>, TransportError> {
        let Ok(local) = self.local_address(network) else {
            return Ok(None);
        };
        if self.is_local(network, local, pdu.src) {
            return Ok(None);
        }
        if pdu.dst.is_unicast() && !self.is_local(network, local, pdu.dst) {
            tracing::trace!("pdu for {} is not for this node", pdu.dst);
            return Ok(None);
        }

        let ctx = UpperContext {
            seq_auth: pdu.seq,
            src: pdu.src,
            dst: pdu.dst,
            iv_index,
            label: None,
        };
        match LowerTransportPdu::decode(pdu.ctl, &pdu.transport_pdu)? {
            LowerTransportPdu::SegmentAck(ack) => {
                self.route_ack(pdu.src, ack);
                Ok(None)
            }
            LowerTransportPdu::UnsegmentedAccess {
                akf,
                aid,
                upper_pdu,
            } => self.open_access(network, local, akf, aid, &upper_pdu, ctx),
            LowerTransportPdu::SegmentedAccess(segment) => {
                let seq_auth = seq_auth(pdu.seq, segment.seq_zero);
                let outcome =
                    self.reassembler
                        .lock()
                        .on_segment(pdu.src, seq_auth, &segment, Instant::now());
                let ack = |block_ack: u32| {
                    if pdu.dst.is_unicast() {
                        self.send_segment_ack(
                            material,
                            network.iv_index().transmit_index(),
                            pdu.dst,
                            pdu.src,
                            segment.seq_zero,
                            block_ack,
                        );
                    }
                };
                match outcome {
                    SegmentOutcome::Incomplete { ack: Some(block_ack) } => {
                        ack(block_ack);
                        Ok(None)
                    }
                    SegmentOutcome::Incomplete { ack: None } | SegmentOutcome::Discarded => Ok(None),
                    SegmentOutcome::Duplicate { block_ack } => {
                        ack(block_ack);
                        Ok(None)
                    }
                    SegmentOutcome::Busy => {
                        tracing::debug!("too many incomplete messages, {} is told busy", pdu.src);
                        ack(0);
                        Ok(None)
                    }
                    SegmentOutcome::Complete {
                        akf,
                        aid,
                        upper_pdu,
                        block_ack,
                    } => {
                        ack(block_ack);
                        self.open_access(
                            network,
                            local,
                            akf,
                            aid,
                            &upper_pdu,
                            UpperContext { seq_auth, ..ctx },
                        )
                    }
                }
            }
        }
    }

    fn open_access(
        &self,
        network: &MeshNetwork,
        local: Address,
        akf: bool,
        aid: u8,
        upper_pdu: &[u8],
        ctx: UpperContext<'_>,
    ) -> Result<Option<Inbound>, TransportError> {
        let mut keys = Vec::new();
        if akf {
            for app in network.application_keys() {
                for key in app.receive_keys() {
                    let material = ApplicationKeyMaterial::derive(key)?;
                    if material.aid == aid {
                        keys.push(AccessKey::application(&material));
                    }
                }
            }
        } else {
            for node in [network.node(ctx.src), network.node(local)].into_iter().flatten() {
                keys.push(AccessKey::device(node.device_key())?);
            }
        }

        let labels = if ctx.dst.is_virtual() {
            self.labels.lock().get(&ctx.dst).cloned().unwrap_or_default()
        } else {
            Vec::new()
        };
        let label_choices: Vec<Option<&Uuid>> = if ctx.dst.is_virtual() {
            labels.iter().map(Some).collect()
        } else {
            vec![None]
        };

        for key in &keys {
            for label in &label_choices {
                let attempt = UpperContext { label: *label, ..ctx };
                let Ok(access_pdu) = decrypt_access(upper_pdu, key, &attempt) else {
                    continue;
                };
                return match self.registry.decode(&access_pdu) {
                    Ok(message) => Ok(Some(Inbound {
                        message: Arc::from(message),
                        source: ctx.src,
                        destination: ctx.dst,
                    })),
                    Err(e) => {
                        tracing::debug!("dropped malformed access message from {}: {e}", ctx.src);
                        Ok(None)
                    }
                };
            }
        }
        Err(TransportError::NoMatchingKey)
    }
}

/// Sends and receives mesh messages over one bearer.
///
/// # Example
///
/// ```ignore
/// let (bearer, outbound) = ChannelBearer::new();
/// let (delegate, mut events) = ChannelDelegate::new();
/// let manager = MeshNetworkManager::new(
///     network,
///     Arc::new(bearer),
///     Arc::new(delegate),
///     ManagerConfig::default(),
/// )?;
///
/// let handle = manager
///     .send(GenericOnOffGet, Address::new(0x0002), 0)
///     .await?;
/// let status = handle.wait().await?;
/// ```
pub struct MeshNetworkManager {
    shared: Arc<Shared>,
}

impl MeshNetworkManager {
    /// Manager with every message type of this crate registered.
    pub fn new(
        network: MeshNetwork,
        bearer: Arc<dyn Bearer>,
        delegate: Arc<dyn MeshNetworkDelegate>,
        config: ManagerConfig,
    ) -> Result<Self, MeshError> {
        Self::with_registry(network, bearer, delegate, config, MessageRegistry::with_defaults())
    }

    /// Manager decoding with a custom registry.
    pub fn with_registry(
        network: MeshNetwork,
        bearer: Arc<dyn Bearer>,
        delegate: Arc<dyn MeshNetworkDelegate>,
        config: ManagerConfig,
        registry: MessageRegistry,
    ) -> Result<Self, MeshError> {
        config.validate()?;
        if bearer.mtu() < MAX_NETWORK_PDU_SIZE {
            return Err(MeshError::Config(format!(
                "bearer mtu {} is below the largest network pdu ({MAX_NETWORK_PDU_SIZE} bytes)",
                bearer.mtu()
            )));
        }
        let shared = Shared {
            sequence: SequenceCounter::new(config.initial_sequence),
            reassembler: Mutex::new(Reassembler::new(config.reassembly_limits())),
            config,
            bearer,
            delegate,
            transmit_lock: Mutex::new(()),
            network: RwLock::new(network),
            registry,
            replay: Mutex::new(ReplayCache::new()),
            exchanges: Mutex::new(HashMap::new()),
            destination_locks: Mutex::new(HashMap::new()),
            labels: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        };
        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    /// Manager configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.shared.config
    }

    /// Read access to the network model.
    pub async fn network(&self) -> RwLockReadGuard<'_, MeshNetwork> {
        self.shared.network.read().await
    }

    /// Write access to the network model.
    ///
    /// Allocation and commit done under one guard cannot race other
    /// mutations.
    pub async fn network_mut(&self) -> RwLockWriteGuard<'_, MeshNetwork> {
        self.shared.network.write().await
    }

    /// Source address of outgoing messages.
    pub async fn local_address(&self) -> Result<Address, MeshError> {
        let network = self.shared.network.read().await;
        self.shared.local_address(&network)
    }

    /// Sequence number the next PDU will use.
    pub fn next_sequence(&self) -> u32 {
        self.shared.sequence.peek()
    }

    /// Number of exchanges still running.
    pub fn pending_exchanges(&self) -> usize {
        self.shared.exchanges.lock().len()
    }

    /// Accept messages sent to the virtual address of `label`.
    pub fn subscribe_label(&self, label: Uuid) -> Address {
        let address = virtual_address(&label);
        let mut labels = self.shared.labels.lock();
        let known = labels.entry(address).or_default();
        if !known.contains(&label) {
            known.push(label);
        }
        address
    }

    async fn dispatch(
        &self,
        message: Arc<dyn MeshMessage>,
        destination: Address,
        label: Option<Uuid>,
        keys: KeySelector,
    ) -> Result<MessageHandle, MeshError> {
        if self.is_shut_down() {
            return Err(MeshError::Shutdown);
        }
        let job = {
            let network = self.shared.network.read().await;
            self.shared.prepare(&network, message, destination, label, keys)?
        };
        tracing::debug!(
            "sending {:#06x} from {} to {destination}, {} bytes",
            job.message.opcode(),
            job.src,
            job.access_pdu.len()
        );
        Ok(self.shared.start(job))
    }

    /// Send a message secured with an application key.
    ///
    /// A unicast destination with a node record must already know the key.
    pub async fn send<M: MeshMessage>(
        &self,
        message: M,
        destination: Address,
        app_key: KeyIndex,
    ) -> Result<MessageHandle, MeshError> {
        if message.uses_device_key() {
            return Err(MeshError::Config(format!(
                "opcode {:#06x} must be sent with send_config",
                message.opcode()
            )));
        }
        self.dispatch(Arc::new(message), destination, None, KeySelector::Application(app_key))
            .await
    }

    /// Send a message to the virtual address of `label`.
    pub async fn send_to_label<M: MeshMessage>(
        &self,
        message: M,
        label: Uuid,
        app_key: KeyIndex,
    ) -> Result<MessageHandle, MeshError> {
        let destination = self.subscribe_label(label);
        self.dispatch(
            Arc::new(message),
            destination,
            Some(label),
            KeySelector::Application(app_key),
        )
        .await
    }

    /// Send a configuration message secured with the destination's device key.
    ///
    /// `ConfigAppKeyAdd` and `ConfigModelAppBind` are checked against the
    /// node's keys and bindings first.
    pub async fn send_config<M: MeshMessage>(
        &self,
        message: M,
        destination: Address,
    ) -> Result<MessageHandle, MeshError> {
        self.dispatch(Arc::new(message), destination, None, KeySelector::Device)
            .await
    }

    /// Hand a network PDU received by the bearer to the stack.
    ///
    /// Malformed, unauthentic and replayed PDUs are dropped silently.
    pub async fn bearer_did_deliver(&self, pdu: &[u8]) {
        if self.is_shut_down() {
            return;
        }
        self.shared.deliver(pdu).await;
    }

    /// Cancel every exchange to the node at `address` (or to `address`
    /// itself when no node occupies it). Returns how many were cancelled.
    pub async fn cancel_exchanges_to(&self, address: Address) -> usize {
        let span = {
            let network = self.shared.network.read().await;
            network.node(address).and_then(|n| n.address_range().ok())
        };
        self.shared.cancel_where(|destination| match span {
            Some(range) => range.contains(destination.value()),
            None => destination == address,
        })
    }

    /// Whether [`MeshNetworkManager::shutdown`] was called.
    pub fn is_shut_down(&self) -> bool {
        self.shared.shut_down.load(Ordering::Acquire)
    }

    /// Cancel every exchange and refuse further work.
    pub fn shutdown(&self) {
        if !self.shared.shut_down.swap(true, Ordering::AcqRel) {
            let cancelled = self.shared.cancel_where(|_| true);
            tracing::debug!("manager shut down, {cancelled} exchanges cancelled");
        }
    }
}

impl Drop for MeshNetworkManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for MeshNetworkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshNetworkManager")
            .field("config", &self.shared.config)
            .field("pending_exchanges", &self.pending_exchanges())
            .field("next_sequence", &self.next_sequence())
            .finish()
    }
}
