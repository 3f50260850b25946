//! CanBus model (SlotMap-backed).
//!
//! A bus owns three arenas with **stable keys**: [`NodeKey`], [`MessageKey`],
//! [`SignalKey`]. Messages hold signal keys, signals hold their parent
//! message key, so the graph has no ownership cycles. Public iteration
//! follows the order vectors (DBC declaration order).
//!
//! During parsing the bus also tracks `current_message` (set by each `BO_`
//! line, consumed by the `SG_` lines that follow) and a pending-signal map
//! keyed by message id; [`CanBus::build`] drains that map into the messages
//! once the file is exhausted.
//!
//! Every payload or signal mutation is announced through the single
//! [`BusEvent`] stream to the subscribers registered on this bus.

use slotmap::{SlotMap, new_key_type};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use crate::codec;
use crate::types::errors::GraphError;
use crate::types::events::{BusEvent, ObserverFn, ObserverId};
use crate::types::message::CanMessage;
use crate::types::node::CanNode;
use crate::types::signal::{CanSignal, ValueType};

// --- Stable keys (SlotMap) ---
new_key_type! { pub struct NodeKey; }
new_key_type! { pub struct MessageKey; }
new_key_type! { pub struct SignalKey; }

/// A named CAN bus: nodes, messages and signals, plus the change-event
/// subscriber list.
#[derive(Default)]
pub struct CanBus {
    /// Bus name (the DBC file stem when loaded from disk).
    pub name: String,
    /// Network-level comment (DBC `CM_ "…";`).
    pub comment: String,

    // --- Main storage (stable-key arenas) ---
    pub(crate) nodes: SlotMap<NodeKey, CanNode>,
    pub(crate) messages: SlotMap<MessageKey, CanMessage>,
    pub(crate) signals: SlotMap<SignalKey, CanSignal>,

    // --- Order "views" ---
    nodes_order: Vec<NodeKey>,
    messages_order: Vec<MessageKey>,

    // --- Lookups ---
    node_key_by_name: HashMap<String, NodeKey>, // lower(name) → NodeKey
    msg_key_by_id: HashMap<u32, MessageKey>,

    // Parsing state: signals parked per message id until `build()`.
    pending_signals: HashMap<u32, Vec<SignalKey>>,
    // Parsing state: last accepted message (used by the SG_ decoder).
    pub(crate) current_message: Option<MessageKey>,

    // --- Observers ---
    observers: Vec<(ObserverId, ObserverFn)>,
    next_observer: u64,
}

impl fmt::Debug for CanBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanBus")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("messages", &self.messages.len())
            .field("signals", &self.signals.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl CanBus {
    pub fn new(name: &str) -> Self {
        CanBus {
            name: name.to_string(),
            ..Default::default()
        }
    }

    // --------- Nodes --------

    /// Adds a node if not already present and returns its key.
    pub fn add_node_if_absent(&mut self, name: &str) -> NodeKey {
        if let Some(key) = self.get_node_key_by_name(name) {
            return key;
        }
        let key: NodeKey = self.nodes.insert(CanNode::new(name));
        self.nodes_order.push(key);
        self.node_key_by_name.insert(name.to_lowercase(), key);
        info!(node = name, bus = %self.name, "node attached to bus");
        key
    }

    /// Node key by name (ASCII case-insensitive).
    pub fn get_node_key_by_name(&self, name: &str) -> Option<NodeKey> {
        self.node_key_by_name.get(&name.to_lowercase()).copied()
    }

    pub fn get_node_by_key(&self, key: NodeKey) -> Option<&CanNode> {
        self.nodes.get(key)
    }

    /// Iterate nodes in attachment order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &CanNode> + '_ {
        self.nodes_order.iter().filter_map(|&k| self.nodes.get(k))
    }

    // ------------- Messages ------------

    /// Adds a message, unique by id. The first occurrence is retained;
    /// duplicates are ignored (logged) and `None` is returned. On accept
    /// the message becomes `current_message` and an empty pending-signal
    /// list is allocated for its id.
    pub fn add_message(&mut self, message: CanMessage) -> Option<MessageKey> {
        if self.msg_key_by_id.contains_key(&message.id) {
            debug!(
                message_id = message.id,
                name = %message.name,
                bus = %self.name,
                "duplicate message id ignored"
            );
            return None;
        }

        let id: u32 = message.id;
        let key: MessageKey = self.messages.insert(message);
        self.messages_order.push(key);
        self.msg_key_by_id.insert(id, key);
        self.pending_signals.insert(id, Vec::new());
        self.current_message = Some(key);
        Some(key)
    }

    /// The original transmit path for a `BO_` line: record the message in
    /// the node's TX list (dedup by message name) and forward it to the bus
    /// message set.
    pub fn add_tx_message(&mut self, node_key: NodeKey, message: CanMessage) -> Option<MessageKey> {
        let msg_name: String = message.name.clone();
        let key: MessageKey = self.add_message(message)?;

        let already_listed: bool = self
            .nodes
            .get(node_key)
            .map(|node| {
                node.tx_messages.iter().any(|&mk| {
                    self.messages
                        .get(mk)
                        .is_some_and(|m| m.name.eq_ignore_ascii_case(&msg_name))
                })
            })
            .unwrap_or(false);

        if !already_listed
            && let Some(node) = self.nodes.get_mut(node_key)
        {
            node.tx_messages.push(key);
        }
        Some(key)
    }

    pub fn get_msg_key_by_id(&self, id: u32) -> Option<MessageKey> {
        self.msg_key_by_id.get(&id).copied()
    }

    pub fn get_message_by_key(&self, key: MessageKey) -> Option<&CanMessage> {
        self.messages.get(key)
    }

    /// Returns a `&CanMessage` given the numeric CAN id.
    pub fn get_message_by_id(&self, id: u32) -> Option<&CanMessage> {
        let key: MessageKey = self.get_msg_key_by_id(id)?;
        self.get_message_by_key(key)
    }

    /// Iterate messages in declaration order.
    pub fn iter_messages(&self) -> impl Iterator<Item = &CanMessage> + '_ {
        self.messages_order
            .iter()
            .filter_map(|&k| self.messages.get(k))
    }

    // -------------- Signals ------------

    /// Adds a parsed signal under `current_message`. Without a current
    /// message the call is ignored (malformed input tolerated). Duplicate
    /// names within the same message are ignored as well.
    pub fn add_signal(&mut self, mut signal: CanSignal) -> Option<SignalKey> {
        let Some(msg_key) = self.current_message else {
            debug!(
                signal = %signal.name,
                bus = %self.name,
                "signal line outside any message ignored"
            );
            return None;
        };
        let msg_id: u32 = self.messages.get(msg_key)?.id;

        let pending = self.pending_signals.entry(msg_id).or_default();
        let duplicate: bool = pending.iter().any(|&sk| {
            self.signals
                .get(sk)
                .is_some_and(|s| s.name.eq_ignore_ascii_case(&signal.name))
        });
        if duplicate {
            debug!(
                signal = %signal.name,
                message_id = msg_id,
                "duplicate signal name ignored"
            );
            return None;
        }

        signal.message = Some(msg_key);
        let key: SignalKey = self.signals.insert(signal);
        self.pending_signals.entry(msg_id).or_default().push(key);
        Some(key)
    }

    /// Overrides the value type of a pending signal (`SIG_VALTYPE_`).
    /// Returns whether a matching (message id, signal name) pair was found;
    /// unknown pairs are left untouched.
    pub fn add_signal_value_type(&mut self, msg_id: u32, name: &str, ty: ValueType) -> bool {
        let Some(pending) = self.pending_signals.get(&msg_id) else {
            return false;
        };
        let found: Option<SignalKey> = pending.iter().copied().find(|&sk| {
            self.signals
                .get(sk)
                .is_some_and(|s| s.name.eq_ignore_ascii_case(name))
        });
        match found {
            Some(sk) => {
                if let Some(sig) = self.signals.get_mut(sk) {
                    sig.value_type = ty;
                }
                true
            }
            None => false,
        }
    }

    /// Resolves a signal by (message id, name): first among the pending
    /// signals parked during parsing, then among the built message's own.
    fn find_signal_for_message(&self, msg_id: u32, name: &str) -> Option<SignalKey> {
        let matches_name = |sk: SignalKey| {
            self.signals
                .get(sk)
                .is_some_and(|s| s.name.eq_ignore_ascii_case(name))
        };
        if let Some(pending) = self.pending_signals.get(&msg_id)
            && let Some(&sk) = pending.iter().find(|&&sk| matches_name(sk))
        {
            return Some(sk);
        }
        let msg_key: MessageKey = self.get_msg_key_by_id(msg_id)?;
        self.messages
            .get(msg_key)?
            .signals
            .iter()
            .copied()
            .find(|&sk| matches_name(sk))
    }

    // -------------- Comments & attributes ------------

    /// Assigns a node comment (`CM_ BU_`). Returns whether the node exists.
    pub fn set_node_comment(&mut self, name: &str, text: &str) -> bool {
        let Some(key) = self.get_node_key_by_name(name) else {
            return false;
        };
        if let Some(node) = self.nodes.get_mut(key) {
            node.comment = text.to_string();
        }
        true
    }

    /// Assigns a message comment (`CM_ BO_`). Returns whether the id exists.
    pub fn set_message_comment(&mut self, msg_id: u32, text: &str) -> bool {
        let Some(key) = self.get_msg_key_by_id(msg_id) else {
            return false;
        };
        if let Some(msg) = self.messages.get_mut(key) {
            msg.comment = text.to_string();
        }
        true
    }

    /// Assigns a signal comment (`CM_ SG_`). Returns whether the
    /// (message id, signal name) pair exists.
    pub fn set_signal_comment(&mut self, msg_id: u32, name: &str, text: &str) -> bool {
        let Some(sk) = self.find_signal_for_message(msg_id, name) else {
            return false;
        };
        if let Some(sig) = self.signals.get_mut(sk) {
            sig.comment = text.to_string();
        }
        true
    }

    /// Assigns a message cycle time (`BA_ "GenMsgCycleTime" BO_`). Returns
    /// whether the id exists.
    pub fn set_message_cycle(&mut self, msg_id: u32, cycle_ms: f32) -> bool {
        let Some(key) = self.get_msg_key_by_id(msg_id) else {
            return false;
        };
        if let Some(msg) = self.messages.get_mut(key) {
            msg.cycle_ms = cycle_ms;
        }
        true
    }

    /// Signal key by name within one message (ASCII case-insensitive).
    pub fn get_signal(&self, msg_key: MessageKey, name: &str) -> Option<SignalKey> {
        let msg: &CanMessage = self.messages.get(msg_key)?;
        msg.signals.iter().copied().find(|&sk| {
            self.signals
                .get(sk)
                .is_some_and(|s| s.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn get_sig_by_key(&self, key: SignalKey) -> Option<&CanSignal> {
        self.signals.get(key)
    }

    /// Iterate the signals of one message in declaration order.
    pub fn iter_signals_of<'a>(
        &'a self,
        msg: &'a CanMessage,
    ) -> impl Iterator<Item = &'a CanSignal> + 'a {
        msg.signals.iter().filter_map(move |&k| self.signals.get(k))
    }

    /// Moves every pending signal list into its message's signal vector, in
    /// insertion order. The pending map is left empty and never read again.
    pub fn build(&mut self) {
        let order: Vec<MessageKey> = self.messages_order.clone();
        for msg_key in order {
            let Some(id) = self.messages.get(msg_key).map(|m| m.id) else {
                continue;
            };
            if let Some(pending) = self.pending_signals.remove(&id)
                && let Some(msg) = self.messages.get_mut(msg_key)
            {
                msg.signals.extend(pending);
            }
        }
        self.pending_signals.clear();
        self.current_message = None;
    }

    // -------------- Observers ------------

    /// Registers a change observer. Callbacks run synchronously on the
    /// mutating thread, in mutation order, and must not re-enter the bus.
    pub fn subscribe(&mut self, callback: impl FnMut(&BusEvent) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(callback)));
        id
    }

    /// Removes a previously registered observer. Returns whether it existed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    fn emit(&mut self, event: BusEvent) {
        for (_, callback) in &mut self.observers {
            callback(&event);
        }
    }

    // -------------- Runtime ------------

    /// Writes payload bytes into a message and re-decodes its signals.
    ///
    /// Input longer than the payload is clamped, shorter input zero-fills
    /// the tail. Every signal whose raw value changes emits a
    /// `SignalUpdated`; one `MessageUpdated` follows.
    pub fn set_message_data(&mut self, key: MessageKey, bytes: &[u8]) -> Result<(), GraphError> {
        let (id, payload, sig_keys) = {
            let msg = self
                .messages
                .get_mut(key)
                .ok_or(GraphError::MessageMissing { message_key: key })?;
            let take: usize = bytes.len().min(msg.data.len());
            msg.data[..take].copy_from_slice(&bytes[..take]);
            msg.data[take..].fill(0);
            (msg.id, msg.data.clone(), msg.signals.clone())
        };

        for sig_key in sig_keys {
            let changed: Option<String> = {
                let sig = self
                    .signals
                    .get_mut(sig_key)
                    .ok_or(GraphError::SignalMissing {
                        signal_key: sig_key,
                    })?;
                sig.decode(&payload)?.then(|| sig.name.clone())
            };
            if let Some(signal) = changed {
                self.emit(BusEvent::SignalUpdated {
                    bus: self.name.clone(),
                    message_id: id,
                    signal,
                });
            }
        }

        self.emit(BusEvent::MessageUpdated {
            bus: self.name.clone(),
            message_id: id,
        });
        Ok(())
    }

    /// Repacks a message from its signals' raw values: zero the payload,
    /// OR every field in, emit one `MessageUpdated`.
    pub fn pack_message(&mut self, key: MessageKey) -> Result<(), GraphError> {
        let (id, byte_length, sig_keys) = {
            let msg = self
                .messages
                .get(key)
                .ok_or(GraphError::MessageMissing { message_key: key })?;
            (msg.id, msg.byte_length as usize, msg.signals.clone())
        };

        let mut packed: Vec<u8> = vec![0u8; byte_length];
        for sig_key in sig_keys {
            let sig = self
                .signals
                .get(sig_key)
                .ok_or(GraphError::SignalMissing {
                    signal_key: sig_key,
                })?;
            codec::pack_into(
                &mut packed,
                sig.raw_value,
                sig.start_bit,
                sig.bit_length,
                sig.byte_order,
            )?;
        }

        if let Some(msg) = self.messages.get_mut(key) {
            msg.data = packed;
        }
        self.emit(BusEvent::MessageUpdated {
            bus: self.name.clone(),
            message_id: id,
        });
        Ok(())
    }

    /// Encodes one signal into a zero-filled buffer of its parent
    /// message's length.
    pub fn encode_signal(&self, key: SignalKey) -> Result<Vec<u8>, GraphError> {
        let sig = self
            .signals
            .get(key)
            .ok_or(GraphError::SignalMissing { signal_key: key })?;
        let msg_key = sig.message.ok_or_else(|| GraphError::NotAttached {
            name: sig.name.clone(),
        })?;
        let byte_length = self
            .messages
            .get(msg_key)
            .ok_or(GraphError::MessageMissing {
                message_key: msg_key,
            })?
            .byte_length;
        sig.encode(byte_length as usize)
    }

    /// Assigns a signal's raw value, recomputes the physical value and
    /// repacks the parent message. The `SignalUpdated` (only when the raw
    /// actually changed) is delivered strictly before the `MessageUpdated`
    /// from the repack.
    pub fn set_signal_raw(&mut self, key: SignalKey, raw: u64) -> Result<(), GraphError> {
        let (changed, name, msg_key) = {
            let sig = self
                .signals
                .get_mut(key)
                .ok_or(GraphError::SignalMissing { signal_key: key })?;
            let msg_key = sig.message.ok_or_else(|| GraphError::NotAttached {
                name: sig.name.clone(),
            })?;
            (sig.apply_raw(raw), sig.name.clone(), msg_key)
        };

        if changed {
            let id = self
                .messages
                .get(msg_key)
                .ok_or(GraphError::MessageMissing {
                    message_key: msg_key,
                })?
                .id;
            self.emit(BusEvent::SignalUpdated {
                bus: self.name.clone(),
                message_id: id,
                signal: name,
            });
        }
        self.pack_message(msg_key)
    }

    /// Assigns a signal's physical value; see
    /// [`set_signal_raw`](Self::set_signal_raw).
    pub fn set_signal_physical(&mut self, key: SignalKey, physical: f64) -> Result<(), GraphError> {
        let raw: u64 = {
            let sig = self
                .signals
                .get(key)
                .ok_or(GraphError::SignalMissing { signal_key: key })?;
            sig.raw_from_physical(physical)
        };
        self.set_signal_raw(key, raw)
    }

    /// Announces a message to every node on the bus.
    pub fn transmit(&self, key: MessageKey) -> Result<(), GraphError> {
        let msg = self
            .messages
            .get(key)
            .ok_or(GraphError::MessageMissing { message_key: key })?;
        info!(bus = %self.name, message_id = msg.id, "transmitting message");
        for node in self.iter_nodes() {
            node.receive(msg, &self.name);
        }
        Ok(())
    }

    /// Assigns the `BO_TX_BU_` node list to a message.
    pub fn set_additional_transmitters(
        &mut self,
        msg_id: u32,
        names: Vec<String>,
    ) -> Result<(), GraphError> {
        let Some(&key) = self.msg_key_by_id.get(&msg_id) else {
            return Err(GraphError::UnresolvedMessage {
                id: msg_id,
                bus: self.name.clone(),
            });
        };
        if let Some(msg) = self.messages.get_mut(key) {
            msg.additional_transmitters = names;
        }
        Ok(())
    }
}
