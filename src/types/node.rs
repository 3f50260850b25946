use tracing::info;

use crate::types::bus::MessageKey;
use crate::types::message::CanMessage;

/// Node/ECU attached to a bus.
#[derive(Default, Clone, PartialEq, Debug)]
pub struct CanNode {
    /// Node/ECU name.
    pub name: String,
    /// Associated comment (DBC `CM_ BU_` section).
    pub comment: String,
    /// Messages transmitted by this node.
    pub tx_messages: Vec<MessageKey>,
}

impl CanNode {
    pub fn new(name: &str) -> Self {
        CanNode {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Passive delivery notification; transmission itself is driven by
    /// [`CanBus::transmit`](crate::types::bus::CanBus::transmit).
    pub fn receive(&self, message: &CanMessage, bus_name: &str) {
        info!(
            node = %self.name,
            bus = %bus_name,
            message_id = message.id,
            "node received message"
        );
    }
}
