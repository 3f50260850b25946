use serde::{Deserialize, Serialize};

/// Change notification emitted by a [`CanBus`](crate::types::bus::CanBus).
///
/// A payload write produces one `SignalUpdated` per signal whose raw value
/// changed, followed by a single `MessageUpdated`. A signal mutation
/// (`set_signal_raw` / `set_signal_physical`) delivers its `SignalUpdated`
/// strictly before the `MessageUpdated` caused by the repack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusEvent {
    MessageUpdated {
        bus: String,
        message_id: u32,
    },
    SignalUpdated {
        bus: String,
        message_id: u32,
        signal: String,
    },
}

/// Handle returned by `CanBus::subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

/// Observer callback. Runs synchronously on the mutating thread, in
/// mutation order. Callbacks must not re-enter the bus and must not panic.
pub(crate) type ObserverFn = Box<dyn FnMut(&BusEvent)>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_for_external_consumers() {
        let event = BusEvent::SignalUpdated {
            bus: "powertrain".to_string(),
            message_id: 0x100,
            signal: "Rpm".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: BusEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
