use tracing::{debug, warn};

use crate::dbc::core::{LineOutcome, is_identifier};
use crate::types::bus::CanBus;
use crate::types::message::CanMessage;

/// Parses a `BO_` message definition line.
/// Shape: `BO_ <id> <name> : <length> <transmitter>`, with the colon
/// optionally glued to the name.
///
/// The message is routed through the transmitter node's TX path; when the
/// transmitter is unknown the message is dropped (tolerated).
pub(crate) fn parse(bus: &mut CanBus, line: &str) -> LineOutcome {
    let line: &str = line.trim_start();
    if !line.starts_with("BO_ ") {
        return LineOutcome::NotHandled;
    }

    match parse_fields(line) {
        Some((id, name, byte_length, transmitter)) => {
            let mut msg = CanMessage::new(id, &name, &transmitter);
            if let Err(e) = msg.set_length(byte_length) {
                warn!(line, error = %e, "BO_ line with invalid length skipped");
                return LineOutcome::Handled;
            }
            match bus.get_node_key_by_name(&transmitter) {
                Some(node_key) => {
                    bus.add_tx_message(node_key, msg);
                }
                None => {
                    debug!(
                        transmitter = %transmitter,
                        message = %name,
                        "transmitter not declared on this bus, message dropped"
                    );
                }
            }
            LineOutcome::Handled
        }
        None => {
            warn!(line, "malformed BO_ line skipped");
            LineOutcome::Handled
        }
    }
}

fn parse_fields(line: &str) -> Option<(u32, String, u16, String)> {
    let after: &str = line.strip_prefix("BO_")?.trim_start();

    // 1) id (first token)
    let mut split_once = after.splitn(2, char::is_whitespace);
    let id: u32 = split_once.next()?.parse().ok()?;
    let rest: &str = split_once.next()?.trim_start();

    // 2) name (everything up to the first ':')
    let colon = rest.find(':')?;
    let name: &str = rest[..colon].trim();
    if !is_identifier(name) {
        return None;
    }

    // 3) after ':' → <length> <transmitter>
    let mut it = rest[colon + 1..].trim_start().split_ascii_whitespace();
    let byte_length: u16 = it.next()?.parse().ok()?;
    let transmitter: &str = it.next()?;
    if !is_identifier(transmitter) {
        return None;
    }

    Some((id, name.to_string(), byte_length, transmitter.to_string()))
}
