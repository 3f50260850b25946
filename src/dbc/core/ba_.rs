use tracing::{debug, warn};

use crate::dbc::core::LineOutcome;
use crate::types::bus::CanBus;

/// Parses a `BA_` attribute statement. Only `GenMsgCycleTime` carries over
/// to the model (`BA_ "GenMsgCycleTime" BO_ <id> <value>;` sets the message
/// cycle in milliseconds); every other attribute is consumed and logged as
/// ignored. The bare `BA_` keyword is handled by the ignore parser earlier
/// in the chain, and `BA_DEF_*` forms do not match this prefix.
pub(crate) fn parse(bus: &mut CanBus, line: &str) -> LineOutcome {
    let line: &str = line.trim_start();
    if !line.starts_with("BA_ ") {
        return LineOutcome::NotHandled;
    }

    let s: &str = line.trim_end().trim_end_matches(';');
    let mut parts = s.split_ascii_whitespace();
    parts.next(); // BA_

    let Some(attribute) = parts.next().map(|a| a.trim_matches('"')) else {
        warn!(line, "malformed BA_ line skipped");
        return LineOutcome::Handled;
    };
    if attribute != "GenMsgCycleTime" {
        debug!(line, attribute, "attribute statement ignored");
        return LineOutcome::Handled;
    }

    let fields = (parts.next(), parts.next(), parts.next());
    let (Some("BO_"), Some(id_token), Some(value_token)) = fields else {
        warn!(line, "malformed GenMsgCycleTime statement skipped");
        return LineOutcome::Handled;
    };
    let (Some(id), Some(cycle_ms)) = (
        id_token.parse::<u32>().ok(),
        value_token.parse::<f32>().ok(),
    ) else {
        warn!(line, "malformed GenMsgCycleTime statement skipped");
        return LineOutcome::Handled;
    };

    if !bus.set_message_cycle(id, cycle_ms) {
        warn!(
            message_id = id,
            "GenMsgCycleTime references an unknown message, line skipped"
        );
    }
    LineOutcome::Handled
}
