use tracing::warn;

use crate::dbc::core::{LineOutcome, is_identifier};
use crate::types::bus::CanBus;

/// Parses a `BO_TX_BU_` line assigning additional transmit-capable nodes
/// to a message. Example: `BO_TX_BU_ 123 : NodeA,NodeB;`
pub(crate) fn parse(bus: &mut CanBus, line: &str) -> LineOutcome {
    let line: &str = line.trim_start();
    if !line.starts_with("BO_TX_BU_ ") {
        return LineOutcome::NotHandled;
    }

    let Some((id, names)) = parse_fields(line) else {
        warn!(line, "malformed BO_TX_BU_ line skipped");
        return LineOutcome::Handled;
    };

    if let Err(e) = bus.set_additional_transmitters(id, names) {
        warn!(line, error = %e, "BO_TX_BU_ line skipped");
    }
    LineOutcome::Handled
}

fn parse_fields(line: &str) -> Option<(u32, Vec<String>)> {
    let after: &str = line.strip_prefix("BO_TX_BU_")?.trim_start();

    let mut split_colon = after.splitn(2, ':');
    let id: u32 = split_colon.next()?.trim().parse().ok()?;
    let list: &str = split_colon.next()?.trim().trim_end_matches(';');

    let names: Vec<String> = list
        .split(',')
        .map(|token| token.trim())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect();
    if names.is_empty() || !names.iter().all(|n| is_identifier(n)) {
        return None;
    }
    Some((id, names))
}
