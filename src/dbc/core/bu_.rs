use crate::dbc::core::LineOutcome;
use crate::types::bus::CanBus;

/// Parses the `BU_:` line listing node names and attaches them to the bus.
/// Example: `BU_: ECU1 ECU2 ECU3`. A bare `BU_:` is a valid no-op.
pub(crate) fn parse(bus: &mut CanBus, line: &str) -> LineOutcome {
    let line: &str = line.trim_start();
    if !line.starts_with("BU_:") {
        return LineOutcome::NotHandled;
    }

    // Skip the "BU_:" token; everything after is a node name.
    for name in line["BU_:".len()..].split_ascii_whitespace() {
        bus.add_node_if_absent(name);
    }
    LineOutcome::Handled
}
