use tracing::warn;

use crate::dbc::core::{LineOutcome, is_identifier};
use crate::types::bus::CanBus;
use crate::types::signal::ValueType;

/// Parses a `SIG_VALTYPE_` line assigning a floating-point encoding to a
/// signal. Shape: `SIG_VALTYPE_ <MsgID> <SignalName> : <Value>;` where
/// `<Value>` is `1` (IEEE float) or `2` (IEEE double); `0` and `3` keep the
/// integer interpretation from the SG_ line.
pub(crate) fn parse(bus: &mut CanBus, line: &str) -> LineOutcome {
    let line: &str = line.trim_start();
    if !line.starts_with("SIG_VALTYPE_ ") {
        return LineOutcome::NotHandled;
    }

    let Some((msg_id, name, value)) = parse_fields(line) else {
        warn!(line, "malformed SIG_VALTYPE_ line skipped");
        return LineOutcome::Handled;
    };

    let ty: ValueType = match value {
        1 => ValueType::IeeeFloat,
        2 => ValueType::IeeeDouble,
        // 0 and 3 keep the SG_ line's integer interpretation
        _ => return LineOutcome::Handled,
    };

    if !bus.add_signal_value_type(msg_id, &name, ty) {
        warn!(
            message_id = msg_id,
            signal = %name,
            "SIG_VALTYPE_ references an unknown signal, line skipped"
        );
    }
    LineOutcome::Handled
}

fn parse_fields(line: &str) -> Option<(u32, String, u8)> {
    let mut parts = line.trim_end().trim_end_matches(';').split_ascii_whitespace();

    match parts.next() {
        Some("SIG_VALTYPE_") => {}
        _ => return None,
    }
    let msg_id: u32 = parts.next()?.parse().ok()?;

    // the colon may be glued to the signal name or stand alone
    let name_token: &str = parts.next()?;
    let (name, seen_colon) = match name_token.strip_suffix(':') {
        Some(stripped) => (stripped, true),
        None => (name_token, false),
    };
    if !is_identifier(name) {
        return None;
    }
    if !seen_colon {
        match parts.next() {
            Some(":") => {}
            _ => return None,
        }
    }

    let value: u8 = parts.next()?.parse().ok()?;
    if value > 3 || parts.next().is_some() {
        return None;
    }
    Some((msg_id, name.to_string(), value))
}
