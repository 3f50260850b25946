use tracing::warn;

use crate::dbc::core::{LineOutcome, is_identifier};
use crate::types::bus::CanBus;
use crate::types::signal::{ByteOrder, CanSignal, ValueType};

/// Parses an `SG_` signal definition belonging to the **current message**
/// (the last accepted `BO_` line).
/// Shape:
/// `SG_ <name> [M|mX] : <start>|<len>@<0|1><+|-> (<factor>,<offset>) [<min>|<max>] "<unit>" <receivers>`
pub(crate) fn parse(bus: &mut CanBus, line: &str) -> LineOutcome {
    let line: &str = line.trim_start();
    let Some(rest) = line.strip_prefix("SG_") else {
        return LineOutcome::NotHandled;
    };
    // keeps SG_MUL_VAL_ and friends out of this parser
    if !rest.starts_with(char::is_whitespace) {
        return LineOutcome::NotHandled;
    }

    match parse_fields(line) {
        Some(signal) => {
            bus.add_signal(signal);
            LineOutcome::Handled
        }
        None => {
            warn!(line, "malformed SG_ line skipped");
            LineOutcome::Handled
        }
    }
}

fn parse_fields(line: &str) -> Option<CanSignal> {
    let line: &str = line.trim_end();
    let mut split_colon = line.splitn(2, ':');
    let left: &str = split_colon.next()?.trim(); // "SG_ NAME [M|mX]"
    let right: &str = split_colon.next()?.trim();

    // left part: SG_ NAME [M|mX]
    let mut left_it = left.split_ascii_whitespace();
    let _sg = left_it.next();
    let name: &str = left_it.next()?;
    if !is_identifier(name) {
        return None;
    }
    let multiplexer: Option<String> = match left_it.next() {
        None => None,
        Some(tag) if is_mux_tag(tag) => Some(tag.to_string()),
        Some(_) => return None,
    };
    if left_it.next().is_some() {
        return None;
    }

    // right part: <start>|<len>@<endian><sign> (factor,offset) [min|max] "unit" receivers
    let mut it = right.split_ascii_whitespace();

    // 1) bit info: "16|14@0-"
    let bit_info: &str = it.next()?;
    let (pos_len, ord_sign) = bit_info.split_once('@')?;
    let (start_token, length_token) = pos_len.split_once('|')?;
    let start_bit: u16 = start_token.parse().ok()?;
    let bit_length: u16 = length_token.parse().ok()?;

    let mut ord_sign_chars = ord_sign.chars();
    let byte_order: ByteOrder = match ord_sign_chars.next()? {
        '0' => ByteOrder::Motorola,
        '1' => ByteOrder::Intel,
        _ => return None,
    };
    let value_type: ValueType = match ord_sign_chars.next()? {
        '+' => ValueType::Unsigned,
        '-' => ValueType::Signed,
        _ => return None,
    };
    if ord_sign_chars.next().is_some() {
        return None;
    }

    // 2) "(factor,offset)", possibly split across tokens; gather until ')'
    let paren: String = gather_until(it.by_ref(), '(', ')')?;
    let inner: &str = paren.trim_start_matches('(').trim_end_matches(')');
    let mut nums = inner.split(',').map(|s| s.trim());
    let factor: f32 = nums.next()?.parse().ok()?;
    let offset: f32 = nums.next()?.parse().ok()?;

    // 3) "[min|max]"
    let bounds: String = gather_until(it.by_ref(), '[', ']')?;
    let inner: &str = bounds.trim_start_matches('[').trim_end_matches(']');
    let (min_token, max_token) = inner.split_once('|')?;
    let min: f32 = min_token.trim().parse().ok()?;
    let max: f32 = max_token.trim().parse().ok()?;

    // 4) quoted "unit", possibly with inner spaces
    let quoted: String = gather_quoted(it.by_ref())?;
    let unit: String = quoted.trim_matches('"').to_string();

    // 5) receivers: the remainder, verbatim
    let receiver: String = it.collect::<Vec<&str>>().join(" ");
    if receiver.is_empty() {
        return None;
    }

    Some(CanSignal {
        name: name.to_string(),
        start_bit,
        bit_length,
        byte_order,
        value_type,
        factor,
        offset,
        min,
        max,
        unit,
        receiver,
        multiplexer,
        ..Default::default()
    })
}

/// `M` (multiplexer switch) or `m<N>` (multiplexed by value N).
fn is_mux_tag(token: &str) -> bool {
    token == "M"
        || (token.len() > 1
            && token.starts_with('m')
            && token[1..].chars().all(|c| c.is_ascii_digit()))
}

/// Collects tokens from `open` through the one ending with `close`.
fn gather_until<'a>(it: &mut impl Iterator<Item = &'a str>, open: char, close: char) -> Option<String> {
    let first: &str = it.next()?;
    if !first.starts_with(open) {
        return None;
    }
    let mut acc: String = first.to_string();
    while !acc.ends_with(close) {
        let token = it.next()?;
        acc.push(' ');
        acc.push_str(token);
    }
    Some(acc)
}

/// Collects a double-quoted run of tokens (the unit may contain spaces).
fn gather_quoted<'a>(it: &mut impl Iterator<Item = &'a str>) -> Option<String> {
    let first: &str = it.next()?;
    if !first.starts_with('"') {
        return None;
    }
    let mut acc: String = first.to_string();
    while acc.len() < 2 || !acc.ends_with('"') {
        let token = it.next()?;
        acc.push(' ');
        acc.push_str(token);
    }
    Some(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::message::CanMessage;

    fn bus_with_current_message() -> CanBus {
        let mut bus = CanBus::new("test");
        let node = bus.add_node_if_absent("NEO");
        let mut msg = CanMessage::new(1160, "DAS_steeringCmd", "NEO");
        msg.set_length(8).unwrap();
        bus.add_tx_message(node, msg).unwrap();
        bus
    }

    #[test]
    fn parses_a_motorola_signed_signal() {
        let mut bus = bus_with_current_message();
        let outcome = parse(
            &mut bus,
            " SG_ DAS_steeringAngle : 16|14@0- (0.1,-1638.35) [-1638.35|1638.35] \"deg\" EPAS",
        );
        assert_eq!(outcome, LineOutcome::Handled);
        bus.build();

        let msg_key = bus.get_msg_key_by_id(1160).unwrap();
        let sig_key = bus.get_signal(msg_key, "DAS_steeringAngle").unwrap();
        let sig = bus.get_sig_by_key(sig_key).unwrap();
        assert_eq!(sig.start_bit, 16);
        assert_eq!(sig.bit_length, 14);
        assert_eq!(sig.byte_order, ByteOrder::Motorola);
        assert_eq!(sig.value_type, ValueType::Signed);
        assert_eq!(sig.factor, 0.1);
        assert_eq!(sig.offset, -1638.35);
        assert_eq!(sig.min, -1638.35);
        assert_eq!(sig.max, 1638.35);
        assert_eq!(sig.unit, "deg");
        assert_eq!(sig.receiver, "EPAS");
    }

    #[test]
    fn preserves_the_multiplexer_tag() {
        let mut bus = bus_with_current_message();
        parse(
            &mut bus,
            " SG_ Mode M : 0|4@1+ (1,0) [0|15] \"\" GW",
        );
        parse(
            &mut bus,
            " SG_ Detail m2 : 4|8@1+ (1,0) [0|255] \"\" GW",
        );
        bus.build();
        let msg_key = bus.get_msg_key_by_id(1160).unwrap();
        let mode = bus
            .get_sig_by_key(bus.get_signal(msg_key, "Mode").unwrap())
            .unwrap();
        let detail = bus
            .get_sig_by_key(bus.get_signal(msg_key, "Detail").unwrap())
            .unwrap();
        assert_eq!(mode.multiplexer.as_deref(), Some("M"));
        assert_eq!(detail.multiplexer.as_deref(), Some("m2"));
    }

    #[test]
    fn unit_with_spaces_and_multiple_receivers() {
        let mut bus = bus_with_current_message();
        parse(
            &mut bus,
            " SG_ Consumption : 0|16@1+ (0.01,0) [0|600] \"l per h\" GW,Cluster",
        );
        bus.build();
        let msg_key = bus.get_msg_key_by_id(1160).unwrap();
        let sig = bus
            .get_sig_by_key(bus.get_signal(msg_key, "Consumption").unwrap())
            .unwrap();
        assert_eq!(sig.unit, "l per h");
        assert_eq!(sig.receiver, "GW,Cluster");
    }

    #[test]
    fn signal_before_any_message_is_tolerated() {
        let mut bus = CanBus::new("test");
        let outcome = parse(
            &mut bus,
            " SG_ Lost : 0|8@1+ (1,0) [0|255] \"\" GW",
        );
        assert_eq!(outcome, LineOutcome::Handled);
        bus.build();
        assert_eq!(bus.iter_messages().count(), 0);
    }

    #[test]
    fn malformed_signal_lines_are_consumed() {
        let mut bus = bus_with_current_message();
        for line in [
            " SG_ NoColon 0|8@1+ (1,0) [0|255] \"\" GW",
            " SG_ BadBits : 0-8@1+ (1,0) [0|255] \"\" GW",
            " SG_ BadOrder : 0|8@2+ (1,0) [0|255] \"\" GW",
            " SG_ NoReceivers : 0|8@1+ (1,0) [0|255] \"\"",
        ] {
            assert_eq!(parse(&mut bus, line), LineOutcome::Handled, "{line}");
        }
        bus.build();
        let msg_key = bus.get_msg_key_by_id(1160).unwrap();
        assert!(bus.get_message_by_key(msg_key).unwrap().signals.is_empty());
    }

    #[test]
    fn mul_val_keyword_falls_through() {
        let mut bus = bus_with_current_message();
        assert_eq!(
            parse(&mut bus, "SG_MUL_VAL_ 1160 Detail Mode 2-2;"),
            LineOutcome::NotHandled
        );
    }
}
