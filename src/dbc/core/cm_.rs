use tracing::warn;

use crate::dbc::core::{LineOutcome, strings};
use crate::types::bus::CanBus;

/// Parses a `CM_` comment statement. Accepted forms:
/// - `CM_ "network comment";`
/// - `CM_ BU_ <node> "comment";`
/// - `CM_ BO_ <id> "comment";`
/// - `CM_ SG_ <id> <signal> "comment";`
///
/// The loader joins multi-line comments before dispatch, so the quoted text
/// may contain newlines. The bare `CM_` keyword (from a `NS_` block) is
/// consumed by the ignore parser earlier in the chain.
pub(crate) fn parse(bus: &mut CanBus, line: &str) -> LineOutcome {
    let line: &str = line.trim_start();
    if !line.starts_with("CM_ ") {
        return LineOutcome::NotHandled;
    }

    let s: &str = line.trim_end().trim_end_matches(';');
    let mut parts = s.split_ascii_whitespace();
    parts.next(); // CM_

    let Some(object) = parts.next() else {
        warn!(line, "malformed CM_ line skipped");
        return LineOutcome::Handled;
    };

    // network comment: the quoted text follows CM_ directly
    if object.starts_with('"') {
        match strings::quoted_text(s) {
            Some(text) => bus.comment = text.to_string(),
            None => warn!(line, "malformed CM_ line skipped"),
        }
        return LineOutcome::Handled;
    }

    // Some(true) applied, Some(false) unresolved target, None malformed
    let applied: Option<bool> = match object {
        "BU_" => match (parts.next(), strings::quoted_text(s)) {
            (Some(node), Some(text)) => Some(bus.set_node_comment(node, text)),
            _ => None,
        },
        "BO_" => {
            let id: Option<u32> = parts.next().and_then(|t| t.parse().ok());
            match (id, strings::quoted_text(s)) {
                (Some(id), Some(text)) => Some(bus.set_message_comment(id, text)),
                _ => None,
            }
        }
        "SG_" => {
            let id: Option<u32> = parts.next().and_then(|t| t.parse().ok());
            match (id, parts.next(), strings::quoted_text(s)) {
                (Some(id), Some(name), Some(text)) => {
                    Some(bus.set_signal_comment(id, name, text))
                }
                _ => None,
            }
        }
        _ => None,
    };

    match applied {
        Some(true) => {}
        Some(false) => warn!(line, "CM_ references an unknown object, line skipped"),
        None => warn!(line, "malformed CM_ line skipped"),
    }
    LineOutcome::Handled
}
