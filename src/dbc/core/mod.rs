//! Per-keyword DBC line parsers.
//!
//! A fixed, ordered chain is tried on every non-blank line; the first
//! parser returning [`LineOutcome::Handled`] consumes the line. The order
//! is load-bearing: the ignore parser only swallows bare keywords (as
//! listed in a `NS_` block), so full `BO_TX_BU_`/`SIG_VALTYPE_`/`CM_`/`BA_`
//! statements reach their dedicated parsers further down the chain. Lines
//! no parser claims are reported by the loader.

pub(crate) mod ba_;
pub(crate) mod bo_;
pub(crate) mod bo_tx_bu_;
pub(crate) mod bu_;
pub(crate) mod cm_;
pub(crate) mod ignore_;
pub(crate) mod sg_;
pub(crate) mod sig_valtype_;
pub(crate) mod strings;

use crate::types::bus::CanBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineOutcome {
    Handled,
    NotHandled,
}

pub(crate) type LineParser = fn(&mut CanBus, &str) -> LineOutcome;

/// The dispatch chain, in the order the parsers must be tried.
pub(crate) const LINE_PARSERS: &[LineParser] = &[
    bu_::parse,
    ignore_::parse,
    bo_::parse,
    bo_tx_bu_::parse,
    sg_::parse,
    sig_valtype_::parse,
    cm_::parse,
    ba_::parse,
];

/// `[A-Za-z_]\w*`
pub(crate) fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
