use crate::dbc::core::LineOutcome;
use crate::types::bus::CanBus;

/// Prefixes consumed wherever they start a line.
const IGNORED_PREFIXES: [&str; 4] = ["VERSION", "BS_", "NS_ ", "NS_DESC_"];

/// Keywords consumed only as the whole line (the bare names a DBC `NS_`
/// block lists). Full statements such as `BO_TX_BU_ 42 : A,B;` do NOT
/// match and fall through to their dedicated parsers.
const IGNORED_KEYWORDS: [&str; 27] = [
    "CM_",
    "BA_DEF_",
    "BA_",
    "VAL_",
    "CAT_DEF_",
    "CAT_",
    "FILTER",
    "BA_DEF_DEF_",
    "EV_DATA_",
    "ENVVAR_DATA_",
    "SGTYPE_",
    "SGTYPE_VAL_",
    "BA_DEF_SGTYPE_",
    "BA_SGTYPE_",
    "SIG_TYPE_REF_",
    "VAL_TABLE_",
    "SIG_GROUP_",
    "SIG_VALTYPE_",
    "SIGTYPE_VALTYPE_",
    "BO_TX_BU_",
    "BA_DEF_REL_",
    "BA_REL_",
    "BA_DEF_DEF_REL_",
    "BU_SG_REL_",
    "BU_EV_REL_",
    "BU_BO_REL_",
    "SG_MUL_VAL_",
];

/// Consumes DBC sections this database model does not represent.
/// Side-effect-free.
pub(crate) fn parse(_bus: &mut CanBus, line: &str) -> LineOutcome {
    let line: &str = line.trim_start();
    if IGNORED_PREFIXES.iter().any(|p| line.starts_with(p))
        || IGNORED_KEYWORDS.iter().any(|k| line.trim_end() == *k)
    {
        LineOutcome::Handled
    } else {
        LineOutcome::NotHandled
    }
}
