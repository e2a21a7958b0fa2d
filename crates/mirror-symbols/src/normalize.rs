//! Symbol normalization.
//!
//! Strips the decoration brokers attach to instrument names so that
//! `XAUUSDm`, `XAUUSD.pro`, and `CFD_XAUUSD` all reduce to `XAUUSD`.

use once_cell::sync::Lazy;

/// Suffix tokens brokers append to symbol names, stripped once per symbol.
///
/// Single letters cover the micro/standard/cent account variants
/// (`XAUUSDm`, `EURUSDs`); the dotted and underscored forms cover account
/// tiers and execution flavors.
const SUFFIX_TOKENS: &[&str] = &[
    "S", "M", "C", "I", "F", "P", "X", "Z", "E",
    "_S", ".S", "_M", ".M", "_C", ".C", "_I", ".I",
    "_MINI", ".MINI", "_MICRO", ".MICRO", "_MAJ", ".MAJ",
    ".CASH", "_CASH", ".SPOT", "_SPOT", ".RAW", "_RAW",
    "_FX", ".FX", ".PRO", "_PRO", ".ECN", "_ECN",
    ".STP", "_STP", ".DMA", "_DMA", ".NDD", "_NDD",
    "DM", "SM", "LM", "XL", "XS", "MD", "LG",
    "_VAR", ".VAR", "_FIX", ".FIX", "_FLOAT", ".FLOAT",
];

/// Prefix tokens, stripped once per symbol.
const PREFIX_TOKENS: &[&str] = &[
    "M_", "MINI_", "MICRO_", "FX_", "FOREX_", "CFD_",
    "SPOT_", "CASH_", "DMA_", "STP_", "ECN_", "PRO_",
    "RAW_", "VAR_", "FIX_", "NDD_", "B_", "A_",
];

/// Suffixes sorted longest-first so `.CASH` wins over `C`.
static SUFFIXES_BY_LENGTH: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut tokens: Vec<&str> = SUFFIX_TOKENS.to_vec();
    tokens.sort_by_key(|t| std::cmp::Reverse(t.len()));
    tokens
});

/// Normalize a symbol for comparison.
///
/// Uppercases, strips one known suffix and one known prefix, then removes
/// non-alphanumerics and trailing digits. The result is only used for
/// equality checks and similarity scoring, never shown to a terminal.
pub fn normalize_symbol(symbol: &str) -> String {
    if symbol.is_empty() {
        return String::new();
    }

    let mut normalized = symbol.trim().to_ascii_uppercase();

    for suffix in SUFFIXES_BY_LENGTH.iter() {
        if normalized.len() > suffix.len() && normalized.ends_with(suffix) {
            normalized.truncate(normalized.len() - suffix.len());
            break;
        }
    }

    for prefix in PREFIX_TOKENS {
        if normalized.len() > prefix.len() {
            if let Some(stripped) = normalized.strip_prefix(prefix) {
                normalized = stripped.to_string();
                break;
            }
        }
    }

    normalized.retain(|c| c.is_ascii_alphanumeric());
    while normalized.ends_with(|c: char| c.is_ascii_digit()) {
        normalized.pop();
    }

    normalized
}
