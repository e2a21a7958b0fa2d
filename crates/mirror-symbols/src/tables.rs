//! Alias tables for well-known instruments.
//!
//! Two fixed tables live here: the canonical-instrument table mapping a
//! popular name to the broker-suffix variants it appears under, and the
//! semantic-alias pairs that boost fuzzy scores for names with low raw
//! edit-distance similarity (SP500 vs US500). A shared base table can
//! additionally be loaded from a local file or a remote source at startup.

use crate::error::Result;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Variants each canonical instrument name is known to appear under.
pub static CANONICAL_VARIANTS: Lazy<HashMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| {
        let mut table: HashMap<&str, &[&str]> = HashMap::new();

        // Gold
        table.insert(
            "XAUUSD",
            &["XAUUSD", "XAUUSDs", "XAUUSDm", "XAUUSDc", "XAUUSD.cash", "XAUUSD.spot", "GOLD", "GOLDm"],
        );
        table.insert("GOLD", &["GOLD", "XAUUSD", "XAUUSDs", "XAUUSDm", "GOLDm", "GOLD.spot"]);

        // Oil
        table.insert(
            "USOIL",
            &["USOIL", "usoil.cash", "USOIL.cash", "USOILm", "USOILs", "CRUDE", "OIL", "WTI"],
        );
        table.insert("CRUDE", &["CRUDE", "USOIL", "usoil.cash", "WTI", "OIL"]);
        table.insert("WTI", &["WTI", "USOIL", "usoil.cash", "CRUDE"]);
        table.insert("OIL", &["OIL", "USOIL", "usoil.cash", "WTI", "CRUDE"]);

        // S&P 500
        table.insert(
            "SP500",
            &["SP500", "US500", "SPX500", "S&P500", "SPY", "ES", "US500m", "SPX500m"],
        );
        table.insert("US500", &["US500", "SP500", "SPX500", "S&P500", "US500m", "US500s"]);
        table.insert("SPX500", &["SPX500", "SP500", "US500", "S&P500", "SPX500m"]);

        // Nasdaq
        table.insert("NAS100", &["NAS100", "NASDAQ", "NDX", "QQQ", "US100", "NAS100m", "US100m"]);
        table.insert("NASDAQ", &["NASDAQ", "NAS100", "US100", "NDX", "QQQ"]);
        table.insert("US100", &["US100", "NAS100", "NASDAQ", "US100m", "US100s"]);

        // Dow Jones
        table.insert("DJ30", &["DJ30", "DJIA", "DOW", "US30", "YM", "DJ30m", "US30m"]);
        table.insert("US30", &["US30", "DJ30", "DJIA", "DOW", "US30m", "US30s"]);
        table.insert("DJIA", &["DJIA", "DJ30", "US30", "DOW"]);
        table.insert("DOW", &["DOW", "DJIA", "DJ30", "US30"]);

        // Bitcoin
        table.insert("BTCUSD", &["BTCUSD", "BTCUSDm", "BTCUSDs", "BTCUSD.cash", "BTC", "BITCOIN"]);
        table.insert("BTC", &["BTC", "BTCUSD", "BTCUSDm", "BITCOIN"]);
        table.insert("BITCOIN", &["BITCOIN", "BTC", "BTCUSD", "BTCUSDm"]);

        // Major forex pairs
        table.insert("EURUSD", &["EURUSD", "EURUSDm", "EURUSDs", "EURUSD.mini", "EURUSD.cash"]);
        table.insert("GBPUSD", &["GBPUSD", "GBPUSDm", "GBPUSDs", "GBPUSD.pro", "GBPUSD.cash"]);
        table.insert("USDJPY", &["USDJPY", "USDJPYm", "USDJPYs", "USDJPY.fx", "USDJPY.cash"]);
        table.insert("AUDUSD", &["AUDUSD", "AUDUSDm", "AUDUSDs", "AUDUSD.cash"]);
        table.insert("USDCAD", &["USDCAD", "USDCADm", "USDCADs", "USDCAD.cash"]);
        table.insert("USDCHF", &["USDCHF", "USDCHFm", "USDCHFs", "USDCHF.cash"]);
        table.insert("NZDUSD", &["NZDUSD", "NZDUSDm", "NZDUSDs", "NZDUSD.cash"]);

        // Crosses
        table.insert("EURGBP", &["EURGBP", "EURGBPm", "EURGBPs", "EURGBP.cash"]);
        table.insert("EURJPY", &["EURJPY", "EURJPYm", "EURJPYs", "EURJPY.cash"]);
        table.insert("GBPJPY", &["GBPJPY", "GBPJPYm", "GBPJPYs", "GBPJPY.cash"]);

        // Silver
        table.insert(
            "XAGUSD",
            &["XAGUSD", "XAGUSDm", "XAGUSDs", "XAGUSD.cash", "SILVER", "SILVERm"],
        );
        table.insert("SILVER", &["SILVER", "XAGUSD", "XAGUSDm", "SILVERm"]);

        table
    });

/// Semantic alias pairs with their similarity boost.
///
/// These cover names for the same instrument whose spellings share few
/// characters, so raw edit distance alone would miss them.
pub const SEMANTIC_ALIASES: &[(&str, &str, f64)] = &[
    ("SP500", "US500", 0.95),
    ("NAS100", "US100", 0.95),
    ("DJ30", "US30", 0.95),
    ("USOIL", "CRUDE", 0.90),
    ("GOLD", "XAUUSD", 0.90),
    ("SILVER", "XAGUSD", 0.90),
    ("BTC", "BTCUSD", 0.90),
    ("BITCOIN", "BTCUSD", 0.85),
];

/// Suffixes whose presence alone should not separate two symbols
/// (used for the fuzzy suffix-equivalence bonus).
pub const EQUIVALENT_SUFFIXES: &[&str] = &[
    "S", "M", "C", "I", "F", "P", "X", "DM", "SM", "LM", "CASH", "SPOT", "MINI",
];

/// Timeout for the remote base-table fetch. Resolution must not hang on a
/// slow mirror at startup.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Look up the semantic-alias boost for a pair of symbols, if any.
pub fn semantic_alias_score(a: &str, b: &str) -> Option<f64> {
    let a = a.to_ascii_uppercase();
    let b = b.to_ascii_uppercase();
    SEMANTIC_ALIASES.iter().find_map(|(s1, s2, score)| {
        if (a == *s1 && b == *s2) || (a == *s2 && b == *s1) {
            Some(*score)
        } else {
            None
        }
    })
}

/// Load the shared base alias table.
///
/// Tries the local file first, then the remote source with a short
/// timeout, and degrades to an empty table on any failure.
pub async fn load_base_mappings(
    path: Option<&Path>,
    url: Option<&str>,
) -> HashMap<String, String> {
    if let Some(path) = path {
        match read_mappings_file(path) {
            Ok(mappings) => {
                info!(path = %path.display(), count = mappings.len(), "Loaded base symbol mappings");
                return mappings;
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "Base mapping file unavailable");
            }
        }
    }

    if let Some(url) = url {
        match fetch_mappings(url).await {
            Ok(mappings) => {
                info!(%url, count = mappings.len(), "Fetched base symbol mappings");
                return mappings;
            }
            Err(err) => {
                warn!(%url, %err, "Base mapping fetch failed, continuing without");
            }
        }
    }

    HashMap::new()
}

fn read_mappings_file(path: &Path) -> Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

async fn fetch_mappings(url: &str) -> Result<HashMap<String, String>> {
    let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.json().await?)
}
