use crate::expiry::expiry_matches;
use crate::models::{ChainRow, OptionChainSnapshot, OptionType};

/// Last traded premium for `strike`/`option_type`, optionally pinned to an
/// expiry in `DD-Mon-YYYY` form.
///
/// Rows are scanned in payload order and the first strike match wins. A
/// pass honouring the expiry filter runs first; when it finds nothing the
/// scan is repeated ignoring expiry. Returns `0.0` when no row matches or
/// the matched side carries no usable price.
pub fn resolve_premium(
    snapshot: &OptionChainSnapshot,
    strike: f64,
    option_type: OptionType,
    expiry: Option<&str>,
) -> f64 {
    find_row(snapshot, strike, expiry)
        .and_then(|row| row.last_price(option_type))
        .unwrap_or(0.0)
}

/// Matched row for the strike, exact expiry first, then any expiry.
pub fn find_row<'a>(
    snapshot: &'a OptionChainSnapshot,
    strike: f64,
    expiry: Option<&str>,
) -> Option<ChainRow<'a>> {
    if !strike.is_finite() {
        return None;
    }

    let same_strike = |row: &ChainRow<'a>| row.strike() == Some(strike);

    let exact = snapshot
        .chain_rows()
        .filter(|row| match (expiry, row.expiry()) {
            (Some(wanted), Some(actual)) => expiry_matches(&actual, wanted),
            // rows without an expiry token are never excluded
            _ => true,
        })
        .find(same_strike);

    exact.or_else(|| snapshot.chain_rows().find(same_strike))
}

/// Parse a strike price from a query value. Blank or non-numeric input
/// yields `None`.
pub fn parse_strike(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|strike| strike.is_finite())
}
