use chrono::NaiveDate;

/// Display format NSE uses for expiry dates, e.g. `27-Feb-2025`.
pub const DISPLAY_FORMAT: &str = "%d-%b-%Y";

/// Convert a compact `YYYYMMDD` token into NSE's `DD-Mon-YYYY` form.
///
/// Anything that is not exactly eight digits naming a real calendar day
/// yields `None`, which callers treat as "no expiry filter".
pub fn format_expiry(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year = raw[0..4].parse::<i32>().ok()?;
    let month = raw[4..6].parse::<u32>().ok()?;
    let day = raw[6..8].parse::<u32>().ok()?;

    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format(DISPLAY_FORMAT).to_string())
}

/// Whether a row's expiry token names the same contract slice as the filter.
pub fn expiry_matches(row_expiry: &str, wanted: &str) -> bool {
    row_expiry.trim().eq_ignore_ascii_case(wanted.trim())
}
