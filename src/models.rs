use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// -----------------------------------------------
// ALTERNATIVE FIELD NAMES SEEN IN NSE PAYLOADS
// -----------------------------------------------
const STRIKE_KEYS: &[&str] = &["strikePrice", "strike_price", "strike"];
const ROW_EXPIRY_KEYS: &[&str] = &["expiryDate", "expiry"];
const LAST_PRICE_KEYS: &[&str] = &["lastPrice", "last_traded_price", "last_price", "ltp"];
const CALL_KEYS: &[&str] = &["CE", "call"];
const PUT_KEYS: &[&str] = &["PE", "put"];

/// Call or put side of a strike row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(rename = "CE")]
    Call,
    #[serde(rename = "PE")]
    Put,
}

impl OptionType {
    fn side_keys(self) -> &'static [&'static str] {
        match self {
            OptionType::Call => CALL_KEYS,
            OptionType::Put => PUT_KEYS,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "CE"),
            OptionType::Put => write!(f, "PE"),
        }
    }
}

/// Option chain exactly as NSE returned it. Read-only once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionChainSnapshot(Value);

impl OptionChainSnapshot {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    /// Strike rows from `filtered.data`, falling back to `records.data`.
    ///
    /// An empty `filtered.data` counts as unpopulated and falls through to
    /// `records.data`, rather than pricing every strike at 0 off an empty
    /// filtered view.
    pub fn rows(&self) -> &[Value] {
        ["filtered", "records"]
            .iter()
            .filter_map(|section| self.0.get(section)?.get("data")?.as_array())
            .find(|rows| !rows.is_empty())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn chain_rows(&self) -> impl Iterator<Item = ChainRow<'_>> {
        self.rows().iter().map(ChainRow)
    }
}

/// Borrowed view over one strike/expiry row.
#[derive(Debug, Clone, Copy)]
pub struct ChainRow<'a>(pub &'a Value);

impl<'a> ChainRow<'a> {
    pub fn strike(&self) -> Option<f64> {
        first_present(self.0, STRIKE_KEYS).and_then(as_number)
    }

    /// Expiry token of the row, looking inside the CE/PE legs when the row
    /// itself does not carry a usable one.
    pub fn expiry(&self) -> Option<String> {
        let on_row = ROW_EXPIRY_KEYS.iter().filter_map(|key| self.0.get(key));
        let on_legs = ["CE", "PE"]
            .iter()
            .filter_map(|leg| self.0.get(leg)?.get("expiryDate"));

        on_row.chain(on_legs).find_map(expiry_token)
    }

    pub fn side(&self, option_type: OptionType) -> Option<&'a Value> {
        first_present(self.0, option_type.side_keys())
    }

    /// Last traded price of the requested side, if present and numeric.
    pub fn last_price(&self, option_type: OptionType) -> Option<f64> {
        let side = self.side(option_type)?;
        first_present(side, LAST_PRICE_KEYS).and_then(as_number)
    }
}

/// First key whose value is neither null nor an empty string.
fn first_present<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(key))
        .find(|v| match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
}

/// Strings and numbers are expiry tokens; arrays, objects and blanks are not.
fn expiry_token(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
